//! Game configuration.
//!
//! Configuration is plain JSON so a driver can load it from a file or an
//! environment variable. Every field has a default.

use crate::board::{Board, Layout};
use crate::engine::GameError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Delay before the first phase transition
pub const DEFAULT_START_DELAY_MS: u64 = 3000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid layout: {0}")]
    Layout(#[from] GameError),
}

/// Settings for one game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Milliseconds between setup and the first roll phase
    pub start_delay_ms: u64,
    /// Initial pawn placement
    pub layout: Layout,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            start_delay_ms: DEFAULT_START_DELAY_MS,
            layout: Layout::standard(),
        }
    }
}

impl GameConfig {
    /// Parse and validate a config
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.layout.build()?;
        Ok(config)
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn build_board(&self) -> Result<Board, GameError> {
        self.layout.build()
    }
}

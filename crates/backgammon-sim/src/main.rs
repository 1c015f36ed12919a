//! Headless backgammon simulator.
//!
//! Plays bot-vs-bot sessions through the turn engine and prints a JSON
//! summary per game.

use anyhow::Context;
use backgammon_core::GameConfig;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod protocol;
mod runner;
mod session;

use runner::{SimConfig, SimState};

/// Read an environment variable, falling back to `default` when unset
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, value)),
        Err(_) => Ok(default),
    }
}

fn load_game_config() -> anyhow::Result<GameConfig> {
    match std::env::var("BACKGAMMON_CONFIG") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config {}", path))?;
            Ok(GameConfig::from_json(&json)?)
        }
        Err(_) => Ok(GameConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SimConfig {
        games: env_or("SIM_GAMES", 4)?,
        max_turns: env_or("SIM_TURNS", 60)?,
        base_seed: env_or("SIM_SEED", rand::random())?,
        game: load_game_config()?,
    };

    info!("Starting backgammon simulator...");

    let state = Arc::new(SimState::new());
    let results = runner::run_simulation(&config, Arc::clone(&state)).await;

    let unfinished = state.active_sessions();
    if !unfinished.is_empty() {
        warn!("{} sessions did not finish", unfinished.len());
    }

    for result in results {
        match result {
            Ok(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
            Err(e) => error!("Session failed: {}", e),
        }
    }

    Ok(())
}

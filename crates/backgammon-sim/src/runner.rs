//! Running many sessions at once.

use crate::protocol::{SessionInfo, SessionStatus, SessionSummary};
use crate::session::{self, Session, SessionError};
use backgammon_core::{GameConfig, Phase};
use dashmap::DashMap;
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Settings for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub games: usize,
    pub max_turns: u32,
    pub base_seed: u64,
    pub game: GameConfig,
}

/// State shared by all sessions of a run.
pub struct SimState {
    /// Every session, keyed by ID
    pub sessions: DashMap<Uuid, SessionInfo>,
}

impl SimState {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Record a session's phase as it changes
    fn set_phase(&self, id: Uuid, phase: Phase) {
        if let Some(mut info) = self.sessions.get_mut(&id) {
            info.phase = phase;
            if info.status == SessionStatus::Waiting {
                info.status = SessionStatus::Running;
            }
        }
    }

    fn set_status(&self, id: Uuid, status: SessionStatus) {
        if let Some(mut info) = self.sessions.get_mut(&id) {
            info.status = status;
        }
    }

    /// Sessions that have not ended yet
    pub fn active_sessions(&self) -> Vec<SessionInfo> {
        self.sessions
            .iter()
            .filter(|s| matches!(s.status, SessionStatus::Waiting | SessionStatus::Running))
            .map(|s| s.value().clone())
            .collect()
    }
}

impl Default for SimState {
    fn default() -> Self {
        Self::new()
    }
}

/// Register and play one session.
async fn run_session(
    config: &SimConfig,
    seed: u64,
    state: Arc<SimState>,
) -> Result<SessionSummary, SessionError> {
    let mut game = Session::new(Uuid::new_v4(), &config.game, seed, config.max_turns)?;
    let id = game.id();

    state.sessions.insert(
        id,
        SessionInfo {
            id,
            seed,
            status: game.status(),
            phase: game.engine().phase(),
        },
    );

    let registry = Arc::clone(&state);
    game.subscribe(move |_, new| registry.set_phase(id, new));

    let result = session::play(game, &config.game).await;
    match &result {
        Ok(summary) => state.set_status(id, summary.status),
        Err(e) => {
            error!("Session {} failed: {}", id, e);
            state.set_status(id, SessionStatus::Stalled);
        }
    }
    result
}

/// Play `config.games` sessions concurrently. Session `n` uses seed
/// `base_seed + n`.
pub async fn run_simulation(
    config: &SimConfig,
    state: Arc<SimState>,
) -> Vec<Result<SessionSummary, SessionError>> {
    info!(
        "Running {} games of up to {} turns (base seed {})",
        config.games, config.max_turns, config.base_seed
    );

    let sessions = (0..config.games).map(|n| {
        let seed = config.base_seed.wrapping_add(n as u64);
        run_session(config, seed, Arc::clone(&state))
    });
    join_all(sessions).await
}

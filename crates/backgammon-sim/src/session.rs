//! Game sessions.
//!
//! A session owns one `TurnEngine` and feeds it one command at a time from an
//! mpsc channel. Two bots play both colors: after each command the session
//! works out the next input (roll, settle a die, select, click) and queues it
//! on its own channel. Turn hand-overs are published as updates and the
//! session waits for the peer's echo before continuing.

use backgammon_core::dice::DIE_FACES;
use backgammon_core::{
    Bot, Color, GameAction, GameConfig, GameError, GameEvent, MovePolicy, Phase, Position,
    TurnEngine,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::{SessionCommand, SessionStatus, SessionSummary, SessionUpdate};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid game setup: {0}")]
    Setup(#[from] GameError),

    #[error("Command channel closed before the session finished")]
    ChannelClosed,
}

/// Running totals for the summary
#[derive(Debug, Default)]
struct Tally {
    moves: u32,
    captures: u32,
    skipped_turns: u32,
    no_legal_moves: u32,
    relay_mismatches: u32,
}

impl Tally {
    fn record(&mut self, event: &GameEvent) {
        match event {
            GameEvent::PawnMoved { .. } => self.moves += 1,
            GameEvent::PawnCaptured { .. } => self.captures += 1,
            GameEvent::TurnSkipped { .. } => self.skipped_turns += 1,
            GameEvent::NoLegalMoves { .. } => self.no_legal_moves += 1,
            _ => {}
        }
    }
}

/// One game between two bots.
pub struct Session {
    id: Uuid,
    seed: u64,
    engine: TurnEngine,
    bots: [Bot; 2],
    dice_rng: StdRng,
    max_turns: u32,
    /// Destination chosen together with the last selection
    pending_click: Option<Position>,
    /// A hand-over was relayed and the peer has not echoed it yet
    awaiting_peer: bool,
    status: SessionStatus,
    tally: Tally,
}

impl Session {
    pub fn new(
        id: Uuid,
        config: &GameConfig,
        seed: u64,
        max_turns: u32,
    ) -> Result<Self, SessionError> {
        Ok(Self {
            id,
            seed,
            engine: TurnEngine::from_config(config)?,
            bots: [
                Bot::with_seed(Color::Red, seed.wrapping_add(1)),
                Bot::with_seed(Color::White, seed.wrapping_add(2)),
            ],
            dice_rng: StdRng::seed_from_u64(seed),
            max_turns,
            pending_click: None,
            awaiting_peer: false,
            status: SessionStatus::Waiting,
            tally: Tally::default(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn engine(&self) -> &TurnEngine {
        &self.engine
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Observe phase changes of the session's engine
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(Phase, Phase) + Send + 'static,
    {
        self.engine.subscribe(listener);
    }

    /// Turns completed so far
    pub fn turns(&self) -> u32 {
        self.engine.turn_number().saturating_sub(1)
    }

    fn is_finished(&self) -> bool {
        self.engine.turn_number() > self.max_turns
    }

    /// Feed one command to the engine
    pub fn apply(&mut self, command: SessionCommand) -> Result<Vec<GameEvent>, GameError> {
        let action = match command {
            SessionCommand::Start => GameAction::Start,
            SessionCommand::Roll => GameAction::BeginRoll,
            SessionCommand::DieSettled { die, face } => GameAction::SettleDie { die, face },
            SessionCommand::Select { source } => GameAction::Select(source),
            SessionCommand::FieldClicked { destination } => GameAction::ClickField(destination),
            SessionCommand::PeerTurnEnded {
                player,
                next_player,
            } => {
                self.check_peer_echo(player, next_player);
                return Ok(Vec::new());
            }
        };

        let result = self.engine.apply_action(action);
        if result.is_err() {
            self.pending_click = None;
        }
        let events = result?;
        if self.status == SessionStatus::Waiting && self.engine.phase() != Phase::Init {
            info!("Session {} started", self.id);
            self.status = SessionStatus::Running;
        }
        for event in &events {
            self.tally.record(event);
        }
        Ok(events)
    }

    /// The local engine owns the turn; a disagreeing peer is only reported.
    fn check_peer_echo(&mut self, player: Color, next_player: Color) {
        self.awaiting_peer = false;
        let local = self.engine.current_player();
        if next_player != local {
            self.tally.relay_mismatches += 1;
            warn!(
                "Session {}: peer handed the turn from {} to {}, but it is {}'s turn here",
                self.id, player, next_player, local
            );
        }
    }

    /// Work out the next input from the engine's state
    pub fn next_command(&mut self) -> Option<SessionCommand> {
        let phase = self.engine.phase();
        if phase.is_rolls() {
            let rolling = self.engine.dice().iter().position(|d| d.is_rolling());
            return Some(match rolling {
                Some(die) => SessionCommand::DieSettled {
                    die,
                    face: self.dice_rng.gen_range(DIE_FACES),
                },
                None => SessionCommand::Roll,
            });
        }
        if !phase.is_moves() {
            return None;
        }

        if let Some(destination) = self.pending_click.take() {
            return Some(SessionCommand::FieldClicked { destination });
        }

        let player = self.engine.current_player();
        let bot = self.bots.iter_mut().find(|b| b.color == player)?;
        let (source, destination) = bot.choose_move(&self.engine)?;
        self.pending_click = Some(destination);
        Some(SessionCommand::Select { source })
    }

    /// Publish what the engine reported. Returns `true` when a hand-over
    /// reached the peer.
    fn publish(
        &self,
        events: &[GameEvent],
        updates: &mut Option<mpsc::UnboundedSender<SessionUpdate>>,
    ) -> bool {
        let mut relayed = false;
        for event in events {
            let update = match *event {
                GameEvent::PhaseChanged { from, to } => SessionUpdate::PhaseChanged { from, to },
                GameEvent::PawnMoved {
                    player,
                    pawn,
                    from,
                    to,
                    ..
                } => SessionUpdate::PawnMoved {
                    player,
                    pawn,
                    from,
                    to,
                },
                GameEvent::TurnEnded {
                    player,
                    next_player,
                } => SessionUpdate::TurnEnded {
                    player,
                    next_player,
                },
                _ => continue,
            };

            let is_handover = matches!(update, SessionUpdate::TurnEnded { .. });
            let Some(sender) = updates.as_ref() else {
                continue;
            };
            if sender.send(update).is_err() {
                info!("Session {}: peer disconnected, continuing alone", self.id);
                *updates = None;
                continue;
            }
            relayed |= is_handover;
        }
        relayed
    }

    fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            seed: self.seed,
            status: self.status,
            final_phase: self.engine.phase(),
            turns: self.turns(),
            moves: self.tally.moves,
            captures: self.tally.captures,
            skipped_turns: self.tally.skipped_turns,
            no_legal_moves: self.tally.no_legal_moves,
            relay_mismatches: self.tally.relay_mismatches,
        }
    }

    /// Run until the turn cap is reached or no input can be produced.
    ///
    /// `commands_tx` is the sending half of `commands`; the session queues its
    /// own inputs there so they interleave with the start timer and the peer.
    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
        commands_tx: mpsc::UnboundedSender<SessionCommand>,
        updates: mpsc::UnboundedSender<SessionUpdate>,
    ) -> Result<SessionSummary, SessionError> {
        let mut updates = Some(updates);
        debug!("Session {} waiting for start", self.id);

        loop {
            let command = commands.recv().await.ok_or(SessionError::ChannelClosed)?;
            match self.apply(command.clone()) {
                Ok(events) => {
                    if self.publish(&events, &mut updates) {
                        self.awaiting_peer = true;
                    }
                }
                Err(e) => debug!("Session {}: {:?} rejected: {}", self.id, command, e),
            }

            if self.is_finished() {
                self.status = SessionStatus::Finished;
                break;
            }
            if self.awaiting_peer || self.engine.phase() == Phase::Init {
                continue;
            }

            match self.next_command() {
                Some(next) => {
                    if commands_tx.send(next).is_err() {
                        return Err(SessionError::ChannelClosed);
                    }
                }
                None => {
                    let phase = self.engine.phase();
                    warn!("Session {} stalled during {:?}", self.id, phase);
                    if let Some(sender) = &updates {
                        let _ = sender.send(SessionUpdate::Stalled {
                            phase,
                            reason: format!("no input available for {}", self.engine.current_player()),
                        });
                    }
                    self.status = SessionStatus::Stalled;
                    break;
                }
            }
        }

        let summary = self.summary();
        info!(
            "Session {} ended after {} turns ({:?})",
            summary.id, summary.turns, summary.status
        );
        Ok(summary)
    }
}

/// Echo every hand-over back to the session, like a remote client would.
pub async fn mirror_peer(
    mut updates: mpsc::UnboundedReceiver<SessionUpdate>,
    commands: mpsc::UnboundedSender<SessionCommand>,
) {
    while let Some(update) = updates.recv().await {
        if let SessionUpdate::TurnEnded {
            player,
            next_player,
        } = update
        {
            if commands
                .send(SessionCommand::PeerTurnEnded {
                    player,
                    next_player,
                })
                .is_err()
            {
                break;
            }
        }
    }
}

/// Wire up a session with its start timer and mirror peer and play it out.
pub async fn play(session: Session, config: &GameConfig) -> Result<SessionSummary, SessionError> {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();

    let peer = tokio::spawn(mirror_peer(updates_rx, commands_tx.clone()));

    let delay = config.start_delay();
    let start_tx = commands_tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = start_tx.send(SessionCommand::Start);
    });

    let result = session.run(commands_rx, commands_tx, updates_tx).await;
    peer.abort();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use backgammon_core::{Board, PAWNS_PER_COLOR};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn config(start_delay_ms: u64) -> GameConfig {
        GameConfig {
            start_delay_ms,
            ..GameConfig::default()
        }
    }

    #[test]
    fn test_next_command_follows_phase() {
        let mut session = Session::new(Uuid::new_v4(), &config(0), 7, 10).unwrap();
        assert_eq!(session.next_command(), None);

        session.apply(SessionCommand::Start).unwrap();
        assert_eq!(session.next_command(), Some(SessionCommand::Roll));

        session.apply(SessionCommand::Roll).unwrap();
        assert!(matches!(
            session.next_command(),
            Some(SessionCommand::DieSettled { die: 0, .. })
        ));
    }

    #[test]
    fn test_selection_is_followed_by_click() {
        let mut session = Session::new(Uuid::new_v4(), &config(0), 7, 10).unwrap();
        session.apply(SessionCommand::Start).unwrap();
        session.apply(SessionCommand::Roll).unwrap();
        session.apply(SessionCommand::DieSettled { die: 0, face: 3 }).unwrap();
        session.apply(SessionCommand::DieSettled { die: 1, face: 1 }).unwrap();
        assert_eq!(session.engine().phase(), Phase::RedMoves);

        let select = session.next_command().unwrap();
        assert!(matches!(select, SessionCommand::Select { .. }));
        session.apply(select).unwrap();

        let click = session.next_command().unwrap();
        let SessionCommand::FieldClicked { destination } = click else {
            panic!("expected a click, got {:?}", click);
        };
        let events = session.apply(click).unwrap();
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::PawnMoved { to, .. } if *to == destination
        )));
    }

    #[test]
    fn test_peer_echo_mismatch_is_counted() {
        let mut session = Session::new(Uuid::new_v4(), &config(0), 1, 10).unwrap();
        session.apply(SessionCommand::Start).unwrap();

        // Red is to play; an echo handing the turn to White disagrees
        session
            .apply(SessionCommand::PeerTurnEnded {
                player: Color::Red,
                next_player: Color::White,
            })
            .unwrap();
        session
            .apply(SessionCommand::PeerTurnEnded {
                player: Color::White,
                next_player: Color::Red,
            })
            .unwrap();

        assert_eq!(session.summary().relay_mismatches, 1);
        assert_eq!(session.engine().phase(), Phase::RedRolls);
    }

    #[test]
    fn test_rejected_command_keeps_state() {
        let mut session = Session::new(Uuid::new_v4(), &config(0), 1, 10).unwrap();
        assert!(session.apply(SessionCommand::Roll).is_err());
        assert_eq!(session.engine().phase(), Phase::Init);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_waits_for_start_delay() {
        let mut session = Session::new(Uuid::new_v4(), &config(3000), 3, 5).unwrap();
        let transitions = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&transitions);
        session.subscribe(move |old, new| {
            sink.lock()
                .unwrap()
                .push((old, new, tokio::time::Instant::now()));
        });

        let begin = tokio::time::Instant::now();
        let game = tokio::spawn(async move { play(session, &config(3000)).await });

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert!(transitions.lock().unwrap().is_empty());

        let summary = game.await.unwrap().unwrap();
        assert_eq!(summary.status, SessionStatus::Finished);

        let transitions = transitions.lock().unwrap();
        let (old, new, at) = transitions[0];
        assert_eq!((old, new), (Phase::Init, Phase::RedRolls));
        let waited = at - begin;
        assert!(
            waited >= Duration::from_millis(3000) && waited < Duration::from_millis(3100),
            "started after {:?}",
            waited
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_plays_to_turn_cap() {
        let session = Session::new(Uuid::new_v4(), &config(3000), 11, 20).unwrap();
        let summary = play(session, &config(3000)).await.unwrap();

        assert_eq!(summary.status, SessionStatus::Finished);
        assert_eq!(summary.turns, 20);
        assert_eq!(summary.relay_mismatches, 0);
        assert!(summary.moves > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_runs_without_peer() {
        let mut session = Session::new(Uuid::new_v4(), &config(0), 5, 8).unwrap();
        let turns = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&turns);
        session.subscribe(move |_, new| {
            if new.is_rolls() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        drop(updates_rx);
        commands_tx.send(SessionCommand::Start).unwrap();

        let summary = session.run(commands_rx, commands_tx, updates_tx).await.unwrap();
        assert_eq!(summary.status, SessionStatus::Finished);
        assert_eq!(turns.load(Ordering::SeqCst), 9);
    }

    #[test]
    fn test_session_keeps_every_pawn() {
        let mut session = Session::new(Uuid::new_v4(), &config(0), 21, 30).unwrap();
        session.apply(SessionCommand::Start).unwrap();
        while !session.is_finished() {
            let Some(command) = session.next_command() else {
                break;
            };
            session.apply(command).unwrap();
        }

        let board: &Board = session.engine().board();
        for color in Color::ALL {
            assert_eq!(board.total_pawns(color), PAWNS_PER_COLOR);
        }
    }
}

//! Turn engine: the phase state machine.
//!
//! This module contains the `TurnEngine`, which owns the board and the dice,
//! decides whose turn it is, re-enters captured pawns after every roll, and
//! advances or skips turns as dice get used up.
//!
//! The engine is driven entirely by inputs (`GameAction`) and reports what
//! happened through `GameEvent`s and its state-change listeners.

use crate::actions::{GameAction, GameEvent};
use crate::board::{Board, Pawn, Position};
use crate::color::Color;
use crate::config::GameConfig;
use crate::dice::{DiceEvent, DiceSet, DieUsage, DICE_COUNT, DIE_FACES};
use crate::moves::{MoveError, MoveOutcome, PossibleMoves};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, info};

/// Game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Before the game has started
    Init,
    RedRolls,
    RedMoves,
    WhiteRolls,
    WhiteMoves,
    /// Reserved, never entered by the transition function
    InProgress,
}

impl Phase {
    /// Every phase
    pub const ALL: [Phase; 6] = [
        Phase::Init,
        Phase::RedRolls,
        Phase::RedMoves,
        Phase::WhiteRolls,
        Phase::WhiteMoves,
        Phase::InProgress,
    ];

    /// Successor in `Init -> RedRolls -> RedMoves -> WhiteRolls -> WhiteMoves -> RedRolls`
    pub fn next(self) -> Phase {
        match self {
            Phase::Init => Phase::RedRolls,
            Phase::RedRolls => Phase::RedMoves,
            Phase::RedMoves => Phase::WhiteRolls,
            Phase::WhiteRolls => Phase::WhiteMoves,
            Phase::WhiteMoves => Phase::RedRolls,
            Phase::InProgress => {
                error!("No successor for phase {:?}, falling back to RedRolls", self);
                Phase::RedRolls
            }
        }
    }

    /// The color acting in this phase
    pub fn player(self) -> Color {
        match self {
            Phase::Init | Phase::RedRolls | Phase::RedMoves => Color::Red,
            Phase::WhiteRolls | Phase::WhiteMoves | Phase::InProgress => Color::White,
        }
    }

    pub fn rolls_phase(color: Color) -> Phase {
        match color {
            Color::Red => Phase::RedRolls,
            Color::White => Phase::WhiteRolls,
        }
    }

    pub fn moves_phase(color: Color) -> Phase {
        match color {
            Color::Red => Phase::RedMoves,
            Color::White => Phase::WhiteMoves,
        }
    }

    pub fn is_rolls(self) -> bool {
        matches!(self, Phase::RedRolls | Phase::WhiteRolls)
    }

    pub fn is_moves(self) -> bool {
        matches!(self, Phase::RedMoves | Phase::WhiteMoves)
    }
}

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Game has already started")]
    AlreadyStarted,

    #[error("Action not allowed during {0:?}")]
    InvalidPhase(Phase),

    #[error("Dice are still rolling")]
    DiceStillRolling,

    #[error("No die with index {0}")]
    NoSuchDie(usize),

    #[error("Die {0} is not rolling")]
    DieNotRolling(usize),

    #[error("Die {0} is not available")]
    DieUnavailable(usize),

    #[error("Invalid face value {0}")]
    InvalidFace(u8),

    #[error("Invalid position {0}")]
    InvalidPosition(Position),

    #[error("Field {field} is held by {color}")]
    FieldOccupied { field: u8, color: Color },

    #[error("{color} would have {count} pawns, more than the board holds")]
    TooManyPawns { color: Color, count: usize },

    #[error("No movable pawn at {0}")]
    PawnNotMovable(Position),

    #[error(transparent)]
    Move(#[from] MoveError),
}

/// Callback notified with `(old, new)` on every phase change
pub type StateListener = Box<dyn FnMut(Phase, Phase) + Send>;

#[derive(Default)]
struct Listeners(Vec<StateListener>);

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listeners({})", self.0.len())
    }
}

/// The rules and turn engine
#[derive(Debug, Serialize)]
pub struct TurnEngine {
    phase: Phase,
    board: Board,
    dice: DiceSet,
    /// Incremented each time a roll phase begins
    turn_number: u32,
    /// The single live move generator, if a pawn is selected
    active_moves: Option<PossibleMoves>,
    #[serde(skip)]
    listeners: Listeners,
}

impl Default for TurnEngine {
    fn default() -> Self {
        Self::new(Board::standard())
    }
}

impl TurnEngine {
    /// Create an engine in `Init` over the given board
    pub fn new(board: Board) -> Self {
        Self {
            phase: Phase::Init,
            board,
            dice: DiceSet::new(),
            turn_number: 0,
            active_moves: None,
            listeners: Listeners::default(),
        }
    }

    /// Create an engine from a config's layout
    pub fn from_config(config: &GameConfig) -> Result<Self, GameError> {
        Ok(Self::new(config.build_board()?))
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Color to act, derived from the phase
    pub fn current_player(&self) -> Color {
        self.phase.player()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn dice(&self) -> &DiceSet {
        &self.dice
    }

    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    /// The move generator of the current selection
    pub fn active_moves(&self) -> Option<&PossibleMoves> {
        self.active_moves.as_ref()
    }

    /// Register a phase-change listener
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(Phase, Phase) + Send + 'static,
    {
        self.listeners.0.push(Box::new(listener));
    }

    /// Whether `pawn` may be moved right now
    pub fn can_pawn_be_moved(&self, pawn: &Pawn) -> bool {
        pawn.color == self.current_player() && self.phase == Phase::moves_phase(pawn.color)
    }

    /// At least one die is not fully used
    pub fn is_dice_available(&self) -> bool {
        self.dice.iter().any(|d| d.usage() != DieUsage::FullyUsed)
    }

    /// Positions the current player could move a pawn from. Pawns on the bar
    /// must enter before anything else moves.
    fn movable_sources(&self) -> Vec<Position> {
        let color = self.current_player();
        if self.board.has_pawns_on_bar(color) {
            vec![Position::Bar]
        } else {
            self.board.fields_of(color).collect()
        }
    }

    /// Every `(source, destination)` the current player can play with the
    /// dice still available
    pub fn legal_moves(&self) -> Vec<(Position, Position)> {
        let color = self.current_player();
        let mut moves = Vec::new();
        for source in self.movable_sources() {
            let possible = PossibleMoves::new(&self.board, &self.dice, color, source);
            for candidate in possible.candidates() {
                let pair = (source, candidate.destination);
                if !moves.contains(&pair) {
                    moves.push(pair);
                }
            }
        }
        moves
    }

    /// Whether any of the current player's pawns has a legal move
    pub fn has_available_moves(&self) -> bool {
        let color = self.current_player();
        self.movable_sources()
            .into_iter()
            .any(|source| PossibleMoves::new(&self.board, &self.dice, color, source).has_any_moves())
    }

    // ==================== Inputs ====================

    /// Apply an input and return the events it caused
    pub fn apply_action(&mut self, action: GameAction) -> Result<Vec<GameEvent>, GameError> {
        match action {
            GameAction::Start => self.start(),
            GameAction::BeginRoll => self.begin_roll(),
            GameAction::SettleDie { die, face } => self.settle_die(die, face),
            GameAction::Select(source) => self.select(source),
            GameAction::ClickField(destination) => Ok(self.on_field_clicked(destination)),
        }
    }

    /// First transition out of `Init`
    pub fn start(&mut self) -> Result<Vec<GameEvent>, GameError> {
        if self.phase != Phase::Init {
            return Err(GameError::AlreadyStarted);
        }
        info!("The game has started.");
        let mut events = Vec::new();
        self.advance_state(&mut events);
        Ok(events)
    }

    /// Throw the dice. Usage resets for the new roll.
    pub fn begin_roll(&mut self) -> Result<Vec<GameEvent>, GameError> {
        if !self.phase.is_rolls() {
            return Err(GameError::InvalidPhase(self.phase));
        }
        if self.dice.iter().any(|d| d.is_rolling()) {
            return Err(GameError::DiceStillRolling);
        }

        self.clear_active_moves();
        self.dice.begin_roll();
        Ok(vec![GameEvent::DiceRollStarted {
            player: self.current_player(),
        }])
    }

    /// A die finished rolling. Once every die has settled the engine
    /// re-enters bar pawns and moves on to the move phase or skips the turn.
    pub fn settle_die(&mut self, die: usize, face: u8) -> Result<Vec<GameEvent>, GameError> {
        if !self.phase.is_rolls() {
            return Err(GameError::InvalidPhase(self.phase));
        }
        let event = self.dice.settle(die, face)?;

        let mut events = Vec::new();
        self.dispatch_dice_event(event, &mut events);
        Ok(events)
    }

    /// Throw and settle every die with random faces
    pub fn roll<R: Rng>(&mut self, rng: &mut R) -> Result<Vec<GameEvent>, GameError> {
        let mut events = self.begin_roll()?;
        for die in 0..DICE_COUNT {
            let face = rng.gen_range(DIE_FACES);
            events.extend(self.settle_die(die, face)?);
        }
        Ok(events)
    }

    /// Select the pawn on `source` and compute where it can go. Replaces any
    /// previous selection.
    pub fn select(&mut self, source: Position) -> Result<Vec<GameEvent>, GameError> {
        let color = self.current_player();
        let pawn = match source {
            Position::Bar => self.board.top_pawn_of(source, color),
            Position::Field(_) => self.board.top_pawn(source),
        };
        let movable = pawn.map_or(false, |p| self.can_pawn_be_moved(p));
        if !movable {
            debug!("Ignoring selection of {}: no movable pawn", source);
            return Err(GameError::PawnNotMovable(source));
        }

        self.clear_active_moves();
        let moves = PossibleMoves::new(&self.board, &self.dice, color, source);
        let destinations = moves.candidates().iter().map(|c| c.destination).collect();
        self.active_moves = Some(moves);

        Ok(vec![GameEvent::MovesShown {
            source,
            destinations,
        }])
    }

    /// A destination was clicked. Anything but a candidate of the current
    /// selection during a move phase is ignored.
    pub fn on_field_clicked(&mut self, destination: Position) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if !self.phase.is_moves() {
            debug!("Ignoring click on {} during {:?}", destination, self.phase);
            return events;
        }

        let Some(moves) = self.active_moves.take() else {
            return events;
        };
        if !moves.is_move_possible(destination) {
            debug!("Ignoring click on {}: not a possible move", destination);
            self.active_moves = Some(moves);
            return events;
        }

        match moves.move_to(destination, &mut self.board, &mut self.dice) {
            Ok(outcome) => self.commit(outcome, &mut events),
            Err(e) => debug!("Move to {} rejected: {}", destination, e),
        }
        events
    }

    // ==================== State machine ====================

    /// Switch to `new_phase` and notify listeners
    pub fn set_state(&mut self, new_phase: Phase, events: &mut Vec<GameEvent>) {
        let old_phase = self.phase;
        self.phase = new_phase;
        self.clear_active_moves();
        if new_phase.is_rolls() {
            self.turn_number += 1;
        }

        info!(
            "Switching game state from {:?} to {:?}. It's {} player turn.",
            old_phase,
            new_phase,
            self.current_player()
        );

        for listener in &mut self.listeners.0 {
            listener(old_phase, new_phase);
        }

        events.push(GameEvent::PhaseChanged {
            from: old_phase,
            to: new_phase,
        });
        if old_phase != Phase::Init && old_phase.player() != new_phase.player() {
            events.push(GameEvent::TurnEnded {
                player: old_phase.player(),
                next_player: new_phase.player(),
            });
        }
    }

    /// Move to the next phase of the cycle
    pub fn advance_state(&mut self, events: &mut Vec<GameEvent>) {
        self.set_state(self.phase.next(), events);
    }

    /// Hand the dice to the opponent, skipping the current move phase
    pub fn skip_turn(&mut self, events: &mut Vec<GameEvent>) {
        let player = self.current_player();
        events.push(GameEvent::TurnSkipped { player });
        self.set_state(Phase::rolls_phase(player.opponent()), events);
    }

    /// Enter as many of the current player's bar pawns as the dice allow,
    /// always taking the first possible entry.
    ///
    /// Returns `true` when the turn has to be skipped: pawns are still on the
    /// bar, or no die is left to move with.
    pub fn move_pawns_from_bar(&mut self, events: &mut Vec<GameEvent>) -> bool {
        let color = self.current_player();

        while self.board.has_pawns_on_bar(color) && self.is_dice_available() {
            let moves = PossibleMoves::new(&self.board, &self.dice, color, Position::Bar);
            if !moves.has_any_moves() {
                debug!("{} cannot enter from the bar with {:?}", color, self.dice.faces());
                break;
            }

            match moves.do_first_move(&mut self.board, &mut self.dice) {
                Ok(outcome) => self.commit(outcome, events),
                Err(e) => {
                    error!("Entering from the bar failed: {}", e);
                    break;
                }
            }
        }

        self.board.has_pawns_on_bar(color) || !self.is_dice_available()
    }

    // ==================== Event handling ====================

    fn clear_active_moves(&mut self) {
        if let Some(mut moves) = self.active_moves.take() {
            moves.clear();
        }
    }

    fn commit(&mut self, outcome: MoveOutcome, events: &mut Vec<GameEvent>) {
        debug!(
            "{} moved pawn {} from {} to {} with die {}",
            outcome.pawn.color, outcome.pawn.id, outcome.from, outcome.to, outcome.die
        );

        events.push(GameEvent::PawnMoved {
            player: outcome.pawn.color,
            pawn: outcome.pawn.id,
            from: outcome.from,
            to: outcome.to,
            die: outcome.die,
        });
        if let Some(victim) = outcome.captured {
            events.push(GameEvent::PawnCaptured {
                pawn: victim.id,
                color: victim.color,
                at: outcome.to,
            });
        }

        self.dispatch_dice_event(outcome.dice_event, events);
    }

    fn dispatch_dice_event(&mut self, event: DiceEvent, events: &mut Vec<GameEvent>) {
        match event {
            DiceEvent::Rolled { die, face } => {
                events.push(GameEvent::DieRolled { die, face });
                self.on_dice_rolled(events);
            }
            DiceEvent::Used { die, usage } => {
                events.push(GameEvent::DieUsed { die, usage });
                self.on_dice_used(events);
            }
        }
    }

    fn on_dice_rolled(&mut self, events: &mut Vec<GameEvent>) {
        if !self.dice.all_settled() {
            return;
        }

        if self.move_pawns_from_bar(events) {
            self.skip_turn(events);
            return;
        }

        self.advance_state(events);
        if self.phase.is_moves() && !self.has_available_moves() {
            info!("{} has no legal move with {:?}", self.current_player(), self.dice.faces());
            events.push(GameEvent::NoLegalMoves {
                player: self.current_player(),
            });
            self.advance_state(events);
        }
    }

    fn on_dice_used(&mut self, events: &mut Vec<GameEvent>) {
        // Dice spent while re-entering from the bar are handled by the
        // rolled handler once re-entry is done.
        if !self.phase.is_moves() {
            return;
        }

        let every_fully_used = self.dice.all_fully_used();
        if every_fully_used || !self.has_available_moves() {
            if !every_fully_used {
                events.push(GameEvent::NoLegalMoves {
                    player: self.current_player(),
                });
            }
            self.advance_state(events);
        }
    }
}

//! Inputs the engine accepts and the events they cause.
//!
//! Every input handler on the engine returns the list of `GameEvent`s it
//! produced, in the order they happened. Presentation and relay layers
//! consume these instead of polling engine state.

use crate::board::{PawnId, Position};
use crate::color::Color;
use crate::dice::DieUsage;
use crate::engine::Phase;
use serde::{Deserialize, Serialize};

/// Inputs delivered by presentation, dice animation, or a bot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    /// Leave `Init` (fired by the delayed start timer)
    Start,
    /// Dice start rolling
    BeginRoll,
    /// One die finished rolling on a face
    SettleDie { die: usize, face: u8 },
    /// Pick the pawn on a position and show where it can go
    Select(Position),
    /// Click on a destination
    ClickField(Position),
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// The phase machine moved
    PhaseChanged { from: Phase, to: Phase },

    /// Dice were thrown
    DiceRollStarted { player: Color },

    /// A die settled
    DieRolled { die: usize, face: u8 },

    /// A die's usage advanced
    DieUsed { die: usize, usage: DieUsage },

    /// Destinations available from a selected position
    MovesShown {
        source: Position,
        destinations: Vec<Position>,
    },

    /// A pawn was moved
    PawnMoved {
        player: Color,
        pawn: PawnId,
        from: Position,
        to: Position,
        die: usize,
    },

    /// A pawn was hit and sent to the bar
    PawnCaptured {
        pawn: PawnId,
        color: Color,
        at: Position,
    },

    /// Pawns stayed on the bar or the dice ran out during re-entry
    TurnSkipped { player: Color },

    /// The player had dice left but no legal move
    NoLegalMoves { player: Color },

    /// Control passed to the other color
    TurnEnded { player: Color, next_player: Color },
}

//! AI players.
//!
//! The engine only needs something that picks one of the legal moves; how it
//! picks is up to the policy. `Bot` is the built-in policy: a uniform random
//! choice, seeded for reproducible games.

use crate::board::Position;
use crate::color::Color;
use crate::engine::TurnEngine;
use rand::prelude::*;

/// Chooses a move for the player whose turn it is
pub trait MovePolicy {
    /// Pick a `(source, destination)` pair, or `None` when there is nothing
    /// to play or it is not this policy's turn
    fn choose_move(&mut self, engine: &TurnEngine) -> Option<(Position, Position)>;
}

/// A bot player that picks random legal moves
pub struct Bot {
    pub color: Color,
    rng: StdRng,
}

impl Bot {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(color: Color, seed: u64) -> Self {
        Self {
            color,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl MovePolicy for Bot {
    fn choose_move(&mut self, engine: &TurnEngine) -> Option<(Position, Position)> {
        if !engine.phase().is_moves() || engine.current_player() != self.color {
            return None;
        }
        engine.legal_moves().choose(&mut self.rng).copied()
    }
}

//! Legal-move generation and move application.
//!
//! A `PossibleMoves` value is built for one source position, one color and the
//! current dice. It lists the reachable destinations in die order (die 0
//! before die 1) and can commit one of them, spending the die that pays for it.

use crate::board::{Board, Landing, Pawn, Position};
use crate::color::Color;
use crate::dice::{DiceEvent, DiceSet, Die};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from committing a move
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MoveError {
    #[error("No {0} pawn can leave {1}")]
    EmptySource(Color, Position),

    #[error("{0} is not a possible destination")]
    NotACandidate(Position),

    #[error("No possible moves")]
    NoCandidates,

    #[error("Die {0} cannot pay for this move")]
    DieUnavailable(usize),

    #[error("{0} is blocked")]
    Blocked(Position),
}

/// One reachable destination and the die that pays for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub die: usize,
    pub destination: Position,
}

/// Result of a committed move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub pawn: Pawn,
    pub from: Position,
    pub to: Position,
    /// Index of the die that paid for the move
    pub die: usize,
    /// The "used" notification of the die that paid for the move
    pub dice_event: DiceEvent,
    /// Opposing pawn sent to the bar, if any
    pub captured: Option<Pawn>,
}

/// Candidate moves from a single source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PossibleMoves {
    color: Color,
    source: Position,
    candidates: Vec<Candidate>,
}

impl PossibleMoves {
    /// Compute every destination `color` can reach from `source` with the
    /// dice that are still available.
    pub fn new(board: &Board, dice: &DiceSet, color: Color, source: Position) -> Self {
        let mut candidates = Vec::new();

        let has_mover = match source {
            Position::Bar => board.has_pawns_on_bar(color),
            Position::Field(_) => board.top_pawn(source).map_or(false, |p| p.color == color),
        };

        if has_mover {
            let start = source.index_for(color);
            for (die, value) in dice.iter().enumerate().filter(|(_, d)| d.is_available()) {
                let target = start + value.face() as i16 * color.direction() as i16;
                // Off-board targets would be bear-offs, which are not played
                let Some(destination) = Position::field(target) else {
                    continue;
                };
                if board.landing(destination, color).is_legal() {
                    candidates.push(Candidate { die, destination });
                }
            }
        }

        Self {
            color,
            source,
            candidates,
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn source(&self) -> Position {
        self.source
    }

    /// Re-entry mode: the source is the bar
    pub fn is_from_bar(&self) -> bool {
        self.source.is_bar()
    }

    /// Candidates in generation order
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn has_any_moves(&self) -> bool {
        !self.candidates.is_empty()
    }

    pub fn is_move_possible(&self, destination: Position) -> bool {
        self.candidates.iter().any(|c| c.destination == destination)
    }

    /// Drop all candidates. A cleared generator commits nothing.
    pub fn clear(&mut self) {
        self.candidates.clear();
    }

    /// Commit the first candidate in generation order
    pub fn do_first_move(
        &self,
        board: &mut Board,
        dice: &mut DiceSet,
    ) -> Result<MoveOutcome, MoveError> {
        let candidate = *self.candidates.first().ok_or(MoveError::NoCandidates)?;
        self.apply(candidate, board, dice)
    }

    /// Commit the move to `destination`, paid by the lowest-index die that
    /// reaches it
    pub fn move_to(
        &self,
        destination: Position,
        board: &mut Board,
        dice: &mut DiceSet,
    ) -> Result<MoveOutcome, MoveError> {
        let candidate = self
            .candidates
            .iter()
            .copied()
            .find(|c| c.destination == destination)
            .ok_or(MoveError::NotACandidate(destination))?;
        self.apply(candidate, board, dice)
    }

    fn apply(
        &self,
        candidate: Candidate,
        board: &mut Board,
        dice: &mut DiceSet,
    ) -> Result<MoveOutcome, MoveError> {
        let destination = candidate.destination;

        // The board or dice may have changed since the candidates were computed
        let landing = board.landing(destination, self.color);
        if !landing.is_legal() {
            return Err(MoveError::Blocked(destination));
        }
        if !dice.get(candidate.die).map_or(false, Die::is_available) {
            return Err(MoveError::DieUnavailable(candidate.die));
        }

        let pawn = board
            .take(self.source, self.color)
            .ok_or(MoveError::EmptySource(self.color, self.source))?;

        let captured = match landing {
            Landing::Capture(_) => {
                let victim = board.take(destination, self.color.opponent());
                if let Some(victim) = victim {
                    board
                        .put(Position::Bar, victim)
                        .map_err(|_| MoveError::Blocked(Position::Bar))?;
                }
                victim
            }
            _ => None,
        };

        board
            .put(destination, pawn)
            .map_err(|_| MoveError::Blocked(destination))?;

        let dice_event = dice
            .consume(candidate.die)
            .map_err(|_| MoveError::DieUnavailable(candidate.die))?;

        Ok(MoveOutcome {
            pawn,
            from: self.source,
            to: destination,
            die: candidate.die,
            dice_event,
            captured,
        })
    }
}

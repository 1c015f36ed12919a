//! Dice and dice-usage tracking.
//!
//! This module contains:
//! - `Die`: face value, rolling flag, and how much of the roll is spent
//! - `DiceSet`: the pair of dice used by both players
//! - `DiceEvent`: the "rolled" and "used" notifications the engine reacts to
//!
//! A die's usage only moves forward within one roll
//! (`Unused -> PartiallyUsed -> FullyUsed`) and is reset when the next roll begins.

use crate::engine::GameError;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Number of dice in play
pub const DICE_COUNT: usize = 2;

/// Valid face values
pub const DIE_FACES: RangeInclusive<u8> = 1..=6;

/// How much of a die's value has been spent this roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DieUsage {
    Unused,
    /// Doubles only: one of the two uses is spent
    PartiallyUsed,
    FullyUsed,
}

/// Notifications produced by the dice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiceEvent {
    /// A die finished rolling
    Rolled { die: usize, face: u8 },
    /// A die's usage advanced
    Used { die: usize, usage: DieUsage },
}

/// A single die
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Die {
    face: u8,
    rolling: bool,
    usage: DieUsage,
    /// Moves this die can still pay for (2 per die on doubles)
    uses_left: u8,
}

impl Default for Die {
    fn default() -> Self {
        // A die that has never been rolled has nothing to spend
        Self {
            face: 0,
            rolling: false,
            usage: DieUsage::FullyUsed,
            uses_left: 0,
        }
    }
}

impl Die {
    pub fn face(&self) -> u8 {
        self.face
    }

    pub fn is_rolling(&self) -> bool {
        self.rolling
    }

    pub fn has_finished_rolling(&self) -> bool {
        !self.rolling
    }

    pub fn usage(&self) -> DieUsage {
        self.usage
    }

    pub fn uses_left(&self) -> u8 {
        self.uses_left
    }

    /// Whether this die may feed move generation
    pub fn is_available(&self) -> bool {
        !self.rolling && self.usage != DieUsage::FullyUsed
    }

    fn begin_roll(&mut self) {
        self.rolling = true;
        self.usage = DieUsage::Unused;
        self.uses_left = 0;
    }

    fn settle(&mut self, face: u8) {
        self.face = face;
        self.rolling = false;
        self.uses_left = 1;
    }

    /// Spend one use. Returns the new usage.
    fn consume(&mut self) -> DieUsage {
        self.uses_left = self.uses_left.saturating_sub(1);
        self.usage = if self.uses_left == 0 {
            DieUsage::FullyUsed
        } else {
            DieUsage::PartiallyUsed
        };
        self.usage
    }
}

/// The dice shared by both players
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceSet {
    dice: [Die; DICE_COUNT],
}

impl Default for DiceSet {
    fn default() -> Self {
        Self::new()
    }
}

impl DiceSet {
    /// Create dice that have not been rolled yet
    pub fn new() -> Self {
        Self {
            dice: [Die::default(), Die::default()],
        }
    }

    /// Create dice that already settled on the given faces
    pub fn with_faces(first: u8, second: u8) -> Result<Self, GameError> {
        let mut dice = Self::new();
        dice.begin_roll();
        dice.settle(0, first)?;
        dice.settle(1, second)?;
        Ok(dice)
    }

    pub fn get(&self, index: usize) -> Option<&Die> {
        self.dice.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Die> {
        self.dice.iter()
    }

    pub fn len(&self) -> usize {
        self.dice.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dice.is_empty()
    }

    /// Face values in die order
    pub fn faces(&self) -> [u8; DICE_COUNT] {
        [self.dice[0].face, self.dice[1].face]
    }

    /// Both dice settled on the same face
    pub fn is_double(&self) -> bool {
        self.all_settled() && self.dice[0].face == self.dice[1].face
    }

    pub fn all_settled(&self) -> bool {
        self.dice.iter().all(Die::has_finished_rolling)
    }

    /// At least one die can still pay for a move
    pub fn is_any_available(&self) -> bool {
        self.dice.iter().any(Die::is_available)
    }

    pub fn all_fully_used(&self) -> bool {
        self.dice.iter().all(|d| d.usage == DieUsage::FullyUsed)
    }

    /// Total moves still payable across both dice
    pub fn remaining_uses(&self) -> u8 {
        self.dice
            .iter()
            .filter(|d| d.is_available())
            .map(|d| d.uses_left)
            .sum()
    }

    /// Start a new roll cycle: every die rolls and usage resets
    pub fn begin_roll(&mut self) {
        for die in &mut self.dice {
            die.begin_roll();
        }
    }

    /// Record a die settling on `face`.
    ///
    /// When the last die settles on the same face as the other, both dice are
    /// granted a second use.
    pub fn settle(&mut self, index: usize, face: u8) -> Result<DiceEvent, GameError> {
        if !DIE_FACES.contains(&face) {
            return Err(GameError::InvalidFace(face));
        }
        let die = self.dice.get_mut(index).ok_or(GameError::NoSuchDie(index))?;
        if !die.rolling {
            return Err(GameError::DieNotRolling(index));
        }
        die.settle(face);

        if self.is_double() {
            for die in &mut self.dice {
                die.uses_left = 2;
            }
        }

        Ok(DiceEvent::Rolled { die: index, face })
    }

    /// Spend one use of a die
    pub fn consume(&mut self, index: usize) -> Result<DiceEvent, GameError> {
        let die = self.dice.get_mut(index).ok_or(GameError::NoSuchDie(index))?;
        if !die.is_available() {
            return Err(GameError::DieUnavailable(index));
        }
        let usage = die.consume();
        Ok(DiceEvent::Used { die: index, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrolled_dice_are_unavailable() {
        let dice = DiceSet::new();
        assert!(!dice.is_any_available());
        assert!(dice.all_fully_used());
    }

    #[test]
    fn test_roll_resets_usage() {
        let mut dice = DiceSet::with_faces(3, 5).unwrap();
        dice.consume(0).unwrap();
        assert_eq!(dice.get(0).unwrap().usage(), DieUsage::FullyUsed);

        dice.begin_roll();
        for die in dice.iter() {
            assert!(die.is_rolling());
            assert_eq!(die.usage(), DieUsage::Unused);
            assert!(!die.is_available());
        }
    }

    #[test]
    fn test_single_use_per_die() {
        let mut dice = DiceSet::with_faces(3, 5).unwrap();
        assert_eq!(dice.remaining_uses(), 2);

        let event = dice.consume(1).unwrap();
        assert_eq!(
            event,
            DiceEvent::Used {
                die: 1,
                usage: DieUsage::FullyUsed
            }
        );
        assert!(dice.consume(1).is_err());
        assert!(dice.is_any_available());
    }

    #[test]
    fn test_doubles_grant_four_uses() {
        let mut dice = DiceSet::with_faces(2, 2).unwrap();
        assert!(dice.is_double());
        assert_eq!(dice.remaining_uses(), 4);

        assert_eq!(
            dice.consume(0).unwrap(),
            DiceEvent::Used {
                die: 0,
                usage: DieUsage::PartiallyUsed
            }
        );
        assert_eq!(
            dice.consume(0).unwrap(),
            DiceEvent::Used {
                die: 0,
                usage: DieUsage::FullyUsed
            }
        );
        dice.consume(1).unwrap();
        dice.consume(1).unwrap();
        assert!(dice.all_fully_used());
        assert_eq!(dice.remaining_uses(), 0);
    }

    #[test]
    fn test_with_faces_rejects_invalid_faces() {
        assert_eq!(DiceSet::with_faces(0, 3), Err(GameError::InvalidFace(0)));
        assert_eq!(DiceSet::with_faces(4, 7), Err(GameError::InvalidFace(7)));
        assert_eq!(DiceSet::with_faces(6, 1).unwrap().faces(), [6, 1]);
    }

    #[test]
    fn test_settle_validation() {
        let mut dice = DiceSet::new();
        // Not rolling yet
        assert!(matches!(dice.settle(0, 3), Err(GameError::DieNotRolling(0))));

        dice.begin_roll();
        assert!(matches!(dice.settle(0, 7), Err(GameError::InvalidFace(7))));
        assert!(matches!(dice.settle(2, 3), Err(GameError::NoSuchDie(2))));

        assert_eq!(
            dice.settle(0, 4).unwrap(),
            DiceEvent::Rolled { die: 0, face: 4 }
        );
        assert!(!dice.all_settled());
        assert!(!dice.is_double());
    }

    #[test]
    fn test_settled_die_waits_for_other() {
        let mut dice = DiceSet::new();
        dice.begin_roll();
        dice.settle(0, 6).unwrap();

        assert!(dice.get(0).unwrap().is_available());
        assert!(!dice.get(1).unwrap().is_available());
    }
}

//! Player colors.
//!
//! Backgammon is always played by exactly two colors. The color also fixes the
//! direction a player's pawns travel around the 24 fields.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    /// Moves from field 0 toward field 23, enters from index -1
    Red,
    /// Moves from field 23 toward field 0, enters from index 24
    White,
}

impl Color {
    /// Both colors, Red first
    pub const ALL: [Color; 2] = [Color::Red, Color::White];

    /// The other player
    pub fn opponent(self) -> Self {
        match self {
            Color::Red => Color::White,
            Color::White => Color::Red,
        }
    }

    /// Index step per pip for this color's pawns
    pub fn direction(self) -> i8 {
        match self {
            Color::Red => 1,
            Color::White => -1,
        }
    }

    /// Virtual field index of the bar for this color.
    ///
    /// A pawn entering from the bar lands on `bar_index + face * direction`,
    /// so Red enters on fields 0..=5 and White on fields 18..=23.
    pub fn bar_index(self) -> i8 {
        match self {
            Color::Red => -1,
            Color::White => 24,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => write!(f, "Red"),
            Color::White => write!(f, "White"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opponent_is_involution() {
        for color in Color::ALL {
            assert_ne!(color.opponent(), color);
            assert_eq!(color.opponent().opponent(), color);
        }
    }

    #[test]
    fn test_colors_travel_in_opposite_directions() {
        assert_eq!(Color::Red.direction(), 1);
        assert_eq!(Color::White.direction(), -1);
    }

    #[test]
    fn test_entry_fields() {
        // A one enters on the first field of each side
        assert_eq!(Color::Red.bar_index() + Color::Red.direction(), 0);
        assert_eq!(Color::White.bar_index() + Color::White.direction(), 23);
    }
}

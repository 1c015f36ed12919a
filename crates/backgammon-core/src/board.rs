//! Board positions and pawn ownership.
//!
//! This module contains:
//! - `Position`: one of the 24 fields, or the shared bar
//! - `Pawn`: a checker of one color
//! - `Board`: the containers that own every pawn
//! - `Layout`: the initial placement supplied at setup
//!
//! A pawn lives in exactly one container. Moving a pawn pops it from one
//! container and pushes it onto another; nothing else holds a copy.

use crate::color::Color;
use crate::engine::GameError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of fields around the board
pub const FIELD_COUNT: usize = 24;

/// Pawns each color starts with in the standard layout
pub const PAWNS_PER_COLOR: usize = 15;

/// Pawn identifier, unique for the game
pub type PawnId = u8;

/// A place that can hold pawns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    /// One of the 24 fields, 0..=23
    Field(u8),
    /// Holding area for captured pawns of both colors
    Bar,
}

impl Position {
    /// Field at a signed index, if it lies on the board
    pub fn field(index: i16) -> Option<Self> {
        if (0..FIELD_COUNT as i16).contains(&index) {
            Some(Position::Field(index as u8))
        } else {
            None
        }
    }

    /// All 24 fields in index order
    pub fn fields() -> impl Iterator<Item = Position> {
        (0..FIELD_COUNT as u8).map(Position::Field)
    }

    /// Signed index as seen by `color`: fields keep their index, the bar sits
    /// just before that color's first field.
    pub fn index_for(self, color: Color) -> i16 {
        match self {
            Position::Field(index) => index as i16,
            Position::Bar => color.bar_index() as i16,
        }
    }

    pub fn is_bar(self) -> bool {
        matches!(self, Position::Bar)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Field(index) => write!(f, "field {}", index),
            Position::Bar => write!(f, "bar"),
        }
    }
}

/// A single pawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pawn {
    pub id: PawnId,
    pub color: Color,
}

/// What happens when a pawn of some color lands on a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    Empty,
    /// Field already holds the mover's pawns
    Stack,
    /// Field holds a single opposing pawn, which gets sent to the bar
    Capture(PawnId),
    /// Two or more opposing pawns, or not a field at all
    Blocked,
}

impl Landing {
    pub fn is_legal(self) -> bool {
        !matches!(self, Landing::Blocked)
    }
}

/// Standard starting layout, from Red's point of view (Red moves up)
const STANDARD_LAYOUT: [(u8, Color, usize); 8] = [
    (0, Color::Red, 2),
    (11, Color::Red, 5),
    (16, Color::Red, 3),
    (18, Color::Red, 5),
    (23, Color::White, 2),
    (12, Color::White, 5),
    (7, Color::White, 3),
    (5, Color::White, 5),
];

/// The 24 fields and the bar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Arrival-ordered stacks; the last pawn is the top
    fields: Vec<Vec<Pawn>>,
    /// Captured pawns of both colors, arrival-ordered
    bar: Vec<Pawn>,
    next_id: PawnId,
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}

impl Board {
    /// A board with no pawns at all
    pub fn empty() -> Self {
        Self {
            fields: vec![Vec::new(); FIELD_COUNT],
            bar: Vec::new(),
            next_id: 0,
        }
    }

    /// The usual 15-per-color starting position
    pub fn standard() -> Self {
        let mut board = Self::empty();
        for (field, color, count) in STANDARD_LAYOUT {
            for _ in 0..count {
                let pawn = board.new_pawn(color);
                board.fields[field as usize].push(pawn);
            }
        }
        board
    }

    fn new_pawn(&mut self, color: Color) -> Pawn {
        let pawn = Pawn {
            id: self.next_id,
            color,
        };
        self.next_id += 1;
        pawn
    }

    fn container(&self, position: Position) -> Option<&Vec<Pawn>> {
        match position {
            Position::Field(index) => self.fields.get(index as usize),
            Position::Bar => Some(&self.bar),
        }
    }

    fn container_mut(&mut self, position: Position) -> Option<&mut Vec<Pawn>> {
        match position {
            Position::Field(index) => self.fields.get_mut(index as usize),
            Position::Bar => Some(&mut self.bar),
        }
    }

    /// Create `count` new pawns of `color` at `position`.
    ///
    /// Fields only ever hold one color, so placing onto a field held by the
    /// other color is rejected. A color never has more than
    /// [`PAWNS_PER_COLOR`] pawns on the board.
    pub fn place(&mut self, position: Position, color: Color, count: usize) -> Result<(), GameError> {
        let container = self
            .container(position)
            .ok_or(GameError::InvalidPosition(position))?;
        if let (Position::Field(index), Some(first)) = (position, container.first()) {
            if first.color != color {
                return Err(GameError::FieldOccupied {
                    field: index,
                    color: first.color,
                });
            }
        }
        let total = self.total_pawns(color).saturating_add(count);
        if total > PAWNS_PER_COLOR {
            return Err(GameError::TooManyPawns { color, count: total });
        }

        for _ in 0..count {
            let pawn = self.new_pawn(color);
            if let Some(container) = self.container_mut(position) {
                container.push(pawn);
            }
        }
        Ok(())
    }

    /// Pawns at a position in arrival order (empty for off-board fields)
    pub fn pawns(&self, position: Position) -> &[Pawn] {
        self.container(position).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Most recently arrived pawn at a position
    pub fn top_pawn(&self, position: Position) -> Option<&Pawn> {
        self.pawns(position).last()
    }

    /// Most recently arrived pawn of `color` at a position
    pub fn top_pawn_of(&self, position: Position, color: Color) -> Option<&Pawn> {
        self.pawns(position).iter().rev().find(|p| p.color == color)
    }

    /// Number of `color` pawns at a position
    pub fn count(&self, position: Position, color: Color) -> usize {
        self.pawns(position).iter().filter(|p| p.color == color).count()
    }

    /// Color and count held by a field. The bar can hold both colors, so it
    /// reports `None`; use [`Board::count`] for it.
    pub fn occupant(&self, position: Position) -> Option<(Color, usize)> {
        if position.is_bar() {
            return None;
        }
        let pawns = self.pawns(position);
        pawns.first().map(|p| (p.color, pawns.len()))
    }

    pub fn is_empty_at(&self, position: Position) -> bool {
        self.pawns(position).is_empty()
    }

    pub fn has_pawns_on_bar(&self, color: Color) -> bool {
        self.bar.iter().any(|p| p.color == color)
    }

    /// Pawns of `color` across every position
    pub fn total_pawns(&self, color: Color) -> usize {
        self.fields
            .iter()
            .chain(std::iter::once(&self.bar))
            .flatten()
            .filter(|p| p.color == color)
            .count()
    }

    /// Where a pawn currently lives
    pub fn locate(&self, id: PawnId) -> Option<Position> {
        if self.bar.iter().any(|p| p.id == id) {
            return Some(Position::Bar);
        }
        self.fields
            .iter()
            .position(|field| field.iter().any(|p| p.id == id))
            .map(|index| Position::Field(index as u8))
    }

    /// Fields whose pawns belong to `color`
    pub fn fields_of(&self, color: Color) -> impl Iterator<Item = Position> + '_ {
        Position::fields().filter(move |&pos| {
            self.occupant(pos)
                .map_or(false, |(owner, _)| owner == color)
        })
    }

    /// Classify a landing of a `color` pawn on `position`
    pub fn landing(&self, position: Position, color: Color) -> Landing {
        if position.is_bar() {
            return Landing::Blocked;
        }
        match self.container(position) {
            None => Landing::Blocked,
            Some(pawns) => match pawns.as_slice() {
                [] => Landing::Empty,
                [only] if only.color != color => Landing::Capture(only.id),
                [first, ..] if first.color == color => Landing::Stack,
                _ => Landing::Blocked,
            },
        }
    }

    /// Remove the top pawn of `color` from a position
    pub fn take(&mut self, position: Position, color: Color) -> Option<Pawn> {
        let container = self.container_mut(position)?;
        let index = container.iter().rposition(|p| p.color == color)?;
        if !position.is_bar() && index + 1 != container.len() {
            // Only the top of a field stack may leave
            return None;
        }
        Some(container.remove(index))
    }

    /// Push a pawn onto a position
    pub fn put(&mut self, position: Position, pawn: Pawn) -> Result<(), GameError> {
        let container = self
            .container_mut(position)
            .ok_or(GameError::InvalidPosition(position))?;
        container.push(pawn);
        Ok(())
    }
}

/// One entry of an initial layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub position: Position,
    pub color: Color,
    pub count: usize,
}

/// Initial pawn placement supplied at setup time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub placements: Vec<Placement>,
}

impl Default for Layout {
    fn default() -> Self {
        Self::standard()
    }
}

impl Layout {
    /// The usual starting position as a layout
    pub fn standard() -> Self {
        Self {
            placements: STANDARD_LAYOUT
                .iter()
                .map(|&(field, color, count)| Placement {
                    position: Position::Field(field),
                    color,
                    count,
                })
                .collect(),
        }
    }

    /// Build a board from this layout
    pub fn build(&self) -> Result<Board, GameError> {
        let mut board = Board::empty();
        for placement in &self.placements {
            board.place(placement.position, placement.color, placement.count)?;
        }
        Ok(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_standard_board_has_15_pawns_per_color() {
        let board = Board::standard();
        for color in Color::ALL {
            assert_eq!(board.total_pawns(color), PAWNS_PER_COLOR);
            assert!(!board.has_pawns_on_bar(color));
        }
    }

    #[test]
    fn test_standard_layout_is_mirrored() {
        let board = Board::standard();
        for field in 0..FIELD_COUNT as u8 {
            let red = board.occupant(Position::Field(field));
            let white = board.occupant(Position::Field(23 - field));
            assert_eq!(
                red.map(|(c, n)| (c.opponent(), n)),
                white,
                "field {} should mirror field {}",
                field,
                23 - field
            );
        }
    }

    #[test]
    fn test_layout_builds_same_board() {
        assert_eq!(Layout::standard().build().unwrap(), Board::standard());
    }

    #[test]
    fn test_position_indices() {
        assert_eq!(Position::Field(7).index_for(Color::Red), 7);
        assert_eq!(Position::Field(7).index_for(Color::White), 7);
        assert_eq!(Position::Bar.index_for(Color::Red), -1);
        assert_eq!(Position::Bar.index_for(Color::White), 24);
        assert_eq!(Position::field(-1), None);
        assert_eq!(Position::field(24), None);
        assert_eq!(Position::field(23), Some(Position::Field(23)));
    }

    #[test]
    fn test_place_rejects_mixed_field() {
        let mut board = Board::empty();
        board.place(Position::Field(4), Color::Red, 2).unwrap();
        assert!(matches!(
            board.place(Position::Field(4), Color::White, 1),
            Err(GameError::FieldOccupied {
                field: 4,
                color: Color::Red
            })
        ));
        assert!(matches!(
            board.place(Position::Field(30), Color::White, 1),
            Err(GameError::InvalidPosition(_))
        ));
        // The bar takes both colors
        board.place(Position::Bar, Color::Red, 1).unwrap();
        board.place(Position::Bar, Color::White, 1).unwrap();
        assert_eq!(board.count(Position::Bar, Color::Red), 1);
        assert_eq!(board.count(Position::Bar, Color::White), 1);
        assert_eq!(board.occupant(Position::Bar), None);
    }

    #[test]
    fn test_place_caps_pawns_per_color() {
        let mut board = Board::empty();
        board.place(Position::Field(0), Color::Red, 10).unwrap();
        board.place(Position::Bar, Color::Red, 5).unwrap();
        assert_eq!(
            board.place(Position::Field(1), Color::Red, 1),
            Err(GameError::TooManyPawns {
                color: Color::Red,
                count: 16
            })
        );
        assert_eq!(board.total_pawns(Color::Red), PAWNS_PER_COLOR);

        // The cap is per color, and every pawn keeps its own id
        board.place(Position::Field(23), Color::White, 15).unwrap();
        let white = board.top_pawn(Position::Field(23)).unwrap().id;
        assert_eq!(board.locate(white), Some(Position::Field(23)));
        assert!(board.pawns(Position::Field(0)).iter().all(|p| p.id != white));
    }

    #[test]
    fn test_landing_rules() {
        let mut board = Board::empty();
        board.place(Position::Field(1), Color::Red, 1).unwrap();
        board.place(Position::Field(2), Color::White, 1).unwrap();
        board.place(Position::Field(3), Color::White, 2).unwrap();

        assert_eq!(board.landing(Position::Field(0), Color::Red), Landing::Empty);
        assert_eq!(board.landing(Position::Field(1), Color::Red), Landing::Stack);
        let white_id = board.top_pawn(Position::Field(2)).unwrap().id;
        assert_eq!(
            board.landing(Position::Field(2), Color::Red),
            Landing::Capture(white_id)
        );
        assert_eq!(board.landing(Position::Field(3), Color::Red), Landing::Blocked);
        assert_eq!(board.landing(Position::Bar, Color::Red), Landing::Blocked);
    }

    #[test]
    fn test_take_and_put_transfer_ownership() {
        let mut board = Board::empty();
        board.place(Position::Field(10), Color::Red, 2).unwrap();
        let top = *board.top_pawn(Position::Field(10)).unwrap();

        let pawn = board.take(Position::Field(10), Color::Red).unwrap();
        assert_eq!(pawn, top);
        board.put(Position::Field(14), pawn).unwrap();

        assert_eq!(board.locate(pawn.id), Some(Position::Field(14)));
        assert_eq!(board.count(Position::Field(10), Color::Red), 1);
        assert_eq!(board.total_pawns(Color::Red), 2);
    }

    #[test]
    fn test_take_from_bar_picks_color() {
        let mut board = Board::empty();
        board.place(Position::Bar, Color::White, 1).unwrap();
        board.place(Position::Bar, Color::Red, 1).unwrap();
        board.place(Position::Bar, Color::White, 1).unwrap();

        let red = board.take(Position::Bar, Color::Red).unwrap();
        assert_eq!(red.color, Color::Red);
        assert!(!board.has_pawns_on_bar(Color::Red));
        assert_eq!(board.count(Position::Bar, Color::White), 2);
        assert!(board.take(Position::Field(0), Color::Red).is_none());
    }

    #[test]
    fn test_fields_of() {
        let board = Board::standard();
        let red: Vec<_> = board.fields_of(Color::Red).collect();
        assert_eq!(
            red,
            vec![
                Position::Field(0),
                Position::Field(11),
                Position::Field(16),
                Position::Field(18)
            ]
        );
    }
}

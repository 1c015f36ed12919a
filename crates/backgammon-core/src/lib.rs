//! Backgammon turn engine
//!
//! This crate provides the rules core of a two-player backgammon game:
//! - Phase state machine deciding whose turn it is and what they may do
//! - Dice usage tracking, including doubles
//! - Legal-move generation and move application with captures
//! - Re-entry of captured pawns from the bar, skipping the turn when blocked
//!
//! # Architecture
//!
//! The engine is synchronous and owns all game state. Rendering, input,
//! dice animation and networking live outside; they feed the engine
//! `GameAction`s and consume the `GameEvent`s it returns.
//!
//! # Modules
//!
//! - [`color`]: The two players and their direction of travel
//! - [`dice`]: Dice and their usage within a roll
//! - [`board`]: Fields, the bar, pawns, and the initial layout
//! - [`moves`]: Candidate generation and move commits
//! - [`engine`]: Phase machine and turn logic
//! - [`bot`]: Move-picking hook for AI players

pub mod actions;
pub mod board;
pub mod bot;
pub mod color;
pub mod config;
pub mod dice;
pub mod engine;
pub mod moves;

// Re-export commonly used types
pub use actions::{GameAction, GameEvent};
pub use board::{Board, Landing, Layout, Pawn, PawnId, Placement, Position, FIELD_COUNT, PAWNS_PER_COLOR};
pub use bot::{Bot, MovePolicy};
pub use color::Color;
pub use config::{ConfigError, GameConfig};
pub use dice::{DiceEvent, DiceSet, Die, DieUsage};
pub use engine::{GameError, Phase, StateListener, TurnEngine};
pub use moves::{Candidate, MoveError, MoveOutcome, PossibleMoves};

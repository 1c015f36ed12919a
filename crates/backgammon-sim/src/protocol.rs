//! Messages exchanged with a running game session.

use backgammon_core::{Color, Phase, PawnId, Position};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Inputs delivered to a session, one at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum SessionCommand {
    /// Leave `Init`; sent by the start timer
    Start,

    /// The roll button was pressed
    Roll,

    /// A die finished its animation
    DieSettled { die: usize, face: u8 },

    /// A pawn was picked up
    Select { source: Position },

    /// A destination field was clicked
    FieldClicked { destination: Position },

    /// The peer's echo of a turn hand-over
    PeerTurnEnded { player: Color, next_player: Color },
}

/// Notifications published by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum SessionUpdate {
    PhaseChanged { from: Phase, to: Phase },

    PawnMoved {
        player: Color,
        pawn: PawnId,
        from: Position,
        to: Position,
    },

    /// The turn passed to the other player; relayed to the peer
    TurnEnded { player: Color, next_player: Color },

    /// The session could not produce another input
    Stalled { phase: Phase, reason: String },
}

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Waiting,
    Running,
    Finished,
    Stalled,
}

/// Registry entry for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub seed: u64,
    pub status: SessionStatus,
    pub phase: Phase,
}

/// Totals reported when a session ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub seed: u64,
    pub status: SessionStatus,
    pub final_phase: Phase,
    /// Completed turns
    pub turns: u32,
    pub moves: u32,
    pub captures: u32,
    pub skipped_turns: u32,
    pub no_legal_moves: u32,
    /// Peer echoes that disagreed with the local turn owner
    pub relay_mismatches: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_wire_format() {
        let command = SessionCommand::DieSettled { die: 0, face: 3 };
        assert_eq!(
            serde_json::to_value(&command).unwrap(),
            json!({ "type": "DieSettled", "payload": { "die": 0, "face": 3 } })
        );

        let start: SessionCommand = serde_json::from_value(json!({ "type": "Start" })).unwrap();
        assert_eq!(start, SessionCommand::Start);
    }

    #[test]
    fn test_update_wire_format() {
        let update = SessionUpdate::TurnEnded {
            player: Color::Red,
            next_player: Color::White,
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({ "type": "TurnEnded", "payload": { "player": "Red", "next_player": "White" } })
        );

        let click: SessionCommand = serde_json::from_value(json!({
            "type": "FieldClicked",
            "payload": { "destination": { "Field": 14 } }
        }))
        .unwrap();
        assert_eq!(
            click,
            SessionCommand::FieldClicked {
                destination: Position::Field(14)
            }
        );
    }
}

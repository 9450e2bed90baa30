//! Wire messages exchanged between a client and the controlling server
//!
//! Every frame is a JSON object `{"type": "<kind>", "payload": {...}}`.

use crate::error::{HubError, Result};
use crate::types::{Board, Cell, GameResult};
use serde::{Deserialize, Serialize};

/// Message kinds as they appear in the `type` field
pub const START_GAME: &str = "start-game";
pub const REQUEST_MOVE: &str = "request-move";
pub const PLAYER_MOVE: &str = "player-move";
pub const WALKOVER: &str = "walkover";
pub const SWITCH_SERVER: &str = "switch-server";

/// Sent to both players once they are matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGamePayload {
    pub cell_type: Cell,
    pub board: Board,
}

/// Asks the player whose turn it is for a move
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMovePayload {}

/// A move, sent by the client when asked and relayed by the server to the opponent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMovePayload {
    pub cell_type: Cell,
    pub position: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_result: Option<GameResult>,
    #[serde(default)]
    pub is_move_requested: bool,
}

impl PlayerMovePayload {
    /// A plain move as sent by a client
    pub fn new(cell_type: Cell, position: u8) -> Self {
        Self {
            cell_type,
            position,
            game_result: None,
            is_move_requested: false,
        }
    }
}

/// The game ended because the opponent left
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkoverPayload {
    pub game_result: GameResult,
}

/// Redirects the client to a newly designated controlling server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchServerPayload {
    pub new_master_server: String,
}

/// Tagged union of every wire message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum Message {
    StartGame(StartGamePayload),
    RequestMove(RequestMovePayload),
    PlayerMove(PlayerMovePayload),
    Walkover(WalkoverPayload),
    SwitchServer(SwitchServerPayload),
}

impl Message {
    pub fn start_game(cell_type: Cell, board: Board) -> Self {
        Message::StartGame(StartGamePayload { cell_type, board })
    }

    pub fn request_move() -> Self {
        Message::RequestMove(RequestMovePayload {})
    }

    pub fn walkover(game_result: GameResult) -> Self {
        Message::Walkover(WalkoverPayload { game_result })
    }

    pub fn switch_server(host: impl Into<String>) -> Self {
        Message::SwitchServer(SwitchServerPayload {
            new_master_server: host.into(),
        })
    }

    /// The wire name of this message kind
    pub fn kind(&self) -> &'static str {
        match self {
            Message::StartGame(_) => START_GAME,
            Message::RequestMove(_) => REQUEST_MOVE,
            Message::PlayerMove(_) => PLAYER_MOVE,
            Message::Walkover(_) => WALKOVER,
            Message::SwitchServer(_) => SWITCH_SERVER,
        }
    }

    /// Serialize to a JSON text frame
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            HubError::InternalError {
                message: format!("Failed to serialize '{}' message: {}", self.kind(), e),
            }
            .into()
        })
    }

    /// Deserialize a JSON text frame
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| {
            HubError::ProtocolDecode {
                expected: kind_hint(text),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

/// Best-effort read of the `type` field for error reporting
fn kind_hint(text: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        #[serde(rename = "type")]
        kind: String,
    }

    serde_json::from_str::<Envelope>(text)
        .map(|envelope| envelope.kind)
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BOARD_SIZE;

    #[test]
    fn test_envelope_shape() {
        let json = Message::switch_server("b").encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "switch-server");
        assert_eq!(value["payload"]["newMasterServer"], "b");
    }

    #[test]
    fn test_decode_player_move() {
        let message = Message::decode(
            r#"{"type":"player-move","payload":{"cellType":"O","position":4,"gameResult":"o_wins","isMoveRequested":false}}"#,
        )
        .unwrap();

        assert_eq!(
            message,
            Message::PlayerMove(PlayerMovePayload {
                cell_type: Cell::O,
                position: 4,
                game_result: Some(GameResult::OWins),
                is_move_requested: false,
            })
        );
    }

    #[test]
    fn test_decode_player_move_defaults() {
        let message =
            Message::decode(r#"{"type":"player-move","payload":{"cellType":"X","position":0}}"#)
                .unwrap();
        assert_eq!(message, Message::PlayerMove(PlayerMovePayload::new(Cell::X, 0)));
    }

    #[test]
    fn test_start_game_board_encoding() {
        let mut board = [Cell::Empty; BOARD_SIZE];
        board[0] = Cell::X;
        let json = Message::start_game(Cell::O, board).encode().unwrap();
        assert!(json.contains(r#""cellType":"O""#));
        assert!(json.contains(r#""board":["X"," "," "," "," "," "," "," "," "]"#));
    }

    #[test]
    fn test_request_move_has_empty_payload() {
        let json = Message::request_move().encode().unwrap();
        assert_eq!(json, r#"{"type":"request-move","payload":{}}"#);
    }

    #[test]
    fn test_malformed_payload_reports_kind() {
        let err = Message::decode(r#"{"type":"walkover","payload":{"gameResult":42}}"#)
            .unwrap_err();
        match err.downcast_ref::<HubError>() {
            Some(HubError::ProtocolDecode { expected, .. }) => assert_eq!(expected, "walkover"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!(Message::decode(r#"{"type":"resign","payload":{}}"#).is_err());
        assert!(Message::decode("not json").is_err());
    }
}

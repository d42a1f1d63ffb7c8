use serde::{Deserialize, Serialize};

use crate::models::{Grid, Pointer};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Guess for the currently highlighted word. The client clears its
    /// input field after sending, whatever the outcome.
    Submit { input: String },
    Skip,
    Restart,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full snapshot, pushed after every state-changing event
    GameState {
        grid: Grid,
        pointer: Option<Pointer>,
        score: u32,
        skips_left: u8,
        game_over: bool,
        high_score: i64,
    },
    Feedback {
        text: String,
    },
    FeedbackCleared,
    ScorePopup {
        text: String,
    },
    ScorePopupCleared,
    GameOver {
        final_score: u32,
        high_score: i64,
    },
    Error {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_wire_format() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type": "submit", "input": "stream"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Submit { input } if input == "stream"));

        let msg: ClientMessage = serde_json::from_str(r#"{"type": "skip"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Skip));
    }

    #[test]
    fn test_server_message_is_tagged() {
        let msg = ServerMessage::ScorePopup {
            text: "+80".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "score_popup");
        assert_eq!(json["text"], "+80");
    }
}

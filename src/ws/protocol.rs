//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::game::MatchEvent;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Run a match; the raw payload is validated server side
    StartMatch { config: Value },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome { session_id: Uuid, server_time: u64 },

    /// Configuration accepted, match is starting
    MatchAccepted {
        match_id: Uuid,
        /// Seed used for random placement
        seed: u64,
    },

    /// A lifecycle event of a running match
    MatchEvent { match_id: Uuid, event: MatchEvent },

    /// Error message
    Error {
        code: ErrorCode,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

impl ServerMsg {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMsg::Error {
            code,
            message: message.into(),
            details: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidMatchConfiguration,
    MatchAlreadyRunning,
    MalformedMessage,
    RateLimited,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_messages() {
        let start: ClientMsg = serde_json::from_value(json!({
            "type": "start_match",
            "config": { "setup": { "edgeLength": 4 } }
        }))
        .unwrap();
        assert!(matches!(start, ClientMsg::StartMatch { config } if config["setup"]["edgeLength"] == 4));

        let ping: ClientMsg = serde_json::from_str(r#"{"type":"ping","t":12}"#).unwrap();
        assert!(matches!(ping, ClientMsg::Ping { t: 12 }));

        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"join_match"}"#).is_err());
    }

    #[test]
    fn test_server_message_shapes() {
        let match_id = Uuid::nil();
        let event = ServerMsg::MatchEvent {
            match_id,
            event: MatchEvent::MatchStarted,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "match_event",
                "match_id": match_id,
                "event": { "event": "MATCH_STARTED" }
            })
        );

        let error = ServerMsg::error(ErrorCode::MatchAlreadyRunning, "busy");
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({ "type": "error", "code": "MATCH_ALREADY_RUNNING", "message": "busy" })
        );
    }
}

//! Lifecycle notifications emitted by a running match

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::models::{MatchResult, PlayerPosition};
use super::snapshot::TickSnapshot;

/// Observable match lifecycle, in emission order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchEvent {
    MatchStarted,
    Tick(TickSnapshot),
    /// Position after the move, possibly outside the cube
    PlayerMoveAttempted(PlayerPosition),
    /// Carries the bomb's coordinate, not the player's
    PlayerPlacedBomb(PlayerPosition),
    PlayerIdle(PlayerPosition),
    PlayerEliminated { name: String, cause: String },
    MatchEnded(MatchResult),
}

impl MatchEvent {
    /// Wire name of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            MatchEvent::MatchStarted => "MATCH_STARTED",
            MatchEvent::Tick(_) => "TICK",
            MatchEvent::PlayerMoveAttempted(_) => "PLAYER_MOVE_ATTEMPTED",
            MatchEvent::PlayerPlacedBomb(_) => "PLAYER_PLACED_BOMB",
            MatchEvent::PlayerIdle(_) => "PLAYER_IDLE",
            MatchEvent::PlayerEliminated { .. } => "PLAYER_ELIMINATED",
            MatchEvent::MatchEnded(_) => "MATCH_ENDED",
        }
    }
}

/// Why a player left the match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EliminationCause {
    SteppedOnBomb,
    Collision,
    OutOfBounds,
    /// Bot call failed; carries the error description
    AgentFault(String),
}

impl std::fmt::Display for EliminationCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EliminationCause::SteppedOnBomb => f.write_str("stepped on a BOMB"),
            EliminationCause::Collision => f.write_str("crashed into another player"),
            EliminationCause::OutOfBounds => f.write_str("moved out of bounds"),
            EliminationCause::AgentFault(reason) => f.write_str(reason),
        }
    }
}

/// Receiver of match lifecycle events. Must not block.
pub trait MatchNotifier: Send + Sync {
    fn notify(&self, event: MatchEvent);
}

impl MatchNotifier for mpsc::UnboundedSender<MatchEvent> {
    fn notify(&self, event: MatchEvent) {
        // Observer gone; the match keeps running regardless
        let _ = self.send(event);
    }
}

impl<N: MatchNotifier + ?Sized> MatchNotifier for Arc<N> {
    fn notify(&self, event: MatchEvent) {
        (**self).notify(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::geometry::Coordinate;
    use serde_json::json;

    #[test]
    fn test_event_wire_shape() {
        assert_eq!(
            serde_json::to_value(MatchEvent::MatchStarted).unwrap(),
            json!({ "event": "MATCH_STARTED" })
        );

        let moved = MatchEvent::PlayerMoveAttempted(PlayerPosition::new(
            "A",
            Coordinate::new(-1, 0, 0),
        ));
        assert_eq!(
            serde_json::to_value(&moved).unwrap(),
            json!({ "event": "PLAYER_MOVE_ATTEMPTED", "data": { "name": "A", "x": -1, "y": 0, "z": 0 } })
        );
        assert_eq!(moved.kind(), "PLAYER_MOVE_ATTEMPTED");

        let lost = MatchEvent::PlayerEliminated {
            name: "A".to_string(),
            cause: EliminationCause::OutOfBounds.to_string(),
        };
        assert_eq!(
            serde_json::to_value(&lost).unwrap(),
            json!({ "event": "PLAYER_ELIMINATED", "data": { "name": "A", "cause": "moved out of bounds" } })
        );
    }

    #[test]
    fn test_channel_notifier_survives_dropped_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        tx.notify(MatchEvent::MatchStarted);
    }
}

//! Match data model shared by the engine, the validators and the wire layer

use serde::{Deserialize, Serialize};

use super::geometry::Coordinate;

/// A bot taking part in a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSetup {
    /// Unique within a match
    pub name: String,
    /// URL the bot answers tick requests on
    pub endpoint: String,
}

impl PlayerSetup {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// Current cell of a live player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPosition {
    pub name: String,
    #[serde(flatten)]
    pub coordinate: Coordinate,
}

impl PlayerPosition {
    pub fn new(name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            name: name.into(),
            coordinate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    Bomb,
}

/// Something lying on the grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameItem {
    #[serde(flatten)]
    pub coordinate: Coordinate,
    #[serde(rename = "type")]
    pub kind: ItemKind,
}

impl GameItem {
    pub fn bomb(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            kind: ItemKind::Bomb,
        }
    }

    pub fn is_bomb(&self) -> bool {
        self.kind == ItemKind::Bomb
    }
}

/// Rules of a single match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSetup {
    /// Side of the cube, >= 1
    pub edge_length: u32,
    /// Pause between ticks
    pub tick_delay_ms: u64,
    /// Exact number of decisions a bot returns per tick, >= 1
    pub tasks_per_tick: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_ticks: Option<u64>,
    /// Either covers every player or is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_positions: Option<Vec<PlayerPosition>>,
}

/// A validated match request. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    pub setup: MatchSetup,
    pub players: Vec<PlayerSetup>,
}

impl MatchConfig {
    pub fn player(&self, name: &str) -> Option<&PlayerSetup> {
        self.players.iter().find(|p| p.name == name)
    }
}

/// Players that ended a tick on the same cell, possibly on a bomb
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionRecord {
    pub coordinate: Coordinate,
    pub has_bomb: bool,
    pub players: Vec<PlayerPosition>,
}

impl CollisionRecord {
    pub fn new(coordinate: Coordinate, has_bomb: bool) -> Self {
        Self {
            coordinate,
            has_bomb,
            players: Vec::new(),
        }
    }
}

/// A player together with the tick it lasted until
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EliminatedPlayer {
    #[serde(flatten)]
    pub player: PlayerSetup,
    pub score_at_elimination: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchOutcome {
    WinnerFound,
    Tie,
}

/// Final standings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub outcome: MatchOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<EliminatedPlayer>,
    /// Elimination order; the winner, if any, comes last
    pub standings: Vec<EliminatedPlayer>,
}

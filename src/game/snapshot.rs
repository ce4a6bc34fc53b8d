//! Per-tick world snapshots and the request body sent to bots

use serde::{Deserialize, Serialize};

use super::models::{GameItem, MatchSetup, PlayerPosition, PlayerSetup};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    pub edge_length: u32,
    pub tasks_per_tick: u32,
    pub num_of_bots_in_play: usize,
    pub current_tick: u64,
}

/// Read-only view of the world at the start of a tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickSnapshot {
    pub players: Vec<PlayerPosition>,
    pub items: Vec<GameItem>,
    pub game_info: GameInfo,
}

impl TickSnapshot {
    pub fn capture(
        tick: u64,
        setup: &MatchSetup,
        players: &[PlayerPosition],
        items: &[GameItem],
    ) -> Self {
        Self {
            players: players.to_vec(),
            items: items.to_vec(),
            game_info: GameInfo {
                edge_length: setup.edge_length,
                tasks_per_tick: setup.tasks_per_tick,
                num_of_bots_in_play: players.len(),
                current_tick: tick,
            },
        }
    }
}

/// Body POSTed to a bot: the shared snapshot plus who is being asked
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotRequest<'a> {
    #[serde(flatten)]
    pub snapshot: &'a TickSnapshot,
    pub current_player: &'a PlayerSetup,
}

impl<'a> BotRequest<'a> {
    pub fn new(snapshot: &'a TickSnapshot, current_player: &'a PlayerSetup) -> Self {
        Self {
            snapshot,
            current_player,
        }
    }

    pub fn tasks_per_tick(&self) -> u32 {
        self.snapshot.game_info.tasks_per_tick
    }
}

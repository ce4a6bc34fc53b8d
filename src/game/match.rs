//! Match engine: state machine and the authoritative tick loop

use dashmap::DashMap;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bot::transport::{fetch_decisions, BotTransport};

use super::decision::Decision;
use super::events::{EliminationCause, MatchEvent, MatchNotifier};
use super::geometry::Coordinate;
use super::models::{
    EliminatedPlayer, GameItem, MatchConfig, MatchOutcome, MatchResult, PlayerPosition,
    PlayerSetup,
};
use super::resolve::{ConflictResolver, TickConflicts};
use super::snapshot::{BotRequest, TickSnapshot};

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Built, players not placed yet
    Pending,
    /// Tick loop running
    Running,
    /// Terminal; no further ticks
    Ended,
}

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("match has already been started")]
    AlreadyStarted,

    #[error("match cancelled before tick {tick}")]
    Cancelled { tick: u64 },
}

/// Cooperative stop request, honoured only between ticks
#[derive(Debug, Clone, Default)]
pub struct MatchCancel(Arc<AtomicBool>);

impl MatchCancel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Live counters readable from outside the match task
#[derive(Debug, Default)]
pub struct MatchProgress {
    tick: AtomicU64,
    live_players: AtomicUsize,
}

impl MatchProgress {
    fn record(&self, tick: u64, live_players: usize) {
        self.tick.store(tick, Ordering::Relaxed);
        self.live_players.store(live_players, Ordering::Relaxed);
    }

    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::Relaxed)
    }

    pub fn live_players(&self) -> usize {
        self.live_players.load(Ordering::Relaxed)
    }
}

/// Mutable match state (owned by the engine, never shared)
#[derive(Debug)]
pub struct MatchState {
    pub phase: MatchPhase,
    pub tick: u64,
    /// Live players in roster order
    pub positions: Vec<PlayerPosition>,
    pub items: Vec<GameItem>,
    pub conflicts: TickConflicts,
    pub eliminated: Vec<EliminatedPlayer>,
}

impl MatchState {
    fn new() -> Self {
        Self {
            phase: MatchPhase::Pending,
            tick: 0,
            positions: Vec::new(),
            items: Vec::new(),
            conflicts: TickConflicts::default(),
            eliminated: Vec::new(),
        }
    }

    pub fn live_count(&self) -> usize {
        self.positions.len()
    }

    fn position_mut(&mut self, name: &str) -> Option<&mut PlayerPosition> {
        self.positions.iter_mut().find(|p| p.name == name)
    }
}

/// The authoritative match
pub struct MatchEngine<T, N> {
    id: Uuid,
    seed: u64,
    config: MatchConfig,
    transport: T,
    notifier: N,
    state: MatchState,
    rng: ChaCha8Rng,
    cancel: MatchCancel,
    progress: Arc<MatchProgress>,
}

impl<T: BotTransport, N: MatchNotifier> MatchEngine<T, N> {
    /// Create a match with a random placement seed
    pub fn new(config: MatchConfig, transport: T, notifier: N) -> Self {
        Self::with_seed(config, transport, notifier, rand::random::<u64>())
    }

    /// Create a match whose random placement is reproducible
    pub fn with_seed(config: MatchConfig, transport: T, notifier: N, seed: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            seed,
            config,
            transport,
            notifier,
            state: MatchState::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            cancel: MatchCancel::new(),
            progress: Arc::new(MatchProgress::default()),
        }
    }

    /// Use a caller-chosen match id
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Share an externally owned cancel flag
    pub fn with_cancel(mut self, cancel: MatchCancel) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn phase(&self) -> MatchPhase {
        self.state.phase
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn cancel_handle(&self) -> MatchCancel {
        self.cancel.clone()
    }

    pub fn progress(&self) -> Arc<MatchProgress> {
        self.progress.clone()
    }

    /// Place players and run ticks until the match is decided
    pub async fn start(&mut self) -> Result<MatchResult, MatchError> {
        if self.state.phase != MatchPhase::Pending {
            return Err(MatchError::AlreadyStarted);
        }

        self.place_players();
        self.state.phase = MatchPhase::Running;
        self.progress.record(0, self.state.live_count());

        info!(
            match_id = %self.id,
            players = self.config.players.len(),
            edge_length = self.config.setup.edge_length,
            seed = self.seed,
            "Match started"
        );
        self.notifier.notify(MatchEvent::MatchStarted);

        let tick_delay = Duration::from_millis(self.config.setup.tick_delay_ms);

        loop {
            if self.cancel.is_cancelled() {
                self.state.phase = MatchPhase::Ended;
                warn!(match_id = %self.id, tick = self.state.tick, "Match cancelled");
                return Err(MatchError::Cancelled {
                    tick: self.state.tick,
                });
            }

            if self.run_tick().await {
                break;
            }

            self.state.tick += 1;
            if !tick_delay.is_zero() {
                tokio::time::sleep(tick_delay).await;
            }
        }

        self.state.phase = MatchPhase::Ended;
        let result = self.final_result();

        info!(
            match_id = %self.id,
            outcome = ?result.outcome,
            winner = result.winner.as_ref().map(|w| w.player.name.as_str()).unwrap_or("-"),
            ticks = self.state.tick + 1,
            "Match ended"
        );
        self.notifier.notify(MatchEvent::MatchEnded(result.clone()));

        Ok(result)
    }

    /// Fixed start positions in roster order, otherwise distinct random cells
    fn place_players(&mut self) {
        let edge = i64::from(self.config.setup.edge_length);

        if let Some(fixed) = &self.config.setup.start_positions {
            self.state.positions = self
                .config
                .players
                .iter()
                .filter_map(|player| fixed.iter().find(|p| p.name == player.name).cloned())
                .collect();
            return;
        }

        let mut taken: HashSet<Coordinate> = HashSet::new();
        let mut positions = Vec::with_capacity(self.config.players.len());
        for player in &self.config.players {
            let coordinate = loop {
                let candidate = Coordinate::new(
                    self.rng.gen_range(0..edge),
                    self.rng.gen_range(0..edge),
                    self.rng.gen_range(0..edge),
                );
                if taken.insert(candidate) {
                    break candidate;
                }
            };
            positions.push(PlayerPosition::new(player.name.clone(), coordinate));
        }
        self.state.positions = positions;
    }

    /// Run one tick. Returns true when the match is over.
    async fn run_tick(&mut self) -> bool {
        let tick = self.state.tick;

        // Bombs that went off last tick disappear before anyone sees them
        let detonated: HashSet<Coordinate> = self.state.conflicts.detonations().collect();
        if !detonated.is_empty() {
            self.state
                .items
                .retain(|item| !(item.is_bomb() && detonated.contains(&item.coordinate)));
        }
        self.state.conflicts.clear();

        let snapshot = TickSnapshot::capture(
            tick,
            &self.config.setup,
            &self.state.positions,
            &self.state.items,
        );
        self.progress.record(tick, self.state.live_count());
        self.notifier.notify(MatchEvent::Tick(snapshot.clone()));

        debug!(
            match_id = %self.id,
            tick,
            live = self.state.live_count(),
            items = self.state.items.len(),
            "Tick"
        );

        // Poll bots one at a time so events keep roster order
        let roster: Vec<PlayerSetup> = self
            .state
            .positions
            .iter()
            .filter_map(|p| self.config.player(&p.name).cloned())
            .collect();

        for player in &roster {
            let request = BotRequest::new(&snapshot, player);
            match fetch_decisions(&self.transport, &request).await {
                Ok(decisions) => self.apply_decisions(&player.name, &decisions),
                Err(err) => {
                    warn!(
                        match_id = %self.id,
                        tick,
                        player = %player.name,
                        error = %err.detail(),
                        "Bot failed to answer"
                    );
                    self.eliminate(&player.name, EliminationCause::AgentFault(err.to_string()));
                }
            }
        }

        ConflictResolver::resolve(
            &mut self.state.conflicts,
            &self.state.positions,
            &self.state.items,
            self.config.setup.edge_length,
        );

        let losers: Vec<(String, EliminationCause)> = self
            .state
            .conflicts
            .eliminations()
            .into_iter()
            .map(|(p, cause)| (p.name.clone(), cause))
            .collect();
        for (name, cause) in losers {
            self.eliminate(&name, cause);
        }

        let live = self.state.live_count();
        self.progress.record(tick, live);

        let out_of_ticks = self
            .config
            .setup
            .max_ticks
            .is_some_and(|max| tick + 1 >= max);

        live <= 1 || out_of_ticks
    }

    fn apply_decisions(&mut self, name: &str, decisions: &[Decision]) {
        for decision in decisions {
            match *decision {
                Decision::Move { direction } => {
                    let Some(position) = self.state.position_mut(name) else {
                        return;
                    };
                    position.coordinate = position.coordinate.step(direction);
                    let moved = position.clone();
                    self.notifier.notify(MatchEvent::PlayerMoveAttempted(moved));
                }
                Decision::Bomb { x, y, z } => {
                    self.place_bomb(name, Coordinate::new(x, y, z));
                }
                Decision::Noop {} => {
                    if let Some(position) = self.state.positions.iter().find(|p| p.name == name) {
                        self.notifier
                            .notify(MatchEvent::PlayerIdle(position.clone()));
                    }
                }
            }
        }
    }

    fn place_bomb(&mut self, name: &str, target: Coordinate) {
        // Not reached today: records are built only after every decision
        // of the tick has been applied
        if let Some(record) = self.state.conflicts.collision_at_mut(target) {
            record.has_bomb = true;
        } else if !target.is_within(self.config.setup.edge_length) {
            debug!(match_id = %self.id, player = %name, %target, "Bomb outside the cube ignored");
        } else if !self.state.items.iter().any(|item| item.coordinate == target) {
            self.state.items.push(GameItem::bomb(target));
        }

        self.notifier
            .notify(MatchEvent::PlayerPlacedBomb(PlayerPosition::new(name, target)));
    }

    /// Remove a live player and record it once
    fn eliminate(&mut self, name: &str, cause: EliminationCause) {
        let before = self.state.positions.len();
        self.state.positions.retain(|p| p.name != name);
        if self.state.positions.len() == before {
            return;
        }

        if let Some(player) = self.config.player(name) {
            self.state.eliminated.push(EliminatedPlayer {
                player: player.clone(),
                score_at_elimination: self.state.tick,
            });
        }

        info!(
            match_id = %self.id,
            tick = self.state.tick,
            player = %name,
            cause = %cause,
            "Player eliminated"
        );
        self.notifier.notify(MatchEvent::PlayerEliminated {
            name: name.to_string(),
            cause: cause.to_string(),
        });
    }

    /// Survivors score the number of ticks played
    fn final_result(&self) -> MatchResult {
        let ticks_played = self.state.tick + 1;
        let mut standings = self.state.eliminated.clone();

        let survivors: Vec<EliminatedPlayer> = self
            .state
            .positions
            .iter()
            .filter_map(|p| self.config.player(&p.name))
            .map(|player| EliminatedPlayer {
                player: player.clone(),
                score_at_elimination: ticks_played,
            })
            .collect();

        if let [winner] = survivors.as_slice() {
            standings.push(winner.clone());
            MatchResult {
                outcome: MatchOutcome::WinnerFound,
                winner: Some(winner.clone()),
                standings,
            }
        } else {
            standings.extend(survivors);
            MatchResult {
                outcome: MatchOutcome::Tie,
                winner: None,
                standings,
            }
        }
    }
}

/// Handle to a running match
#[derive(Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    pub session_id: Uuid,
    pub started_at: u64,
    pub progress: Arc<MatchProgress>,
    pub cancel: MatchCancel,
}

/// Point-in-time view of a registered match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchSummary {
    pub match_id: Uuid,
    pub session_id: Uuid,
    pub started_at: u64,
    pub tick: u64,
    pub live_players: usize,
}

impl MatchHandle {
    pub fn summary(&self) -> MatchSummary {
        MatchSummary {
            match_id: self.id,
            session_id: self.session_id,
            started_at: self.started_at,
            tick: self.progress.tick(),
            live_players: self.progress.live_players(),
        }
    }
}

/// Registry of all active matches
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchHandle>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.get(id).map(|m| m.value().clone())
    }

    pub fn insert(&self, handle: MatchHandle) {
        self.matches.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.remove(id).map(|(_, h)| h)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    pub fn live_players(&self) -> usize {
        self.matches
            .iter()
            .map(|m| m.value().progress.live_players())
            .sum()
    }

    /// Summaries of every registered match, oldest first
    pub fn summaries(&self) -> Vec<MatchSummary> {
        let mut summaries: Vec<MatchSummary> =
            self.matches.iter().map(|m| m.value().summary()).collect();
        summaries.sort_by_key(|s| (s.started_at, s.match_id));
        summaries
    }

    /// Stop every running match at its next tick boundary
    pub fn cancel_all(&self) {
        for entry in self.matches.iter() {
            entry.value().cancel.cancel();
        }
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//! End-of-tick conflict resolution: collisions, bombs and bounds

use std::collections::HashSet;

use super::events::EliminationCause;
use super::geometry::Coordinate;
use super::models::{CollisionRecord, GameItem, PlayerPosition};

/// Conflicts recorded for the tick in progress
#[derive(Debug, Clone, Default)]
pub struct TickConflicts {
    pub collisions: Vec<CollisionRecord>,
    pub out_of_bounds: Vec<PlayerPosition>,
}

impl TickConflicts {
    pub fn clear(&mut self) {
        self.collisions.clear();
        self.out_of_bounds.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.collisions.is_empty() && self.out_of_bounds.is_empty()
    }

    pub fn collision_at_mut(&mut self, coordinate: Coordinate) -> Option<&mut CollisionRecord> {
        self.collisions
            .iter_mut()
            .find(|record| record.coordinate == coordinate)
    }

    /// Cells whose bomb went off this tick
    pub fn detonations(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.collisions
            .iter()
            .filter(|record| record.has_bomb)
            .map(|record| record.coordinate)
    }

    /// Everyone to remove, in elimination order: out of bounds first, then
    /// each collision record in the order it was found
    pub fn eliminations(&self) -> Vec<(&PlayerPosition, EliminationCause)> {
        let out = self
            .out_of_bounds
            .iter()
            .map(|p| (p, EliminationCause::OutOfBounds));

        let crashed = self.collisions.iter().flat_map(|record| {
            let cause = if record.has_bomb {
                EliminationCause::SteppedOnBomb
            } else {
                EliminationCause::Collision
            };
            record.players.iter().map(move |p| (p, cause.clone()))
        });

        out.chain(crashed).collect()
    }
}

/// Stateless conflict rules
pub struct ConflictResolver;

impl ConflictResolver {
    /// Record every live player that left the cube, shares its final cell
    /// with another player, or ended on a bomb.
    pub fn resolve(
        conflicts: &mut TickConflicts,
        players: &[PlayerPosition],
        items: &[GameItem],
        edge_length: u32,
    ) {
        let (inside, outside): (Vec<&PlayerPosition>, Vec<&PlayerPosition>) = players
            .iter()
            .partition(|p| p.coordinate.is_within(edge_length));

        conflicts
            .out_of_bounds
            .extend(outside.into_iter().cloned());

        let bombs: HashSet<Coordinate> = items
            .iter()
            .filter(|item| item.is_bomb())
            .map(|item| item.coordinate)
            .collect();

        for player in &inside {
            let shared = inside
                .iter()
                .any(|other| other.name != player.name && other.coordinate == player.coordinate);
            let has_bomb = bombs.contains(&player.coordinate);

            if !shared && !has_bomb {
                continue;
            }

            match conflicts.collision_at_mut(player.coordinate) {
                Some(record) => {
                    record.has_bomb |= has_bomb;
                    if !record.players.iter().any(|p| p.name == player.name) {
                        record.players.push((*player).clone());
                    }
                }
                None => {
                    let mut record = CollisionRecord::new(player.coordinate, has_bomb);
                    record.players.push((*player).clone());
                    conflicts.collisions.push(record);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(name: &str, x: i64, y: i64, z: i64) -> PlayerPosition {
        PlayerPosition::new(name, Coordinate::new(x, y, z))
    }

    #[test]
    fn test_no_conflicts() {
        let mut conflicts = TickConflicts::default();
        let players = vec![pos("A", 0, 0, 0), pos("B", 1, 0, 0)];
        let items = vec![GameItem::bomb(Coordinate::new(2, 2, 2))];

        ConflictResolver::resolve(&mut conflicts, &players, &items, 8);
        assert!(conflicts.is_empty());
        assert!(conflicts.eliminations().is_empty());
    }

    #[test]
    fn test_players_sharing_a_cell_collide() {
        let mut conflicts = TickConflicts::default();
        let players = vec![pos("A", 0, 0, 1), pos("B", 0, 0, 1), pos("C", 5, 5, 5)];

        ConflictResolver::resolve(&mut conflicts, &players, &[], 8);
        assert_eq!(conflicts.collisions.len(), 1);

        let record = &conflicts.collisions[0];
        assert!(!record.has_bomb);
        assert_eq!(record.coordinate, Coordinate::new(0, 0, 1));
        let names: Vec<&str> = record.players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);

        let causes: Vec<String> = conflicts
            .eliminations()
            .iter()
            .map(|(_, cause)| cause.to_string())
            .collect();
        assert_eq!(causes, vec!["crashed into another player"; 2]);
    }

    #[test]
    fn test_bomb_cause_wins_for_everyone_on_the_cell() {
        let mut conflicts = TickConflicts::default();
        let players = vec![pos("A", 3, 3, 3), pos("B", 3, 3, 3), pos("C", 3, 3, 3)];
        let items = vec![GameItem::bomb(Coordinate::new(3, 3, 3))];

        ConflictResolver::resolve(&mut conflicts, &players, &items, 8);
        assert_eq!(conflicts.collisions.len(), 1);
        assert!(conflicts.collisions[0].has_bomb);
        assert_eq!(conflicts.collisions[0].players.len(), 3);
        assert!(conflicts
            .eliminations()
            .iter()
            .all(|(_, cause)| *cause == EliminationCause::SteppedOnBomb));

        let detonated: Vec<Coordinate> = conflicts.detonations().collect();
        assert_eq!(detonated, vec![Coordinate::new(3, 3, 3)]);
    }

    #[test]
    fn test_lone_player_on_bomb() {
        let mut conflicts = TickConflicts::default();
        let players = vec![pos("A", 0, 0, 0)];
        let items = vec![GameItem::bomb(Coordinate::new(0, 0, 0))];

        ConflictResolver::resolve(&mut conflicts, &players, &items, 8);
        let eliminated = conflicts.eliminations();
        assert_eq!(eliminated.len(), 1);
        assert_eq!(eliminated[0].0.name, "A");
        assert_eq!(eliminated[0].1.to_string(), "stepped on a BOMB");
    }

    #[test]
    fn test_out_of_bounds_is_not_a_collision() {
        let mut conflicts = TickConflicts::default();
        let players = vec![pos("A", -1, 0, 0), pos("B", -1, 0, 0), pos("C", 0, 8, 0)];

        ConflictResolver::resolve(&mut conflicts, &players, &[], 8);
        assert!(conflicts.collisions.is_empty());
        assert_eq!(conflicts.out_of_bounds.len(), 3);
        assert!(conflicts
            .eliminations()
            .iter()
            .all(|(_, cause)| *cause == EliminationCause::OutOfBounds));
    }

    #[test]
    fn test_clear_resets_accumulator() {
        let mut conflicts = TickConflicts::default();
        let players = vec![pos("A", -1, 0, 0)];
        ConflictResolver::resolve(&mut conflicts, &players, &[], 8);
        assert!(!conflicts.is_empty());

        conflicts.clear();
        assert!(conflicts.is_empty());
    }
}

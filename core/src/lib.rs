#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Zombie Survival engine.
//!
//! This crate defines the vocabulary that connects the authoritative
//! simulation, the effect layer and the adapters. The world advances through
//! discrete ticks and publishes immutable [`Snapshot`] values; everything
//! downstream reads snapshots and never touches simulation state directly.
//! Notable tick outcomes are additionally reported as [`Event`] values.

mod map;

pub use map::{board_height, board_width, parse_map, InvalidMapError, RawMap};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cardinal movement directions available to mobile entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

/// Location of a single grid cell. The origin is the top-left cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    x: u32,
    y: u32,
}

impl Position {
    /// Creates a new position from a column (`x`) and row (`y`).
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row index.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Computes the Manhattan distance between two positions.
    #[must_use]
    pub fn manhattan_distance(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Reports whether `other` shares an edge with this position.
    #[must_use]
    pub fn is_adjacent(self, other: Position) -> bool {
        self.manhattan_distance(other) == 1
    }

    /// Returns the neighbouring position in `direction`, if it stays inside a
    /// `width` by `height` grid.
    #[must_use]
    pub fn step(self, direction: Direction, width: u32, height: u32) -> Option<Position> {
        let (x, y) = match direction {
            Direction::North => (Some(self.x), self.y.checked_sub(1)),
            Direction::East => (self.x.checked_add(1), Some(self.y)),
            Direction::South => (Some(self.x), self.y.checked_add(1)),
            Direction::West => (self.x.checked_sub(1), Some(self.y)),
        };
        let (x, y) = (x?, y?);
        (x < width && y < height).then(|| Position::new(x, y))
    }

    /// Direction of a single step from `self` to an adjacent `to`.
    ///
    /// Returns `None` when the positions are not edge neighbours.
    #[must_use]
    pub fn direction_to(self, to: Position) -> Option<Direction> {
        if !self.is_adjacent(to) {
            return None;
        }

        if to.x > self.x {
            Some(Direction::East)
        } else if to.x < self.x {
            Some(Direction::West)
        } else if to.y > self.y {
            Some(Direction::South)
        } else {
            Some(Direction::North)
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Stable identifier assigned to an entity for the lifetime of a simulation run.
///
/// Identifiers are allocated in row-major map order, so ascending id order is
/// the canonical iteration order used by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Closed set of cell occupants understood by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    /// The single entity defended against the zombies.
    Player,
    /// Hostile walker that closes in on the player.
    Zombie,
    /// Indestructible obstacle.
    Rock,
    /// Breakable obstacle.
    Box,
    /// Immobile trap consumed by the first zombie stepping on it.
    Landmine,
    /// Absence of an entity.
    Empty,
}

impl EntityType {
    /// Parses a single map tag. Both `' '` and `'.'` denote an empty cell.
    #[must_use]
    pub const fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'P' => Some(Self::Player),
            'Z' => Some(Self::Zombie),
            'R' => Some(Self::Rock),
            'B' => Some(Self::Box),
            'L' => Some(Self::Landmine),
            ' ' | '.' => Some(Self::Empty),
            _ => None,
        }
    }

    /// Canonical map tag for this type.
    #[must_use]
    pub const fn tag(self) -> char {
        match self {
            Self::Player => 'P',
            Self::Zombie => 'Z',
            Self::Rock => 'R',
            Self::Box => 'B',
            Self::Landmine => 'L',
            Self::Empty => ' ',
        }
    }

    /// Reports whether entities of this type may change position.
    #[must_use]
    pub const fn is_mobile(self) -> bool {
        matches!(self, Self::Player | Self::Zombie)
    }

    /// Reports whether this type is an obstacle removed from the grid once destroyed.
    #[must_use]
    pub const fn is_obstacle(self) -> bool {
        matches!(self, Self::Rock | Self::Box | Self::Landmine)
    }
}

/// Movement state of an entity as of the most recent tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Motion {
    /// The entity did not change position during the last tick.
    #[default]
    Idle,
    /// The entity advanced one cell during the last tick.
    Walking {
        /// Direction of the step taken.
        direction: Direction,
    },
}

/// Immutable representation of a single entity's state used for queries.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Identifier assigned to the entity.
    pub id: EntityId,
    /// Type of the entity.
    pub kind: EntityType,
    /// Cell occupied by the entity (or by its dead marker).
    pub position: Position,
    /// Remaining health. Zero means dead or destroyed.
    pub health: u32,
    /// Health the entity started the run with.
    pub max_health: u32,
    /// Direction the entity last moved or struck toward, if any.
    pub facing: Option<Direction>,
    /// Movement state as of the most recent tick.
    pub motion: Motion,
}

impl EntitySnapshot {
    /// Reports whether the entity has no health left.
    #[must_use]
    pub const fn dead(&self) -> bool {
        self.health == 0
    }

    /// Reports whether the entity is a zombie hanging on at a single point of health.
    #[must_use]
    pub fn wounded(&self) -> bool {
        self.kind == EntityType::Zombie && self.health == 1
    }
}

/// Error returned when a query targets a position outside the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("position {position} lies outside the {width}x{height} grid")]
pub struct OutOfBoundsAccess {
    /// Position that was requested.
    pub position: Position,
    /// Width of the grid in cells.
    pub width: u32,
    /// Height of the grid in cells.
    pub height: u32,
}

/// Read-only projection of the world at a committed tick boundary.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Snapshot {
    tick: u64,
    width: u32,
    height: u32,
    finished: bool,
    entities: Vec<EntitySnapshot>,
}

impl Snapshot {
    /// Creates a snapshot from the provided entity states.
    ///
    /// Entities are sorted by identifier so that iteration order is deterministic.
    #[must_use]
    pub fn new(
        tick: u64,
        width: u32,
        height: u32,
        finished: bool,
        mut entities: Vec<EntitySnapshot>,
    ) -> Self {
        entities.sort_by_key(|entity| entity.id);
        Self {
            tick,
            width,
            height,
            finished,
            entities,
        }
    }

    /// Number of ticks that had been committed when the snapshot was taken.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Width of the grid in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the grid in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Whether the simulation had reached its terminal state.
    #[must_use]
    pub const fn finished(&self) -> bool {
        self.finished
    }

    /// Iterator over every entity on the grid, dead markers included, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.entities.iter()
    }

    /// Looks up an entity by identifier.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.entities
            .binary_search_by_key(&id, |entity| entity.id)
            .ok()
            .and_then(|index| self.entities.get(index))
    }

    /// Returns the player entity, if present.
    #[must_use]
    pub fn player(&self) -> Option<&EntitySnapshot> {
        self.entities
            .iter()
            .find(|entity| entity.kind == EntityType::Player)
    }

    /// Iterator over zombies that still have health.
    pub fn living_zombies(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.entities
            .iter()
            .filter(|entity| entity.kind == EntityType::Zombie && !entity.dead())
    }

    /// Returns the entity shown at `position`.
    ///
    /// A living occupant takes precedence over a dead marker sharing its cell.
    pub fn entity_at(
        &self,
        position: Position,
    ) -> Result<Option<&EntitySnapshot>, OutOfBoundsAccess> {
        self.check_bounds(position)?;
        let mut marker = None;
        for entity in self.entities.iter().filter(|e| e.position == position) {
            if !entity.dead() {
                return Ok(Some(entity));
            }
            marker = marker.or(Some(entity));
        }
        Ok(marker)
    }

    /// Projects the snapshot back into a grid of map tags.
    ///
    /// Only living entities are drawn; dead markers and destroyed obstacles
    /// appear as empty cells.
    #[must_use]
    pub fn rows(&self) -> Vec<Vec<char>> {
        let width = self.width as usize;
        let mut rows = vec![vec![EntityType::Empty.tag(); width]; self.height as usize];
        for entity in self.entities.iter().filter(|entity| !entity.dead()) {
            if let Some(cell) = rows
                .get_mut(entity.position.y() as usize)
                .and_then(|row| row.get_mut(entity.position.x() as usize))
            {
                *cell = entity.kind.tag();
            }
        }
        rows
    }

    fn check_bounds(&self, position: Position) -> Result<(), OutOfBoundsAccess> {
        if position.x() < self.width && position.y() < self.height {
            Ok(())
        } else {
            Err(OutOfBoundsAccess {
                position,
                width: self.width,
                height: self.height,
            })
        }
    }
}

/// Events reported by the world while resolving a tick.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// A new tick began resolving.
    TickStarted {
        /// Index of the tick being resolved, starting at one.
        tick: u64,
    },
    /// A zombie moved one cell toward the player.
    ZombieAdvanced {
        /// Zombie that moved.
        zombie: EntityId,
        /// Cell vacated by the zombie.
        from: Position,
        /// Cell now occupied by the zombie.
        to: Position,
    },
    /// A zombie's move was rejected and it stayed in place.
    ZombieBlocked {
        /// Zombie whose move was rejected.
        zombie: EntityId,
        /// Cell the zombie attempted to enter.
        target: Position,
        /// Occupant of the target cell, if the cell was claimed by an entity.
        blocker: Option<EntityId>,
    },
    /// A zombie struck the player.
    PlayerAttacked {
        /// Attacking zombie.
        zombie: EntityId,
        /// Damage dealt by the attack.
        damage: u32,
        /// Player health after the attack.
        remaining: u32,
    },
    /// A blocked zombie battered a breakable obstacle.
    ObstacleDamaged {
        /// Zombie responsible for the damage.
        zombie: EntityId,
        /// Obstacle that was hit.
        obstacle: EntityId,
        /// Obstacle health after the hit.
        remaining: u32,
    },
    /// A zombie stepped on a landmine and set it off.
    LandmineTriggered {
        /// Zombie that triggered the mine.
        zombie: EntityId,
        /// Landmine that was consumed.
        landmine: EntityId,
        /// Cell the landmine occupied.
        position: Position,
        /// Blast damage applied to the zombie.
        damage: u32,
    },
    /// The player shot a zombie.
    ZombieShot {
        /// Zombie that was hit.
        zombie: EntityId,
        /// Damage dealt.
        damage: u32,
        /// Zombie health after the shot.
        remaining: u32,
    },
    /// A zombie ran out of health and became a dead marker.
    ZombieKilled {
        /// Zombie that died.
        zombie: EntityId,
        /// Cell holding the dead marker.
        position: Position,
    },
    /// An obstacle ran out of health and was removed from the grid.
    ObstacleDestroyed {
        /// Obstacle that was removed.
        obstacle: EntityId,
        /// Type of the removed obstacle.
        kind: EntityType,
        /// Cell the obstacle occupied.
        position: Position,
    },
    /// The simulation reached its terminal state.
    Finished {
        /// Whether the player was still alive.
        player_survived: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: u32, kind: EntityType, x: u32, y: u32, health: u32) -> EntitySnapshot {
        EntitySnapshot {
            id: EntityId::new(id),
            kind,
            position: Position::new(x, y),
            health,
            max_health: 2,
            facing: None,
            motion: Motion::Idle,
        }
    }

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = Position::new(1, 1);
        let destination = Position::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn step_refuses_to_leave_the_grid() {
        let corner = Position::new(0, 0);
        assert_eq!(corner.step(Direction::North, 3, 3), None);
        assert_eq!(corner.step(Direction::West, 3, 3), None);
        assert_eq!(
            corner.step(Direction::East, 3, 3),
            Some(Position::new(1, 0))
        );
        assert_eq!(Position::new(2, 2).step(Direction::South, 3, 3), None);
    }

    #[test]
    fn direction_to_requires_adjacency() {
        let origin = Position::new(2, 2);
        assert_eq!(
            origin.direction_to(Position::new(2, 1)),
            Some(Direction::North)
        );
        assert_eq!(
            origin.direction_to(Position::new(1, 2)),
            Some(Direction::West)
        );
        assert_eq!(origin.direction_to(Position::new(3, 3)), None);
        assert_eq!(origin.direction_to(origin), None);
    }

    #[test]
    fn tags_round_trip_through_entity_type() {
        for kind in [
            EntityType::Player,
            EntityType::Zombie,
            EntityType::Rock,
            EntityType::Box,
            EntityType::Landmine,
            EntityType::Empty,
        ] {
            assert_eq!(EntityType::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(EntityType::from_tag('.'), Some(EntityType::Empty));
        assert_eq!(EntityType::from_tag('?'), None);
    }

    #[test]
    fn snapshot_prefers_living_occupant_over_dead_marker() {
        let snapshot = Snapshot::new(
            3,
            3,
            3,
            false,
            vec![
                entity(2, EntityType::Zombie, 1, 0, 2),
                entity(1, EntityType::Zombie, 1, 0, 0),
                entity(0, EntityType::Player, 1, 1, 2),
            ],
        );

        let shown = snapshot
            .entity_at(Position::new(1, 0))
            .expect("in bounds")
            .expect("occupied");
        assert_eq!(shown.id, EntityId::new(2));
        assert!(snapshot
            .entity_at(Position::new(2, 2))
            .expect("in bounds")
            .is_none());
        assert_eq!(
            snapshot.iter().map(|e| e.id.get()).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn snapshot_reports_out_of_bounds_queries() {
        let snapshot = Snapshot::new(0, 2, 2, false, Vec::new());
        let error = snapshot
            .entity_at(Position::new(2, 0))
            .expect_err("column 2 is outside a 2x2 grid");
        assert_eq!(error.width, 2);
        assert_eq!(error.height, 2);
        assert_eq!(error.position, Position::new(2, 0));
    }

    #[test]
    fn rows_hide_dead_markers() {
        let snapshot = Snapshot::new(
            1,
            3,
            1,
            false,
            vec![
                entity(0, EntityType::Player, 0, 0, 2),
                entity(1, EntityType::Zombie, 1, 0, 0),
                entity(2, EntityType::Zombie, 2, 0, 1),
            ],
        );
        assert_eq!(snapshot.rows(), vec![vec!['P', ' ', 'Z']]);
        assert_eq!(snapshot.living_zombies().count(), 1);
        assert!(snapshot
            .entity(EntityId::new(2))
            .is_some_and(EntitySnapshot::wounded));
    }

    #[test]
    fn snapshot_round_trips_through_bincode() {
        let snapshot = Snapshot::new(
            7,
            2,
            1,
            true,
            vec![EntitySnapshot {
                motion: Motion::Walking {
                    direction: Direction::East,
                },
                facing: Some(Direction::East),
                ..entity(0, EntityType::Player, 1, 0, 1)
            }],
        );
        let bytes = bincode::serialize(&snapshot).expect("serialize");
        let restored: Snapshot = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, snapshot);
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Zombie Survival.
//!
//! A [`Simulation`] is built from an initial map and advanced one tick at a
//! time by an external driver. Each tick resolves in a fixed order:
//!
//! 1. every living zombie, in ascending id order, decides whether to strike
//!    the player (when adjacent) or step greedily toward the player's cell;
//! 2. the decisions are carried out in the same order, with each target cell
//!    claimable by a single zombie per tick;
//! 3. optionally the player fires at the nearest zombie;
//! 4. entities without health are resolved: zombies become dead markers,
//!    obstacles leave the grid;
//! 5. the terminal condition is re-evaluated.
//!
//! Once finished, further ticks are no-ops.

mod board;
mod rules;

pub use board::{Board, Entity};
pub use rules::Rules;

use tracing::trace;
use zombie_survival_core::{
    Direction, EntityId, EntitySnapshot, EntityType, Event, InvalidMapError, OutOfBoundsAccess,
    Position, Snapshot,
};

/// Deterministic tick-based survival scenario.
#[derive(Clone, Debug)]
pub struct Simulation {
    board: Board,
    rules: Rules,
    tick: u64,
    finished: bool,
}

impl Simulation {
    /// Builds a simulation from `map` using the default [`Rules`].
    pub fn new(map: &[Vec<char>]) -> Result<Self, InvalidMapError> {
        Self::with_rules(map, Rules::default())
    }

    /// Builds a simulation from `map` using custom rules.
    ///
    /// Maps that would be finished before the first tick are rejected: a map
    /// without zombies, or rules that leave the player or the zombies without
    /// health. Obstacles on the map must start with health as well.
    pub fn with_rules(map: &[Vec<char>], rules: Rules) -> Result<Self, InvalidMapError> {
        let board = Board::from_map(map, &rules)?;
        if board.player().dead() {
            return Err(InvalidMapError::PlayerWithoutHealth);
        }
        if board.living(EntityType::Zombie).next().is_none() {
            return Err(InvalidMapError::NoLivingZombies);
        }
        if let Some(obstacle) = board
            .entities()
            .find(|entity| entity.kind() != EntityType::Zombie && entity.dead())
        {
            return Err(InvalidMapError::ObstacleWithoutHealth {
                kind: obstacle.kind(),
            });
        }

        Ok(Self {
            board,
            rules,
            tick: 0,
            finished: false,
        })
    }

    /// Number of rows in `map`.
    #[must_use]
    pub fn board_height(map: &[Vec<char>]) -> u32 {
        zombie_survival_core::board_height(map)
    }

    /// Number of columns in `map`.
    #[must_use]
    pub fn board_width(map: &[Vec<char>]) -> u32 {
        zombie_survival_core::board_width(map)
    }

    /// Advances the world by one tick unless it has already finished.
    pub fn step(&mut self) {
        let mut events = Vec::new();
        self.step_with_events(&mut events);
    }

    /// Advances the world by one tick, reporting what happened to `out_events`.
    pub fn step_with_events(&mut self, out_events: &mut Vec<Event>) {
        if self.finished {
            return;
        }

        self.tick = self.tick.saturating_add(1);
        out_events.push(Event::TickStarted { tick: self.tick });
        self.board.settle();

        let intents = self.decide();
        self.act(&intents, out_events);
        if self.rules.player_damage > 0 {
            self.player_fire(out_events);
        }
        self.resolve_health(out_events);

        self.finished = self.board.player().dead()
            || self.board.living(EntityType::Zombie).next().is_none();
        if self.finished {
            out_events.push(Event::Finished {
                player_survived: !self.board.player().dead(),
            });
        }

        trace!(
            tick = self.tick,
            finished = self.finished,
            player_health = self.board.player().health(),
            "tick resolved"
        );
    }

    /// Reports whether the player has died or every zombie is gone.
    #[must_use]
    pub const fn finished(&self) -> bool {
        self.finished
    }

    /// Number of ticks committed so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Rules the simulation was built with.
    #[must_use]
    pub const fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Width of the grid in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.board.width()
    }

    /// Height of the grid in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.board.height()
    }

    /// Current state of the player.
    #[must_use]
    pub fn player(&self) -> EntitySnapshot {
        self.board.player().snapshot()
    }

    /// Entity shown at `position`; a living occupant wins over a dead marker.
    pub fn entity_at(
        &self,
        position: Position,
    ) -> Result<Option<EntitySnapshot>, OutOfBoundsAccess> {
        Ok(self.board.entity_at(position)?.map(Entity::snapshot))
    }

    /// Captures an immutable snapshot of the committed state.
    #[must_use]
    pub fn state(&self) -> Snapshot {
        Snapshot::new(
            self.tick,
            self.board.width(),
            self.board.height(),
            self.finished,
            self.board.entities().map(Entity::snapshot).collect(),
        )
    }

    fn decide(&self) -> Vec<(EntityId, Intent)> {
        let target = self.board.player().position();
        self.board
            .living(EntityType::Zombie)
            .map(|zombie| {
                let from = zombie.position();
                let intent = if from.is_adjacent(target) {
                    Intent::Attack
                } else {
                    greedy_direction(from, target).map_or(Intent::Hold, Intent::Advance)
                };
                (zombie.id(), intent)
            })
            .collect()
    }

    fn act(&mut self, intents: &[(EntityId, Intent)], out_events: &mut Vec<Event>) {
        let mut claimed: Vec<Position> = Vec::with_capacity(intents.len());
        let player = self.board.player_id();
        let target = self.board.player().position();

        for &(zombie, intent) in intents {
            let Some(from) = self
                .board
                .entity(zombie)
                .filter(|entity| !entity.dead())
                .map(Entity::position)
            else {
                continue;
            };

            match intent {
                Intent::Hold => {}
                Intent::Attack => {
                    if let Some(direction) = from.direction_to(target) {
                        self.board.face(zombie, direction);
                    }
                    let damage = self.rules.zombie_damage;
                    let remaining = self.board.damage(player, damage).unwrap_or(0);
                    out_events.push(Event::PlayerAttacked {
                        zombie,
                        damage,
                        remaining,
                    });
                }
                Intent::Advance(direction) => {
                    self.advance(zombie, from, direction, &mut claimed, out_events);
                }
            }
        }
    }

    fn advance(
        &mut self,
        zombie: EntityId,
        from: Position,
        direction: Direction,
        claimed: &mut Vec<Position>,
        out_events: &mut Vec<Event>,
    ) {
        self.board.face(zombie, direction);
        let Some(to) = from.step(direction, self.board.width(), self.board.height()) else {
            return;
        };

        if claimed.contains(&to) {
            out_events.push(Event::ZombieBlocked {
                zombie,
                target: to,
                blocker: None,
            });
            return;
        }

        let occupant = self
            .board
            .occupant(to)
            .ok()
            .flatten()
            .map(|entity| (entity.id(), entity.kind()));

        match occupant {
            None => {
                let _ = self.commit_move(zombie, from, to, claimed, out_events);
            }
            Some((landmine, EntityType::Landmine)) => {
                let _ = self.board.remove(landmine);
                if self.commit_move(zombie, from, to, claimed, out_events) {
                    let damage = self.rules.landmine_damage;
                    let _ = self.board.damage(zombie, damage);
                    out_events.push(Event::LandmineTriggered {
                        zombie,
                        landmine,
                        position: to,
                        damage,
                    });
                }
            }
            Some((obstacle, EntityType::Box)) => {
                let remaining = self
                    .board
                    .damage(obstacle, self.rules.zombie_damage)
                    .unwrap_or(0);
                out_events.push(Event::ObstacleDamaged {
                    zombie,
                    obstacle,
                    remaining,
                });
                out_events.push(Event::ZombieBlocked {
                    zombie,
                    target: to,
                    blocker: Some(obstacle),
                });
            }
            Some((blocker, _)) => out_events.push(Event::ZombieBlocked {
                zombie,
                target: to,
                blocker: Some(blocker),
            }),
        }
    }

    fn commit_move(
        &mut self,
        zombie: EntityId,
        from: Position,
        to: Position,
        claimed: &mut Vec<Position>,
        out_events: &mut Vec<Event>,
    ) -> bool {
        if !self.board.move_entity(zombie, to) {
            return false;
        }
        claimed.push(to);
        out_events.push(Event::ZombieAdvanced { zombie, from, to });
        true
    }

    fn player_fire(&mut self, out_events: &mut Vec<Event>) {
        let player = self.board.player();
        if player.dead() {
            return;
        }
        let origin = player.position();
        let Some(target) = self
            .board
            .living(EntityType::Zombie)
            .min_by_key(|zombie| (zombie.position().manhattan_distance(origin), zombie.id()))
            .map(Entity::id)
        else {
            return;
        };

        let damage = self.rules.player_damage;
        let remaining = self.board.damage(target, damage).unwrap_or(0);
        out_events.push(Event::ZombieShot {
            zombie: target,
            damage,
            remaining,
        });
    }

    fn resolve_health(&mut self, out_events: &mut Vec<Event>) {
        let fallen: Vec<(EntityId, EntityType, Position)> = self
            .board
            .entities()
            .filter(|entity| entity.dead() && entity.kind() != EntityType::Player)
            .map(|entity| (entity.id(), entity.kind(), entity.position()))
            .collect();

        for (id, kind, position) in fallen {
            match kind {
                EntityType::Zombie => {
                    if self.board.leave_marker(id) {
                        out_events.push(Event::ZombieKilled {
                            zombie: id,
                            position,
                        });
                    }
                }
                EntityType::Rock | EntityType::Box | EntityType::Landmine => {
                    if self.board.remove(id).is_some() {
                        out_events.push(Event::ObstacleDestroyed {
                            obstacle: id,
                            kind,
                            position,
                        });
                    }
                }
                EntityType::Player | EntityType::Empty => {}
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Intent {
    Hold,
    Attack,
    Advance(Direction),
}

/// Picks the single step that most reduces the distance to `to`.
///
/// The axis with the larger gap wins; ties favour horizontal movement.
fn greedy_direction(from: Position, to: Position) -> Option<Direction> {
    let dx = i64::from(to.x()) - i64::from(from.x());
    let dy = i64::from(to.y()) - i64::from(from.y());

    if dx == 0 && dy == 0 {
        return None;
    }

    if dx.abs() >= dy.abs() {
        Some(if dx > 0 {
            Direction::East
        } else {
            Direction::West
        })
    } else {
        Some(if dy > 0 {
            Direction::South
        } else {
            Direction::North
        })
    }
}

//! Grid and entity model backing the simulation.

use zombie_survival_core::{
    Direction, EntityId, EntitySnapshot, EntityType, InvalidMapError, Motion, OutOfBoundsAccess,
    Position,
};

use crate::Rules;

/// A single occupant of the grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    id: EntityId,
    kind: EntityType,
    position: Position,
    health: u32,
    max_health: u32,
    facing: Option<Direction>,
    motion: Motion,
}

impl Entity {
    fn new(id: EntityId, kind: EntityType, position: Position, health: u32) -> Self {
        Self {
            id,
            kind,
            position,
            health,
            max_health: health,
            facing: None,
            motion: Motion::Idle,
        }
    }

    /// Identifier of the entity.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Type of the entity.
    #[must_use]
    pub const fn kind(&self) -> EntityType {
        self.kind
    }

    /// Cell the entity occupies.
    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Remaining health.
    #[must_use]
    pub const fn health(&self) -> u32 {
        self.health
    }

    /// Reports whether the entity has no health left.
    #[must_use]
    pub const fn dead(&self) -> bool {
        self.health == 0
    }

    /// Captures an immutable copy of the entity's state.
    #[must_use]
    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            kind: self.kind,
            position: self.position,
            health: self.health,
            max_health: self.max_health,
            facing: self.facing,
            motion: self.motion,
        }
    }
}

/// Fixed-size grid holding every entity of a simulation run.
///
/// Two layers are kept per cell: the blocking layer holds at most one
/// occupant that other entities cannot enter, and the marker layer holds the
/// remains of a dead zombie, which never blocks movement.
#[derive(Clone, Debug)]
pub struct Board {
    width: u32,
    height: u32,
    entities: Vec<Option<Entity>>,
    occupants: Vec<Option<EntityId>>,
    markers: Vec<Option<EntityId>>,
    player: EntityId,
}

impl Board {
    /// Builds a board from a raw map, assigning health from `rules`.
    ///
    /// Identifiers are handed out in row-major order. The map is only read.
    pub fn from_map(map: &[Vec<char>], rules: &Rules) -> Result<Self, InvalidMapError> {
        let expected = map.first().map_or(0, Vec::len);
        if expected == 0 {
            return Err(InvalidMapError::Empty);
        }
        if let Some((row, found)) = map
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|(_, len)| *len != expected)
        {
            return Err(InvalidMapError::JaggedRow {
                row,
                expected,
                found,
            });
        }

        let height = u32::try_from(map.len()).map_err(|_| InvalidMapError::Empty)?;
        let width = u32::try_from(expected).map_err(|_| InvalidMapError::Empty)?;
        let cell_count = map.len() * expected;

        let mut entities = Vec::new();
        let mut occupants = vec![None; cell_count];
        let mut players = Vec::new();

        for (y, row) in (0..height).zip(map) {
            for (x, tag) in (0..width).zip(row) {
                let position = Position::new(x, y);
                let kind = EntityType::from_tag(*tag).ok_or(InvalidMapError::UnknownTag {
                    tag: *tag,
                    position,
                })?;
                if kind == EntityType::Empty {
                    continue;
                }

                let id = EntityId::new(u32::try_from(entities.len()).unwrap_or(u32::MAX));
                if kind == EntityType::Player {
                    players.push(id);
                }
                let index = y as usize * expected + x as usize;
                occupants[index] = Some(id);
                entities.push(Some(Entity::new(
                    id,
                    kind,
                    position,
                    rules.initial_health(kind),
                )));
            }
        }

        let player = match players.as_slice() {
            [player] => *player,
            [] => return Err(InvalidMapError::MissingPlayer),
            _ => {
                return Err(InvalidMapError::MultiplePlayers {
                    count: players.len(),
                })
            }
        };

        Ok(Self {
            width,
            height,
            entities,
            occupants,
            markers: vec![None; cell_count],
            player,
        })
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

    /// Identifier of the player.
    #[must_use]
    pub const fn player_id(&self) -> EntityId {
        self.player
    }

    /// The player entity.
    #[must_use]
    pub fn player(&self) -> &Entity {
        match self.entity(self.player) {
            Some(player) => player,
            None => unreachable!("the player is never removed from the board"),
        }
    }

    /// Looks up an entity that is still part of the grid.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.get() as usize).and_then(Option::as_ref)
    }

    /// Iterator over every entity still part of the grid, in id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().flatten()
    }

    /// Iterator over living entities of the requested type, in id order.
    pub fn living(&self, kind: EntityType) -> impl Iterator<Item = &Entity> {
        self.entities()
            .filter(move |entity| entity.kind == kind && !entity.dead())
    }

    /// Returns the blocking occupant of `position`, ignoring dead markers.
    pub fn occupant(&self, position: Position) -> Result<Option<&Entity>, OutOfBoundsAccess> {
        let index = self.index(position)?;
        Ok(self.occupants[index].and_then(|id| self.entity(id)))
    }

    /// Returns the entity shown at `position`: its occupant, else its dead marker.
    pub fn entity_at(&self, position: Position) -> Result<Option<&Entity>, OutOfBoundsAccess> {
        let index = self.index(position)?;
        Ok(self.occupants[index]
            .or(self.markers[index])
            .and_then(|id| self.entity(id)))
    }

    /// Moves a mobile entity into an adjacent free cell.
    ///
    /// Returns `false` without changing anything when the entity is immobile,
    /// the target is out of bounds or the target is occupied.
    pub fn move_entity(&mut self, id: EntityId, to: Position) -> bool {
        let Ok(to_index) = self.index(to) else {
            return false;
        };
        if self.occupants[to_index].is_some() {
            return false;
        }
        let Some(entity) = self.entities.get_mut(id.get() as usize).and_then(Option::as_mut)
        else {
            return false;
        };
        if !entity.kind.is_mobile() {
            return false;
        }
        let Some(direction) = entity.position.direction_to(to) else {
            return false;
        };

        let from = entity.position;
        entity.position = to;
        entity.facing = Some(direction);
        entity.motion = Motion::Walking { direction };

        if let Ok(from_index) = self.index(from) {
            if self.occupants[from_index] == Some(id) {
                self.occupants[from_index] = None;
            }
        }
        self.occupants[to_index] = Some(id);
        true
    }

    /// Reduces an entity's health by `amount`, clamping at zero.
    ///
    /// Returns the remaining health, or `None` when the entity is gone.
    pub fn damage(&mut self, id: EntityId, amount: u32) -> Option<u32> {
        let entity = self.entity_mut(id)?;
        entity.health = entity.health.saturating_sub(amount);
        Some(entity.health)
    }

    /// Turns an entity toward `direction` without moving it.
    pub fn face(&mut self, id: EntityId, direction: Direction) {
        if let Some(entity) = self.entity_mut(id) {
            entity.facing = Some(direction);
        }
    }

    /// Marks every entity as idle ahead of a new tick.
    pub fn settle(&mut self) {
        for entity in self.entities.iter_mut().flatten() {
            entity.motion = Motion::Idle;
        }
    }

    /// Converts a dead zombie into a non-blocking marker on its cell.
    ///
    /// When several zombies fall on one cell the lowest id stays on show,
    /// matching [`Snapshot::entity_at`](zombie_survival_core::Snapshot::entity_at).
    ///
    /// Returns `false` when the entity is not a dead zombie in the blocking layer.
    pub fn leave_marker(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.entity(id) else {
            return false;
        };
        if entity.kind != EntityType::Zombie || !entity.dead() {
            return false;
        }
        let Ok(index) = self.index(entity.position) else {
            return false;
        };
        if self.occupants[index] != Some(id) {
            return false;
        }
        self.occupants[index] = None;
        let marker = self.markers[index].map_or(id, |earlier| earlier.min(id));
        self.markers[index] = Some(marker);
        true
    }

    /// Removes an immobile obstacle from the grid entirely.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entity(id)?;
        if !entity.kind.is_obstacle() {
            return None;
        }
        let index = self.index(entity.position).ok()?;
        if self.occupants[index] == Some(id) {
            self.occupants[index] = None;
        }
        self.entities.get_mut(id.get() as usize)?.take()
    }

    fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities
            .get_mut(id.get() as usize)
            .and_then(Option::as_mut)
    }

    fn index(&self, position: Position) -> Result<usize, OutOfBoundsAccess> {
        if position.x() < self.width && position.y() < self.height {
            Ok(position.y() as usize * self.width as usize + position.x() as usize)
        } else {
            Err(OutOfBoundsAccess {
                position,
                width: self.width,
                height: self.height,
            })
        }
    }
}

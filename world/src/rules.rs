use serde::{Deserialize, Serialize};
use zombie_survival_core::EntityType;

/// Tunable constants governing a simulation run.
///
/// Every field has a default, so configuration files only need to name the
/// values they change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Rules {
    /// Health the player starts with.
    pub player_health: u32,
    /// Health every zombie starts with. A zombie at one point is wounded.
    pub zombie_health: u32,
    /// Damage a zombie deals per strike, to the player or to a box.
    pub zombie_damage: u32,
    /// Damage a landmine deals to the zombie that sets it off.
    pub landmine_damage: u32,
    /// Health every box starts with.
    pub box_health: u32,
    /// Nominal health of rocks. Rocks never take damage.
    pub rock_health: u32,
    /// Nominal health of landmines. Landmines are consumed, not worn down.
    pub landmine_health: u32,
    /// Damage the player deals to the nearest zombie each tick. Zero disables fire.
    pub player_damage: u32,
}

impl Rules {
    /// Health a freshly placed entity of `kind` starts with.
    #[must_use]
    pub const fn initial_health(&self, kind: EntityType) -> u32 {
        match kind {
            EntityType::Player => self.player_health,
            EntityType::Zombie => self.zombie_health,
            EntityType::Rock => self.rock_health,
            EntityType::Box => self.box_health,
            EntityType::Landmine => self.landmine_health,
            EntityType::Empty => 0,
        }
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            player_health: 2,
            zombie_health: 2,
            zombie_damage: 1,
            landmine_damage: 2,
            box_health: 2,
            rock_health: 1,
            landmine_health: 1,
            player_damage: 0,
        }
    }
}

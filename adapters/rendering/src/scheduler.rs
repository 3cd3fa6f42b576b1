//! Derives per-entity effect lists from consecutive world snapshots.

use std::{collections::BTreeMap, time::Duration};

use glam::Vec2;
use zombie_survival_core::{EntityId, EntitySnapshot, EntityType, Motion, Position, Snapshot};

use crate::{
    effects::{AssetSwap, Effect, EffectKind, PositionTo},
    AssetKey, ZOMBIE_IDLE_FRAMES, ZOMBIE_WALKING_FRAMES,
};

/// Health condition that triggers a damage overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealthThreshold {
    /// Health equals the given value.
    Exactly(u32),
    /// Health is positive but below the entity's maximum.
    BelowMax,
}

impl HealthThreshold {
    fn matches(self, entity: &EntitySnapshot) -> bool {
        if entity.dead() {
            return false;
        }
        match self {
            Self::Exactly(health) => entity.health == health,
            Self::BelowMax => entity.health < entity.max_health,
        }
    }
}

/// Constant effect shown while an entity is hurt.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Overlay {
    /// Hue rotation in degrees.
    HueRotate(f32),
    /// Alpha multiplier.
    Opacity(f32),
}

impl Overlay {
    /// Effect carrying the overlay.
    #[must_use]
    pub const fn effect(self) -> Effect {
        match self {
            Self::HueRotate(degrees) => Effect::HueRotate { degrees },
            Self::Opacity(value) => Effect::Opacity { value },
        }
    }
}

/// Row of the damage overlay policy table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DamageOverlay {
    /// Entity kind the row applies to.
    pub kind: EntityType,
    /// Health condition that activates the overlay.
    pub threshold: HealthThreshold,
    /// Overlay applied while the condition holds.
    pub overlay: Overlay,
}

/// Damage overlays, first matching row wins.
pub const DAMAGE_OVERLAYS: [DamageOverlay; 3] = [
    DamageOverlay {
        kind: EntityType::Zombie,
        threshold: HealthThreshold::Exactly(1),
        overlay: Overlay::Opacity(0.5),
    },
    DamageOverlay {
        kind: EntityType::Player,
        threshold: HealthThreshold::BelowMax,
        overlay: Overlay::HueRotate(300.0),
    },
    DamageOverlay {
        kind: EntityType::Box,
        threshold: HealthThreshold::BelowMax,
        overlay: Overlay::Opacity(0.75),
    },
];

/// Overlay the policy table assigns to `entity` in its current state.
#[must_use]
pub fn overlay_for(entity: &EntitySnapshot) -> Option<Overlay> {
    DAMAGE_OVERLAYS
        .iter()
        .find(|row| row.kind == entity.kind && row.threshold.matches(entity))
        .map(|row| row.overlay)
}

/// Timing used when scheduling effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Duration of one simulation tick; movement tweens span one tick.
    pub tick_interval: Duration,
    /// Time each animation frame stays on screen.
    pub frame_every: Duration,
}

/// Keeps the effect list of every rendered entity in step with the world.
#[derive(Clone, Debug)]
pub struct EffectScheduler {
    config: SchedulerConfig,
    effects: BTreeMap<EntityId, Vec<Effect>>,
}

impl EffectScheduler {
    /// Creates a scheduler without any effects.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            effects: BTreeMap::new(),
        }
    }

    /// Timing the scheduler was built with.
    #[must_use]
    pub const fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Discards every effect and installs the steady-state effects of `snapshot`.
    pub fn seed(&mut self, snapshot: &Snapshot, now: Duration) {
        self.clear();
        for entity in snapshot.iter() {
            self.sync_entity(None, entity, now);
        }
        self.effects.retain(|_, effects| !effects.is_empty());
    }

    /// Schedules effects for the changes between `previous` and `current`.
    ///
    /// Moved entities get a one-tick position tween, health changes swap their
    /// overlay, and zombies switch between idle and walking loops. Effects of
    /// entities absent from `current` are dropped.
    pub fn observe(&mut self, previous: &Snapshot, current: &Snapshot, now: Duration) {
        self.effects.retain(|id, _| current.entity(*id).is_some());
        for entity in current.iter() {
            self.sync_entity(previous.entity(entity.id), entity, now);
        }
        self.effects.retain(|_, effects| !effects.is_empty());
    }

    /// Drops effects that have nothing left to contribute at `now`.
    pub fn retire(&mut self, now: Duration) {
        for effects in self.effects.values_mut() {
            effects.retain(|effect| !effect.is_expired(now));
        }
        self.effects.retain(|_, effects| !effects.is_empty());
    }

    /// Effects attached to `id`.
    #[must_use]
    pub fn effects_for(&self, id: EntityId) -> &[Effect] {
        self.effects.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Number of entities carrying at least one effect.
    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Reports whether no entity carries an effect.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Removes every effect.
    pub fn clear(&mut self) {
        self.effects.clear();
    }

    fn sync_entity(
        &mut self,
        previous: Option<&EntitySnapshot>,
        entity: &EntitySnapshot,
        now: Duration,
    ) {
        let config = self.config;
        let effects = self.effects.entry(entity.id).or_default();

        if let Some(previous) = previous {
            if previous.position != entity.position {
                replace_kind(
                    effects,
                    EffectKind::PositionTo,
                    Some(Effect::PositionTo(PositionTo::new(
                        cell_origin(previous.position),
                        cell_origin(entity.position),
                        now,
                        config.tick_interval,
                    ))),
                );
            }
        }

        let overlay = overlay_for(entity).map(Overlay::effect);
        let installed = effects
            .iter()
            .find(|effect| is_overlay(effect.kind()))
            .cloned();
        if installed != overlay {
            effects.retain(|effect| !is_overlay(effect.kind()));
            effects.extend(overlay);
        }

        match animation_for(entity) {
            Some(frames) => {
                let current = effects.iter().find_map(|effect| match effect {
                    Effect::AssetSwap(swap) => Some(swap.frames()),
                    _ => None,
                });
                if current != Some(frames) {
                    replace_kind(
                        effects,
                        EffectKind::AssetSwap,
                        Some(Effect::AssetSwap(AssetSwap::new(
                            frames.to_vec(),
                            config.frame_every,
                            now,
                        ))),
                    );
                }
            }
            None => replace_kind(effects, EffectKind::AssetSwap, None),
        }
    }
}

/// Top-left corner of `position` in cell units.
#[must_use]
pub fn cell_origin(position: Position) -> Vec2 {
    Vec2::new(position.x() as f32, position.y() as f32)
}

fn animation_for(entity: &EntitySnapshot) -> Option<&'static [AssetKey]> {
    if entity.kind != EntityType::Zombie || entity.dead() {
        return None;
    }
    Some(match entity.motion {
        Motion::Idle => &ZOMBIE_IDLE_FRAMES[..],
        Motion::Walking { .. } => &ZOMBIE_WALKING_FRAMES[..],
    })
}

fn is_overlay(kind: EffectKind) -> bool {
    matches!(kind, EffectKind::HueRotate | EffectKind::Opacity)
}

fn replace_kind(effects: &mut Vec<Effect>, kind: EffectKind, replacement: Option<Effect>) {
    effects.retain(|effect| effect.kind() != kind);
    effects.extend(replacement);
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Zombie Survival adapters.
//!
//! The [`Renderer`] turns a world [`Snapshot`] plus the effects scheduled
//! for it into a list of sprites handed to a [`RenderSurface`]. Surfaces
//! are supplied by adapters (a macroquad window, a terminal) and know
//! nothing about the simulation.

mod assets;
pub mod effects;
mod scheduler;

pub use assets::{
    Asset, AssetBundle, AssetCache, AssetFailure, AssetKey, AssetManifest, AssetSource,
    FileSource, LoadOutcome, ALL_ASSET_KEYS, ZOMBIE_IDLE_FRAMES, ZOMBIE_WALKING_FRAMES,
};
pub use scheduler::{
    cell_origin, overlay_for, DamageOverlay, EffectScheduler, HealthThreshold, Overlay,
    SchedulerConfig, DAMAGE_OVERLAYS,
};

use std::{error::Error, fmt, time::Duration};

use glam::Vec2;
use zombie_survival_core::{EntityId, EntitySnapshot, EntityType, Snapshot};

use crate::effects::Visual;

/// RGBA color used for placeholders and tints.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns the color with its alpha multiplied by `opacity`.
    #[must_use]
    pub fn faded(self, opacity: f32) -> Self {
        Self {
            alpha: self.alpha * opacity.clamp(0.0, 1.0),
            ..self
        }
    }
}

/// Flat color drawn in place of `key` when its image is unavailable.
#[must_use]
pub const fn placeholder_color(key: AssetKey) -> Color {
    match key {
        AssetKey::Background => Color::from_rgb_u8(46, 52, 40),
        AssetKey::Box => Color::from_rgb_u8(150, 105, 60),
        AssetKey::Landmine => Color::from_rgb_u8(200, 40, 40),
        AssetKey::Player => Color::from_rgb_u8(60, 120, 220),
        AssetKey::Rock => Color::from_rgb_u8(120, 120, 120),
        AssetKey::ZombieDead => Color::from_rgb_u8(70, 80, 60),
        AssetKey::ZombieIdleFrame1
        | AssetKey::ZombieIdleFrame2
        | AssetKey::ZombieIdleFrame3
        | AssetKey::ZombieIdleFrame4
        | AssetKey::ZombieWalkingFrame1
        | AssetKey::ZombieWalkingFrame2
        | AssetKey::ZombieWalkingFrame3
        | AssetKey::ZombieWalkingFrame4 => Color::from_rgb_u8(90, 160, 70),
    }
}

/// Fully composed drawing instruction for one image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sprite<'a> {
    /// Entity the sprite belongs to; `None` for the background.
    pub entity: Option<EntityId>,
    /// Image to draw.
    pub key: AssetKey,
    /// Loaded image, or `None` when a placeholder must be drawn.
    pub asset: Option<&'a Asset>,
    /// Top-left corner in surface pixels.
    pub origin: Vec2,
    /// Extent in surface pixels.
    pub size: Vec2,
    /// Hue rotation in degrees.
    pub hue_rotate_degrees: f32,
    /// Alpha in the range 0.0..=1.0.
    pub opacity: f32,
}

impl Sprite<'_> {
    /// Reports whether the sprite has no image and must be drawn as a placeholder.
    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        self.asset.is_none()
    }

    /// Placeholder color with the sprite's opacity applied.
    #[must_use]
    pub fn placeholder_color(&self) -> Color {
        placeholder_color(self.key).faded(self.opacity)
    }
}

/// Drawing target implemented by adapters.
pub trait RenderSurface {
    /// Starts a frame of the given pixel size.
    fn begin_frame(&mut self, size: Vec2);

    /// Draws one sprite. Sprites arrive back to front.
    fn draw_sprite(&mut self, sprite: &Sprite<'_>);

    /// Presents the frame.
    fn end_frame(&mut self);
}

/// What [`Renderer::render`] did for a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The surface is off screen; nothing was drawn.
    Hidden,
    /// Assets are still loading; nothing was drawn.
    AwaitingAssets,
    /// A frame was drawn.
    Drawn {
        /// Sprites drawn, background included.
        sprites: usize,
        /// Sprites drawn as placeholders.
        placeholders: usize,
    },
}

/// Draws world snapshots with their scheduled effects.
#[derive(Clone, Debug)]
pub struct Renderer {
    columns: u32,
    rows: u32,
    cell_size: f32,
    visible: bool,
}

impl Renderer {
    /// Creates a renderer for a grid of `columns` by `rows` cells.
    pub fn new(columns: u32, rows: u32, cell_size: f32) -> Result<Self, RenderingError> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(RenderingError::InvalidCellSize { cell_size });
        }
        if columns == 0 || rows == 0 {
            return Err(RenderingError::EmptyGrid { columns, rows });
        }

        Ok(Self {
            columns,
            rows,
            cell_size,
            visible: true,
        })
    }

    /// Side length of a cell in pixels.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Pixel size of the whole grid.
    #[must_use]
    pub fn surface_size(&self) -> Vec2 {
        Vec2::new(self.columns as f32, self.rows as f32) * self.cell_size
    }

    /// Records whether the drawing surface is on screen.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Reports whether frames will be drawn.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Draws `snapshot` at time `now`.
    ///
    /// Nothing is drawn while hidden or while `assets` is `None`. Missing
    /// images inside a loaded bundle are drawn as placeholders.
    pub fn render<S>(
        &self,
        snapshot: &Snapshot,
        scheduler: &EffectScheduler,
        assets: Option<&AssetBundle>,
        now: Duration,
        surface: &mut S,
    ) -> FrameOutcome
    where
        S: RenderSurface + ?Sized,
    {
        if !self.visible {
            return FrameOutcome::Hidden;
        }
        let Some(assets) = assets else {
            return FrameOutcome::AwaitingAssets;
        };

        let size = self.surface_size();
        let mut drawable: Vec<(u8, &EntitySnapshot, AssetKey)> = snapshot
            .iter()
            .filter_map(|entity| {
                let (layer, key) = base_visual(entity)?;
                Some((layer, entity, key))
            })
            .collect();
        drawable.sort_by_key(|(layer, entity, _)| (*layer, entity.id));

        let mut sprites = Vec::with_capacity(drawable.len() + 1);
        sprites.push(Sprite {
            entity: None,
            key: AssetKey::Background,
            asset: assets.get(AssetKey::Background),
            origin: Vec2::ZERO,
            size,
            hue_rotate_degrees: 0.0,
            opacity: 1.0,
        });
        sprites.extend(drawable.into_iter().map(|(_, entity, key)| {
            let visual = Visual::new(key, cell_origin(entity.position))
                .composed(scheduler.effects_for(entity.id), now);
            Sprite {
                entity: Some(entity.id),
                key: visual.asset,
                asset: assets.get(visual.asset),
                origin: visual.position * self.cell_size,
                size: Vec2::splat(self.cell_size),
                hue_rotate_degrees: visual.hue_rotate_degrees,
                opacity: visual.opacity,
            }
        }));

        surface.begin_frame(size);
        for sprite in &sprites {
            surface.draw_sprite(sprite);
        }
        surface.end_frame();

        let placeholders = sprites.iter().filter(|sprite| sprite.is_placeholder()).count();
        FrameOutcome::Drawn {
            sprites: sprites.len(),
            placeholders,
        }
    }
}

/// Draw layer and untransformed image of `entity`; lower layers draw first.
fn base_visual(entity: &EntitySnapshot) -> Option<(u8, AssetKey)> {
    match entity.kind {
        EntityType::Zombie if entity.dead() => Some((0, AssetKey::ZombieDead)),
        EntityType::Landmine => Some((1, AssetKey::Landmine)),
        EntityType::Rock => Some((2, AssetKey::Rock)),
        EntityType::Box => Some((2, AssetKey::Box)),
        EntityType::Zombie => Some((3, AssetKey::ZombieIdleFrame1)),
        EntityType::Player => Some((4, AssetKey::Player)),
        EntityType::Empty => None,
    }
}

/// Errors that can occur when constructing a renderer.
#[derive(Debug, PartialEq)]
pub enum RenderingError {
    /// Cells must have a positive, finite pixel size.
    InvalidCellSize {
        /// Provided size that failed validation.
        cell_size: f32,
    },
    /// The grid must have at least one row and one column.
    EmptyGrid {
        /// Provided column count.
        columns: u32,
        /// Provided row count.
        rows: u32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCellSize { cell_size } => {
                write!(f, "cell_size must be positive (received {cell_size})")
            }
            Self::EmptyGrid { columns, rows } => {
                write!(f, "grid must not be empty (received {columns}x{rows})")
            }
        }
    }
}

impl Error for RenderingError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use zombie_survival_core::{Motion, Position};

    #[derive(Default)]
    struct RecordingSurface {
        frames: usize,
        size: Option<Vec2>,
        sprites: Vec<(Option<EntityId>, AssetKey, Vec2, bool, f32)>,
    }

    impl RenderSurface for RecordingSurface {
        fn begin_frame(&mut self, size: Vec2) {
            self.size = Some(size);
            self.sprites.clear();
        }

        fn draw_sprite(&mut self, sprite: &Sprite<'_>) {
            self.sprites.push((
                sprite.entity,
                sprite.key,
                sprite.origin,
                sprite.is_placeholder(),
                sprite.opacity,
            ));
        }

        fn end_frame(&mut self) {
            self.frames += 1;
        }
    }

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

    fn world() -> Snapshot {
        Snapshot::new(
            0,
            3,
            2,
            false,
            vec![
                entity(0, EntityType::Player, 2, 1, 2),
                entity(1, EntityType::Zombie, 0, 0, 2),
                entity(2, EntityType::Zombie, 1, 0, 0),
                entity(3, EntityType::Rock, 1, 1, 1),
            ],
        )
    }

    fn bundle_without(missing: AssetKey) -> AssetBundle {
        let source = move |key: AssetKey, _path: &Path| -> anyhow::Result<Vec<u8>> {
            if key == missing {
                anyhow::bail!("not found");
            }
            Ok(vec![0])
        };
        AssetBundle::load(&AssetManifest::builtin("public"), &source)
    }

    fn scheduler() -> EffectScheduler {
        EffectScheduler::new(SchedulerConfig {
            tick_interval: Duration::from_millis(1_000),
            frame_every: Duration::from_millis(250),
        })
    }

    #[test]
    fn renderer_rejects_degenerate_sizes() {
        assert!(matches!(
            Renderer::new(3, 2, 0.0),
            Err(RenderingError::InvalidCellSize { .. })
        ));
        assert!(matches!(
            Renderer::new(3, 2, f32::NAN),
            Err(RenderingError::InvalidCellSize { .. })
        ));
        assert_eq!(
            Renderer::new(0, 2, 32.0).err(),
            Some(RenderingError::EmptyGrid {
                columns: 0,
                rows: 2
            })
        );
    }

    #[test]
    fn hidden_renderer_draws_nothing() {
        let mut renderer = Renderer::new(3, 2, 32.0).expect("valid renderer");
        renderer.set_visible(false);
        let mut surface = RecordingSurface::default();
        let bundle = bundle_without(AssetKey::Rock);

        let outcome = renderer.render(
            &world(),
            &scheduler(),
            Some(&bundle),
            Duration::ZERO,
            &mut surface,
        );

        assert_eq!(outcome, FrameOutcome::Hidden);
        assert_eq!(surface.frames, 0);
    }

    #[test]
    fn unloaded_assets_defer_drawing() {
        let renderer = Renderer::new(3, 2, 32.0).expect("valid renderer");
        let mut surface = RecordingSurface::default();

        let outcome = renderer.render(&world(), &scheduler(), None, Duration::ZERO, &mut surface);

        assert_eq!(outcome, FrameOutcome::AwaitingAssets);
        assert_eq!(surface.frames, 0);
    }

    #[test]
    fn sprites_are_layered_back_to_front() {
        let renderer = Renderer::new(3, 2, 32.0).expect("valid renderer");
        let mut surface = RecordingSurface::default();
        let bundle = bundle_without(AssetKey::Rock);
        let state = world();
        let mut effects = scheduler();
        effects.seed(&state, Duration::ZERO);

        let outcome = renderer.render(
            &state,
            &effects,
            Some(&bundle),
            Duration::ZERO,
            &mut surface,
        );

        assert_eq!(
            outcome,
            FrameOutcome::Drawn {
                sprites: 5,
                placeholders: 1
            }
        );
        assert_eq!(surface.size, Some(Vec2::new(96.0, 64.0)));
        let order: Vec<(Option<EntityId>, AssetKey)> = surface
            .sprites
            .iter()
            .map(|(entity, key, ..)| (*entity, *key))
            .collect();
        assert_eq!(
            order,
            vec![
                (None, AssetKey::Background),
                (Some(EntityId::new(2)), AssetKey::ZombieDead),
                (Some(EntityId::new(3)), AssetKey::Rock),
                (Some(EntityId::new(1)), AssetKey::ZombieIdleFrame1),
                (Some(EntityId::new(0)), AssetKey::Player),
            ]
        );
        let rock = surface.sprites[2];
        assert_eq!(rock.2, Vec2::new(32.0, 32.0));
        assert!(rock.3, "missing rock image falls back to a placeholder");
    }

    #[test]
    fn effects_shape_the_drawn_sprite() {
        let renderer = Renderer::new(3, 2, 10.0).expect("valid renderer");
        let mut surface = RecordingSurface::default();
        let bundle = bundle_without(AssetKey::Rock);
        let before = world();
        let mut moved = world().iter().cloned().collect::<Vec<_>>();
        moved[1].position = Position::new(1, 0);
        moved[1].health = 1;
        let after = Snapshot::new(1, 3, 2, false, moved);
        let mut effects = scheduler();
        effects.seed(&before, Duration::ZERO);
        effects.observe(&before, &after, Duration::from_millis(1_000));

        let _ = renderer.render(
            &after,
            &effects,
            Some(&bundle),
            Duration::from_millis(1_500),
            &mut surface,
        );

        let zombie = surface
            .sprites
            .iter()
            .find(|(entity, ..)| *entity == Some(EntityId::new(1)))
            .copied()
            .expect("zombie drawn");
        assert_eq!(zombie.2, Vec2::new(5.0, 0.0));
        assert!((zombie.4 - 0.5).abs() < f32::EPSILON);
    }
}

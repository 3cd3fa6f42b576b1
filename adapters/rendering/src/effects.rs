//! Time-parameterised visual effects layered onto rendered entities.
//!
//! Sampling is a pure function of the effect and a timestamp measured from
//! the driver's epoch; nothing here keeps a cursor.

use std::time::Duration;

use glam::Vec2;

use crate::AssetKey;

/// Discriminant of an [`Effect`], ordered the way effects are composed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EffectKind {
    /// Constant colour shift.
    HueRotate,
    /// Constant transparency.
    Opacity,
    /// Cyclic frame substitution.
    AssetSwap,
    /// Movement interpolation.
    PositionTo,
}

/// Visual transform attached to a rendering target.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Replaces the base sprite with a looping frame sequence.
    AssetSwap(AssetSwap),
    /// Rotates the sprite's hue by a fixed amount.
    HueRotate {
        /// Rotation in degrees.
        degrees: f32,
    },
    /// Draws the sprite with a fixed alpha.
    Opacity {
        /// Alpha in the range 0.0..=1.0.
        value: f32,
    },
    /// Interpolates the sprite between two cells.
    PositionTo(PositionTo),
}

impl Effect {
    /// Discriminant of the effect.
    #[must_use]
    pub const fn kind(&self) -> EffectKind {
        match self {
            Self::AssetSwap(_) => EffectKind::AssetSwap,
            Self::HueRotate { .. } => EffectKind::HueRotate,
            Self::Opacity { .. } => EffectKind::Opacity,
            Self::PositionTo(_) => EffectKind::PositionTo,
        }
    }

    /// Applies the effect, sampled at `now`, to `visual`.
    pub fn apply(&self, visual: &mut Visual, now: Duration) {
        match self {
            Self::AssetSwap(swap) => {
                if let Some(frame) = swap.frame_at(now) {
                    visual.asset = frame;
                }
            }
            Self::HueRotate { degrees } => {
                visual.hue_rotate_degrees = (visual.hue_rotate_degrees + degrees).rem_euclid(360.0);
            }
            Self::Opacity { value } => {
                visual.opacity *= value.clamp(0.0, 1.0);
            }
            Self::PositionTo(tween) => {
                visual.position = tween.position_at(now);
            }
        }
    }

    /// Reports whether the effect has nothing left to contribute after `now`.
    ///
    /// Only [`Effect::PositionTo`] expires; the other variants hold until replaced.
    #[must_use]
    pub fn is_expired(&self, now: Duration) -> bool {
        match self {
            Self::PositionTo(tween) => tween.is_complete(now),
            Self::AssetSwap(_) | Self::HueRotate { .. } | Self::Opacity { .. } => false,
        }
    }
}

/// Looping frame animation advancing one frame every `every`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetSwap {
    frames: Vec<AssetKey>,
    every: Duration,
    started_at: Duration,
}

impl AssetSwap {
    /// Creates a loop over `frames` that starts at `started_at`.
    #[must_use]
    pub fn new(frames: Vec<AssetKey>, every: Duration, started_at: Duration) -> Self {
        Self {
            frames,
            every,
            started_at,
        }
    }

    /// Ordered frames of the loop.
    #[must_use]
    pub fn frames(&self) -> &[AssetKey] {
        &self.frames
    }

    /// Time the loop started.
    #[must_use]
    pub const fn started_at(&self) -> Duration {
        self.started_at
    }

    /// Frame shown at `now`. Times before the start show the first frame.
    #[must_use]
    pub fn frame_at(&self, now: Duration) -> Option<AssetKey> {
        let every = self.every.as_millis();
        let index = if every == 0 {
            0
        } else {
            let elapsed = now.saturating_sub(self.started_at).as_millis();
            usize::try_from((elapsed / every) % self.frames.len().max(1) as u128).unwrap_or(0)
        };
        self.frames.get(index).copied()
    }
}

/// Linear interpolation between two cell positions over a fixed duration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionTo {
    from: Vec2,
    to: Vec2,
    started_at: Duration,
    duration: Duration,
}

impl PositionTo {
    /// Creates a tween from `from` to `to` expressed in cell units.
    #[must_use]
    pub const fn new(from: Vec2, to: Vec2, started_at: Duration, duration: Duration) -> Self {
        Self {
            from,
            to,
            started_at,
            duration,
        }
    }

    /// Destination of the tween.
    #[must_use]
    pub const fn to(&self) -> Vec2 {
        self.to
    }

    /// Completed fraction at `now`, clamped to 0.0..=1.0.
    #[must_use]
    pub fn progress(&self, now: Duration) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.started_at);
        let ratio = elapsed.as_nanos() as f64 / self.duration.as_nanos() as f64;
        ratio.clamp(0.0, 1.0) as f32
    }

    /// Interpolated position at `now`.
    #[must_use]
    pub fn position_at(&self, now: Duration) -> Vec2 {
        let progress = self.progress(now);
        if progress >= 1.0 {
            self.to
        } else {
            self.from.lerp(self.to, progress)
        }
    }

    /// Reports whether the tween has reached its destination at `now`.
    #[must_use]
    pub fn is_complete(&self, now: Duration) -> bool {
        now >= self.started_at.saturating_add(self.duration)
    }
}

/// Composed visual state of one entity for a single frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Visual {
    /// Sprite to draw.
    pub asset: AssetKey,
    /// Top-left corner in cell units.
    pub position: Vec2,
    /// Accumulated hue rotation in degrees.
    pub hue_rotate_degrees: f32,
    /// Accumulated alpha in the range 0.0..=1.0.
    pub opacity: f32,
}

impl Visual {
    /// Untransformed visual for `asset` placed at `position`.
    #[must_use]
    pub const fn new(asset: AssetKey, position: Vec2) -> Self {
        Self {
            asset,
            position,
            hue_rotate_degrees: 0.0,
            opacity: 1.0,
        }
    }

    /// Applies `effects` at `now` in [`EffectKind`] order.
    #[must_use]
    pub fn composed(mut self, effects: &[Effect], now: Duration) -> Self {
        let mut ordered: Vec<&Effect> = effects.iter().collect();
        ordered.sort_by_key(|effect| effect.kind());
        for effect in ordered {
            effect.apply(&mut self, now);
        }
        self
    }
}

use std::collections::HashMap;

use glam::Vec2;
use macroquad::{
    color::BLACK,
    math::Vec2 as MacroquadVec2,
    texture::{self, DrawTextureParams, Texture2D},
};
use tracing::warn;
use zombie_survival_rendering::{Asset, AssetKey, Color, RenderSurface, Sprite};

use crate::to_macroquad_color;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// Screen placement of the grid surface inside the window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Window pixel where the grid's top-left corner lands.
    pub offset: Vec2,
    /// Uniform scale from grid pixels to window pixels.
    pub scale: f32,
}

impl Viewport {
    /// Largest centred placement of a `surface` sized grid inside `screen`.
    #[must_use]
    pub fn fit(surface: Vec2, screen: Vec2) -> Self {
        if surface.x <= 0.0 || surface.y <= 0.0 {
            return Self {
                offset: Vec2::ZERO,
                scale: 1.0,
            };
        }
        let scale = (screen.x / surface.x).min(screen.y / surface.y).max(0.0);
        Self {
            offset: (screen - surface * scale) * 0.5,
            scale,
        }
    }

    /// Maps a grid-pixel position into window pixels.
    #[must_use]
    pub fn project(&self, position: Vec2) -> Vec2 {
        self.offset + position * self.scale
    }
}

/// Tint approximating a hue rotation, since the backend has no colour-matrix shader.
#[must_use]
pub fn hue_tint(hue_rotate_degrees: f32, opacity: f32) -> Color {
    let opacity = opacity.clamp(0.0, 1.0);
    let hue = hue_rotate_degrees.rem_euclid(360.0);
    if hue == 0.0 {
        return Color::new(1.0, 1.0, 1.0, opacity);
    }

    let sector = hue / 60.0;
    let falloff = 1.0 - (sector % 2.0 - 1.0).abs();
    let (red, green, blue) = match sector as u32 {
        0 => (1.0, falloff, 0.0),
        1 => (falloff, 1.0, 0.0),
        2 => (0.0, 1.0, falloff),
        3 => (0.0, falloff, 1.0),
        4 => (falloff, 0.0, 1.0),
        _ => (1.0, 0.0, falloff),
    };
    let blend = |channel: f32| 0.5 + channel * 0.5;
    Color::new(blend(red), blend(green), blend(blue), opacity)
}

/// Reports whether `bytes` hold an image the backend can decode.
#[must_use]
pub fn is_decodable(bytes: &[u8]) -> bool {
    bytes.starts_with(&PNG_SIGNATURE)
}

#[derive(Clone, Copy, Debug)]
struct DrawCommand {
    texture: Option<Texture2D>,
    position: Vec2,
    size: Vec2,
    color: Color,
}

/// [`RenderSurface`] that draws through macroquad.
///
/// Frames are retained so the window can be repainted on every display
/// refresh even when the driver did not produce a new frame.
#[derive(Debug, Default)]
pub struct MacroquadSurface {
    textures: HashMap<AssetKey, Option<Texture2D>>,
    viewport: Option<Viewport>,
    pending: Vec<DrawCommand>,
    presented: Vec<DrawCommand>,
}

impl MacroquadSurface {
    /// Creates a surface with no cached textures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of textures uploaded so far.
    #[must_use]
    pub fn texture_count(&self) -> usize {
        self.textures.values().flatten().count()
    }

    /// Repaints the most recently completed frame.
    pub fn present(&self) {
        macroquad::window::clear_background(BLACK);
        for command in &self.presented {
            match command.texture {
                Some(texture) => texture::draw_texture_ex(
                    texture,
                    command.position.x,
                    command.position.y,
                    to_macroquad_color(command.color),
                    DrawTextureParams {
                        dest_size: Some(MacroquadVec2::new(command.size.x, command.size.y)),
                        ..DrawTextureParams::default()
                    },
                ),
                None => macroquad::shapes::draw_rectangle(
                    command.position.x,
                    command.position.y,
                    command.size.x,
                    command.size.y,
                    to_macroquad_color(command.color),
                ),
            }
        }
    }

    fn texture(&mut self, asset: &Asset) -> Option<Texture2D> {
        *self.textures.entry(asset.key()).or_insert_with(|| {
            if !is_decodable(asset.bytes()) {
                warn!(
                    asset = %asset.key(),
                    path = %asset.path().display(),
                    "unsupported image format, drawing a placeholder"
                );
                return None;
            }
            Some(Texture2D::from_file_with_format(asset.bytes(), None))
        })
    }
}

impl RenderSurface for MacroquadSurface {
    fn begin_frame(&mut self, size: Vec2) {
        let screen = Vec2::new(
            macroquad::window::screen_width(),
            macroquad::window::screen_height(),
        );
        self.viewport = Some(Viewport::fit(size, screen));
        self.pending.clear();
    }

    fn draw_sprite(&mut self, sprite: &Sprite<'_>) {
        let viewport = self.viewport.unwrap_or(Viewport {
            offset: Vec2::ZERO,
            scale: 1.0,
        });
        let texture = sprite.asset.and_then(|asset| self.texture(asset));
        let color = if texture.is_some() {
            hue_tint(sprite.hue_rotate_degrees, sprite.opacity)
        } else {
            sprite.placeholder_color()
        };
        self.pending.push(DrawCommand {
            texture,
            position: viewport.project(sprite.origin),
            size: sprite.size * viewport.scale,
            color,
        });
    }

    fn end_frame(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.presented);
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_centres_and_scales_uniformly() {
        let viewport = Viewport::fit(Vec2::new(200.0, 100.0), Vec2::new(800.0, 800.0));
        assert_eq!(viewport.scale, 4.0);
        assert_eq!(viewport.offset, Vec2::new(0.0, 200.0));
        assert_eq!(viewport.project(Vec2::new(10.0, 10.0)), Vec2::new(40.0, 240.0));
    }

    #[test]
    fn degenerate_surfaces_fall_back_to_identity() {
        let viewport = Viewport::fit(Vec2::ZERO, Vec2::new(640.0, 480.0));
        assert_eq!(viewport.scale, 1.0);
        assert_eq!(viewport.offset, Vec2::ZERO);
    }

    #[test]
    fn zero_hue_leaves_the_texture_untinted() {
        assert_eq!(hue_tint(0.0, 0.5), Color::new(1.0, 1.0, 1.0, 0.5));
        assert_eq!(hue_tint(360.0, 1.0), Color::new(1.0, 1.0, 1.0, 1.0));
    }

    #[test]
    fn hue_rotation_tints_towards_the_rotated_hue() {
        let magenta = hue_tint(300.0, 1.0);
        assert_eq!(magenta.red, 1.0);
        assert_eq!(magenta.green, 0.5);
        assert_eq!(magenta.blue, 1.0);

        let green = hue_tint(120.0, 1.0);
        assert_eq!(green.red, 0.5);
        assert_eq!(green.green, 1.0);
        assert_eq!(green.blue, 0.5);
    }

    #[test]
    fn only_png_payloads_are_decoded() {
        let mut png = PNG_SIGNATURE.to_vec();
        png.extend_from_slice(&[0, 0, 0, 13]);
        assert!(is_decodable(&png));
        assert!(!is_decodable(b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>"));
        assert!(!is_decodable(b"RIFF\0\0\0\0WEBP"));
    }
}

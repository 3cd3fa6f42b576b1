use std::io::{self, Write};

use glam::Vec2;
use zombie_survival_rendering::{AssetKey, RenderSurface, Sprite};

/// Text surface that prints the grid whenever its content changes.
pub(crate) struct AsciiSurface<W> {
    out: W,
    cell_size: f32,
    grid: Vec<Vec<char>>,
    last_printed: Option<Vec<Vec<char>>>,
    error: Option<io::Error>,
}

impl<W: Write> AsciiSurface<W> {
    pub(crate) fn new(out: W, cell_size: f32) -> Self {
        Self {
            out,
            cell_size: if cell_size > 0.0 { cell_size } else { 1.0 },
            grid: Vec::new(),
            last_printed: None,
            error: None,
        }
    }

    /// First write error encountered since the last call.
    pub(crate) fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.out
    }

    fn print(&mut self) -> io::Result<()> {
        for row in &self.grid {
            writeln!(self.out, "{}", row.iter().collect::<String>())?;
        }
        writeln!(self.out)?;
        self.out.flush()
    }
}

fn glyph(sprite: &Sprite<'_>) -> Option<char> {
    let hurt = sprite.opacity < 1.0 || sprite.hue_rotate_degrees != 0.0;
    let glyph = match sprite.key {
        AssetKey::Background => return None,
        AssetKey::Player => 'P',
        AssetKey::Rock => 'R',
        AssetKey::Box => 'B',
        AssetKey::Landmine => 'L',
        AssetKey::ZombieDead => return Some('x'),
        AssetKey::ZombieIdleFrame1
        | AssetKey::ZombieIdleFrame2
        | AssetKey::ZombieIdleFrame3
        | AssetKey::ZombieIdleFrame4
        | AssetKey::ZombieWalkingFrame1
        | AssetKey::ZombieWalkingFrame2
        | AssetKey::ZombieWalkingFrame3
        | AssetKey::ZombieWalkingFrame4 => 'Z',
    };
    Some(if hurt {
        glyph.to_ascii_lowercase()
    } else {
        glyph
    })
}

impl<W: Write> RenderSurface for AsciiSurface<W> {
    fn begin_frame(&mut self, size: Vec2) {
        let columns = (size.x / self.cell_size).round().max(0.0) as usize;
        let rows = (size.y / self.cell_size).round().max(0.0) as usize;
        self.grid = vec![vec!['.'; columns]; rows];
    }

    fn draw_sprite(&mut self, sprite: &Sprite<'_>) {
        let Some(glyph) = glyph(sprite) else {
            return;
        };
        let cell = (sprite.origin / self.cell_size).round();
        if cell.x < 0.0 || cell.y < 0.0 {
            return;
        }
        if let Some(slot) = self
            .grid
            .get_mut(cell.y as usize)
            .and_then(|row| row.get_mut(cell.x as usize))
        {
            *slot = glyph;
        }
    }

    fn end_frame(&mut self) {
        if self.last_printed.as_ref() == Some(&self.grid) {
            return;
        }
        match self.print() {
            Ok(()) => self.last_printed = Some(self.grid.clone()),
            Err(error) => {
                if self.error.is_none() {
                    self.error = Some(error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zombie_survival_core::EntityId;

    fn sprite(key: AssetKey, column: f32, row: f32, opacity: f32) -> Sprite<'static> {
        Sprite {
            entity: Some(EntityId::new(0)),
            key,
            asset: None,
            origin: Vec2::new(column, row) * 8.0,
            size: Vec2::splat(8.0),
            hue_rotate_degrees: 0.0,
            opacity,
        }
    }

    fn draw(surface: &mut AsciiSurface<Vec<u8>>, sprites: &[Sprite<'_>]) {
        surface.begin_frame(Vec2::new(24.0, 16.0));
        for sprite in sprites {
            surface.draw_sprite(sprite);
        }
        surface.end_frame();
    }

    #[test]
    fn prints_each_distinct_grid_once() {
        let mut surface = AsciiSurface::new(Vec::new(), 8.0);
        let frame = [
            sprite(AssetKey::Background, 0.0, 0.0, 1.0),
            sprite(AssetKey::ZombieIdleFrame2, 0.0, 0.0, 1.0),
            sprite(AssetKey::Player, 2.0, 1.0, 1.0),
        ];

        draw(&mut surface, &frame);
        draw(&mut surface, &frame);

        let text = String::from_utf8(surface.into_inner()).expect("utf8 output");
        assert_eq!(text, "Z..\n..P\n\n");
    }

    #[test]
    fn hurt_and_dead_entities_use_distinct_glyphs() {
        let mut surface = AsciiSurface::new(Vec::new(), 8.0);
        draw(
            &mut surface,
            &[
                sprite(AssetKey::ZombieWalkingFrame1, 0.4, 0.0, 0.5),
                sprite(AssetKey::ZombieDead, 1.0, 0.0, 1.0),
                sprite(AssetKey::Box, 2.0, 0.0, 0.75),
                sprite(AssetKey::Rock, 7.0, 7.0, 1.0),
            ],
        );

        let text = String::from_utf8(surface.into_inner()).expect("utf8 output");
        assert_eq!(text, "zxb\n...\n\n");
    }
}

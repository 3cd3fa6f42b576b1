#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Macroquad-backed windowed adapter for Zombie Survival.
//!
//! Assets load on a background thread into the process-wide cache; frames
//! before the load completes report that they are waiting for assets while
//! the simulation keeps ticking. A window with no drawable area hides the
//! surface, which suppresses drawing but not ticking.

mod surface;

pub use surface::{hue_tint, is_decodable, MacroquadSurface, Viewport};

use std::{thread, time::Duration};

use anyhow::{Context, Result};
use glam::Vec2;
use macroquad::input::{is_key_pressed, KeyCode};
use tracing::{debug, info};
use zombie_survival_rendering::{AssetCache, AssetManifest, AssetSource, FileSource};
use zombie_survival_system_playback::Playback;

struct KeyboardShortcuts {
    /// `Q` or `Escape` to quit the window.
    quit_requested: bool,
    /// `R` restarts the run from the initial map.
    replay_requested: bool,
}

impl KeyboardShortcuts {
    fn poll() -> Self {
        Self {
            quit_requested: is_key_pressed(KeyCode::Escape) || is_key_pressed(KeyCode::Q),
            replay_requested: is_key_pressed(KeyCode::R),
        }
    }
}

/// Windowed backend that drives a [`Playback`] from macroquad's clock.
#[derive(Clone, Debug)]
pub struct MacroquadBackend {
    window_title: String,
    swap_interval: Option<i32>,
}

impl Default for MacroquadBackend {
    fn default() -> Self {
        Self {
            window_title: String::from("Zombie Survival"),
            swap_interval: None,
        }
    }
}

impl MacroquadBackend {
    /// Returns a backend that requests the platform's default swap interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the window title.
    #[must_use]
    pub fn with_window_title(mut self, title: impl Into<String>) -> Self {
        self.window_title = title.into();
        self
    }

    /// Configures the backend to either synchronise presentation with the display refresh rate
    /// or render as fast as possible.
    #[must_use]
    pub fn with_vsync(mut self, enabled: bool) -> Self {
        self.swap_interval = Some(i32::from(enabled));
        self
    }

    /// Opens the window and plays until the user quits.
    ///
    /// Asset loading starts on a background thread; the run starts ticking
    /// immediately and frames pick the bundle up once it is ready.
    pub fn run(self, mut playback: Playback, manifest: AssetManifest) -> Result<()> {
        let _loader = spawn_asset_load(AssetCache::global(), manifest, FileSource)?;
        let size = playback.surface_size();
        let mut config = macroquad::window::Conf {
            window_title: self.window_title,
            window_width: size.x.round() as i32,
            window_height: size.y.round() as i32,
            ..macroquad::window::Conf::default()
        };
        if let Some(swap_interval) = self.swap_interval {
            config.platform.swap_interval = Some(swap_interval);
        }

        macroquad::Window::from_config(config, async move {
            let mut surface = MacroquadSurface::new();
            let epoch = macroquad::time::get_time();
            playback.start(Duration::ZERO);

            loop {
                let keyboard = KeyboardShortcuts::poll();
                if keyboard.quit_requested {
                    playback.stop();
                    break;
                }

                let now = Duration::from_secs_f64((macroquad::time::get_time() - epoch).max(0.0));
                if keyboard.replay_requested {
                    info!("replay requested");
                    playback.start(now);
                }

                playback.set_visible(shows_surface(Vec2::new(
                    macroquad::window::screen_width(),
                    macroquad::window::screen_height(),
                )));
                let assets = AssetCache::global().get();
                let _ = playback.advance(now, assets.as_deref(), &mut surface);
                surface.present();

                macroquad::window::next_frame().await;
            }
        });

        Ok(())
    }
}

/// Starts loading `manifest` into `cache` on a background thread.
///
/// The returned handle may be dropped; the cache publishes the bundle.
pub fn spawn_asset_load<S>(
    cache: &'static AssetCache,
    manifest: AssetManifest,
    source: S,
) -> Result<thread::JoinHandle<()>>
where
    S: AssetSource + Send + 'static,
{
    thread::Builder::new()
        .name(String::from("asset-loader"))
        .spawn(move || {
            let outcome = cache.load_with(&manifest, &source);
            debug!(ready = outcome.bundle().is_some(), "asset load pass returned");
        })
        .context("failed to spawn the asset loader thread")
}

/// Reports whether a window of `screen` pixels has room to draw into.
fn shows_surface(screen: Vec2) -> bool {
    screen.x >= 1.0 && screen.y >= 1.0
}

fn to_macroquad_color(color: zombie_survival_rendering::Color) -> macroquad::color::Color {
    macroquad::color::Color::new(color.red, color.green, color.blue, color.alpha)
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a Zombie Survival scenario.

mod ascii;
mod config;

use std::{
    cell::Cell,
    fs, io,
    path::{Path, PathBuf},
    rc::Rc,
    sync::Arc,
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use zombie_survival_core::parse_map;
use zombie_survival_rendering::{AssetBundle, AssetCache, AssetManifest, FileSource};
use zombie_survival_rendering_macroquad::MacroquadBackend;
use zombie_survival_system_playback::{Phase, Playback, PlaybackConfig};

use crate::ascii::AsciiSurface;

const DEFAULT_MAP: &str = include_str!("../maps/default.map");

/// Plays a zombie survival scenario on a tile grid.
#[derive(Parser, Debug)]
#[command(name = "zombie-survival", version)]
struct Args {
    /// Map file: one row per line using P, Z, R, B, L and `.` for empty cells.
    #[arg(long)]
    map: Option<PathBuf>,

    /// TOML file with playback settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Asset manifest (TOML); the windowed mode defaults to the stock layout under `public/`.
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Milliseconds between simulation ticks.
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Milliseconds between rendered frames.
    #[arg(long)]
    frame_ms: Option<u64>,

    /// Side length of a grid cell in pixels.
    #[arg(long)]
    cell_size: Option<u32>,

    /// Restart automatically when a run finishes.
    #[arg(long)]
    auto_replay: bool,

    /// Open a window instead of printing frames to stdout.
    #[arg(long)]
    window: bool,

    /// Pace headless playback with the wall clock instead of running flat out.
    #[arg(long)]
    realtime: bool,

    /// Headless runs to play before exiting when auto-replay is on.
    #[arg(long, default_value_t = 1)]
    max_runs: u32,

    /// Headless tick budget; stalemates stop here.
    #[arg(long, default_value_t = 10_000)]
    max_ticks: u64,
}

impl Args {
    fn apply(&self, config: &mut PlaybackConfig) {
        if let Some(tick_ms) = self.tick_ms {
            config.tick_interval_ms = tick_ms;
        }
        if let Some(frame_ms) = self.frame_ms {
            config.frame_interval_ms = frame_ms;
        }
        if let Some(cell_size) = self.cell_size {
            config.cell_size = cell_size;
        }
        if self.auto_replay {
            config.auto_replay = true;
        }
    }
}

/// Entry point for the Zombie Survival command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let map = load_map(args.map.as_deref())?;
    let mut config = config::load(args.config.as_deref())?;
    args.apply(&mut config);
    let mut playback = Playback::new(&map, config).context("failed to prepare playback")?;

    let manifest = match args.assets.as_deref() {
        Some(path) => Some(AssetManifest::from_path(path)?),
        None => None,
    };

    if args.window {
        playback.on_finished(|survived| info!(survived, "run ended"));
        let manifest = manifest.unwrap_or_else(|| AssetManifest::builtin("public"));
        return MacroquadBackend::new().run(playback, manifest);
    }

    let assets = match manifest {
        Some(manifest) => AssetCache::global()
            .load_with(&manifest, &FileSource)
            .bundle()
            .cloned()
            .unwrap_or_default(),
        None => Arc::new(AssetBundle::default()),
    };
    let survived = run_headless(&mut playback, &args, &assets)?;
    println!(
        "{}",
        match survived {
            Some(true) => "The player survived.",
            Some(false) => "The player was overrun.",
            None => "The run did not finish.",
        }
    );
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn load_map(path: Option<&Path>) -> Result<Vec<Vec<char>>> {
    let (text, origin) = match path {
        Some(path) => (
            fs::read_to_string(path)
                .with_context(|| format!("failed to read map at {}", path.display()))?,
            path.display().to_string(),
        ),
        None => (DEFAULT_MAP.to_owned(), String::from("built-in map")),
    };
    parse_map(&text).with_context(|| format!("failed to parse {origin}"))
}

/// Plays on a simulated clock, printing frames, until the run is decided.
fn run_headless(
    playback: &mut Playback,
    args: &Args,
    assets: &AssetBundle,
) -> Result<Option<bool>> {
    let outcome = Rc::new(Cell::new(None));
    let sink = Rc::clone(&outcome);
    playback.on_finished(move |survived| sink.set(Some(survived)));

    let mut surface = AsciiSurface::new(io::stdout().lock(), playback.config().cell_size as f32);
    let step = playback
        .config()
        .frame_interval()
        .max(Duration::from_millis(1));
    let mut now = Duration::ZERO;
    playback.start(now);

    loop {
        let _ = playback.advance(now, Some(assets), &mut surface);
        if let Some(error) = surface.take_error() {
            return Err(error).context("failed to write frame");
        }
        if outcome.get().is_some() {
            break;
        }
        if playback.phase() == Phase::AwaitingReplay && playback.runs() >= args.max_runs {
            break;
        }
        if playback.snapshot().tick() >= args.max_ticks {
            warn!(ticks = args.max_ticks, "tick budget exhausted");
            break;
        }
        if args.realtime {
            thread::sleep(step);
        }
        now = now.saturating_add(step);
    }
    playback.stop();

    let snapshot = playback.snapshot();
    Ok(outcome.get().or_else(|| {
        snapshot
            .finished()
            .then(|| snapshot.player().map(|player| !player.dead()))
            .flatten()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_map_is_playable() {
        let map = load_map(None).expect("built-in map parses");
        assert!(Playback::new(&map, PlaybackConfig::default()).is_ok());
    }

    #[test]
    fn flags_override_config_values() {
        let args = Args::parse_from([
            "zombie-survival",
            "--tick-ms",
            "50",
            "--cell-size",
            "12",
            "--auto-replay",
        ]);
        let mut config = PlaybackConfig::default();
        args.apply(&mut config);

        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(config.cell_size, 12);
        assert!(config.auto_replay);
        assert_eq!(config.frame_interval_ms, PlaybackConfig::default().frame_interval_ms);
    }
}

use std::{fs, path::Path};

use anyhow::{Context, Result};
use zombie_survival_system_playback::PlaybackConfig;

/// Reads playback settings from `path`, or returns the defaults when no file is given.
pub(crate) fn load(path: Option<&Path>) -> Result<PlaybackConfig> {
    let Some(path) = path else {
        return Ok(PlaybackConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    parse(&contents).with_context(|| format!("invalid config at {}", path.display()))
}

fn parse(contents: &str) -> Result<PlaybackConfig> {
    toml::from_str(contents).context("failed to parse playback config toml contents")
}

use std::time::Duration;

use serde::{Deserialize, Serialize};
use zombie_survival_rendering::SchedulerConfig;
use zombie_survival_world::Rules;

/// Timing, presentation and rules for a playback session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybackConfig {
    /// Milliseconds between simulation ticks.
    pub tick_interval_ms: u64,
    /// Milliseconds between rendered frames.
    pub frame_interval_ms: u64,
    /// Milliseconds each animation frame stays on screen.
    pub frame_every_ms: u64,
    /// Restart the run automatically once it finishes.
    pub auto_replay: bool,
    /// Pause before an automatic replay, in milliseconds.
    pub replay_delay_ms: u64,
    /// Side length of a grid cell in pixels.
    pub cell_size: u32,
    /// Simulation rules.
    pub rules: Rules,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            frame_interval_ms: 16,
            frame_every_ms: 250,
            auto_replay: false,
            replay_delay_ms: 2_000,
            cell_size: 64,
            rules: Rules::default(),
        }
    }
}

impl PlaybackConfig {
    /// Interval of the simulation tick timer.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Interval of the animation-frame timer.
    #[must_use]
    pub const fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Delay before an automatic replay.
    #[must_use]
    pub const fn replay_delay(&self) -> Duration {
        Duration::from_millis(self.replay_delay_ms)
    }

    /// Timing handed to the effect scheduler.
    #[must_use]
    pub const fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            tick_interval: self.tick_interval(),
            frame_every: Duration::from_millis(self.frame_every_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: PlaybackConfig = toml::from_str(
            "tick_interval_ms = 250\nauto_replay = true\n\n[rules]\nplayer_health = 5\n",
        )
        .expect("valid config");

        assert_eq!(config.tick_interval(), Duration::from_millis(250));
        assert!(config.auto_replay);
        assert_eq!(config.rules.player_health, 5);
        assert_eq!(config.rules.zombie_health, Rules::default().zombie_health);
        assert_eq!(config.frame_interval_ms, 16);
        assert_eq!(config.cell_size, 64);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<PlaybackConfig, _> = toml::from_str("tick_rate = 5\n");
        assert!(result.is_err());
    }
}

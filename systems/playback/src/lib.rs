#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Playback driver that owns the timers of a Zombie Survival run.
//!
//! The driver is polled with a monotonically increasing timestamp. Two
//! independent timers decide what happens on each poll: the tick timer
//! advances the [`Simulation`] and feeds the resulting snapshot delta to the
//! effect scheduler, the frame timer samples effects and draws. A third,
//! one-shot timer restarts the run when auto-replay is enabled.

mod config;
mod timer;

pub use config::PlaybackConfig;
pub use timer::Timer;

use std::{fmt, time::Duration};

use glam::Vec2;
use thiserror::Error;
use tracing::{debug, info};
use zombie_survival_core::{Event, InvalidMapError, Snapshot};
use zombie_survival_rendering::{
    AssetBundle, EffectScheduler, FrameOutcome, RenderSurface, Renderer, RenderingError,
};
use zombie_survival_world::Simulation;

/// Errors raised while setting up playback.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The initial map cannot be simulated.
    #[error("invalid initial map")]
    InvalidMap(#[from] InvalidMapError),
    /// The render configuration is unusable.
    #[error("invalid render configuration")]
    Rendering(#[from] RenderingError),
    /// Frames would not be drawn more often than the simulation ticks.
    #[error(
        "frame interval of {frame_interval_ms}ms must be shorter than the \
         {tick_interval_ms}ms tick interval"
    )]
    FrameIntervalTooLong {
        /// Configured frame interval in milliseconds.
        frame_interval_ms: u64,
        /// Configured tick interval in milliseconds.
        tick_interval_ms: u64,
    },
}

/// Lifecycle stage of a [`Playback`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No timers are running.
    Stopped,
    /// The simulation is ticking.
    Running,
    /// The run finished and a replay is scheduled.
    AwaitingReplay,
    /// The run finished and the end-of-run callback has fired.
    Ended,
}

type FinishedCallback = Box<dyn FnMut(bool)>;

/// External driver that owns every timer of a run.
pub struct Playback {
    config: PlaybackConfig,
    initial: Simulation,
    simulation: Simulation,
    published: Snapshot,
    scheduler: EffectScheduler,
    renderer: Renderer,
    tick_timer: Timer,
    frame_timer: Timer,
    replay_timer: Timer,
    phase: Phase,
    runs: u32,
    render_pending: bool,
    events: Vec<Event>,
    on_finished: Option<FinishedCallback>,
}

impl fmt::Debug for Playback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Playback")
            .field("phase", &self.phase)
            .field("runs", &self.runs)
            .field("tick", &self.published.tick())
            .field("visible", &self.renderer.is_visible())
            .finish_non_exhaustive()
    }
}

impl Playback {
    /// Validates `map` and the timer cadence, then prepares a stopped playback.
    pub fn new(map: &[Vec<char>], config: PlaybackConfig) -> Result<Self, PlaybackError> {
        if config.frame_interval_ms >= config.tick_interval_ms {
            return Err(PlaybackError::FrameIntervalTooLong {
                frame_interval_ms: config.frame_interval_ms,
                tick_interval_ms: config.tick_interval_ms,
            });
        }
        let initial = Simulation::with_rules(map, config.rules)?;
        let renderer = Renderer::new(initial.width(), initial.height(), config.cell_size as f32)?;
        let published = initial.state();
        let scheduler = EffectScheduler::new(config.scheduler_config());

        Ok(Self {
            tick_timer: Timer::new(config.tick_interval()),
            frame_timer: Timer::new(config.frame_interval()),
            replay_timer: Timer::new(config.replay_delay()),
            simulation: initial.clone(),
            initial,
            published,
            scheduler,
            renderer,
            phase: Phase::Stopped,
            runs: 0,
            render_pending: false,
            events: Vec::new(),
            on_finished: None,
            config,
        })
    }

    /// Registers the callback invoked once per run with whether the player survived.
    ///
    /// The callback is not invoked for runs that end in an automatic replay.
    pub fn on_finished(&mut self, callback: impl FnMut(bool) + 'static) {
        self.on_finished = Some(Box::new(callback));
    }

    /// Starts a fresh run from the initial map and requests an immediate frame.
    pub fn start(&mut self, now: Duration) {
        self.replay_timer.stop();
        self.rebuild(now);
        self.tick_timer.start(now);
        self.frame_timer.start(now);
        self.phase = Phase::Running;
        self.runs = self.runs.saturating_add(1);
        info!(run = self.runs, "playback started");
    }

    /// Stops every timer. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.tick_timer.stop();
        self.frame_timer.stop();
        self.replay_timer.stop();
        if self.phase != Phase::Stopped {
            debug!(run = self.runs, "playback stopped");
        }
        self.phase = Phase::Stopped;
    }

    /// Stops the tick timer alone; frames keep drawing the last snapshot.
    pub fn stop_ticking(&mut self) {
        if self.tick_timer.is_running() {
            debug!(run = self.runs, "ticking stopped");
        }
        self.tick_timer.stop();
    }

    /// Stops the frame timer alone; the simulation keeps ticking.
    pub fn stop_rendering(&mut self) {
        if self.frame_timer.is_running() {
            debug!(run = self.runs, "rendering stopped");
        }
        self.frame_timer.stop();
        self.render_pending = false;
    }

    /// Stops every timer and rewinds the simulation to the initial map.
    pub fn reset(&mut self, now: Duration) {
        self.stop();
        self.rebuild(now);
    }

    /// Forwards on-screen visibility to the renderer. Ticking is unaffected.
    pub fn set_visible(&mut self, visible: bool) {
        if visible && !self.renderer.is_visible() {
            self.render_pending = true;
        }
        self.renderer.set_visible(visible);
    }

    /// Fires whichever timers are due at `now` and draws a frame when one is due.
    ///
    /// Returns `None` when no frame was due.
    pub fn advance<S>(
        &mut self,
        now: Duration,
        assets: Option<&AssetBundle>,
        surface: &mut S,
    ) -> Option<FrameOutcome>
    where
        S: RenderSurface + ?Sized,
    {
        if self.replay_timer.poll(now) {
            self.start(now);
        }
        if self.tick_timer.poll(now) {
            self.on_tick(now);
        }

        let frame_due = self.frame_timer.poll(now);
        if !(frame_due || self.render_pending) {
            return None;
        }
        self.render_pending = false;
        self.scheduler.retire(now);
        Some(
            self.renderer
                .render(&self.published, &self.scheduler, assets, now, surface),
        )
    }

    /// Most recently published snapshot.
    #[must_use]
    pub const fn snapshot(&self) -> &Snapshot {
        &self.published
    }

    /// Effects currently scheduled for the published snapshot.
    #[must_use]
    pub const fn effects(&self) -> &EffectScheduler {
        &self.scheduler
    }

    /// Current lifecycle stage.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of runs started so far.
    #[must_use]
    pub const fn runs(&self) -> u32 {
        self.runs
    }

    /// Configuration the playback was built with.
    #[must_use]
    pub const fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Pixel size of the drawing surface.
    #[must_use]
    pub fn surface_size(&self) -> Vec2 {
        self.renderer.surface_size()
    }

    /// Reports whether the tick timer is running.
    #[must_use]
    pub const fn is_ticking(&self) -> bool {
        self.tick_timer.is_running()
    }

    /// Reports whether the frame timer is running.
    #[must_use]
    pub const fn is_rendering(&self) -> bool {
        self.frame_timer.is_running()
    }

    fn rebuild(&mut self, now: Duration) {
        self.simulation = self.initial.clone();
        self.published = self.simulation.state();
        self.scheduler.seed(&self.published, now);
        self.render_pending = true;
    }

    fn on_tick(&mut self, now: Duration) {
        if self.simulation.finished() {
            self.tick_timer.stop();
            self.finish(now);
            return;
        }

        self.events.clear();
        self.simulation.step_with_events(&mut self.events);
        for event in &self.events {
            debug!(?event, "engine event");
        }

        let current = self.simulation.state();
        self.scheduler.observe(&self.published, &current, now);
        self.published = current;
    }

    fn finish(&mut self, now: Duration) {
        let survived = !self.simulation.player().dead();
        info!(
            run = self.runs,
            tick = self.simulation.tick(),
            survived,
            "run finished"
        );

        if self.config.auto_replay {
            self.replay_timer.start(now);
            self.phase = Phase::AwaitingReplay;
            return;
        }

        self.phase = Phase::Ended;
        if let Some(callback) = self.on_finished.as_mut() {
            callback(survived);
        }
    }
}

//! Packetflow Session Controller
//!
//! The session owns the user-facing configuration, the playback clock and the
//! most recently published frame. It is the only component that mutates
//! state; everything it publishes is derived by `packetflow-sim` from a single
//! simulated-time value.
//!
//! # Architecture
//!
//! The session never schedules anything itself. It asks a [`TickSource`] for
//! one tick at a time and is handed the tick back through
//! [`Session::on_tick`] (or [`Session::pump`], which polls the source). A
//! tick whose handle is no longer pending is stale and ignored, so a pause or
//! reset never leaves a dangling callback behind.

#![deny(unsafe_code)]

pub mod clock;
pub mod config;
pub mod tick_source;

pub use clock::{ClockDriver, ClockState, ClockTick};
pub use config::{ConfigError, SessionConfig};
pub use tick_source::{ManualTickSource, SystemTickSource, TickHandle, TickSource};

use packetflow_sim::{
    Connection, Event, Frame, Mode, Node, NodeDetail, Packet, SimTime, Topology, Transport,
    node_detail,
};
use tracing::{debug, info, warn};

use config::{check_loss_rate, check_seek_time, check_speed};

// ============================================================================
// Session Parameters
// ============================================================================

/// Scenario length, identical for every mode.
pub const TOTAL_DURATION_MS: SimTime = packetflow_sim::TOTAL_DURATION_MS;

/// Multiplier applied by [`Session::speed_up`].
pub const SPEED_UP_FACTOR: f64 = 1.5;

// ============================================================================
// Tick Outcome
// ============================================================================

/// What a delivered tick did to the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// A new frame was published at this time.
    Advanced(SimTime),
    /// Simulated time did not move; the previous frame stands.
    Unchanged,
    /// The final frame was published and playback stopped.
    Completed(SimTime),
    /// The tick was not the pending one and was ignored.
    Stale,
}

// ============================================================================
// Session
// ============================================================================

/// Single owned simulation session.
pub struct Session<S: TickSource> {
    config: SessionConfig,
    clock: ClockDriver,
    source: S,
    pending_tick: Option<TickHandle>,
    frame: Frame,
    /// The published frame is the reset frame, untouched by any projection.
    pristine: bool,
}

impl<S: TickSource> Session<S> {
    /// Create a session in its reset state.
    pub fn new(config: SessionConfig, source: S) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            mode = config.mode.as_str(),
            transport = config.transport.as_str(),
            loss = config.loss_rate.percent(),
            speed = config.speed,
            ddos = config.ddos_active,
            "session created"
        );
        Ok(Self {
            clock: ClockDriver::new(TOTAL_DURATION_MS, config.speed),
            frame: Frame::reset(&config.params()),
            config,
            source,
            pending_tick: None,
            pristine: true,
        })
    }

    // ------------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------------

    /// Begin or resume playback. A session sitting at the end resets first.
    pub fn start(&mut self) {
        if self.clock.is_running() {
            return;
        }
        if self.clock.state() == ClockState::Completed {
            self.reset();
        }
        self.clock.start(self.source.now_ms());
        self.schedule_tick();
        info!(time = self.clock.current(), "playback started");
    }

    /// Freeze simulated time at its last published value.
    pub fn pause(&mut self) {
        if self.clock.pause() {
            self.cancel_tick();
            info!(time = self.clock.current(), "playback paused");
        }
    }

    /// Stop playback and restore the initial frame for the current mode.
    pub fn reset(&mut self) {
        self.cancel_tick();
        self.clock.reset();
        self.frame = Frame::reset(&self.config.params());
        self.pristine = true;
        info!(
            mode = self.config.mode.as_str(),
            ddos = self.config.ddos_active,
            "session reset"
        );
    }

    /// Jump to `time` (clamped into the scenario) and publish its frame.
    pub fn seek(&mut self, time: SimTime) -> Result<(), ConfigError> {
        let time = check_seek_time(time).inspect_err(|e| warn!("seek rejected: {e}"))?;

        let time = self.clock.seek(time, self.source.now_ms());
        self.project(time);

        match self.clock.state() {
            ClockState::Completed => {
                self.cancel_tick();
                info!(time, "seek reached end of scenario");
            }
            ClockState::Running => {
                if self.pending_tick.is_none() {
                    self.schedule_tick();
                }
            }
            ClockState::Stopped => {}
        }
        debug!(time, state = self.clock.state().as_str(), "seek");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    pub fn set_protocol(&mut self, transport: Transport) {
        if self.config.transport == transport {
            return;
        }
        self.config.transport = transport;
        info!(transport = transport.as_str(), "protocol changed");
        self.reproject();
    }

    pub fn set_loss_rate(&mut self, percent: u8) -> Result<(), ConfigError> {
        let loss_rate =
            check_loss_rate(percent).inspect_err(|e| warn!("loss rate rejected: {e}"))?;
        if self.config.loss_rate == loss_rate {
            return Ok(());
        }
        self.config.loss_rate = loss_rate;
        info!(loss = percent, "packet loss rate changed");
        self.reproject();
        Ok(())
    }

    /// Change the playback speed. Simulated time stays continuous.
    pub fn set_speed(&mut self, speed: f64) -> Result<(), ConfigError> {
        let speed = check_speed(speed).inspect_err(|e| warn!("speed rejected: {e}"))?;
        self.clock.set_speed(speed, self.source.now_ms());
        self.config.speed = speed;
        info!(speed, "playback speed changed");
        Ok(())
    }

    /// Multiply the playback speed by [`SPEED_UP_FACTOR`].
    pub fn speed_up(&mut self) -> Result<(), ConfigError> {
        self.set_speed(self.config.speed * SPEED_UP_FACTOR)
    }

    /// Switch mode. Any actual change resets the session.
    pub fn set_mode(&mut self, mode: Mode) {
        if self.config.mode == mode {
            return;
        }
        info!(from = self.config.mode.as_str(), to = mode.as_str(), "mode changed");
        self.config.mode = mode;
        self.reset();
    }

    /// Flip the DDoS overlay on or off. Always resets the session.
    pub fn toggle_ddos(&mut self) {
        self.config.ddos_active = !self.config.ddos_active;
        info!(active = self.config.ddos_active, "ddos toggled");
        self.reset();
    }

    pub fn set_quiz_visible(&mut self, visible: bool) {
        self.config.quiz_visible = visible;
    }

    // ------------------------------------------------------------------------
    // Ticks
    // ------------------------------------------------------------------------

    /// Handle a tick delivered by the tick source.
    pub fn on_tick(&mut self, handle: TickHandle, timestamp: f64) -> TickOutcome {
        if self.pending_tick != Some(handle) {
            debug!(handle = handle.id(), "ignoring stale tick");
            return TickOutcome::Stale;
        }
        self.pending_tick = None;

        // A tick is only pending while the clock runs
        match self.clock.tick(timestamp) {
            ClockTick::Idle => unreachable!("pending tick {} on a stopped clock", handle.id()),
            ClockTick::Unchanged => {
                self.schedule_tick();
                TickOutcome::Unchanged
            }
            ClockTick::Advanced(time) => {
                self.project(time);
                self.schedule_tick();
                TickOutcome::Advanced(time)
            }
            ClockTick::Completed(time) => {
                self.project(time);
                info!(time, "playback completed");
                TickOutcome::Completed(time)
            }
        }
    }

    /// Deliver the tick source's due tick, if any.
    pub fn pump(&mut self) -> Option<TickOutcome> {
        let (handle, timestamp) = self.source.take_due()?;
        Some(self.on_tick(handle, timestamp))
    }

    fn schedule_tick(&mut self) {
        self.pending_tick = Some(self.source.request_tick());
    }

    fn cancel_tick(&mut self) {
        if let Some(handle) = self.pending_tick.take() {
            self.source.cancel_tick(handle);
        }
    }

    // ------------------------------------------------------------------------
    // Projection
    // ------------------------------------------------------------------------

    fn project(&mut self, time: SimTime) {
        self.frame = Frame::project(&self.config.params(), time);
        self.pristine = false;
    }

    /// Re-derive the published frame after a non-resetting config change.
    fn reproject(&mut self) {
        if self.pristine {
            return;
        }
        debug!(time = self.clock.current(), "re-projecting frame");
        self.project(self.clock.current());
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// The most recently published frame.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn current_time(&self) -> SimTime {
        self.frame.time
    }

    pub fn total_duration(&self) -> SimTime {
        self.clock.total()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.frame.nodes
    }

    pub fn packets(&self) -> &[Packet] {
        &self.frame.packets
    }

    pub fn events(&self) -> &[Event] {
        &self.frame.events
    }

    pub fn explanation(&self) -> &'static str {
        self.frame.explanation
    }

    /// Connections of the active topology variant.
    pub fn connections(&self) -> Vec<Connection> {
        Topology::for_ddos(self.config.ddos_active)
            .connections()
            .to_vec()
    }

    /// Detail for node `id` at the published time.
    pub fn node_detail(&self, id: &str) -> NodeDetail {
        node_detail(&self.config.params(), id, self.frame.time)
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn clock_state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn tick_source(&self) -> &S {
        &self.source
    }

    pub fn tick_source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

// ============================================================================
// Tests
// ============================================================================

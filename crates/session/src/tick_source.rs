//! Tick sources.
//!
//! A tick source supplies real-time timestamps and delivers at most one
//! pending tick at a time. The session requests a tick after every frame it
//! publishes while running, and cancels the pending one on pause, reset or
//! completion.

use std::time::{Duration, Instant};

/// Default spacing of [`SystemTickSource`] ticks (roughly 60 Hz).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Identifies one requested tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(u64);

impl TickHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// External recurring-callback clock.
pub trait TickSource {
    /// Monotonic real time in milliseconds.
    fn now_ms(&self) -> f64;

    /// Request the next tick, replacing any pending request.
    fn request_tick(&mut self) -> TickHandle;

    /// Cancel `handle` if it is still pending.
    fn cancel_tick(&mut self, handle: TickHandle);

    /// Take the pending tick if it is due, with the timestamp it fires at.
    fn take_due(&mut self) -> Option<(TickHandle, f64)>;
}

// ============================================================================
// Manual Source
// ============================================================================

/// Tick source driven explicitly. Real time only moves through
/// [`ManualTickSource::advance`], and a pending tick becomes due on the next
/// advance.
#[derive(Debug, Clone, Default)]
pub struct ManualTickSource {
    now: f64,
    next_id: u64,
    pending: Option<TickHandle>,
    due: bool,
}

impl ManualTickSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the real-time axis at `now` milliseconds.
    pub fn starting_at(now: f64) -> Self {
        Self {
            now,
            ..Self::default()
        }
    }

    /// Move real time forward by `ms`.
    ///
    /// # Panics
    /// If `ms` is negative or not finite; real time is monotonic.
    pub fn advance(&mut self, ms: f64) {
        assert!(
            ms.is_finite() && ms >= 0.0,
            "real time must move forward, got {ms}"
        );
        self.now += ms;
        if self.pending.is_some() {
            self.due = true;
        }
    }

    pub fn pending(&self) -> Option<TickHandle> {
        self.pending
    }
}

impl TickSource for ManualTickSource {
    fn now_ms(&self) -> f64 {
        self.now
    }

    fn request_tick(&mut self) -> TickHandle {
        self.next_id += 1;
        let handle = TickHandle(self.next_id);
        self.pending = Some(handle);
        self.due = false;
        handle
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
            self.due = false;
        }
    }

    fn take_due(&mut self) -> Option<(TickHandle, f64)> {
        if !self.due {
            return None;
        }
        self.due = false;
        self.pending.take().map(|handle| (handle, self.now))
    }
}

// ============================================================================
// System Source
// ============================================================================

/// Tick source backed by [`Instant`], suitable for a thread-with-sleep loop:
///
/// ```no_run
/// # use packetflow_session::{Session, SessionConfig, SystemTickSource};
/// let mut session = Session::new(SessionConfig::default(), SystemTickSource::new())?;
/// session.start();
/// while session.is_running() {
///     if let Some(deadline) = session.tick_source().next_deadline() {
///         std::thread::sleep(deadline.saturating_duration_since(std::time::Instant::now()));
///     }
///     session.pump();
/// }
/// # Ok::<(), packetflow_session::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SystemTickSource {
    origin: Instant,
    interval: Duration,
    next_id: u64,
    pending: Option<(TickHandle, Instant)>,
}

impl SystemTickSource {
    pub fn new() -> Self {
        Self::with_interval(DEFAULT_FRAME_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            origin: Instant::now(),
            interval,
            next_id: 0,
            pending: None,
        }
    }

    /// When the pending tick falls due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.map(|(_, deadline)| deadline)
    }

    fn millis_since_origin(&self, instant: Instant) -> f64 {
        instant.duration_since(self.origin).as_secs_f64() * 1000.0
    }
}

impl Default for SystemTickSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for SystemTickSource {
    fn now_ms(&self) -> f64 {
        self.millis_since_origin(Instant::now())
    }

    fn request_tick(&mut self) -> TickHandle {
        self.next_id += 1;
        let handle = TickHandle(self.next_id);
        self.pending = Some((handle, Instant::now() + self.interval));
        handle
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        if self.pending.is_some_and(|(pending, _)| pending == handle) {
            self.pending = None;
        }
    }

    fn take_due(&mut self) -> Option<(TickHandle, f64)> {
        let (handle, deadline) = self.pending?;
        let now = Instant::now();
        if now < deadline {
            return None;
        }
        self.pending = None;
        Some((handle, self.millis_since_origin(now)))
    }
}

// ============================================================================
// Tests
// ============================================================================

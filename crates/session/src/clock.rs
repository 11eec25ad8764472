//! Playback clock driver.
//!
//! Maps real elapsed milliseconds onto simulated time. The driver never reads
//! a clock itself: every operation that needs "now" takes the timestamp from
//! the caller, which gets it from a [`crate::TickSource`].

use packetflow_sim::SimTime;

/// Playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Running,
    /// Simulated time reached the total duration. Frozen until reset.
    Completed,
}

impl ClockState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }
}

/// Result of feeding one tick timestamp to the driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockTick {
    /// The driver is not running; nothing to do.
    Idle,
    /// Simulated time did not move since the last published value.
    Unchanged,
    Advanced(SimTime),
    /// Simulated time reached the total duration on this tick.
    Completed(SimTime),
}

/// Stopped/Running/Completed state machine over simulated time.
///
/// While running, `time = anchor_sim + (now - anchor_real) * speed`, capped at
/// `total`. The anchor pair is re-recorded on start, seek and speed change so
/// that simulated time is continuous across each of them.
#[derive(Debug, Clone)]
pub struct ClockDriver {
    state: ClockState,
    total: SimTime,
    speed: f64,
    current: SimTime,
    anchor_real: f64,
    anchor_sim: SimTime,
}

impl ClockDriver {
    pub fn new(total: SimTime, speed: f64) -> Self {
        assert!(total > 0.0, "total duration must be positive, got {total}");
        Self {
            state: ClockState::Stopped,
            total,
            speed,
            current: 0.0,
            anchor_real: 0.0,
            anchor_sim: 0.0,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    /// Last published simulated time.
    pub fn current(&self) -> SimTime {
        self.current
    }

    pub fn total(&self) -> SimTime {
        self.total
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    fn anchor(&mut self, now: f64) {
        self.anchor_real = now;
        self.anchor_sim = self.current;
    }

    /// Begin running from the current simulated time.
    ///
    /// # Panics
    /// If the driver is completed. Callers reset first.
    pub fn start(&mut self, now: f64) {
        assert!(
            self.state != ClockState::Completed,
            "cannot start a completed clock without a reset"
        );
        if self.state == ClockState::Running {
            return;
        }
        self.anchor(now);
        self.state = ClockState::Running;
    }

    /// Freeze simulated time. Returns whether the driver was running.
    pub fn pause(&mut self) -> bool {
        let was_running = self.is_running();
        if was_running {
            self.state = ClockState::Stopped;
        }
        was_running
    }

    pub fn reset(&mut self) {
        self.state = ClockState::Stopped;
        self.current = 0.0;
        self.anchor_real = 0.0;
        self.anchor_sim = 0.0;
    }

    /// Jump to `time`, clamped into `[0, total]`. Returns the clamped time.
    ///
    /// Seeking to the end completes the driver. Otherwise a running driver
    /// keeps running from the new time and any other state becomes stopped.
    pub fn seek(&mut self, time: SimTime, now: f64) -> SimTime {
        let time = time.clamp(0.0, self.total);
        self.current = time;
        self.state = if time >= self.total {
            ClockState::Completed
        } else if self.is_running() {
            self.anchor(now);
            ClockState::Running
        } else {
            ClockState::Stopped
        };
        time
    }

    /// Change the speed multiplier. Applies from `now` onward.
    pub fn set_speed(&mut self, speed: f64, now: f64) {
        if self.is_running() {
            self.anchor(now);
        }
        self.speed = speed;
    }

    /// Advance to the simulated time corresponding to real time `now`.
    pub fn tick(&mut self, now: f64) -> ClockTick {
        if !self.is_running() {
            return ClockTick::Idle;
        }

        let raw = self.anchor_sim + (now - self.anchor_real) * self.speed;
        if raw >= self.total {
            self.current = self.total;
            self.state = ClockState::Completed;
            return ClockTick::Completed(self.total);
        }
        if raw == self.current {
            return ClockTick::Unchanged;
        }
        self.current = raw;
        ClockTick::Advanced(raw)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> ClockDriver {
        ClockDriver::new(25_000.0, 0.5)
    }

    #[test]
    fn test_tick_idle_when_stopped() {
        let mut clock = driver();
        assert_eq!(clock.tick(1000.0), ClockTick::Idle);
        assert_eq!(clock.current(), 0.0);
    }

    #[test]
    fn test_elapsed_real_time_scaled_by_speed() {
        let mut clock = driver();
        clock.start(100.0);
        assert_eq!(clock.tick(1100.0), ClockTick::Advanced(500.0));
        assert_eq!(clock.tick(1100.0), ClockTick::Unchanged);
        assert_eq!(clock.tick(2100.0), ClockTick::Advanced(1000.0));
    }

    #[test]
    fn test_pause_freezes_and_resume_continues() {
        let mut clock = driver();
        clock.start(0.0);
        clock.tick(2000.0);
        assert!(clock.pause());
        assert!(!clock.pause());
        assert_eq!(clock.tick(10_000.0), ClockTick::Idle);
        assert_eq!(clock.current(), 1000.0);

        // Resume anchored at the frozen time, not at the original origin
        clock.start(50_000.0);
        assert_eq!(clock.tick(51_000.0), ClockTick::Advanced(1500.0));
    }

    #[test]
    fn test_completes_at_total() {
        let mut clock = driver();
        clock.start(0.0);
        assert_eq!(clock.tick(60_000.0), ClockTick::Completed(25_000.0));
        assert_eq!(clock.state(), ClockState::Completed);
        assert_eq!(clock.tick(70_000.0), ClockTick::Idle);
        assert_eq!(clock.current(), 25_000.0);
    }

    #[test]
    fn test_speed_change_is_continuous() {
        let mut clock = driver();
        clock.start(0.0);
        clock.tick(4000.0); // 2000 simulated
        clock.set_speed(2.0, 4000.0);
        assert_eq!(clock.tick(4000.0), ClockTick::Unchanged);
        assert_eq!(clock.tick(4500.0), ClockTick::Advanced(3000.0));
    }

    #[test]
    fn test_speed_change_while_stopped() {
        let mut clock = driver();
        clock.set_speed(1.0, 123.0);
        clock.start(1000.0);
        assert_eq!(clock.tick(2000.0), ClockTick::Advanced(1000.0));
    }

    #[test]
    fn test_seek_transitions() {
        let mut clock = driver();
        assert_eq!(clock.seek(-50.0, 0.0), 0.0);
        assert_eq!(clock.state(), ClockState::Stopped);

        assert_eq!(clock.seek(99_999.0, 0.0), 25_000.0);
        assert_eq!(clock.state(), ClockState::Completed);

        clock.reset();
        clock.start(0.0);
        clock.seek(8000.0, 500.0);
        assert!(clock.is_running());
        assert_eq!(clock.tick(1500.0), ClockTick::Advanced(8500.0));
    }

    #[test]
    fn test_seek_from_completed_stops() {
        let mut clock = driver();
        clock.seek(25_000.0, 0.0);
        clock.seek(1000.0, 0.0);
        assert_eq!(clock.state(), ClockState::Stopped);
        assert_eq!(clock.current(), 1000.0);
    }

    #[test]
    fn test_reset_zeroes_time() {
        let mut clock = driver();
        clock.start(0.0);
        clock.tick(3000.0);
        clock.reset();
        assert_eq!(clock.state(), ClockState::Stopped);
        assert_eq!(clock.current(), 0.0);
    }

    #[test]
    #[should_panic(expected = "without a reset")]
    fn test_start_completed_panics() {
        let mut clock = driver();
        clock.seek(25_000.0, 0.0);
        clock.start(0.0);
    }
}

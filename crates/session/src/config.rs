//! Session configuration and its validation errors.

use packetflow_sim::{DEFAULT_SPEED, LossRate, Mode, Params, Transport};
use thiserror::Error;

/// Rejected configuration value. The session state is left untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("packet loss rate {0}% is outside 0..=50 in steps of 5")]
    InvalidLossRate(u8),

    #[error("playback speed {0} must be finite and positive")]
    InvalidSpeed(f64),

    #[error("seek target {0} is not a finite time")]
    InvalidSeekTime(f64),
}

/// User-facing configuration owned by the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub mode: Mode,
    /// Only consulted in http mode.
    pub transport: Transport,
    pub loss_rate: LossRate,
    /// Playback speed multiplier.
    pub speed: f64,
    pub ddos_active: bool,
    /// Presentation flag for the quiz panel. No effect on the simulation.
    pub quiz_visible: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Http,
            transport: Transport::Tcp,
            loss_rate: LossRate::default(),
            speed: DEFAULT_SPEED,
            ddos_active: false,
            quiz_visible: false,
        }
    }
}

impl SessionConfig {
    /// Check every field against its domain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_speed(self.speed)?;
        Ok(())
    }

    /// The subset of configuration the projector depends on.
    pub fn params(&self) -> Params {
        Params {
            mode: self.mode,
            transport: self.transport,
            loss_rate: self.loss_rate,
            speed: self.speed,
            ddos_active: self.ddos_active,
        }
    }
}

pub(crate) fn check_speed(speed: f64) -> Result<f64, ConfigError> {
    if speed.is_finite() && speed > 0.0 {
        Ok(speed)
    } else {
        Err(ConfigError::InvalidSpeed(speed))
    }
}

pub(crate) fn check_loss_rate(percent: u8) -> Result<LossRate, ConfigError> {
    LossRate::new(percent).ok_or(ConfigError::InvalidLossRate(percent))
}

pub(crate) fn check_seek_time(time: f64) -> Result<f64, ConfigError> {
    if time.is_finite() {
        Ok(time)
    } else {
        Err(ConfigError::InvalidSeekTime(time))
    }
}

// ============================================================================
// Tests
// ============================================================================

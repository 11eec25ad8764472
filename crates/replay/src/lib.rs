//! Packetflow Session Replay
//!
//! Records a script of user commands run against a session and verifies that
//! replaying the script reproduces the same frames.
//!
//! # Architecture
//!
//! - `TraceRecorder`: runs commands on a session driven by a
//!   [`ManualTickSource`] and stores the frame digest after each one
//! - `verify_trace`: re-runs a recorded trace and reports the first divergence
//!
//! Real time only moves through [`Command::Advance`], so a trace captures
//! every input the session saw and replays bit-identically.

#![deny(unsafe_code)]

use packetflow_session::{
    ClockState, ConfigError, ManualTickSource, Session, SessionConfig, TickOutcome,
};
use packetflow_sim::digest::FRAME_DIGEST_ALGO_ID;
use packetflow_sim::{Mode, SimTime, Transport};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// Commands
// ============================================================================

/// One user action against a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Start,
    Pause,
    Reset,
    Seek(SimTime),
    SetProtocol(Transport),
    SetLossRate(u8),
    SetSpeed(f64),
    SpeedUp,
    SetMode(Mode),
    ToggleDdos,
    SetQuizVisible(bool),
    /// Move real time forward by this many milliseconds and deliver the due
    /// tick, if any.
    Advance(f64),
}

/// Failure while recording a trace.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TraceError {
    #[error("invalid session configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("command {index} ({command:?}) rejected: {source}")]
    Rejected {
        index: usize,
        command: Command,
        #[source]
        source: ConfigError,
    },

    #[error("command {index} advances real time by {ms}, which is not a finite non-negative duration")]
    InvalidAdvance { index: usize, ms: f64 },
}

/// Apply `command` to `session`. Rejected commands leave the session untouched.
fn apply(
    session: &mut Session<ManualTickSource>,
    index: usize,
    command: Command,
) -> Result<Option<TickOutcome>, TraceError> {
    let rejected = |source| TraceError::Rejected {
        index,
        command,
        source,
    };

    match command {
        Command::Start => session.start(),
        Command::Pause => session.pause(),
        Command::Reset => session.reset(),
        Command::Seek(time) => session.seek(time).map_err(rejected)?,
        Command::SetProtocol(transport) => session.set_protocol(transport),
        Command::SetLossRate(percent) => session.set_loss_rate(percent).map_err(rejected)?,
        Command::SetSpeed(speed) => session.set_speed(speed).map_err(rejected)?,
        Command::SpeedUp => session.speed_up().map_err(rejected)?,
        Command::SetMode(mode) => session.set_mode(mode),
        Command::ToggleDdos => session.toggle_ddos(),
        Command::SetQuizVisible(visible) => session.set_quiz_visible(visible),
        Command::Advance(ms) => {
            if !(ms.is_finite() && ms >= 0.0) {
                return Err(TraceError::InvalidAdvance { index, ms });
            }
            session.tick_source_mut().advance(ms);
            return Ok(session.pump());
        }
    }
    Ok(None)
}

// ============================================================================
// Trace Recorder
// ============================================================================

/// A recorded session: its starting configuration, the accepted commands and
/// the frame digest published after each one.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTrace {
    pub digest_algo_id: String,
    pub config: SessionConfig,
    pub commands: Vec<Command>,
    /// `digests[i]` is the frame digest after `commands[i]`.
    pub digests: Vec<u64>,
    pub final_time: SimTime,
    pub final_state: ClockState,
    pub final_digest: u64,
    /// Hex SHA-256 over the digest chain.
    pub fingerprint: String,
}

/// Records commands run against a live session.
pub struct TraceRecorder {
    config: SessionConfig,
    session: Session<ManualTickSource>,
    commands: Vec<Command>,
    digests: Vec<u64>,
}

impl TraceRecorder {
    pub fn new(config: SessionConfig) -> Result<Self, TraceError> {
        Ok(Self {
            session: Session::new(config, ManualTickSource::new())?,
            config,
            commands: Vec::new(),
            digests: Vec::new(),
        })
    }

    /// Run `command` and record it with the resulting frame digest.
    ///
    /// A rejected command is not recorded.
    pub fn record(&mut self, command: Command) -> Result<u64, TraceError> {
        let index = self.commands.len();
        apply(&mut self.session, index, command)?;

        let digest = self.session.frame().digest();
        debug!(index, ?command, digest, "command recorded");
        self.commands.push(command);
        self.digests.push(digest);
        Ok(digest)
    }

    /// Record every command in order, stopping at the first rejection.
    pub fn record_all(
        &mut self,
        commands: impl IntoIterator<Item = Command>,
    ) -> Result<(), TraceError> {
        for command in commands {
            self.record(command)?;
        }
        Ok(())
    }

    /// The live session being recorded.
    pub fn session(&self) -> &Session<ManualTickSource> {
        &self.session
    }

    /// Finalize the trace.
    pub fn finalize(self) -> SessionTrace {
        let fingerprint = chain_fingerprint(&self.digests);
        let trace = SessionTrace {
            digest_algo_id: FRAME_DIGEST_ALGO_ID.to_string(),
            config: self.config,
            final_time: self.session.current_time(),
            final_state: self.session.clock_state(),
            final_digest: self.session.frame().digest(),
            commands: self.commands,
            digests: self.digests,
            fingerprint,
        };
        info!(
            commands = trace.commands.len(),
            final_time = trace.final_time,
            fingerprint = %trace.fingerprint,
            "trace finalized"
        );
        trace
    }
}

/// Hex SHA-256 over the little-endian digest sequence.
pub fn chain_fingerprint(digests: &[u64]) -> String {
    let mut hasher = Sha256::new();
    for digest in digests {
        hasher.update(digest.to_le_bytes());
    }
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// Trace Verification
// ============================================================================

/// Trace verification error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VerifyError {
    #[error("Digest algorithm mismatch: expected {expected}, got {actual}")]
    AlgorithmMismatch { expected: String, actual: String },

    #[error("Invalid trace format: {reason}")]
    InvalidFormat { reason: String },

    #[error("Invalid session configuration: {0}")]
    InvalidConfig(ConfigError),

    #[error("Command {index} rejected on replay: {reason}")]
    CommandRejected { index: usize, reason: String },

    #[error("Digest mismatch after command {index}: expected {expected:#x}, got {actual:#x}")]
    StepDigestMismatch {
        index: usize,
        expected: u64,
        actual: u64,
    },

    #[error("Final time mismatch: expected {expected}, got {actual}")]
    FinalTimeMismatch { expected: SimTime, actual: SimTime },

    #[error("Final state mismatch: expected {expected:?}, got {actual:?}")]
    FinalStateMismatch {
        expected: ClockState,
        actual: ClockState,
    },

    #[error("Final digest mismatch: expected {expected:#x}, got {actual:#x}")]
    FinalDigestMismatch { expected: u64, actual: u64 },

    #[error("Fingerprint mismatch: expected {expected}, got {actual}")]
    FingerprintMismatch { expected: String, actual: String },
}

/// Verify that replaying `trace` reproduces every recorded digest.
///
/// # Verification Steps
/// 1. Check the digest algorithm and the command/digest pairing
/// 2. Build a fresh session from the recorded configuration
/// 3. Replay each command, comparing the digest after each one
/// 4. Compare final time, clock state and final digest
/// 5. Recompute the chain fingerprint
pub fn verify_trace(trace: &SessionTrace) -> Result<(), VerifyError> {
    let result = replay(trace);
    match &result {
        Ok(()) => info!(commands = trace.commands.len(), "trace verified"),
        Err(e) => warn!("trace verification failed: {e}"),
    }
    result
}

fn replay(trace: &SessionTrace) -> Result<(), VerifyError> {
    // Step 1
    if trace.digest_algo_id != FRAME_DIGEST_ALGO_ID {
        return Err(VerifyError::AlgorithmMismatch {
            expected: FRAME_DIGEST_ALGO_ID.to_string(),
            actual: trace.digest_algo_id.clone(),
        });
    }
    validate_trace_shape(trace)?;

    // Step 2
    let mut session = Session::new(trace.config, ManualTickSource::new())
        .map_err(VerifyError::InvalidConfig)?;

    // Step 3
    for (index, (&command, &expected)) in trace.commands.iter().zip(&trace.digests).enumerate() {
        apply(&mut session, index, command).map_err(|e| VerifyError::CommandRejected {
            index,
            reason: e.to_string(),
        })?;
        let actual = session.frame().digest();
        if actual != expected {
            return Err(VerifyError::StepDigestMismatch {
                index,
                expected,
                actual,
            });
        }
    }

    // Step 4
    if session.current_time() != trace.final_time {
        return Err(VerifyError::FinalTimeMismatch {
            expected: trace.final_time,
            actual: session.current_time(),
        });
    }
    if session.clock_state() != trace.final_state {
        return Err(VerifyError::FinalStateMismatch {
            expected: trace.final_state,
            actual: session.clock_state(),
        });
    }
    let actual_digest = session.frame().digest();
    if actual_digest != trace.final_digest {
        return Err(VerifyError::FinalDigestMismatch {
            expected: trace.final_digest,
            actual: actual_digest,
        });
    }

    // Step 5
    let fingerprint = chain_fingerprint(&trace.digests);
    if fingerprint != trace.fingerprint {
        return Err(VerifyError::FingerprintMismatch {
            expected: trace.fingerprint.clone(),
            actual: fingerprint,
        });
    }

    Ok(())
}

fn validate_trace_shape(trace: &SessionTrace) -> Result<(), VerifyError> {
    if trace.commands.len() != trace.digests.len() {
        return Err(VerifyError::InvalidFormat {
            reason: format!(
                "{} commands but {} digests",
                trace.commands.len(),
                trace.digests.len()
            ),
        });
    }
    if trace.fingerprint.len() != 64 || !trace.fingerprint.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(VerifyError::InvalidFormat {
            reason: format!("fingerprint {:?} is not a hex SHA-256", trace.fingerprint),
        });
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn script() -> Vec<Command> {
        vec![
            Command::Start,
            Command::Advance(1000.0),
            Command::Advance(2500.0),
            Command::SetLossRate(20),
            Command::Advance(4000.0),
            Command::Pause,
            Command::Seek(9500.0),
            Command::SetProtocol(Transport::Udp),
            Command::Start,
            Command::SpeedUp,
            Command::Advance(3000.0),
            Command::ToggleDdos,
            Command::Start,
            Command::Advance(20_000.0),
            Command::SetMode(Mode::WebSocket),
            Command::Seek(7000.0),
            Command::SetQuizVisible(true),
            Command::Start,
            Command::Advance(100_000.0),
        ]
    }

    fn create_test_trace() -> SessionTrace {
        let mut recorder = TraceRecorder::new(SessionConfig::default()).unwrap();
        recorder.record_all(script()).unwrap();
        recorder.finalize()
    }

    #[test]
    fn test_trace_has_required_fields() {
        let trace = create_test_trace();
        assert_eq!(trace.digest_algo_id, FRAME_DIGEST_ALGO_ID);
        assert_eq!(trace.commands.len(), script().len());
        assert_eq!(trace.digests.len(), trace.commands.len());
        assert_eq!(trace.final_state, ClockState::Completed);
        assert_eq!(trace.final_time, 25_000.0);
        assert_eq!(trace.final_digest, *trace.digests.last().unwrap());
        assert_eq!(trace.fingerprint.len(), 64);
    }

    #[test]
    fn test_trace_verification_passes() {
        let trace = create_test_trace();
        let result = verify_trace(&trace);
        assert!(result.is_ok(), "Trace verification failed: {result:?}");
    }

    #[test]
    fn test_recording_is_deterministic() {
        assert_eq!(create_test_trace(), create_test_trace());
    }

    #[test]
    fn test_tampered_step_digest_detected() {
        let mut trace = create_test_trace();
        trace.digests[4] ^= 1;
        trace.fingerprint = chain_fingerprint(&trace.digests);
        assert!(matches!(
            verify_trace(&trace),
            Err(VerifyError::StepDigestMismatch { index: 4, .. })
        ));
    }

    #[test]
    fn test_tampered_config_detected() {
        let mut trace = create_test_trace();
        trace.config.transport = Transport::Udp;
        assert!(matches!(
            verify_trace(&trace),
            Err(VerifyError::StepDigestMismatch { .. })
        ));
    }

    #[test]
    fn test_tampered_fingerprint_detected() {
        let mut trace = create_test_trace();
        trace.fingerprint = "0".repeat(64);
        assert!(matches!(
            verify_trace(&trace),
            Err(VerifyError::FingerprintMismatch { .. })
        ));
    }

    #[test]
    fn test_tampered_final_time_detected() {
        let mut trace = create_test_trace();
        trace.final_time = 24_000.0;
        assert!(matches!(
            verify_trace(&trace),
            Err(VerifyError::FinalTimeMismatch { .. })
        ));
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let mut trace = create_test_trace();
        trace.digests.pop();
        assert!(matches!(
            verify_trace(&trace),
            Err(VerifyError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_algorithm_mismatch_rejected() {
        let mut trace = create_test_trace();
        trace.digest_algo_id = "framedigest-v0".to_string();
        assert!(matches!(
            verify_trace(&trace),
            Err(VerifyError::AlgorithmMismatch { .. })
        ));
    }

    #[test]
    fn test_rejected_command_not_recorded() {
        let mut recorder = TraceRecorder::new(SessionConfig::default()).unwrap();
        recorder.record(Command::Seek(4000.0)).unwrap();

        let err = recorder.record(Command::SetLossRate(17)).unwrap_err();
        assert_eq!(
            err,
            TraceError::Rejected {
                index: 1,
                command: Command::SetLossRate(17),
                source: ConfigError::InvalidLossRate(17),
            }
        );
        assert!(matches!(
            recorder.record(Command::Advance(f64::NAN)),
            Err(TraceError::InvalidAdvance { index: 1, .. })
        ));

        let trace = recorder.finalize();
        assert_eq!(trace.commands, vec![Command::Seek(4000.0)]);
        assert!(verify_trace(&trace).is_ok());
    }

    #[test]
    fn test_invalid_recorder_config() {
        let config = SessionConfig {
            speed: f64::NAN,
            ..SessionConfig::default()
        };
        assert!(matches!(
            TraceRecorder::new(config),
            Err(TraceError::InvalidConfig(ConfigError::InvalidSpeed(_)))
        ));
    }

    #[test]
    fn test_advance_reports_digest_of_new_frame() {
        let mut recorder = TraceRecorder::new(SessionConfig::default()).unwrap();
        let idle = recorder.record(Command::Advance(500.0)).unwrap();
        recorder.record(Command::Start).unwrap();
        let moved = recorder.record(Command::Advance(500.0)).unwrap();
        assert_ne!(idle, moved);
        assert_eq!(recorder.session().current_time(), 250.0);
    }

    #[test]
    fn test_chain_fingerprint_order_sensitive() {
        assert_ne!(chain_fingerprint(&[1, 2]), chain_fingerprint(&[2, 1]));
        // SHA-256 of the empty input
        assert_eq!(
            chain_fingerprint(&[]),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}

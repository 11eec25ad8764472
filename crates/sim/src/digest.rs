//! Frame state digest.
//!
//! A 64-bit FNV-1a fingerprint over everything a frame exposes to the
//! rendering layer. Two frames with equal digests render identically; replay
//! verification compares digests instead of whole frames.

use crate::Frame;

/// Digest algorithm identifier, bumped whenever the hashed layout changes.
pub const FRAME_DIGEST_ALGO_ID: &str = "framedigest-v1-fnv1a64-le-f64canon-lenprefix";

const FNV1A_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV1A_PRIME: u64 = 0x100000001b3;

#[derive(Debug, Clone)]
struct Fnv1a64 {
    state: u64,
}

impl Fnv1a64 {
    fn new() -> Self {
        Self {
            state: FNV1A_OFFSET_BASIS,
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= u64::from(byte);
            self.state = self.state.wrapping_mul(FNV1A_PRIME);
        }
    }

    fn write_u8(&mut self, value: u8) {
        self.update(&[value]);
    }

    fn write_u32(&mut self, value: u32) {
        self.update(&value.to_le_bytes());
    }

    fn write_len(&mut self, len: usize) {
        self.update(&(len as u64).to_le_bytes());
    }

    fn write_f64(&mut self, value: f64) {
        self.update(&canonicalize_f64(value).to_le_bytes());
    }

    /// Length-prefixed so adjacent strings cannot alias.
    fn write_str(&mut self, value: &str) {
        self.write_len(value.len());
        self.update(value.as_bytes());
    }

    fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    fn finish(self) -> u64 {
        self.state
    }
}

/// `-0.0` hashes as `+0.0`; every NaN hashes as the quiet NaN.
fn canonicalize_f64(value: f64) -> u64 {
    const QUIET_NAN_BITS: u64 = 0x7ff8000000000000;

    if value.is_nan() {
        QUIET_NAN_BITS
    } else if value == 0.0 {
        0u64
    } else {
        value.to_bits()
    }
}

impl Frame {
    /// Compute the frame digest.
    ///
    /// Layout, in order: time; node count then (id, status) per node; packet
    /// count then (id, position, sequence number, flags) per packet; event
    /// count then (time, message) per event; explanation. Collections are
    /// hashed in frame order, which the projector keeps deterministic.
    pub fn digest(&self) -> u64 {
        let mut hasher = Fnv1a64::new();

        hasher.write_f64(self.time);

        hasher.write_len(self.nodes.len());
        for node in &self.nodes {
            hasher.write_str(node.id);
            hasher.write_u8(node.status.code());
        }

        hasher.write_len(self.packets.len());
        for packet in &self.packets {
            hasher.write_str(&packet.id);
            hasher.write_f64(packet.position[0]);
            hasher.write_f64(packet.position[1]);
            hasher.write_u32(packet.sequence_number);
            hasher.write_bool(packet.retransmission);
            hasher.write_bool(packet.encrypted);
        }

        hasher.write_len(self.events.len());
        for event in &self.events {
            hasher.write_f64(event.time);
            hasher.write_str(event.message);
        }

        hasher.write_str(self.explanation);

        hasher.finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Mode, NodeStatus, Params, SimTime};

    fn digest_at(params: &Params, time: SimTime) -> u64 {
        Frame::project(params, time).digest()
    }

    #[test]
    fn test_f64_canonicalization() {
        assert_eq!(canonicalize_f64(-0.0), canonicalize_f64(0.0));
        assert_eq!(canonicalize_f64(-0.0), 0u64);

        let other_nan = f64::from_bits(0x7ff0000000000001);
        assert_eq!(canonicalize_f64(f64::NAN), canonicalize_f64(other_nan));
        assert_eq!(canonicalize_f64(f64::NAN), 0x7ff8000000000000);

        assert_eq!(canonicalize_f64(2.5), 2.5f64.to_bits());
    }

    #[test]
    fn test_fnv1a_known_vector() {
        // FNV-1a 64 of "a"
        let mut hasher = Fnv1a64::new();
        hasher.update(b"a");
        assert_eq!(hasher.finish(), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn test_empty_input_is_offset_basis() {
        assert_eq!(Fnv1a64::new().finish(), FNV1A_OFFSET_BASIS);
    }

    #[test]
    fn test_digest_stable_for_same_time() {
        let params = Params::default();
        assert_eq!(digest_at(&params, 4321.0), digest_at(&params, 4321.0));
    }

    #[test]
    fn test_digest_changes_with_time_and_params() {
        let params = Params::default();
        let https = Params {
            mode: Mode::Https,
            ..params
        };
        assert_ne!(digest_at(&params, 4000.0), digest_at(&params, 4001.0));
        assert_ne!(digest_at(&params, 4000.0), digest_at(&https, 4000.0));
    }

    #[test]
    fn test_digest_sensitive_to_status() {
        let frame = Frame::project(&Params::default(), 500.0);
        let mut altered = frame.clone();
        altered.nodes[0].status = NodeStatus::Secure;
        assert_ne!(frame.digest(), altered.digest());
    }

    #[test]
    fn test_negative_zero_time_matches_reset() {
        let params = Params::default();
        let mut frame = Frame::reset(&params);
        let baseline = frame.digest();
        frame.time = -0.0;
        assert_eq!(frame.digest(), baseline);
    }
}

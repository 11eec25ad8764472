//! Packetflow Simulation Core
//!
//! This crate contains the deterministic state-derivation engine behind the
//! network transmission visualization. Given one simulated-time value and a
//! small set of parameters it derives which log events are visible, the status
//! of every node, the set of in-flight packets and the narrative explanation.
//!
//! # Architecture Constraints
//!
//! The Simulation Core MUST NOT:
//! - Perform I/O operations (file, network, etc.)
//! - Read wall-clock time
//! - Use randomness of any kind
//! - Carry state from one projection to the next
//!
//! Every derived view is recomputed from scratch for each time value. Clocks,
//! configuration ownership and scheduling live in `packetflow-session`.
//!
//! # Modules
//!
//! - [`topology`]: static node layout and connections
//! - [`scenario`]: per-scenario event, status, leg and explanation tables
//! - [`projector`]: time → frame derivation
//! - [`detail`]: per-node detail projection
//! - [`digest`]: frame state digest

#![deny(unsafe_code)]

pub mod detail;
pub mod digest;
pub mod projector;
pub mod scenario;
pub mod topology;

pub use detail::{NodeDetail, ReceivedFragment, RouteEntry, Stat, StatValue, node_detail};
pub use projector::{Frame, explanation, node_status, project_packets, visible_events};
pub use scenario::{Fragment, FragmentFate, Leg, Scenario, fragments};
pub use topology::Topology;

// ============================================================================
// Type Aliases
// ============================================================================

/// Simulated time in milliseconds.
///
/// This is the single authoritative scalar driving every derived view. It is
/// distinct from real elapsed wall-clock time.
pub type SimTime = f64;

/// Stable node identity. Topologies are static, so identities are `'static`.
pub type NodeId = &'static str;

// ============================================================================
// Scenario Constants (Normative)
// ============================================================================

/// Total scenario duration, identical for every mode.
pub const TOTAL_DURATION_MS: SimTime = 25_000.0;

/// Loss rates at or above this percentage drop the lossy fragments.
pub const LOSS_THRESHOLD_PERCENT: u8 = 10;

/// Default playback speed multiplier.
pub const DEFAULT_SPEED: f64 = 0.5;

/// Default packet-loss rate in percent.
pub const DEFAULT_LOSS_PERCENT: u8 = 10;

// ============================================================================
// Enumerations
// ============================================================================

/// Visual status of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    Idle,
    Active,
    Processing,
    Error,
    Secure,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Processing => "processing",
            Self::Error => "error",
            Self::Secure => "secure",
        }
    }

    /// Stable byte used by the frame digest.
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Active => 1,
            Self::Processing => 2,
            Self::Error => 3,
            Self::Secure => 4,
        }
    }
}

/// Node category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The user's machine, origin of every request.
    Endpoint,
    /// Destination web server.
    Server,
    /// DNS resolver.
    Resolver,
    /// Access provider relaying traffic onto the wider network.
    Relay,
    Router,
    Attacker,
}

/// Physical medium of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Medium {
    Wired,
    Wireless,
}

/// Transport protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Transport {
    #[default]
    Tcp,
    Udp,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

/// Simulation mode selected by the user.
///
/// DDoS is not a mode: it is a toggle layered over whichever mode is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Http,
    WebSocket,
    Https,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::WebSocket => "websocket",
            Self::Https => "https",
        }
    }
}

/// Direction tag for duplex traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Upstream,
    Downstream,
}

/// Severity of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Success,
    Error,
    Warning,
}

/// Classification used by the event exclusion filters.
///
/// Filters match on tags, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTag {
    /// The always-visible first event of a sequence.
    Ready,
    General,
    TcpHandshake,
    TcpRetransmit,
    PacketLoss,
    ReassembledInOrder,
    PartiallyReassembled,
}

// ============================================================================
// Packet Loss Rate
// ============================================================================

/// Packet-loss rate in percent: 0..=50 in steps of 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LossRate(u8);

impl LossRate {
    pub const ZERO: Self = Self(0);
    pub const MAX_PERCENT: u8 = 50;
    pub const STEP_PERCENT: u8 = 5;

    /// Returns `None` when `percent` is outside the documented domain.
    pub fn new(percent: u8) -> Option<Self> {
        (percent <= Self::MAX_PERCENT && percent % Self::STEP_PERCENT == 0).then_some(Self(percent))
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    /// Whether the loss policy is in effect for the lossy fragments.
    pub fn drops_fragments(self) -> bool {
        self.0 >= LOSS_THRESHOLD_PERCENT
    }
}

impl Default for LossRate {
    fn default() -> Self {
        Self(DEFAULT_LOSS_PERCENT)
    }
}

// ============================================================================
// Core Types
// ============================================================================

/// Projection inputs: everything besides time that a derivation depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Params {
    pub mode: Mode,
    /// Only meaningful in http mode; other modes always run over TCP.
    pub transport: Transport,
    pub loss_rate: LossRate,
    /// Playback speed multiplier; only feeds the synthetic node statistics.
    pub speed: f64,
    pub ddos_active: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            transport: Transport::default(),
            loss_rate: LossRate::default(),
            speed: DEFAULT_SPEED,
            ddos_active: false,
        }
    }
}

/// A network node as seen by the rendering layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub label: &'static str,
    pub kind: NodeKind,
    /// Layout position in percent of the canvas.
    pub position: [f64; 2],
    pub status: NodeStatus,
}

/// Unordered edge between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub source: NodeId,
    pub target: NodeId,
    pub medium: Medium,
}

impl Connection {
    /// Whether this edge joins `a` and `b`, in either order.
    pub fn joins(&self, a: NodeId, b: NodeId) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }
}

/// Data in flight at a given simulated time.
///
/// A packet exists only within `[created_at, created_at + travel time)` and is
/// rebuilt from scratch on every projection. `id` is stable across
/// projections so renderers can keep continuity.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub id: String,
    pub payload: &'static str,
    pub source: NodeId,
    pub target: NodeId,
    /// Interpolated current position.
    pub position: [f64; 2],
    pub target_position: [f64; 2],
    pub sequence_number: u32,
    pub transport: Transport,
    /// Simulated latency in milliseconds.
    pub latency: SimTime,
    pub retransmission: bool,
    pub encrypted: bool,
    pub direction: Option<Direction>,
    pub created_at: SimTime,
}

/// Immutable log event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub time: SimTime,
    pub severity: Severity,
    pub message: &'static str,
    pub node: Option<NodeId>,
    pub tag: EventTag,
}

impl Event {
    pub(crate) const fn at(
        time: SimTime,
        severity: Severity,
        message: &'static str,
        node: NodeId,
    ) -> Self {
        Self {
            time,
            severity,
            message,
            node: Some(node),
            tag: EventTag::General,
        }
    }

    pub(crate) const fn ready() -> Self {
        Self {
            time: 0.0,
            severity: Severity::Info,
            message: "Simulation ready. Press Start to begin.",
            node: None,
            tag: EventTag::Ready,
        }
    }

    pub(crate) const fn tagged(self, tag: EventTag) -> Self {
        Self { tag, ..self }
    }
}

// ============================================================================
// Tests
// ============================================================================

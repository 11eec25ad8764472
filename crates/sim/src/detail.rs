//! Per-node detail projection.
//!
//! Descriptions and synthetic statistics shown when a node is inspected. The
//! destination's reassembly view is built from [`fragments`], the same source
//! the packet legs use, so it always agrees with what was in flight.

use std::fmt;

use crate::scenario::{FragmentFate, fragments};
use crate::{NodeKind, Params, SimTime, Topology, Transport};

// ============================================================================
// Detail Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatValue {
    Count(u64),
    Text(String),
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// A named statistic, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub name: &'static str,
    pub value: StatValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    pub destination: &'static str,
    pub gateway: &'static str,
    pub interface: &'static str,
}

/// Reassembly state of one message fragment at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceivedFragment {
    pub sequence_number: u32,
    /// The fragment's character, or `?` when it is lost for good.
    pub data: &'static str,
    pub complete: bool,
    pub retransmitted: bool,
}

/// Detail view of one node at one simulated time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDetail {
    /// `None` when the node is not part of the active topology.
    pub kind: Option<NodeKind>,
    pub description: &'static str,
    pub stats: Vec<Stat>,
    pub routing_table: Vec<RouteEntry>,
    pub received: Vec<ReceivedFragment>,
}

impl NodeDetail {
    fn not_found() -> Self {
        Self::new(None, NOT_FOUND)
    }

    fn new(kind: Option<NodeKind>, description: &'static str) -> Self {
        Self {
            kind,
            description,
            stats: Vec::new(),
            routing_table: Vec::new(),
            received: Vec::new(),
        }
    }

    fn count(mut self, name: &'static str, value: u64) -> Self {
        self.stats.push(Stat {
            name,
            value: StatValue::Count(value),
        });
        self
    }

    fn text(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.stats.push(Stat {
            name,
            value: StatValue::Text(value.into()),
        });
        self
    }

    pub fn is_found(&self) -> bool {
        self.kind.is_some()
    }

    pub fn stat(&self, name: &str) -> Option<&StatValue> {
        self.stats.iter().find(|s| s.name == name).map(|s| &s.value)
    }

    /// Sequence numbers of fragments that will never arrive.
    pub fn missing_fragments(&self) -> Vec<u32> {
        self.received
            .iter()
            .filter(|f| f.data == LOST_MARKER)
            .map(|f| f.sequence_number)
            .collect()
    }

    /// The message as the destination can reconstruct it, `?` for holes.
    pub fn reconstructed_message(&self) -> String {
        self.received.iter().map(|f| f.data).collect()
    }
}

// ============================================================================
// Detail Content
// ============================================================================

const NOT_FOUND: &str = "Node not found";
const LOST_MARKER: &str = "?";

const ROUTING_TABLE: [RouteEntry; 4] = [
    RouteEntry {
        destination: "192.168.1.0/24",
        gateway: "Direct",
        interface: "eth0",
    },
    RouteEntry {
        destination: "10.0.0.0/8",
        gateway: "10.1.1.1",
        interface: "eth1",
    },
    RouteEntry {
        destination: "203.0.113.0/24",
        gateway: "10.2.2.2",
        interface: "eth1",
    },
    RouteEntry {
        destination: "0.0.0.0/0",
        gateway: "10.1.1.254",
        interface: "eth1",
    },
];

/// `floor(value)`, saturating at zero for times before the origin.
fn floor_count(value: f64) -> u64 {
    value.floor().max(0.0) as u64
}

fn millis(value: f64) -> String {
    format!("{}ms", floor_count(value))
}

/// Detail for node `id` at `time` under `params`.
///
/// Ids outside the active topology, including attackers while DDoS is off,
/// yield a not-found detail.
pub fn node_detail(params: &Params, id: &str, time: SimTime) -> NodeDetail {
    let topology = Topology::for_ddos(params.ddos_active);
    let Some(node) = topology.node(id) else {
        return NodeDetail::not_found();
    };
    let kind = Some(node.kind);
    let speed = params.speed;

    match node.kind {
        NodeKind::Endpoint => NodeDetail::new(
            kind,
            "Your computer is the origin of the data transmission. It fragments the message into packets and handles retransmission if needed.",
        )
        .text("IP Address", "192.168.1.10")
        .count("Packets Sent", floor_count(time / 500.0))
        .text("RTT (avg)", millis(800.0 / speed))
        .text("Protocol", params.transport.as_str().to_uppercase()),

        NodeKind::Resolver => NodeDetail::new(
            kind,
            "The DNS server resolves domain names to IP addresses. It translates human-readable names to machine-readable addresses.",
        )
        .count("Queries", floor_count(time / 2000.0))
        .count("Cache Hits", floor_count(time / 4000.0))
        .text("Response Time", millis(100.0 / speed)),

        NodeKind::Relay => NodeDetail::new(
            kind,
            "Your Internet Service Provider connects your home network to the broader internet infrastructure.",
        )
        .text("Bandwidth", "100 Mbps")
        .count("Packets Routed", floor_count(time / 300.0))
        .text("Latency", millis(50.0 / speed)),

        NodeKind::Router => {
            let loss = f64::from(params.loss_rate.percent()) / 100.0;
            let mut detail = NodeDetail::new(
                kind,
                "Routers direct packets across networks using routing tables to determine the best path.",
            )
            .count("Packets Routed", floor_count(time / 200.0))
            .count("Dropped Packets", floor_count(time / 2000.0 * loss))
            .count("Queue Length", floor_count((time % 1000.0) / 200.0));
            detail.routing_table = ROUTING_TABLE.to_vec();
            detail
        }

        NodeKind::Server => destination_detail(params, time),

        NodeKind::Attacker => NodeDetail::new(
            kind,
            "A malicious node sending excessive traffic to overwhelm the target server.",
        )
        .text("Attack Type", "SYN Flood")
        .count("Packets Sent", floor_count(time / 100.0))
        .text("Traffic Generated", format!("{} Mbps", floor_count(time / 10.0))),
    }
}

fn destination_detail(params: &Params, time: SimTime) -> NodeDetail {
    let received: Vec<ReceivedFragment> = fragments(params)
        .map(|fragment| ReceivedFragment {
            sequence_number: fragment.sequence_number,
            data: match fragment.fate {
                FragmentFate::Lost => LOST_MARKER,
                _ => fragment.payload,
            },
            complete: fragment.arrival().is_some_and(|arrival| time >= arrival),
            retransmitted: fragment.fate == FragmentFate::Retransmitted,
        })
        .collect();

    let packets_received = received.iter().filter(|f| f.complete).count() as u64;
    let complete_message =
        params.transport == Transport::Tcp || !params.loss_rate.drops_fragments();

    let mut detail = NodeDetail::new(
        Some(NodeKind::Server),
        "The destination server receives the packets and reassembles them into the original message.",
    )
    .text("IP Address", "203.0.113.42")
    .count("Packets Received", packets_received)
    .text("Complete Message", if complete_message { "Yes" } else { "No" });
    detail.received = received;
    detail
}

// ============================================================================
// Tests
// ============================================================================

//! Static network topology.
//!
//! Two variants exist: the base topology, and the base topology extended with
//! three attackers and their uplinks when the DDoS toggle is on. Nodes are
//! instantiated fresh from these tables on every reset.

use crate::{Connection, Medium, Node, NodeId, NodeKind, NodeStatus};

// ============================================================================
// Topology Tables
// ============================================================================

const fn node(id: NodeId, label: &'static str, kind: NodeKind, x: f64, y: f64) -> Node {
    Node {
        id,
        label,
        kind,
        position: [x, y],
        status: NodeStatus::Idle,
    }
}

const fn wired(source: NodeId, target: NodeId) -> Connection {
    Connection {
        source,
        target,
        medium: Medium::Wired,
    }
}

const BASE_NODES: [Node; 6] = [
    node("computer", "Your Computer", NodeKind::Endpoint, 10.0, 50.0),
    node("dns", "DNS Server", NodeKind::Resolver, 30.0, 20.0),
    node("isp", "ISP", NodeKind::Relay, 30.0, 50.0),
    node("router1", "Router 1", NodeKind::Router, 50.0, 40.0),
    node("router2", "Router 2", NodeKind::Router, 70.0, 60.0),
    node("server", "Web Server", NodeKind::Server, 90.0, 50.0),
];

const ATTACKER_NODES: [Node; 3] = [
    node("attacker1", "Attacker 1", NodeKind::Attacker, 15.0, 15.0),
    node("attacker2", "Attacker 2", NodeKind::Attacker, 15.0, 85.0),
    node("attacker3", "Attacker 3", NodeKind::Attacker, 40.0, 75.0),
];

const BASE_CONNECTIONS: [Connection; 5] = [
    wired("computer", "isp"),
    wired("isp", "dns"),
    wired("isp", "router1"),
    wired("router1", "router2"),
    wired("router2", "server"),
];

const ATTACKER_CONNECTIONS: [Connection; 3] = [
    wired("attacker1", "router1"),
    wired("attacker2", "router1"),
    wired("attacker3", "router2"),
];

// ============================================================================
// Topology
// ============================================================================

/// A concrete topology variant: node set plus connections.
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    nodes: Vec<Node>,
    connections: Vec<Connection>,
}

impl Topology {
    /// Base topology, every node idle.
    pub fn base() -> Self {
        Self {
            nodes: BASE_NODES.to_vec(),
            connections: BASE_CONNECTIONS.to_vec(),
        }
    }

    /// Base topology plus attackers. Attackers start (and stay) in error.
    pub fn with_attackers() -> Self {
        let mut topology = Self::base();
        topology
            .nodes
            .extend(ATTACKER_NODES.iter().map(|attacker| Node {
                status: NodeStatus::Error,
                ..attacker.clone()
            }));
        topology.connections.extend(ATTACKER_CONNECTIONS);
        topology
    }

    /// Select the variant for the DDoS toggle.
    pub fn for_ddos(ddos_active: bool) -> Self {
        if ddos_active {
            Self::with_attackers()
        } else {
            Self::base()
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    /// Look up a node that may legitimately be absent.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Position of a node the caller's scenario requires.
    ///
    /// # Panics
    /// If `id` is not part of this topology. Scenario tables and topology
    /// tables are both static, so a miss is a programming error.
    pub fn position(&self, id: NodeId) -> [f64; 2] {
        match self.node(id) {
            Some(node) => node.position,
            None => panic!("scenario references node `{id}` missing from topology"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

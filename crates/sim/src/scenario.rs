//! Scenario library.
//!
//! A scenario is the fixed tuple of event sequence, packet legs, status
//! windows and explanation table selected by mode and the DDoS toggle. Each
//! table is static lookup data; [`Scenario`] dispatches to the right one so the
//! projector never branches on mode itself.

use crate::{
    Direction, Event, EventTag, LossRate, Mode, NodeId, NodeStatus, Params, Severity, SimTime,
    Transport,
};

// ============================================================================
// Scenario Parameters (Normative)
// ============================================================================

/// Payload fragmented across the http data legs.
pub const MESSAGE: &str = "Hello World";

/// Start of the first http data fragment.
pub const FRAGMENT_START_MS: SimTime = 3000.0;

/// Spacing between consecutive fragment departures.
pub const FRAGMENT_INTERVAL_MS: SimTime = 500.0;

/// Travel time of one fragment from origin to destination.
pub const FRAGMENT_TRAVEL_MS: SimTime = 800.0;

/// Delay between a lost fragment's original departure and its retransmission.
pub const RETRANSMIT_DELAY_MS: SimTime = 1500.0;

/// Sequence numbers of the fragments subject to the loss policy.
pub const LOSSY_SEQUENCE_NUMBERS: [u32; 2] = [4, 8];

/// Staged route for data fragments, excluding origin and destination.
const FRAGMENT_ROUTE: &[NodeId] = &["isp", "router1", "router2"];

/// Attack packets fired per burst.
pub const ATTACK_PACKETS_PER_BURST: u32 = 5;

/// Spacing between packets within one burst.
pub const ATTACK_PACKET_INTERVAL_MS: SimTime = 300.0;

/// Period between bursts from the same attacker.
pub const ATTACK_BURST_PERIOD_MS: SimTime = 3000.0;

/// Travel time of an attack packet.
pub const ATTACK_TRAVEL_MS: SimTime = 1000.0;

/// Attack packets departing at or after this point are cut off at mitigation.
pub const ATTACK_CUTOFF_MS: SimTime = 9000.0;

/// Mitigation filtering begins; no attack packet is in flight from here on.
pub const MITIGATION_MS: SimTime = 10_000.0;

/// Attackers with the relay nearest to each.
const ATTACKERS: [(NodeId, &[NodeId]); 3] = [
    ("attacker1", &["router1"]),
    ("attacker2", &["router1"]),
    ("attacker3", &["router2"]),
];

// ============================================================================
// Event Sequences
// ============================================================================

use EventTag::{
    PacketLoss, PartiallyReassembled, ReassembledInOrder, TcpHandshake, TcpRetransmit,
};
use Severity::{Error, Info, Success, Warning};

static HTTP_EVENTS: [Event; 17] = [
    Event::ready(),
    Event::at(0.0, Info, "Starting DNS resolution for server.example.com", "computer"),
    Event::at(500.0, Info, "DNS query sent to resolver", "dns"),
    Event::at(1000.0, Success, "DNS resolved: server.example.com -> 203.0.113.42", "computer"),
    Event::at(1500.0, Info, "Initiating TCP handshake (SYN)", "computer").tagged(TcpHandshake),
    Event::at(1800.0, Info, "Server responds with SYN-ACK", "server").tagged(TcpHandshake),
    Event::at(2100.0, Info, "Client acknowledges with ACK", "computer").tagged(TcpHandshake),
    Event::at(2400.0, Success, "TCP connection established", "computer").tagged(TcpHandshake),
    Event::at(3000.0, Info, "Fragmenting message \"Hello World\" into 11 packets", "computer"),
    Event::at(4500.0, Error, "Packet #4 lost in transmission", "router1").tagged(PacketLoss),
    Event::at(6000.0, Info, "TCP detected packet loss, retransmitting packet #4", "computer")
        .tagged(TcpRetransmit),
    Event::at(6500.0, Error, "Packet #8 lost in transmission", "router2").tagged(PacketLoss),
    Event::at(8000.0, Info, "TCP detected packet loss, retransmitting packet #8", "computer")
        .tagged(TcpRetransmit),
    Event::at(9000.0, Info, "Server receiving packets", "server"),
    Event::at(10000.0, Success, "Message \"Hello World\" successfully reassembled in order", "server")
        .tagged(ReassembledInOrder),
    Event::at(10000.0, Warning, "Message partially reassembled due to packet loss (UDP)", "server")
        .tagged(PartiallyReassembled),
    Event::at(24900.0, Success, "Simulation complete", "computer"),
];

static WEBSOCKET_EVENTS: [Event; 21] = [
    Event::ready(),
    Event::at(0.0, Info, "Starting DNS resolution for ws.example.com", "computer"),
    Event::at(500.0, Info, "DNS query sent to resolver", "dns"),
    Event::at(1000.0, Success, "DNS resolved: ws.example.com -> 203.0.113.42", "computer"),
    Event::at(1500.0, Info, "Initiating TCP handshake (SYN)", "computer").tagged(TcpHandshake),
    Event::at(1800.0, Info, "Server responds with SYN-ACK", "server").tagged(TcpHandshake),
    Event::at(2100.0, Info, "Client acknowledges with ACK", "computer").tagged(TcpHandshake),
    Event::at(2400.0, Success, "TCP connection established", "computer").tagged(TcpHandshake),
    Event::at(2600.0, Info, "Sending WebSocket upgrade request", "computer"),
    Event::at(3000.0, Success, "WebSocket connection established", "server"),
    Event::at(3500.0, Info, "Client sending message to server", "computer"),
    Event::at(4500.0, Info, "Server receiving client message", "server"),
    Event::at(5000.0, Info, "Server sending message to client", "server"),
    Event::at(6000.0, Info, "Client receiving server message", "computer"),
    Event::at(7000.0, Info, "Full-duplex communication in progress", "computer"),
    Event::at(8000.0, Info, "Server pushing updates without client request", "server"),
    Event::at(9000.0, Info, "Client receiving pushed updates", "computer"),
    Event::at(10000.0, Info, "Client sending message to server", "computer"),
    Event::at(11000.0, Info, "Server receiving client message", "server"),
    Event::at(12000.0, Info, "WebSocket connection maintained", "computer"),
    Event::at(24900.0, Success, "Simulation complete", "computer"),
];

static HTTPS_EVENTS: [Event; 22] = [
    Event::ready(),
    Event::at(0.0, Info, "Starting DNS resolution for secure.example.com", "computer"),
    Event::at(500.0, Info, "DNS query sent to resolver", "dns"),
    Event::at(1000.0, Success, "DNS resolved: secure.example.com -> 203.0.113.42", "computer"),
    Event::at(1500.0, Info, "Initiating TCP handshake (SYN)", "computer").tagged(TcpHandshake),
    Event::at(1800.0, Info, "Server responds with SYN-ACK", "server").tagged(TcpHandshake),
    Event::at(2100.0, Info, "Client acknowledges with ACK", "computer").tagged(TcpHandshake),
    Event::at(2400.0, Success, "TCP connection established", "computer").tagged(TcpHandshake),
    Event::at(2600.0, Info, "Initiating TLS handshake", "computer"),
    Event::at(3000.0, Info, "Client Hello with supported cipher suites", "computer"),
    Event::at(3500.0, Info, "Server Hello with selected cipher suite", "server"),
    Event::at(4000.0, Info, "Server sends certificate", "server"),
    Event::at(4500.0, Info, "Client verifies certificate", "computer"),
    Event::at(5000.0, Info, "Client sends key exchange", "computer"),
    Event::at(5500.0, Info, "Server and client generate session keys", "server"),
    Event::at(6000.0, Success, "Secure TLS connection established", "computer"),
    Event::at(6500.0, Info, "Sending encrypted HTTP request", "computer"),
    Event::at(7500.0, Info, "Server decrypts and processes request", "server"),
    Event::at(8500.0, Info, "Server sends encrypted response", "server"),
    Event::at(9500.0, Info, "Client decrypts response", "computer"),
    Event::at(10000.0, Success, "Secure data exchange complete", "computer"),
    Event::at(24900.0, Success, "Simulation complete", "computer"),
];

static DDOS_EVENTS: [Event; 23] = [
    Event::ready(),
    Event::at(0.0, Warning, "Multiple attackers detected on the network", "router1"),
    Event::at(500.0, Error, "High volume of traffic from Attacker 1", "attacker1"),
    Event::at(1000.0, Error, "High volume of traffic from Attacker 2", "attacker2"),
    Event::at(1500.0, Error, "High volume of traffic from Attacker 3", "attacker3"),
    Event::at(2000.0, Warning, "Router 1 experiencing high load", "router1"),
    Event::at(2500.0, Warning, "Router 2 experiencing high load", "router2"),
    Event::at(3000.0, Error, "Server receiving excessive connection requests", "server"),
    Event::at(3500.0, Warning, "Legitimate user connection delayed", "computer"),
    Event::at(4000.0, Error, "Server resources at 70% capacity", "server"),
    Event::at(5000.0, Error, "Server resources at 85% capacity", "server"),
    Event::at(6000.0, Error, "Server resources at 95% capacity", "server"),
    Event::at(7000.0, Error, "Server unresponsive to new connections", "server"),
    Event::at(8000.0, Warning, "Legitimate user request timed out", "computer"),
    Event::at(9000.0, Info, "DDoS mitigation system activated", "router2"),
    Event::at(10000.0, Info, "Filtering suspicious traffic", "router1"),
    Event::at(11000.0, Info, "Blocking traffic from Attacker 1", "router1"),
    Event::at(12000.0, Info, "Blocking traffic from Attacker 2", "router1"),
    Event::at(13000.0, Info, "Blocking traffic from Attacker 3", "router2"),
    Event::at(14000.0, Info, "Server resources recovering", "server"),
    Event::at(15000.0, Success, "Legitimate connection established", "computer"),
    Event::at(16000.0, Success, "Normal service resumed", "server"),
    Event::at(24900.0, Success, "Simulation complete", "computer"),
];

// ============================================================================
// Status Windows
// ============================================================================

/// Assigns `status` to `nodes` over `[from, until)`, or over `(from, until]`
/// for a window opened with [`StatusWindow::after`].
///
/// Windows are scanned in order and the first match wins; a node matched by no
/// window is idle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StatusWindow {
    pub from: SimTime,
    pub until: SimTime,
    pub nodes: &'static [NodeId],
    pub status: NodeStatus,
    /// Restricts the window to one transport.
    pub transport: Option<Transport>,
    /// Excludes `from` and includes `until`.
    pub open_start: bool,
}

impl StatusWindow {
    const fn new(from: SimTime, until: SimTime, nodes: &'static [NodeId], status: NodeStatus) -> Self {
        Self {
            from,
            until,
            nodes,
            status,
            transport: None,
            open_start: false,
        }
    }

    /// Window over `(from, until]`.
    const fn after(from: SimTime, until: SimTime, nodes: &'static [NodeId], status: NodeStatus) -> Self {
        Self {
            open_start: true,
            ..Self::new(from, until, nodes, status)
        }
    }

    const fn tcp_only(self) -> Self {
        Self {
            transport: Some(Transport::Tcp),
            ..self
        }
    }

    pub fn matches(&self, id: &str, time: SimTime, transport: Transport) -> bool {
        let inside = if self.open_start {
            time > self.from && time <= self.until
        } else {
            time >= self.from && time < self.until
        };
        inside
            && self.nodes.iter().any(|n| *n == id)
            && self.transport.is_none_or(|t| t == transport)
    }
}

const FOREVER: SimTime = SimTime::INFINITY;
const DNS_LOOKUP: &[NodeId] = &["computer", "dns"];
const ENDPOINTS: &[NodeId] = &["computer", "server"];
const TRANSIT: &[NodeId] = &["isp", "router1", "router2"];
const DATA_PATH: &[NodeId] = &["computer", "isp", "router1", "router2", "server"];
const ROUTERS: &[NodeId] = &["router1", "router2"];
const ATTACKER_IDS: &[NodeId] = &["attacker1", "attacker2", "attacker3"];

use NodeStatus::{Active, Processing, Secure};

static HTTP_STATUS: [StatusWindow; 4] = [
    StatusWindow::new(0.0, 1000.0, DNS_LOOKUP, Processing),
    StatusWindow::new(1000.0, 2500.0, ENDPOINTS, Processing).tcp_only(),
    StatusWindow::new(3000.0, 8000.0, DATA_PATH, Active),
    StatusWindow::new(8000.0, FOREVER, &["server"], Processing),
];

static WEBSOCKET_STATUS: [StatusWindow; 4] = [
    StatusWindow::new(0.0, 1000.0, DNS_LOOKUP, Processing),
    // TCP handshake, then the upgrade request
    StatusWindow::new(1000.0, 3000.0, ENDPOINTS, Processing),
    StatusWindow::new(3000.0, FOREVER, ENDPOINTS, Active),
    StatusWindow::new(3000.0, FOREVER, TRANSIT, Active),
];

static HTTPS_STATUS: [StatusWindow; 4] = [
    StatusWindow::new(0.0, 1000.0, DNS_LOOKUP, Processing),
    // TCP handshake, then the TLS handshake
    StatusWindow::new(1000.0, 6000.0, ENDPOINTS, Processing),
    StatusWindow::new(6000.0, FOREVER, ENDPOINTS, Secure),
    StatusWindow::new(6000.0, FOREVER, TRANSIT, Active),
];

// Each phase takes hold strictly after its start time
static DDOS_STATUS: [StatusWindow; 6] = [
    StatusWindow::new(0.0, FOREVER, ATTACKER_IDS, NodeStatus::Error),
    StatusWindow::after(3000.0, 14000.0, &["server"], NodeStatus::Error),
    StatusWindow::after(14000.0, FOREVER, &["server"], Active),
    StatusWindow::after(2000.0, MITIGATION_MS, ROUTERS, Processing),
    StatusWindow::after(MITIGATION_MS, FOREVER, ROUTERS, Active),
    StatusWindow::after(15000.0, FOREVER, &["computer"], Active),
];

// ============================================================================
// Explanation Tables
// ============================================================================

/// `(threshold, text)` pairs in ascending threshold order.
pub type ExplanationTable = [(SimTime, &'static str)];

const DNS_QUERY_STEP: &str =
    "Step 1: Your computer is sending a DNS query to resolve the domain name to an IP address.";
const DNS_RESPONSE_STEP: &str =
    "Step 2: DNS server has responded with the IP address of the destination server.";
const FRAGMENT_STEP: &str =
    "Step 4: Your message 'Hello World' is being fragmented into individual packets for transmission.";
const TRAVEL_STEP: &str = "Step 5: Packets are traveling through the network. Notice how they follow different routes and may experience delays or loss.";
const REASSEMBLY_STEP: &str =
    "Step 7: The server is reassembling the packets to reconstruct the original message.";
const COMPLETE_STEP: &str =
    "Step 8: Transmission complete! The message has been successfully delivered.";

static HTTP_TCP_EXPLANATIONS: [(SimTime, &str); 8] = [
    (0.0, DNS_QUERY_STEP),
    (1000.0, DNS_RESPONSE_STEP),
    (
        2000.0,
        "Step 3: Establishing a TCP connection through a three-way handshake (SYN, SYN-ACK, ACK).",
    ),
    (3000.0, FRAGMENT_STEP),
    (4000.0, TRAVEL_STEP),
    (
        8000.0,
        "Step 6: TCP ensures reliable delivery by retransmitting any lost packets.",
    ),
    (10000.0, REASSEMBLY_STEP),
    (12000.0, COMPLETE_STEP),
];

static HTTP_UDP_EXPLANATIONS: [(SimTime, &str); 7] = [
    (0.0, DNS_QUERY_STEP),
    (1000.0, DNS_RESPONSE_STEP),
    (2000.0, FRAGMENT_STEP),
    (4000.0, TRAVEL_STEP),
    (
        8000.0,
        "Step 6: With UDP, lost packets are not retransmitted, resulting in incomplete data.",
    ),
    (10000.0, REASSEMBLY_STEP),
    (12000.0, COMPLETE_STEP),
];

static WEBSOCKET_EXPLANATIONS: [(SimTime, &str); 5] = [
    (
        0.0,
        "Step 1: Establishing a standard TCP connection before upgrading to WebSocket.",
    ),
    (
        2500.0,
        "Step 2: Client sends an upgrade request to switch from HTTP to WebSocket protocol.",
    ),
    (
        3500.0,
        "Step 3: WebSocket connection established, enabling full-duplex communication.",
    ),
    (
        7000.0,
        "Step 4: Server can push data to the client without waiting for requests.",
    ),
    (
        10000.0,
        "Step 5: The persistent connection remains open for continuous bidirectional communication.",
    ),
];

static HTTPS_EXPLANATIONS: [(SimTime, &str); 5] = [
    (
        0.0,
        "Step 1: Establishing a standard TCP connection before starting TLS handshake.",
    ),
    (
        2500.0,
        "Step 2: Client and server negotiate encryption parameters and exchange certificates.",
    ),
    (
        4500.0,
        "Step 3: Both parties generate and exchange keys to establish a secure encrypted channel.",
    ),
    (
        6500.0,
        "Step 4: Data is encrypted before transmission and decrypted upon receipt.",
    ),
    (
        9000.0,
        "Step 5: The secure connection protects data from eavesdropping and tampering.",
    ),
];

static DDOS_EXPLANATIONS: [(SimTime, &str); 5] = [
    (
        0.0,
        "Multiple attackers are sending a high volume of traffic to overwhelm the server.",
    ),
    (
        2000.0,
        "The routers are becoming congested with malicious traffic, slowing down legitimate requests.",
    ),
    (
        5000.0,
        "The server is running out of resources to handle the flood of requests, becoming unresponsive.",
    ),
    (
        8000.0,
        "DDoS mitigation systems are identifying and blocking suspicious traffic patterns.",
    ),
    (
        12000.0,
        "The attack has been mitigated, and normal service is being restored.",
    ),
];

// ============================================================================
// Packet Legs
// ============================================================================

/// One scheduled packet trip.
///
/// The packet is in flight over `[start, start + duration)`, shortened to
/// `cutoff` when one is set. Intermediate hops in `via` split the trip into
/// equal-progress segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    pub id: String,
    pub payload: &'static str,
    pub source: NodeId,
    pub target: NodeId,
    pub via: &'static [NodeId],
    pub start: SimTime,
    pub duration: SimTime,
    pub latency: SimTime,
    pub sequence_number: u32,
    pub transport: Transport,
    pub retransmission: bool,
    pub encrypted: bool,
    pub direction: Option<Direction>,
    pub cutoff: Option<SimTime>,
}

impl Leg {
    /// A direct leg whose latency equals its travel time.
    pub fn direct(
        id: impl Into<String>,
        payload: &'static str,
        source: NodeId,
        target: NodeId,
        start: SimTime,
        duration: SimTime,
        transport: Transport,
    ) -> Self {
        Self {
            id: id.into(),
            payload,
            source,
            target,
            via: &[],
            start,
            duration,
            latency: duration,
            sequence_number: 0,
            transport,
            retransmission: false,
            encrypted: false,
            direction: None,
            cutoff: None,
        }
    }

    fn via(mut self, hops: &'static [NodeId]) -> Self {
        self.via = hops;
        self
    }

    fn latency(mut self, latency: SimTime) -> Self {
        self.latency = latency;
        self
    }

    fn sequence(mut self, sequence_number: u32) -> Self {
        self.sequence_number = sequence_number;
        self
    }

    fn encrypted_if(mut self, encrypted: bool) -> Self {
        self.encrypted = encrypted;
        self
    }

    fn heading(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    fn cut_off_at(mut self, cutoff: SimTime) -> Self {
        self.cutoff = Some(cutoff);
        self
    }

    /// End of the in-flight window (exclusive).
    pub fn window_end(&self) -> SimTime {
        let end = self.start + self.duration;
        self.cutoff.map_or(end, |cutoff| end.min(cutoff))
    }

    pub fn in_flight(&self, time: SimTime) -> bool {
        time >= self.start && time < self.window_end()
    }

    /// Fraction of the trip covered at `time`, clamped to `[0, 1]`.
    pub fn progress(&self, time: SimTime) -> f64 {
        ((time - self.start) / self.duration).clamp(0.0, 1.0)
    }
}

// ============================================================================
// Fragments and the Loss Policy
// ============================================================================

/// What the loss policy does to one fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentFate {
    Delivered,
    /// Lost on its first trip, resent by TCP.
    Retransmitted,
    /// Lost for good (UDP).
    Lost,
}

/// One character of [`MESSAGE`] and its fate under the current parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub index: usize,
    pub sequence_number: u32,
    pub payload: &'static str,
    /// Departure of the original transmission.
    pub start: SimTime,
    pub fate: FragmentFate,
}

impl Fragment {
    /// Departure of the transmission that actually delivers the fragment.
    pub fn delivering_start(&self) -> Option<SimTime> {
        match self.fate {
            FragmentFate::Delivered => Some(self.start),
            FragmentFate::Retransmitted => Some(self.start + RETRANSMIT_DELAY_MS),
            FragmentFate::Lost => None,
        }
    }

    /// Time the fragment reaches the destination, if it ever does.
    pub fn arrival(&self) -> Option<SimTime> {
        self.delivering_start().map(|start| start + FRAGMENT_TRAVEL_MS)
    }
}

/// Every fragment of [`MESSAGE`] with the loss policy applied.
///
/// This is the single source of truth for loss: packet legs and the
/// destination's reassembly view are both built from it.
pub fn fragments(params: &Params) -> impl Iterator<Item = Fragment> + '_ {
    (0..MESSAGE.len()).map(move |index| {
        let sequence_number = index as u32 + 1;
        let dropped = params.loss_rate.drops_fragments()
            && LOSSY_SEQUENCE_NUMBERS.contains(&sequence_number);
        let fate = match (dropped, params.transport) {
            (false, _) => FragmentFate::Delivered,
            (true, Transport::Tcp) => FragmentFate::Retransmitted,
            (true, Transport::Udp) => FragmentFate::Lost,
        };
        Fragment {
            index,
            sequence_number,
            payload: &MESSAGE[index..=index],
            start: FRAGMENT_START_MS + FRAGMENT_INTERVAL_MS * index as f64,
            fate,
        }
    })
}

fn dns_legs(legs: &mut Vec<Leg>) {
    legs.push(
        Leg::direct("dns-query", "DNS Query", "computer", "dns", 0.0, 1000.0, Transport::Udp)
            .latency(500.0),
    );
    legs.push(
        Leg::direct("dns-response", "DNS Response", "dns", "computer", 500.0, 1000.0, Transport::Udp)
            .latency(500.0),
    );
}

fn handshake_legs(legs: &mut Vec<Leg>) {
    const STEPS: [(&str, &str, NodeId, NodeId, SimTime); 3] = [
        ("tcp-syn", "SYN", "computer", "server", 1500.0),
        ("tcp-syn-ack", "SYN-ACK", "server", "computer", 1800.0),
        ("tcp-ack", "ACK", "computer", "server", 2100.0),
    ];
    for (id, payload, from, to, start) in STEPS {
        legs.push(Leg::direct(id, payload, from, to, start, 300.0, Transport::Tcp));
    }
}

fn fragment_legs(legs: &mut Vec<Leg>, params: &Params) {
    for fragment in fragments(params) {
        let Some(start) = fragment.delivering_start() else {
            continue;
        };
        let retransmission = fragment.fate == FragmentFate::Retransmitted;
        let id = if retransmission {
            format!("data-{}-retry", fragment.index)
        } else {
            format!("data-{}", fragment.index)
        };
        let mut leg = Leg::direct(
            id,
            fragment.payload,
            "computer",
            "server",
            start,
            FRAGMENT_TRAVEL_MS,
            params.transport,
        )
        .via(FRAGMENT_ROUTE)
        .sequence(fragment.sequence_number);
        leg.retransmission = retransmission;
        legs.push(leg);
    }
}

fn websocket_legs(legs: &mut Vec<Leg>) {
    legs.push(Leg::direct(
        "ws-upgrade",
        "Upgrade: websocket",
        "computer",
        "server",
        2600.0,
        400.0,
        Transport::Tcp,
    ));

    let message = |id: String, payload, from, to, start, direction| {
        Leg::direct(id, payload, from, to, start, 1000.0, Transport::Tcp).heading(direction)
    };

    for start in [3500.0, 10000.0] {
        legs.push(message(
            format!("ws-client-msg-{start}"),
            "Client Message",
            "computer",
            "server",
            start,
            Direction::Upstream,
        ));
    }
    for start in [5000.0, 8000.0] {
        legs.push(message(
            format!("ws-server-msg-{start}"),
            "Server Message",
            "server",
            "computer",
            start,
            Direction::Downstream,
        ));
    }

    // Both directions at once
    legs.push(message(
        "ws-duplex-client".to_string(),
        "Client Duplex",
        "computer",
        "server",
        7000.0,
        Direction::Upstream,
    ));
    legs.push(message(
        "ws-duplex-server".to_string(),
        "Server Duplex",
        "server",
        "computer",
        7000.0,
        Direction::Downstream,
    ));
}

fn tls_legs(legs: &mut Vec<Leg>) {
    const STEPS: [(&str, &str, NodeId, NodeId, SimTime); 5] = [
        ("client-hello", "Client Hello", "computer", "server", 3000.0),
        ("server-hello", "Server Hello", "server", "computer", 3500.0),
        ("certificate", "Certificate", "server", "computer", 4000.0),
        ("key-exchange", "Key Exchange", "computer", "server", 5000.0),
        ("finished", "Finished", "server", "computer", 5500.0),
    ];
    for (id, payload, from, to, start) in STEPS {
        let in_clear = id == "client-hello" || id == "server-hello";
        legs.push(
            Leg::direct(format!("tls-{id}"), payload, from, to, start, 500.0, Transport::Tcp)
                .encrypted_if(!in_clear),
        );
    }

    legs.push(
        Leg::direct(
            "https-request",
            "Encrypted Request",
            "computer",
            "server",
            6500.0,
            1000.0,
            Transport::Tcp,
        )
        .encrypted_if(true),
    );
    legs.push(
        Leg::direct(
            "https-response",
            "Encrypted Response",
            "server",
            "computer",
            8500.0,
            1000.0,
            Transport::Tcp,
        )
        .encrypted_if(true),
    );
}

fn attack_legs(legs: &mut Vec<Leg>) {
    for (n, (attacker, via)) in ATTACKERS.into_iter().enumerate() {
        let first_burst = 500.0 + 500.0 * (n + 1) as f64;

        let mut burst = 0u32;
        let mut burst_start = first_burst;
        while burst_start < MITIGATION_MS {
            for packet in 0..ATTACK_PACKETS_PER_BURST {
                let start = burst_start + ATTACK_PACKET_INTERVAL_MS * f64::from(packet);
                if start >= MITIGATION_MS {
                    break;
                }
                let mut leg = Leg::direct(
                    format!("attack-{}-{burst}-{packet}", n + 1),
                    "ATTACK",
                    attacker,
                    "server",
                    start,
                    ATTACK_TRAVEL_MS,
                    Transport::Tcp,
                )
                .via(via)
                .sequence(packet);
                if start >= ATTACK_CUTOFF_MS {
                    leg = leg.cut_off_at(MITIGATION_MS);
                }
                legs.push(leg);
            }
            burst += 1;
            burst_start += ATTACK_BURST_PERIOD_MS;
        }
    }

    legs.push(Leg::direct(
        "legitimate-request",
        "GET /",
        "computer",
        "server",
        15000.0,
        1000.0,
        Transport::Tcp,
    ));
}

// ============================================================================
// Scenario Dispatch
// ============================================================================

/// The active scenario: one variant per mode, plus DDoS which replaces
/// whichever mode is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    Http,
    WebSocket,
    Https,
    Ddos,
}

impl Scenario {
    pub fn select(mode: Mode, ddos_active: bool) -> Self {
        if ddos_active {
            return Self::Ddos;
        }
        match mode {
            Mode::Http => Self::Http,
            Mode::WebSocket => Self::WebSocket,
            Mode::Https => Self::Https,
        }
    }

    pub fn for_params(params: &Params) -> Self {
        Self::select(params.mode, params.ddos_active)
    }

    /// Full event sequence, ordered by time. The first entry is the ready event.
    pub fn events(self) -> &'static [Event] {
        match self {
            Self::Http => &HTTP_EVENTS,
            Self::WebSocket => &WEBSOCKET_EVENTS,
            Self::Https => &HTTPS_EVENTS,
            Self::Ddos => &DDOS_EVENTS,
        }
    }

    pub fn ready_event(self) -> &'static Event {
        &self.events()[0]
    }

    /// Whether an exclusion filter hides `event` under `params`.
    ///
    /// Only the http scenario filters; DDoS bypasses the http filters even
    /// when http is the selected mode.
    pub fn excludes(self, event: &Event, params: &Params) -> bool {
        if self != Self::Http {
            return false;
        }
        let udp = params.transport == Transport::Udp;
        let lossless = params.loss_rate == LossRate::ZERO;
        match event.tag {
            EventTag::TcpHandshake => udp,
            EventTag::TcpRetransmit => udp || lossless,
            EventTag::PacketLoss => lossless,
            EventTag::ReassembledInOrder => udp,
            EventTag::PartiallyReassembled => !udp,
            EventTag::Ready | EventTag::General => false,
        }
    }

    pub(crate) fn status_windows(self) -> &'static [StatusWindow] {
        match self {
            Self::Http => &HTTP_STATUS,
            Self::WebSocket => &WEBSOCKET_STATUS,
            Self::Https => &HTTPS_STATUS,
            Self::Ddos => &DDOS_STATUS,
        }
    }

    pub fn explanations(self, transport: Transport) -> &'static ExplanationTable {
        match (self, transport) {
            (Self::Http, Transport::Tcp) => &HTTP_TCP_EXPLANATIONS,
            (Self::Http, Transport::Udp) => &HTTP_UDP_EXPLANATIONS,
            (Self::WebSocket, _) => &WEBSOCKET_EXPLANATIONS,
            (Self::Https, _) => &HTTPS_EXPLANATIONS,
            (Self::Ddos, _) => &DDOS_EXPLANATIONS,
        }
    }

    /// Every leg the scenario schedules under `params`, in emission order.
    ///
    /// Legs hidden by the loss policy are not scheduled at all; their
    /// retransmissions, if any, are.
    pub fn legs(self, params: &Params) -> Vec<Leg> {
        let mut legs = Vec::new();
        match self {
            Self::Http => {
                dns_legs(&mut legs);
                if params.transport == Transport::Tcp {
                    handshake_legs(&mut legs);
                }
                fragment_legs(&mut legs, params);
            }
            Self::WebSocket => {
                dns_legs(&mut legs);
                handshake_legs(&mut legs);
                websocket_legs(&mut legs);
            }
            Self::Https => {
                dns_legs(&mut legs);
                handshake_legs(&mut legs);
                tls_legs(&mut legs);
            }
            Self::Ddos => attack_legs(&mut legs),
        }
        legs
    }
}

// ============================================================================
// Tests
// ============================================================================

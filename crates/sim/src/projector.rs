//! State projector: simulated time → derived views.
//!
//! Every function here is pure. Given identical `(params, time)` inputs they
//! return identical output regardless of what was projected before, which is
//! what makes arbitrary seeking safe.

use crate::scenario::{Leg, Scenario};
use crate::{Event, Node, NodeStatus, Packet, Params, SimTime, Topology};

// ============================================================================
// Frame
// ============================================================================

/// Everything the rendering layer reads for one simulated-time value.
///
/// All four derived views inside one frame come from the same `time`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub time: SimTime,
    pub nodes: Vec<Node>,
    pub packets: Vec<Packet>,
    pub events: Vec<Event>,
    /// Empty until the first projection after a reset.
    pub explanation: &'static str,
}

impl Frame {
    /// The frame a session shows right after a reset: fresh topology, nothing
    /// in flight, only the ready event, no explanation.
    pub fn reset(params: &Params) -> Self {
        let scenario = Scenario::for_params(params);
        Self {
            time: 0.0,
            nodes: Topology::for_ddos(params.ddos_active).into_nodes(),
            packets: Vec::new(),
            events: vec![*scenario.ready_event()],
            explanation: "",
        }
    }

    /// Project the full frame at `time`.
    pub fn project(params: &Params, time: SimTime) -> Self {
        let scenario = Scenario::for_params(params);
        let topology = Topology::for_ddos(params.ddos_active);

        let packets = project_packets(scenario, params, &topology, time);
        let nodes = topology
            .into_nodes()
            .into_iter()
            .map(|node| Node {
                status: node_status(scenario, params, node.id, time),
                ..node
            })
            .collect();

        Self {
            time,
            nodes,
            packets,
            events: visible_events(scenario, params, time),
            explanation: explanation(scenario, params, time),
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn status_of(&self, id: &str) -> Option<NodeStatus> {
        self.node(id).map(|n| n.status)
    }

    pub fn packet(&self, id: &str) -> Option<&Packet> {
        self.packets.iter().find(|p| p.id == id)
    }

    /// Whether an event with exactly this message is visible.
    pub fn has_event(&self, message: &str) -> bool {
        self.events.iter().any(|e| e.message == message)
    }
}

// ============================================================================
// Event Visibility
// ============================================================================

/// Events visible at `time`: the ready event, then every later event whose
/// time has passed and which no exclusion filter hides, in sequence order.
pub fn visible_events(scenario: Scenario, params: &Params, time: SimTime) -> Vec<Event> {
    let events = scenario.events();

    std::iter::once(events[0])
        .chain(
            events[1..]
                .iter()
                .filter(|event| event.time <= time && !scenario.excludes(event, params))
                .copied(),
        )
        .collect()
}

// ============================================================================
// Node Status
// ============================================================================

/// Status of node `id` at `time`. First matching window wins; idle otherwise.
pub fn node_status(scenario: Scenario, params: &Params, id: &str, time: SimTime) -> NodeStatus {
    scenario
        .status_windows()
        .iter()
        .find(|window| window.matches(id, time, params.transport))
        .map_or(NodeStatus::Idle, |window| window.status)
}

// ============================================================================
// Narrative Explanation
// ============================================================================

/// Text of the greatest threshold not exceeding `time`.
pub fn explanation(scenario: Scenario, params: &Params, time: SimTime) -> &'static str {
    let table = scenario.explanations(params.transport);
    table
        .iter()
        .rev()
        .find(|(threshold, _)| *threshold <= time)
        .unwrap_or(&table[0])
        .1
}

// ============================================================================
// Packet Set
// ============================================================================

/// Every packet in flight at `time`, rebuilt from the scenario's legs.
///
/// # Panics
/// If a leg references a node absent from `topology`.
pub fn project_packets(
    scenario: Scenario,
    params: &Params,
    topology: &Topology,
    time: SimTime,
) -> Vec<Packet> {
    scenario
        .legs(params)
        .into_iter()
        .filter(|leg| leg.in_flight(time))
        .map(|leg| place(leg, topology, time))
        .collect()
}

fn place(leg: Leg, topology: &Topology, time: SimTime) -> Packet {
    let waypoints: Vec<[f64; 2]> = std::iter::once(leg.source)
        .chain(leg.via.iter().copied())
        .chain(std::iter::once(leg.target))
        .map(|id| topology.position(id))
        .collect();

    let target_position = waypoints[waypoints.len() - 1];
    let position = position_along(&waypoints, leg.progress(time));

    Packet {
        id: leg.id,
        payload: leg.payload,
        source: leg.source,
        target: leg.target,
        position,
        target_position,
        sequence_number: leg.sequence_number,
        transport: leg.transport,
        latency: leg.latency,
        retransmission: leg.retransmission,
        encrypted: leg.encrypted,
        direction: leg.direction,
        created_at: leg.start,
    }
}

/// Position at `progress` along a polyline split into equal-progress segments.
fn position_along(waypoints: &[[f64; 2]], progress: f64) -> [f64; 2] {
    debug_assert!(waypoints.len() >= 2, "a route needs two endpoints");

    let segments = waypoints.len() - 1;
    let scaled = progress * segments as f64;
    let index = (scaled.floor() as usize).min(segments - 1);
    let local = scaled - index as f64;

    let [x0, y0] = waypoints[index];
    let [x1, y1] = waypoints[index + 1];
    [x0 + (x1 - x0) * local, y0 + (y1 - y0) * local]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LossRate, Mode, NodeKind, Transport};

    fn http(transport: Transport, loss: u8) -> Params {
        Params {
            transport,
            loss_rate: LossRate::new(loss).unwrap(),
            ..Params::default()
        }
    }

    fn ddos() -> Params {
        Params {
            ddos_active: true,
            ..Params::default()
        }
    }

    fn mode(mode: Mode) -> Params {
        Params {
            mode,
            ..Params::default()
        }
    }

    // ========================================================================
    // Reference scenario
    // ========================================================================

    /// http / tcp / 10% loss, seek to 9500.
    #[test]
    fn test_http_tcp_reference_frame() {
        let frame = Frame::project(&http(Transport::Tcp, 10), 9500.0);

        assert!(frame.has_event("TCP connection established"));
        assert!(frame.has_event("TCP detected packet loss, retransmitting packet #8"));
        assert!(!frame.has_event("Message partially reassembled due to packet loss (UDP)"));
        // Not yet reached
        assert!(!frame.has_event("Simulation complete"));

        assert_eq!(frame.status_of("server"), Some(NodeStatus::Processing));
        assert_eq!(frame.status_of("router1"), Some(NodeStatus::Idle));
        assert_eq!(
            frame.explanation,
            "Step 6: TCP ensures reliable delivery by retransmitting any lost packets."
        );
    }

    #[test]
    fn test_udp_hides_tcp_events() {
        let frame = Frame::project(&http(Transport::Udp, 10), 24_999.0);
        assert!(!frame.has_event("Initiating TCP handshake (SYN)"));
        assert!(!frame.has_event("TCP connection established"));
        assert!(!frame.has_event("TCP detected packet loss, retransmitting packet #4"));
        assert!(!frame.has_event("Message \"Hello World\" successfully reassembled in order"));
        assert!(frame.has_event("Message partially reassembled due to packet loss (UDP)"));
        assert!(frame.has_event("Packet #8 lost in transmission"));
    }

    #[test]
    fn test_zero_loss_hides_loss_events() {
        let frame = Frame::project(&http(Transport::Tcp, 0), 24_999.0);
        assert!(!frame.has_event("Packet #4 lost in transmission"));
        assert!(!frame.has_event("TCP detected packet loss, retransmitting packet #8"));
        assert!(frame.has_event("Server receiving packets"));
    }

    #[test]
    fn test_low_loss_keeps_loss_events() {
        let params = http(Transport::Tcp, 5);
        let frame = Frame::project(&params, 24_999.0);
        assert!(frame.has_event("Packet #4 lost in transmission"));
        assert!(frame.has_event("TCP detected packet loss, retransmitting packet #4"));
        assert!(frame.has_event("Packet #8 lost in transmission"));
        assert!(frame.has_event("TCP detected packet loss, retransmitting packet #8"));
        // The packets themselves all arrive on the first attempt
        assert!(Scenario::Http.legs(&params).iter().all(|leg| !leg.retransmission));
    }

    #[test]
    fn test_ready_event_always_first() {
        for params in [http(Transport::Udp, 0), ddos(), mode(Mode::Https)] {
            let events = visible_events(Scenario::for_params(&params), &params, -1.0);
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].message, "Simulation ready. Press Start to begin.");
        }
    }

    #[test]
    fn test_event_visibility_inclusive_boundary() {
        let params = http(Transport::Tcp, 10);
        let scenario = Scenario::Http;
        assert!(
            !visible_events(scenario, &params, 2399.0)
                .iter()
                .any(|e| e.message == "TCP connection established")
        );
        assert!(
            visible_events(scenario, &params, 2400.0)
                .iter()
                .any(|e| e.message == "TCP connection established")
        );
    }

    #[test]
    fn test_ddos_replaces_sequence() {
        let frame = Frame::project(&ddos(), 5000.0);
        assert!(frame.has_event("Server resources at 85% capacity"));
        assert!(!frame.has_event("DNS query sent to resolver"));
    }

    // ========================================================================
    // Node status windows
    // ========================================================================

    #[test]
    fn test_http_status_windows() {
        let tcp = http(Transport::Tcp, 10);
        let udp = http(Transport::Udp, 10);
        let s = |params: &Params, id, t| node_status(Scenario::Http, params, id, t);

        assert_eq!(s(&tcp, "dns", 500.0), NodeStatus::Processing);
        assert_eq!(s(&tcp, "server", 500.0), NodeStatus::Idle);
        assert_eq!(s(&tcp, "server", 1500.0), NodeStatus::Processing);
        assert_eq!(s(&udp, "server", 1500.0), NodeStatus::Idle);
        assert_eq!(s(&tcp, "computer", 2700.0), NodeStatus::Idle);
        assert_eq!(s(&tcp, "router2", 5000.0), NodeStatus::Active);
        assert_eq!(s(&tcp, "dns", 5000.0), NodeStatus::Idle);
        assert_eq!(s(&tcp, "server", 8000.0), NodeStatus::Processing);
        assert_eq!(s(&tcp, "computer", 8000.0), NodeStatus::Idle);
    }

    #[test]
    fn test_websocket_and_https_terminal_status() {
        let ws = mode(Mode::WebSocket);
        let https = mode(Mode::Https);

        assert_eq!(node_status(Scenario::WebSocket, &ws, "server", 2800.0), NodeStatus::Processing);
        assert_eq!(node_status(Scenario::WebSocket, &ws, "server", 20000.0), NodeStatus::Active);
        assert_eq!(node_status(Scenario::WebSocket, &ws, "isp", 20000.0), NodeStatus::Active);
        assert_eq!(node_status(Scenario::WebSocket, &ws, "dns", 20000.0), NodeStatus::Idle);

        assert_eq!(node_status(Scenario::Https, &https, "computer", 5999.0), NodeStatus::Processing);
        assert_eq!(node_status(Scenario::Https, &https, "computer", 6000.0), NodeStatus::Secure);
        assert_eq!(node_status(Scenario::Https, &https, "router1", 6000.0), NodeStatus::Active);
    }

    #[test]
    fn test_ddos_status_windows() {
        let params = ddos();
        let at = |t| Frame::project(&params, t);

        let early = at(500.0);
        for node in &early.nodes {
            let expected = if node.kind == NodeKind::Attacker {
                NodeStatus::Error
            } else {
                NodeStatus::Idle
            };
            assert_eq!(node.status, expected, "{}", node.id);
        }

        let attack = at(5000.0);
        assert_eq!(attack.status_of("server"), Some(NodeStatus::Error));
        assert_eq!(attack.status_of("router1"), Some(NodeStatus::Processing));
        assert_eq!(attack.status_of("computer"), Some(NodeStatus::Idle));

        let recovered = at(15001.0);
        assert_eq!(recovered.status_of("server"), Some(NodeStatus::Active));
        assert_eq!(recovered.status_of("router2"), Some(NodeStatus::Active));
        assert_eq!(recovered.status_of("computer"), Some(NodeStatus::Active));
        assert_eq!(recovered.status_of("attacker2"), Some(NodeStatus::Error));
    }

    #[test]
    fn test_ddos_status_changes_strictly_after_boundaries() {
        let params = ddos();
        let status = |id, t| node_status(Scenario::Ddos, &params, id, t);

        assert_eq!(status("router1", 2000.0), NodeStatus::Idle);
        assert_eq!(status("router1", 2000.5), NodeStatus::Processing);
        assert_eq!(status("server", 3000.0), NodeStatus::Idle);
        assert_eq!(status("server", 3000.5), NodeStatus::Error);
        assert_eq!(status("router2", 10000.0), NodeStatus::Processing);
        assert_eq!(status("router2", 10000.5), NodeStatus::Active);
        assert_eq!(status("server", 14000.0), NodeStatus::Error);
        assert_eq!(status("server", 14000.5), NodeStatus::Active);
        assert_eq!(status("computer", 15000.0), NodeStatus::Idle);
        assert_eq!(status("computer", 15000.5), NodeStatus::Active);
    }

    // ========================================================================
    // Explanations
    // ========================================================================

    #[test]
    fn test_explanation_range_lookup() {
        let tcp = http(Transport::Tcp, 10);
        let udp = http(Transport::Udp, 10);

        assert!(explanation(Scenario::Http, &tcp, 0.0).starts_with("Step 1"));
        assert!(explanation(Scenario::Http, &tcp, 999.0).starts_with("Step 1"));
        assert!(explanation(Scenario::Http, &tcp, 1000.0).starts_with("Step 2"));
        assert!(explanation(Scenario::Http, &tcp, 2500.0).starts_with("Step 3"));
        assert!(explanation(Scenario::Http, &udp, 2500.0).starts_with("Step 4"));
        assert!(explanation(Scenario::Http, &udp, 9000.0).contains("With UDP"));
        assert!(explanation(Scenario::Http, &tcp, 25000.0).starts_with("Step 8"));

        let ddos = ddos();
        assert!(explanation(Scenario::Ddos, &ddos, 9000.0).starts_with("DDoS mitigation"));
        assert!(explanation(Scenario::Ddos, &ddos, 12000.0).starts_with("The attack has been"));
    }

    // ========================================================================
    // Packets
    // ========================================================================

    #[test]
    fn test_dns_query_direct_interpolation() {
        let frame = Frame::project(&Params::default(), 500.0);
        let query = frame.packet("dns-query").unwrap();
        // computer (10,50) → dns (30,20), halfway
        assert_eq!(query.position, [20.0, 35.0]);
        assert_eq!(query.target_position, [30.0, 20.0]);
        assert_eq!(query.latency, 500.0);
        assert_eq!(query.transport, Transport::Udp);
        // dns-response starts exactly at 500
        assert_eq!(frame.packet("dns-response").unwrap().position, [30.0, 20.0]);
    }

    #[test]
    fn test_fragment_staged_route_segments() {
        let params = http(Transport::Tcp, 0);
        // data-0 departs 3000 and travels 800ms over four hops (200ms each)
        let at = |t| Frame::project(&params, t).packet("data-0").unwrap().position;

        assert_eq!(at(3000.0), [10.0, 50.0]); // computer
        assert_eq!(at(3200.0), [30.0, 50.0]); // isp
        assert_eq!(at(3300.0), [40.0, 45.0]); // isp → router1
        assert_eq!(at(3400.0), [50.0, 40.0]); // router1
        assert_eq!(at(3600.0), [70.0, 60.0]); // router2
        // Final segment interpolates both axes: router2 (70,60) → server (90,50)
        assert_eq!(at(3700.0), [80.0, 55.0]);
    }

    #[test]
    fn test_packet_window_half_open() {
        let params = Params::default();
        assert!(Frame::project(&params, 1499.0).packet("dns-response").is_some());
        assert!(Frame::project(&params, 1500.0).packet("dns-response").is_none());
        assert!(Frame::project(&params, 1500.0).packet("tcp-syn").is_some());
    }

    #[test]
    fn test_lost_fragment_hidden_then_retransmitted_under_tcp() {
        let params = http(Transport::Tcp, 10);
        let original_start = 4500.0; // fragment #4

        let during = Frame::project(&params, original_start + 100.0);
        assert!(during.packets.iter().all(|p| p.sequence_number != 4));

        let retry = Frame::project(&params, original_start + 1500.0);
        let packet = retry.packet("data-3-retry").unwrap();
        assert!(packet.retransmission);
        assert_eq!(packet.sequence_number, 4);
        assert_eq!(packet.created_at, original_start + 1500.0);
    }

    #[test]
    fn test_lost_fragment_never_reappears_under_udp() {
        let params = http(Transport::Udp, 10);
        for t in (0..25_000).step_by(50) {
            let frame = Frame::project(&params, f64::from(t));
            assert!(
                frame
                    .packets
                    .iter()
                    .all(|p| p.sequence_number != 4 && p.sequence_number != 8),
                "lost fragment in flight at {t}"
            );
        }
    }

    #[test]
    fn test_websocket_duplex_directions() {
        let frame = Frame::project(&mode(Mode::WebSocket), 7500.0);
        let up = frame.packet("ws-duplex-client").unwrap();
        let down = frame.packet("ws-duplex-server").unwrap();
        assert_eq!(up.direction, Some(crate::Direction::Upstream));
        assert_eq!(down.direction, Some(crate::Direction::Downstream));
        // Halfway between computer (10,50) and server (90,50)
        assert_eq!(up.position, [50.0, 50.0]);
        assert_eq!(down.position, [50.0, 50.0]);
    }

    #[test]
    fn test_https_encryption_flags() {
        let params = mode(Mode::Https);
        let hello = Frame::project(&params, 3100.0);
        assert!(!hello.packet("tls-client-hello").unwrap().encrypted);
        let cert = Frame::project(&params, 4100.0);
        assert!(cert.packet("tls-certificate").unwrap().encrypted);
        let request = Frame::project(&params, 7000.0);
        assert!(request.packet("https-request").unwrap().encrypted);
    }

    #[test]
    fn test_ddos_attack_packets_stop_at_mitigation() {
        let params = ddos();
        let attacking = Frame::project(&params, 2500.0);
        assert!(attacking.packets.iter().any(|p| p.payload == "ATTACK"));

        // A packet departing 9200 would normally fly until 10200
        let before = Frame::project(&params, 9900.0);
        assert!(before.packet("attack-3-2-4").is_some());
        let after = Frame::project(&params, 10_000.0);
        assert!(after.packets.iter().all(|p| p.payload != "ATTACK"));
    }

    #[test]
    fn test_ddos_attack_routes_through_nearest_relay() {
        let frame = Frame::project(&ddos(), 2500.0);
        // attacker3 (40,75) first burst departs 2000; at 2500 it reaches router2 (70,60)
        let packet = frame.packet("attack-3-0-0").unwrap();
        assert_eq!(packet.position, [70.0, 60.0]);
    }

    #[test]
    fn test_ddos_legitimate_request() {
        let params = ddos();
        assert!(Frame::project(&params, 14_999.0).packet("legitimate-request").is_none());
        let frame = Frame::project(&params, 15_500.0);
        let packet = frame.packet("legitimate-request").unwrap();
        assert_eq!(packet.payload, "GET /");
        assert_eq!(packet.position, [50.0, 50.0]);
    }

    // ========================================================================
    // Determinism
    // ========================================================================

    #[test]
    fn test_projection_idempotent() {
        for params in [http(Transport::Tcp, 10), http(Transport::Udp, 25), ddos()] {
            for t in [0.0, 1234.5, 4500.0, 9999.9, 25_000.0] {
                assert_eq!(Frame::project(&params, t), Frame::project(&params, t));
            }
        }
    }

    #[test]
    fn test_reset_frame() {
        let frame = Frame::reset(&ddos());
        assert_eq!(frame.time, 0.0);
        assert!(frame.packets.is_empty());
        assert_eq!(frame.explanation, "");
        assert_eq!(frame.events.len(), 1);
        assert_eq!(frame.nodes.len(), 9);
    }

    #[test]
    fn test_position_along_endpoints() {
        let route = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]];
        assert_eq!(position_along(&route, 0.0), [0.0, 0.0]);
        assert_eq!(position_along(&route, 0.25), [5.0, 0.0]);
        assert_eq!(position_along(&route, 0.75), [10.0, 5.0]);
        assert_eq!(position_along(&route, 1.0), [10.0, 10.0]);
    }
}

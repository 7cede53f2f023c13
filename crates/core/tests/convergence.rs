//! Multi-node propagation tests
//!
//! Nodes share a simulated air: every round each node gets a radio window,
//! transmits at most one packet, and every node that can hear it receives
//! the frame before the window closes.

use rbc_mesh_core::config::ACCESS_ADDRESS_BLE_ADV;
use rbc_mesh_core::event::EventKind;
use rbc_mesh_core::packet::PacketBuf;
use rbc_mesh_core::scheduler::TxState;
use rbc_mesh_core::session::ArbiterSignal;
use rbc_mesh_core::traits::{MockTime, TimeSource};
use rbc_mesh_core::{MeshConfig, MeshCore, MeshEvent, NodeAddress, RadioAction};

const ADV_INTERVAL_MS: u32 = 100;
const ROUND_US: u64 = 10_000;
const CONFIG: MeshConfig = MeshConfig::new(ACCESS_ADDRESS_BLE_ADV, 38, 8, ADV_INTERVAL_MS);

struct Air {
    nodes: Vec<MeshCore>,
    clock: MockTime,
    links: fn(usize, usize) -> bool,
}

fn address(index: usize) -> NodeAddress {
    NodeAddress([0x10 + index as u8, 0xAA, 0, 0, 0, 0xC0])
}

fn everyone(_from: usize, _to: usize) -> bool {
    true
}

/// 0 - 1 - 2, no direct link between the ends
fn line(from: usize, to: usize) -> bool {
    from.abs_diff(to) == 1
}

impl Air {
    fn new(count: usize, links: fn(usize, usize) -> bool) -> Self {
        let nodes = (0..count)
            .map(|i| {
                let mut core = MeshCore::new();
                core.init(CONFIG, address(i), true).unwrap();
                core
            })
            .collect();
        Self {
            nodes,
            clock: MockTime::new(),
            links,
        }
    }

    fn round(&mut self) {
        let now = self.clock.now_us();
        let mut frames: Vec<(usize, PacketBuf)> = Vec::new();

        for (i, node) in self.nodes.iter_mut().enumerate() {
            assert!(matches!(
                node.on_arbiter_signal(ArbiterSignal::Tick, now),
                RadioAction::RequestWindow { .. }
            ));
            if let RadioAction::Open { tx: Some(packet), .. } =
                node.on_arbiter_signal(ArbiterSignal::SessionStarted, now)
            {
                frames.push((i, packet));
            }
        }

        for (from, packet) in &frames {
            for to in 0..self.nodes.len() {
                if to != *from && (self.links)(*from, to) {
                    self.nodes[to].receive(packet, now);
                }
            }
        }

        for node in &mut self.nodes {
            node.on_arbiter_signal(ArbiterSignal::SessionEnded, now + ROUND_US / 2);
        }
        self.clock.advance(ROUND_US);
    }

    fn run_for_ms(&mut self, ms: u64) {
        for _ in 0..(ms * 1000 / ROUND_US) {
            self.round();
        }
    }

    fn set(&mut self, node: usize, handle: u16, data: &[u8]) {
        let now = self.clock.now_us();
        self.nodes[node].value_set(handle, data, now).unwrap();
    }

    fn get(&self, node: usize, handle: u16) -> Vec<u8> {
        self.nodes[node].value_get(handle).unwrap().to_vec()
    }

    fn drain(&mut self, node: usize) -> Vec<MeshEvent> {
        core::iter::from_fn(|| self.nodes[node].drain_event()).collect()
    }
}

#[test]
fn value_reaches_neighbor_with_new_val() {
    let mut air = Air::new(2, everyone);
    air.set(0, 3, b"abc");
    air.run_for_ms(200);

    assert_eq!(air.get(1, 3), b"abc");
    assert_eq!(air.nodes[1].value_version(3).unwrap(), (1, address(0)));

    let events = air.drain(1);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::NewVal);
    assert_eq!(events[0].handle, 3);
    assert_eq!(events[0].origin, address(0));
}

#[test]
fn newer_local_write_replaces_remote_copy() {
    let mut air = Air::new(2, everyone);
    air.set(0, 3, b"abc");
    air.set(0, 3, b"abc");
    air.run_for_ms(200);
    air.drain(1);

    air.set(0, 3, b"xyz");
    air.run_for_ms(200);

    assert_eq!(air.get(1, 3), b"xyz");
    let events = air.drain(1);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::UpdateVal);
    assert_eq!(events[0].data.as_slice(), b"xyz");
}

#[test]
fn value_hops_across_line_topology() {
    let mut air = Air::new(3, line);
    air.set(0, 5, b"hop");
    air.run_for_ms(400);

    assert_eq!(air.get(2, 5), b"hop");
    assert_eq!(air.nodes[2].value_version(5).unwrap(), (1, address(0)));
}

#[test]
fn concurrent_writes_converge_on_every_node() {
    let mut air = Air::new(3, everyone);
    air.set(0, 1, b"one");
    air.set(1, 2, b"two");
    air.set(2, 3, b"three");
    air.run_for_ms(100);
    air.set(1, 2, b"two-b");
    air.run_for_ms(1_000);

    for node in 0..3 {
        assert_eq!(air.get(node, 1), b"one");
        assert_eq!(air.get(node, 2), b"two-b");
        assert_eq!(air.get(node, 3), b"three");
        assert_eq!(air.nodes[node].value_version(2).unwrap().0, 2);
    }
}

#[test]
fn stale_node_is_brought_up_to_date() {
    let mut air = Air::new(2, everyone);
    air.set(0, 4, b"v1");
    air.run_for_ms(200);

    // Node 0 writes while node 1 hears nothing
    air.links = |from, _| from != 0;
    air.set(0, 4, b"v2");
    air.set(0, 4, b"v3");
    air.run_for_ms(200);
    assert_eq!(air.get(1, 4), b"v1");

    // Link restored: node 1's stale advertisement re-arms node 0
    air.links = everyone;
    air.run_for_ms(2_000);
    assert_eq!(air.get(1, 4), b"v3");
    assert_eq!(air.nodes[1].value_version(4).unwrap().0, 3);
}

#[test]
fn equal_versions_raise_conflict_until_rewritten() {
    let mut air = Air::new(2, everyone);
    air.set(0, 2, b"left");
    air.set(1, 2, b"right");
    air.drain(0);
    air.drain(1);
    air.run_for_ms(300);

    // Neither side adopts the other's copy
    assert_eq!(air.get(0, 2), b"left");
    assert_eq!(air.get(1, 2), b"right");
    for node in 0..2 {
        let events = air.drain(node);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::ConflictingVal);
        assert_eq!(events[0].origin, address(1 - node));
        assert!(air.nodes[node].stats().conflicts > 0);
    }

    // Application reconciles by writing a newer version
    air.set(0, 2, b"merged");
    air.run_for_ms(300);
    assert_eq!(air.get(1, 2), b"merged");
    assert!(air
        .drain(1)
        .iter()
        .any(|e| e.kind == EventKind::UpdateVal && e.data.as_slice() == b"merged"));
}

#[test]
fn unresolved_conflict_settles_into_backoff() {
    let mut air = Air::new(2, everyone);
    air.set(0, 2, b"left");
    air.set(1, 2, b"right");
    air.set(1, 5, b"other");
    air.drain(0);
    air.drain(1);
    air.run_for_ms(60_000);

    let events = air.drain(0);
    assert_eq!(
        events.iter().filter(|e| e.kind == EventKind::ConflictingVal).count(),
        1
    );
    assert!(events
        .iter()
        .any(|e| e.kind == EventKind::NewVal && e.handle == 5 && e.data.as_slice() == b"other"));

    let events = air.drain(1);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::ConflictingVal);

    for node in 0..2 {
        let scheduler = air.nodes[node].scheduler();
        let interval_ms = match scheduler.state(2) {
            Some(TxState::Armed { interval_ms, .. }) | Some(TxState::Sent { interval_ms, .. }) => {
                interval_ms
            }
            other => panic!("handle 2 on node {} in {:?}", node, other),
        };
        assert_eq!(interval_ms, scheduler.max_interval_ms());
        assert_eq!(air.nodes[node].stats().queue_overflows, 0);
        assert!(air.nodes[node].stats().tx_count < 100);
    }
    assert_eq!(air.get(0, 2), b"left");
    assert_eq!(air.get(1, 2), b"right");
}

#[test]
fn backoff_stretches_then_request_pulls_value() {
    let mut air = Air::new(2, everyone);
    air.links = |from, _| from == 0;
    air.set(0, 6, b"slow");
    air.run_for_ms(20_000);

    // Wait for node 0 to transmit so its next slot is a full backed-off interval away
    let sent = air.nodes[0].stats().tx_count;
    while air.nodes[0].stats().tx_count == sent {
        air.round();
    }
    let now = air.clock.now_us();
    let max_interval_us = air.nodes[0].scheduler().max_interval_ms() as u64 * 1000;
    assert!(air.nodes[0].scheduler().next_due_us().unwrap() >= now + max_interval_us - ROUND_US);

    // Fresh node asks for the handle
    air.nodes.push({
        let mut core = MeshCore::new();
        core.init(CONFIG, address(9), true).unwrap();
        core
    });
    air.links = everyone;
    air.nodes[2].value_req(6).unwrap();
    air.run_for_ms(200);

    assert_eq!(air.get(2, 6), b"slow");
    assert_eq!(air.drain(2)[0].kind, EventKind::NewVal);
}

#[test]
fn foreign_access_address_is_not_heard() {
    let mut air = Air::new(1, everyone);
    let mut outsider = MeshCore::new();
    outsider
        .init(MeshConfig::new(0x1234_5678, 38, 8, ADV_INTERVAL_MS), address(7), true)
        .unwrap();
    outsider.value_set(3, b"nope", 0).unwrap();

    outsider.on_arbiter_signal(ArbiterSignal::Tick, 100_000);
    let RadioAction::Open { tx: Some(packet), .. } =
        outsider.on_arbiter_signal(ArbiterSignal::SessionStarted, 100_000)
    else {
        panic!("outsider should transmit");
    };

    air.nodes[0].on_arbiter_signal(ArbiterSignal::Tick, 0);
    air.nodes[0].on_arbiter_signal(ArbiterSignal::SessionStarted, 0);
    air.nodes[0].receive(&packet, 0);

    assert!(air.get(0, 3).is_empty());
    assert_eq!(air.nodes[0].stats().malformed_packets, 1);
}

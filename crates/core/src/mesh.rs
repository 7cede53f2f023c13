//! Mesh engine
//!
//! [`MeshCore`] bundles every piece of state the interrupt context and the
//! background context share: the value store, the event queue, the
//! broadcast scheduler, the conflict resolver and the radio session. Each
//! method is a bounded operation meant to run inside one short critical
//! section. None of them perform radio I/O; they return the bytes or the
//! step the caller must carry out once the critical section is left.

use crate::config::MeshConfig;
use crate::error::{MeshError, Result};
use crate::event::{EventKind, EventQueue, MeshEvent};
use crate::packet::{Advertisement, PacketBuf, PacketError, PacketKind};
use crate::resolver::{ConflictResolver, Decision, Incoming};
use crate::scheduler::{BroadcastScheduler, TxItem};
use crate::session::{ArbiterSignal, RadioSession, SessionState, SessionStep};
use crate::store::{NodeAddress, ValueData, ValueStore, Version};

/// Diagnostic counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshStats {
    /// Equal-version advertisements with differing data
    pub conflicts: u32,
    /// Events dropped because the queue was full
    pub queue_overflows: u32,
    /// Frames discarded by the decoder or carrying unknown handles
    pub malformed_packets: u32,
    /// Radio windows denied or revoked before start
    pub sessions_denied: u32,
    /// Packets handed to the radio
    pub tx_count: u32,
    /// Advertisements that changed the store
    pub rx_accepted: u32,
}

/// What the caller must do after an arbiter signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioAction {
    /// Nothing
    None,
    /// Request a radio window of `length_us` from the arbiter
    RequestWindow { length_us: u32 },
    /// Configure the radio, transmit `tx` if present, then listen
    Open {
        access_address: u32,
        channel: u8,
        tx: Option<PacketBuf>,
    },
    /// Keep listening
    Listen,
    /// Turn the radio off
    Close,
}

/// Effect of one received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxOutcome {
    /// No window is open; the frame is not ours to process
    NotListening,
    /// Failed to decode
    Dropped(PacketError),
    /// Valid frame for a handle this node does not have
    OutOfRange(u16),
    /// Value advertisement processed by the resolver
    Resolved {
        handle: u16,
        decision: Decision,
        evicted: bool,
    },
    /// Request for a value this node holds; rebroadcast armed
    RequestServed(u16),
    /// Request for a value this node does not hold
    RequestIgnored(u16),
}

/// Shared mesh state
pub struct MeshCore {
    session: RadioSession,
    store: ValueStore,
    queue: EventQueue,
    scheduler: BroadcastScheduler,
    resolver: ConflictResolver,
    local_address: NodeAddress,
    malformed: u32,
    tx_count: u32,
    rx_accepted: u32,
}

impl MeshCore {
    /// Create an uninitialized mesh (const fn for static initialization)
    pub const fn new() -> Self {
        Self {
            session: RadioSession::new(),
            store: ValueStore::new(),
            queue: EventQueue::new(),
            scheduler: BroadcastScheduler::new(),
            resolver: ConflictResolver::new(),
            local_address: NodeAddress::UNSET,
            malformed: 0,
            tx_count: 0,
            rx_accepted: 0,
        }
    }

    /// Bring the mesh up
    ///
    /// `host_ready` reports whether the host wireless stack is enabled.
    /// Errors, in order of precedence: `InvalidState` when already
    /// initialized, `InvalidParam` for out-of-range configuration,
    /// `DependencyNotReady` when the host stack is down. A failed call
    /// leaves the mesh uninitialized.
    pub fn init(&mut self, config: MeshConfig, local_address: NodeAddress, host_ready: bool) -> Result<()> {
        if self.is_initialized() {
            return Err(MeshError::InvalidState);
        }
        config.validate()?;
        if !host_ready {
            return Err(MeshError::DependencyNotReady);
        }

        self.session.configure(config)?;
        self.store.configure(config.handle_count);
        self.scheduler.configure(&config, address_seed(local_address));
        self.local_address = local_address;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.session.state() != SessionState::Uninitialized
    }

    /// Copy of the active configuration
    pub fn config(&self) -> Result<MeshConfig> {
        self.session.config().copied()
    }

    pub fn local_address(&self) -> NodeAddress {
        self.local_address
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Write a value locally and arm its rebroadcast
    ///
    /// Queues an `UpdateVal` event with the local origin. Returns the new
    /// version and whether queuing evicted an older event.
    pub fn value_set(&mut self, handle: u16, data: &[u8], now_us: u64) -> Result<(Version, bool)> {
        self.session.config()?;
        let version = self.store.set(handle, data, self.local_address, now_us)?;
        self.scheduler.arm(handle, now_us);

        let snapshot = ValueData::from_slice(data).map_err(|_| MeshError::InvalidLength)?;
        let evicted = self.queue.push(MeshEvent::new(
            EventKind::UpdateVal,
            handle,
            snapshot,
            self.local_address,
        ));
        Ok((version, evicted))
    }

    /// Copy of the current bytes of a handle
    pub fn value_get(&self, handle: u16) -> Result<ValueData> {
        self.session.config()?;
        self.store.get(handle)
    }

    /// Version and origin currently stored for a handle
    pub fn value_version(&self, handle: u16) -> Result<(Version, NodeAddress)> {
        self.session.config()?;
        let record = self.store.record(handle)?;
        Ok((record.version(), record.origin()))
    }

    /// Schedule a one-shot request broadcast for a handle
    pub fn value_req(&mut self, handle: u16) -> Result<()> {
        self.session.config()?;
        self.scheduler.request(handle)
    }

    /// Remove the oldest pending event
    pub fn drain_event(&mut self) -> Option<MeshEvent> {
        self.queue.drain_one()
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Drive the radio session from an arbiter signal
    pub fn on_arbiter_signal(&mut self, signal: ArbiterSignal, now_us: u64) -> RadioAction {
        match self.session.on_signal(signal, now_us) {
            SessionStep::None => RadioAction::None,
            SessionStep::RequestWindow { length_us } => RadioAction::RequestWindow { length_us },
            SessionStep::OpenWindow => {
                let Ok(config) = self.config() else {
                    return RadioAction::None;
                };
                RadioAction::Open {
                    access_address: config.access_address,
                    channel: config.channel,
                    tx: self.take_due_packet(config.access_address, now_us),
                }
            }
            SessionStep::ContinueWindow => RadioAction::Listen,
            SessionStep::CloseWindow => RadioAction::Close,
        }
    }

    /// The arbiter refused a window request synchronously
    pub fn window_request_failed(&mut self) {
        self.session.request_failed();
    }

    /// Process one frame received during a window
    pub fn receive(&mut self, frame: &[u8], now_us: u64) -> RxOutcome {
        if !self.session.is_in_session() {
            return RxOutcome::NotListening;
        }
        let Ok(config) = self.config() else {
            return RxOutcome::NotListening;
        };

        let adv = match Advertisement::decode(frame, config.access_address) {
            Ok(adv) => adv,
            Err(err) => {
                self.malformed = self.malformed.saturating_add(1);
                return RxOutcome::Dropped(err);
            }
        };
        if !config.is_valid_handle(adv.handle) {
            self.malformed = self.malformed.saturating_add(1);
            return RxOutcome::OutOfRange(adv.handle);
        }

        match adv.kind {
            PacketKind::Request => self.serve_request(adv.handle, now_us),
            PacketKind::Value => self.resolve_value(&adv, now_us),
        }
    }

    /// Diagnostic counters snapshot
    pub fn stats(&self) -> MeshStats {
        MeshStats {
            conflicts: self.resolver.conflict_count(),
            queue_overflows: self.queue.overflow_count(),
            malformed_packets: self.malformed,
            sessions_denied: self.session.denied_count(),
            tx_count: self.tx_count,
            rx_accepted: self.rx_accepted,
        }
    }

    /// Read access to the scheduler, for diagnostics and tests
    pub fn scheduler(&self) -> &BroadcastScheduler {
        &self.scheduler
    }

    fn take_due_packet(&mut self, access_address: u32, now_us: u64) -> Option<PacketBuf> {
        let item = self.scheduler.next_ready(now_us)?;
        let (encoded, last_activity_us) = match item {
            TxItem::Request(handle) => (
                Advertisement::request(handle, self.local_address).encode(access_address),
                now_us,
            ),
            TxItem::Value(handle) => {
                let record = self.store.record(handle).ok()?;
                (
                    Advertisement::value(handle, record.version(), record.origin(), record.data())
                        .encode(access_address),
                    record.last_activity_us(),
                )
            }
        };
        self.scheduler.mark_sent(item, now_us, last_activity_us);
        let packet = encoded.ok()?;
        self.tx_count = self.tx_count.saturating_add(1);
        Some(packet)
    }

    fn serve_request(&mut self, handle: u16, now_us: u64) -> RxOutcome {
        match self.store.record(handle) {
            Ok(record) if record.is_allocated() => {
                self.scheduler.arm(handle, now_us);
                RxOutcome::RequestServed(handle)
            }
            _ => RxOutcome::RequestIgnored(handle),
        }
    }

    fn resolve_value(&mut self, adv: &Advertisement<'_>, now_us: u64) -> RxOutcome {
        let incoming = Incoming {
            handle: adv.handle,
            data: adv.payload,
            version: adv.version,
            origin: adv.origin,
        };

        let resolution = match self.resolver.resolve(&mut self.store, &incoming, now_us) {
            Ok(resolution) => resolution,
            Err(_) => {
                self.malformed = self.malformed.saturating_add(1);
                return RxOutcome::OutOfRange(adv.handle);
            }
        };

        match resolution.decision {
            Decision::AcceptNew | Decision::AcceptUpdate => {
                self.rx_accepted = self.rx_accepted.saturating_add(1);
                self.scheduler.arm(adv.handle, now_us);
            }
            // A stale peer needs our newer copy
            Decision::Conflict | Decision::Stale => self.scheduler.arm(adv.handle, now_us),
            Decision::KnownConflict | Decision::Duplicate => {}
        }

        let evicted = resolution
            .event
            .map(|event| self.queue.push(event))
            .unwrap_or(false);

        RxOutcome::Resolved {
            handle: adv.handle,
            decision: resolution.decision,
            evicted,
        }
    }
}

impl Default for MeshCore {
    fn default() -> Self {
        Self::new()
    }
}

/// Jitter seed derived from the node address
fn address_seed(address: NodeAddress) -> u64 {
    let mut bytes = [0u8; 8];
    bytes[..6].copy_from_slice(address.as_bytes());
    u64::from_le_bytes(bytes) ^ 0x9E37_79B9_7F4A_7C15
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ACCESS_ADDRESS_BLE_ADV, MAX_VALUE_LEN};
    use crate::scheduler::TxState;

    const LOCAL: NodeAddress = NodeAddress([0x11, 0, 0, 0, 0, 0]);
    const PEER: NodeAddress = NodeAddress([0x22, 0, 0, 0, 0, 0]);
    const CONFIG: MeshConfig = MeshConfig::new(ACCESS_ADDRESS_BLE_ADV, 38, 10, 100);

    fn mesh() -> MeshCore {
        let mut mesh = MeshCore::new();
        mesh.init(CONFIG, LOCAL, true).unwrap();
        mesh
    }

    fn open_window(mesh: &mut MeshCore, now_us: u64) -> RadioAction {
        mesh.on_arbiter_signal(ArbiterSignal::Tick, now_us);
        mesh.on_arbiter_signal(ArbiterSignal::SessionStarted, now_us)
    }

    fn value_frame(handle: u16, version: Version, data: &[u8]) -> PacketBuf {
        Advertisement::value(handle, version, PEER, data)
            .encode(ACCESS_ADDRESS_BLE_ADV)
            .unwrap()
    }

    #[test]
    fn test_operations_before_init_are_invalid_state() {
        let mut mesh = MeshCore::new();
        assert_eq!(mesh.value_set(1, b"a", 0), Err(MeshError::InvalidState));
        assert_eq!(mesh.value_get(1), Err(MeshError::InvalidState));
        assert_eq!(mesh.value_req(1), Err(MeshError::InvalidState));
        assert_eq!(mesh.config(), Err(MeshError::InvalidState));
        assert_eq!(mesh.on_arbiter_signal(ArbiterSignal::Tick, 0), RadioAction::None);
    }

    #[test]
    fn test_init_error_precedence() {
        let mut mesh = MeshCore::new();
        let bad = MeshConfig::new(ACCESS_ADDRESS_BLE_ADV, 45, 10, 100);
        assert_eq!(mesh.init(bad, LOCAL, false), Err(MeshError::InvalidParam));
        assert_eq!(mesh.init(CONFIG, LOCAL, false), Err(MeshError::DependencyNotReady));
        assert!(!mesh.is_initialized());

        assert!(mesh.init(CONFIG, LOCAL, true).is_ok());
        assert_eq!(mesh.init(CONFIG, LOCAL, true), Err(MeshError::InvalidState));
    }

    #[test]
    fn test_set_get_and_local_event() {
        let mut mesh = mesh();
        assert_eq!(mesh.value_set(3, b"abc", 0), Ok((1, false)));
        assert_eq!(mesh.value_get(3).unwrap().as_slice(), b"abc");

        let event = mesh.drain_event().unwrap();
        assert_eq!(event.kind, EventKind::UpdateVal);
        assert_eq!(event.handle, 3);
        assert_eq!(event.origin, LOCAL);
        assert!(matches!(mesh.scheduler().state(3), Some(TxState::Armed { .. })));
    }

    #[test]
    fn test_failed_set_has_no_side_effects() {
        let mut mesh = mesh();
        let too_long = [0u8; MAX_VALUE_LEN + 1];
        assert_eq!(mesh.value_set(3, &too_long, 0), Err(MeshError::InvalidLength));
        assert_eq!(mesh.value_set(0, b"a", 0), Err(MeshError::InvalidAddr));
        assert_eq!(mesh.value_set(10, b"a", 0), Err(MeshError::InvalidAddr));
        assert_eq!(mesh.pending_events(), 0);
        assert_eq!(mesh.scheduler().state(3), Some(TxState::Idle));
        assert!(mesh.value_get(3).unwrap().is_empty());
    }

    #[test]
    fn test_identical_sets_bump_version_twice() {
        let mut mesh = mesh();
        mesh.value_set(2, b"D", 0).unwrap();
        mesh.value_set(2, b"D", 1).unwrap();
        assert_eq!(mesh.value_version(2).unwrap().0, 2);

        let first = mesh.drain_event().unwrap();
        let second = mesh.drain_event().unwrap();
        assert_eq!(first.kind, EventKind::UpdateVal);
        assert_eq!(second.kind, EventKind::UpdateVal);
        assert_eq!(first.data, second.data);
    }

    #[test]
    fn test_value_req_range() {
        let mut mesh = mesh();
        assert_eq!(mesh.value_req(0), Err(MeshError::InvalidAddr));
        assert_eq!(mesh.value_req(10), Err(MeshError::InvalidAddr));
        assert!(mesh.value_req(9).is_ok());
        assert!(mesh.scheduler().request_pending(9));
    }

    #[test]
    fn test_window_transmits_due_value() {
        let mut mesh = mesh();
        mesh.value_set(3, b"abc", 0).unwrap();

        let RadioAction::Open {
            access_address,
            channel,
            tx: Some(packet),
        } = open_window(&mut mesh, 100_000)
        else {
            panic!("expected a transmission");
        };
        assert_eq!(access_address, ACCESS_ADDRESS_BLE_ADV);
        assert_eq!(channel, 38);

        let adv = Advertisement::decode(&packet, ACCESS_ADDRESS_BLE_ADV).unwrap();
        assert_eq!(adv.handle, 3);
        assert_eq!(adv.version, 1);
        assert_eq!(adv.origin, LOCAL);
        assert_eq!(adv.payload, b"abc");
        assert_eq!(mesh.stats().tx_count, 1);
    }

    #[test]
    fn test_window_without_due_items_only_listens() {
        let mut mesh = mesh();
        assert_eq!(
            open_window(&mut mesh, 0),
            RadioAction::Open {
                access_address: ACCESS_ADDRESS_BLE_ADV,
                channel: 38,
                tx: None,
            }
        );
        assert_eq!(mesh.on_arbiter_signal(ArbiterSignal::RadioEvent, 1), RadioAction::Listen);
        assert_eq!(mesh.on_arbiter_signal(ArbiterSignal::SessionEnded, 2), RadioAction::Close);
    }

    #[test]
    fn test_request_packet_transmitted_once() {
        let mut mesh = mesh();
        mesh.value_req(5).unwrap();

        let RadioAction::Open { tx: Some(packet), .. } = open_window(&mut mesh, 0) else {
            panic!("expected request");
        };
        let adv = Advertisement::decode(&packet, ACCESS_ADDRESS_BLE_ADV).unwrap();
        assert_eq!(adv.kind, PacketKind::Request);
        assert_eq!(adv.handle, 5);

        mesh.on_arbiter_signal(ArbiterSignal::SessionEnded, 1);
        assert!(matches!(
            open_window(&mut mesh, 1_000_000),
            RadioAction::Open { tx: None, .. }
        ));
    }

    #[test]
    fn test_receive_outside_window_ignored() {
        let mut mesh = mesh();
        assert_eq!(
            mesh.receive(&value_frame(3, 1, b"x"), 0),
            RxOutcome::NotListening
        );
        assert!(mesh.value_get(3).unwrap().is_empty());
    }

    #[test]
    fn test_scenario_stale_then_newer() {
        let mut mesh = mesh();
        mesh.value_set(3, b"abc", 0).unwrap();
        mesh.value_set(3, b"abc", 1).unwrap();
        while mesh.drain_event().is_some() {}
        open_window(&mut mesh, 10);

        let outcome = mesh.receive(&value_frame(3, 1, b"old"), 20);
        assert!(matches!(
            outcome,
            RxOutcome::Resolved {
                decision: Decision::Stale,
                ..
            }
        ));
        assert_eq!(mesh.pending_events(), 0);
        assert_eq!(mesh.value_get(3).unwrap().as_slice(), b"abc");

        mesh.receive(&value_frame(3, 7, b"xyz"), 30);
        let event = mesh.drain_event().unwrap();
        assert_eq!(event.kind, EventKind::UpdateVal);
        assert_eq!(event.data.as_slice(), b"xyz");
        assert_eq!(event.origin, PEER);
        assert_eq!(mesh.value_get(3).unwrap().as_slice(), b"xyz");
        assert_eq!(mesh.stats().rx_accepted, 1);
    }

    #[test]
    fn test_receive_new_value_allocates() {
        let mut mesh = mesh();
        open_window(&mut mesh, 0);
        mesh.receive(&value_frame(4, 9, b"hello"), 1);

        let event = mesh.drain_event().unwrap();
        assert_eq!(event.kind, EventKind::NewVal);
        assert_eq!(mesh.value_version(4).unwrap(), (9, PEER));
        assert!(matches!(mesh.scheduler().state(4), Some(TxState::Armed { .. })));
    }

    #[test]
    fn test_receive_conflict_keeps_local_and_rearms() {
        let mut mesh = mesh();
        mesh.value_set(3, b"mine", 0).unwrap();
        mesh.drain_event();
        open_window(&mut mesh, 0);
        mesh.scheduler.mark_sent(TxItem::Value(3), 0, 0);

        mesh.receive(&value_frame(3, 1, b"theirs"), 5);
        let event = mesh.drain_event().unwrap();
        assert_eq!(event.kind, EventKind::ConflictingVal);
        assert_eq!(event.data.as_slice(), b"theirs");
        assert_eq!(mesh.value_get(3).unwrap().as_slice(), b"mine");
        assert_eq!(mesh.stats().conflicts, 1);
        assert!(matches!(mesh.scheduler().state(3), Some(TxState::Armed { .. })));
    }

    #[test]
    fn test_repeated_conflict_neither_queues_nor_rearms() {
        let mut mesh = mesh();
        mesh.value_set(3, b"mine", 0).unwrap();
        mesh.drain_event();
        open_window(&mut mesh, 0);
        mesh.receive(&value_frame(3, 1, b"theirs"), 5);
        assert_eq!(mesh.drain_event().unwrap().kind, EventKind::ConflictingVal);
        mesh.scheduler.mark_sent(TxItem::Value(3), 10, 5);

        let outcome = mesh.receive(&value_frame(3, 1, b"theirs"), 20);
        assert_eq!(
            outcome,
            RxOutcome::Resolved {
                handle: 3,
                decision: Decision::KnownConflict,
                evicted: false,
            }
        );
        assert_eq!(mesh.pending_events(), 0);
        assert!(matches!(mesh.scheduler().state(3), Some(TxState::Sent { .. })));
        assert_eq!(mesh.stats().conflicts, 2);
    }

    #[test]
    fn test_malformed_and_foreign_frames_counted() {
        let mut mesh = mesh();
        open_window(&mut mesh, 0);

        assert_eq!(
            mesh.receive(&[1, 2, 3], 1),
            RxOutcome::Dropped(PacketError::TooShort)
        );
        let foreign = Advertisement::value(3, 1, PEER, b"x").encode(0xDEAD_BEEF).unwrap();
        assert_eq!(
            mesh.receive(&foreign, 1),
            RxOutcome::Dropped(PacketError::AccessAddressMismatch)
        );
        assert_eq!(mesh.receive(&value_frame(12, 1, b"x"), 1), RxOutcome::OutOfRange(12));
        assert_eq!(mesh.stats().malformed_packets, 3);
        assert_eq!(mesh.pending_events(), 0);
    }

    #[test]
    fn test_request_for_held_value_is_served() {
        let mut mesh = mesh();
        mesh.value_set(6, b"v", 0).unwrap();
        open_window(&mut mesh, 0);
        mesh.scheduler.mark_sent(TxItem::Value(6), 0, 0);

        let request = Advertisement::request(6, PEER).encode(ACCESS_ADDRESS_BLE_ADV).unwrap();
        assert_eq!(mesh.receive(&request, 1), RxOutcome::RequestServed(6));
        assert!(matches!(mesh.scheduler().state(6), Some(TxState::Armed { .. })));

        let request = Advertisement::request(7, PEER).encode(ACCESS_ADDRESS_BLE_ADV).unwrap();
        assert_eq!(mesh.receive(&request, 1), RxOutcome::RequestIgnored(7));
        assert_eq!(mesh.scheduler().state(7), Some(TxState::Idle));
    }

    #[test]
    fn test_queue_overflow_is_counted_not_failed() {
        let mut mesh = mesh();
        for i in 0..40u8 {
            assert!(mesh.value_set(1, &[i], i as u64).is_ok());
        }
        assert_eq!(mesh.stats().queue_overflows, 40 - crate::event::EVENT_QUEUE_SIZE as u32);
        assert_eq!(mesh.drain_event().unwrap().data[0], 40 - crate::event::EVENT_QUEUE_SIZE as u8);
    }

    #[test]
    fn test_denied_window_counted() {
        let mut mesh = mesh();
        mesh.on_arbiter_signal(ArbiterSignal::Tick, 0);
        mesh.on_arbiter_signal(ArbiterSignal::SessionDenied, 1);
        mesh.on_arbiter_signal(ArbiterSignal::Tick, 2);
        mesh.window_request_failed();
        assert_eq!(mesh.stats().sessions_denied, 2);
        assert_eq!(mesh.session_state(), SessionState::Idle);
    }
}

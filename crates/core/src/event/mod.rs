//! Event Queue
//!
//! Bounded FIFO carrying framework-to-application notifications. Producers
//! (interrupt context) never block: when the queue is full the oldest event
//! is evicted and counted as an overflow.
//!
//! ## Features
//!
//! - Fixed capacity of [`EVENT_QUEUE_SIZE`] events, no allocation
//! - Each event owns a snapshot of the value bytes
//! - Overflow tracking for diagnostics
//! - Oldest-first delivery

use heapless::Deque;

use crate::store::{NodeAddress, ValueData};

/// Queue capacity in number of events
pub const EVENT_QUEUE_SIZE: usize = 16;

/// Kind of change an event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A previously unallocated value has been received and allocated
    NewVal,
    /// The value has been updated, locally or by another node
    UpdateVal,
    /// Another node holds different data under the same version
    ConflictingVal,
}

/// Notification delivered to the application
///
/// Immutable once queued. `data` is a copy taken when the event was
/// produced; the live record may have changed since.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshEvent {
    pub kind: EventKind,
    pub handle: u16,
    pub data: ValueData,
    pub origin: NodeAddress,
}

impl MeshEvent {
    pub fn new(kind: EventKind, handle: u16, data: ValueData, origin: NodeAddress) -> Self {
        Self {
            kind,
            handle,
            data,
            origin,
        }
    }
}

/// Application sink for mesh events
///
/// Supplied to the framework by the application. Invoked once per drained
/// event, always from background context.
pub trait EventHandler {
    fn handle_event(&self, event: &MeshEvent);
}

impl<F> EventHandler for F
where
    F: Fn(&MeshEvent),
{
    fn handle_event(&self, event: &MeshEvent) {
        self(event)
    }
}

/// Fixed-capacity event FIFO with oldest-eviction on overflow
pub struct EventQueue {
    events: Deque<MeshEvent, EVENT_QUEUE_SIZE>,
    overflow_count: u32,
}

impl EventQueue {
    /// Create an empty queue (const fn for static initialization)
    pub const fn new() -> Self {
        Self {
            events: Deque::new(),
            overflow_count: 0,
        }
    }

    /// Queue an event
    ///
    /// If the queue is full the oldest pending event is dropped and
    /// `overflow_count` is incremented. Returns `true` when an event was
    /// evicted.
    pub fn push(&mut self, event: MeshEvent) -> bool {
        let mut evicted = false;
        if self.events.is_full() {
            self.events.pop_front();
            self.overflow_count = self.overflow_count.saturating_add(1);
            evicted = true;
        }
        // Cannot fail: a slot was freed above if the deque was full
        let _ = self.events.push_back(event);
        evicted
    }

    /// Remove and return the oldest pending event
    pub fn drain_one(&mut self) -> Option<MeshEvent> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events lost to overflow since startup
    pub fn overflow_count(&self) -> u32 {
        self.overflow_count
    }

    /// Iterate over pending events in oldest-first order
    pub fn iter(&self) -> impl Iterator<Item = &MeshEvent> {
        self.events.iter()
    }

    /// Drop all pending events
    ///
    /// Does not reset overflow_count.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    fn event(handle: u16, byte: u8) -> MeshEvent {
        MeshEvent::new(
            EventKind::UpdateVal,
            handle,
            ValueData::from_slice(&[byte]).unwrap(),
            NodeAddress::UNSET,
        )
    }

    #[test]
    fn test_push_and_drain_fifo() {
        let mut queue = EventQueue::new();
        assert!(queue.is_empty());

        queue.push(event(1, 10));
        queue.push(event(2, 20));
        queue.push(event(1, 30));

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.drain_one().unwrap().data[0], 10);
        assert_eq!(queue.drain_one().unwrap().data[0], 20);
        assert_eq!(queue.drain_one().unwrap().data[0], 30);
        assert!(queue.drain_one().is_none());
    }

    #[test]
    fn test_fill_without_overflow() {
        let mut queue = EventQueue::new();
        for i in 0..EVENT_QUEUE_SIZE {
            assert!(!queue.push(event(1, i as u8)));
        }
        assert_eq!(queue.len(), EVENT_QUEUE_SIZE);
        assert_eq!(queue.overflow_count(), 0);
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut queue = EventQueue::new();
        for i in 0..EVENT_QUEUE_SIZE {
            queue.push(event(1, i as u8));
        }

        assert!(queue.push(event(1, 200)));
        assert_eq!(queue.len(), EVENT_QUEUE_SIZE);
        assert_eq!(queue.overflow_count(), 1);

        // "0" was evicted; "1" is now the oldest
        assert_eq!(queue.iter().next().unwrap().data[0], 1);
        assert_eq!(queue.iter().last().unwrap().data[0], 200);
    }

    #[test]
    fn test_burst_overflow_counts_every_drop() {
        let mut queue = EventQueue::new();
        for i in 0..(EVENT_QUEUE_SIZE + 7) {
            queue.push(event(1, i as u8));
        }
        assert_eq!(queue.overflow_count(), 7);
        assert_eq!(queue.drain_one().unwrap().data[0], 7);
    }

    #[test]
    fn test_clear_keeps_overflow_count() {
        let mut queue = EventQueue::new();
        for i in 0..(EVENT_QUEUE_SIZE + 1) {
            queue.push(event(1, i as u8));
        }
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.overflow_count(), 1);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut queue = EventQueue::new();
        let mut data = ValueData::from_slice(b"abc").unwrap();
        queue.push(MeshEvent::new(EventKind::NewVal, 3, data.clone(), NodeAddress::UNSET));
        data.clear();
        assert_eq!(queue.drain_one().unwrap().data.as_slice(), b"abc");
    }

    #[test]
    fn test_closure_handler() {
        let seen = Cell::new(0u16);
        let handler = |evt: &MeshEvent| seen.set(evt.handle);
        handler.handle_event(&event(7, 0));
        assert_eq!(seen.get(), 7);
    }
}

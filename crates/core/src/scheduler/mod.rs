//! Broadcast Scheduler
//!
//! Decides when each allocated handle is (re)advertised. The policy is:
//!
//! - Any local write, accepted remote update or detected conflict arms the
//!   handle for a near-term transmission (random delay up to half an
//!   advertising interval).
//! - After each transmission the handle waits one advertising interval
//!   plus jitter before it is due again.
//! - Once a handle's value has been stable for [`STABLE_PERIODS`]
//!   intervals, each transmission doubles the interval, up to
//!   `adv_interval <<` [`MAX_BACKOFF_SHIFT`] (never above
//!   [`ADV_INT_MAX_MS`]). Stability is measured from the record's last
//!   activity, which the caller passes to [`BroadcastScheduler::mark_sent`].
//!   Arming restarts the doubling from the base interval.
//! - One item is picked per radio window. Pending value requests go first,
//!   then the earliest-due value; handles due at the same time are served
//!   round-robin.
//!
//! Per-handle lifecycle: `Idle -> Armed -> Sent -> Armed -> ...`. A handle
//! leaves `Idle` on its first arm and never returns to it.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::{MeshConfig, ADV_INT_MAX_MS, MAX_HANDLE_COUNT};
use crate::error::{MeshError, Result};

/// Stable intervals before backoff starts
pub const STABLE_PERIODS: u64 = 8;

/// Maximum doubling steps applied to the advertising interval
pub const MAX_BACKOFF_SHIFT: u32 = 5;

/// Transmission state of one handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// Never allocated, never transmitted
    Idle,
    /// Waiting to be transmitted at `due_us`
    Armed { due_us: u64, interval_ms: u32 },
    /// Transmitted at `sent_us`; becomes armed again at `next_due_us`
    Sent {
        sent_us: u64,
        next_due_us: u64,
        interval_ms: u32,
    },
}

/// Item chosen for the next radio window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxItem {
    /// Advertise the current value of a handle
    Value(u16),
    /// Ask the network for the value of a handle
    Request(u16),
}

#[derive(Debug, Clone, Copy)]
struct HandleSchedule {
    state: TxState,
    request_pending: bool,
}

impl HandleSchedule {
    const IDLE: HandleSchedule = HandleSchedule {
        state: TxState::Idle,
        request_pending: false,
    };
}

/// Per-handle rebroadcast timing
pub struct BroadcastScheduler {
    slots: [HandleSchedule; MAX_HANDLE_COUNT],
    handle_count: u16,
    adv_interval_ms: u32,
    last_sent: u16,
    rng: Option<SmallRng>,
}

impl BroadcastScheduler {
    /// Create an unconfigured scheduler (const fn for static initialization)
    pub const fn new() -> Self {
        Self {
            slots: [HandleSchedule::IDLE; MAX_HANDLE_COUNT],
            handle_count: 0,
            adv_interval_ms: 0,
            last_sent: 0,
            rng: None,
        }
    }

    /// Reset every handle to `Idle` and adopt the mesh timing
    ///
    /// `seed` feeds the jitter generator; nodes should use distinct seeds
    /// (e.g. derived from their address) so their jitter decorrelates.
    pub fn configure(&mut self, config: &MeshConfig, seed: u64) {
        self.slots = [HandleSchedule::IDLE; MAX_HANDLE_COUNT];
        self.handle_count = config.handle_count.min(MAX_HANDLE_COUNT as u16);
        self.adv_interval_ms = config.adv_interval_ms;
        self.last_sent = 0;
        self.rng = Some(SmallRng::seed_from_u64(seed));
    }

    /// Current state of a handle
    pub fn state(&self, handle: u16) -> Option<TxState> {
        self.slot(handle).map(|slot| slot.state)
    }

    /// Whether a one-shot request is waiting for a window
    pub fn request_pending(&self, handle: u16) -> bool {
        self.slot(handle).is_some_and(|slot| slot.request_pending)
    }

    /// Longest interval backoff may reach
    pub fn max_interval_ms(&self) -> u32 {
        self.adv_interval_ms
            .saturating_mul(1 << MAX_BACKOFF_SHIFT)
            .min(ADV_INT_MAX_MS)
    }

    /// Schedule a near-term transmission at the base interval
    ///
    /// Called on local writes, accepted remote updates, conflicts and
    /// incoming requests for a value this node holds.
    pub fn arm(&mut self, handle: u16, now_us: u64) {
        if !self.is_valid_handle(handle) {
            return;
        }
        let delay = self.jitter_us(self.adv_interval_ms as u64 * 1000 / 2);
        let interval_ms = self.adv_interval_ms;
        self.slots[handle as usize].state = TxState::Armed {
            due_us: now_us + delay,
            interval_ms,
        };
    }

    /// Queue a one-shot value request for `handle`
    ///
    /// The handle does not need to hold a value.
    pub fn request(&mut self, handle: u16) -> Result<()> {
        if !self.is_valid_handle(handle) {
            return Err(MeshError::InvalidAddr);
        }
        self.slots[handle as usize].request_pending = true;
        Ok(())
    }

    /// Pick what to transmit in a window opening at `now_us`
    ///
    /// Promotes handles whose post-transmission wait has elapsed back to
    /// `Armed`. Does not consume the item; call [`Self::mark_sent`] once the
    /// packet has actually been handed to the radio.
    pub fn next_ready(&mut self, now_us: u64) -> Option<TxItem> {
        self.promote_due(now_us);

        if let Some(handle) = self.pick_round_robin(|slot| slot.request_pending) {
            return Some(TxItem::Request(handle));
        }

        let mut best: Option<(u64, u16, u16)> = None;
        for handle in 1..self.handle_count {
            let TxState::Armed { due_us, .. } = self.slots[handle as usize].state else {
                continue;
            };
            if due_us > now_us {
                continue;
            }
            let key = (due_us, self.rr_distance(handle), handle);
            if best.is_none_or(|current| key < current) {
                best = Some(key);
            }
        }
        best.map(|(_, _, handle)| TxItem::Value(handle))
    }

    /// Record that `item` went out at `now_us`
    ///
    /// `last_activity_us` is the last change of the transmitted record;
    /// backoff applies once it lies [`STABLE_PERIODS`] intervals back.
    /// Ignored for requests.
    pub fn mark_sent(&mut self, item: TxItem, now_us: u64, last_activity_us: u64) {
        match item {
            TxItem::Request(handle) => {
                if self.is_valid_handle(handle) {
                    self.slots[handle as usize].request_pending = false;
                    self.last_sent = handle;
                }
            }
            TxItem::Value(handle) => {
                if !self.is_valid_handle(handle) {
                    return;
                }
                let previous_ms = match self.slots[handle as usize].state {
                    TxState::Armed { interval_ms, .. } | TxState::Sent { interval_ms, .. } => {
                        interval_ms
                    }
                    TxState::Idle => return,
                };

                let stable_for = now_us.saturating_sub(last_activity_us);
                let interval_ms = if stable_for >= STABLE_PERIODS * self.adv_interval_ms as u64 * 1000 {
                    previous_ms.saturating_mul(2).min(self.max_interval_ms())
                } else {
                    self.adv_interval_ms
                };
                let jitter = self.jitter_us(interval_ms as u64 * 1000 / 4);

                self.slots[handle as usize].state = TxState::Sent {
                    sent_us: now_us,
                    next_due_us: now_us + interval_ms as u64 * 1000 + jitter,
                    interval_ms,
                };
                self.last_sent = handle;
            }
        }
    }

    /// Earliest time any handle becomes due, if any
    pub fn next_due_us(&self) -> Option<u64> {
        self.slots
            .iter()
            .take(self.handle_count as usize)
            .skip(1)
            .filter_map(|slot| match slot.state {
                TxState::Armed { due_us, .. } => Some(due_us),
                TxState::Sent { next_due_us, .. } => Some(next_due_us),
                TxState::Idle => None,
            })
            .min()
    }

    fn promote_due(&mut self, now_us: u64) {
        for slot in self.slots.iter_mut().take(self.handle_count as usize) {
            if let TxState::Sent {
                next_due_us,
                interval_ms,
                ..
            } = slot.state
            {
                if next_due_us <= now_us {
                    slot.state = TxState::Armed {
                        due_us: next_due_us,
                        interval_ms,
                    };
                }
            }
        }
    }

    fn pick_round_robin(&self, pred: impl Fn(&HandleSchedule) -> bool) -> Option<u16> {
        (1..self.handle_count)
            .filter(|&handle| pred(&self.slots[handle as usize]))
            .min_by_key(|&handle| self.rr_distance(handle))
    }

    /// Distance of `handle` from the last transmitted one, wrapping
    fn rr_distance(&self, handle: u16) -> u16 {
        if handle > self.last_sent {
            handle - self.last_sent
        } else {
            handle + self.handle_count - self.last_sent
        }
    }

    fn jitter_us(&mut self, max_us: u64) -> u64 {
        match self.rng.as_mut() {
            Some(rng) if max_us > 0 => rng.gen_range(0..=max_us),
            _ => 0,
        }
    }

    fn slot(&self, handle: u16) -> Option<&HandleSchedule> {
        if self.is_valid_handle(handle) {
            Some(&self.slots[handle as usize])
        } else {
            None
        }
    }

    #[inline]
    fn is_valid_handle(&self, handle: u16) -> bool {
        handle != 0 && handle < self.handle_count
    }
}

impl Default for BroadcastScheduler {
    fn default() -> Self {
        Self::new()
    }
}

//! Conflict & Version Resolver
//!
//! Decides what an incoming advertisement does to the local record of its
//! handle and produces exactly the event the application should see.
//!
//! | Local record        | Incoming version         | Effect                     |
//! |---------------------|--------------------------|----------------------------|
//! | unallocated         | any                      | store, `NewVal`            |
//! | allocated           | newer                    | store, `UpdateVal`         |
//! | allocated           | equal, different data    | keep local, `ConflictingVal` |
//! | allocated           | equal, conflict known    | ignore                     |
//! | allocated           | older                    | ignore (stale)             |
//! | allocated           | equal, same data         | ignore (duplicate)         |
//!
//! Equal versions with different content mean two nodes wrote the handle
//! without seeing each other's update. Neither copy is picked as a winner;
//! the application reconciles by writing a new version. Each conflicting
//! copy is reported once; hearing it again while the local record is
//! unchanged is ignored, so two diverged nodes settle into normal backoff.

use crate::error::{MeshError, Result};
use crate::event::{EventKind, MeshEvent};
use crate::store::{
    ApplyOutcome, ConflictMark, NodeAddress, RecordState, ValueData, ValueStore, Version,
};

/// Returns true if version `a` is newer than `b`
///
/// Serial-number comparison: a counter that wrapped past `u16::MAX` is
/// still newer than one just below it. Versions exactly half the range
/// apart have no serial order; the larger raw value is taken as newer so
/// every node agrees on one of them.
#[inline]
pub fn is_newer(a: Version, b: Version) -> bool {
    match a.wrapping_sub(b) {
        0 => false,
        0x8000 => a > b,
        diff => (diff as i16) > 0,
    }
}

/// Advertised value as received from the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Incoming<'a> {
    pub handle: u16,
    pub data: &'a [u8],
    pub version: Version,
    pub origin: NodeAddress,
}

/// Verdict on an incoming advertisement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// First value ever seen for an unallocated handle
    AcceptNew,
    /// Strictly newer version supersedes the stored one
    AcceptUpdate,
    /// Same version, different data, not seen before
    Conflict,
    /// Same conflicting copy as one already reported
    KnownConflict,
    /// Older version than the stored one
    Stale,
    /// Exact copy of the stored version
    Duplicate,
}

impl Decision {
    /// Whether the advertisement was dropped without touching the store
    pub fn is_ignored(self) -> bool {
        matches!(
            self,
            Decision::Stale | Decision::Duplicate | Decision::KnownConflict
        )
    }
}

/// Decision plus the event to deliver, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub decision: Decision,
    pub event: Option<MeshEvent>,
}

/// Stateful resolver keeping diagnostic counters
#[derive(Debug, Default)]
pub struct ConflictResolver {
    conflicts: u32,
}

impl ConflictResolver {
    pub const fn new() -> Self {
        Self { conflicts: 0 }
    }

    /// Number of conflicting advertisements heard since startup, repeats
    /// of an already reported copy included
    pub fn conflict_count(&self) -> u32 {
        self.conflicts
    }

    /// Classify `incoming` against the current store contents without mutating anything
    pub fn decide(store: &ValueStore, incoming: &Incoming<'_>) -> Result<Decision> {
        let record = store.record(incoming.handle)?;

        let decision = match record.state() {
            RecordState::Unallocated => Decision::AcceptNew,
            RecordState::Allocated if is_newer(incoming.version, record.version()) => {
                Decision::AcceptUpdate
            }
            RecordState::Allocated if incoming.version == record.version() => {
                if incoming.data == record.data() {
                    Decision::Duplicate
                } else if record.has_reported(&conflict_mark(incoming)) {
                    Decision::KnownConflict
                } else {
                    Decision::Conflict
                }
            }
            RecordState::Allocated => Decision::Stale,
        };
        Ok(decision)
    }

    /// Apply `incoming` to the store according to [`Self::decide`]
    ///
    /// Fails with `InvalidAddr` for handles outside the store; nothing is
    /// mutated and no event is produced in that case.
    pub fn resolve(
        &mut self,
        store: &mut ValueStore,
        incoming: &Incoming<'_>,
        now_us: u64,
    ) -> Result<Resolution> {
        let decision = Self::decide(store, incoming)?;

        let event = match decision {
            Decision::AcceptNew | Decision::AcceptUpdate => {
                let outcome = store.apply_remote(
                    incoming.handle,
                    incoming.data,
                    incoming.version,
                    incoming.origin,
                    now_us,
                )?;
                let kind = match outcome {
                    ApplyOutcome::NewlyAllocated => EventKind::NewVal,
                    ApplyOutcome::Updated | ApplyOutcome::AlreadyCurrent => EventKind::UpdateVal,
                };
                Some(MeshEvent::new(
                    kind,
                    incoming.handle,
                    snapshot(incoming.data)?,
                    incoming.origin,
                ))
            }
            Decision::Conflict => {
                self.conflicts = self.conflicts.saturating_add(1);
                store.note_conflict(incoming.handle, conflict_mark(incoming), now_us)?;
                Some(MeshEvent::new(
                    EventKind::ConflictingVal,
                    incoming.handle,
                    snapshot(incoming.data)?,
                    incoming.origin,
                ))
            }
            Decision::KnownConflict => {
                self.conflicts = self.conflicts.saturating_add(1);
                None
            }
            Decision::Stale | Decision::Duplicate => None,
        };

        Ok(Resolution { decision, event })
    }
}

fn conflict_mark(incoming: &Incoming<'_>) -> ConflictMark {
    ConflictMark::new(incoming.version, incoming.origin, incoming.data)
}

fn snapshot(data: &[u8]) -> Result<ValueData> {
    ValueData::from_slice(data).map_err(|_| MeshError::InvalidLength)
}

//! Value Store
//!
//! Fixed-capacity table mapping a value handle to its record. The store is
//! the sole owner of value bytes; accessors hand out copies.
//!
//! Policy (which remote advertisement wins) lives in [`crate::resolver`].
//! The store only performs validated raw updates.

mod record;

pub use record::{
    ConflictMark, NodeAddress, RecordState, ValueData, ValueRecord, Version, MAX_TRACKED_CONFLICTS,
};

use crate::config::{MAX_HANDLE_COUNT, MAX_VALUE_LEN};
use crate::error::{MeshError, Result};

/// Result of a raw remote update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The record was unallocated and now holds the advertised value
    NewlyAllocated,
    /// An allocated record was overwritten
    Updated,
    /// The record already held this exact version and data
    AlreadyCurrent,
}

/// Handle-addressed table of replicated values
pub struct ValueStore {
    records: [ValueRecord; MAX_HANDLE_COUNT],
    handle_count: u16,
}

impl ValueStore {
    /// Create an empty store with no usable handles (const fn for static initialization)
    pub const fn new() -> Self {
        Self {
            records: [ValueRecord::EMPTY; MAX_HANDLE_COUNT],
            handle_count: 0,
        }
    }

    /// Size the handle space and reset every record to unallocated
    ///
    /// `handle_count` is clamped to the table capacity; callers validate it
    /// beforehand through [`crate::config::MeshConfig::validate`].
    pub fn configure(&mut self, handle_count: u16) {
        self.handle_count = handle_count.min(MAX_HANDLE_COUNT as u16);
        for (index, record) in self.records.iter_mut().enumerate() {
            *record = ValueRecord::EMPTY;
            record.handle = index as u16;
        }
    }

    /// Number of handle slots, including the reserved handle 0
    pub fn handle_count(&self) -> u16 {
        self.handle_count
    }

    #[inline]
    pub fn is_valid_handle(&self, handle: u16) -> bool {
        handle != 0 && handle < self.handle_count
    }

    /// Borrow a record for inspection inside the owning context
    pub fn record(&self, handle: u16) -> Result<&ValueRecord> {
        if !self.is_valid_handle(handle) {
            return Err(MeshError::InvalidAddr);
        }
        Ok(&self.records[handle as usize])
    }

    /// Copy out the current bytes of a handle
    ///
    /// Unallocated records yield an empty buffer.
    pub fn get(&self, handle: u16) -> Result<ValueData> {
        self.record(handle).map(|record| record.data.clone())
    }

    /// Write a value produced by this node
    ///
    /// Bumps the version, stamps `origin` and `now_us`, and allocates the
    /// record. Returns the new version. Fails without side effects.
    pub fn set(&mut self, handle: u16, data: &[u8], origin: NodeAddress, now_us: u64) -> Result<Version> {
        if !self.is_valid_handle(handle) {
            return Err(MeshError::InvalidAddr);
        }
        let data = copy_value(data)?;

        let record = &mut self.records[handle as usize];
        record.data = data;
        record.version = record.version.wrapping_add(1);
        record.origin = origin;
        record.last_activity_us = now_us;
        record.state = RecordState::Allocated;
        record.conflicts.clear();
        Ok(record.version)
    }

    /// Overwrite a record with a remote version
    ///
    /// Used by the resolver after it decided the advertisement wins.
    pub fn apply_remote(
        &mut self,
        handle: u16,
        data: &[u8],
        version: Version,
        origin: NodeAddress,
        now_us: u64,
    ) -> Result<ApplyOutcome> {
        if !self.is_valid_handle(handle) {
            return Err(MeshError::InvalidAddr);
        }
        let data = copy_value(data)?;

        let record = &mut self.records[handle as usize];
        let outcome = match record.state {
            RecordState::Unallocated => ApplyOutcome::NewlyAllocated,
            RecordState::Allocated if record.version == version && record.data == data => {
                return Ok(ApplyOutcome::AlreadyCurrent);
            }
            RecordState::Allocated => ApplyOutcome::Updated,
        };

        record.data = data;
        record.version = version;
        record.origin = origin;
        record.last_activity_us = now_us;
        record.state = RecordState::Allocated;
        record.conflicts.clear();
        Ok(outcome)
    }

    /// Remember a conflicting copy of an allocated record
    ///
    /// Returns `false` if `mark` was already known. A new mark counts as
    /// activity on the record; when the list is full the oldest mark is
    /// forgotten. Marks are cleared whenever the record changes.
    pub fn note_conflict(&mut self, handle: u16, mark: ConflictMark, now_us: u64) -> Result<bool> {
        if !self.is_valid_handle(handle) {
            return Err(MeshError::InvalidAddr);
        }
        let record = &mut self.records[handle as usize];
        if record.has_reported(&mark) {
            return Ok(false);
        }
        if record.conflicts.is_full() {
            record.conflicts.remove(0);
        }
        let _ = record.conflicts.push(mark);
        record.last_activity_us = now_us;
        Ok(true)
    }

    /// Iterate over the usable records (handles `1..handle_count`)
    pub fn iter(&self) -> impl Iterator<Item = &ValueRecord> {
        self.records
            .iter()
            .take(self.handle_count as usize)
            .skip(1)
    }
}

impl Default for ValueStore {
    fn default() -> Self {
        Self::new()
    }
}

fn copy_value(data: &[u8]) -> Result<ValueData> {
    if data.len() > MAX_VALUE_LEN {
        return Err(MeshError::InvalidLength);
    }
    ValueData::from_slice(data).map_err(|_| MeshError::InvalidLength)
}

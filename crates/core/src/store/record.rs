//! Value record types

use heapless::Vec;

use crate::config::MAX_VALUE_LEN;

/// Byte buffer holding one value payload
pub type ValueData = Vec<u8, MAX_VALUE_LEN>;

/// Per-handle version counter (wraps, see [`crate::resolver::is_newer`])
pub type Version = u16;

/// Distinct conflicting copies remembered per record
pub const MAX_TRACKED_CONFLICTS: usize = 3;

/// Six-byte device address identifying the node that produced a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeAddress(pub [u8; 6]);

impl NodeAddress {
    /// Placeholder origin of records that were never written
    pub const UNSET: NodeAddress = NodeAddress([0; 6]);

    /// Raw address bytes, least significant first
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl core::fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[5], b[4], b[3], b[2], b[1], b[0]
        )
    }
}

/// Identity of a conflicting copy that was already reported
///
/// Relays forward the producer's origin unchanged, so the same copy heard
/// through different neighbours yields the same mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictMark {
    pub version: Version,
    pub origin: NodeAddress,
    pub digest: u32,
}

impl ConflictMark {
    pub fn new(version: Version, origin: NodeAddress, data: &[u8]) -> Self {
        Self {
            version,
            origin,
            digest: fnv1a(data),
        }
    }
}

/// 32-bit FNV-1a
fn fnv1a(data: &[u8]) -> u32 {
    data.iter().fold(0x811C_9DC5_u32, |hash, &byte| {
        (hash ^ byte as u32).wrapping_mul(0x0100_0193)
    })
}

/// Allocation state of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// No valid data or version yet
    Unallocated,
    /// Holds data written locally or accepted from the network
    Allocated,
}

/// One slot of the value table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueRecord {
    pub(crate) handle: u16,
    pub(crate) data: ValueData,
    pub(crate) version: Version,
    pub(crate) state: RecordState,
    pub(crate) origin: NodeAddress,
    pub(crate) last_activity_us: u64,
    /// Conflicts against the current version already reported, oldest first
    pub(crate) conflicts: Vec<ConflictMark, MAX_TRACKED_CONFLICTS>,
}

impl ValueRecord {
    /// Unallocated record, used to fill the table at startup
    pub const EMPTY: ValueRecord = ValueRecord {
        handle: 0,
        data: Vec::new(),
        version: 0,
        state: RecordState::Unallocated,
        origin: NodeAddress::UNSET,
        last_activity_us: 0,
        conflicts: Vec::new(),
    };

    pub fn handle(&self) -> u16 {
        self.handle
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    pub fn origin(&self) -> NodeAddress {
        self.origin
    }

    /// Timestamp (µs) of the last local write, accepted remote update or
    /// newly reported conflict; rebroadcast backoff is measured from it
    pub fn last_activity_us(&self) -> u64 {
        self.last_activity_us
    }

    /// Whether this conflicting copy was already reported
    pub fn has_reported(&self, mark: &ConflictMark) -> bool {
        self.conflicts.contains(mark)
    }

    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.state == RecordState::Allocated
    }
}

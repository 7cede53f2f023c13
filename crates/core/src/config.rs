//! Mesh configuration
//!
//! A single [`MeshConfig`] is validated once at initialization and then
//! owned by the radio session. Other components borrow it.

use crate::error::{MeshError, Result};

/// Access address shared with regular BLE advertising traffic
pub const ACCESS_ADDRESS_BLE_ADV: u32 = 0x8E89_BED6;

/// Minimum advertising interval in milliseconds
pub const ADV_INT_MIN_MS: u32 = 5;

/// Maximum advertising interval in milliseconds
pub const ADV_INT_MAX_MS: u32 = 60_000;

/// Lowest usable radio channel
pub const CHANNEL_MIN: u8 = 1;

/// Highest usable radio channel
pub const CHANNEL_MAX: u8 = 39;

/// Maximum number of handle slots a mesh may be configured with
pub const MAX_HANDLE_COUNT: usize = 155;

/// Maximum payload carried by one value
pub const MAX_VALUE_LEN: usize = 28;

/// Network-wide mesh parameters
///
/// All nodes of one mesh must agree on every field. Valid value handles are
/// `1..handle_count`; handle 0 is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshConfig {
    /// Radio access address the mesh listens and transmits on
    pub access_address: u32,
    /// Radio channel (1-39, advertising channels 37-39 recommended)
    pub channel: u8,
    /// Number of handle slots, including the reserved handle 0
    pub handle_count: u16,
    /// Minimum advertising interval in milliseconds
    pub adv_interval_ms: u32,
}

impl MeshConfig {
    /// Create a configuration without validating it
    pub const fn new(access_address: u32, channel: u8, handle_count: u16, adv_interval_ms: u32) -> Self {
        Self {
            access_address,
            channel,
            handle_count,
            adv_interval_ms,
        }
    }

    /// Check every field against its allowed range
    pub fn validate(&self) -> Result<()> {
        if !(CHANNEL_MIN..=CHANNEL_MAX).contains(&self.channel) {
            return Err(MeshError::InvalidParam);
        }
        if self.handle_count as usize > MAX_HANDLE_COUNT {
            return Err(MeshError::InvalidParam);
        }
        if !(ADV_INT_MIN_MS..=ADV_INT_MAX_MS).contains(&self.adv_interval_ms) {
            return Err(MeshError::InvalidParam);
        }
        Ok(())
    }

    /// Whether `handle` addresses a value slot under this configuration
    #[inline]
    pub fn is_valid_handle(&self, handle: u16) -> bool {
        handle != 0 && handle < self.handle_count
    }

    /// Advertising interval in microseconds
    #[inline]
    pub const fn adv_interval_us(&self) -> u64 {
        self.adv_interval_ms as u64 * 1000
    }
}

//! Build-time network parameters
//!
//! Firmware images bake in their mesh network through environment
//! variables read by `build.rs`:
//!
//! - `RBC_MESH_ACCESS_ADDR` - access address, decimal or `0x` hex
//!   (default `0x8E89BED6`)
//! - `RBC_MESH_CHANNEL` - radio channel (default 38)
//! - `RBC_MESH_HANDLE_COUNT` - number of handles incl. reserved 0 (default 32)
//! - `RBC_MESH_ADV_INT_MS` - advertising interval (default 100)
//!
//! Values are parsed at compile time. A malformed value does not break the
//! build; [`MeshParams::config`] reports it as `InvalidParam`.

use rbc_mesh_core::{MeshConfig, MeshError, Result};

const BUILD_ACCESS_ADDR: Option<u32> = const_parse_u32(env!("RBC_MESH_ACCESS_ADDR"));
const BUILD_CHANNEL: Option<u32> = const_parse_u32(env!("RBC_MESH_CHANNEL"));
const BUILD_HANDLE_COUNT: Option<u32> = const_parse_u32(env!("RBC_MESH_HANDLE_COUNT"));
const BUILD_ADV_INT_MS: Option<u32> = const_parse_u32(env!("RBC_MESH_ADV_INT_MS"));

/// Raw build-time parameters before range checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MeshParams {
    pub access_address: Option<u32>,
    pub channel: Option<u32>,
    pub handle_count: Option<u32>,
    pub adv_interval_ms: Option<u32>,
}

impl MeshParams {
    /// Parameters compiled into this image
    pub const fn from_build_env() -> Self {
        Self {
            access_address: BUILD_ACCESS_ADDR,
            channel: BUILD_CHANNEL,
            handle_count: BUILD_HANDLE_COUNT,
            adv_interval_ms: BUILD_ADV_INT_MS,
        }
    }

    /// Parse from strings, as `build.rs` would pass them
    pub const fn parse(access_address: &str, channel: &str, handle_count: &str, adv_interval_ms: &str) -> Self {
        Self {
            access_address: const_parse_u32(access_address),
            channel: const_parse_u32(channel),
            handle_count: const_parse_u32(handle_count),
            adv_interval_ms: const_parse_u32(adv_interval_ms),
        }
    }

    /// Validated mesh configuration
    ///
    /// Fails with `InvalidParam` if any value failed to parse, does not fit
    /// its field, or is out of range for the mesh.
    pub fn config(&self) -> Result<MeshConfig> {
        let (Some(access_address), Some(channel), Some(handle_count), Some(adv_interval_ms)) = (
            self.access_address,
            self.channel,
            self.handle_count,
            self.adv_interval_ms,
        ) else {
            return Err(MeshError::InvalidParam);
        };

        let channel = u8::try_from(channel).map_err(|_| MeshError::InvalidParam)?;
        let handle_count = u16::try_from(handle_count).map_err(|_| MeshError::InvalidParam)?;

        let config = MeshConfig::new(access_address, channel, handle_count, adv_interval_ms);
        config.validate()?;
        Ok(config)
    }
}

/// Parse a decimal or `0x`-prefixed hex `u32` at compile time
///
/// Accepts `_` separators. Returns `None` on empty input, stray
/// characters or overflow.
pub const fn const_parse_u32(s: &str) -> Option<u32> {
    let bytes = s.as_bytes();
    let (radix, mut i) = if bytes.len() > 2 && bytes[0] == b'0' && (bytes[1] == b'x' || bytes[1] == b'X') {
        (16u64, 2)
    } else {
        (10u64, 0)
    };

    let mut value: u64 = 0;
    let mut digits = 0;
    while i < bytes.len() {
        let b = bytes[i];
        i += 1;
        let digit = match b {
            b'_' => continue,
            b'0'..=b'9' => (b - b'0') as u64,
            b'a'..=b'f' if radix == 16 => (b - b'a' + 10) as u64,
            b'A'..=b'F' if radix == 16 => (b - b'A' + 10) as u64,
            _ => return None,
        };
        value = value * radix + digit;
        if value > u32::MAX as u64 {
            return None;
        }
        digits += 1;
    }

    if digits == 0 {
        None
    } else {
        Some(value as u32)
    }
}

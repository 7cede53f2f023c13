//! Advertisement packet codec
//!
//! Layout (multi-byte fields little endian):
//!
//! ```text
//! offset size field
//! 0      4    access address
//! 4      1    kind (0x01 value, 0x02 request)
//! 5      1    length of the remainder (origin .. payload)
//! 6      6    origin address
//! 12     2    handle
//! 14     2    version
//! 16     n    payload, n <= MAX_VALUE_LEN (requests carry none)
//! ```
//!
//! The channel is implicit in the radio configuration. Packets whose access
//! address differs from the configured one are never accepted.

use heapless::Vec;

use crate::config::MAX_VALUE_LEN;
use crate::store::{NodeAddress, Version};

/// Bytes preceding the payload
pub const HEADER_LEN: usize = 16;

/// Largest encoded packet
pub const MAX_PACKET_LEN: usize = HEADER_LEN + MAX_VALUE_LEN;

/// Length field covers everything after this offset
const LENGTH_BASE: usize = 6;

/// Encoded packet storage
pub type PacketBuf = Vec<u8, MAX_PACKET_LEN>;

/// Packet type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketKind {
    /// Carries a handle's current value
    Value = 0x01,
    /// Asks other nodes to advertise a handle
    Request = 0x02,
}

impl PacketKind {
    fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0x01 => Some(PacketKind::Value),
            0x02 => Some(PacketKind::Request),
            _ => None,
        }
    }
}

/// Reasons a received frame is discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    /// Shorter than the fixed header
    TooShort,
    /// Sent on a different mesh
    AccessAddressMismatch,
    /// Unknown kind byte
    UnknownKind(u8),
    /// Length byte disagrees with the frame size
    LengthMismatch,
    /// Payload longer than `MAX_VALUE_LEN`
    PayloadTooLong,
    /// Handle 0 is reserved
    ReservedHandle,
    /// Request frame carrying a payload
    UnexpectedPayload,
}

/// Decoded advertisement, borrowing its payload from the receive buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advertisement<'a> {
    pub kind: PacketKind,
    pub origin: NodeAddress,
    pub handle: u16,
    pub version: Version,
    pub payload: &'a [u8],
}

impl<'a> Advertisement<'a> {
    /// Value advertisement
    pub fn value(handle: u16, version: Version, origin: NodeAddress, payload: &'a [u8]) -> Self {
        Self {
            kind: PacketKind::Value,
            origin,
            handle,
            version,
            payload,
        }
    }

    /// Request for the value of `handle`
    pub fn request(handle: u16, origin: NodeAddress) -> Self {
        Self {
            kind: PacketKind::Request,
            origin,
            handle,
            version: 0,
            payload: &[],
        }
    }

    /// Serialize for transmission under `access_address`
    pub fn encode(&self, access_address: u32) -> Result<PacketBuf, PacketError> {
        if self.payload.len() > MAX_VALUE_LEN {
            return Err(PacketError::PayloadTooLong);
        }
        if self.kind == PacketKind::Request && !self.payload.is_empty() {
            return Err(PacketError::UnexpectedPayload);
        }

        let mut buf = PacketBuf::new();
        let remainder = (HEADER_LEN - LENGTH_BASE + self.payload.len()) as u8;
        // Capacity covers header plus MAX_VALUE_LEN, checked above
        let _ = buf.extend_from_slice(&access_address.to_le_bytes());
        let _ = buf.push(self.kind as u8);
        let _ = buf.push(remainder);
        let _ = buf.extend_from_slice(self.origin.as_bytes());
        let _ = buf.extend_from_slice(&self.handle.to_le_bytes());
        let _ = buf.extend_from_slice(&self.version.to_le_bytes());
        let _ = buf.extend_from_slice(self.payload);
        Ok(buf)
    }

    /// Parse a received frame, rejecting anything not addressed to this mesh
    pub fn decode(frame: &'a [u8], access_address: u32) -> Result<Self, PacketError> {
        if frame.len() < HEADER_LEN {
            return Err(PacketError::TooShort);
        }

        let aa = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]);
        if aa != access_address {
            return Err(PacketError::AccessAddressMismatch);
        }

        let kind = PacketKind::from_u8(frame[4]).ok_or(PacketError::UnknownKind(frame[4]))?;

        if frame[5] as usize != frame.len() - LENGTH_BASE {
            return Err(PacketError::LengthMismatch);
        }

        let payload = &frame[HEADER_LEN..];
        if payload.len() > MAX_VALUE_LEN {
            return Err(PacketError::PayloadTooLong);
        }
        if kind == PacketKind::Request && !payload.is_empty() {
            return Err(PacketError::UnexpectedPayload);
        }

        let mut origin = [0u8; 6];
        origin.copy_from_slice(&frame[6..12]);
        let handle = u16::from_le_bytes([frame[12], frame[13]]);
        if handle == 0 {
            return Err(PacketError::ReservedHandle);
        }
        let version = u16::from_le_bytes([frame[14], frame[15]]);

        Ok(Self {
            kind,
            origin: NodeAddress(origin),
            handle,
            version,
            payload,
        })
    }
}

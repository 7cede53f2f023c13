//! Mock host wireless stack

use crate::mesh::GattLayout;
use crate::platform::{traits::HostStack, HostStackError, Result};
use core::cell::Cell;
use rbc_mesh_core::config::MAX_HANDLE_COUNT;
use rbc_mesh_core::NodeAddress;

/// Attribute handle of the first value characteristic in the mock table
pub const MOCK_FIRST_VALUE_ATTR: u16 = 0x0010;

/// Attributes per value characteristic (declaration + value)
pub const MOCK_ATTR_STRIDE: u16 = 2;

/// Host stack with a fixed address and a flat attribute table
#[derive(Debug)]
pub struct MockHostStack {
    enabled: Cell<bool>,
    address: NodeAddress,
    registrations: Cell<u32>,
    capacity: Cell<u16>,
}

impl MockHostStack {
    pub fn new(address: NodeAddress) -> Self {
        Self {
            enabled: Cell::new(true),
            address,
            registrations: Cell::new(0),
            capacity: Cell::new(MAX_HANDLE_COUNT as u16),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    /// Largest handle count the attribute table can hold
    pub fn set_capacity(&self, handle_count: u16) {
        self.capacity.set(handle_count);
    }

    /// Number of successful service registrations
    pub fn registrations(&self) -> u32 {
        self.registrations.get()
    }
}

impl Default for MockHostStack {
    fn default() -> Self {
        Self::new(NodeAddress([0xC0, 0xFF, 0xEE, 0x00, 0x00, 0x01]))
    }
}

impl HostStack for MockHostStack {
    fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    fn device_address(&self) -> NodeAddress {
        self.address
    }

    fn register_service(&self, handle_count: u16) -> Result<GattLayout> {
        if !self.enabled.get() {
            return Err(HostStackError::NotEnabled.into());
        }
        if handle_count > self.capacity.get() {
            return Err(HostStackError::NoResources.into());
        }
        self.registrations.set(self.registrations.get() + 1);
        Ok(GattLayout {
            first_value_attr: MOCK_FIRST_VALUE_ATTR,
            attr_stride: MOCK_ATTR_STRIDE,
            handle_count,
        })
    }
}

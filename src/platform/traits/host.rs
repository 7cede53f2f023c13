//! Host wireless stack interface

use rbc_mesh_core::NodeAddress;

use crate::mesh::GattLayout;
use crate::platform::Result;

/// The host stack owning the device address and attribute table
pub trait HostStack {
    /// Whether the application enabled the stack
    fn is_enabled(&self) -> bool;

    /// Device address used as origin of local writes
    fn device_address(&self) -> NodeAddress;

    /// Register the mesh service with one value attribute per handle
    ///
    /// Returns where the value attributes landed in the attribute table.
    fn register_service(&self, handle_count: u16) -> Result<GattLayout>;
}

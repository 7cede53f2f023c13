//! Time-slot arbiter interface

use rbc_mesh_core::session::ArbiterSignal;

use crate::platform::Result;

/// Grants exclusive radio windows shared with the host wireless stack
///
/// The arbiter raises an interrupt whenever it has signals pending; the
/// mesh drains them from [`crate::mesh::RbcMesh::sd_irq_handler`].
pub trait TimeslotArbiter {
    /// Ask for a window of `length_us`
    ///
    /// An error means the request was refused outright; the grant or denial
    /// of an accepted request arrives later as a signal.
    fn request_window(&self, length_us: u32) -> Result<()>;

    /// Next pending signal, `None` when drained
    fn poll_signal(&self) -> Option<ArbiterSignal>;
}

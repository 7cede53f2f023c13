//! Radio peripheral interface

use bitflags::bitflags;

use crate::platform::Result;

bitflags! {
    /// Pending radio interrupt causes
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RadioStatus: u8 {
        /// Last transmission completed
        const TX_DONE = 0b0000_0001;
        /// At least one received frame is waiting
        const RX_READY = 0b0000_0010;
        /// A frame was discarded by the CRC check
        const CRC_ERROR = 0b0000_0100;
    }
}

/// Radio settings applied when a window opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioConfig {
    pub access_address: u32,
    pub channel: u8,
}

/// Radio driven by the mesh inside arbiter-granted windows
///
/// All methods are called from the arbiter interrupt, never while the mesh
/// state lock is held. Implementations reach the hardware through
/// interior mutability.
pub trait RadioInterface {
    /// Apply access address and channel
    fn configure(&self, config: RadioConfig) -> Result<()>;

    /// Send one frame
    fn transmit(&self, frame: &[u8]) -> Result<()>;

    /// Enter receive mode until disabled
    fn start_rx(&self) -> Result<()>;

    /// Copy the oldest received frame into `buf`
    ///
    /// Returns the frame length, or `None` when nothing is pending.
    fn read_frame(&self, buf: &mut [u8]) -> Option<usize>;

    /// Read and clear pending interrupt causes
    fn take_status(&self) -> RadioStatus;

    /// Power the radio down at the end of a window
    fn disable(&self);
}

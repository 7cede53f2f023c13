//! Platform error types
//!
//! None of these reach the application: the facade logs them and treats
//! the affected window as lost.

use core::fmt;

/// Result type for platform operations
pub type Result<T> = core::result::Result<T, PlatformError>;

/// Platform-level errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlatformError {
    Radio(RadioError),
    Arbiter(ArbiterError),
    HostStack(HostStackError),
}

/// Radio peripheral errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioError {
    /// Radio used outside a granted window
    NotOwned,
    /// Channel index not supported by the hardware
    InvalidChannel,
    /// Frame larger than the radio buffer
    FrameTooLong,
}

/// Time-slot arbiter errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArbiterError {
    /// A request is already outstanding
    Busy,
    /// Requested window length rejected
    InvalidLength,
    /// Arbiter session not opened by the host stack
    NotEnabled,
}

/// Host wireless stack errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostStackError {
    /// Stack not enabled by the application
    NotEnabled,
    /// Attribute table is full
    NoResources,
}

impl From<RadioError> for PlatformError {
    fn from(err: RadioError) -> Self {
        PlatformError::Radio(err)
    }
}

impl From<ArbiterError> for PlatformError {
    fn from(err: ArbiterError) -> Self {
        PlatformError::Arbiter(err)
    }
}

impl From<HostStackError> for PlatformError {
    fn from(err: HostStackError) -> Self {
        PlatformError::HostStack(err)
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::Radio(e) => write!(f, "Radio error: {:?}", e),
            PlatformError::Arbiter(e) => write!(f, "Arbiter error: {:?}", e),
            PlatformError::HostStack(e) => write!(f, "Host stack error: {:?}", e),
        }
    }
}

//! Platform abstraction layer
//!
//! The mesh needs three external services: a radio it may only use inside
//! granted windows, the time-slot arbiter that grants those windows, and
//! the host wireless stack that owns the device address and the GATT
//! table. Target ports implement the traits in [`traits`]; host tests use
//! [`mock`].

pub mod error;
pub mod traits;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{ArbiterError, HostStackError, PlatformError, RadioError, Result};
pub use traits::{HostStack, MeshPlatform, RadioInterface, RadioStatus, TimeslotArbiter};

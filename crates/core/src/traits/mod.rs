//! Platform seams of the mesh engine
//!
//! Only time is abstracted here; radio, arbiter and host stack seams live
//! in the firmware-facing crate because they carry I/O.

pub mod time;

pub use time::{MockTime, TimeSource};

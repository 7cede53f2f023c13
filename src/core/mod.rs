//! Firmware infrastructure shared by the mesh facade
//!
//! Logging macros and the synchronization/time abstractions used to share
//! [`MeshCore`](rbc_mesh_core::MeshCore) between interrupt and background
//! contexts.

pub mod logging;
pub mod traits;

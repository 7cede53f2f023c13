#![cfg_attr(not(test), no_std)]

//! rbc_mesh - Broadcast value mesh for radio nodes
//!
//! Nodes keep a table of small versioned values indexed by handle and keep
//! rebroadcasting them in radio windows granted by an external time-slot
//! arbiter, so every node converges on the newest version of each value.
//!
//! The policy (store, resolver, scheduler, codec, session machine) lives in
//! the host-testable `rbc_mesh_core` crate. This crate adds the firmware
//! side: logging, interrupt-safe state sharing, platform seams and the
//! [`RbcMesh`](mesh::RbcMesh) facade.

#[cfg(all(feature = "mock", not(test)))]
extern crate std;

// Logging macros and synchronization primitives
pub mod core;

// Radio, arbiter and host stack seams
pub mod platform;

// Build-time network parameters
pub mod parameters;

// Public mesh interface and external event adapters
pub mod mesh;

pub use mesh::{GattLayout, HostEvent, MeshShared, RbcMesh};
pub use rbc_mesh_core::{
    EventHandler, EventKind, MeshConfig, MeshError, MeshEvent, MeshStats, NodeAddress, Result,
    ValueData, Version,
};

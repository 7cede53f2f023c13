//! rbc_mesh_core - Pure no_std engine of the broadcast value mesh
//!
//! Every node holds a table of small versioned values indexed by handle
//! and keeps rebroadcasting them so the whole network converges on the
//! newest version of each. This crate holds the parts of that engine that
//! do no I/O and can be tested on host without any feature flags.
//!
//! # Design Principles
//!
//! - **Zero cfg**: No `#[cfg(feature = ...)]` directives
//! - **Pure no_std**: Fixed-capacity storage, no allocator
//! - **No I/O**: Operations return the bytes or radio step the caller
//!   executes outside its critical section
//!
//! # Modules
//!
//! - [`config`]: Mesh configuration and limits
//! - [`error`]: Error codes returned by the public operations
//! - [`store`]: Handle-indexed value records
//! - [`event`]: Application events and the bounded event queue
//! - [`resolver`]: Version comparison and conflict detection
//! - [`scheduler`]: Per-handle rebroadcast timing
//! - [`packet`]: Advertisement wire format
//! - [`session`]: Radio window state machine
//! - [`mesh`]: [`MeshCore`](mesh::MeshCore), the state shared between contexts
//! - [`traits`]: Time abstraction

#![no_std]

pub mod config;
pub mod error;
pub mod event;
pub mod mesh;
pub mod packet;
pub mod resolver;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod traits;

pub use config::MeshConfig;
pub use error::{MeshError, Result};
pub use event::{EventHandler, EventKind, MeshEvent};
pub use mesh::{MeshCore, MeshStats, RadioAction, RxOutcome};
pub use store::{NodeAddress, ValueData, Version};

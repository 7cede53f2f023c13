//! Synchronization and time abstractions
//!
//! ```text
//!   interrupt context            background context
//!   (sd_irq_handler)             (value_set / poll_events)
//!          |                              |
//!          +---- with_mut(|shared| ..) ---+
//!                        |
//!               SharedState<MeshShared>
//!               /                    \
//!      EmbassyState<T>             MockState<T>
//!      (critical section,          (RefCell, host tests)
//!       feature = "embassy")
//! ```
//!
//! Each access holds the lock for one bounded engine call; radio I/O always
//! happens after the closure returns.

pub mod sync;
pub mod time;

pub use sync::{MockState, SharedState};
pub use time::{MockTime, TimeSource};

#[cfg(feature = "embassy")]
pub use sync::EmbassyState;

#[cfg(feature = "embassy")]
pub use time::EmbassyTime;

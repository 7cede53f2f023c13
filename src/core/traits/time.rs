//! Time sources
//!
//! The trait and its mock come from the engine crate; the target clock is
//! backed by the embassy time driver.

pub use rbc_mesh_core::traits::{MockTime, TimeSource};

/// Monotonic clock from the embassy time driver
#[cfg(feature = "embassy")]
#[derive(Clone, Copy, Default)]
pub struct EmbassyTime;

#[cfg(feature = "embassy")]
impl TimeSource for EmbassyTime {
    fn now_us(&self) -> u64 {
        embassy_time::Instant::now().as_micros()
    }

    fn now_ms(&self) -> u64 {
        embassy_time::Instant::now().as_millis()
    }
}

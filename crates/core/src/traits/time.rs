//! Monotonic time for record stamping and broadcast scheduling

use core::cell::Cell;

/// Monotonic microsecond clock
///
/// The mesh stamps records with `now_us` and schedules rebroadcasts in
/// microseconds. Firmware backs this with `embassy-time`; tests drive
/// [`MockTime`] by hand.
///
/// ```
/// use rbc_mesh_core::traits::{MockTime, TimeSource};
///
/// let clock = MockTime::new();
/// let armed_at = clock.now_us();
/// clock.advance(250_000);
/// assert!(clock.has_elapsed(armed_at, 100_000));
/// ```
pub trait TimeSource: Clone + Send + Sync {
    /// Microseconds since boot
    fn now_us(&self) -> u64;

    /// Milliseconds since boot
    fn now_ms(&self) -> u64 {
        self.now_us() / 1000
    }

    /// Microseconds since `reference_us`, zero if the reference is ahead
    fn elapsed_since(&self, reference_us: u64) -> u64 {
        self.now_us().saturating_sub(reference_us)
    }

    /// Whether at least `period_us` passed since `reference_us`
    fn has_elapsed(&self, reference_us: u64, period_us: u64) -> bool {
        self.elapsed_since(reference_us) >= period_us
    }
}

/// Hand-driven clock for host tests
#[derive(Clone, Default)]
pub struct MockTime {
    current_us: Cell<u64>,
}

// Safety: only used from single-threaded tests
unsafe impl Send for MockTime {}
unsafe impl Sync for MockTime {}

impl MockTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial(us: u64) -> Self {
        Self {
            current_us: Cell::new(us),
        }
    }

    pub fn set(&self, us: u64) {
        self.current_us.set(us);
    }

    pub fn advance(&self, us: u64) {
        self.current_us.set(self.current_us.get() + us);
    }

    /// Advance by whole advertising intervals
    pub fn advance_intervals(&self, adv_interval_ms: u32, count: u32) {
        self.advance(adv_interval_ms as u64 * 1000 * count as u64);
    }
}

impl TimeSource for MockTime {
    fn now_us(&self) -> u64 {
        self.current_us.get()
    }
}

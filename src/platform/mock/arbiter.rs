//! Mock time-slot arbiter

use crate::platform::{traits::TimeslotArbiter, ArbiterError, Result};
use core::cell::{Cell, RefCell};
use rbc_mesh_core::session::ArbiterSignal;
use std::collections::VecDeque;
use std::vec::Vec;

/// Scripted arbiter
///
/// Tests queue the signals the interrupt handler will drain and inspect
/// the window requests it made.
#[derive(Debug, Default)]
pub struct MockArbiter {
    signals: RefCell<VecDeque<ArbiterSignal>>,
    requests: RefCell<Vec<u32>>,
    refuse: Cell<bool>,
    disabled: Cell<bool>,
}

/// Longest window the mock grants
pub const MOCK_MAX_WINDOW_US: u32 = 100_000;

impl MockArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a signal for the next interrupt
    pub fn push_signal(&self, signal: ArbiterSignal) {
        self.signals.borrow_mut().push_back(signal);
    }

    /// Make `request_window` fail synchronously
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.set(refuse);
    }

    /// Simulate the host stack closing the arbiter session
    pub fn set_enabled(&self, enabled: bool) {
        self.disabled.set(!enabled);
    }

    /// Window lengths requested so far
    pub fn requests(&self) -> Vec<u32> {
        self.requests.borrow().clone()
    }

    pub fn pending_signals(&self) -> usize {
        self.signals.borrow().len()
    }
}

impl TimeslotArbiter for MockArbiter {
    fn request_window(&self, length_us: u32) -> Result<()> {
        if self.disabled.get() {
            return Err(ArbiterError::NotEnabled.into());
        }
        if length_us == 0 || length_us > MOCK_MAX_WINDOW_US {
            return Err(ArbiterError::InvalidLength.into());
        }
        if self.refuse.get() {
            return Err(ArbiterError::Busy.into());
        }
        self.requests.borrow_mut().push(length_us);
        Ok(())
    }

    fn poll_signal(&self) -> Option<ArbiterSignal> {
        self.signals.borrow_mut().pop_front()
    }
}

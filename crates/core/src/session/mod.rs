//! Radio Session State Machine
//!
//! Tracks ownership of the radio. The radio is a shared resource granted in
//! bounded windows by an external time-slot arbiter; the mesh only touches
//! it between a grant and the end of that window.
//!
//! ```text
//! Uninitialized --configure--> Idle --Tick--> SessionRequested
//!                               ^                 |        |
//!                               |            Denied/Ended  Started
//!                               |                 v        v
//!                               +-------------- Idle   InSession
//!                               +---------Ended/Denied------+
//! ```
//!
//! Denied or preempted windows are not errors: the next `Tick` simply asks
//! again. The machine itself never performs I/O; it returns a
//! [`SessionStep`] that the caller executes outside any critical section.

use crate::config::MeshConfig;
use crate::error::{MeshError, Result};

/// Length of each requested radio window in microseconds
pub const SESSION_LENGTH_US: u32 = 10_000;

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No configuration yet
    Uninitialized,
    /// Configured, no window requested
    Idle,
    /// Waiting for the arbiter to grant a window
    SessionRequested,
    /// Radio owned until the arbiter ends the window
    InSession { started_us: u64 },
}

/// Signals delivered by the arbiter adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbiterSignal {
    /// Periodic timing tick
    Tick,
    /// Requested window has started
    SessionStarted,
    /// Request rejected, or window revoked before it was used
    SessionDenied,
    /// Radio finished a transmit or receive inside the window
    RadioEvent,
    /// Window expired or was preempted
    SessionEnded,
}

/// Work the caller has to carry out after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    /// Nothing to do
    None,
    /// Ask the arbiter for a window of `length_us`
    RequestWindow { length_us: u32 },
    /// Window granted: configure the radio, send at most one packet, listen
    OpenWindow,
    /// Radio event inside the window: collect frames and keep listening
    ContinueWindow,
    /// Window over: stop the radio
    CloseWindow,
}

/// Owner of the mesh configuration and the radio window lifecycle
#[derive(Debug)]
pub struct RadioSession {
    state: SessionState,
    config: Option<MeshConfig>,
    denied: u32,
    windows: u32,
}

impl RadioSession {
    /// Create an unconfigured session (const fn for static initialization)
    pub const fn new() -> Self {
        Self {
            state: SessionState::Uninitialized,
            config: None,
            denied: 0,
            windows: 0,
        }
    }

    /// Validate and adopt `config`, moving to `Idle`
    ///
    /// Fails with `InvalidState` if already configured and `InvalidParam`
    /// for out-of-range values. A failed call leaves the session
    /// uninitialized.
    pub fn configure(&mut self, config: MeshConfig) -> Result<()> {
        if self.state != SessionState::Uninitialized {
            return Err(MeshError::InvalidState);
        }
        config.validate()?;
        self.config = Some(config);
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Active configuration, `InvalidState` before [`Self::configure`]
    pub fn config(&self) -> Result<&MeshConfig> {
        self.config.as_ref().ok_or(MeshError::InvalidState)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_in_session(&self) -> bool {
        matches!(self.state, SessionState::InSession { .. })
    }

    /// Windows denied or revoked before start
    pub fn denied_count(&self) -> u32 {
        self.denied
    }

    /// Windows granted since startup
    pub fn window_count(&self) -> u32 {
        self.windows
    }

    /// Advance the machine on an arbiter signal
    pub fn on_signal(&mut self, signal: ArbiterSignal, now_us: u64) -> SessionStep {
        let (next, step) = match (self.state, signal) {
            (SessionState::Uninitialized, _) => return SessionStep::None,

            (SessionState::Idle, ArbiterSignal::Tick) => (
                SessionState::SessionRequested,
                SessionStep::RequestWindow {
                    length_us: SESSION_LENGTH_US,
                },
            ),

            (SessionState::SessionRequested, ArbiterSignal::SessionStarted) => {
                self.windows = self.windows.saturating_add(1);
                (
                    SessionState::InSession { started_us: now_us },
                    SessionStep::OpenWindow,
                )
            }
            (SessionState::SessionRequested, ArbiterSignal::SessionDenied)
            | (SessionState::SessionRequested, ArbiterSignal::SessionEnded) => {
                self.denied = self.denied.saturating_add(1);
                (SessionState::Idle, SessionStep::None)
            }

            (SessionState::InSession { .. }, ArbiterSignal::RadioEvent) => {
                (self.state, SessionStep::ContinueWindow)
            }
            (SessionState::InSession { .. }, ArbiterSignal::SessionEnded)
            | (SessionState::InSession { .. }, ArbiterSignal::SessionDenied) => {
                (SessionState::Idle, SessionStep::CloseWindow)
            }

            (state, _) => (state, SessionStep::None),
        };
        self.state = next;
        step
    }

    /// The arbiter refused the request synchronously
    ///
    /// Returns to `Idle` so the next tick retries.
    pub fn request_failed(&mut self) {
        if self.state == SessionState::SessionRequested {
            self.denied = self.denied.saturating_add(1);
            self.state = SessionState::Idle;
        }
    }
}

impl Default for RadioSession {
    fn default() -> Self {
        Self::new()
    }
}

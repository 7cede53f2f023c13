//! External event adapters
//!
//! Two entry points connect the mesh to the outside world:
//!
//! - [`RbcMesh::ble_evt_handler`] turns host-stack attribute writes into
//!   local value writes.
//! - [`RbcMesh::sd_irq_handler`] drains arbiter signals from the highest
//!   priority interrupt and drives the radio.
//!
//! The interrupt path does bounded work per call. Engine state is touched
//! in one critical section per signal or per frame; radio calls happen
//! between them.

use rbc_mesh_core::mesh::{RadioAction, RxOutcome};
use rbc_mesh_core::packet::MAX_PACKET_LEN;
use rbc_mesh_core::resolver::Decision;
use rbc_mesh_core::session::ArbiterSignal;
use rbc_mesh_core::{EventHandler, MeshError, Result};

use super::{MeshShared, RbcMesh};
use crate::core::traits::{SharedState, TimeSource};
use crate::platform::traits::RadioConfig;
use crate::platform::{MeshPlatform, RadioInterface, RadioStatus, TimeslotArbiter};
use crate::{log_debug, log_error, log_trace, log_warn};

/// Arbiter signals handled per interrupt
pub const MAX_SIGNALS_PER_IRQ: usize = 8;

/// Received frames processed per radio event
pub const MAX_FRAMES_PER_IRQ: usize = 8;

/// Events from the host wireless stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostEvent<'a> {
    Connected { conn_handle: u16 },
    Disconnected { conn_handle: u16 },
    /// A peer wrote an attribute of the local table
    GattWrite { attr_handle: u16, data: &'a [u8] },
    /// Anything else, tagged with the stack's event id
    Other(u16),
}

/// Placement of the mesh value attributes in the host attribute table
///
/// Value handle `h` lives at `first_value_attr + h * attr_stride`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GattLayout {
    pub first_value_attr: u16,
    pub attr_stride: u16,
    pub handle_count: u16,
}

/// Where an attribute handle falls relative to the mesh service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrMapping {
    /// Not part of the mesh service
    Outside,
    /// Inside the service but not a usable value attribute
    Unmapped,
    /// Value attribute of this handle
    Value(u16),
}

impl GattLayout {
    pub fn map(&self, attr_handle: u16) -> AttrMapping {
        let span = self.attr_stride as u32 * self.handle_count as u32;
        let Some(offset) = attr_handle.checked_sub(self.first_value_attr) else {
            return AttrMapping::Outside;
        };
        if offset as u32 >= span {
            return AttrMapping::Outside;
        }
        if offset % self.attr_stride != 0 {
            return AttrMapping::Unmapped;
        }
        match offset / self.attr_stride {
            0 => AttrMapping::Unmapped,
            handle => AttrMapping::Value(handle),
        }
    }

    /// Attribute handle of a value handle's characteristic
    pub fn attr_of(&self, handle: u16) -> Option<u16> {
        if handle == 0 || handle >= self.handle_count {
            return None;
        }
        handle
            .checked_mul(self.attr_stride)
            .and_then(|offset| offset.checked_add(self.first_value_attr))
    }
}

impl<S, P, T, E> RbcMesh<S, P, T, E>
where
    S: SharedState<MeshShared>,
    P: MeshPlatform,
    T: TimeSource,
    E: EventHandler,
{
    /// Feed a host-stack event to the mesh
    ///
    /// Writes to a value attribute behave like [`Self::value_set`].
    /// Unrelated events and writes outside the mesh service are ignored.
    ///
    /// # Errors
    ///
    /// - `InvalidState` before init
    /// - `InvalidAddr` for a write inside the service that does not hit a
    ///   usable value attribute
    /// - `InvalidLength` for an oversize write
    pub fn ble_evt_handler(&self, event: &HostEvent<'_>) -> Result<()> {
        let layout = self
            .state
            .with(|shared| shared.gatt())
            .ok_or(MeshError::InvalidState)?;

        let HostEvent::GattWrite { attr_handle, data } = *event else {
            return Ok(());
        };

        match layout.map(attr_handle) {
            AttrMapping::Outside => Ok(()),
            AttrMapping::Unmapped => Err(MeshError::InvalidAddr),
            AttrMapping::Value(handle) => self.value_set(handle, data).map(|_| ()),
        }
    }

    /// Arbiter interrupt entry point
    ///
    /// Handles at most [`MAX_SIGNALS_PER_IRQ`] pending signals; the arbiter
    /// re-raises the interrupt for the rest.
    pub fn sd_irq_handler(&self) {
        let arbiter = self.platform.arbiter();
        for _ in 0..MAX_SIGNALS_PER_IRQ {
            let Some(signal) = arbiter.poll_signal() else {
                return;
            };
            log_trace!("arbiter signal {}", signal as u8);

            // Frames that landed before the window closed still count
            if matches!(signal, ArbiterSignal::SessionEnded | ArbiterSignal::SessionDenied) {
                self.collect_frames();
            }

            let now_us = self.time.now_us();
            let action = self
                .state
                .with_mut(|shared| shared.core.on_arbiter_signal(signal, now_us));
            self.execute(action);
        }
    }

    fn execute(&self, action: RadioAction) {
        let radio = self.platform.radio();
        match action {
            RadioAction::None => {}
            RadioAction::RequestWindow { length_us } => {
                if self.platform.arbiter().request_window(length_us).is_err() {
                    log_debug!("radio window request refused");
                    self.state.with_mut(|shared| shared.core.window_request_failed());
                }
            }
            RadioAction::Open {
                access_address,
                channel,
                tx,
            } => {
                if radio
                    .configure(RadioConfig {
                        access_address,
                        channel,
                    })
                    .is_err()
                {
                    log_error!("radio configuration failed on channel {}", channel);
                    return;
                }
                if let Some(frame) = tx {
                    if radio.transmit(&frame).is_err() {
                        log_warn!("transmit failed");
                    }
                }
                self.restart_rx();
            }
            RadioAction::Listen => {
                self.collect_frames();
                self.restart_rx();
            }
            RadioAction::Close => radio.disable(),
        }
    }

    fn restart_rx(&self) {
        if self.platform.radio().start_rx().is_err() {
            log_warn!("radio refused receive mode");
        }
    }

    fn collect_frames(&self) {
        let radio = self.platform.radio();
        let status = radio.take_status();
        if status.contains(RadioStatus::CRC_ERROR) {
            log_trace!("frame dropped by crc");
        }
        if !status.contains(RadioStatus::RX_READY) {
            return;
        }

        let mut buf = [0u8; MAX_PACKET_LEN];
        for _ in 0..MAX_FRAMES_PER_IRQ {
            let Some(len) = radio.read_frame(&mut buf) else {
                break;
            };
            let frame = &buf[..len];
            let now_us = self.time.now_us();
            let outcome = self.state.with_mut(|shared| shared.core.receive(frame, now_us));
            log_outcome(outcome);
        }
    }
}

fn log_outcome(outcome: RxOutcome) {
    match outcome {
        RxOutcome::Resolved {
            handle,
            decision,
            evicted,
        } => {
            match decision {
                Decision::AcceptNew | Decision::AcceptUpdate => {
                    log_debug!("handle {} updated from air", handle)
                }
                Decision::Conflict => log_warn!("conflicting value on handle {}", handle),
                Decision::KnownConflict | Decision::Stale | Decision::Duplicate => {}
            }
            if evicted {
                log_warn!("event queue full, oldest event dropped");
            }
        }
        RxOutcome::RequestServed(handle) => log_debug!("request for handle {} served", handle),
        RxOutcome::OutOfRange(handle) => log_trace!("frame for unknown handle {}", handle),
        RxOutcome::Dropped(_) => log_trace!("malformed frame dropped"),
        RxOutcome::NotListening | RxOutcome::RequestIgnored(_) => {}
    }
}

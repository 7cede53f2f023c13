//! Mock radio

use crate::platform::{
    traits::{RadioConfig, RadioInterface, RadioStatus},
    RadioError, Result,
};
use core::cell::{Cell, RefCell};
use rbc_mesh_core::packet::MAX_PACKET_LEN;
use std::collections::VecDeque;
use std::vec::Vec;

/// In-memory radio
///
/// Records configuration and transmitted frames; received frames are
/// injected by the test.
#[derive(Debug, Default)]
pub struct MockRadio {
    config: Cell<Option<RadioConfig>>,
    receiving: Cell<bool>,
    tx_frames: RefCell<Vec<Vec<u8>>>,
    rx_frames: RefCell<VecDeque<Vec<u8>>>,
    status: Cell<u8>,
}

impl MockRadio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a frame as if it arrived over the air
    pub fn inject_frame(&self, frame: &[u8]) {
        self.rx_frames.borrow_mut().push_back(frame.to_vec());
        self.raise(RadioStatus::RX_READY);
    }

    /// Flag a CRC failure on the next status read
    pub fn inject_crc_error(&self) {
        self.raise(RadioStatus::CRC_ERROR);
    }

    /// Frames handed to `transmit`, oldest first
    pub fn transmitted(&self) -> Vec<Vec<u8>> {
        self.tx_frames.borrow().clone()
    }

    pub fn clear_transmitted(&self) {
        self.tx_frames.borrow_mut().clear();
    }

    pub fn config(&self) -> Option<RadioConfig> {
        self.config.get()
    }

    pub fn is_receiving(&self) -> bool {
        self.receiving.get()
    }

    pub fn pending_rx(&self) -> usize {
        self.rx_frames.borrow().len()
    }

    fn raise(&self, flags: RadioStatus) {
        self.status.set(self.status.get() | flags.bits());
    }
}

impl RadioInterface for MockRadio {
    fn configure(&self, config: RadioConfig) -> Result<()> {
        if config.channel > 39 {
            return Err(RadioError::InvalidChannel.into());
        }
        self.config.set(Some(config));
        Ok(())
    }

    fn transmit(&self, frame: &[u8]) -> Result<()> {
        if self.config.get().is_none() {
            return Err(RadioError::NotOwned.into());
        }
        if frame.len() > MAX_PACKET_LEN {
            return Err(RadioError::FrameTooLong.into());
        }
        self.tx_frames.borrow_mut().push(frame.to_vec());
        self.raise(RadioStatus::TX_DONE);
        Ok(())
    }

    fn start_rx(&self) -> Result<()> {
        if self.config.get().is_none() {
            return Err(RadioError::NotOwned.into());
        }
        self.receiving.set(true);
        Ok(())
    }

    fn read_frame(&self, buf: &mut [u8]) -> Option<usize> {
        let frame = self.rx_frames.borrow_mut().pop_front()?;
        let len = frame.len().min(buf.len());
        buf[..len].copy_from_slice(&frame[..len]);
        Some(len)
    }

    fn take_status(&self) -> RadioStatus {
        let mut status = RadioStatus::from_bits_truncate(self.status.replace(0));
        if !self.rx_frames.borrow().is_empty() {
            status |= RadioStatus::RX_READY;
        }
        status
    }

    fn disable(&self) {
        self.receiving.set(false);
        self.config.set(None);
    }
}

//! Driver configuration.

use muxnic_ctrl::GET_MAC_RSP_SIZE;
use muxnic_frame::{ETHERNET_FRAME_MAX_SIZE, LEN_PREFIX_SIZE};
use muxnic_transport::{ChannelConfig, ChannelId};

use crate::error::{DriverError, Result};

/// Control channel number used when nothing else is wired up.
pub const DEFAULT_CTRL_CHANNEL: ChannelId = 4;

/// Data channel number used when nothing else is wired up.
pub const DEFAULT_DATA_CHANNEL: ChannelId = 5;

/// How many receive ring slots to allocate by default.
pub const DEFAULT_RING_SLOTS: usize = 16;

/// Which channels the driver uses and how its receive side is sized.
#[derive(Debug, Clone)]
pub struct NicConfig {
    /// Control channel carrying the command protocol.
    pub ctrl: ChannelConfig,
    /// Data channel carrying framed Ethernet traffic.
    pub data: ChannelConfig,
    /// Receive ring slots. One slot reproduces the strict
    /// publish-then-wait pacing of single-buffer setups; more slots let
    /// the receive loop run ahead of the network stack.
    pub ring_slots: usize,
    /// Data bytes per receive slot. Frames longer than this are dropped.
    pub slot_capacity: usize,
}

impl Default for NicConfig {
    fn default() -> Self {
        Self {
            ctrl: ChannelConfig::duplex(DEFAULT_CTRL_CHANNEL),
            data: ChannelConfig::duplex(DEFAULT_DATA_CHANNEL),
            ring_slots: DEFAULT_RING_SLOTS,
            slot_capacity: ETHERNET_FRAME_MAX_SIZE,
        }
    }
}

impl NicConfig {
    /// Check that the configuration can describe a working NIC.
    pub fn validate(&self) -> Result<()> {
        if self.ctrl.id == self.data.id {
            return Err(DriverError::Config(format!(
                "control and data channel share number {}",
                self.ctrl.id
            )));
        }
        if !self.ctrl.direction.can_read() || !self.ctrl.direction.can_write() {
            return Err(DriverError::Config(format!(
                "control channel {} must be duplex",
                self.ctrl.id
            )));
        }
        if !self.data.direction.can_read() || !self.data.direction.can_write() {
            return Err(DriverError::Config(format!(
                "data channel {} must be duplex",
                self.data.id
            )));
        }
        if self.ctrl.capacity < GET_MAC_RSP_SIZE {
            return Err(DriverError::Config(format!(
                "control channel capacity {} cannot carry a {}-byte confirm",
                self.ctrl.capacity, GET_MAC_RSP_SIZE
            )));
        }
        if self.data.capacity <= LEN_PREFIX_SIZE {
            return Err(DriverError::Config(format!(
                "data channel capacity {} cannot carry framed traffic",
                self.data.capacity
            )));
        }
        if self.ring_slots == 0 {
            return Err(DriverError::Config("receive ring needs at least one slot".into()));
        }
        if self.slot_capacity == 0 {
            return Err(DriverError::Config("receive slots need nonzero capacity".into()));
        }
        Ok(())
    }
}

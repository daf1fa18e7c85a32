//! Channel identifiers and per-channel configuration.
//!
//! ChanMUX channel numbers are assigned by the system integrator and shared
//! with the multiplexer on the far side of the link; this crate treats them
//! as opaque. A NIC driver uses two of them: a control channel for the
//! command protocol and a data channel for framed Ethernet traffic.

/// Identifies one logical channel on a ChanMUX link.
///
/// Channel numbers travel in single bytes of control commands, which caps
/// the id space at 256 channels per link.
pub type ChannelId = u8;

/// Default per-operation byte capacity for a channel.
///
/// Mirrors the shared-buffer size commonly wired between a driver and the
/// multiplexer. A single read or write never moves more than this many
/// bytes, whatever the caller's buffer size.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 4096;

/// Which operations a channel supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelDirection {
    /// Far side produces, we consume.
    Read,
    /// We produce, far side consumes.
    Write,
    /// Both directions.
    Duplex,
}

impl ChannelDirection {
    /// True when reads are permitted on the channel.
    pub fn can_read(self) -> bool {
        matches!(self, ChannelDirection::Read | ChannelDirection::Duplex)
    }

    /// True when writes are permitted on the channel.
    pub fn can_write(self) -> bool {
        matches!(self, ChannelDirection::Write | ChannelDirection::Duplex)
    }
}

/// Static description of one channel on a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Channel number on the link.
    pub id: ChannelId,
    /// Most bytes a single read or write can move on this channel.
    pub capacity: usize,
    /// Permitted operations.
    pub direction: ChannelDirection,
}

impl ChannelConfig {
    /// Describe a channel with an explicit capacity.
    pub fn new(id: ChannelId, capacity: usize, direction: ChannelDirection) -> Self {
        Self {
            id,
            capacity,
            direction,
        }
    }

    /// Describe a duplex channel with the default capacity.
    pub fn duplex(id: ChannelId) -> Self {
        Self::new(id, DEFAULT_CHANNEL_CAPACITY, ChannelDirection::Duplex)
    }
}

use thiserror::Error;

use crate::channel::ChannelId;

/// Errors reported by ChanMUX transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The multiplexer lost bytes on this channel because its FIFO filled
    /// up faster than they were consumed. Reported once per incident; the
    /// receive path treats it as a resynchronization point rather than a
    /// generic failure.
    #[error("channel {channel} FIFO overflowed, stream out of sync")]
    Overflow { channel: ChannelId },

    /// The far side closed the channel and its FIFO is drained.
    #[error("channel {channel} is closed")]
    ChannelClosed { channel: ChannelId },

    /// The channel number is not configured on this link.
    #[error("unknown channel {0}")]
    UnknownChannel(ChannelId),

    /// The operation is not permitted by the channel's direction.
    #[error("channel {channel} is not open for {op}")]
    Direction {
        channel: ChannelId,
        op: &'static str,
    },

    /// Underlying medium failure.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for transport results.
pub type Result<T> = std::result::Result<T, TransportError>;

use thiserror::Error;

use muxnic_transport::TransportError;

/// Errors reported by the framing layer.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Frame is larger than the 2-byte wire length prefix can describe.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The transport failed while moving frame bytes.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A data-channel read failed and the byte stream may have stopped
    /// mid-record. The receive loop must pause the far side, run
    /// [`Deframer::resynchronize`](crate::deframe::Deframer::resynchronize)
    /// and resume delivery before pumping again.
    #[error("data channel out of sync, resynchronization required")]
    RecoveryNeeded,
}

/// Convenience alias for framing results.
pub type Result<T> = std::result::Result<T, FrameError>;

use thiserror::Error;

use muxnic_ctrl::CtrlError;
use muxnic_frame::FrameError;

/// Errors reported by the NIC driver.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The configuration cannot describe a working NIC.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A control-channel exchange failed. During bring-up this aborts
    /// initialization; during recovery it is fatal for the receive loop.
    #[error("control channel: {0}")]
    Ctrl(#[from] CtrlError),

    /// The framing layer failed outside its recoverable paths.
    #[error("framing: {0}")]
    Frame(#[from] FrameError),
}

/// Convenience alias for driver results.
pub type Result<T> = std::result::Result<T, DriverError>;

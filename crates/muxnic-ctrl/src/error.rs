use thiserror::Error;

use muxnic_transport::TransportError;

/// Errors reported by control-channel exchanges.
#[derive(Debug, Error)]
pub enum CtrlError {
    /// The transport failed while moving command or confirm bytes.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The channel did not accept the whole command. Commands are not
    /// resumable; a partial command would desynchronize the protocol.
    #[error("{command} command truncated ({sent} of {expected} bytes written)")]
    ShortWrite {
        command: &'static str,
        sent: usize,
        expected: usize,
    },

    /// The confirm carried the wrong opcode.
    #[error("{command} confirm has opcode {found:#04x}, expected {expected:#04x}")]
    UnexpectedOpcode {
        command: &'static str,
        expected: u8,
        found: u8,
    },

    /// The proxy rejected the command.
    #[error("{command} failed with status {status}")]
    CommandFailed { command: &'static str, status: u8 },

    /// The proxy reported an all-zero MAC address.
    #[error("proxy reported an all-zero MAC address")]
    NullMac,

    /// The message does not fit the control channel.
    #[error("control message of {len} bytes exceeds channel capacity {capacity}")]
    Oversized { len: usize, capacity: usize },

    /// A thread panicked while holding the exchange lock.
    #[error("control channel lock poisoned")]
    LockPoisoned,
}

/// Convenience alias for control results.
pub type Result<T> = std::result::Result<T, CtrlError>;

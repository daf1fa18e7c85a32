//! The ChanMUX access trait.

use crate::channel::ChannelId;
use crate::error::Result;

/// Byte-level access to the channels of one ChanMUX link.
///
/// One link is shared by a driver's receive loop, its transmit path and its
/// control-channel client, so all methods take `&self`; implementations do
/// their own internal locking per channel.
///
/// Reads and writes are non-blocking with respect to data availability:
/// [`read`](ChanMux::read) returns `Ok(0)` when the channel FIFO is empty
/// and [`write`](ChanMux::write) may accept fewer bytes than offered when
/// the far side is congested. Callers that need to block use
/// [`wait`](ChanMux::wait) and then retry the read.
pub trait ChanMux: Send + Sync {
    /// Read up to `buf.len()` bytes from a channel's FIFO.
    ///
    /// Returns the number of bytes copied into `buf`, `Ok(0)` when nothing
    /// is pending. A single call never moves more than the channel's
    /// configured capacity.
    fn read(&self, channel: ChannelId, buf: &mut [u8]) -> Result<usize>;

    /// Write up to `buf.len()` bytes to a channel.
    ///
    /// Returns the number of bytes actually accepted, which may be less
    /// than `buf.len()` and may be zero when the far side cannot take more
    /// right now. Never more than the channel's configured capacity.
    fn write(&self, channel: ChannelId, buf: &[u8]) -> Result<usize>;

    /// Block until the channel signals an event (data arrived, an error is
    /// pending, or the channel closed).
    ///
    /// Wakeups may be spurious; callers must tolerate a subsequent read
    /// returning `Ok(0)` and wait again.
    fn wait(&self, channel: ChannelId);
}

//! Transmit path for the data channel.
//!
//! Transmitting is simpler than receiving: build the `[length][payload]`
//! wire record, then push it through the channel in chunks the transport
//! will take. The only sync hazard is interleaving; if two callers wrote
//! records concurrently the stream would turn to garbage for the far side,
//! so one internal lock covers the whole send.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use bytes::BytesMut;
use tracing::trace;

use muxnic_transport::{ChanMux, ChannelConfig};

use crate::codec::encode_frame;
use crate::error::Result;

/// Frame transmitter over one data channel.
///
/// Cheap to share behind an [`Arc`]; concurrent [`transmit`] calls are
/// serialized internally.
///
/// [`transmit`]: TxFramer::transmit
pub struct TxFramer<M> {
    mux: Arc<M>,
    channel: ChannelConfig,
    /// Wire image under construction. The lock also serializes transmits
    /// so records from concurrent callers never interleave on the wire.
    wire: Mutex<BytesMut>,
}

impl<M: ChanMux> TxFramer<M> {
    /// Build a transmitter writing to `channel` on `mux`.
    pub fn new(mux: Arc<M>, channel: ChannelConfig) -> Self {
        debug_assert!(channel.capacity > 0);
        Self {
            mux,
            channel,
            wire: Mutex::new(BytesMut::new()),
        }
    }

    /// Send one frame, blocking until every wire byte is accepted.
    ///
    /// The record must go out whole; a partial record would desynchronize
    /// the stream, so short writes are resumed where they stopped. Returns
    /// the number of bytes put on the wire, payload plus length prefix.
    pub fn transmit(&self, frame: &[u8]) -> Result<usize> {
        let mut wire = self.wire.lock().unwrap_or_else(PoisonError::into_inner);
        wire.clear();
        encode_frame(frame, &mut wire)?;

        let mut offset = 0;
        while offset < wire.len() {
            let end = wire.len().min(offset + self.channel.capacity);
            let sent = self.mux.write(self.channel.id, &wire[offset..end])?;
            if sent == 0 {
                // Far side congested and writes have no wait primitive.
                thread::yield_now();
                continue;
            }
            if sent < end - offset {
                trace!(sent, requested = end - offset, "short write on data channel");
            }
            offset += sent;
        }
        trace!(len = frame.len(), wire = wire.len(), "frame transmitted");
        Ok(wire.len())
    }
}

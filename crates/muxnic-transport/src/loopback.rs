//! In-memory ChanMUX link with a scriptable far end.
//!
//! [`LoopbackLink::new`] builds both sides of a link: a [`LoopbackMux`]
//! implementing [`ChanMux`] for the driver under test, and a
//! [`LoopbackPeer`] that plays the multiplexer proxy. The peer can feed
//! bytes, collect what the driver wrote, inject error returns and raise
//! spurious data events, which is enough to emulate a full proxy in tests
//! and demos.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::channel::{ChannelConfig, ChannelId};
use crate::error::{Result, TransportError};
use crate::traits::ChanMux;

struct ChannelState {
    config: ChannelConfig,
    /// Bytes queued for the driver to read.
    inbound: VecDeque<u8>,
    /// Bytes the driver wrote, awaiting the peer.
    outbound: VecDeque<u8>,
    /// Injected errors, surfaced one per read once `inbound` is empty.
    faults: VecDeque<TransportError>,
    closed: bool,
    /// Pending data event with no data behind it.
    wake: bool,
}

struct Shared {
    state: Mutex<HashMap<ChannelId, ChannelState>>,
    signal: Condvar,
}

impl Shared {
    // A panicking test thread must not wedge the other side of the link.
    fn lock(&self) -> MutexGuard<'_, HashMap<ChannelId, ChannelState>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Factory for in-memory links.
pub struct LoopbackLink;

impl LoopbackLink {
    /// Build a link carrying the given channels.
    ///
    /// Returns the driver-side mux and the far-side peer handle.
    pub fn new(channels: &[ChannelConfig]) -> (LoopbackMux, LoopbackPeer) {
        let mut state = HashMap::with_capacity(channels.len());
        for config in channels {
            state.insert(
                config.id,
                ChannelState {
                    config: *config,
                    inbound: VecDeque::new(),
                    outbound: VecDeque::new(),
                    faults: VecDeque::new(),
                    closed: false,
                    wake: false,
                },
            );
        }
        debug!(channels = channels.len(), "loopback link created");
        let shared = Arc::new(Shared {
            state: Mutex::new(state),
            signal: Condvar::new(),
        });
        (
            LoopbackMux {
                shared: Arc::clone(&shared),
            },
            LoopbackPeer { shared },
        )
    }
}

/// Driver-side handle of an in-memory link.
#[derive(Clone)]
pub struct LoopbackMux {
    shared: Arc<Shared>,
}

impl ChanMux for LoopbackMux {
    fn read(&self, channel: ChannelId, buf: &mut [u8]) -> Result<usize> {
        let mut state = self.shared.lock();
        let chan = state
            .get_mut(&channel)
            .ok_or(TransportError::UnknownChannel(channel))?;
        if !chan.config.direction.can_read() {
            return Err(TransportError::Direction {
                channel,
                op: "read",
            });
        }
        if !chan.inbound.is_empty() {
            let n = buf.len().min(chan.config.capacity).min(chan.inbound.len());
            for (dst, byte) in buf.iter_mut().zip(chan.inbound.drain(..n)) {
                *dst = byte;
            }
            return Ok(n);
        }
        if let Some(fault) = chan.faults.pop_front() {
            return Err(fault);
        }
        if chan.closed {
            return Err(TransportError::ChannelClosed { channel });
        }
        Ok(0)
    }

    fn write(&self, channel: ChannelId, buf: &[u8]) -> Result<usize> {
        let mut state = self.shared.lock();
        let chan = state
            .get_mut(&channel)
            .ok_or(TransportError::UnknownChannel(channel))?;
        if !chan.config.direction.can_write() {
            return Err(TransportError::Direction {
                channel,
                op: "write",
            });
        }
        if chan.closed {
            return Err(TransportError::ChannelClosed { channel });
        }
        let n = buf.len().min(chan.config.capacity);
        chan.outbound.extend(&buf[..n]);
        self.shared.signal.notify_all();
        Ok(n)
    }

    fn wait(&self, channel: ChannelId) {
        let mut state = self.shared.lock();
        loop {
            let Some(chan) = state.get_mut(&channel) else {
                return;
            };
            if !chan.inbound.is_empty() || !chan.faults.is_empty() || chan.closed || chan.wake {
                chan.wake = false;
                return;
            }
            state = self
                .shared
                .signal
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Far-side handle of an in-memory link, playing the multiplexer proxy.
#[derive(Clone)]
pub struct LoopbackPeer {
    shared: Arc<Shared>,
}

impl LoopbackPeer {
    /// Queue bytes for the driver to read and raise a data event.
    pub fn push(&self, channel: ChannelId, bytes: &[u8]) -> Result<()> {
        let mut state = self.shared.lock();
        let chan = state
            .get_mut(&channel)
            .ok_or(TransportError::UnknownChannel(channel))?;
        if !chan.config.direction.can_read() {
            return Err(TransportError::Direction {
                channel,
                op: "read",
            });
        }
        chan.inbound.extend(bytes);
        self.shared.signal.notify_all();
        Ok(())
    }

    /// Collect up to `max` bytes the driver has written, without blocking.
    pub fn pull(&self, channel: ChannelId, max: usize) -> Result<Vec<u8>> {
        let mut state = self.shared.lock();
        let chan = state
            .get_mut(&channel)
            .ok_or(TransportError::UnknownChannel(channel))?;
        if !chan.config.direction.can_write() {
            return Err(TransportError::Direction {
                channel,
                op: "write",
            });
        }
        let n = max.min(chan.outbound.len());
        Ok(chan.outbound.drain(..n).collect())
    }

    /// Block until the driver has written `len` bytes, then take them.
    pub fn pull_exact(&self, channel: ChannelId, len: usize) -> Result<Vec<u8>> {
        let mut state = self.shared.lock();
        loop {
            let chan = state
                .get_mut(&channel)
                .ok_or(TransportError::UnknownChannel(channel))?;
            if chan.outbound.len() >= len {
                return Ok(chan.outbound.drain(..len).collect());
            }
            if chan.closed {
                return Err(TransportError::ChannelClosed { channel });
            }
            state = self
                .shared
                .signal
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Make a future read fail with `fault`.
    ///
    /// The fault surfaces once the channel has no queued bytes left, so
    /// data pushed earlier is read first.
    pub fn inject_read_error(&self, channel: ChannelId, fault: TransportError) -> Result<()> {
        let mut state = self.shared.lock();
        let chan = state
            .get_mut(&channel)
            .ok_or(TransportError::UnknownChannel(channel))?;
        chan.faults.push_back(fault);
        self.shared.signal.notify_all();
        Ok(())
    }

    /// Raise a data event with no data behind it.
    ///
    /// The next driver-side [`ChanMux::wait`] returns and the following
    /// read sees an empty FIFO, exercising spurious-wakeup handling.
    pub fn raise_data_event(&self, channel: ChannelId) -> Result<()> {
        let mut state = self.shared.lock();
        let chan = state
            .get_mut(&channel)
            .ok_or(TransportError::UnknownChannel(channel))?;
        chan.wake = true;
        self.shared.signal.notify_all();
        Ok(())
    }

    /// Close the channel.
    ///
    /// Queued bytes remain readable; after they drain, driver reads fail
    /// with [`TransportError::ChannelClosed`]. Writes fail immediately.
    pub fn hang_up(&self, channel: ChannelId) -> Result<()> {
        let mut state = self.shared.lock();
        let chan = state
            .get_mut(&channel)
            .ok_or(TransportError::UnknownChannel(channel))?;
        chan.closed = true;
        debug!(channel, "loopback channel closed");
        self.shared.signal.notify_all();
        Ok(())
    }
}

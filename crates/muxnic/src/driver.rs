//! Driver bring-up, the receive loop, and the transmit/control handle.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use muxnic_ctrl::{ControlClient, MacAddr};
use muxnic_frame::{rx_ring, Deframer, FrameError, RingConsumer, RxEvent, RxNotify, TxFramer};
use muxnic_transport::{ChanMux, ChannelId};

use crate::config::NicConfig;
use crate::error::Result;

/// An Ethernet NIC speaking through a ChanMUX link.
///
/// [`init`](NicDriver::init) brings the device up; after that,
/// [`take_consumer`](NicDriver::take_consumer) hands the receive side to
/// the network stack, [`handle`](NicDriver::handle) hands out the
/// transmit/control side, and [`run`](NicDriver::run) parks the current
/// thread in the receive loop.
pub struct NicDriver<M, N> {
    config: NicConfig,
    ctrl: ControlClient<M>,
    tx: Arc<TxFramer<M>>,
    deframer: Deframer<M, N>,
    consumer: Option<RingConsumer>,
    mac: MacAddr,
}

impl<M: ChanMux, N: RxNotify> NicDriver<M, N> {
    /// Bring up the NIC: open the data channel and fetch its MAC address.
    ///
    /// `notify` fires after every received frame, from the receive loop's
    /// thread. Fails if the configuration is unusable, the proxy rejects
    /// the open, or the MAC comes back all zero; nothing is delivered to
    /// the far side beyond the two bring-up commands in that case.
    pub fn init(mux: Arc<M>, config: NicConfig, notify: N) -> Result<Self> {
        config.validate()?;
        info!(
            ctrl = config.ctrl.id,
            data = config.data.id,
            "bringing up ChanMUX NIC"
        );
        let ctrl = ControlClient::new(Arc::clone(&mux), config.ctrl);
        ctrl.open(config.data.id)?;
        let mac = ctrl.get_mac(config.data.id)?;
        info!(%mac, "NIC ready");

        let (producer, consumer) = rx_ring(config.ring_slots, config.slot_capacity);
        let deframer = Deframer::new(Arc::clone(&mux), config.data, producer, notify);
        let tx = Arc::new(TxFramer::new(mux, config.data));
        Ok(Self {
            config,
            ctrl,
            tx,
            deframer,
            consumer: Some(consumer),
            mac,
        })
    }

    /// MAC address the proxy assigned to the data channel.
    pub fn mac(&self) -> MacAddr {
        self.mac
    }

    /// Take the receive side of the ring.
    ///
    /// The network stack drains frames through this handle, typically
    /// woken by the driver's notify hook. Returns `None` after the first
    /// call.
    pub fn take_consumer(&mut self) -> Option<RingConsumer> {
        self.consumer.take()
    }

    /// A cloneable transmit/control handle, valid before and while the
    /// receive loop runs.
    pub fn handle(&self) -> NicHandle<M> {
        NicHandle {
            tx: Arc::clone(&self.tx),
            ctrl: self.ctrl.clone(),
            data_channel: self.config.data.id,
            mac: self.mac,
        }
    }

    /// Run the receive loop on the current thread.
    ///
    /// Tells the proxy to start delivering, then pumps frames into the
    /// ring indefinitely. Data-channel faults are handled in place with
    /// the stop/resynchronize/start sequence; only control-channel
    /// failures end the loop.
    pub fn run(mut self) -> Result<()> {
        self.ctrl.start_read(self.config.data.id)?;
        debug!(channel = self.config.data.id, "receive loop running");
        loop {
            match self.deframer.pump() {
                Ok(RxEvent::Published { len }) => trace!(len, "frame received"),
                Ok(RxEvent::Dropped { len }) => debug!(len, "oversized frame dropped"),
                Err(FrameError::RecoveryNeeded) => self.recover()?,
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Stop far-side delivery, flush the wrecked stream, start again.
    ///
    /// A failure of either control exchange leaves the data channel in an
    /// unknown delivery state, which is not survivable.
    fn recover(&mut self) -> Result<()> {
        warn!(
            channel = self.config.data.id,
            "data channel fault, resynchronizing"
        );
        self.ctrl.stop_read(self.config.data.id)?;
        let discarded = self.deframer.resynchronize();
        self.ctrl.start_read(self.config.data.id)?;
        info!(discarded, "data channel resynchronized");
        Ok(())
    }
}

impl<M, N> fmt::Debug for NicDriver<M, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NicDriver")
            .field("config", &self.config)
            .field("mac", &self.mac)
            .finish_non_exhaustive()
    }
}

/// Transmit and control access to a running NIC.
///
/// Clones freely; transmits are serialized by the framer and control
/// exchanges by the client, so handles can be spread across threads.
pub struct NicHandle<M> {
    tx: Arc<TxFramer<M>>,
    ctrl: ControlClient<M>,
    data_channel: ChannelId,
    mac: MacAddr,
}

impl<M> Clone for NicHandle<M> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
            ctrl: self.ctrl.clone(),
            data_channel: self.data_channel,
            mac: self.mac,
        }
    }
}

impl<M: ChanMux> NicHandle<M> {
    /// Send one Ethernet frame.
    ///
    /// Returns the number of bytes put on the wire, payload plus the
    /// 2-byte length prefix.
    pub fn transmit(&self, frame: &[u8]) -> Result<usize> {
        Ok(self.tx.transmit(frame)?)
    }

    /// MAC address the proxy assigned to the data channel.
    pub fn mac(&self) -> MacAddr {
        self.mac
    }

    /// Ask the proxy to close the data channel.
    ///
    /// The receive loop, if running, will see the channel die and is
    /// expected to be torn down by the caller.
    pub fn shutdown(&self) -> Result<()> {
        self.ctrl.close(self.data_channel)?;
        info!(channel = self.data_channel, "NIC data channel closed");
        Ok(())
    }
}

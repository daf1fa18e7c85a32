//! Ethernet NIC driver over a ChanMUX multiplexed transport.
//!
//! A ChanMUX link multiplexes logical byte channels over one shared
//! medium; a multiplexer proxy on the far side bridges two of those
//! channels to a real network: a control channel speaking a small command
//! protocol and a data channel carrying Ethernet frames as back-to-back
//! `[2-byte length][payload]` records. This crate ties the layers into a
//! NIC a network stack can sit on: frames out through a serialized
//! transmitter, frames in through a receive ring fed by a dedicated
//! receive loop, with the proxy's stop/start delivery commands covering
//! fault recovery.
//!
//! # Crate Structure
//!
//! - [`config`] — Channel wiring and receive ring sizing
//! - [`driver`] — Bring-up, the receive loop and the transmit handle
//! - [`muxnic_transport`](muxnic_transport) — The [`ChanMux`] trait and
//!   the in-memory loopback link
//! - [`muxnic_frame`](muxnic_frame) — Wire format, receive ring, framing
//! - [`muxnic_ctrl`](muxnic_ctrl) — The control-channel protocol

pub mod config;
pub mod driver;
pub mod error;

pub use config::{NicConfig, DEFAULT_CTRL_CHANNEL, DEFAULT_DATA_CHANNEL, DEFAULT_RING_SLOTS};
pub use driver::{NicDriver, NicHandle};
pub use error::{DriverError, Result};

pub use muxnic_ctrl::{ControlClient, CtrlError, MacAddr};
pub use muxnic_frame::{
    FrameError, RingConsumer, RxNotify, ETHERNET_FRAME_MAX_SIZE, MAX_WIRE_FRAME,
};
pub use muxnic_transport::{
    ChanMux, ChannelConfig, ChannelDirection, ChannelId, LoopbackLink, LoopbackMux, LoopbackPeer,
    TransportError,
};

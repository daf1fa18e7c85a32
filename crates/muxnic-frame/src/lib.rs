//! Ethernet frame transport over a ChanMUX data channel.
//!
//! The data channel is a raw byte stream; frames travel on it back to back
//! as records of the form `[2-byte big-endian length][payload]` with no
//! sync markers or checksums. This crate turns that stream back into
//! discrete frames and turns frames into the stream:
//!
//! - [`codec`] — The wire record format
//! - [`ring`] — Lock-free single-producer single-consumer receive ring
//! - [`deframe`] — The receive state machine driving a [`ChanMux`] channel
//! - [`framer`] — The transmit path
//!
//! Because nothing in the stream marks record boundaries, both sides only
//! stay in sync as long as every byte is accounted for. The deframer
//! therefore never discards input on its own; when the transport reports a
//! failure it parks in an error state and the owner runs the
//! stop/resynchronize/start sequence against the far side before pumping
//! again.
//!
//! [`ChanMux`]: muxnic_transport::ChanMux

pub mod codec;
pub mod deframe;
pub mod error;
pub mod framer;
pub mod ring;

pub use codec::{
    decode_frame, encode_frame, ETHERNET_FRAME_MAX_SIZE, LEN_PREFIX_SIZE, MAX_WIRE_FRAME,
};
pub use deframe::{Deframer, RxEvent};
pub use error::{FrameError, Result};
pub use framer::TxFramer;
pub use ring::{rx_ring, RingConsumer, RingProducer, RxNotify};

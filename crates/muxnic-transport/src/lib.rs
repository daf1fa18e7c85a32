//! Byte-channel transport abstraction for ChanMUX links.
//!
//! A ChanMUX link carries several independent logical channels over one
//! shared medium. Each channel is an unstructured byte stream with its own
//! FIFO on the far side; a channel number selects which stream a read or
//! write refers to. This crate defines the channel model, the [`ChanMux`]
//! capability trait the higher layers program against, and an in-memory
//! [`LoopbackLink`] used for tests and demos.
//!
//! # Crate Structure
//!
//! - [`channel`] — Channel identifiers and per-channel configuration
//! - [`traits`] — The [`ChanMux`] access trait
//! - [`loopback`] — In-memory link with a scriptable far end
//! - [`error`] — Transport error type

pub mod channel;
pub mod error;
pub mod loopback;
pub mod traits;

pub use channel::{ChannelConfig, ChannelDirection, ChannelId, DEFAULT_CHANNEL_CAPACITY};
pub use error::{Result, TransportError};
pub use loopback::{LoopbackLink, LoopbackMux, LoopbackPeer};
pub use traits::ChanMux;

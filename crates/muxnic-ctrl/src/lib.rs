//! Control-channel protocol for ChanMUX NIC drivers.
//!
//! Besides the data channel carrying framed Ethernet traffic, the
//! multiplexer proxy exposes a control channel speaking a tiny binary
//! command protocol: open and close the data channel, query the MAC
//! address, and pause or resume frame delivery. Commands are two bytes,
//! confirms echo the command opcode plus one; see [`proto`] for the wire
//! layout and [`ControlClient`] for the exchange discipline.

pub mod client;
pub mod error;
pub mod proto;

pub use client::ControlClient;
pub use error::{CtrlError, Result};
pub use proto::{ControlCommand, MacAddr, CTRL_CMD_SIZE, GET_MAC_RSP_SIZE, MAC_SIZE};

//! Control-channel client.
//!
//! The control channel is strictly request/reply, but the transport
//! underneath is a byte stream like any other channel: a confirm can
//! arrive in pieces and a write can be cut short. The client hides both,
//! and serializes whole exchanges so concurrent callers cannot pair one
//! caller's command with another caller's confirm.

use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use muxnic_transport::{ChanMux, ChannelConfig, ChannelId};

use crate::error::{CtrlError, Result};
use crate::proto::{ControlCommand, MacAddr, MAC_SIZE};

/// Client side of the control protocol.
///
/// Clones share one exchange lock, so any number of handles can issue
/// commands concurrently.
pub struct ControlClient<M> {
    mux: Arc<M>,
    channel: ChannelConfig,
    exchange: Arc<Mutex<()>>,
}

impl<M> Clone for ControlClient<M> {
    fn clone(&self) -> Self {
        Self {
            mux: Arc::clone(&self.mux),
            channel: self.channel,
            exchange: Arc::clone(&self.exchange),
        }
    }
}

impl<M: ChanMux> ControlClient<M> {
    /// Build a client speaking over `channel` on `mux`.
    pub fn new(mux: Arc<M>, channel: ChannelConfig) -> Self {
        Self {
            mux,
            channel,
            exchange: Arc::new(Mutex::new(())),
        }
    }

    /// Ask the proxy to open the data channel.
    pub fn open(&self, data_channel: ChannelId) -> Result<()> {
        self.simple_command(ControlCommand::Open, data_channel)
    }

    /// Ask the proxy to close the data channel.
    pub fn close(&self, data_channel: ChannelId) -> Result<()> {
        self.simple_command(ControlCommand::Close, data_channel)
    }

    /// Ask the proxy to pause data-channel delivery.
    ///
    /// After the confirm, the proxy queues frames instead of sending them
    /// and the driver may drain the channel down to silence.
    pub fn stop_read(&self, data_channel: ChannelId) -> Result<()> {
        self.simple_command(ControlCommand::StopRead, data_channel)
    }

    /// Ask the proxy to resume data-channel delivery.
    ///
    /// Delivery resumes on a frame boundary.
    pub fn start_read(&self, data_channel: ChannelId) -> Result<()> {
        self.simple_command(ControlCommand::StartRead, data_channel)
    }

    /// Query the MAC address assigned to the data channel.
    ///
    /// Fails if the proxy reports a nonzero status or an all-zero address.
    pub fn get_mac(&self, data_channel: ChannelId) -> Result<MacAddr> {
        let rsp = self.execute(ControlCommand::GetMac, data_channel)?;
        let status = rsp[1];
        if status != 0 {
            return Err(CtrlError::CommandFailed {
                command: ControlCommand::GetMac.name(),
                status,
            });
        }
        let mut octets = [0u8; MAC_SIZE];
        octets.copy_from_slice(&rsp[2..]);
        let mac = MacAddr::from(octets);
        if mac.is_zero() {
            return Err(CtrlError::NullMac);
        }
        Ok(mac)
    }

    /// Run a command whose confirm carries no payload worth returning.
    ///
    /// Only the confirm opcode is validated; the proxy sends a status byte
    /// but the protocol does not define failure semantics for it.
    fn simple_command(&self, cmd: ControlCommand, data_channel: ChannelId) -> Result<()> {
        let rsp = self.execute(cmd, data_channel)?;
        if rsp[1] != 0 {
            debug!(
                command = cmd.name(),
                status = rsp[1],
                "confirm carried nonzero status"
            );
        }
        Ok(())
    }

    /// One full command/confirm exchange under the lock.
    fn execute(&self, cmd: ControlCommand, data_channel: ChannelId) -> Result<Vec<u8>> {
        let _exchange = self.exchange.lock().map_err(|_| CtrlError::LockPoisoned)?;
        trace!(
            command = cmd.name(),
            channel = data_channel,
            "control exchange"
        );
        self.write_command(cmd, &cmd.encode(data_channel))?;
        let rsp = self.read_confirm(cmd)?;
        if rsp[0] != cmd.confirm_opcode() {
            return Err(CtrlError::UnexpectedOpcode {
                command: cmd.name(),
                expected: cmd.confirm_opcode(),
                found: rsp[0],
            });
        }
        Ok(rsp)
    }

    /// Write the command in one piece.
    fn write_command(&self, cmd: ControlCommand, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.channel.capacity {
            return Err(CtrlError::Oversized {
                len: bytes.len(),
                capacity: self.channel.capacity,
            });
        }
        let sent = self.mux.write(self.channel.id, bytes)?;
        if sent != bytes.len() {
            return Err(CtrlError::ShortWrite {
                command: cmd.name(),
                sent,
                expected: bytes.len(),
            });
        }
        Ok(())
    }

    /// Accumulate the confirm, waiting out gaps in its arrival.
    fn read_confirm(&self, cmd: ControlCommand) -> Result<Vec<u8>> {
        let want = cmd.response_len();
        if want > self.channel.capacity {
            return Err(CtrlError::Oversized {
                len: want,
                capacity: self.channel.capacity,
            });
        }
        let mut rsp = vec![0u8; want];
        let mut got = 0;
        while got < want {
            let n = self.mux.read(self.channel.id, &mut rsp[got..])?;
            if n == 0 {
                self.mux.wait(self.channel.id);
                continue;
            }
            got += n;
        }
        Ok(rsp)
    }
}

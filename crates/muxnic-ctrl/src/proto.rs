//! Control-channel wire protocol.
//!
//! Every command is 2 bytes: the opcode, then the data channel number the
//! command refers to. The proxy answers each command with a confirm whose
//! opcode is the command opcode plus one, followed by a status byte for
//! commands that carry one. Exchanges are strictly request/reply; there is
//! no unsolicited traffic on the control channel.

use std::fmt;

/// Open the data channel: `[0x00, channel]`.
pub const CMD_OPEN: u8 = 0x00;
/// Confirm for [`CMD_OPEN`]: `[0x01, status]`.
pub const RSP_OPEN: u8 = 0x01;
/// Close the data channel: `[0x02, channel]`.
pub const CMD_CLOSE: u8 = 0x02;
/// Confirm for [`CMD_CLOSE`]: `[0x03, status]`.
pub const RSP_CLOSE: u8 = 0x03;
/// Query the MAC address: `[0x04, channel]`.
pub const CMD_GET_MAC: u8 = 0x04;
/// Confirm for [`CMD_GET_MAC`]: `[0x05, status, mac[6]]`.
pub const RSP_GET_MAC: u8 = 0x05;
/// Pause data-channel delivery: `[0x06, channel]`.
pub const CMD_STOP_READ: u8 = 0x06;
/// Confirm for [`CMD_STOP_READ`]: `[0x07, status]`.
pub const RSP_STOP_READ: u8 = 0x07;
/// Resume data-channel delivery: `[0x08, channel]`.
pub const CMD_START_READ: u8 = 0x08;
/// Confirm for [`CMD_START_READ`]: `[0x09, status]`.
pub const RSP_START_READ: u8 = 0x09;

/// Wire size of every command, and of every confirm that is just
/// `[opcode, status]`.
pub const CTRL_CMD_SIZE: usize = 2;

/// Octets in a MAC address.
pub const MAC_SIZE: usize = 6;

/// Wire size of the GET_MAC confirm: opcode, status, MAC.
pub const GET_MAC_RSP_SIZE: usize = CTRL_CMD_SIZE + MAC_SIZE;

/// The commands a NIC driver issues to the multiplexer proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Open,
    Close,
    GetMac,
    StopRead,
    StartRead,
}

impl ControlCommand {
    /// Command opcode on the wire.
    pub fn opcode(self) -> u8 {
        match self {
            ControlCommand::Open => CMD_OPEN,
            ControlCommand::Close => CMD_CLOSE,
            ControlCommand::GetMac => CMD_GET_MAC,
            ControlCommand::StopRead => CMD_STOP_READ,
            ControlCommand::StartRead => CMD_START_READ,
        }
    }

    /// Opcode the confirm must carry.
    pub fn confirm_opcode(self) -> u8 {
        self.opcode() + 1
    }

    /// Wire size of the expected confirm.
    pub fn response_len(self) -> usize {
        match self {
            ControlCommand::GetMac => GET_MAC_RSP_SIZE,
            _ => CTRL_CMD_SIZE,
        }
    }

    /// Encode the command for `channel` into its wire form.
    pub fn encode(self, channel: u8) -> [u8; CTRL_CMD_SIZE] {
        [self.opcode(), channel]
    }

    /// Command name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ControlCommand::Open => "OPEN",
            ControlCommand::Close => "CLOSE",
            ControlCommand::GetMac => "GET_MAC",
            ControlCommand::StopRead => "STOP_READ",
            ControlCommand::StartRead => "START_READ",
        }
    }
}

/// A 48-bit Ethernet MAC address.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MacAddr([u8; MAC_SIZE]);

impl MacAddr {
    /// The all-zero address, never valid for a NIC.
    pub const ZERO: MacAddr = MacAddr([0; MAC_SIZE]);

    /// The raw octets.
    pub fn octets(&self) -> [u8; MAC_SIZE] {
        self.0
    }

    /// True for the all-zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0; MAC_SIZE]
    }
}

impl From<[u8; MAC_SIZE]> for MacAddr {
    fn from(octets: [u8; MAC_SIZE]) -> Self {
        MacAddr(octets)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddr({self})")
    }
}

//! Frame data types

use std::fmt;

/// MAC frame type (FCF bits 0-2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Beacon,
    Data,
    Ack,
    MacCommand,
    Unknown,
}

impl From<u16> for FrameType {
    fn from(value: u16) -> Self {
        match value & 0b111 {
            0 => Self::Beacon,
            1 => Self::Data,
            2 => Self::Ack,
            3 => Self::MacCommand,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Beacon => "Beacon",
            Self::Data => "Data",
            Self::Ack => "ACK",
            Self::MacCommand => "MAC Command",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Addressing mode for the destination or source address (2-bit FCF field)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    None,
    Short,
    Long,
    Unknown,
}

impl AddrMode {
    /// Address width in bits carried in the MAC header
    pub fn address_bits(self) -> usize {
        match self {
            Self::Short => 16,
            Self::Long => 64,
            Self::None | Self::Unknown => 0,
        }
    }
}

impl From<u16> for AddrMode {
    fn from(value: u16) -> Self {
        match value & 0b11 {
            0 => Self::None,
            2 => Self::Short,
            3 => Self::Long,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for AddrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "None",
            Self::Short => "Short (16-bit)",
            Self::Long => "Long (64-bit)",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Fields decoded from the frame control field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameControl {
    pub frame_type: FrameType,
    pub ack_requested: bool,
    pub dest_addr_mode: AddrMode,
    pub src_addr_mode: AddrMode,
}

/// Decoded MAC header
///
/// `control` is `None` when the payload is too short to carry a frame
/// control field; the hex fields are then empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedHeader {
    pub control: Option<FrameControl>,
    /// Sequence number (hex)
    pub sequence_number: String,
    /// PAN identifier (hex, display byte order)
    pub pan_id: String,
    /// Destination address (hex, display byte order)
    pub dest_address: String,
    /// Source address (hex, display byte order)
    pub src_address: String,
}

impl DecodedHeader {
    pub fn frame_type(&self) -> String {
        self.control.map(|c| c.frame_type.to_string()).unwrap_or_default()
    }

    pub fn ack_requested(&self) -> Option<bool> {
        self.control.map(|c| c.ack_requested)
    }

    pub fn dest_addr_mode(&self) -> String {
        self.control.map(|c| c.dest_addr_mode.to_string()).unwrap_or_default()
    }

    pub fn src_addr_mode(&self) -> String {
        self.control.map(|c| c.src_addr_mode.to_string()).unwrap_or_default()
    }
}

/// One decoded frame, ready for persistence
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub timestamp: String,
    /// Access code bits as received (hex)
    pub sfd: String,
    /// Length field (hex)
    pub phr: String,
    pub header: DecodedHeader,
    /// Payload without CRC (hex)
    pub psdu: String,
    /// Received CRC (hex)
    pub crc: String,
    pub crc_valid: bool,
    pub duration_ms: f64,
}

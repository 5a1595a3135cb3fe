//! BACnet network layer (NPDU).
//!
//! Every APDU travels inside an NPDU: a version octet, a control octet and
//! optional destination/source network addresses with a hop count. This
//! stack is a leaf device, not a router, so network-layer messages are
//! dropped and routing information is parsed only far enough to skip it and
//! to echo source addresses back as destinations in replies.

use thiserror::Error;

/// NPDU protocol version carried in every frame.
pub const NPDU_VERSION: u8 = 1;

/// Broadcast network number used for global broadcasts.
pub const GLOBAL_BROADCAST_NETWORK: u16 = 0xFFFF;

/// Errors from NPDU encoding and decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("NPDU truncated")]
    Truncated,
    #[error("unsupported NPDU version {0}")]
    UnsupportedVersion(u8),
    #[error("network-layer message (type {0}) not supported")]
    NetworkMessage(u8),
}

/// Network priority from the low two bits of the control octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum NetworkPriority {
    #[default]
    Normal = 0,
    Urgent = 1,
    CriticalEquipment = 2,
    LifeSafety = 3,
}

impl From<u8> for NetworkPriority {
    fn from(value: u8) -> Self {
        match value & 0x03 {
            1 => Self::Urgent,
            2 => Self::CriticalEquipment,
            3 => Self::LifeSafety,
            _ => Self::Normal,
        }
    }
}

/// Control octet flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NpduControl {
    pub network_message: bool,
    pub destination_present: bool,
    pub source_present: bool,
    pub expecting_reply: bool,
    pub priority: NetworkPriority,
}

impl NpduControl {
    pub fn to_byte(self) -> u8 {
        let mut byte = self.priority as u8;
        if self.network_message {
            byte |= 0x80;
        }
        if self.destination_present {
            byte |= 0x20;
        }
        if self.source_present {
            byte |= 0x08;
        }
        if self.expecting_reply {
            byte |= 0x04;
        }
        byte
    }

    pub fn from_byte(byte: u8) -> Self {
        Self {
            network_message: byte & 0x80 != 0,
            destination_present: byte & 0x20 != 0,
            source_present: byte & 0x08 != 0,
            expecting_reply: byte & 0x04 != 0,
            priority: NetworkPriority::from(byte),
        }
    }
}

/// A network address as carried in NPDU routing fields: a network number
/// and a variable-length MAC address (empty MAC means broadcast on that
/// network).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NetworkAddress {
    pub network: u16,
    pub address: Vec<u8>,
}

impl NetworkAddress {
    /// Destination address for a global broadcast.
    pub fn global_broadcast() -> Self {
        Self {
            network: GLOBAL_BROADCAST_NETWORK,
            address: Vec::new(),
        }
    }

    fn encode(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.network.to_be_bytes());
        buffer.push(self.address.len() as u8);
        buffer.extend_from_slice(&self.address);
    }

    fn decode(data: &[u8]) -> Result<(Self, usize), NetworkError> {
        if data.len() < 3 {
            return Err(NetworkError::Truncated);
        }
        let network = u16::from_be_bytes([data[0], data[1]]);
        let len = data[2] as usize;
        if data.len() < 3 + len {
            return Err(NetworkError::Truncated);
        }
        Ok((
            Self {
                network,
                address: data[3..3 + len].to_vec(),
            },
            3 + len,
        ))
    }
}

/// A decoded NPDU header. The APDU payload follows at the offset returned
/// by [`Npdu::decode`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Npdu {
    pub control: NpduControl,
    pub destination: Option<NetworkAddress>,
    pub source: Option<NetworkAddress>,
    pub hop_count: u8,
}

impl Npdu {
    /// Header for a locally-delivered APDU with no routing information.
    pub fn local(expecting_reply: bool) -> Self {
        Self {
            control: NpduControl {
                expecting_reply,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Header for a globally broadcast APDU.
    pub fn global_broadcast() -> Self {
        Self {
            control: NpduControl {
                destination_present: true,
                ..Default::default()
            },
            destination: Some(NetworkAddress::global_broadcast()),
            hop_count: 255,
            ..Default::default()
        }
    }

    /// Encode the header, followed by nothing: callers append the APDU.
    pub fn encode(&self, buffer: &mut Vec<u8>) {
        buffer.push(NPDU_VERSION);
        buffer.push(self.control.to_byte());
        if let Some(dest) = &self.destination {
            dest.encode(buffer);
        }
        if let Some(src) = &self.source {
            src.encode(buffer);
        }
        if self.destination.is_some() {
            buffer.push(self.hop_count);
        }
    }

    /// Decode a header, returning it and the offset of the APDU payload.
    /// Network-layer messages are rejected up front since this device does
    /// not route.
    pub fn decode(data: &[u8]) -> Result<(Self, usize), NetworkError> {
        if data.len() < 2 {
            return Err(NetworkError::Truncated);
        }
        if data[0] != NPDU_VERSION {
            return Err(NetworkError::UnsupportedVersion(data[0]));
        }
        let control = NpduControl::from_byte(data[1]);
        let mut pos = 2;

        let destination = if control.destination_present {
            let (addr, used) = NetworkAddress::decode(&data[pos..])?;
            pos += used;
            Some(addr)
        } else {
            None
        };
        let source = if control.source_present {
            let (addr, used) = NetworkAddress::decode(&data[pos..])?;
            pos += used;
            Some(addr)
        } else {
            None
        };
        let hop_count = if control.destination_present {
            let hop = *data.get(pos).ok_or(NetworkError::Truncated)?;
            pos += 1;
            hop
        } else {
            0
        };

        if control.network_message {
            let msg_type = *data.get(pos).ok_or(NetworkError::Truncated)?;
            return Err(NetworkError::NetworkMessage(msg_type));
        }

        Ok((
            Self {
                control,
                destination,
                source,
                hop_count,
            },
            pos,
        ))
    }

    /// Build the reply header for a received request: if the request carried
    /// a source address, route the reply back through it as the destination.
    pub fn reply_to(&self) -> Self {
        match &self.source {
            Some(source) => Self {
                control: NpduControl {
                    destination_present: true,
                    ..Default::default()
                },
                destination: Some(source.clone()),
                source: None,
                hop_count: 255,
            },
            None => Self::local(false),
        }
    }
}

//! BACnet/IP data link (Annex J).
//!
//! Frames are BVLC messages: type octet 0x81, a function octet, a two-octet
//! length covering the whole frame, then the payload. The link binds a UDP
//! socket with broadcast enabled and a short read timeout so the caller can
//! interleave receiving with periodic work on a single thread.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use log::{debug, trace, warn};

use super::DataLinkError;

/// BVLC type octet for BACnet/IP.
pub const BVLC_TYPE: u8 = 0x81;

/// Standard BACnet/IP UDP port.
pub const BACNET_IP_PORT: u16 = 0xBAC0;

/// Header length: type, function, two length octets.
const BVLC_HEADER_LEN: usize = 4;

/// Read timeout so the run loop can service timers between datagrams.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// BVLC function codes this device understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BvlcFunction {
    ForwardedNpdu = 0x04,
    OriginalUnicastNpdu = 0x0A,
    OriginalBroadcastNpdu = 0x0B,
}

impl TryFrom<u8> for BvlcFunction {
    type Error = DataLinkError;

    fn try_from(value: u8) -> Result<Self, DataLinkError> {
        match value {
            0x04 => Ok(Self::ForwardedNpdu),
            0x0A => Ok(Self::OriginalUnicastNpdu),
            0x0B => Ok(Self::OriginalBroadcastNpdu),
            other => Err(DataLinkError::UnsupportedFunction(other)),
        }
    }
}

/// BVLC frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BvlcHeader {
    pub function: BvlcFunction,
    /// Total frame length including the four header octets.
    pub length: u16,
}

impl BvlcHeader {
    pub fn new(function: BvlcFunction, payload_len: usize) -> Self {
        Self {
            function,
            length: (payload_len + BVLC_HEADER_LEN) as u16,
        }
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) {
        buffer.push(BVLC_TYPE);
        buffer.push(self.function as u8);
        buffer.extend_from_slice(&self.length.to_be_bytes());
    }

    pub fn decode(data: &[u8]) -> Result<Self, DataLinkError> {
        if data.len() < BVLC_HEADER_LEN {
            return Err(DataLinkError::InvalidFrame("frame too short".into()));
        }
        if data[0] != BVLC_TYPE {
            return Err(DataLinkError::InvalidFrame(format!(
                "bad BVLC type 0x{:02X}",
                data[0]
            )));
        }
        let function = BvlcFunction::try_from(data[1])?;
        let length = u16::from_be_bytes([data[2], data[3]]);
        if (length as usize) != data.len() {
            return Err(DataLinkError::InvalidFrame(format!(
                "length field {} does not match frame size {}",
                length,
                data.len()
            )));
        }
        Ok(Self { function, length })
    }
}

/// An NPDU received from the link, with its origin.
#[derive(Debug, Clone)]
pub struct ReceivedFrame {
    pub source: SocketAddr,
    pub function: BvlcFunction,
    pub npdu: Vec<u8>,
}

/// A bound BACnet/IP socket.
pub struct BacnetIpLink {
    socket: UdpSocket,
    broadcast_addr: SocketAddr,
    buffer: [u8; 1500],
}

impl BacnetIpLink {
    /// Bind to the given address with broadcast enabled and a 100 ms read
    /// timeout.
    pub fn bind(addr: SocketAddr) -> Result<Self, DataLinkError> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_broadcast(true)?;
        socket.set_read_timeout(Some(READ_TIMEOUT))?;
        let broadcast_addr =
            SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, addr.port()));
        debug!("BACnet/IP link bound to {}", socket.local_addr()?);
        Ok(Self {
            socket,
            broadcast_addr,
            buffer: [0u8; 1500],
        })
    }

    /// Local address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, DataLinkError> {
        Ok(self.socket.local_addr()?)
    }

    /// Wait up to the read timeout for a frame. Returns `Ok(None)` when the
    /// timeout elapses; malformed frames are logged and also yield `None`
    /// so one bad peer cannot stall the loop.
    pub fn receive(&mut self) -> Result<Option<ReceivedFrame>, DataLinkError> {
        let (len, source) = match self.socket.recv_from(&mut self.buffer) {
            Ok(result) => result,
            Err(e) if would_block(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let frame = &self.buffer[..len];
        trace!("recv {} bytes from {}: {}", len, source, hex::encode(frame));

        match Self::unwrap_frame(frame) {
            Ok((function, npdu)) => Ok(Some(ReceivedFrame {
                source,
                function,
                npdu,
            })),
            Err(e) => {
                warn!("dropping frame from {source}: {e}");
                Ok(None)
            }
        }
    }

    /// Strip the BVLC framing, returning the function and NPDU payload.
    /// Forwarded-NPDU carries the originator's 6-octet B/IP address before
    /// the NPDU; it is skipped since replies go to the forwarding BBMD.
    fn unwrap_frame(frame: &[u8]) -> Result<(BvlcFunction, Vec<u8>), DataLinkError> {
        let header = BvlcHeader::decode(frame)?;
        let payload = &frame[BVLC_HEADER_LEN..];
        let npdu = match header.function {
            BvlcFunction::ForwardedNpdu => {
                if payload.len() < 6 {
                    return Err(DataLinkError::InvalidFrame(
                        "forwarded NPDU missing originator address".into(),
                    ));
                }
                payload[6..].to_vec()
            }
            _ => payload.to_vec(),
        };
        Ok((header.function, npdu))
    }

    /// Send an NPDU as an Original-Unicast-NPDU to one peer.
    pub fn send_unicast(&self, npdu: &[u8], dest: SocketAddr) -> Result<(), DataLinkError> {
        let frame = Self::wrap_frame(BvlcFunction::OriginalUnicastNpdu, npdu);
        trace!("send {} bytes to {}: {}", frame.len(), dest, hex::encode(&frame));
        self.socket.send_to(&frame, dest)?;
        Ok(())
    }

    /// Send an NPDU as an Original-Broadcast-NPDU to the local broadcast
    /// address.
    pub fn send_broadcast(&self, npdu: &[u8]) -> Result<(), DataLinkError> {
        let frame = Self::wrap_frame(BvlcFunction::OriginalBroadcastNpdu, npdu);
        trace!(
            "broadcast {} bytes to {}: {}",
            frame.len(),
            self.broadcast_addr,
            hex::encode(&frame)
        );
        self.socket.send_to(&frame, self.broadcast_addr)?;
        Ok(())
    }

    fn wrap_frame(function: BvlcFunction, npdu: &[u8]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(BVLC_HEADER_LEN + npdu.len());
        BvlcHeader::new(function, npdu.len()).encode(&mut frame);
        frame.extend_from_slice(npdu);
        frame
    }
}

fn would_block(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

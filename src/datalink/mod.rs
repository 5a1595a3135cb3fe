//! Data link layer.
//!
//! Only BACnet/IP (Annex J) is implemented; the virtual device binds a UDP
//! socket and exchanges BVLC-framed NPDUs with peers on the local subnet.

pub mod bip;

use std::io;

use thiserror::Error;

pub use bip::{BacnetIpLink, BvlcFunction, BvlcHeader, ReceivedFrame, BACNET_IP_PORT};

/// Errors from the data link layer.
#[derive(Debug, Error)]
pub enum DataLinkError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid BVLC frame: {0}")]
    InvalidFrame(String),
    #[error("unsupported BVLC function 0x{0:02X}")]
    UnsupportedFunction(u8),
}

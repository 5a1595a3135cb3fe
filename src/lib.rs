//! # vbacnet
//!
//! A standalone BACnet/IP virtual device. The crate implements the slice
//! of the protocol a simple server needs: BVLC framing over UDP, NPDU
//! handling for a non-routing leaf device, application-tag encoding, and
//! the Who-Is/I-Am, ReadProperty and WriteProperty services, backed by an
//! object database holding a Device, an Analog Input and a Binary Input.
//!
//! The bundled `room-controller` binary runs an HVAC room simulation on
//! top of that stack: the room warms until a threshold trips a reset, and
//! a fan input reflects whether the room is hot.
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//! use vbacnet::device::{DeviceConfig, VirtualDevice};
//!
//! let running = AtomicBool::new(true);
//! let mut device = VirtualDevice::new(DeviceConfig::default())?;
//! device.run(&running)?;
//! # Ok::<(), vbacnet::Error>(())
//! ```

pub mod apdu;
pub mod app;
pub mod datalink;
pub mod device;
pub mod encoding;
pub mod network;
pub mod object;
pub mod service;
pub mod sim;

use thiserror::Error as ThisError;

pub use apdu::ApduError;
pub use datalink::DataLinkError;
pub use encoding::EncodingError;
pub use network::NetworkError;
pub use object::ObjectError;

/// Top-level error for device construction and the run loop. Per-frame
/// failures are handled inside the loop; anything surfacing here is fatal.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("data link error: {0}")]
    DataLink(#[from] DataLinkError),
    #[error("object error: {0}")]
    Object(#[from] ObjectError),
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),
}

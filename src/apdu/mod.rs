//! Application layer protocol data units.
//!
//! The first APDU octet carries the PDU type in its high nibble; the
//! remaining layout depends on the type. This device acts as a server only,
//! so it decodes incoming Confirmed-Request and Unconfirmed-Request PDUs
//! and encodes the response PDUs (SimpleAck, ComplexAck, Error, Reject,
//! Abort) plus outgoing Unconfirmed-Requests for I-Am.
//!
//! Segmentation is not supported: segmented requests are answered with an
//! Abort (segmentation-not-supported) and the advertised max APDU length
//! keeps well-behaved clients from segmenting in the first place.

use thiserror::Error;

/// Errors from APDU encoding and decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApduError {
    #[error("APDU truncated")]
    Truncated,
    #[error("unknown PDU type {0}")]
    UnknownPduType(u8),
    #[error("PDU type {0} not handled by this device")]
    UnhandledPduType(u8),
}

/// PDU types from the high nibble of the first APDU octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ApduType {
    ConfirmedRequest = 0,
    UnconfirmedRequest = 1,
    SimpleAck = 2,
    ComplexAck = 3,
    SegmentAck = 4,
    Error = 5,
    Reject = 6,
    Abort = 7,
}

impl TryFrom<u8> for ApduType {
    type Error = ApduError;

    fn try_from(value: u8) -> Result<Self, ApduError> {
        match value {
            0 => Ok(Self::ConfirmedRequest),
            1 => Ok(Self::UnconfirmedRequest),
            2 => Ok(Self::SimpleAck),
            3 => Ok(Self::ComplexAck),
            4 => Ok(Self::SegmentAck),
            5 => Ok(Self::Error),
            6 => Ok(Self::Reject),
            7 => Ok(Self::Abort),
            other => Err(ApduError::UnknownPduType(other)),
        }
    }
}

/// Reject reasons (clause 18.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RejectReason {
    Other = 0,
    BufferOverflow = 1,
    InconsistentParameters = 2,
    InvalidParameterDataType = 3,
    InvalidTag = 4,
    MissingRequiredParameter = 5,
    ParameterOutOfRange = 6,
    TooManyArguments = 7,
    UndefinedEnumeration = 8,
    UnrecognizedService = 9,
}

/// Abort reasons (clause 18.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AbortReason {
    Other = 0,
    BufferOverflow = 1,
    InvalidApduInThisState = 2,
    PreemptedByHigherPriorityTask = 3,
    SegmentationNotSupported = 4,
}

/// Maximum-APDU-length-accepted encoding used in the confirmed request
/// header (clause 20.1.2.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MaxApduSize {
    Up50 = 0,
    Up128 = 1,
    Up206 = 2,
    Up480 = 3,
    Up1024 = 4,
    Up1476 = 5,
}

impl MaxApduSize {
    /// The octet count this code stands for.
    pub fn size(self) -> u16 {
        match self {
            Self::Up50 => 50,
            Self::Up128 => 128,
            Self::Up206 => 206,
            Self::Up480 => 480,
            Self::Up1024 => 1024,
            Self::Up1476 => 1476,
        }
    }
}

/// A decoded or to-be-encoded APDU. Service parameters are kept as raw
/// bytes; the service module interprets them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Apdu {
    ConfirmedRequest {
        invoke_id: u8,
        service_choice: u8,
        parameters: Vec<u8>,
    },
    UnconfirmedRequest {
        service_choice: u8,
        parameters: Vec<u8>,
    },
    SimpleAck {
        invoke_id: u8,
        service_choice: u8,
    },
    ComplexAck {
        invoke_id: u8,
        service_choice: u8,
        parameters: Vec<u8>,
    },
    Error {
        invoke_id: u8,
        service_choice: u8,
        /// Pre-encoded error class and code (two Enumerated values).
        parameters: Vec<u8>,
    },
    Reject {
        invoke_id: u8,
        reason: RejectReason,
    },
    Abort {
        invoke_id: u8,
        reason: AbortReason,
    },
}

impl Apdu {
    pub fn encode(&self, buffer: &mut Vec<u8>) {
        match self {
            Self::ConfirmedRequest {
                invoke_id,
                service_choice,
                parameters,
            } => {
                buffer.push((ApduType::ConfirmedRequest as u8) << 4);
                // max-segments 0, max-APDU 1476
                buffer.push(MaxApduSize::Up1476 as u8);
                buffer.push(*invoke_id);
                buffer.push(*service_choice);
                buffer.extend_from_slice(parameters);
            }
            Self::UnconfirmedRequest {
                service_choice,
                parameters,
            } => {
                buffer.push((ApduType::UnconfirmedRequest as u8) << 4);
                buffer.push(*service_choice);
                buffer.extend_from_slice(parameters);
            }
            Self::SimpleAck {
                invoke_id,
                service_choice,
            } => {
                buffer.push((ApduType::SimpleAck as u8) << 4);
                buffer.push(*invoke_id);
                buffer.push(*service_choice);
            }
            Self::ComplexAck {
                invoke_id,
                service_choice,
                parameters,
            } => {
                buffer.push((ApduType::ComplexAck as u8) << 4);
                buffer.push(*invoke_id);
                buffer.push(*service_choice);
                buffer.extend_from_slice(parameters);
            }
            Self::Error {
                invoke_id,
                service_choice,
                parameters,
            } => {
                buffer.push((ApduType::Error as u8) << 4);
                buffer.push(*invoke_id);
                buffer.push(*service_choice);
                buffer.extend_from_slice(parameters);
            }
            Self::Reject { invoke_id, reason } => {
                buffer.push((ApduType::Reject as u8) << 4);
                buffer.push(*invoke_id);
                buffer.push(*reason as u8);
            }
            Self::Abort { invoke_id, reason } => {
                buffer.push((ApduType::Abort as u8) << 4);
                buffer.push(*invoke_id);
                buffer.push(*reason as u8);
            }
        }
    }

    /// Decode an incoming APDU. A server only needs the request types;
    /// anything else (acks, segment acks addressed to us) is reported as
    /// unhandled so the dispatcher can drop it with a log line.
    ///
    /// Returns the APDU; a segmented confirmed request decodes to its
    /// header fields so the dispatcher can abort the transaction.
    pub fn decode(data: &[u8]) -> Result<DecodedApdu, ApduError> {
        let first = *data.first().ok_or(ApduError::Truncated)?;
        let pdu_type = ApduType::try_from(first >> 4)?;
        match pdu_type {
            ApduType::ConfirmedRequest => {
                // type octet, max-segments/max-APDU octet, invoke id,
                // [sequence number, proposed window] if segmented, choice
                let segmented = first & 0x08 != 0;
                if data.len() < 4 {
                    return Err(ApduError::Truncated);
                }
                let invoke_id = data[2];
                if segmented {
                    return Ok(DecodedApdu::SegmentedRequest { invoke_id });
                }
                Ok(DecodedApdu::Apdu(Apdu::ConfirmedRequest {
                    invoke_id,
                    service_choice: data[3],
                    parameters: data[4..].to_vec(),
                }))
            }
            ApduType::UnconfirmedRequest => {
                if data.len() < 2 {
                    return Err(ApduError::Truncated);
                }
                Ok(DecodedApdu::Apdu(Apdu::UnconfirmedRequest {
                    service_choice: data[1],
                    parameters: data[2..].to_vec(),
                }))
            }
            other => Err(ApduError::UnhandledPduType(other as u8)),
        }
    }
}

/// Outcome of decoding an incoming APDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedApdu {
    Apdu(Apdu),
    /// A segmented confirmed request: only the invoke id is recovered, so
    /// the dispatcher can send an Abort.
    SegmentedRequest { invoke_id: u8 },
}

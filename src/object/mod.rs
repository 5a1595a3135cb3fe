//! BACnet object model.
//!
//! Objects are property bags addressed by an [`ObjectIdentifier`]. The
//! [`BacnetObject`] trait is the seam between the service layer and the
//! concrete object types; the database stores objects behind it.

pub mod analog;
pub mod binary;
pub mod database;
pub mod device;

use thiserror::Error;

pub use analog::{AnalogInput, EngineeringUnits};
pub use binary::{BinaryInput, BinaryPv, Polarity};
pub use database::ObjectDatabase;
pub use device::{Device, DeviceStatus, Segmentation, ServicesSupported};

/// BACnet object types used by this stack (clause 21, BACnetObjectType).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ObjectType {
    AnalogInput = 0,
    BinaryInput = 3,
    Device = 8,
}

impl TryFrom<u16> for ObjectType {
    type Error = ObjectError;

    fn try_from(value: u16) -> Result<Self, ObjectError> {
        match value {
            0 => Ok(Self::AnalogInput),
            3 => Ok(Self::BinaryInput),
            8 => Ok(Self::Device),
            other => Err(ObjectError::UnsupportedObjectType(other)),
        }
    }
}

/// Object identifier: object type plus 22-bit instance number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectIdentifier {
    pub object_type: ObjectType,
    pub instance: u32,
}

impl ObjectIdentifier {
    pub const MAX_INSTANCE: u32 = 0x3F_FFFF;

    pub fn new(object_type: ObjectType, instance: u32) -> Self {
        Self {
            object_type,
            instance: instance & Self::MAX_INSTANCE,
        }
    }
}

impl std::fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}:{}", self.object_type, self.instance)
    }
}

/// Property identifiers used by this stack (clause 21,
/// BACnetPropertyIdentifier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PropertyIdentifier {
    ApduTimeout = 11,
    ApplicationSoftwareVersion = 12,
    DatabaseRevision = 155,
    EventState = 36,
    FirmwareRevision = 44,
    LocalDate = 56,
    LocalTime = 57,
    MaxApduLengthAccepted = 62,
    ModelName = 70,
    NumberOfApduRetries = 73,
    ObjectIdentifier = 75,
    ObjectList = 76,
    ObjectName = 77,
    ObjectType = 79,
    OutOfService = 81,
    Polarity = 84,
    PresentValue = 85,
    ProtocolRevision = 139,
    ProtocolServicesSupported = 97,
    ProtocolVersion = 98,
    Reliability = 103,
    SegmentationSupported = 107,
    StatusFlags = 111,
    SystemStatus = 112,
    Units = 117,
    VendorIdentifier = 120,
    VendorName = 121,
}

impl TryFrom<u32> for PropertyIdentifier {
    type Error = ObjectError;

    fn try_from(value: u32) -> Result<Self, ObjectError> {
        match value {
            11 => Ok(Self::ApduTimeout),
            12 => Ok(Self::ApplicationSoftwareVersion),
            155 => Ok(Self::DatabaseRevision),
            36 => Ok(Self::EventState),
            44 => Ok(Self::FirmwareRevision),
            56 => Ok(Self::LocalDate),
            57 => Ok(Self::LocalTime),
            62 => Ok(Self::MaxApduLengthAccepted),
            70 => Ok(Self::ModelName),
            73 => Ok(Self::NumberOfApduRetries),
            75 => Ok(Self::ObjectIdentifier),
            76 => Ok(Self::ObjectList),
            77 => Ok(Self::ObjectName),
            79 => Ok(Self::ObjectType),
            81 => Ok(Self::OutOfService),
            84 => Ok(Self::Polarity),
            85 => Ok(Self::PresentValue),
            139 => Ok(Self::ProtocolRevision),
            97 => Ok(Self::ProtocolServicesSupported),
            98 => Ok(Self::ProtocolVersion),
            103 => Ok(Self::Reliability),
            107 => Ok(Self::SegmentationSupported),
            111 => Ok(Self::StatusFlags),
            112 => Ok(Self::SystemStatus),
            117 => Ok(Self::Units),
            120 => Ok(Self::VendorIdentifier),
            121 => Ok(Self::VendorName),
            other => Err(ObjectError::UnknownProperty(other)),
        }
    }
}

bitflags::bitflags! {
    /// Status-Flags bit string: in-alarm, fault, overridden, out-of-service.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StatusFlags: u8 {
        const IN_ALARM = 0b1000;
        const FAULT = 0b0100;
        const OVERRIDDEN = 0b0010;
        const OUT_OF_SERVICE = 0b0001;
    }
}

impl StatusFlags {
    /// Bits in transmission order for a 4-bit bit string.
    pub fn to_bit_string(self) -> (u8, u8) {
        // (unused bits, packed bits left-aligned)
        (4, self.bits() << 4)
    }
}

/// A property value as held by objects and moved through services.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Boolean(bool),
    Unsigned(u32),
    Signed(i32),
    Real(f32),
    CharacterString(String),
    Enumerated(u32),
    ObjectId(ObjectIdentifier),
    /// Status-Flags rendered as a bit string.
    BitString(StatusFlags),
    /// Protocol_Services_Supported rendered as a 40-bit bit string.
    ServicesSupported(ServicesSupported),
    Date(chrono::NaiveDate),
    Time(chrono::NaiveTime),
    /// A BACnetARRAY of object identifiers (Object_List).
    ObjectList(Vec<ObjectIdentifier>),
}

/// Errors raised by object property access. The service layer maps these
/// to BACnet Error PDUs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectError {
    #[error("unknown object")]
    UnknownObject,
    #[error("unknown property {0}")]
    UnknownProperty(u32),
    #[error("property not supported by this object")]
    PropertyNotSupported,
    #[error("property is not writable")]
    WriteAccessDenied,
    #[error("value has the wrong datatype for this property")]
    InvalidDataType,
    #[error("value out of range")]
    ValueOutOfRange,
    #[error("unsupported object type {0}")]
    UnsupportedObjectType(u16),
    #[error("object {0} already exists")]
    DuplicateObject(ObjectIdentifier),
    #[error("property is an array; index required or out of bounds")]
    InvalidArrayIndex,
}

/// Behavior common to every BACnet object in the database.
pub trait BacnetObject: Send {
    /// The object's identifier.
    fn identifier(&self) -> ObjectIdentifier;

    /// The object's name (Object_Name property).
    fn object_name(&self) -> &str;

    /// Read a property.
    fn get_property(&self, property: PropertyIdentifier) -> Result<PropertyValue, ObjectError>;

    /// Write a property. Implementations enforce writability and datatype.
    fn set_property(
        &mut self,
        property: PropertyIdentifier,
        value: PropertyValue,
    ) -> Result<(), ObjectError>;

    /// Whether a property currently accepts writes.
    fn is_property_writable(&self, property: PropertyIdentifier) -> bool;

    /// The properties this object exposes.
    fn property_list(&self) -> Vec<PropertyIdentifier>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_masked_to_22_bits() {
        let id = ObjectIdentifier::new(ObjectType::Device, 0xFF_FFFF);
        assert_eq!(id.instance, 0x3F_FFFF);
    }

    #[test]
    fn object_type_codes() {
        assert_eq!(ObjectType::try_from(0).unwrap(), ObjectType::AnalogInput);
        assert_eq!(ObjectType::try_from(3).unwrap(), ObjectType::BinaryInput);
        assert_eq!(ObjectType::try_from(8).unwrap(), ObjectType::Device);
        assert!(ObjectType::try_from(1).is_err()); // analog-output
    }

    #[test]
    fn status_flags_bit_string() {
        let flags = StatusFlags::OUT_OF_SERVICE;
        let (unused, bits) = flags.to_bit_string();
        assert_eq!(unused, 4);
        assert_eq!(bits, 0b0001_0000);

        let (_, none) = StatusFlags::default().to_bit_string();
        assert_eq!(none, 0);
    }

    #[test]
    fn property_identifier_codes() {
        assert_eq!(
            PropertyIdentifier::try_from(85).unwrap(),
            PropertyIdentifier::PresentValue
        );
        assert_eq!(
            PropertyIdentifier::try_from(76).unwrap(),
            PropertyIdentifier::ObjectList
        );
        assert!(matches!(
            PropertyIdentifier::try_from(999),
            Err(ObjectError::UnknownProperty(999))
        ));
    }
}

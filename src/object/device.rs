//! Device object.
//!
//! Exactly one Device object exists per virtual device; it advertises the
//! device's identity and protocol capabilities and answers for the
//! Object_List array maintained by the database.

use chrono::Local;

use super::{
    BacnetObject, ObjectError, ObjectIdentifier, ObjectType, PropertyIdentifier, PropertyValue,
    StatusFlags,
};

/// Protocol version and revision this stack implements.
pub const PROTOCOL_VERSION: u32 = 1;
pub const PROTOCOL_REVISION: u32 = 19;

/// Segmentation support advertised in I-Am (clause 21,
/// BACnetSegmentation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Segmentation {
    Both = 0,
    Transmit = 1,
    Receive = 2,
    NoSegmentation = 3,
}

/// Device system status (clause 21, BACnetDeviceStatus).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum DeviceStatus {
    Operational = 0,
    OperationalReadOnly = 1,
    DownloadRequired = 2,
    DownloadInProgress = 3,
    NonOperational = 4,
    BackupInProgress = 5,
}

bitflags::bitflags! {
    /// Protocol_Services_Supported bits, numbered per clause 21. Only the
    /// services this device executes are set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ServicesSupported: u64 {
        const READ_PROPERTY = 1 << 12;
        const WRITE_PROPERTY = 1 << 15;
        const I_AM = 1 << 26;
        const WHO_IS = 1 << 34;
    }
}

impl ServicesSupported {
    /// The 40-bit bit string in transmission order: bit number n of the
    /// service list maps to bit (7 - n % 8) of octet n / 8.
    pub fn to_bit_string(self) -> (u8, [u8; 5]) {
        let mut octets = [0u8; 5];
        for n in 0..40 {
            if self.bits() & (1u64 << n) != 0 {
                octets[n / 8] |= 0x80 >> (n % 8);
            }
        }
        (0, octets)
    }
}

/// The Device object.
pub struct Device {
    identifier: ObjectIdentifier,
    object_name: String,
    vendor_name: String,
    vendor_identifier: u16,
    model_name: String,
    firmware_revision: String,
    application_software_version: String,
    max_apdu_length_accepted: u16,
    segmentation: Segmentation,
    apdu_timeout_ms: u32,
    number_of_apdu_retries: u32,
    system_status: DeviceStatus,
    /// Mirrors the database contents; the database keeps it current.
    object_list: Vec<ObjectIdentifier>,
    database_revision: u32,
}

impl Device {
    pub fn new(instance: u32, name: impl Into<String>) -> Self {
        let identifier = ObjectIdentifier::new(ObjectType::Device, instance);
        Self {
            identifier,
            object_name: name.into(),
            vendor_name: "vbacnet".into(),
            vendor_identifier: 15,
            model_name: "Virtual BACnet Device".into(),
            firmware_revision: env!("CARGO_PKG_VERSION").into(),
            application_software_version: env!("CARGO_PKG_VERSION").into(),
            max_apdu_length_accepted: 1024,
            segmentation: Segmentation::NoSegmentation,
            apdu_timeout_ms: 3000,
            number_of_apdu_retries: 3,
            system_status: DeviceStatus::Operational,
            object_list: vec![identifier],
            database_revision: 0,
        }
    }

    pub fn with_vendor(mut self, identifier: u16, name: impl Into<String>) -> Self {
        self.vendor_identifier = identifier;
        self.vendor_name = name.into();
        self
    }

    pub fn with_model_name(mut self, model: impl Into<String>) -> Self {
        self.model_name = model.into();
        self
    }

    pub fn vendor_identifier(&self) -> u16 {
        self.vendor_identifier
    }

    pub fn max_apdu_length_accepted(&self) -> u16 {
        self.max_apdu_length_accepted
    }

    pub fn segmentation(&self) -> Segmentation {
        self.segmentation
    }

    pub fn object_list(&self) -> &[ObjectIdentifier] {
        &self.object_list
    }

    /// Record a new child object. The device's own identifier stays first.
    pub(crate) fn register_object(&mut self, id: ObjectIdentifier) {
        self.object_list.push(id);
        self.database_revision += 1;
    }

    pub(crate) fn unregister_object(&mut self, id: ObjectIdentifier) {
        self.object_list.retain(|existing| *existing != id);
        self.database_revision += 1;
    }

    fn object_list_entry(&self, index: u32) -> Result<PropertyValue, ObjectError> {
        // Index 0 is the array size per clause 12.
        if index == 0 {
            return Ok(PropertyValue::Unsigned(self.object_list.len() as u32));
        }
        self.object_list
            .get(index as usize - 1)
            .map(|id| PropertyValue::ObjectId(*id))
            .ok_or(ObjectError::InvalidArrayIndex)
    }

    /// Read a property with an optional array index (only Object_List is an
    /// array on this object).
    pub fn get_property_indexed(
        &self,
        property: PropertyIdentifier,
        index: Option<u32>,
    ) -> Result<PropertyValue, ObjectError> {
        match (property, index) {
            (PropertyIdentifier::ObjectList, Some(index)) => self.object_list_entry(index),
            (_, Some(_)) => Err(ObjectError::InvalidArrayIndex),
            (_, None) => self.get_property(property),
        }
    }
}

impl BacnetObject for Device {
    fn identifier(&self) -> ObjectIdentifier {
        self.identifier
    }

    fn object_name(&self) -> &str {
        &self.object_name
    }

    fn get_property(&self, property: PropertyIdentifier) -> Result<PropertyValue, ObjectError> {
        match property {
            PropertyIdentifier::ObjectIdentifier => Ok(PropertyValue::ObjectId(self.identifier)),
            PropertyIdentifier::ObjectName => {
                Ok(PropertyValue::CharacterString(self.object_name.clone()))
            }
            PropertyIdentifier::ObjectType => {
                Ok(PropertyValue::Enumerated(ObjectType::Device as u32))
            }
            PropertyIdentifier::SystemStatus => {
                Ok(PropertyValue::Enumerated(self.system_status as u32))
            }
            PropertyIdentifier::VendorName => {
                Ok(PropertyValue::CharacterString(self.vendor_name.clone()))
            }
            PropertyIdentifier::VendorIdentifier => {
                Ok(PropertyValue::Unsigned(self.vendor_identifier as u32))
            }
            PropertyIdentifier::ModelName => {
                Ok(PropertyValue::CharacterString(self.model_name.clone()))
            }
            PropertyIdentifier::FirmwareRevision => Ok(PropertyValue::CharacterString(
                self.firmware_revision.clone(),
            )),
            PropertyIdentifier::ApplicationSoftwareVersion => Ok(PropertyValue::CharacterString(
                self.application_software_version.clone(),
            )),
            PropertyIdentifier::ProtocolVersion => Ok(PropertyValue::Unsigned(PROTOCOL_VERSION)),
            PropertyIdentifier::ProtocolRevision => Ok(PropertyValue::Unsigned(PROTOCOL_REVISION)),
            PropertyIdentifier::MaxApduLengthAccepted => {
                Ok(PropertyValue::Unsigned(self.max_apdu_length_accepted as u32))
            }
            PropertyIdentifier::SegmentationSupported => {
                Ok(PropertyValue::Enumerated(self.segmentation as u32))
            }
            PropertyIdentifier::ProtocolServicesSupported => Ok(PropertyValue::ServicesSupported(
                ServicesSupported::READ_PROPERTY
                    | ServicesSupported::WRITE_PROPERTY
                    | ServicesSupported::I_AM
                    | ServicesSupported::WHO_IS,
            )),
            PropertyIdentifier::ApduTimeout => Ok(PropertyValue::Unsigned(self.apdu_timeout_ms)),
            PropertyIdentifier::NumberOfApduRetries => {
                Ok(PropertyValue::Unsigned(self.number_of_apdu_retries))
            }
            PropertyIdentifier::ObjectList => {
                Ok(PropertyValue::ObjectList(self.object_list.clone()))
            }
            PropertyIdentifier::DatabaseRevision => {
                Ok(PropertyValue::Unsigned(self.database_revision))
            }
            PropertyIdentifier::StatusFlags => {
                Ok(PropertyValue::BitString(StatusFlags::default()))
            }
            PropertyIdentifier::LocalDate => {
                Ok(PropertyValue::Date(Local::now().date_naive()))
            }
            PropertyIdentifier::LocalTime => Ok(PropertyValue::Time(Local::now().time())),
            _ => Err(ObjectError::PropertyNotSupported),
        }
    }

    fn set_property(
        &mut self,
        property: PropertyIdentifier,
        _value: PropertyValue,
    ) -> Result<(), ObjectError> {
        // All device properties are read-only on this stack.
        if self.get_property(property).is_ok() {
            Err(ObjectError::WriteAccessDenied)
        } else {
            Err(ObjectError::PropertyNotSupported)
        }
    }

    fn is_property_writable(&self, _property: PropertyIdentifier) -> bool {
        false
    }

    fn property_list(&self) -> Vec<PropertyIdentifier> {
        vec![
            PropertyIdentifier::ObjectIdentifier,
            PropertyIdentifier::ObjectName,
            PropertyIdentifier::ObjectType,
            PropertyIdentifier::SystemStatus,
            PropertyIdentifier::VendorName,
            PropertyIdentifier::VendorIdentifier,
            PropertyIdentifier::ModelName,
            PropertyIdentifier::FirmwareRevision,
            PropertyIdentifier::ApplicationSoftwareVersion,
            PropertyIdentifier::ProtocolVersion,
            PropertyIdentifier::ProtocolRevision,
            PropertyIdentifier::MaxApduLengthAccepted,
            PropertyIdentifier::SegmentationSupported,
            PropertyIdentifier::ProtocolServicesSupported,
            PropertyIdentifier::ApduTimeout,
            PropertyIdentifier::NumberOfApduRetries,
            PropertyIdentifier::ObjectList,
            PropertyIdentifier::DatabaseRevision,
            PropertyIdentifier::LocalDate,
            PropertyIdentifier::LocalTime,
        ]
    }
}

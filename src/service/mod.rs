//! BACnet service request and response encodings.
//!
//! Each service struct mirrors the ASN.1 production from clause 21 and
//! knows how to encode and decode its parameter block, the bytes that
//! follow the service choice octet in an APDU. Who-Is and I-Am are
//! unconfirmed; ReadProperty and WriteProperty are confirmed.

use crate::encoding::{self, EncodingError};
use crate::object::{
    ObjectError, ObjectIdentifier, ObjectType, PropertyIdentifier, PropertyValue, Segmentation,
};

/// Confirmed service choices (clause 21, BACnetConfirmedServiceChoice).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConfirmedServiceChoice {
    ReadProperty = 12,
    WriteProperty = 15,
}

impl TryFrom<u8> for ConfirmedServiceChoice {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            12 => Ok(Self::ReadProperty),
            15 => Ok(Self::WriteProperty),
            other => Err(other),
        }
    }
}

/// Unconfirmed service choices (clause 21,
/// BACnetUnconfirmedServiceChoice).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UnconfirmedServiceChoice {
    IAm = 0,
    WhoIs = 8,
}

impl TryFrom<u8> for UnconfirmedServiceChoice {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            0 => Ok(Self::IAm),
            8 => Ok(Self::WhoIs),
            other => Err(other),
        }
    }
}

/// Error classes for Error PDUs (clause 18).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorClass {
    Device = 0,
    Object = 1,
    Property = 2,
    Resources = 3,
    Security = 4,
    Services = 5,
}

/// Error codes for Error PDUs (clause 18). Only the codes this device
/// raises are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Other = 0,
    InvalidDataType = 9,
    ValueOutOfRange = 37,
    WriteAccessDenied = 40,
    UnknownObject = 31,
    UnknownProperty = 32,
    InvalidArrayIndex = 42,
}

/// Map an object-layer failure to the (class, code) pair carried in an
/// Error PDU.
pub fn error_for(error: &ObjectError) -> (ErrorClass, ErrorCode) {
    match error {
        ObjectError::UnknownObject => (ErrorClass::Object, ErrorCode::UnknownObject),
        ObjectError::UnknownProperty(_) | ObjectError::PropertyNotSupported => {
            (ErrorClass::Property, ErrorCode::UnknownProperty)
        }
        ObjectError::WriteAccessDenied => (ErrorClass::Property, ErrorCode::WriteAccessDenied),
        ObjectError::InvalidDataType => (ErrorClass::Property, ErrorCode::InvalidDataType),
        ObjectError::ValueOutOfRange => (ErrorClass::Property, ErrorCode::ValueOutOfRange),
        ObjectError::InvalidArrayIndex => (ErrorClass::Property, ErrorCode::InvalidArrayIndex),
        ObjectError::UnsupportedObjectType(_) => (ErrorClass::Object, ErrorCode::UnknownObject),
        ObjectError::DuplicateObject(_) => (ErrorClass::Object, ErrorCode::Other),
    }
}

/// Encode the parameter block of an Error PDU: error class and error code
/// as two Enumerated values.
pub fn encode_error_parameters(class: ErrorClass, code: ErrorCode) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(4);
    encoding::encode_enumerated(&mut buffer, class as u32);
    encoding::encode_enumerated(&mut buffer, code as u32);
    buffer
}

/// Who-Is request. Both limits present or both absent; an empty request
/// asks every device to respond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WhoIsRequest {
    pub low_limit: Option<u32>,
    pub high_limit: Option<u32>,
}

impl WhoIsRequest {
    pub fn encode(&self, buffer: &mut Vec<u8>) {
        if let (Some(low), Some(high)) = (self.low_limit, self.high_limit) {
            encoding::encode_context_unsigned(buffer, 0, low);
            encoding::encode_context_unsigned(buffer, 1, high);
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self, EncodingError> {
        if data.is_empty() {
            return Ok(Self::default());
        }
        let (low, used) = encoding::decode_context_unsigned(data, 0)?;
        let (high, _) = encoding::decode_context_unsigned(&data[used..], 1)?;
        Ok(Self {
            low_limit: Some(low),
            high_limit: Some(high),
        })
    }

    /// Whether a device instance falls inside the requested range.
    pub fn matches(&self, instance: u32) -> bool {
        match (self.low_limit, self.high_limit) {
            (Some(low), Some(high)) => (low..=high).contains(&instance),
            _ => true,
        }
    }
}

/// I-Am announcement: device identifier, max APDU length, segmentation
/// support and vendor identifier, all as application-tagged values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IAmRequest {
    pub device_id: ObjectIdentifier,
    pub max_apdu_length: u16,
    pub segmentation: Segmentation,
    pub vendor_id: u16,
}

impl IAmRequest {
    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), EncodingError> {
        encoding::encode_object_identifier(
            buffer,
            self.device_id.object_type as u16,
            self.device_id.instance,
        )?;
        encoding::encode_unsigned(buffer, self.max_apdu_length as u32);
        encoding::encode_enumerated(buffer, self.segmentation as u32);
        encoding::encode_unsigned(buffer, self.vendor_id as u32);
        Ok(())
    }

    pub fn decode(data: &[u8]) -> Result<Self, EncodingError> {
        let ((object_type, instance), mut pos) = encoding::decode_object_identifier(data)?;
        if object_type != ObjectType::Device as u16 {
            return Err(EncodingError::ValueOutOfRange);
        }
        let (max_apdu, used) = encoding::decode_unsigned(&data[pos..])?;
        pos += used;
        let (segmentation, used) = encoding::decode_enumerated(&data[pos..])?;
        pos += used;
        let (vendor, _) = encoding::decode_unsigned(&data[pos..])?;
        let segmentation = match segmentation {
            0 => Segmentation::Both,
            1 => Segmentation::Transmit,
            2 => Segmentation::Receive,
            3 => Segmentation::NoSegmentation,
            _ => return Err(EncodingError::ValueOutOfRange),
        };
        Ok(Self {
            device_id: ObjectIdentifier::new(ObjectType::Device, instance),
            max_apdu_length: max_apdu as u16,
            segmentation,
            vendor_id: vendor as u16,
        })
    }
}

/// ReadProperty request: object id (context 0), property id (context 1),
/// optional array index (context 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPropertyRequest {
    pub object_id: (u16, u32),
    pub property_id: u32,
    pub array_index: Option<u32>,
}

impl ReadPropertyRequest {
    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), EncodingError> {
        encoding::encode_context_object_id(buffer, 0, self.object_id.0, self.object_id.1)?;
        encoding::encode_context_enumerated(buffer, 1, self.property_id);
        if let Some(index) = self.array_index {
            encoding::encode_context_unsigned(buffer, 2, index);
        }
        Ok(())
    }

    pub fn decode(data: &[u8]) -> Result<Self, EncodingError> {
        let (object_id, mut pos) = encoding::decode_context_object_id(data, 0)?;
        let (property_id, used) = encoding::decode_context_enumerated(&data[pos..], 1)?;
        pos += used;
        let array_index = if pos < data.len() {
            let (index, _) = encoding::decode_context_unsigned(&data[pos..], 2)?;
            Some(index)
        } else {
            None
        };
        Ok(Self {
            object_id,
            property_id,
            array_index,
        })
    }
}

/// ReadProperty acknowledgement: echoes the request parameters, then the
/// value bracketed in context tag 3.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadPropertyAck {
    pub object_id: (u16, u32),
    pub property_id: u32,
    pub array_index: Option<u32>,
    pub value: PropertyValue,
}

impl ReadPropertyAck {
    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), EncodingError> {
        encoding::encode_context_object_id(buffer, 0, self.object_id.0, self.object_id.1)?;
        encoding::encode_context_enumerated(buffer, 1, self.property_id);
        if let Some(index) = self.array_index {
            encoding::encode_context_unsigned(buffer, 2, index);
        }
        encoding::encode_opening_tag(buffer, 3);
        encode_property_value(buffer, &self.value)?;
        encoding::encode_closing_tag(buffer, 3);
        Ok(())
    }

    pub fn decode(data: &[u8]) -> Result<Self, EncodingError> {
        let (object_id, mut pos) = encoding::decode_context_object_id(data, 0)?;
        let (property_id, used) = encoding::decode_context_enumerated(&data[pos..], 1)?;
        pos += used;
        let array_index = match encoding::decode_context_unsigned(&data[pos..], 2) {
            Ok((index, used)) => {
                pos += used;
                Some(index)
            }
            Err(_) => None,
        };
        let (start, end, _) = encoding::constructed_extent(&data[pos..], 3)?;
        let value = decode_property_value(&data[pos + start..pos + end], property_id)?;
        Ok(Self {
            object_id,
            property_id,
            array_index,
            value,
        })
    }
}

/// WriteProperty request: like ReadProperty plus the value in context tag 3
/// and an optional priority (context 4).
#[derive(Debug, Clone, PartialEq)]
pub struct WritePropertyRequest {
    pub object_id: (u16, u32),
    pub property_id: u32,
    pub array_index: Option<u32>,
    pub value: PropertyValue,
    pub priority: Option<u8>,
}

impl WritePropertyRequest {
    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), EncodingError> {
        encoding::encode_context_object_id(buffer, 0, self.object_id.0, self.object_id.1)?;
        encoding::encode_context_enumerated(buffer, 1, self.property_id);
        if let Some(index) = self.array_index {
            encoding::encode_context_unsigned(buffer, 2, index);
        }
        encoding::encode_opening_tag(buffer, 3);
        encode_property_value(buffer, &self.value)?;
        encoding::encode_closing_tag(buffer, 3);
        if let Some(priority) = self.priority {
            encoding::encode_context_unsigned(buffer, 4, priority as u32);
        }
        Ok(())
    }

    pub fn decode(data: &[u8]) -> Result<Self, EncodingError> {
        let (object_id, mut pos) = encoding::decode_context_object_id(data, 0)?;
        let (property_id, used) = encoding::decode_context_enumerated(&data[pos..], 1)?;
        pos += used;
        let array_index = match encoding::decode_context_unsigned(&data[pos..], 2) {
            Ok((index, used)) => {
                pos += used;
                Some(index)
            }
            Err(_) => None,
        };
        let (start, end, consumed) = encoding::constructed_extent(&data[pos..], 3)?;
        let value = decode_property_value(&data[pos + start..pos + end], property_id)?;
        pos += consumed;
        let priority = match encoding::decode_context_unsigned(&data[pos..], 4) {
            Ok((priority, _)) => Some(priority as u8),
            Err(_) => None,
        };
        Ok(Self {
            object_id,
            property_id,
            array_index,
            value,
            priority,
        })
    }
}

/// Encode a property value as application-tagged data.
pub fn encode_property_value(
    buffer: &mut Vec<u8>,
    value: &PropertyValue,
) -> Result<(), EncodingError> {
    match value {
        PropertyValue::Null => encoding::encode_null(buffer),
        PropertyValue::Boolean(v) => encoding::encode_boolean(buffer, *v),
        PropertyValue::Unsigned(v) => encoding::encode_unsigned(buffer, *v),
        PropertyValue::Signed(v) => encoding::encode_signed(buffer, *v),
        PropertyValue::Real(v) => encoding::encode_real(buffer, *v),
        PropertyValue::CharacterString(v) => encoding::encode_character_string(buffer, v),
        PropertyValue::Enumerated(v) => encoding::encode_enumerated(buffer, *v),
        PropertyValue::ObjectId(id) => {
            encoding::encode_object_identifier(buffer, id.object_type as u16, id.instance)?
        }
        PropertyValue::BitString(flags) => {
            let (unused, bits) = flags.to_bit_string();
            // Bit string: tag 8, first content octet is the unused-bit count.
            buffer.push(0x82);
            buffer.push(unused);
            buffer.push(bits);
        }
        PropertyValue::ServicesSupported(services) => {
            let (unused, octets) = services.to_bit_string();
            buffer.push(0x85);
            buffer.push(6);
            buffer.push(unused);
            buffer.extend_from_slice(&octets);
        }
        PropertyValue::ObjectList(list) => {
            for id in list {
                encoding::encode_object_identifier(buffer, id.object_type as u16, id.instance)?;
            }
        }
        PropertyValue::Date(date) => {
            use chrono::Datelike;
            encoding::encode_date(
                buffer,
                (date.year() - 1900) as u8,
                date.month() as u8,
                date.day() as u8,
                date.weekday().number_from_monday() as u8,
            );
        }
        PropertyValue::Time(time) => {
            use chrono::Timelike;
            encoding::encode_time(
                buffer,
                time.hour() as u8,
                time.minute() as u8,
                time.second() as u8,
                (time.nanosecond() / 10_000_000) as u8,
            );
        }
    }
    Ok(())
}

/// Decode an application-tagged property value. The property identifier
/// steers interpretation only where the tag alone is ambiguous
/// (Object_List is a sequence of object identifiers).
pub fn decode_property_value(data: &[u8], property_id: u32) -> Result<PropertyValue, EncodingError> {
    use crate::encoding::ApplicationTag;

    if property_id == PropertyIdentifier::ObjectList as u32 {
        let mut list = Vec::new();
        let mut pos = 0;
        // A single unsigned here is an array-size read (index 0).
        if let Ok((size, used)) = encoding::decode_unsigned(data) {
            if used == data.len() {
                return Ok(PropertyValue::Unsigned(size));
            }
        }
        while pos < data.len() {
            let ((object_type, instance), used) =
                encoding::decode_object_identifier(&data[pos..])?;
            list.push(ObjectIdentifier::new(
                ObjectType::try_from(object_type).map_err(|_| EncodingError::ValueOutOfRange)?,
                instance,
            ));
            pos += used;
        }
        return Ok(PropertyValue::ObjectList(list));
    }

    let header = encoding::decode_tag(data)?;
    if header.context {
        return Err(EncodingError::InvalidTag);
    }
    match ApplicationTag::try_from(header.number)? {
        ApplicationTag::Null => Ok(PropertyValue::Null),
        ApplicationTag::Boolean => Ok(PropertyValue::Boolean(encoding::decode_boolean(data)?.0)),
        ApplicationTag::UnsignedInt => {
            Ok(PropertyValue::Unsigned(encoding::decode_unsigned(data)?.0))
        }
        ApplicationTag::SignedInt => Ok(PropertyValue::Signed(encoding::decode_signed(data)?.0)),
        ApplicationTag::Real => Ok(PropertyValue::Real(encoding::decode_real(data)?.0)),
        ApplicationTag::CharacterString => Ok(PropertyValue::CharacterString(
            encoding::decode_character_string(data)?.0,
        )),
        ApplicationTag::Enumerated => Ok(PropertyValue::Enumerated(
            encoding::decode_enumerated(data)?.0,
        )),
        ApplicationTag::ObjectIdentifier => {
            let ((object_type, instance), _) = encoding::decode_object_identifier(data)?;
            Ok(PropertyValue::ObjectId(ObjectIdentifier::new(
                ObjectType::try_from(object_type).map_err(|_| EncodingError::ValueOutOfRange)?,
                instance,
            )))
        }
        ApplicationTag::BitString => {
            // Only the four-bit Status_Flags bit string is interpreted.
            if header.length != 2 || data.len() < header.consumed + 2 {
                return Err(EncodingError::InvalidLength(header.length));
            }
            let bits = data[header.consumed + 1] >> 4;
            Ok(PropertyValue::BitString(
                crate::object::StatusFlags::from_bits_truncate(bits),
            ))
        }
        _ => Err(EncodingError::InvalidTag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::StatusFlags;

    #[test]
    fn who_is_empty_matches_everything() {
        let request = WhoIsRequest::decode(&[]).unwrap();
        assert_eq!(request, WhoIsRequest::default());
        assert!(request.matches(0));
        assert!(request.matches(ObjectIdentifier::MAX_INSTANCE));
    }

    #[test]
    fn who_is_range_inclusive() {
        let mut buffer = Vec::new();
        WhoIsRequest {
            low_limit: Some(12000),
            high_limit: Some(12999),
        }
        .encode(&mut buffer);
        let request = WhoIsRequest::decode(&buffer).unwrap();
        assert!(request.matches(12000));
        assert!(request.matches(12345));
        assert!(request.matches(12999));
        assert!(!request.matches(11999));
        assert!(!request.matches(13000));
    }

    #[test]
    fn i_am_round_trip() {
        let announcement = IAmRequest {
            device_id: ObjectIdentifier::new(ObjectType::Device, 12345),
            max_apdu_length: 1024,
            segmentation: Segmentation::NoSegmentation,
            vendor_id: 15,
        };
        let mut buffer = Vec::new();
        announcement.encode(&mut buffer).unwrap();
        assert_eq!(IAmRequest::decode(&buffer).unwrap(), announcement);
    }

    #[test]
    fn read_property_request_optional_index() {
        let request = ReadPropertyRequest {
            object_id: (ObjectType::Device as u16, 12345),
            property_id: PropertyIdentifier::ObjectList as u32,
            array_index: Some(2),
        };
        let mut buffer = Vec::new();
        request.encode(&mut buffer).unwrap();
        assert_eq!(ReadPropertyRequest::decode(&buffer).unwrap(), request);

        let no_index = ReadPropertyRequest {
            array_index: None,
            ..request
        };
        buffer.clear();
        no_index.encode(&mut buffer).unwrap();
        assert_eq!(ReadPropertyRequest::decode(&buffer).unwrap(), no_index);
    }

    #[test]
    fn read_property_ack_brackets_value() {
        let ack = ReadPropertyAck {
            object_id: (ObjectType::AnalogInput as u16, 1),
            property_id: PropertyIdentifier::PresentValue as u32,
            array_index: None,
            value: PropertyValue::Real(72.5),
        };
        let mut buffer = Vec::new();
        ack.encode(&mut buffer).unwrap();
        // Value sits between opening tag 3E and closing tag 3F.
        assert!(buffer.contains(&0x3E));
        assert_eq!(*buffer.last().unwrap(), 0x3F);
        assert_eq!(ReadPropertyAck::decode(&buffer).unwrap(), ack);
    }

    #[test]
    fn write_property_round_trip_with_priority() {
        let request = WritePropertyRequest {
            object_id: (ObjectType::AnalogInput as u16, 1),
            property_id: PropertyIdentifier::PresentValue as u32,
            array_index: None,
            value: PropertyValue::Real(68.0),
            priority: Some(8),
        };
        let mut buffer = Vec::new();
        request.encode(&mut buffer).unwrap();
        assert_eq!(WritePropertyRequest::decode(&buffer).unwrap(), request);
    }

    #[test]
    fn status_flags_encoding() {
        let mut buffer = Vec::new();
        encode_property_value(
            &mut buffer,
            &PropertyValue::BitString(StatusFlags::OUT_OF_SERVICE),
        )
        .unwrap();
        assert_eq!(buffer, vec![0x82, 0x04, 0x10]);
        assert_eq!(
            decode_property_value(&buffer, PropertyIdentifier::StatusFlags as u32).unwrap(),
            PropertyValue::BitString(StatusFlags::OUT_OF_SERVICE)
        );
    }

    #[test]
    fn object_list_value_decoding() {
        let list = vec![
            ObjectIdentifier::new(ObjectType::Device, 12345),
            ObjectIdentifier::new(ObjectType::AnalogInput, 1),
            ObjectIdentifier::new(ObjectType::BinaryInput, 1),
        ];
        let mut buffer = Vec::new();
        encode_property_value(&mut buffer, &PropertyValue::ObjectList(list.clone())).unwrap();
        assert_eq!(
            decode_property_value(&buffer, PropertyIdentifier::ObjectList as u32).unwrap(),
            PropertyValue::ObjectList(list)
        );
    }

    #[test]
    fn error_mapping() {
        assert_eq!(
            error_for(&ObjectError::UnknownObject),
            (ErrorClass::Object, ErrorCode::UnknownObject)
        );
        assert_eq!(
            error_for(&ObjectError::WriteAccessDenied),
            (ErrorClass::Property, ErrorCode::WriteAccessDenied)
        );
        let params = encode_error_parameters(ErrorClass::Property, ErrorCode::UnknownProperty);
        assert_eq!(params, vec![0x91, 0x02, 0x91, 0x20]);
    }

    #[test]
    fn service_choice_codes() {
        assert_eq!(
            ConfirmedServiceChoice::try_from(12).unwrap(),
            ConfirmedServiceChoice::ReadProperty
        );
        assert_eq!(
            ConfirmedServiceChoice::try_from(15).unwrap(),
            ConfirmedServiceChoice::WriteProperty
        );
        assert_eq!(ConfirmedServiceChoice::try_from(14), Err(14));
        assert_eq!(
            UnconfirmedServiceChoice::try_from(8).unwrap(),
            UnconfirmedServiceChoice::WhoIs
        );
    }
}

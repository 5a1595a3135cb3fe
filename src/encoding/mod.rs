//! BACnet application-layer encoding and decoding.
//!
//! Primitive values are carried as tagged data per clause 20.2 of ASHRAE 135:
//! a tag octet (tag number, class bit, length/value/type field) optionally
//! followed by extended length octets and the content octets. This module
//! provides encoders and decoders for the application tags the stack uses,
//! plus context-specific tags and the opening/closing tags that bracket
//! constructed data in service requests.
//!
//! All decoders return the decoded value together with the number of bytes
//! consumed, so callers can walk a buffer sequentially.

use thiserror::Error;

/// Result type for encoding operations.
pub type Result<T> = std::result::Result<T, EncodingError>;

/// Errors that can occur while encoding or decoding tagged data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("unexpected end of data")]
    UnexpectedEndOfData,
    #[error("invalid tag number")]
    InvalidTag,
    #[error("tag {expected} expected, found {found}")]
    TagMismatch { expected: u8, found: u8 },
    #[error("invalid length {0} for this tag")]
    InvalidLength(usize),
    #[error("value out of range")]
    ValueOutOfRange,
    #[error("invalid character string: {0}")]
    InvalidString(String),
}

/// BACnet application tag numbers (clause 20.2.1.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ApplicationTag {
    Null = 0,
    Boolean = 1,
    UnsignedInt = 2,
    SignedInt = 3,
    Real = 4,
    Double = 5,
    OctetString = 6,
    CharacterString = 7,
    BitString = 8,
    Enumerated = 9,
    Date = 10,
    Time = 11,
    ObjectIdentifier = 12,
}

impl TryFrom<u8> for ApplicationTag {
    type Error = EncodingError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Null),
            1 => Ok(Self::Boolean),
            2 => Ok(Self::UnsignedInt),
            3 => Ok(Self::SignedInt),
            4 => Ok(Self::Real),
            5 => Ok(Self::Double),
            6 => Ok(Self::OctetString),
            7 => Ok(Self::CharacterString),
            8 => Ok(Self::BitString),
            9 => Ok(Self::Enumerated),
            10 => Ok(Self::Date),
            11 => Ok(Self::Time),
            12 => Ok(Self::ObjectIdentifier),
            _ => Err(EncodingError::InvalidTag),
        }
    }
}

/// Append a tag octet (plus extended length octets when needed).
fn push_tag(buffer: &mut Vec<u8>, tag_number: u8, context: bool, length: usize) {
    let class_bit = if context { 0x08 } else { 0x00 };
    if length < 5 {
        buffer.push((tag_number << 4) | class_bit | length as u8);
        return;
    }
    buffer.push((tag_number << 4) | class_bit | 5);
    if length < 254 {
        buffer.push(length as u8);
    } else if length < 65536 {
        buffer.push(254);
        buffer.extend_from_slice(&(length as u16).to_be_bytes());
    } else {
        buffer.push(255);
        buffer.extend_from_slice(&(length as u32).to_be_bytes());
    }
}

/// Decoded tag header: tag number, context class flag, content length and
/// the number of header bytes consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagHeader {
    pub number: u8,
    pub context: bool,
    pub length: usize,
    pub consumed: usize,
}

impl TagHeader {
    /// True if this is an opening tag for constructed data.
    pub fn is_opening(&self) -> bool {
        self.context && self.length == 6
    }

    /// True if this is a closing tag for constructed data.
    pub fn is_closing(&self) -> bool {
        self.context && self.length == 7
    }

    /// Content octets that follow the header. An application Boolean keeps
    /// its value in the length field and has no content.
    pub fn content_length(&self) -> usize {
        if !self.context && self.number == ApplicationTag::Boolean as u8 {
            0
        } else {
            self.length
        }
    }
}

/// Decode a tag octet and any extended length octets.
pub fn decode_tag(data: &[u8]) -> Result<TagHeader> {
    let first = *data.first().ok_or(EncodingError::UnexpectedEndOfData)?;
    let number = first >> 4;
    // Tag number 15 introduces an extended tag number octet
    // (clause 20.2.1.2); no tag this stack speaks uses the form.
    if number == 15 {
        return Err(EncodingError::InvalidTag);
    }
    let context = (first & 0x08) != 0;
    let mut length = (first & 0x07) as usize;
    let mut consumed = 1;

    // Opening (length field 6) and closing (7) tags keep the raw field value
    // so is_opening/is_closing can distinguish them. They carry no content.
    if context && length >= 6 {
        return Ok(TagHeader {
            number,
            context,
            length,
            consumed,
        });
    }
    if length == 5 {
        let len_byte = *data.get(1).ok_or(EncodingError::UnexpectedEndOfData)?;
        consumed += 1;
        if len_byte < 254 {
            length = len_byte as usize;
        } else if len_byte == 254 {
            if data.len() < 4 {
                return Err(EncodingError::UnexpectedEndOfData);
            }
            length = u16::from_be_bytes([data[2], data[3]]) as usize;
            consumed += 2;
        } else {
            if data.len() < 6 {
                return Err(EncodingError::UnexpectedEndOfData);
            }
            length = u32::from_be_bytes([data[2], data[3], data[4], data[5]]) as usize;
            consumed += 4;
        }
    }

    Ok(TagHeader {
        number,
        context,
        length,
        consumed,
    })
}

fn expect_application(data: &[u8], tag: ApplicationTag) -> Result<TagHeader> {
    let header = decode_tag(data)?;
    if header.context || header.number != tag as u8 {
        return Err(EncodingError::TagMismatch {
            expected: tag as u8,
            found: header.number,
        });
    }
    if data.len() < header.consumed + header.length {
        return Err(EncodingError::UnexpectedEndOfData);
    }
    Ok(header)
}

/// Minimal big-endian content octets for an unsigned value.
fn unsigned_content(value: u32) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take(3).take_while(|&&b| b == 0).count();
    bytes[skip..].to_vec()
}

fn unsigned_from_content(content: &[u8]) -> Result<u32> {
    if content.is_empty() || content.len() > 4 {
        return Err(EncodingError::InvalidLength(content.len()));
    }
    let mut value = 0u32;
    for &byte in content {
        value = (value << 8) | byte as u32;
    }
    Ok(value)
}

/// Encode a Null application value.
pub fn encode_null(buffer: &mut Vec<u8>) {
    push_tag(buffer, ApplicationTag::Null as u8, false, 0);
}

/// Encode a Boolean application value. The value rides in the length field;
/// there are no content octets.
pub fn encode_boolean(buffer: &mut Vec<u8>, value: bool) {
    push_tag(
        buffer,
        ApplicationTag::Boolean as u8,
        false,
        usize::from(value),
    );
}

/// Decode a Boolean application value.
pub fn decode_boolean(data: &[u8]) -> Result<(bool, usize)> {
    let header = decode_tag(data)?;
    if header.context || header.number != ApplicationTag::Boolean as u8 {
        return Err(EncodingError::TagMismatch {
            expected: ApplicationTag::Boolean as u8,
            found: header.number,
        });
    }
    match header.length {
        0 => Ok((false, header.consumed)),
        1 => Ok((true, header.consumed)),
        n => Err(EncodingError::InvalidLength(n)),
    }
}

/// Encode an Unsigned application value.
pub fn encode_unsigned(buffer: &mut Vec<u8>, value: u32) {
    let content = unsigned_content(value);
    push_tag(buffer, ApplicationTag::UnsignedInt as u8, false, content.len());
    buffer.extend_from_slice(&content);
}

/// Decode an Unsigned application value.
pub fn decode_unsigned(data: &[u8]) -> Result<(u32, usize)> {
    let header = expect_application(data, ApplicationTag::UnsignedInt)?;
    let content = &data[header.consumed..header.consumed + header.length];
    Ok((unsigned_from_content(content)?, header.consumed + header.length))
}

/// Encode a Signed application value.
pub fn encode_signed(buffer: &mut Vec<u8>, value: i32) {
    let bytes = value.to_be_bytes();
    // Drop redundant sign-extension octets.
    let mut skip = 0;
    while skip < 3 {
        let lead = bytes[skip];
        let next = bytes[skip + 1];
        if (lead == 0x00 && next & 0x80 == 0) || (lead == 0xFF && next & 0x80 != 0) {
            skip += 1;
        } else {
            break;
        }
    }
    let content = &bytes[skip..];
    push_tag(buffer, ApplicationTag::SignedInt as u8, false, content.len());
    buffer.extend_from_slice(content);
}

/// Decode a Signed application value.
pub fn decode_signed(data: &[u8]) -> Result<(i32, usize)> {
    let header = expect_application(data, ApplicationTag::SignedInt)?;
    let content = &data[header.consumed..header.consumed + header.length];
    if content.is_empty() || content.len() > 4 {
        return Err(EncodingError::InvalidLength(content.len()));
    }
    let fill = if content[0] & 0x80 != 0 { 0xFF } else { 0x00 };
    let mut bytes = [fill; 4];
    bytes[4 - content.len()..].copy_from_slice(content);
    Ok((i32::from_be_bytes(bytes), header.consumed + header.length))
}

/// Encode a Real (32-bit float) application value.
pub fn encode_real(buffer: &mut Vec<u8>, value: f32) {
    push_tag(buffer, ApplicationTag::Real as u8, false, 4);
    buffer.extend_from_slice(&value.to_be_bytes());
}

/// Decode a Real (32-bit float) application value.
pub fn decode_real(data: &[u8]) -> Result<(f32, usize)> {
    let header = expect_application(data, ApplicationTag::Real)?;
    if header.length != 4 {
        return Err(EncodingError::InvalidLength(header.length));
    }
    let p = header.consumed;
    let value = f32::from_be_bytes([data[p], data[p + 1], data[p + 2], data[p + 3]]);
    Ok((value, p + 4))
}

/// Encode a CharacterString application value using character set 0 (UTF-8).
pub fn encode_character_string(buffer: &mut Vec<u8>, value: &str) {
    let bytes = value.as_bytes();
    push_tag(
        buffer,
        ApplicationTag::CharacterString as u8,
        false,
        bytes.len() + 1,
    );
    buffer.push(0); // character set octet
    buffer.extend_from_slice(bytes);
}

/// Decode a CharacterString application value. Only character set 0 is
/// accepted; other character sets are rejected rather than transcoded.
pub fn decode_character_string(data: &[u8]) -> Result<(String, usize)> {
    let header = expect_application(data, ApplicationTag::CharacterString)?;
    if header.length == 0 {
        return Err(EncodingError::InvalidLength(0));
    }
    let charset = data[header.consumed];
    if charset != 0 {
        return Err(EncodingError::InvalidString(format!(
            "unsupported character set {charset}"
        )));
    }
    let content = &data[header.consumed + 1..header.consumed + header.length];
    let value = String::from_utf8(content.to_vec())
        .map_err(|_| EncodingError::InvalidString("invalid UTF-8".into()))?;
    Ok((value, header.consumed + header.length))
}

/// Encode an Enumerated application value.
pub fn encode_enumerated(buffer: &mut Vec<u8>, value: u32) {
    let content = unsigned_content(value);
    push_tag(buffer, ApplicationTag::Enumerated as u8, false, content.len());
    buffer.extend_from_slice(&content);
}

/// Decode an Enumerated application value.
pub fn decode_enumerated(data: &[u8]) -> Result<(u32, usize)> {
    let header = expect_application(data, ApplicationTag::Enumerated)?;
    let content = &data[header.consumed..header.consumed + header.length];
    Ok((unsigned_from_content(content)?, header.consumed + header.length))
}

/// Encode an ObjectIdentifier application value: 10-bit object type and
/// 22-bit instance packed into four octets (clause 20.2.14).
pub fn encode_object_identifier(
    buffer: &mut Vec<u8>,
    object_type: u16,
    instance: u32,
) -> Result<()> {
    if object_type > 0x3FF || instance > 0x3F_FFFF {
        return Err(EncodingError::ValueOutOfRange);
    }
    push_tag(buffer, ApplicationTag::ObjectIdentifier as u8, false, 4);
    let packed = ((object_type as u32) << 22) | instance;
    buffer.extend_from_slice(&packed.to_be_bytes());
    Ok(())
}

/// Decode an ObjectIdentifier application value.
pub fn decode_object_identifier(data: &[u8]) -> Result<((u16, u32), usize)> {
    let header = expect_application(data, ApplicationTag::ObjectIdentifier)?;
    if header.length != 4 {
        return Err(EncodingError::InvalidLength(header.length));
    }
    let p = header.consumed;
    let packed = u32::from_be_bytes([data[p], data[p + 1], data[p + 2], data[p + 3]]);
    Ok((((packed >> 22) as u16, packed & 0x3F_FFFF), p + 4))
}

/// Encode a Date application value: year since 1900, month, day of month,
/// day of week (Monday = 1). 0xFF in any octet means unspecified.
pub fn encode_date(buffer: &mut Vec<u8>, year: u8, month: u8, day: u8, weekday: u8) {
    push_tag(buffer, ApplicationTag::Date as u8, false, 4);
    buffer.extend_from_slice(&[year, month, day, weekday]);
}

/// Decode a Date application value as raw octets.
pub fn decode_date(data: &[u8]) -> Result<([u8; 4], usize)> {
    let header = expect_application(data, ApplicationTag::Date)?;
    if header.length != 4 {
        return Err(EncodingError::InvalidLength(header.length));
    }
    let p = header.consumed;
    Ok(([data[p], data[p + 1], data[p + 2], data[p + 3]], p + 4))
}

/// Encode a Time application value: hour, minute, second, hundredths.
pub fn encode_time(buffer: &mut Vec<u8>, hour: u8, minute: u8, second: u8, hundredths: u8) {
    push_tag(buffer, ApplicationTag::Time as u8, false, 4);
    buffer.extend_from_slice(&[hour, minute, second, hundredths]);
}

/// Decode a Time application value as raw octets.
pub fn decode_time(data: &[u8]) -> Result<([u8; 4], usize)> {
    let header = expect_application(data, ApplicationTag::Time)?;
    if header.length != 4 {
        return Err(EncodingError::InvalidLength(header.length));
    }
    let p = header.consumed;
    Ok(([data[p], data[p + 1], data[p + 2], data[p + 3]], p + 4))
}

/// Encode a context-specific unsigned value.
pub fn encode_context_unsigned(buffer: &mut Vec<u8>, tag_number: u8, value: u32) {
    let content = unsigned_content(value);
    push_tag(buffer, tag_number, true, content.len());
    buffer.extend_from_slice(&content);
}

/// Decode a context-specific unsigned value with the given tag number.
pub fn decode_context_unsigned(data: &[u8], tag_number: u8) -> Result<(u32, usize)> {
    let header = expect_context(data, tag_number)?;
    let content = &data[header.consumed..header.consumed + header.length];
    Ok((unsigned_from_content(content)?, header.consumed + header.length))
}

/// Encode a context-specific enumerated value.
pub fn encode_context_enumerated(buffer: &mut Vec<u8>, tag_number: u8, value: u32) {
    encode_context_unsigned(buffer, tag_number, value);
}

/// Decode a context-specific enumerated value with the given tag number.
pub fn decode_context_enumerated(data: &[u8], tag_number: u8) -> Result<(u32, usize)> {
    decode_context_unsigned(data, tag_number)
}

/// Encode a context-specific object identifier.
pub fn encode_context_object_id(
    buffer: &mut Vec<u8>,
    tag_number: u8,
    object_type: u16,
    instance: u32,
) -> Result<()> {
    if object_type > 0x3FF || instance > 0x3F_FFFF {
        return Err(EncodingError::ValueOutOfRange);
    }
    push_tag(buffer, tag_number, true, 4);
    let packed = ((object_type as u32) << 22) | instance;
    buffer.extend_from_slice(&packed.to_be_bytes());
    Ok(())
}

/// Decode a context-specific object identifier with the given tag number.
pub fn decode_context_object_id(data: &[u8], tag_number: u8) -> Result<((u16, u32), usize)> {
    let header = expect_context(data, tag_number)?;
    if header.length != 4 {
        return Err(EncodingError::InvalidLength(header.length));
    }
    let p = header.consumed;
    let packed = u32::from_be_bytes([data[p], data[p + 1], data[p + 2], data[p + 3]]);
    Ok((((packed >> 22) as u16, packed & 0x3F_FFFF), p + 4))
}

fn expect_context(data: &[u8], tag_number: u8) -> Result<TagHeader> {
    let header = decode_tag(data)?;
    if !header.context || header.number != tag_number || header.is_opening() || header.is_closing()
    {
        return Err(EncodingError::TagMismatch {
            expected: tag_number,
            found: header.number,
        });
    }
    if data.len() < header.consumed + header.length {
        return Err(EncodingError::UnexpectedEndOfData);
    }
    Ok(header)
}

/// Encode an opening tag for constructed data.
pub fn encode_opening_tag(buffer: &mut Vec<u8>, tag_number: u8) {
    buffer.push((tag_number << 4) | 0x0E);
}

/// Encode a closing tag for constructed data.
pub fn encode_closing_tag(buffer: &mut Vec<u8>, tag_number: u8) {
    buffer.push((tag_number << 4) | 0x0F);
}

/// Locate constructed data bracketed by opening/closing tags with the given
/// tag number, starting at the opening tag. Returns the content start and
/// end offsets plus total bytes consumed including both brackets. Nested
/// bracket pairs are skipped, not interpreted.
pub fn constructed_extent(data: &[u8], tag_number: u8) -> Result<(usize, usize, usize)> {
    let open = decode_tag(data)?;
    if !open.is_opening() || open.number != tag_number {
        return Err(EncodingError::TagMismatch {
            expected: tag_number,
            found: open.number,
        });
    }
    let start = open.consumed;
    let mut pos = start;
    let mut depth = 1u32;
    while pos < data.len() {
        let header = decode_tag(&data[pos..])?;
        if header.is_opening() {
            depth += 1;
            pos += header.consumed;
        } else if header.is_closing() {
            depth -= 1;
            if depth == 0 {
                return Ok((start, pos, pos + header.consumed));
            }
            pos += header.consumed;
        } else {
            pos += header.consumed + header.content_length();
        }
    }
    Err(EncodingError::UnexpectedEndOfData)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_value_in_length_field() {
        let mut buffer = Vec::new();
        encode_boolean(&mut buffer, true);
        assert_eq!(buffer, vec![0x11]);
        buffer.clear();
        encode_boolean(&mut buffer, false);
        assert_eq!(buffer, vec![0x10]);
        let (value, consumed) = decode_boolean(&buffer).unwrap();
        assert!(!value);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn unsigned_minimal_octets() {
        let cases = [
            (0u32, vec![0x21, 0x00]),
            (42, vec![0x21, 0x2A]),
            (256, vec![0x22, 0x01, 0x00]),
            (0x12_3456, vec![0x23, 0x12, 0x34, 0x56]),
            (u32::MAX, vec![0x24, 0xFF, 0xFF, 0xFF, 0xFF]),
        ];
        for (value, expected) in cases {
            let mut buffer = Vec::new();
            encode_unsigned(&mut buffer, value);
            assert_eq!(buffer, expected, "value {value}");
            let (decoded, consumed) = decode_unsigned(&buffer).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(consumed, buffer.len());
        }
    }

    #[test]
    fn signed_sign_extension() {
        for value in [-8_388_608, -32769, -129, -1, 0, 1, 127, 128, 8_388_607] {
            let mut buffer = Vec::new();
            encode_signed(&mut buffer, value);
            let (decoded, _) = decode_signed(&buffer).unwrap();
            assert_eq!(decoded, value);
        }
        // -1 must be a single 0xFF octet, not four.
        let mut buffer = Vec::new();
        encode_signed(&mut buffer, -1);
        assert_eq!(buffer, vec![0x31, 0xFF]);
    }

    #[test]
    fn real_round_trip() {
        let mut buffer = Vec::new();
        encode_real(&mut buffer, 70.5);
        assert_eq!(buffer[0], 0x44);
        let (value, consumed) = decode_real(&buffer).unwrap();
        assert_eq!(value, 70.5);
        assert_eq!(consumed, 5);
    }

    #[test]
    fn character_string_charset_octet() {
        // "Fan" plus the charset octet is 4 content octets, short form:
        // the charset sits right after the tag octet.
        let mut buffer = Vec::new();
        encode_character_string(&mut buffer, "Fan");
        assert_eq!(buffer[0], 0x74);
        assert_eq!(buffer[1], 0);
        let (value, _) = decode_character_string(&buffer).unwrap();
        assert_eq!(value, "Fan");

        // "RoomTemp" needs the extended-length form: tag octet, length
        // octet (9), then the charset octet.
        buffer.clear();
        encode_character_string(&mut buffer, "RoomTemp");
        assert_eq!(&buffer[..3], &[0x75, 9, 0]);
        let (value, _) = decode_character_string(&buffer).unwrap();
        assert_eq!(value, "RoomTemp");

        // Non-zero character set is rejected.
        let mut bad = buffer.clone();
        bad[2] = 4; // UCS-2
        assert!(decode_character_string(&bad).is_err());
    }

    #[test]
    fn long_character_string_extended_length() {
        let long = "x".repeat(300);
        let mut buffer = Vec::new();
        encode_character_string(&mut buffer, &long);
        // tag octet, 254 marker, two length octets
        assert_eq!(buffer[0], 0x75);
        assert_eq!(buffer[1], 254);
        let (value, consumed) = decode_character_string(&buffer).unwrap();
        assert_eq!(value, long);
        assert_eq!(consumed, buffer.len());
    }

    #[test]
    fn object_identifier_packing() {
        let mut buffer = Vec::new();
        encode_object_identifier(&mut buffer, 8, 12345).unwrap();
        assert_eq!(buffer, vec![0xC4, 0x02, 0x00, 0x30, 0x39]);
        let ((object_type, instance), _) = decode_object_identifier(&buffer).unwrap();
        assert_eq!(object_type, 8);
        assert_eq!(instance, 12345);

        assert_eq!(
            encode_object_identifier(&mut Vec::new(), 0x400, 0),
            Err(EncodingError::ValueOutOfRange)
        );
        assert_eq!(
            encode_object_identifier(&mut Vec::new(), 0, 0x40_0000),
            Err(EncodingError::ValueOutOfRange)
        );
    }

    #[test]
    fn context_tags_carry_class_bit() {
        let mut buffer = Vec::new();
        encode_context_unsigned(&mut buffer, 0, 12345);
        assert_eq!(buffer[0], 0x0A); // tag 0, context class, length 2
        let (value, _) = decode_context_unsigned(&buffer, 0).unwrap();
        assert_eq!(value, 12345);

        // Wrong tag number fails.
        assert!(decode_context_unsigned(&buffer, 1).is_err());
        // Application decoder refuses a context tag.
        assert!(decode_unsigned(&buffer).is_err());
    }

    #[test]
    fn opening_closing_tags() {
        let mut buffer = Vec::new();
        encode_opening_tag(&mut buffer, 3);
        encode_closing_tag(&mut buffer, 3);
        assert_eq!(buffer, vec![0x3E, 0x3F]);
        assert!(decode_tag(&buffer).unwrap().is_opening());
        assert!(decode_tag(&buffer[1..]).unwrap().is_closing());
    }

    #[test]
    fn constructed_extent_steps_over_boolean() {
        // Boolean true has no content octets; the walker must not skip past
        // the closing tag.
        let mut buffer = Vec::new();
        encode_opening_tag(&mut buffer, 3);
        encode_boolean(&mut buffer, true);
        encode_closing_tag(&mut buffer, 3);
        let (start, end, consumed) = constructed_extent(&buffer, 3).unwrap();
        assert_eq!((start, end, consumed), (1, 2, 3));
    }

    #[test]
    fn constructed_extent_skips_nested_brackets() {
        let mut buffer = Vec::new();
        encode_opening_tag(&mut buffer, 3);
        encode_real(&mut buffer, 70.0);
        encode_opening_tag(&mut buffer, 1);
        encode_unsigned(&mut buffer, 9);
        encode_closing_tag(&mut buffer, 1);
        encode_closing_tag(&mut buffer, 3);

        let (start, end, consumed) = constructed_extent(&buffer, 3).unwrap();
        assert_eq!(start, 1);
        assert_eq!(end, buffer.len() - 1);
        assert_eq!(consumed, buffer.len());

        // A value inside the brackets decodes cleanly.
        let (value, _) = decode_real(&buffer[start..end]).unwrap();
        assert_eq!(value, 70.0);
    }

    #[test]
    fn extended_tag_number_rejected() {
        // High nibble 15 announces an extended tag number octet; the
        // decoder refuses it rather than misreading 15 as the tag.
        assert_eq!(decode_tag(&[0xF9, 0x40, 0x01]), Err(EncodingError::InvalidTag));
        assert_eq!(decode_tag(&[0xF1, 0x20, 0x2A]), Err(EncodingError::InvalidTag));
    }

    #[test]
    fn truncated_buffers_fail_cleanly() {
        let mut buffer = Vec::new();
        encode_real(&mut buffer, 1.0);
        assert_eq!(
            decode_real(&buffer[..3]),
            Err(EncodingError::UnexpectedEndOfData)
        );
        assert_eq!(decode_tag(&[]), Err(EncodingError::UnexpectedEndOfData));
    }
}

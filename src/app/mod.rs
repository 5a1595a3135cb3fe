//! Application-layer dispatcher.
//!
//! Takes the NPDU payload of a received frame, interprets the APDU inside
//! it and produces the reply frames to send. The dispatcher is pure with
//! respect to I/O: it consumes bytes and returns [`Outgoing`] actions, and
//! the run loop in [`crate::device`] moves them onto the socket. That keeps
//! every request/response path testable without a socket.

use log::{debug, warn};

use crate::apdu::{AbortReason, Apdu, DecodedApdu, RejectReason};
use crate::network::Npdu;
use crate::object::{
    BacnetObject, ObjectDatabase, ObjectError, ObjectIdentifier, ObjectType, PropertyIdentifier,
};
use crate::service::{
    self, ConfirmedServiceChoice, IAmRequest, ReadPropertyAck, ReadPropertyRequest,
    UnconfirmedServiceChoice, WhoIsRequest, WritePropertyRequest,
};

/// Where an outgoing NPDU should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// Unicast back to the peer the request came from.
    Reply(Vec<u8>),
    /// Broadcast on the local network.
    Broadcast(Vec<u8>),
}

/// Handle one received NPDU. Returns the frames to transmit; malformed
/// input that cannot be answered is logged and dropped, never fatal.
pub fn handle_npdu(db: &mut ObjectDatabase, data: &[u8]) -> Vec<Outgoing> {
    let (npdu, offset) = match Npdu::decode(data) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("dropping NPDU: {e}");
            return Vec::new();
        }
    };
    let apdu = match Apdu::decode(&data[offset..]) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("dropping APDU: {e}");
            return Vec::new();
        }
    };

    match apdu {
        DecodedApdu::SegmentedRequest { invoke_id } => {
            debug!("aborting segmented request, invoke id {invoke_id}");
            vec![reply(
                &npdu,
                Apdu::Abort {
                    invoke_id,
                    reason: AbortReason::SegmentationNotSupported,
                },
            )]
        }
        DecodedApdu::Apdu(Apdu::ConfirmedRequest {
            invoke_id,
            service_choice,
            parameters,
        }) => handle_confirmed(db, &npdu, invoke_id, service_choice, &parameters),
        DecodedApdu::Apdu(Apdu::UnconfirmedRequest {
            service_choice,
            parameters,
        }) => handle_unconfirmed(db, service_choice, &parameters),
        DecodedApdu::Apdu(other) => {
            debug!("ignoring unexpected APDU: {other:?}");
            Vec::new()
        }
    }
}

fn handle_confirmed(
    db: &mut ObjectDatabase,
    npdu: &Npdu,
    invoke_id: u8,
    service_choice: u8,
    parameters: &[u8],
) -> Vec<Outgoing> {
    let choice = match ConfirmedServiceChoice::try_from(service_choice) {
        Ok(choice) => choice,
        Err(other) => {
            debug!("rejecting unrecognized confirmed service {other}");
            return vec![reply(
                npdu,
                Apdu::Reject {
                    invoke_id,
                    reason: RejectReason::UnrecognizedService,
                },
            )];
        }
    };

    let response = match choice {
        ConfirmedServiceChoice::ReadProperty => read_property(db, invoke_id, parameters),
        ConfirmedServiceChoice::WriteProperty => write_property(db, invoke_id, parameters),
    };
    vec![reply(npdu, response)]
}

fn read_property(db: &ObjectDatabase, invoke_id: u8, parameters: &[u8]) -> Apdu {
    let request = match ReadPropertyRequest::decode(parameters) {
        Ok(request) => request,
        Err(e) => {
            warn!("malformed ReadProperty request: {e}");
            return Apdu::Reject {
                invoke_id,
                reason: RejectReason::InvalidTag,
            };
        }
    };

    let result = resolve(request.object_id, request.property_id)
        .and_then(|(id, property)| db.read_property(id, property, request.array_index));
    match result {
        Ok(value) => {
            let ack = ReadPropertyAck {
                object_id: request.object_id,
                property_id: request.property_id,
                array_index: request.array_index,
                value,
            };
            let mut parameters = Vec::new();
            match ack.encode(&mut parameters) {
                Ok(()) => Apdu::ComplexAck {
                    invoke_id,
                    service_choice: ConfirmedServiceChoice::ReadProperty as u8,
                    parameters,
                },
                Err(e) => {
                    warn!("failed to encode ReadProperty ack: {e}");
                    error_apdu(
                        invoke_id,
                        ConfirmedServiceChoice::ReadProperty,
                        &ObjectError::ValueOutOfRange,
                    )
                }
            }
        }
        Err(e) => {
            debug!(
                "ReadProperty {}:{} property {} failed: {e}",
                request.object_id.0, request.object_id.1, request.property_id
            );
            error_apdu(invoke_id, ConfirmedServiceChoice::ReadProperty, &e)
        }
    }
}

fn write_property(db: &mut ObjectDatabase, invoke_id: u8, parameters: &[u8]) -> Apdu {
    let request = match WritePropertyRequest::decode(parameters) {
        Ok(request) => request,
        Err(e) => {
            warn!("malformed WriteProperty request: {e}");
            return Apdu::Reject {
                invoke_id,
                reason: RejectReason::InvalidTag,
            };
        }
    };

    let result = resolve(request.object_id, request.property_id)
        .and_then(|(id, property)| db.write_property(id, property, request.value.clone()));
    match result {
        Ok(()) => {
            debug!(
                "WriteProperty {}:{} property {} ok",
                request.object_id.0, request.object_id.1, request.property_id
            );
            Apdu::SimpleAck {
                invoke_id,
                service_choice: ConfirmedServiceChoice::WriteProperty as u8,
            }
        }
        Err(e) => {
            debug!(
                "WriteProperty {}:{} property {} failed: {e}",
                request.object_id.0, request.object_id.1, request.property_id
            );
            error_apdu(invoke_id, ConfirmedServiceChoice::WriteProperty, &e)
        }
    }
}

fn handle_unconfirmed(
    db: &ObjectDatabase,
    service_choice: u8,
    parameters: &[u8],
) -> Vec<Outgoing> {
    match UnconfirmedServiceChoice::try_from(service_choice) {
        Ok(UnconfirmedServiceChoice::WhoIs) => {
            let request = match WhoIsRequest::decode(parameters) {
                Ok(request) => request,
                Err(e) => {
                    warn!("malformed Who-Is request: {e}");
                    return Vec::new();
                }
            };
            let instance = db.device().identifier().instance;
            if !request.matches(instance) {
                debug!("Who-Is range excludes device {instance}");
                return Vec::new();
            }
            match encode_i_am(db) {
                Ok(frame) => vec![Outgoing::Broadcast(frame)],
                Err(e) => {
                    warn!("failed to encode I-Am: {e}");
                    Vec::new()
                }
            }
        }
        // Another device announcing itself; a server has no use for it.
        Ok(UnconfirmedServiceChoice::IAm) => Vec::new(),
        Err(other) => {
            debug!("ignoring unrecognized unconfirmed service {other}");
            Vec::new()
        }
    }
}

/// Encode a complete I-Am broadcast NPDU for this device.
pub fn encode_i_am(db: &ObjectDatabase) -> Result<Vec<u8>, crate::encoding::EncodingError> {
    let device = db.device();
    let announcement = IAmRequest {
        device_id: device.identifier(),
        max_apdu_length: device.max_apdu_length_accepted(),
        segmentation: device.segmentation(),
        vendor_id: device.vendor_identifier(),
    };
    let mut parameters = Vec::new();
    announcement.encode(&mut parameters)?;
    let apdu = Apdu::UnconfirmedRequest {
        service_choice: UnconfirmedServiceChoice::IAm as u8,
        parameters,
    };
    let mut npdu = Vec::new();
    Npdu::global_broadcast().encode(&mut npdu);
    apdu.encode(&mut npdu);
    Ok(npdu)
}

/// Translate raw wire identifiers into typed ones, mapping failures to the
/// errors a client expects for unknown objects and properties.
fn resolve(
    object_id: (u16, u32),
    property_id: u32,
) -> Result<(ObjectIdentifier, PropertyIdentifier), ObjectError> {
    let object_type =
        ObjectType::try_from(object_id.0).map_err(|_| ObjectError::UnknownObject)?;
    let property = PropertyIdentifier::try_from(property_id)?;
    Ok((ObjectIdentifier::new(object_type, object_id.1), property))
}

fn error_apdu(invoke_id: u8, choice: ConfirmedServiceChoice, error: &ObjectError) -> Apdu {
    let (class, code) = service::error_for(error);
    Apdu::Error {
        invoke_id,
        service_choice: choice as u8,
        parameters: service::encode_error_parameters(class, code),
    }
}

fn reply(request: &Npdu, apdu: Apdu) -> Outgoing {
    let mut buffer = Vec::new();
    request.reply_to().encode(&mut buffer);
    apdu.encode(&mut buffer);
    Outgoing::Reply(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apdu::ApduType;
    use crate::object::{
        AnalogInput, BinaryInput, Device, EngineeringUnits, PropertyValue,
    };

    fn test_db() -> ObjectDatabase {
        let mut db = ObjectDatabase::new(
            Device::new(12345, "RoomController").with_vendor(15, "Cornell"),
        );
        db.add_object(Box::new(
            AnalogInput::new(1, "RoomTemp", EngineeringUnits::DegreesFahrenheit)
                .with_present_value(70.0)
                .with_out_of_service(true),
        ))
        .unwrap();
        db.add_object(Box::new(
            BinaryInput::new(1, "Fan").with_out_of_service(true),
        ))
        .unwrap();
        db
    }

    fn confirmed_request(invoke_id: u8, choice: u8, parameters: &[u8]) -> Vec<u8> {
        let mut frame = Vec::new();
        Npdu::local(true).encode(&mut frame);
        Apdu::ConfirmedRequest {
            invoke_id,
            service_choice: choice,
            parameters: parameters.to_vec(),
        }
        .encode(&mut frame);
        frame
    }

    fn reply_apdu(outgoing: &Outgoing) -> &[u8] {
        match outgoing {
            Outgoing::Reply(frame) => &frame[2..], // skip the two-byte NPDU
            Outgoing::Broadcast(frame) => &frame[6..],
        }
    }

    #[test]
    fn who_is_triggers_i_am_broadcast() {
        let mut db = test_db();
        let mut frame = Vec::new();
        Npdu::local(false).encode(&mut frame);
        Apdu::UnconfirmedRequest {
            service_choice: UnconfirmedServiceChoice::WhoIs as u8,
            parameters: Vec::new(),
        }
        .encode(&mut frame);

        let actions = handle_npdu(&mut db, &frame);
        assert_eq!(actions.len(), 1);
        let apdu = reply_apdu(&actions[0]);
        assert!(matches!(actions[0], Outgoing::Broadcast(_)));
        assert_eq!(apdu[0] >> 4, ApduType::UnconfirmedRequest as u8);
        assert_eq!(apdu[1], UnconfirmedServiceChoice::IAm as u8);

        let announcement = IAmRequest::decode(&apdu[2..]).unwrap();
        assert_eq!(announcement.device_id.instance, 12345);
        assert_eq!(announcement.max_apdu_length, 1024);
        assert_eq!(announcement.vendor_id, 15);
    }

    #[test]
    fn encoded_i_am_carries_device_identity() {
        let db = test_db();
        let npdu = encode_i_am(&db).unwrap();
        let (header, offset) = Npdu::decode(&npdu).unwrap();
        assert_eq!(header.destination.unwrap().network, 0xFFFF);
        let announcement = IAmRequest::decode(&npdu[offset + 2..]).unwrap();
        assert_eq!(announcement.device_id, db.device().identifier());
        assert_eq!(
            announcement.max_apdu_length,
            db.device().max_apdu_length_accepted()
        );
        assert_eq!(announcement.vendor_id, db.device().vendor_identifier());
    }

    #[test]
    fn who_is_out_of_range_is_silent() {
        let mut db = test_db();
        let mut parameters = Vec::new();
        WhoIsRequest {
            low_limit: Some(1),
            high_limit: Some(100),
        }
        .encode(&mut parameters);
        let mut frame = Vec::new();
        Npdu::local(false).encode(&mut frame);
        Apdu::UnconfirmedRequest {
            service_choice: UnconfirmedServiceChoice::WhoIs as u8,
            parameters,
        }
        .encode(&mut frame);

        assert!(handle_npdu(&mut db, &frame).is_empty());
    }

    #[test]
    fn read_present_value() {
        let mut db = test_db();
        let mut parameters = Vec::new();
        ReadPropertyRequest {
            object_id: (ObjectType::AnalogInput as u16, 1),
            property_id: PropertyIdentifier::PresentValue as u32,
            array_index: None,
        }
        .encode(&mut parameters)
        .unwrap();
        let frame = confirmed_request(7, ConfirmedServiceChoice::ReadProperty as u8, &parameters);

        let actions = handle_npdu(&mut db, &frame);
        assert_eq!(actions.len(), 1);
        let apdu = reply_apdu(&actions[0]);
        assert_eq!(apdu[0] >> 4, ApduType::ComplexAck as u8);
        assert_eq!(apdu[1], 7); // invoke id echoed

        let ack = ReadPropertyAck::decode(&apdu[3..]).unwrap();
        assert_eq!(ack.value, PropertyValue::Real(70.0));
    }

    #[test]
    fn read_object_list() {
        let mut db = test_db();
        let mut parameters = Vec::new();
        ReadPropertyRequest {
            object_id: (ObjectType::Device as u16, 12345),
            property_id: PropertyIdentifier::ObjectList as u32,
            array_index: None,
        }
        .encode(&mut parameters)
        .unwrap();
        let frame = confirmed_request(1, ConfirmedServiceChoice::ReadProperty as u8, &parameters);

        let actions = handle_npdu(&mut db, &frame);
        let ack = ReadPropertyAck::decode(&reply_apdu(&actions[0])[3..]).unwrap();
        match ack.value {
            PropertyValue::ObjectList(list) => {
                assert_eq!(list.len(), 3);
                assert_eq!(list[0].object_type, ObjectType::Device);
                assert_eq!(list[1].object_type, ObjectType::AnalogInput);
                assert_eq!(list[2].object_type, ObjectType::BinaryInput);
            }
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn read_unknown_object_yields_error_pdu() {
        let mut db = test_db();
        let mut parameters = Vec::new();
        ReadPropertyRequest {
            object_id: (ObjectType::AnalogInput as u16, 99),
            property_id: PropertyIdentifier::PresentValue as u32,
            array_index: None,
        }
        .encode(&mut parameters)
        .unwrap();
        let frame = confirmed_request(2, ConfirmedServiceChoice::ReadProperty as u8, &parameters);

        let actions = handle_npdu(&mut db, &frame);
        let apdu = reply_apdu(&actions[0]);
        assert_eq!(apdu[0] >> 4, ApduType::Error as u8);
        assert_eq!(apdu[1], 2);
        // error class object (1), error code unknown-object (31)
        assert_eq!(&apdu[3..], &[0x91, 0x01, 0x91, 0x1F]);
    }

    #[test]
    fn write_present_value_out_of_service() {
        let mut db = test_db();
        let mut parameters = Vec::new();
        WritePropertyRequest {
            object_id: (ObjectType::AnalogInput as u16, 1),
            property_id: PropertyIdentifier::PresentValue as u32,
            array_index: None,
            value: PropertyValue::Real(75.5),
            priority: None,
        }
        .encode(&mut parameters)
        .unwrap();
        let frame =
            confirmed_request(3, ConfirmedServiceChoice::WriteProperty as u8, &parameters);

        let actions = handle_npdu(&mut db, &frame);
        let apdu = reply_apdu(&actions[0]);
        assert_eq!(apdu[0] >> 4, ApduType::SimpleAck as u8);
        assert_eq!(apdu[1], 3);

        let ai = ObjectIdentifier::new(ObjectType::AnalogInput, 1);
        assert_eq!(
            db.read_property(ai, PropertyIdentifier::PresentValue, None)
                .unwrap(),
            PropertyValue::Real(75.5)
        );
    }

    #[test]
    fn write_read_only_property_denied() {
        let mut db = test_db();
        let mut parameters = Vec::new();
        WritePropertyRequest {
            object_id: (ObjectType::AnalogInput as u16, 1),
            property_id: PropertyIdentifier::ObjectName as u32,
            array_index: None,
            value: PropertyValue::CharacterString("Hijacked".into()),
            priority: None,
        }
        .encode(&mut parameters)
        .unwrap();
        let frame =
            confirmed_request(4, ConfirmedServiceChoice::WriteProperty as u8, &parameters);

        let actions = handle_npdu(&mut db, &frame);
        let apdu = reply_apdu(&actions[0]);
        assert_eq!(apdu[0] >> 4, ApduType::Error as u8);
        // error class property (2), error code write-access-denied (40)
        assert_eq!(&apdu[3..], &[0x91, 0x02, 0x91, 0x28]);
    }

    #[test]
    fn unrecognized_confirmed_service_rejected() {
        let mut db = test_db();
        // ReadPropertyMultiple (14) is not implemented.
        let frame = confirmed_request(5, 14, &[]);
        let actions = handle_npdu(&mut db, &frame);
        let apdu = reply_apdu(&actions[0]);
        assert_eq!(apdu[0] >> 4, ApduType::Reject as u8);
        assert_eq!(apdu[2], RejectReason::UnrecognizedService as u8);
    }

    #[test]
    fn segmented_request_aborted() {
        let mut db = test_db();
        let mut frame = Vec::new();
        Npdu::local(true).encode(&mut frame);
        // Segmented ReadProperty: SEG bit set, sequence 0, window 16.
        frame.extend_from_slice(&[0x08, 0x04, 0x11, 0x00, 0x10, 0x0C]);

        let actions = handle_npdu(&mut db, &frame);
        let apdu = reply_apdu(&actions[0]);
        assert_eq!(apdu[0] >> 4, ApduType::Abort as u8);
        assert_eq!(apdu[1], 0x11);
        assert_eq!(apdu[2], AbortReason::SegmentationNotSupported as u8);
    }

    #[test]
    fn malformed_read_property_rejected() {
        let mut db = test_db();
        let frame = confirmed_request(
            6,
            ConfirmedServiceChoice::ReadProperty as u8,
            &[0xFF, 0xFF],
        );
        let actions = handle_npdu(&mut db, &frame);
        let apdu = reply_apdu(&actions[0]);
        assert_eq!(apdu[0] >> 4, ApduType::Reject as u8);
        assert_eq!(apdu[2], RejectReason::InvalidTag as u8);
    }

    #[test]
    fn garbage_npdu_dropped() {
        let mut db = test_db();
        assert!(handle_npdu(&mut db, &[0x55, 0xAA]).is_empty());
        assert!(handle_npdu(&mut db, &[]).is_empty());
    }

    #[test]
    fn reply_routes_through_source_network() {
        use crate::network::{NetworkAddress, NpduControl};

        let mut db = test_db();
        let npdu = Npdu {
            control: NpduControl {
                source_present: true,
                expecting_reply: true,
                ..Default::default()
            },
            source: Some(NetworkAddress {
                network: 7,
                address: vec![0x01],
            }),
            ..Default::default()
        };
        let mut frame = Vec::new();
        npdu.encode(&mut frame);
        let mut parameters = Vec::new();
        ReadPropertyRequest {
            object_id: (ObjectType::Device as u16, 12345),
            property_id: PropertyIdentifier::VendorIdentifier as u32,
            array_index: None,
        }
        .encode(&mut parameters)
        .unwrap();
        Apdu::ConfirmedRequest {
            invoke_id: 9,
            service_choice: ConfirmedServiceChoice::ReadProperty as u8,
            parameters,
        }
        .encode(&mut frame);

        let actions = handle_npdu(&mut db, &frame);
        match &actions[0] {
            Outgoing::Reply(reply) => {
                let (reply_npdu, _) = Npdu::decode(reply).unwrap();
                let dest = reply_npdu.destination.unwrap();
                assert_eq!(dest.network, 7);
                assert_eq!(dest.address, vec![0x01]);
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }
}

//! Analog Input object.

use super::{
    BacnetObject, ObjectError, ObjectIdentifier, ObjectType, PropertyIdentifier, PropertyValue,
    StatusFlags,
};

/// Engineering units (clause 21, BACnetEngineeringUnits). Only the units
/// this stack uses are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum EngineeringUnits {
    SquareMeters = 0,
    Volts = 5,
    DegreesCelsius = 62,
    DegreesFahrenheit = 64,
    DegreesKelvin = 63,
    PercentRelativeHumidity = 29,
    Pascals = 53,
    NoUnits = 95,
    PartsPerMillion = 96,
}

/// An Analog Input: a read-only measured value, except that when the object
/// is out of service the Present_Value is writable so an external source
/// (or the local simulation) can drive it.
pub struct AnalogInput {
    identifier: ObjectIdentifier,
    object_name: String,
    present_value: f32,
    units: EngineeringUnits,
    status_flags: StatusFlags,
    out_of_service: bool,
}

impl AnalogInput {
    pub fn new(instance: u32, name: impl Into<String>, units: EngineeringUnits) -> Self {
        Self {
            identifier: ObjectIdentifier::new(ObjectType::AnalogInput, instance),
            object_name: name.into(),
            present_value: 0.0,
            units,
            status_flags: StatusFlags::default(),
            out_of_service: false,
        }
    }

    pub fn with_present_value(mut self, value: f32) -> Self {
        self.present_value = value;
        self
    }

    pub fn with_out_of_service(mut self, oos: bool) -> Self {
        self.set_out_of_service(oos);
        self
    }

    pub fn present_value(&self) -> f32 {
        self.present_value
    }

    /// Direct update from local logic, bypassing writability checks.
    pub fn set_present_value(&mut self, value: f32) {
        self.present_value = value;
    }

    pub fn out_of_service(&self) -> bool {
        self.out_of_service
    }

    pub fn set_out_of_service(&mut self, oos: bool) {
        self.out_of_service = oos;
        self.status_flags.set(StatusFlags::OUT_OF_SERVICE, oos);
    }
}

impl BacnetObject for AnalogInput {
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
                Ok(PropertyValue::Enumerated(ObjectType::AnalogInput as u32))
            }
            PropertyIdentifier::PresentValue => Ok(PropertyValue::Real(self.present_value)),
            PropertyIdentifier::StatusFlags => Ok(PropertyValue::BitString(self.status_flags)),
            PropertyIdentifier::EventState => Ok(PropertyValue::Enumerated(0)), // normal
            PropertyIdentifier::OutOfService => Ok(PropertyValue::Boolean(self.out_of_service)),
            PropertyIdentifier::Units => Ok(PropertyValue::Enumerated(self.units as u32)),
            PropertyIdentifier::Reliability => Ok(PropertyValue::Enumerated(0)), // no-fault-detected
            _ => Err(ObjectError::PropertyNotSupported),
        }
    }

    fn set_property(
        &mut self,
        property: PropertyIdentifier,
        value: PropertyValue,
    ) -> Result<(), ObjectError> {
        match property {
            PropertyIdentifier::PresentValue => {
                if !self.out_of_service {
                    return Err(ObjectError::WriteAccessDenied);
                }
                match value {
                    PropertyValue::Real(v) => {
                        self.present_value = v;
                        Ok(())
                    }
                    _ => Err(ObjectError::InvalidDataType),
                }
            }
            PropertyIdentifier::OutOfService => match value {
                PropertyValue::Boolean(v) => {
                    self.set_out_of_service(v);
                    Ok(())
                }
                _ => Err(ObjectError::InvalidDataType),
            },
            _ if self.get_property(property).is_ok() => Err(ObjectError::WriteAccessDenied),
            _ => Err(ObjectError::PropertyNotSupported),
        }
    }

    fn is_property_writable(&self, property: PropertyIdentifier) -> bool {
        match property {
            PropertyIdentifier::PresentValue => self.out_of_service,
            PropertyIdentifier::OutOfService => true,
            _ => false,
        }
    }

    fn property_list(&self) -> Vec<PropertyIdentifier> {
        vec![
            PropertyIdentifier::ObjectIdentifier,
            PropertyIdentifier::ObjectName,
            PropertyIdentifier::ObjectType,
            PropertyIdentifier::PresentValue,
            PropertyIdentifier::StatusFlags,
            PropertyIdentifier::EventState,
            PropertyIdentifier::OutOfService,
            PropertyIdentifier::Units,
            PropertyIdentifier::Reliability,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_temp() -> AnalogInput {
        AnalogInput::new(1, "RoomTemp", EngineeringUnits::DegreesFahrenheit)
            .with_present_value(70.0)
            .with_out_of_service(true)
    }

    #[test]
    fn present_value_writable_only_out_of_service() {
        let mut ai = room_temp();
        assert!(ai.is_property_writable(PropertyIdentifier::PresentValue));
        ai.set_property(PropertyIdentifier::PresentValue, PropertyValue::Real(72.5))
            .unwrap();
        assert_eq!(ai.present_value(), 72.5);

        ai.set_property(
            PropertyIdentifier::OutOfService,
            PropertyValue::Boolean(false),
        )
        .unwrap();
        assert_eq!(
            ai.set_property(PropertyIdentifier::PresentValue, PropertyValue::Real(0.0)),
            Err(ObjectError::WriteAccessDenied)
        );
        assert_eq!(ai.present_value(), 72.5);
    }

    #[test]
    fn wrong_datatype_rejected() {
        let mut ai = room_temp();
        assert_eq!(
            ai.set_property(
                PropertyIdentifier::PresentValue,
                PropertyValue::Unsigned(70)
            ),
            Err(ObjectError::InvalidDataType)
        );
    }

    #[test]
    fn out_of_service_mirrored_in_status_flags() {
        let ai = room_temp();
        match ai.get_property(PropertyIdentifier::StatusFlags).unwrap() {
            PropertyValue::BitString(flags) => {
                assert!(flags.contains(StatusFlags::OUT_OF_SERVICE));
                assert!(!flags.contains(StatusFlags::FAULT));
            }
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn units_readable_not_writable() {
        let mut ai = room_temp();
        assert_eq!(
            ai.get_property(PropertyIdentifier::Units).unwrap(),
            PropertyValue::Enumerated(EngineeringUnits::DegreesFahrenheit as u32)
        );
        assert_eq!(
            ai.set_property(PropertyIdentifier::Units, PropertyValue::Enumerated(62)),
            Err(ObjectError::WriteAccessDenied)
        );
    }

    #[test]
    fn unsupported_property() {
        let ai = room_temp();
        assert_eq!(
            ai.get_property(PropertyIdentifier::Polarity),
            Err(ObjectError::PropertyNotSupported)
        );
    }
}

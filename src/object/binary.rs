//! Binary Input object.

use super::{
    BacnetObject, ObjectError, ObjectIdentifier, ObjectType, PropertyIdentifier, PropertyValue,
    StatusFlags,
};

/// Binary present value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum BinaryPv {
    #[default]
    Inactive = 0,
    Active = 1,
}

impl From<bool> for BinaryPv {
    fn from(value: bool) -> Self {
        if value {
            Self::Active
        } else {
            Self::Inactive
        }
    }
}

impl TryFrom<u32> for BinaryPv {
    type Error = ObjectError;

    fn try_from(value: u32) -> Result<Self, ObjectError> {
        match value {
            0 => Ok(Self::Inactive),
            1 => Ok(Self::Active),
            _ => Err(ObjectError::ValueOutOfRange),
        }
    }
}

/// Input polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum Polarity {
    #[default]
    Normal = 0,
    Reverse = 1,
}

/// A Binary Input: a two-state measured value. As with analog inputs, the
/// Present_Value becomes writable while the object is out of service.
pub struct BinaryInput {
    identifier: ObjectIdentifier,
    object_name: String,
    present_value: BinaryPv,
    polarity: Polarity,
    status_flags: StatusFlags,
    out_of_service: bool,
}

impl BinaryInput {
    pub fn new(instance: u32, name: impl Into<String>) -> Self {
        Self {
            identifier: ObjectIdentifier::new(ObjectType::BinaryInput, instance),
            object_name: name.into(),
            present_value: BinaryPv::Inactive,
            polarity: Polarity::Normal,
            status_flags: StatusFlags::default(),
            out_of_service: false,
        }
    }

    pub fn with_present_value(mut self, value: BinaryPv) -> Self {
        self.present_value = value;
        self
    }

    pub fn with_out_of_service(mut self, oos: bool) -> Self {
        self.set_out_of_service(oos);
        self
    }

    pub fn present_value(&self) -> BinaryPv {
        self.present_value
    }

    /// Direct update from local logic, bypassing writability checks.
    pub fn set_present_value(&mut self, value: BinaryPv) {
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

impl BacnetObject for BinaryInput {
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
                Ok(PropertyValue::Enumerated(ObjectType::BinaryInput as u32))
            }
            PropertyIdentifier::PresentValue => {
                Ok(PropertyValue::Enumerated(self.present_value as u32))
            }
            PropertyIdentifier::StatusFlags => Ok(PropertyValue::BitString(self.status_flags)),
            PropertyIdentifier::EventState => Ok(PropertyValue::Enumerated(0)), // normal
            PropertyIdentifier::OutOfService => Ok(PropertyValue::Boolean(self.out_of_service)),
            PropertyIdentifier::Polarity => Ok(PropertyValue::Enumerated(self.polarity as u32)),
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
                    PropertyValue::Enumerated(v) => {
                        self.present_value = BinaryPv::try_from(v)?;
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
            PropertyIdentifier::Polarity,
        ]
    }
}

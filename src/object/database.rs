//! Object database.
//!
//! Holds the Device object plus its children and routes property reads and
//! writes by object identifier. Insertion order is preserved because the
//! Object_List array exposes it on the wire.

use std::collections::HashMap;

use log::debug;

use super::{
    BacnetObject, Device, ObjectError, ObjectIdentifier, PropertyIdentifier, PropertyValue,
};

/// The device's object database.
pub struct ObjectDatabase {
    device: Device,
    /// Children in insertion order.
    objects: Vec<Box<dyn BacnetObject>>,
    /// Identifier -> index into `objects`.
    index: HashMap<ObjectIdentifier, usize>,
}

impl ObjectDatabase {
    pub fn new(device: Device) -> Self {
        Self {
            device,
            objects: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Add a child object. Duplicate identifiers are refused.
    pub fn add_object(&mut self, object: Box<dyn BacnetObject>) -> Result<(), ObjectError> {
        let id = object.identifier();
        if id == self.device.identifier() || self.index.contains_key(&id) {
            return Err(ObjectError::DuplicateObject(id));
        }
        debug!("adding object {} ({})", id, object.object_name());
        self.index.insert(id, self.objects.len());
        self.objects.push(object);
        self.device.register_object(id);
        Ok(())
    }

    /// Remove a child object.
    pub fn remove_object(&mut self, id: ObjectIdentifier) -> Result<(), ObjectError> {
        let position = *self.index.get(&id).ok_or(ObjectError::UnknownObject)?;
        self.objects.remove(position);
        self.index.remove(&id);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        self.device.unregister_object(id);
        Ok(())
    }

    pub fn contains(&self, id: ObjectIdentifier) -> bool {
        id == self.device.identifier() || self.index.contains_key(&id)
    }

    /// Number of objects including the Device itself.
    pub fn len(&self) -> usize {
        self.objects.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false // the Device object is always present
    }

    fn child(&self, id: ObjectIdentifier) -> Result<&dyn BacnetObject, ObjectError> {
        self.index
            .get(&id)
            .map(|&i| self.objects[i].as_ref())
            .ok_or(ObjectError::UnknownObject)
    }

    fn child_mut(&mut self, id: ObjectIdentifier) -> Result<&mut dyn BacnetObject, ObjectError> {
        match self.index.get(&id) {
            Some(&i) => Ok(self.objects[i].as_mut()),
            None => Err(ObjectError::UnknownObject),
        }
    }

    /// Read a property from any object in the database. The array index
    /// only applies to array properties (Object_List on the Device); an
    /// index on a scalar property is an error.
    pub fn read_property(
        &self,
        id: ObjectIdentifier,
        property: PropertyIdentifier,
        array_index: Option<u32>,
    ) -> Result<PropertyValue, ObjectError> {
        if id == self.device.identifier() {
            return self.device.get_property_indexed(property, array_index);
        }
        let object = self.child(id)?;
        match array_index {
            Some(_) => Err(ObjectError::InvalidArrayIndex),
            None => object.get_property(property),
        }
    }

    /// Write a property on any object in the database.
    pub fn write_property(
        &mut self,
        id: ObjectIdentifier,
        property: PropertyIdentifier,
        value: PropertyValue,
    ) -> Result<(), ObjectError> {
        if id == self.device.identifier() {
            return self.device.set_property(property, value);
        }
        self.child_mut(id)?.set_property(property, value)
    }
}

//! Room thermal simulation.
//!
//! A deliberately simple model: the room warms by half a degree per tick,
//! resets to a cool setpoint once it overshoots past the reset threshold,
//! and an exhaust fan runs whenever the temperature is above the fan
//! threshold. The step logic is pure; [`RoomSimulation::tick`] applies each
//! step to the object database so the values are visible on the wire.

use log::info;

use crate::object::{
    BinaryPv, ObjectDatabase, ObjectError, ObjectIdentifier, PropertyIdentifier, PropertyValue,
};

/// Temperature added each tick, degrees Fahrenheit.
const HEAT_RATE: f32 = 0.5;
/// Above this the fan runs.
const FAN_THRESHOLD: f32 = 75.0;
/// Strictly above this the room resets to the cool setpoint.
const RESET_THRESHOLD: f32 = 80.0;
/// Temperature after a reset.
const COOL_SETPOINT: f32 = 68.0;
/// Temperature at startup.
pub const INITIAL_TEMPERATURE: f32 = 70.0;

/// One step of the thermal model: returns the next temperature and whether
/// the fan should run at it.
pub fn step(temperature: f32) -> (f32, bool) {
    let mut next = temperature + HEAT_RATE;
    if next > RESET_THRESHOLD {
        next = COOL_SETPOINT;
    }
    (next, next > FAN_THRESHOLD)
}

/// Drives the temperature and fan objects in the database.
pub struct RoomSimulation {
    temperature_id: ObjectIdentifier,
    fan_id: ObjectIdentifier,
    temperature: f32,
}

impl RoomSimulation {
    pub fn new(temperature_id: ObjectIdentifier, fan_id: ObjectIdentifier) -> Self {
        Self {
            temperature_id,
            fan_id,
            temperature: INITIAL_TEMPERATURE,
        }
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Advance one tick and push the new state into the database. Both
    /// objects are out of service, so the writes go through the same
    /// property paths a remote writer would use.
    pub fn tick(&mut self, db: &mut ObjectDatabase) -> Result<(), ObjectError> {
        let (temperature, fan_on) = step(self.temperature);
        self.temperature = temperature;

        db.write_property(
            self.temperature_id,
            PropertyIdentifier::PresentValue,
            PropertyValue::Real(temperature),
        )?;
        db.write_property(
            self.fan_id,
            PropertyIdentifier::PresentValue,
            PropertyValue::Enumerated(BinaryPv::from(fan_on) as u32),
        )?;

        info!(
            "Temp: {:.1}°F, Fan: {}",
            temperature,
            if fan_on { "On" } else { "Off" }
        );
        Ok(())
    }
}

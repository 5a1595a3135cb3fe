//! The virtual device: configuration, object setup and the run loop.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::app::{self, Outgoing};
use crate::datalink::{BacnetIpLink, BACNET_IP_PORT};
use crate::object::{
    AnalogInput, BacnetObject, BinaryInput, Device, EngineeringUnits, ObjectDatabase,
    ObjectIdentifier, ObjectType,
};
use crate::sim::{RoomSimulation, INITIAL_TEMPERATURE};
use crate::Error;

/// Configuration for a virtual room controller.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub instance: u32,
    pub name: String,
    pub vendor_id: u16,
    pub vendor_name: String,
    pub bind: SocketAddr,
    pub tick_interval: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            instance: 12345,
            name: "RoomController".into(),
            vendor_id: 15,
            vendor_name: "Cornell".into(),
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), BACNET_IP_PORT),
            tick_interval: Duration::from_secs(5),
        }
    }
}

/// A BACnet/IP room controller: one Device, a temperature input and a fan
/// status input, plus the simulation that drives them.
pub struct VirtualDevice {
    database: ObjectDatabase,
    simulation: RoomSimulation,
    link: BacnetIpLink,
    tick_interval: Duration,
}

impl VirtualDevice {
    /// Build the object database and bind the socket.
    pub fn new(config: DeviceConfig) -> Result<Self, Error> {
        let device = Device::new(config.instance, config.name)
            .with_vendor(config.vendor_id, config.vendor_name)
            .with_model_name("Virtual Room Controller");
        let mut database = ObjectDatabase::new(device);

        // Both inputs are out of service so local logic may drive them.
        database.add_object(Box::new(
            AnalogInput::new(1, "RoomTemp", EngineeringUnits::DegreesFahrenheit)
                .with_present_value(INITIAL_TEMPERATURE)
                .with_out_of_service(true),
        ))?;
        database.add_object(Box::new(
            BinaryInput::new(1, "Fan").with_out_of_service(true),
        ))?;

        let simulation = RoomSimulation::new(
            ObjectIdentifier::new(ObjectType::AnalogInput, 1),
            ObjectIdentifier::new(ObjectType::BinaryInput, 1),
        );
        let link = BacnetIpLink::bind(config.bind)?;

        Ok(Self {
            database,
            simulation,
            link,
            tick_interval: config.tick_interval,
        })
    }

    /// Serve requests and run the simulation until `running` goes false.
    ///
    /// Single-threaded: the socket's read timeout bounds how long a quiet
    /// network can delay a simulation tick.
    pub fn run(&mut self, running: &AtomicBool) -> Result<(), Error> {
        info!(
            "device {} listening on {}",
            self.database.device().identifier(),
            self.link.local_addr()?
        );

        // Announce ourselves so clients that discovered the network before
        // we started still find us.
        self.link.send_broadcast(&app::encode_i_am(&self.database)?)?;

        let mut last_tick = Instant::now();
        while running.load(Ordering::SeqCst) {
            if let Some(frame) = self.link.receive()? {
                debug!("frame from {} ({:?})", frame.source, frame.function);
                for action in app::handle_npdu(&mut self.database, &frame.npdu) {
                    match action {
                        Outgoing::Reply(npdu) => self.link.send_unicast(&npdu, frame.source)?,
                        Outgoing::Broadcast(npdu) => self.link.send_broadcast(&npdu)?,
                    }
                }
            }

            if last_tick.elapsed() >= self.tick_interval {
                last_tick = Instant::now();
                self.simulation.tick(&mut self.database)?;
            }
        }

        info!("shutting down");
        Ok(())
    }
}

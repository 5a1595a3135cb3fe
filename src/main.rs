//! `room-controller` binary.
//!
//! Usage: `room-controller [device-instance] [port]`
//!
//! Runs a virtual BACnet/IP room controller until interrupted. Logging is
//! configured through `RUST_LOG` (the simulation reports each tick at info
//! level).

use std::env;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, info};

use vbacnet::device::{DeviceConfig, VirtualDevice};

fn parse_args() -> Result<DeviceConfig, String> {
    let mut config = DeviceConfig::default();
    let args: Vec<String> = env::args().skip(1).collect();

    if let Some(instance) = args.first() {
        config.instance = instance
            .parse()
            .map_err(|_| format!("invalid device instance '{instance}'"))?;
        if config.instance > vbacnet::object::ObjectIdentifier::MAX_INSTANCE {
            return Err(format!("device instance {} too large", config.instance));
        }
    }
    if let Some(port) = args.get(1) {
        let port: u16 = port
            .parse()
            .map_err(|_| format!("invalid port '{port}'"))?;
        config.bind.set_port(port);
    }
    Ok(config)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match parse_args() {
        Ok(config) => config,
        Err(message) => {
            error!("{message}");
            eprintln!("usage: room-controller [device-instance] [port]");
            return ExitCode::FAILURE;
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    if let Err(e) = ctrlc::set_handler(move || {
        info!("interrupt received");
        flag.store(false, Ordering::SeqCst);
    }) {
        error!("failed to install signal handler: {e}");
        return ExitCode::FAILURE;
    }

    let mut device = match VirtualDevice::new(config) {
        Ok(device) => device,
        Err(e) => {
            error!("failed to start device: {e}");
            return ExitCode::FAILURE;
        }
    };

    match device.run(&running) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("device stopped: {e}");
            ExitCode::FAILURE
        }
    }
}

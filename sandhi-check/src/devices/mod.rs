//! Device implementations

pub mod mock;

use crate::config::DeviceConfig;
use crate::core::clock::SharedClock;
use crate::core::driver::JointDriver;
use crate::error::{Error, Result};
use mock::MockJointDriver;

/// Create a joint driver based on configuration
pub fn create_device(config: &DeviceConfig, clock: SharedClock) -> Result<Box<dyn JointDriver>> {
    match config.device_type.as_str() {
        "mock" => {
            let simulation = config.simulation.clone().unwrap_or_default();
            let driver = MockJointDriver::new(simulation, clock)?;
            Ok(Box::new(driver))
        }
        _ => Err(Error::UnknownDevice(config.device_type.clone())),
    }
}

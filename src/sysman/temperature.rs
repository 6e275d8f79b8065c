//! Temperature sensor domains

use crate::domain::TemperatureProperties;
use crate::error::SysmanError;
use crate::sysman::os::{OsSysman, OsTemperature};
use crate::sysman::registry::subdevice_ids;

/// One temperature sensor
pub struct Temperature {
    os: Box<dyn OsTemperature>,
    properties: TemperatureProperties,
}

impl Temperature {
    pub fn new(os: Box<dyn OsTemperature>) -> Self {
        let properties = os.properties();
        Self { os, properties }
    }

    pub fn properties(&self) -> &TemperatureProperties {
        &self.properties
    }

    /// Current temperature in degrees Celsius
    pub fn reading(&self) -> Result<f64, SysmanError> {
        self.os.reading()
    }
}

/// Build one domain per (subdevice, sensor) the platform reports
pub fn discover(os: &dyn OsSysman) -> Vec<Temperature> {
    let mut handles = Vec::new();
    for subdevice in subdevice_ids(os.subdevice_count()) {
        let sensors = os.temperature_sensors(subdevice).unwrap_or_else(|e| {
            log::warn!("Cannot list temperature sensors: {}", e);
            Vec::new()
        });
        for sensor in sensors {
            handles.push(Temperature::new(os.create_temperature(subdevice, sensor)));
        }
    }
    handles
}

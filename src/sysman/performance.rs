//! Performance factor domains

use crate::domain::{EngineType, PerformanceFactor, PerformanceProperties};
use crate::error::SysmanError;
use crate::sysman::os::{OsPerformance, OsSysman};
use crate::sysman::registry::subdevice_ids;

/// Performance factor of one engine class on one subdevice
pub struct Performance {
    os: Box<dyn OsPerformance>,
    properties: PerformanceProperties,
}

impl Performance {
    /// Keep the engine only if its factor is exposed
    pub fn try_new(os: Box<dyn OsPerformance>) -> Option<Self> {
        if !os.is_supported() {
            return None;
        }
        let properties = os.properties();
        Some(Self { os, properties })
    }

    pub fn properties(&self) -> &PerformanceProperties {
        &self.properties
    }

    /// Current factor (0-100)
    pub fn factor(&self) -> Result<f64, SysmanError> {
        self.os.factor()
    }

    /// Apply a factor in 0-100
    pub fn set_factor(&self, factor: f64) -> Result<(), SysmanError> {
        let factor = PerformanceFactor::new(factor)
            .map_err(|e| SysmanError::InvalidArgument(e.to_string()))?;
        log::debug!(
            "Setting {} performance factor to {}",
            self.properties.engine,
            factor
        );
        self.os.set_factor(factor.value())
    }
}

/// Build one domain per (subdevice, engine), dropping unsupported engines
pub fn discover(os: &dyn OsSysman) -> Vec<Performance> {
    let mut handles = Vec::new();
    for subdevice in subdevice_ids(os.subdevice_count()) {
        for engine in EngineType::ALL {
            match Performance::try_new(os.create_performance(subdevice, engine)) {
                Some(performance) => handles.push(performance),
                None => log::debug!(
                    "No {} performance factor on subdevice {:?}",
                    engine,
                    subdevice
                ),
            }
        }
    }
    handles
}

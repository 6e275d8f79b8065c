//! Temperature sensor domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Temperature sensor a handle reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemperatureSensor {
    /// Hottest point on the package
    Global,
    /// Compute/render cores
    Gpu,
    /// Device-local memory
    Memory,
    /// Voltage regulator, by sensor index
    VoltageRegulator(u32),
}

impl fmt::Display for TemperatureSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "Global"),
            Self::Gpu => write!(f, "GPU"),
            Self::Memory => write!(f, "Memory"),
            Self::VoltageRegulator(i) => write!(f, "VR{}", i),
        }
    }
}

/// Static properties of a temperature sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureProperties {
    /// Sensor kind
    pub sensor: TemperatureSensor,
    /// Whether the sensor lives on a subdevice
    pub on_subdevice: bool,
    /// Subdevice id (0 when not on a subdevice)
    pub subdevice_id: u32,
    /// Highest temperature the sensor is rated for, in Celsius
    pub max_temperature: f64,
    /// Whether a critical-temperature event is supported
    pub is_critical_temp_supported: bool,
}

/// Highest byte of a packed temperature word
///
/// Telemetry packs one 8-bit Celsius reading per byte.
pub fn max_packed_byte(word: u64, bytes: usize) -> u8 {
    (0..bytes.min(8))
        .map(|i| ((word >> (i * 8)) & 0xff) as u8)
        .max()
        .unwrap_or(0)
}

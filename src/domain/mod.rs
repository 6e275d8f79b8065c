//! Domain models for xesysman
//!
//! This module contains the property/state records of every domain kind.
//! Value types are validated on construction (fail-fast pattern).

pub mod device;
pub mod diagnostics;
pub mod frequency;
pub mod memory;
pub mod performance;
pub mod temperature;

pub use device::{DeviceSummary, HardwareInfo, HwCaps, ProductFamily};
pub use diagnostics::{
    DiagProperties, DiagResult, DiagRunReport, DiagTest, DiagTestOutcome, FIRST_TEST_INDEX,
    LAST_TEST_INDEX,
};
pub use frequency::{
    clock_grid, FrequencyDomain, FrequencyProperties, FrequencyRange, FrequencyState,
    ThrottleReasons, FREQUENCY_UNKNOWN,
};
pub use memory::{
    MemoryBandwidth, MemoryHealth, MemoryLocation, MemoryProperties, MemoryState, MemoryType,
};
pub use performance::{
    EngineType, PerformanceFactor, PerformanceProperties, HALF_PERFORMANCE_FACTOR,
    MAX_PERFORMANCE_FACTOR,
};
pub use temperature::{max_packed_byte, TemperatureProperties, TemperatureSensor};

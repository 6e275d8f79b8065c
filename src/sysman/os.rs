//! Trait definitions for the OS-specific backend
//!
//! Each domain kind talks to exactly one backend object chosen when the
//! platform is constructed. The generic layer never branches on the OS.

use crate::domain::{
    DiagProperties, DiagRunReport, DiagTest, EngineType, FrequencyDomain, FrequencyProperties,
    FrequencyRange, FrequencyState, HardwareInfo, MemoryBandwidth, MemoryProperties, MemoryState,
    PerformanceProperties, TemperatureProperties, TemperatureSensor, ThrottleReasons,
};
use crate::error::SysmanError;

/// Clock domain backend
pub trait OsFrequency: Send + Sync {
    /// Static properties, probed once at construction
    fn properties(&self) -> FrequencyProperties;

    /// Clock grid step in MHz
    fn step(&self) -> f64;

    /// Currently applied limits
    fn range(&self) -> Result<FrequencyRange, SysmanError>;

    /// Apply new limits
    ///
    /// Callers validate the request first; `(-1, -1)` asks for the defaults.
    fn set_range(&self, range: FrequencyRange) -> Result<(), SysmanError>;

    /// Live frequencies, best effort per field
    fn state(&self) -> Result<FrequencyState, SysmanError>;

    /// Currently active throttle reasons
    fn throttle_reasons(&self) -> ThrottleReasons;
}

/// Memory module backend
pub trait OsMemory: Send + Sync {
    /// Whether the hardware has this module
    fn is_supported(&self) -> bool;

    fn properties(&self) -> MemoryProperties;

    fn state(&self) -> Result<MemoryState, SysmanError>;

    fn bandwidth(&self) -> Result<MemoryBandwidth, SysmanError>;
}

/// Performance factor backend
pub trait OsPerformance: Send + Sync {
    /// Whether the engine's factor can be read and written
    fn is_supported(&self) -> bool;

    fn properties(&self) -> PerformanceProperties;

    /// Current factor (0-100)
    fn factor(&self) -> Result<f64, SysmanError>;

    /// Apply a factor already validated to 0-100
    fn set_factor(&self, factor: f64) -> Result<(), SysmanError>;
}

/// Temperature sensor backend
pub trait OsTemperature: Send + Sync {
    fn properties(&self) -> TemperatureProperties;

    /// Current temperature in degrees Celsius
    fn reading(&self) -> Result<f64, SysmanError>;
}

/// Diagnostic suite backend
pub trait OsDiagnostics: Send + Sync {
    /// Whether the suite can be driven on this device
    fn is_supported(&self) -> bool;

    fn properties(&self) -> DiagProperties;

    /// Tests of the suite, in index order
    fn tests(&self) -> Result<Vec<DiagTest>, SysmanError>;

    /// Run tests `start..=end`, both already validated
    fn run_tests(&self, start: u32, end: u32) -> Result<DiagRunReport, SysmanError>;
}

/// Platform that reports domain sub-kinds and builds their backends
///
/// `subdevice` is `None` when the device has no subdevices and acts as its
/// own sole instance.
pub trait OsSysman: Send + Sync {
    fn subdevice_count(&self) -> u32;

    fn hardware_info(&self) -> HardwareInfo;

    /// Clock domains present on a subdevice
    fn frequency_domains(&self, subdevice: Option<u32>)
        -> Result<Vec<FrequencyDomain>, SysmanError>;

    fn create_frequency(
        &self,
        subdevice: Option<u32>,
        domain: FrequencyDomain,
    ) -> Box<dyn OsFrequency>;

    fn create_memory(&self, subdevice: Option<u32>) -> Box<dyn OsMemory>;

    fn create_performance(
        &self,
        subdevice: Option<u32>,
        engine: EngineType,
    ) -> Box<dyn OsPerformance>;

    /// Temperature sensors present on a subdevice
    fn temperature_sensors(
        &self,
        subdevice: Option<u32>,
    ) -> Result<Vec<TemperatureSensor>, SysmanError>;

    fn create_temperature(
        &self,
        subdevice: Option<u32>,
        sensor: TemperatureSensor,
    ) -> Box<dyn OsTemperature>;

    /// Names of the diagnostic suites the firmware offers
    fn diagnostic_suites(&self) -> Result<Vec<String>, SysmanError>;

    fn create_diagnostics(&self, suite: &str) -> Box<dyn OsDiagnostics>;
}

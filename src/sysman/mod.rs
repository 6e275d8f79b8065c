//! Device-level system management
//!
//! [`Sysman`] owns one lazy handle registry per domain kind and the OS
//! platform that builds the domain backends.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use xesysman::sysfs::SysfsAccess;
//! use xesysman::sysman::Sysman;
//!
//! let sysman = Sysman::open(Arc::new(SysfsAccess::new()), 0)?;
//! let mut count = 0;
//! sysman.frequency_domains(&mut count, None);
//! println!("{} clock domains", count);
//! # Ok::<(), xesysman::AppError>(())
//! ```

pub mod diagnostics;
pub mod frequency;
pub mod memory;
pub mod os;
pub mod performance;
pub mod registry;
pub mod temperature;

pub use diagnostics::Diagnostics;
pub use frequency::Frequency;
pub use memory::Memory;
pub use os::{OsDiagnostics, OsFrequency, OsMemory, OsPerformance, OsSysman, OsTemperature};
pub use performance::Performance;
pub use registry::DomainRegistry;
pub use temperature::Temperature;

use crate::domain::HardwareInfo;
use crate::error::Result;
use crate::linux::{DrmDevice, LinuxSysman};
use crate::sysfs::FsAccess;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Domain kinds a device exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DomainKind {
    Frequency,
    Memory,
    Performance,
    Temperature,
    Diagnostics,
}

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Frequency => "frequency",
            Self::Memory => "memory",
            Self::Performance => "performance",
            Self::Temperature => "temperature",
            Self::Diagnostics => "diagnostics",
        };
        write!(f, "{}", name)
    }
}

/// System management view of one device
pub struct Sysman {
    os: Box<dyn OsSysman>,
    frequency: DomainRegistry<Frequency>,
    memory: DomainRegistry<Memory>,
    performance: DomainRegistry<Performance>,
    temperature: DomainRegistry<Temperature>,
    diagnostics: DomainRegistry<Diagnostics>,
}

impl Sysman {
    /// Wrap a platform; no domain is discovered until first queried
    pub fn new(os: Box<dyn OsSysman>) -> Self {
        Self {
            os,
            frequency: DomainRegistry::new(),
            memory: DomainRegistry::new(),
            performance: DomainRegistry::new(),
            temperature: DomainRegistry::new(),
            diagnostics: DomainRegistry::new(),
        }
    }

    /// Open DRM card `card` through the Linux sysfs backend
    pub fn open(fs: Arc<dyn FsAccess>, card: u32) -> Result<Self> {
        let device = DrmDevice::discover(fs.as_ref(), card)?;
        Ok(Self::new(Box::new(LinuxSysman::new(fs, Arc::new(device)))))
    }

    pub fn subdevice_count(&self) -> u32 {
        self.os.subdevice_count()
    }

    pub fn hardware_info(&self) -> HardwareInfo {
        self.os.hardware_info()
    }

    /// Enumerate clock domains
    pub fn frequency_domains(&self, count: &mut u32, out: Option<&mut Vec<Arc<Frequency>>>) {
        self.frequency
            .enumerate(count, out, || frequency::discover(self.os.as_ref()));
    }

    /// Enumerate memory modules
    pub fn memory_modules(&self, count: &mut u32, out: Option<&mut Vec<Arc<Memory>>>) {
        self.memory
            .enumerate(count, out, || memory::discover(self.os.as_ref()));
    }

    /// Enumerate performance factor domains
    pub fn performance_factors(&self, count: &mut u32, out: Option<&mut Vec<Arc<Performance>>>) {
        self.performance
            .enumerate(count, out, || performance::discover(self.os.as_ref()));
    }

    /// Enumerate temperature sensors
    pub fn temperature_sensors(&self, count: &mut u32, out: Option<&mut Vec<Arc<Temperature>>>) {
        self.temperature
            .enumerate(count, out, || temperature::discover(self.os.as_ref()));
    }

    /// Enumerate diagnostic suites
    pub fn diagnostic_suites(&self, count: &mut u32, out: Option<&mut Vec<Arc<Diagnostics>>>) {
        self.diagnostics
            .enumerate(count, out, || diagnostics::discover(self.os.as_ref()));
    }

    pub fn frequencies(&self) -> &[Arc<Frequency>] {
        self.frequency
            .handles(|| frequency::discover(self.os.as_ref()))
    }

    pub fn memories(&self) -> &[Arc<Memory>] {
        self.memory.handles(|| memory::discover(self.os.as_ref()))
    }

    pub fn performances(&self) -> &[Arc<Performance>] {
        self.performance
            .handles(|| performance::discover(self.os.as_ref()))
    }

    pub fn temperatures(&self) -> &[Arc<Temperature>] {
        self.temperature
            .handles(|| temperature::discover(self.os.as_ref()))
    }

    pub fn diagnostics(&self) -> &[Arc<Diagnostics>] {
        self.diagnostics
            .handles(|| diagnostics::discover(self.os.as_ref()))
    }

    /// How many times a kind's handle list has been built
    pub fn build_count(&self, kind: DomainKind) -> usize {
        match kind {
            DomainKind::Frequency => self.frequency.build_count(),
            DomainKind::Memory => self.memory.build_count(),
            DomainKind::Performance => self.performance.build_count(),
            DomainKind::Temperature => self.temperature.build_count(),
            DomainKind::Diagnostics => self.diagnostics.build_count(),
        }
    }
}

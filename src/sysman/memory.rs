//! Memory module domains

use crate::domain::{MemoryBandwidth, MemoryProperties, MemoryState};
use crate::error::SysmanError;
use crate::sysman::os::{OsMemory, OsSysman};
use crate::sysman::registry::subdevice_ids;

/// Device-local memory of one subdevice
pub struct Memory {
    os: Box<dyn OsMemory>,
    properties: MemoryProperties,
}

impl Memory {
    /// Keep the module only if the hardware has it
    pub fn try_new(os: Box<dyn OsMemory>) -> Option<Self> {
        if !os.is_supported() {
            return None;
        }
        let properties = os.properties();
        Some(Self { os, properties })
    }

    pub fn properties(&self) -> &MemoryProperties {
        &self.properties
    }

    /// Health and occupancy
    pub fn state(&self) -> Result<MemoryState, SysmanError> {
        self.os.state()
    }

    /// Cumulative traffic counters
    pub fn bandwidth(&self) -> Result<MemoryBandwidth, SysmanError> {
        self.os.bandwidth()
    }
}

/// Build one module per subdevice, dropping unsupported ones
pub fn discover(os: &dyn OsSysman) -> Vec<Memory> {
    subdevice_ids(os.subdevice_count())
        .into_iter()
        .filter_map(|subdevice| {
            let memory = Memory::try_new(os.create_memory(subdevice));
            if memory.is_none() {
                log::debug!("No device memory on subdevice {:?}", subdevice);
            }
            memory
        })
        .collect()
}

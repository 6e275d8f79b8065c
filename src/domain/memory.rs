//! Memory module domain types
//!
//! Properties, health state and bandwidth counters of device-local memory.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Memory technology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryType {
    Lpddr4,
    Gddr6,
    Hbm2e,
    Unknown,
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lpddr4 => "LPDDR4",
            Self::Gddr6 => "GDDR6",
            Self::Hbm2e => "HBM2e",
            Self::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// Where the memory module lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryLocation {
    /// System memory
    System,
    /// Device-local memory
    Device,
}

/// Health reported by the memory controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MemoryHealth {
    Ok,
    /// Correctable errors are accumulating
    Degraded,
    /// Uncorrectable errors occurred; workloads may be affected
    Critical,
    /// Module should be replaced
    Replace,
    #[default]
    Unknown,
}

impl MemoryHealth {
    /// Parse the health keyword written by the kernel driver
    pub fn from_sysfs(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "ok" => Self::Ok,
            "degraded" => Self::Degraded,
            "critical" => Self::Critical,
            "replace" => Self::Replace,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for MemoryHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "OK",
            Self::Degraded => "Degraded",
            Self::Critical => "Critical",
            Self::Replace => "Replace",
            Self::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// Static properties of a memory module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryProperties {
    /// Memory technology
    pub memory_type: MemoryType,
    /// Location of the module
    pub location: MemoryLocation,
    /// Whether the module lives on a subdevice
    pub on_subdevice: bool,
    /// Subdevice id (0 when not on a subdevice)
    pub subdevice_id: u32,
    /// Physical size in bytes (0 when unknown)
    pub physical_size: u64,
    /// Number of channels (-1 when unknown)
    pub num_channels: i32,
    /// Bus width in bits (-1 when unknown)
    pub bus_width: i32,
}

/// Live memory state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryState {
    /// Health reported by the driver
    pub health: MemoryHealth,
    /// Free bytes
    pub free: u64,
    /// Total allocatable bytes
    pub size: u64,
}

impl MemoryState {
    /// Used bytes
    pub fn used(&self) -> u64 {
        self.size.saturating_sub(self.free)
    }

    /// Get usage percentage (0 - 100)
    pub fn usage_percent(&self) -> u8 {
        if self.size == 0 {
            0
        } else {
            ((self.used() as f64 / self.size as f64) * 100.0) as u8
        }
    }
}

/// Monotonic bandwidth counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryBandwidth {
    /// Total bytes read
    pub read_counter: u64,
    /// Total bytes written
    pub write_counter: u64,
    /// Maximum bandwidth in bytes per second
    pub max_bandwidth: u64,
    /// Telemetry timestamp of the sample
    pub timestamp: u64,
}

impl MemoryBandwidth {
    /// Average read+write throughput in bytes per timestamp tick between two samples
    pub fn throughput_since(&self, earlier: &MemoryBandwidth) -> Option<f64> {
        let ticks = self.timestamp.checked_sub(earlier.timestamp)?;
        if ticks == 0 {
            return None;
        }
        let bytes = self.read_counter.checked_sub(earlier.read_counter)?
            + self.write_counter.checked_sub(earlier.write_counter)?;
        Some(bytes as f64 / ticks as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_parsing() {
        assert_eq!(MemoryHealth::from_sysfs("ok\n"), MemoryHealth::Ok);
        assert_eq!(MemoryHealth::from_sysfs("Degraded"), MemoryHealth::Degraded);
        assert_eq!(MemoryHealth::from_sysfs("replace"), MemoryHealth::Replace);
        assert_eq!(MemoryHealth::from_sysfs("??"), MemoryHealth::Unknown);
    }

    #[test]
    fn test_memory_state_usage() {
        let state = MemoryState {
            health: MemoryHealth::Ok,
            free: 6 * 1024,
            size: 8 * 1024,
        };
        assert_eq!(state.used(), 2 * 1024);
        assert_eq!(state.usage_percent(), 25);
    }

    #[test]
    fn test_bandwidth_throughput() {
        let first = MemoryBandwidth {
            read_counter: 1000,
            write_counter: 500,
            max_bandwidth: 0,
            timestamp: 10,
        };
        let second = MemoryBandwidth {
            read_counter: 3000,
            write_counter: 1500,
            max_bandwidth: 0,
            timestamp: 20,
        };
        assert_eq!(second.throughput_since(&first), Some(300.0));
        assert_eq!(first.throughput_since(&second), None);
    }
}

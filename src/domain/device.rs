//! Device identity types
//!
//! Hardware family, capability flags and the summary shown by `list`.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// GPU product family, derived from the PCI device id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProductFamily {
    /// Discrete Xe-LP
    Dg1,
    /// Discrete Xe-HPG
    Dg2,
    /// Data-center Xe-HPC (multi-tile)
    Pvc,
    /// Integrated Xe-LPG with a standalone media GT
    Mtl,
    #[default]
    Unknown,
}

impl ProductFamily {
    /// Map a PCI device id to its product family
    pub fn from_device_id(device_id: u16) -> Self {
        match device_id {
            0x4905..=0x4909 => Self::Dg1,
            0x5690..=0x56bf => Self::Dg2,
            0x0bd0..=0x0bdb => Self::Pvc,
            0x7d40..=0x7d67 => Self::Mtl,
            _ => Self::Unknown,
        }
    }

    /// Capability flags every device of this family carries
    pub fn default_caps(&self) -> HwCaps {
        match self {
            Self::Dg1 => HwCaps::IMAGES | HwCaps::LOCAL_MEMORY,
            Self::Dg2 => HwCaps::IMAGES | HwCaps::LOCAL_MEMORY,
            Self::Pvc => HwCaps::LOCAL_MEMORY,
            Self::Mtl => HwCaps::IMAGES,
            Self::Unknown => HwCaps::empty(),
        }
    }

    /// Frequency grid step in MHz
    pub fn frequency_step(&self) -> f64 {
        match self {
            Self::Dg2 | Self::Pvc => 50.0,
            _ => 50.0 / 3.0,
        }
    }
}

impl fmt::Display for ProductFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dg1 => "DG1",
            Self::Dg2 => "DG2",
            Self::Pvc => "PVC",
            Self::Mtl => "MTL",
            Self::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

bitflags! {
    /// Hardware capability flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct HwCaps: u32 {
        /// Device has image/media engines
        const IMAGES = 1 << 0;
        /// Device has device-local memory
        const LOCAL_MEMORY = 1 << 1;
    }
}

/// Hardware information blob for one device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareInfo {
    /// Product family
    pub family: ProductFamily,
    /// PCI device id
    pub device_id: u16,
    /// Capability flags
    pub caps: HwCaps,
}

impl HardwareInfo {
    /// Build hardware info for a PCI device id using family default caps
    pub fn from_device_id(device_id: u16) -> Self {
        let family = ProductFamily::from_device_id(device_id);
        Self {
            family,
            device_id,
            caps: family.default_caps(),
        }
    }

    /// Builder: override capability flags
    pub fn with_caps(mut self, caps: HwCaps) -> Self {
        self.caps = caps;
        self
    }

    /// Whether the device reports image/media engine support
    pub fn supports_images(&self) -> bool {
        self.caps.contains(HwCaps::IMAGES)
    }

    /// Whether the device has local memory
    pub fn has_local_memory(&self) -> bool {
        self.caps.contains(HwCaps::LOCAL_MEMORY)
    }
}

/// Per-device summary for listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    /// DRM card index
    pub card: u32,
    /// Hardware info
    pub hardware: HardwareInfo,
    /// Number of subdevices (0 when the device is not partitioned)
    pub subdevice_count: u32,
    /// Kernel driver name
    pub driver: String,
    /// PCI root path
    pub pci_root: String,
}

//! Sysfs and telemetry memory backend

use crate::domain::{
    HardwareInfo, MemoryBandwidth, MemoryHealth, MemoryLocation, MemoryProperties, MemoryState,
    MemoryType, ProductFamily,
};
use crate::error::SysmanError;
use crate::pmt::tables::{
    bridge_read_key, bridge_write_key, msu_read_key, msu_write_key, CHANNELS_PER_MSU,
    KEY_MSU_BITMASK, KEY_TIMESTAMP, MAX_BRIDGES, MAX_MSU,
};
use crate::pmt::PlatformMonitoringTech;
use crate::sysfs::{FsAccess, KeyScope, PathResolver, SysfsKey, SysfsLocation};
use crate::sysman::OsMemory;

use std::path::PathBuf;
use std::sync::Arc;

/// Bytes moved by one memory request
pub const TRANSACTION_BYTES: u64 = 32;

/// Memory technology, channel count and bus width of a family
fn family_memory(family: ProductFamily) -> (MemoryType, i32, i32) {
    match family {
        ProductFamily::Dg1 => (MemoryType::Lpddr4, 4, 128),
        ProductFamily::Dg2 => (MemoryType::Gddr6, 8, 256),
        ProductFamily::Pvc => (MemoryType::Hbm2e, 8, 4096),
        ProductFamily::Mtl | ProductFamily::Unknown => (MemoryType::Unknown, -1, -1),
    }
}

/// Peak bandwidth per subdevice in bytes per second
fn family_max_bandwidth(family: ProductFamily) -> u64 {
    match family {
        ProductFamily::Dg1 => 68_000_000_000,
        ProductFamily::Dg2 => 560_000_000_000,
        ProductFamily::Pvc => 1_638_400_000_000,
        ProductFamily::Mtl | ProductFamily::Unknown => 0,
    }
}

/// Device-local memory of one subdevice
pub struct LinuxMemory {
    fs: Arc<dyn FsAccess>,
    card_dir: PathBuf,
    resolver: PathResolver,
    location: SysfsLocation,
    per_tile: bool,
    subdevice: Option<u32>,
    hardware: HardwareInfo,
    pmt: Option<Arc<PlatformMonitoringTech>>,
}

impl LinuxMemory {
    pub fn new(
        fs: Arc<dyn FsAccess>,
        card_dir: PathBuf,
        resolver: PathResolver,
        subdevice: Option<u32>,
        hardware: HardwareInfo,
        pmt: Option<Arc<PlatformMonitoringTech>>,
    ) -> Self {
        let location = SysfsLocation::new(subdevice.unwrap_or(0), 0);
        let per_tile = resolver.probe_per_tile(fs.as_ref(), &card_dir, KeyScope::Tile, location);
        Self {
            fs,
            card_dir,
            resolver,
            location,
            per_tile,
            subdevice,
            hardware,
            pmt,
        }
    }

    fn path(&self, key: SysfsKey) -> Result<PathBuf, SysmanError> {
        self.resolver
            .resolve(key, self.location, self.per_tile)
            .map(|p| self.card_dir.join(p))
            .ok_or_else(|| SysmanError::Unsupported(format!("{:?}", key)))
    }

    fn read_bytes(&self, key: SysfsKey) -> Result<u64, SysmanError> {
        Ok(self.fs.read_u64(&self.path(key)?)?)
    }

    fn health(&self) -> MemoryHealth {
        self.path(SysfsKey::MemoryHealth)
            .ok()
            .and_then(|p| self.fs.read_string(&p).ok())
            .map(|s| MemoryHealth::from_sysfs(&s))
            .unwrap_or_default()
    }

    /// Sum read and write request counters of every present sub-unit
    fn request_counts(&self, pmt: &PlatformMonitoringTech) -> Result<(u64, u64), SysmanError> {
        let instance = self.subdevice;
        let mask = pmt.read_u32(KEY_MSU_BITMASK, instance)?;

        let mut reads = 0u64;
        let mut writes = 0u64;
        for msu in (0..MAX_MSU).filter(|m| mask & (1 << m) != 0) {
            for channel in 0..CHANNELS_PER_MSU {
                reads = reads.wrapping_add(pmt.read_u64(&msu_read_key(msu, channel), instance)?);
                writes =
                    writes.wrapping_add(pmt.read_u64(&msu_write_key(msu, channel), instance)?);
            }
        }

        for bridge in (0..MAX_BRIDGES).filter(|b| pmt.has_key(&bridge_read_key(*b))) {
            reads = reads.wrapping_add(pmt.read_u64(&bridge_read_key(bridge), instance)?);
            writes = writes.wrapping_add(pmt.read_u64(&bridge_write_key(bridge), instance)?);
        }

        Ok((reads, writes))
    }
}

impl OsMemory for LinuxMemory {
    fn is_supported(&self) -> bool {
        self.hardware.has_local_memory()
    }

    fn properties(&self) -> MemoryProperties {
        let (memory_type, num_channels, bus_width) = family_memory(self.hardware.family);
        MemoryProperties {
            memory_type,
            location: MemoryLocation::Device,
            on_subdevice: self.subdevice.is_some(),
            subdevice_id: self.subdevice.unwrap_or(0),
            physical_size: self.read_bytes(SysfsKey::MemoryTotal).unwrap_or(0),
            num_channels,
            bus_width,
        }
    }

    fn state(&self) -> Result<MemoryState, SysmanError> {
        Ok(MemoryState {
            health: self.health(),
            free: self.read_bytes(SysfsKey::MemoryAvailable)?,
            size: self.read_bytes(SysfsKey::MemoryTotal)?,
        })
    }

    fn bandwidth(&self) -> Result<MemoryBandwidth, SysmanError> {
        let pmt = self.pmt.as_ref().ok_or_else(|| {
            SysmanError::DependencyUnavailable("no telemetry for memory bandwidth".to_string())
        })?;

        let (reads, writes) = self.request_counts(pmt)?;
        Ok(MemoryBandwidth {
            read_counter: reads.wrapping_mul(TRANSACTION_BYTES),
            write_counter: writes.wrapping_mul(TRANSACTION_BYTES),
            max_bandwidth: family_max_bandwidth(self.hardware.family),
            timestamp: pmt.read_u64(KEY_TIMESTAMP, self.subdevice)?,
        })
    }
}

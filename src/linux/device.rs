//! DRM card discovery
//!
//! Identifies a card from `/sys/class/drm/card<N>`: PCI device id, bound
//! kernel driver, tile count and the PCI port the telemetry hangs off.

use crate::domain::{DeviceSummary, HardwareInfo};
use crate::error::{AppError, SysmanError};
use crate::sysfs::traits::parse_hex;
use crate::sysfs::{DeviceInfo, FsAccess, KmdGeneration};

use std::path::{Path, PathBuf};

/// DRM class directory
pub const DRM_CLASS_DIR: &str = "/sys/class/drm";

/// PCI vendor id of the supported GPUs
pub const INTEL_VENDOR_ID: u64 = 0x8086;

const PRELIM_MARKER: &str = "prelim_uapi_version";

/// One DRM card bound to a supported driver
#[derive(Debug, Clone)]
pub struct DrmDevice {
    card: u32,
    sysfs_dir: PathBuf,
    hardware: HardwareInfo,
    subdevice_count: u32,
    pci_root: PathBuf,
    generation: KmdGeneration,
}

impl DrmDevice {
    /// Inspect `card<N>`
    pub fn discover(fs: &dyn FsAccess, card: u32) -> Result<Self, AppError> {
        let sysfs_dir = Path::new(DRM_CLASS_DIR).join(format!("card{}", card));
        if !fs.directory_exists(&sysfs_dir) {
            return Err(AppError::DeviceNotFound(card));
        }
        let device_dir = sysfs_dir.join("device");

        let vendor_path = device_dir.join("vendor");
        let vendor = parse_hex(&vendor_path, &fs.read_string(&vendor_path)?)?;
        if vendor != INTEL_VENDOR_ID {
            log::debug!("card{} has vendor {:#06x}", card, vendor);
            return Err(AppError::DeviceNotFound(card));
        }

        let id_path = device_dir.join("device");
        let device_id = parse_hex(&id_path, &fs.read_string(&id_path)?)? as u16;
        let hardware = HardwareInfo::from_device_id(device_id);

        let driver = driver_name(fs, &device_dir)?;
        let prelim = fs.file_exists(&sysfs_dir.join(PRELIM_MARKER));
        let generation = KmdGeneration::detect(&driver, prelim).ok_or_else(|| {
            SysmanError::Unsupported(format!("card{} is bound to driver {}", card, driver))
        })?;

        let subdevice_count = count_tiles(fs, &device_dir);
        let pci_root = pci_root_path(fs, &device_dir)?;

        log::debug!(
            "card{}: {:#06x} ({}) on {}, {} subdevices, PCI root {}",
            card,
            device_id,
            hardware.family,
            generation,
            subdevice_count,
            pci_root.display()
        );

        Ok(Self {
            card,
            sysfs_dir,
            hardware,
            subdevice_count,
            pci_root,
            generation,
        })
    }

    /// Indices of every card directory under the DRM class
    ///
    /// Connector entries such as `card0-DP-1` are skipped.
    pub fn list_cards(fs: &dyn FsAccess) -> Vec<u32> {
        match fs.list_directory(Path::new(DRM_CLASS_DIR)) {
            Ok(names) => {
                let mut cards: Vec<u32> = names
                    .iter()
                    .filter_map(|n| n.strip_prefix("card"))
                    .filter_map(|n| n.parse().ok())
                    .collect();
                cards.sort_unstable();
                cards
            }
            Err(e) => {
                log::warn!("Cannot list {}: {}", DRM_CLASS_DIR, e);
                Vec::new()
            }
        }
    }

    pub fn card(&self) -> u32 {
        self.card
    }

    /// Summary for listings
    pub fn summary(&self) -> DeviceSummary {
        DeviceSummary {
            card: self.card,
            hardware: self.hardware,
            subdevice_count: self.subdevice_count,
            driver: self.generation.to_string(),
            pci_root: self.pci_root.display().to_string(),
        }
    }
}

impl DeviceInfo for DrmDevice {
    fn subdevice_count(&self) -> u32 {
        self.subdevice_count
    }

    fn hardware_info(&self) -> HardwareInfo {
        self.hardware
    }

    fn pci_root_path(&self) -> &Path {
        &self.pci_root
    }

    fn sysfs_dir(&self) -> &Path {
        &self.sysfs_dir
    }

    fn kmd_generation(&self) -> KmdGeneration {
        self.generation
    }
}

fn driver_name(fs: &dyn FsAccess, device_dir: &Path) -> Result<String, AppError> {
    let driver = fs.real_path(&device_dir.join("driver"))?;
    Ok(driver
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default())
}

/// Tiles under `device/`; a single tile means no subdevices
fn count_tiles(fs: &dyn FsAccess, device_dir: &Path) -> u32 {
    let tiles = fs
        .list_directory(device_dir)
        .map(|names| {
            names
                .iter()
                .filter(|n| {
                    n.strip_prefix("tile")
                        .is_some_and(|i| !i.is_empty() && i.bytes().all(|b| b.is_ascii_digit()))
                })
                .count() as u32
        })
        .unwrap_or(0);
    if tiles < 2 {
        0
    } else {
        tiles
    }
}

/// The device's PCI path with its last two components removed
///
/// Discrete cards sit behind an upstream switch port; telemetry nodes hang
/// off that port rather than the endpoint.
fn pci_root_path(fs: &dyn FsAccess, device_dir: &Path) -> Result<PathBuf, AppError> {
    let real = fs.real_path(device_dir)?;
    Ok(real
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or(real))
}

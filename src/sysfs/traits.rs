//! Trait definitions for raw OS access
//!
//! These traits are the narrow collaborator interfaces the sysman core
//! consumes. They abstract over the filesystem to enable testing with mocks.

use crate::domain::HardwareInfo;
use crate::error::AccessError;
use crate::sysfs::layout::KmdGeneration;

use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Raw access to virtual-filesystem nodes
///
/// Paths are absolute logical paths (`/sys/class/drm/card0/...`);
/// implementations may map them onto a different root.
pub trait FsAccess: Send + Sync {
    /// Read a file as a string with trailing whitespace removed
    fn read_string(&self, path: &Path) -> Result<String, AccessError>;

    /// Overwrite a file with `value`
    fn write_string(&self, path: &Path, value: &str) -> Result<(), AccessError>;

    /// Whether `path` is an existing directory
    fn directory_exists(&self, path: &Path) -> bool;

    /// Whether `path` is an existing file
    fn file_exists(&self, path: &Path) -> bool;

    /// Names of the entries of a directory, sorted
    fn list_directory(&self, path: &Path) -> Result<Vec<String>, AccessError>;

    /// Resolve symlinks in `path`
    fn real_path(&self, path: &Path) -> Result<PathBuf, AccessError>;

    /// Positioned read of up to `buf.len()` bytes at `offset`
    ///
    /// Returns the number of bytes read, which is short at end of file.
    fn read_at(&self, path: &Path, offset: u64, buf: &mut [u8]) -> Result<usize, AccessError>;

    /// Read an unsigned integer
    fn read_u64(&self, path: &Path) -> Result<u64, AccessError> {
        parse_value(path, &self.read_string(path)?)
    }

    /// Read a signed integer
    fn read_i64(&self, path: &Path) -> Result<i64, AccessError> {
        parse_value(path, &self.read_string(path)?)
    }

    /// Read a floating point value
    fn read_f64(&self, path: &Path) -> Result<f64, AccessError> {
        parse_value(path, &self.read_string(path)?)
    }

    /// Write a floating point value
    fn write_f64(&self, path: &Path, value: f64) -> Result<(), AccessError> {
        self.write_string(path, &value.to_string())
    }

    /// Write an unsigned integer
    fn write_u64(&self, path: &Path, value: u64) -> Result<(), AccessError> {
        self.write_string(path, &value.to_string())
    }
}

/// Identity of one GPU device
pub trait DeviceInfo: Send + Sync {
    /// Number of subdevices (0 when the device is its own sole instance)
    fn subdevice_count(&self) -> u32;

    /// Hardware family and capability flags
    fn hardware_info(&self) -> HardwareInfo;

    /// PCI path of the port above the device, used to match telemetry nodes
    fn pci_root_path(&self) -> &Path;

    /// DRM card directory the sysfs keys are relative to
    fn sysfs_dir(&self) -> &Path;

    /// Kernel driver generation bound to the device
    fn kmd_generation(&self) -> KmdGeneration;
}

/// Parse trimmed file content, reporting the path on failure
pub fn parse_value<T: FromStr>(path: &Path, raw: &str) -> Result<T, AccessError> {
    raw.trim().parse().map_err(|_| AccessError::Parse {
        path: path.display().to_string(),
        value: raw.trim().to_string(),
    })
}

/// Parse a hexadecimal value with or without a `0x` prefix
pub fn parse_hex(path: &Path, raw: &str) -> Result<u64, AccessError> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u64::from_str_radix(digits, 16).map_err(|_| AccessError::Parse {
        path: path.display().to_string(),
        value: trimmed.to_string(),
    })
}

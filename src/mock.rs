//! Mock implementations for testing
//!
//! Provides an in-memory filesystem and a mock device for unit testing
//! without real hardware.

use crate::domain::HardwareInfo;
use crate::error::AccessError;
use crate::sysfs::{DeviceInfo, FsAccess, KmdGeneration};

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

/// Hook consulted before every write; returning an error rejects the write
pub type WriteGuard =
    Box<dyn Fn(&Path, &str, &BTreeMap<PathBuf, Vec<u8>>) -> Result<(), AccessError> + Send + Sync>;

/// In-memory filesystem
pub struct MockFs {
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
    dirs: BTreeSet<PathBuf>,
    links: BTreeMap<PathBuf, PathBuf>,
    failing_reads: BTreeSet<PathBuf>,
    failing_writes: BTreeSet<PathBuf>,
    writes: Mutex<Vec<(PathBuf, String)>>,
    write_guard: Option<WriteGuard>,
}

impl MockFs {
    /// Create an empty filesystem containing only `/`
    pub fn new() -> Self {
        let mut dirs = BTreeSet::new();
        dirs.insert(PathBuf::from("/"));
        Self {
            files: RwLock::new(BTreeMap::new()),
            dirs,
            links: BTreeMap::new(),
            failing_reads: BTreeSet::new(),
            failing_writes: BTreeSet::new(),
            writes: Mutex::new(Vec::new()),
            write_guard: None,
        }
    }

    fn add_ancestors(&mut self, path: &Path) {
        for ancestor in path.ancestors().skip(1) {
            self.dirs.insert(ancestor.to_path_buf());
        }
    }

    /// Builder: add a directory and its ancestors
    pub fn with_dir(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        self.add_ancestors(path);
        self.dirs.insert(path.to_path_buf());
        self
    }

    /// Builder: add a text file
    pub fn with_file(self, path: impl AsRef<Path>, content: impl ToString) -> Self {
        self.with_binary(path, content.to_string().into_bytes())
    }

    /// Builder: add a binary file
    pub fn with_binary(mut self, path: impl AsRef<Path>, content: Vec<u8>) -> Self {
        let path = path.as_ref();
        self.add_ancestors(path);
        self.files
            .get_mut()
            .unwrap()
            .insert(path.to_path_buf(), content);
        self
    }

    /// Builder: add a symlink `link` -> `target`
    pub fn with_symlink(mut self, link: impl AsRef<Path>, target: impl AsRef<Path>) -> Self {
        let link = link.as_ref();
        self.add_ancestors(link);
        self.links
            .insert(link.to_path_buf(), target.as_ref().to_path_buf());
        self
    }

    /// Builder: reads of `path` fail with an IO error
    pub fn with_failing_read(mut self, path: impl AsRef<Path>) -> Self {
        self.failing_reads.insert(path.as_ref().to_path_buf());
        self
    }

    /// Builder: writes to `path` fail with an IO error
    pub fn with_failing_write(mut self, path: impl AsRef<Path>) -> Self {
        self.failing_writes.insert(path.as_ref().to_path_buf());
        self
    }

    /// Builder: install a write guard
    pub fn with_write_guard(mut self, guard: WriteGuard) -> Self {
        self.write_guard = Some(guard);
        self
    }

    /// Current text content of a file
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        let path = self.resolve(path.as_ref());
        self.files
            .read()
            .unwrap()
            .get(&path)
            .map(|c| String::from_utf8_lossy(c).into_owned())
    }

    /// Every successful write, in order
    pub fn writes(&self) -> Vec<(PathBuf, String)> {
        self.writes.lock().unwrap().clone()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        let mut current = path.to_path_buf();
        for _ in 0..8 {
            let hit = current.ancestors().find_map(|a| {
                self.links
                    .get(a)
                    .map(|target| (a.to_path_buf(), target.clone()))
            });
            match hit {
                Some((link, target)) => {
                    let rest = current.strip_prefix(&link).unwrap_or(Path::new(""));
                    current = if rest.as_os_str().is_empty() {
                        target
                    } else {
                        target.join(rest)
                    };
                }
                None => break,
            }
        }
        current
    }

    fn not_found(path: &Path) -> AccessError {
        AccessError::NotFound(path.display().to_string())
    }

    fn io_failure(path: &Path) -> AccessError {
        AccessError::Io {
            path: path.display().to_string(),
            message: "injected failure".to_string(),
        }
    }
}

impl Default for MockFs {
    fn default() -> Self {
        Self::new()
    }
}

impl FsAccess for MockFs {
    fn read_string(&self, path: &Path) -> Result<String, AccessError> {
        if self.failing_reads.contains(path) {
            return Err(Self::io_failure(path));
        }
        self.contents(path)
            .map(|c| c.trim_end().to_string())
            .ok_or_else(|| Self::not_found(path))
    }

    fn write_string(&self, path: &Path, value: &str) -> Result<(), AccessError> {
        if self.failing_writes.contains(path) {
            return Err(Self::io_failure(path));
        }
        let resolved = self.resolve(path);
        let mut files = self.files.write().unwrap();
        if !files.contains_key(&resolved) {
            return Err(Self::not_found(path));
        }
        if let Some(guard) = &self.write_guard {
            guard(&resolved, value, &files)?;
        }
        files.insert(resolved.clone(), value.as_bytes().to_vec());
        self.writes
            .lock()
            .unwrap()
            .push((resolved, value.to_string()));
        Ok(())
    }

    fn directory_exists(&self, path: &Path) -> bool {
        self.dirs.contains(&self.resolve(path))
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(&self.resolve(path))
    }

    fn list_directory(&self, path: &Path) -> Result<Vec<String>, AccessError> {
        let dir = self.resolve(path);
        if !self.dirs.contains(&dir) {
            return Err(Self::not_found(path));
        }
        let files = self.files.read().unwrap();
        let names: BTreeSet<String> = self
            .dirs
            .iter()
            .chain(files.keys())
            .chain(self.links.keys())
            .filter(|p| p.parent() == Some(dir.as_path()))
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        Ok(names.into_iter().collect())
    }

    fn real_path(&self, path: &Path) -> Result<PathBuf, AccessError> {
        let resolved = self.resolve(path);
        if self.dirs.contains(&resolved) || self.file_exists(&resolved) {
            Ok(resolved)
        } else {
            Err(Self::not_found(path))
        }
    }

    fn read_at(&self, path: &Path, offset: u64, buf: &mut [u8]) -> Result<usize, AccessError> {
        if self.failing_reads.contains(path) {
            return Err(Self::io_failure(path));
        }
        let files = self.files.read().unwrap();
        let content = files
            .get(&self.resolve(path))
            .ok_or_else(|| Self::not_found(path))?;
        let start = (offset as usize).min(content.len());
        let n = buf.len().min(content.len() - start);
        buf[..n].copy_from_slice(&content[start..start + n]);
        Ok(n)
    }
}

/// Mock device for testing
#[derive(Debug, Clone)]
pub struct MockDevice {
    subdevice_count: u32,
    hardware: HardwareInfo,
    pci_root: PathBuf,
    sysfs_dir: PathBuf,
    generation: KmdGeneration,
}

impl MockDevice {
    /// Create a mock device with no subdevices on the i915 driver
    pub fn new(hardware: HardwareInfo) -> Self {
        Self {
            subdevice_count: 0,
            hardware,
            pci_root: PathBuf::from("/sys/devices/pci0000:00/0000:00:01.0"),
            sysfs_dir: PathBuf::from("/sys/class/drm/card0"),
            generation: KmdGeneration::I915Upstream,
        }
    }

    /// Builder: set subdevice count
    pub fn with_subdevices(mut self, count: u32) -> Self {
        self.subdevice_count = count;
        self
    }

    /// Builder: set driver generation
    pub fn with_generation(mut self, generation: KmdGeneration) -> Self {
        self.generation = generation;
        self
    }

    /// Builder: set PCI root path
    pub fn with_pci_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.pci_root = root.into();
        self
    }
}

impl DeviceInfo for MockDevice {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_read_write() {
        let fs = MockFs::new().with_file("/sys/a/b", "42\n");
        assert_eq!(fs.read_u64(Path::new("/sys/a/b")).unwrap(), 42);
        fs.write_u64(Path::new("/sys/a/b"), 7).unwrap();
        assert_eq!(fs.contents("/sys/a/b").as_deref(), Some("7"));
        assert_eq!(fs.writes().len(), 1);
    }

    #[test]
    fn test_mock_fs_write_to_missing_file_fails() {
        let fs = MockFs::new().with_dir("/sys/a");
        assert!(matches!(
            fs.write_u64(Path::new("/sys/a/b"), 1),
            Err(AccessError::NotFound(_))
        ));
    }

    #[test]
    fn test_mock_fs_directories_and_links() {
        let fs = MockFs::new()
            .with_dir("/sys/devices/pci0000:00/0000:00:01.0/telem")
            .with_symlink(
                "/sys/class/intel_pmt/telem1",
                "/sys/devices/pci0000:00/0000:00:01.0/telem",
            )
            .with_file("/sys/devices/pci0000:00/0000:00:01.0/telem/guid", "0x1");

        assert!(fs.directory_exists(Path::new("/sys/class/intel_pmt/telem1")));
        assert_eq!(
            fs.list_directory(Path::new("/sys/class/intel_pmt")).unwrap(),
            vec!["telem1".to_string()]
        );
        assert_eq!(
            fs.read_string(Path::new("/sys/class/intel_pmt/telem1/guid"))
                .unwrap(),
            "0x1"
        );
        assert_eq!(
            fs.real_path(Path::new("/sys/class/intel_pmt/telem1")).unwrap(),
            PathBuf::from("/sys/devices/pci0000:00/0000:00:01.0/telem")
        );
    }

    #[test]
    fn test_mock_fs_read_at() {
        let fs = MockFs::new().with_binary("/telem", vec![0, 1, 2, 3, 4, 5]);
        let mut buf = [0u8; 4];
        assert_eq!(fs.read_at(Path::new("/telem"), 1, &mut buf).unwrap(), 4);
        assert_eq!(buf, [1, 2, 3, 4]);
        assert_eq!(fs.read_at(Path::new("/telem"), 4, &mut buf).unwrap(), 2);
        assert_eq!(fs.read_at(Path::new("/telem"), 10, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_mock_fs_injected_failures() {
        let fs = MockFs::new()
            .with_file("/a", "1")
            .with_failing_read("/a")
            .with_file("/b", "1")
            .with_failing_write("/b");
        assert!(matches!(
            fs.read_string(Path::new("/a")),
            Err(AccessError::Io { .. })
        ));
        assert!(fs.write_u64(Path::new("/b"), 2).is_err());
        assert!(fs.writes().is_empty());
    }

    #[test]
    fn test_mock_device_defaults() {
        let device = MockDevice::new(HardwareInfo::from_device_id(0x56a0)).with_subdevices(2);
        assert_eq!(device.subdevice_count(), 2);
        assert_eq!(device.kmd_generation(), KmdGeneration::I915Upstream);
        assert_eq!(device.sysfs_dir(), Path::new("/sys/class/drm/card0"));
    }
}

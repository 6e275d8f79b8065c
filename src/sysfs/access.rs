//! Filesystem access implementation
//!
//! Real implementation of the FsAccess trait over `std::fs`, optionally
//! rooted at a prefix so a fake tree can stand in for `/`.

use crate::error::AccessError;
use crate::sysfs::traits::FsAccess;

use std::fs;
use std::path::{Component, Path, PathBuf};

/// Sysfs access rooted at a directory
#[derive(Debug, Clone)]
pub struct SysfsAccess {
    root: PathBuf,
}

impl SysfsAccess {
    /// Access the live filesystem
    pub fn new() -> Self {
        Self::with_root("/")
    }

    /// Access a tree mounted at `root`; logical `/sys/...` maps to `root/sys/...`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root prefix this instance maps logical paths onto
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn map(&self, path: &Path) -> PathBuf {
        let relative: PathBuf = path
            .components()
            .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
            .collect();
        self.root.join(relative)
    }

    fn unmap(&self, physical: &Path) -> PathBuf {
        let root = fs::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());
        match physical.strip_prefix(&root) {
            Ok(rest) => Path::new("/").join(rest),
            Err(_) => physical.to_path_buf(),
        }
    }
}

impl Default for SysfsAccess {
    fn default() -> Self {
        Self::new()
    }
}

impl FsAccess for SysfsAccess {
    fn read_string(&self, path: &Path) -> Result<String, AccessError> {
        let content =
            fs::read_to_string(self.map(path)).map_err(|e| AccessError::from_io(path, e))?;
        Ok(content.trim_end().to_string())
    }

    fn write_string(&self, path: &Path, value: &str) -> Result<(), AccessError> {
        log::debug!("write {} <- {}", path.display(), value);
        fs::write(self.map(path), value).map_err(|e| AccessError::from_io(path, e))
    }

    fn directory_exists(&self, path: &Path) -> bool {
        self.map(path).is_dir()
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.map(path).is_file()
    }

    fn list_directory(&self, path: &Path) -> Result<Vec<String>, AccessError> {
        let entries = fs::read_dir(self.map(path)).map_err(|e| AccessError::from_io(path, e))?;
        let mut names: Vec<String> = entries
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        Ok(names)
    }

    fn real_path(&self, path: &Path) -> Result<PathBuf, AccessError> {
        let physical =
            fs::canonicalize(self.map(path)).map_err(|e| AccessError::from_io(path, e))?;
        Ok(self.unmap(&physical))
    }

    fn read_at(&self, path: &Path, offset: u64, buf: &mut [u8]) -> Result<usize, AccessError> {
        let file = fs::File::open(self.map(path)).map_err(|e| AccessError::from_io(path, e))?;
        positioned_read(&file, offset, buf).map_err(|e| AccessError::from_io(path, e))
    }
}

#[cfg(unix)]
fn positioned_read(file: &fs::File, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
    use std::os::unix::fs::FileExt;

    let mut filled = 0;
    while filled < buf.len() {
        match file.read_at(&mut buf[filled..], offset + filled as u64)? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

#[cfg(not(unix))]
fn positioned_read(file: &fs::File, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
    use std::io::{Read, Seek, SeekFrom};

    let mut file = file;
    file.seek(SeekFrom::Start(offset))?;
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

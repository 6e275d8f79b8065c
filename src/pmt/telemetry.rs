//! Telemetry node discovery and decoding
//!
//! Nodes live under `/sys/class/intel_pmt/telem<N>` and link into the PCI
//! hierarchy. A node's `guid` file selects a key-offset table; its `offset`
//! file gives the base of the node's window into the `telem` region.

use crate::domain::ProductFamily;
use crate::error::{AccessError, SysmanError};
use crate::pmt::tables::{key_offset_table, KeyOffsetTable};
use crate::sysfs::FsAccess;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Class directory all telemetry nodes are linked from
pub const PMT_CLASS_DIR: &str = "/sys/class/intel_pmt";

const TELEM_PREFIX: &str = "telem";
const GUID_FILE: &str = "guid";
const OFFSET_FILE: &str = "offset";
const TELEM_FILE: &str = "telem";

/// Fixed-width value stored little-endian in the telemetry region
pub trait TelemetryValue: Sized + Copy {
    /// Width in bytes
    const WIDTH: usize;

    /// Decode from exactly `WIDTH` bytes
    fn from_le(bytes: &[u8]) -> Self;
}

impl TelemetryValue for u32 {
    const WIDTH: usize = 4;

    fn from_le(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&bytes[..4]);
        u32::from_le_bytes(raw)
    }
}

impl TelemetryValue for u64 {
    const WIDTH: usize = 8;

    fn from_le(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        u64::from_le_bytes(raw)
    }
}

/// Find every telemetry node whose real path lies under `pci_root`
///
/// Returned in telemetry index order.
pub fn discover_telemetry_nodes(
    fs: &dyn FsAccess,
    pci_root: &Path,
) -> Result<BTreeMap<u32, PathBuf>, AccessError> {
    let class_dir = Path::new(PMT_CLASS_DIR);
    let mut nodes = BTreeMap::new();

    for name in fs.list_directory(class_dir)? {
        let Some(index) = name
            .strip_prefix(TELEM_PREFIX)
            .and_then(|n| n.parse::<u32>().ok())
        else {
            continue;
        };

        let link = class_dir.join(&name);
        match fs.real_path(&link) {
            Ok(real) if real.starts_with(pci_root) => {
                nodes.insert(index, link);
            }
            Ok(real) => {
                log::debug!("{} belongs to {}, skipping", name, real.display());
            }
            Err(e) => {
                log::debug!("Cannot resolve {}: {}", link.display(), e);
            }
        }
    }

    Ok(nodes)
}

/// Read the hardware GUID of a telemetry node
pub fn read_guid(fs: &dyn FsAccess, node_dir: &Path) -> Result<String, AccessError> {
    Ok(fs
        .read_string(&node_dir.join(GUID_FILE))?
        .trim()
        .to_ascii_lowercase())
}

/// Read the base offset of a telemetry node's window
pub fn read_base_offset(fs: &dyn FsAccess, node_dir: &Path) -> Result<u64, AccessError> {
    fs.read_u64(&node_dir.join(OFFSET_FILE))
}

/// Decode the value of `key` from a node's telemetry region
///
/// Reads `T::WIDTH` bytes at `base_offset + table[key]`.
pub fn read_value<T: TelemetryValue>(
    fs: &dyn FsAccess,
    table: &KeyOffsetTable,
    node_dir: &Path,
    key: &str,
    base_offset: u64,
) -> Result<T, SysmanError> {
    let offset = table
        .offset(key)
        .ok_or_else(|| SysmanError::NotAvailable(format!("telemetry key {}", key)))?;

    let position = base_offset.checked_add(offset).ok_or_else(|| {
        SysmanError::NotAvailable(format!(
            "telemetry offset of {} overflows: {:#x} + {:#x}",
            key, base_offset, offset
        ))
    })?;

    let path = node_dir.join(TELEM_FILE);
    let mut buf = [0u8; 8];
    let buf = &mut buf[..T::WIDTH];
    let read = fs
        .read_at(&path, position, buf)
        .map_err(|e| match e {
            AccessError::PermissionDenied(p) => SysmanError::InsufficientPermissions(p),
            other => SysmanError::NotAvailable(other.to_string()),
        })?;

    if read != T::WIDTH {
        return Err(SysmanError::NotAvailable(format!(
            "short telemetry read of {} at {:#x}: {} of {} bytes",
            key,
            position,
            read,
            T::WIDTH
        )));
    }

    Ok(T::from_le(buf))
}

/// One usable telemetry node
#[derive(Debug, Clone)]
pub struct TelemetryNode {
    /// Telemetry index (`telem<N>`)
    pub index: u32,
    /// Node directory
    pub dir: PathBuf,
    /// Hardware GUID
    pub guid: String,
    /// Base offset of the node's window
    pub base_offset: u64,
    table: &'static KeyOffsetTable,
}

/// Telemetry aggregated across every node reachable from a device
///
/// Each key records the nodes that supply it, in discovery order, so a read
/// is routed back to the node that owns the key.
pub struct PlatformMonitoringTech {
    fs: Arc<dyn FsAccess>,
    nodes: Vec<TelemetryNode>,
    sources: HashMap<String, Vec<usize>>,
}

impl PlatformMonitoringTech {
    /// Build the aggregate for the device under `pci_root`
    ///
    /// Returns `None` when no node with a known GUID is found.
    pub fn create(fs: Arc<dyn FsAccess>, pci_root: &Path) -> Option<Self> {
        let discovered = match discover_telemetry_nodes(fs.as_ref(), pci_root) {
            Ok(nodes) => nodes,
            Err(e) => {
                log::debug!("No telemetry nodes: {}", e);
                return None;
            }
        };

        let mut nodes = Vec::new();
        let mut sources: HashMap<String, Vec<usize>> = HashMap::new();

        for (index, dir) in discovered {
            let guid = match read_guid(fs.as_ref(), &dir) {
                Ok(guid) => guid,
                Err(e) => {
                    log::warn!("telem{}: cannot read GUID: {}", index, e);
                    continue;
                }
            };
            let Some(table) = key_offset_table(&guid) else {
                log::debug!("telem{}: unknown GUID {}, skipping", index, guid);
                continue;
            };
            let base_offset = match read_base_offset(fs.as_ref(), &dir) {
                Ok(offset) => offset,
                Err(e) => {
                    log::warn!("telem{}: cannot read base offset: {}", index, e);
                    continue;
                }
            };

            let position = nodes.len();
            for (key, _) in table.entries() {
                sources.entry(key.to_string()).or_default().push(position);
            }
            log::debug!(
                "telem{}: GUID {} ({}) at base {:#x}",
                index,
                guid,
                table.family(),
                base_offset
            );
            nodes.push(TelemetryNode {
                index,
                dir,
                guid,
                base_offset,
                table,
            });
        }

        if nodes.is_empty() {
            return None;
        }

        Some(Self { fs, nodes, sources })
    }

    /// Usable nodes in discovery order
    pub fn nodes(&self) -> &[TelemetryNode] {
        &self.nodes
    }

    /// Product family of the first node's layout
    pub fn family(&self) -> ProductFamily {
        self.nodes
            .first()
            .map(|n| n.table.family())
            .unwrap_or_default()
    }

    /// Whether any node supplies `key`
    pub fn has_key(&self, key: &str) -> bool {
        self.sources.contains_key(key)
    }

    /// Read a 32-bit value, preferring the node for `instance`
    pub fn read_u32(&self, key: &str, instance: Option<u32>) -> Result<u32, SysmanError> {
        self.read(key, instance)
    }

    /// Read a 64-bit value, preferring the node for `instance`
    pub fn read_u64(&self, key: &str, instance: Option<u32>) -> Result<u64, SysmanError> {
        self.read(key, instance)
    }

    fn read<T: TelemetryValue>(&self, key: &str, instance: Option<u32>) -> Result<T, SysmanError> {
        let sources = self
            .sources
            .get(key)
            .ok_or_else(|| SysmanError::NotAvailable(format!("telemetry key {}", key)))?;
        let position = instance
            .and_then(|i| sources.get(i as usize))
            .or_else(|| sources.first())
            .copied()
            .ok_or_else(|| SysmanError::NotAvailable(format!("telemetry key {}", key)))?;
        let node = &self.nodes[position];
        read_value(self.fs.as_ref(), node.table, &node.dir, key, node.base_offset)
    }
}

impl std::fmt::Debug for PlatformMonitoringTech {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformMonitoringTech")
            .field("nodes", &self.nodes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFs;
    use crate::pmt::tables::{KEY_SOC_TEMPERATURES, KEY_TIMESTAMP};

    const ROOT: &str = "/sys/devices/pci0000:00/0000:00:01.0";

    fn region(len: usize, writes: &[(u64, &[u8])]) -> Vec<u8> {
        let mut data = vec![0u8; len];
        for (offset, bytes) in writes {
            let start = *offset as usize;
            data[start..start + bytes.len()].copy_from_slice(bytes);
        }
        data
    }

    fn node(fs: MockFs, index: u32, parent: &str, guid: &str, base: u64, data: Vec<u8>) -> MockFs {
        let dir = format!("{}/intel_pmt.{}/telem{}", parent, index, index);
        fs.with_symlink(format!("{}/telem{}", PMT_CLASS_DIR, index), &dir)
            .with_file(format!("{}/guid", dir), guid)
            .with_file(format!("{}/offset", dir), base)
            .with_binary(format!("{}/telem", dir), data)
    }

    #[test]
    fn test_discovery_filters_by_pci_root() {
        let fs = MockFs::new().with_dir(PMT_CLASS_DIR);
        let fs = node(fs, 1, ROOT, "0x4f9302", 0, vec![]);
        let fs = node(fs, 2, "/sys/devices/pci0000:80/0000:80:01.0", "0x4f9302", 0, vec![]);
        let fs = node(fs, 3, ROOT, "0x4f9502", 0, vec![]).with_dir(format!("{}/crashlog1", PMT_CLASS_DIR));

        let nodes = discover_telemetry_nodes(&fs, Path::new(ROOT)).unwrap();
        assert_eq!(nodes.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(
            read_guid(&fs, &nodes[&3]).unwrap(),
            "0x4f9502".to_string()
        );
    }

    #[test]
    fn test_read_value_at_base_plus_table_offset() {
        let table = KeyOffsetTable::new(ProductFamily::Dg2)
            .with("COUNTER", 0x10)
            .with("WIDE", 0x18);
        let data = region(
            0x40,
            &[
                (0x20 + 0x10, &0xdead_beefu32.to_le_bytes()),
                (0x20 + 0x18, &0x0102_0304_0506_0708u64.to_le_bytes()),
            ],
        );
        let fs = MockFs::new().with_binary("/node/telem", data);
        let dir = Path::new("/node");

        let narrow: u32 = read_value(&fs, &table, dir, "COUNTER", 0x20).unwrap();
        assert_eq!(narrow, 0xdead_beef);
        let wide: u64 = read_value(&fs, &table, dir, "WIDE", 0x20).unwrap();
        assert_eq!(wide, 0x0102_0304_0506_0708);
    }

    #[test]
    fn test_read_value_missing_key_or_underrun() {
        let table = KeyOffsetTable::new(ProductFamily::Dg2).with("TAIL", 0x1c);
        let fs = MockFs::new().with_binary("/node/telem", vec![0u8; 0x20]);
        let dir = Path::new("/node");

        let missing: Result<u32, _> = read_value(&fs, &table, dir, "ABSENT", 0);
        assert!(matches!(missing, Err(SysmanError::NotAvailable(_))));

        let short: Result<u64, _> = read_value(&fs, &table, dir, "TAIL", 0);
        assert!(matches!(short, Err(SysmanError::NotAvailable(_))));

        let fits: Result<u32, _> = read_value(&fs, &table, dir, "TAIL", 0);
        assert_eq!(fits, Ok(0));
    }

    #[test]
    fn test_read_value_offset_overflow() {
        let table = KeyOffsetTable::new(ProductFamily::Dg2).with("TAIL", 0x1c);
        let fs = MockFs::new().with_binary("/node/telem", vec![0u8; 0x20]);

        let wrapped: Result<u64, _> = read_value(&fs, &table, Path::new("/node"), "TAIL", u64::MAX);
        assert!(matches!(wrapped, Err(SysmanError::NotAvailable(_))));
    }

    #[test]
    fn test_unknown_guid_is_skipped() {
        let fs = MockFs::new().with_dir(PMT_CLASS_DIR);
        let fs = node(fs, 1, ROOT, "0xdeadbeef", 0, vec![0u8; 16]);
        assert!(PlatformMonitoringTech::create(Arc::new(fs), Path::new(ROOT)).is_none());
    }

    #[test]
    fn test_aggregate_routes_keys_per_instance() {
        let table = key_offset_table("0xb15a0edc").unwrap();
        let soc = table.offset(KEY_SOC_TEMPERATURES).unwrap();
        let ts = table.offset(KEY_TIMESTAMP).unwrap();

        let tile0 = region(0x400, &[(soc, &0x30u64.to_le_bytes()), (ts, &7u64.to_le_bytes())]);
        let tile1 = region(
            0x500,
            &[(0x100 + soc, &0x41u64.to_le_bytes())],
        );

        let fs = MockFs::new().with_dir(PMT_CLASS_DIR);
        let fs = node(fs, 1, ROOT, "0x490e02", 0, vec![]);
        let fs = node(fs, 2, ROOT, "0xb15a0edc", 0, tile0);
        let fs = node(fs, 3, ROOT, "0xb15a0edc", 0x100, tile1);

        let pmt = PlatformMonitoringTech::create(Arc::new(fs), Path::new(ROOT)).unwrap();
        assert_eq!(pmt.nodes().len(), 2);
        assert_eq!(pmt.family(), ProductFamily::Pvc);
        assert!(pmt.has_key(KEY_SOC_TEMPERATURES));

        assert_eq!(pmt.read_u64(KEY_SOC_TEMPERATURES, Some(0)).unwrap(), 0x30);
        assert_eq!(pmt.read_u64(KEY_SOC_TEMPERATURES, Some(1)).unwrap(), 0x41);
        assert_eq!(pmt.read_u64(KEY_SOC_TEMPERATURES, None).unwrap(), 0x30);
        // Instance beyond the node count falls back to the first node
        assert_eq!(pmt.read_u64(KEY_TIMESTAMP, Some(5)).unwrap(), 7);
        assert!(matches!(
            pmt.read_u32("NOT_A_KEY", None),
            Err(SysmanError::NotAvailable(_))
        ));
    }
}

//! Telemetry key-offset tables
//!
//! Each telemetry GUID identifies a fixed layout of counters in the node's
//! `telem` region. Tables are built once and never mutated.

use crate::domain::ProductFamily;

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Memory sub-units (MSUs) a device can report
pub const MAX_MSU: u32 = 4;

/// Channels per memory sub-unit
pub const CHANNELS_PER_MSU: u32 = 2;

/// Fabric bridges carrying memory traffic
pub const MAX_BRIDGES: u32 = 2;

/// Voltage regulator temperature sensors
pub const MAX_VR_SENSORS: u32 = 4;

/// Bitmask of present memory sub-units (u32)
pub const KEY_MSU_BITMASK: &str = "MSU_BITMASK";
/// Free-running telemetry timestamp (u64)
pub const KEY_TIMESTAMP: &str = "TELEM_TIMESTAMP";
/// Packed SoC temperatures, one byte per sensor (u64)
pub const KEY_SOC_TEMPERATURES: &str = "SOC_TEMPERATURES";
/// Packed core temperatures, one byte per sensor (u64)
pub const KEY_CORE_TEMPERATURES: &str = "CORE_TEMPERATURES";
/// Packed memory temperatures, one byte per stack (u32)
pub const KEY_VRAM_TEMPERATURES: &str = "VRAM_TEMPERATURES";

/// Read request counter of one MSU channel (u64)
pub fn msu_read_key(msu: u32, channel: u32) -> String {
    format!("MSU{}_CH{}_RD_REQ", msu, channel)
}

/// Write request counter of one MSU channel (u64)
pub fn msu_write_key(msu: u32, channel: u32) -> String {
    format!("MSU{}_CH{}_WR_REQ", msu, channel)
}

/// Read request counter of one bridge (u64)
pub fn bridge_read_key(bridge: u32) -> String {
    format!("BRIDGE{}_RD_REQ", bridge)
}

/// Write request counter of one bridge (u64)
pub fn bridge_write_key(bridge: u32) -> String {
    format!("BRIDGE{}_WR_REQ", bridge)
}

/// Voltage regulator temperature sensor (u32)
pub fn vr_temperature_key(sensor: u32) -> String {
    format!("VR_TEMP_{}", sensor)
}

/// Byte offsets of semantic keys within one telemetry region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyOffsetTable {
    family: ProductFamily,
    offsets: HashMap<String, u64>,
}

impl KeyOffsetTable {
    /// Create an empty table for a product family
    pub fn new(family: ProductFamily) -> Self {
        Self {
            family,
            offsets: HashMap::new(),
        }
    }

    /// Builder: map `key` to `offset`
    pub fn with(mut self, key: impl Into<String>, offset: u64) -> Self {
        self.offsets.insert(key.into(), offset);
        self
    }

    /// Product family the layout belongs to
    pub fn family(&self) -> ProductFamily {
        self.family
    }

    /// Byte offset of `key`
    pub fn offset(&self, key: &str) -> Option<u64> {
        self.offsets.get(key).copied()
    }

    /// Iterate over (key, offset) pairs
    pub fn entries(&self) -> impl Iterator<Item = (&str, u64)> {
        self.offsets.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Sequential layout helper: each key takes its width in bytes
struct Layout {
    table: KeyOffsetTable,
    next: u64,
}

impl Layout {
    fn new(family: ProductFamily, start: u64) -> Self {
        Self {
            table: KeyOffsetTable::new(family),
            next: start,
        }
    }

    fn u32(mut self, key: impl Into<String>) -> Self {
        self.table = self.table.with(key, self.next);
        self.next += 4;
        self
    }

    fn u64(mut self, key: impl Into<String>) -> Self {
        self.table = self.table.with(key, self.next);
        self.next += 8;
        self
    }

    fn skip(mut self, bytes: u64) -> Self {
        self.next += bytes;
        self
    }

    fn memory_counters(mut self, msus: u32, bridges: u32) -> Self {
        self = self.u32(KEY_MSU_BITMASK).skip(4);
        for msu in 0..msus {
            for channel in 0..CHANNELS_PER_MSU {
                self = self.u64(msu_read_key(msu, channel));
                self = self.u64(msu_write_key(msu, channel));
            }
        }
        for bridge in 0..bridges {
            self = self.u64(bridge_read_key(bridge));
            self = self.u64(bridge_write_key(bridge));
        }
        self
    }

    fn vr_sensors(mut self) -> Self {
        for sensor in 0..MAX_VR_SENSORS {
            self = self.u32(vr_temperature_key(sensor));
        }
        self
    }

    fn build(self) -> KeyOffsetTable {
        self.table
    }
}

fn dg1_table() -> KeyOffsetTable {
    Layout::new(ProductFamily::Dg1, 0x0)
        .u64(KEY_TIMESTAMP)
        .skip(0x58)
        .u64(KEY_SOC_TEMPERATURES)
        .u64(KEY_CORE_TEMPERATURES)
        .skip(0x90)
        .memory_counters(2, 0)
        .build()
}

fn dg2_table() -> KeyOffsetTable {
    Layout::new(ProductFamily::Dg2, 0x0)
        .u64(KEY_TIMESTAMP)
        .skip(0x60)
        .u64(KEY_SOC_TEMPERATURES)
        .u64(KEY_CORE_TEMPERATURES)
        .u32(KEY_VRAM_TEMPERATURES)
        .skip(0x184)
        .memory_counters(MAX_MSU, MAX_BRIDGES)
        .build()
}

fn pvc_table() -> KeyOffsetTable {
    Layout::new(ProductFamily::Pvc, 0x0)
        .u64(KEY_TIMESTAMP)
        .skip(0x18)
        .u64(KEY_SOC_TEMPERATURES)
        .u64(KEY_CORE_TEMPERATURES)
        .u32(KEY_VRAM_TEMPERATURES)
        .vr_sensors()
        .skip(0xec)
        .memory_counters(MAX_MSU, 0)
        .build()
}

static GUID_TABLES: Lazy<HashMap<&'static str, KeyOffsetTable>> = Lazy::new(|| {
    let mut tables = HashMap::new();
    tables.insert("0x490e01", dg1_table());
    tables.insert("0x4f9302", dg2_table());
    tables.insert("0x4f9502", dg2_table());
    tables.insert("0xb15a0edc", pvc_table());
    tables
});

/// Look up the key-offset table for a telemetry GUID
pub fn key_offset_table(guid: &str) -> Option<&'static KeyOffsetTable> {
    GUID_TABLES.get(guid.trim().to_ascii_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_guids() {
        assert_eq!(
            key_offset_table("0x4f9302").map(|t| t.family()),
            Some(ProductFamily::Dg2)
        );
        assert_eq!(
            key_offset_table("0xB15A0EDC\n").map(|t| t.family()),
            Some(ProductFamily::Pvc)
        );
        assert!(key_offset_table("0xdeadbeef").is_none());
    }

    #[test]
    fn test_offsets_do_not_overlap() {
        for guid in ["0x490e01", "0x4f9302", "0xb15a0edc"] {
            let table = key_offset_table(guid).unwrap();
            let mut offsets: Vec<u64> = table.entries().map(|(_, o)| o).collect();
            let count = offsets.len();
            offsets.sort_unstable();
            offsets.dedup();
            assert_eq!(offsets.len(), count, "duplicate offset in {}", guid);
        }
    }

    #[test]
    fn test_family_specific_keys() {
        let dg1 = key_offset_table("0x490e01").unwrap();
        assert!(dg1.offset(KEY_VRAM_TEMPERATURES).is_none());
        assert!(dg1.offset(&bridge_read_key(0)).is_none());

        let pvc = key_offset_table("0xb15a0edc").unwrap();
        assert!(pvc.offset(&vr_temperature_key(3)).is_some());
        assert!(pvc.offset(&msu_write_key(3, 1)).is_some());
    }
}

//! Platform Monitoring Technology (PMT) telemetry decoder
//!
//! Discovers GUID-identified telemetry nodes for a device and decodes scalar
//! values from their memory-mapped regions.

pub mod tables;
pub mod telemetry;

pub use tables::{key_offset_table, KeyOffsetTable};
pub use telemetry::{
    discover_telemetry_nodes, read_base_offset, read_guid, read_value, PlatformMonitoringTech,
    TelemetryNode, TelemetryValue, PMT_CLASS_DIR,
};

//! Output formatting utilities
//!
//! Provides table and JSON output formatting for CLI commands.

use crate::cli::args::OutputFormat;
use crate::domain::{
    DeviceSummary, DiagResult, DiagTest, DiagTestOutcome, FrequencyRange, FREQUENCY_UNKNOWN,
};
use serde::Serialize;
use std::io::{self, Write};

/// Format and print output based on the selected format
pub fn print_output<T: Serialize + TableDisplay>(data: &T, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match format {
        OutputFormat::Table => {
            writeln!(handle, "{}", data.to_table())?;
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string());
            writeln!(handle, "{}", json)?;
        }
        OutputFormat::Compact => {
            writeln!(handle, "{}", data.to_compact())?;
        }
    }

    Ok(())
}

/// Trait for types that can be displayed as a table
pub trait TableDisplay {
    /// Format as a table string
    fn to_table(&self) -> String;

    /// Format as a compact single line
    fn to_compact(&self) -> String {
        self.to_table().replace('\n', " | ")
    }
}

fn mhz(value: f64) -> String {
    if value == FREQUENCY_UNKNOWN {
        "n/a".to_string()
    } else {
        format!("{:.0} MHz", value)
    }
}

fn subdevice_label(on_subdevice: bool, subdevice_id: u32) -> String {
    if on_subdevice {
        format!(" (tile {})", subdevice_id)
    } else {
        String::new()
    }
}

/// Device list entry for display
#[derive(Debug, Clone, Serialize)]
pub struct DeviceListEntry {
    #[serde(flatten)]
    pub summary: DeviceSummary,
    pub frequency_domains: usize,
    pub memory_modules: usize,
    pub performance_factors: usize,
    pub temperature_sensors: usize,
    pub diagnostic_suites: usize,
}

impl TableDisplay for DeviceListEntry {
    fn to_table(&self) -> String {
        let hw = &self.summary.hardware;
        format!(
            "[card{}] {} 0x{:04x} ({}, {} tiles)\n  Domains: {} frequency, {} memory, {} performance, {} temperature, {} diagnostics",
            self.summary.card,
            hw.family,
            hw.device_id,
            self.summary.driver,
            self.summary.subdevice_count.max(1),
            self.frequency_domains,
            self.memory_modules,
            self.performance_factors,
            self.temperature_sensors,
            self.diagnostic_suites
        )
    }

    fn to_compact(&self) -> String {
        format!(
            "card{}:{}:0x{:04x}",
            self.summary.card, self.summary.hardware.family, self.summary.hardware.device_id
        )
    }
}

/// Device list for display
#[derive(Debug, Clone, Serialize)]
pub struct DeviceList {
    pub devices: Vec<DeviceListEntry>,
}

impl TableDisplay for DeviceList {
    fn to_table(&self) -> String {
        let mut output = format!("GPUs Found: {}\n\n", self.devices.len());

        for device in &self.devices {
            output.push_str(&device.to_table());
            output.push('\n');
        }

        output
    }

    fn to_compact(&self) -> String {
        self.devices
            .iter()
            .map(|d| d.to_compact())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Frequency domain status display
#[derive(Debug, Clone, Serialize)]
pub struct FrequencyStatus {
    pub index: usize,
    pub domain: String,
    pub on_subdevice: bool,
    pub subdevice_id: u32,
    pub can_control: bool,
    pub hardware_min: f64,
    pub hardware_max: f64,
    pub range: Option<FrequencyRange>,
    pub request: f64,
    pub actual: f64,
    pub efficient: f64,
    pub tdp: f64,
    pub throttle_reasons: Vec<&'static str>,
}

impl TableDisplay for FrequencyStatus {
    fn to_table(&self) -> String {
        let mut output = format!(
            "[{}] {}{}\n  Hardware Range: {} - {}\n",
            self.index,
            self.domain,
            subdevice_label(self.on_subdevice, self.subdevice_id),
            mhz(self.hardware_min),
            mhz(self.hardware_max)
        );

        match &self.range {
            Some(range) => output.push_str(&format!(
                "  Current Range: {} - {}\n",
                mhz(range.min),
                mhz(range.max)
            )),
            None => output.push_str("  Current Range: Not available\n"),
        }

        output.push_str(&format!(
            "  Request: {}  Actual: {}\n  Efficient: {}  TDP: {}\n",
            mhz(self.request),
            mhz(self.actual),
            mhz(self.efficient),
            mhz(self.tdp)
        ));

        if self.throttle_reasons.is_empty() {
            output.push_str("  Throttling: None\n");
        } else {
            output.push_str(&format!(
                "  Throttling: {}\n",
                self.throttle_reasons.join(", ")
            ));
        }

        if !self.can_control {
            output.push_str("  Control: Not supported\n");
        }

        output
    }

    fn to_compact(&self) -> String {
        format!("{}:{}:{}", self.index, self.domain, mhz(self.actual))
    }
}

/// Supported clocks of a frequency domain
#[derive(Debug, Clone, Serialize)]
pub struct ClockList {
    pub index: usize,
    pub domain: String,
    pub clocks: Vec<f64>,
}

impl TableDisplay for ClockList {
    fn to_table(&self) -> String {
        let clocks = self
            .clocks
            .iter()
            .map(|c| format!("{:.0}", c))
            .collect::<Vec<_>>();
        format!(
            "[{}] {} ({} clocks)\n  {} MHz",
            self.index,
            self.domain,
            self.clocks.len(),
            clocks.join(" ")
        )
    }

    fn to_compact(&self) -> String {
        format!("{}:{}:{}", self.index, self.domain, self.clocks.len())
    }
}

/// Memory module status display
#[derive(Debug, Clone, Serialize)]
pub struct MemoryStatus {
    pub index: usize,
    pub memory_type: String,
    pub location: String,
    pub on_subdevice: bool,
    pub subdevice_id: u32,
    pub physical_size: u64,
    pub num_channels: i32,
    pub bus_width: i32,
    pub health: Option<String>,
    pub used_bytes: Option<u64>,
    pub size_bytes: Option<u64>,
    pub read_counter: Option<u64>,
    pub write_counter: Option<u64>,
    pub max_bandwidth: Option<u64>,
}

impl TableDisplay for MemoryStatus {
    fn to_table(&self) -> String {
        let mut output = format!(
            "[{}] {} {}{}\n",
            self.index,
            self.memory_type,
            self.location,
            subdevice_label(self.on_subdevice, self.subdevice_id)
        );

        output.push_str(&format!(
            "  Physical Size: {:.2} GB\n",
            self.physical_size as f64 / (1u64 << 30) as f64
        ));
        if self.num_channels > 0 {
            output.push_str(&format!(
                "  Channels: {}  Bus Width: {} bit\n",
                self.num_channels, self.bus_width
            ));
        }

        match &self.health {
            Some(health) => output.push_str(&format!("  Health: {}\n", health)),
            None => output.push_str("  Health: Not available\n"),
        }

        if let (Some(used), Some(size)) = (self.used_bytes, self.size_bytes) {
            output.push_str(&format!(
                "  Usage: {:.2} / {:.2} GB\n",
                used as f64 / (1u64 << 30) as f64,
                size as f64 / (1u64 << 30) as f64
            ));
        }

        match (self.read_counter, self.write_counter) {
            (Some(read), Some(write)) => output.push_str(&format!(
                "  Bandwidth Counters: read {} B, write {} B\n",
                read, write
            )),
            _ => output.push_str("  Bandwidth Counters: Not available\n"),
        }

        output
    }
}

/// Performance factor status display
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceStatus {
    pub index: usize,
    pub engine: String,
    pub on_subdevice: bool,
    pub subdevice_id: u32,
    pub factor: Option<f64>,
}

impl TableDisplay for PerformanceStatus {
    fn to_table(&self) -> String {
        let factor = self
            .factor
            .map(|f| format!("{:.0}", f))
            .unwrap_or_else(|| "Not available".to_string());
        format!(
            "[{}] {}{}: {}",
            self.index,
            self.engine,
            subdevice_label(self.on_subdevice, self.subdevice_id),
            factor
        )
    }
}

/// Temperature sensor status display
#[derive(Debug, Clone, Serialize)]
pub struct TemperatureStatus {
    pub index: usize,
    pub sensor: String,
    pub on_subdevice: bool,
    pub subdevice_id: u32,
    pub celsius: Option<f64>,
    pub max_celsius: f64,
}

impl TableDisplay for TemperatureStatus {
    fn to_table(&self) -> String {
        let reading = self
            .celsius
            .map(|c| format!("{:.0}°C", c))
            .unwrap_or_else(|| "Not available".to_string());
        format!(
            "[{}] {}{}: {} (max {:.0}°C)",
            self.index,
            self.sensor,
            subdevice_label(self.on_subdevice, self.subdevice_id),
            reading,
            self.max_celsius
        )
    }

    fn to_compact(&self) -> String {
        format!(
            "{}:{}",
            self.sensor,
            self.celsius.map(|c| c.to_string()).unwrap_or_default()
        )
    }
}

/// Diagnostic suite listing
#[derive(Debug, Clone, Serialize)]
pub struct DiagSuiteEntry {
    pub index: usize,
    pub name: String,
    pub on_subdevice: bool,
    pub subdevice_id: u32,
    pub tests: Vec<DiagTest>,
}

impl TableDisplay for DiagSuiteEntry {
    fn to_table(&self) -> String {
        let mut output = format!(
            "[{}] {}{}\n",
            self.index,
            self.name,
            subdevice_label(self.on_subdevice, self.subdevice_id)
        );

        if self.tests.is_empty() {
            output.push_str("  Tests: runs as a whole\n");
        }
        for test in &self.tests {
            output.push_str(&format!("  {:>4}  {}\n", test.index, test.name));
        }

        output
    }

    fn to_compact(&self) -> String {
        format!("{}:{}:{}", self.index, self.name, self.tests.len())
    }
}

/// Diagnostics run report display
#[derive(Debug, Clone, Serialize)]
pub struct DiagRunOutput {
    pub suite: String,
    pub subdevice_id: u32,
    pub result: DiagResult,
    pub per_test: Vec<DiagTestOutcome>,
}

impl TableDisplay for DiagRunOutput {
    fn to_table(&self) -> String {
        let mut output = format!("{}: {}\n", self.suite, self.result);

        for outcome in &self.per_test {
            output.push_str(&format!(
                "  {:>4}  {}\n",
                outcome.index,
                if outcome.passed { "pass" } else { "FAIL" }
            ));
        }

        output
    }

    fn to_compact(&self) -> String {
        let failed = self.per_test.iter().filter(|t| !t.passed).count();
        format!("{}:{:?}:{} failed", self.suite, self.result, failed)
    }
}

/// Simple message output
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub message: String,
    pub success: bool,
}

impl TableDisplay for Message {
    fn to_table(&self) -> String {
        if self.success {
            format!("✓ {}", self.message)
        } else {
            format!("✗ {}", self.message)
        }
    }
}

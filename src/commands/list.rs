//! List command implementation
//!
//! Lists every supported DRM card with its domain counts.

use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, DeviceList, DeviceListEntry};
use crate::commands::sysfs_for;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::linux::{DrmDevice, LinuxSysman};
use crate::sysman::Sysman;

use std::sync::Arc;

/// Execute the list command
pub fn run_list(format: OutputFormat, config: &Config) -> Result<()> {
    let fs = sysfs_for(config);
    let mut devices = Vec::new();

    for card in DrmDevice::list_cards(fs.as_ref()) {
        let device = match DrmDevice::discover(fs.as_ref(), card) {
            Ok(device) => device,
            Err(e) => {
                log::debug!("Skipping card{}: {}", card, e);
                continue;
            }
        };
        let summary = device.summary();
        let sysman = Sysman::new(Box::new(LinuxSysman::new(fs.clone(), Arc::new(device))));

        devices.push(DeviceListEntry {
            summary,
            frequency_domains: sysman.frequencies().len(),
            memory_modules: sysman.memories().len(),
            performance_factors: sysman.performances().len(),
            temperature_sensors: sysman.temperatures().len(),
            diagnostic_suites: sysman.diagnostics().len(),
        });
    }

    if devices.is_empty() {
        return Err(AppError::DeviceNotFound(config.device.card));
    }

    print_output(&DeviceList { devices }, format)?;

    Ok(())
}

//! Command handlers
//!
//! Each command handler orchestrates the execution of a CLI command.

pub mod diagnostics;
pub mod frequency;
pub mod list;
pub mod memory;
pub mod performance;
pub mod temperature;

pub use diagnostics::run_diagnostics;
pub use frequency::run_frequency;
pub use list::run_list;
pub use memory::run_memory;
pub use performance::run_performance;
pub use temperature::run_temperature;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::sysfs::{FsAccess, SysfsAccess};
use crate::sysman::Sysman;

use std::sync::Arc;

/// Filesystem access rooted where the configuration says
pub fn sysfs_for(config: &Config) -> Arc<dyn FsAccess> {
    Arc::new(SysfsAccess::with_root(&config.device.sysfs_root))
}

/// Open the configured card
pub fn open_sysman(config: &Config) -> Result<Sysman> {
    let sysman = Sysman::open(sysfs_for(config), config.device.card)?;
    log::debug!(
        "Opened card{} ({}, {} subdevices)",
        config.device.card,
        sysman.hardware_info().family,
        sysman.subdevice_count()
    );
    Ok(sysman)
}

/// Handles selected by an optional index
pub(crate) fn select<'a, T>(
    handles: &'a [Arc<T>],
    index: Option<usize>,
    kind: &'static str,
) -> Result<Vec<(usize, &'a Arc<T>)>> {
    match index {
        None => Ok(handles.iter().enumerate().collect()),
        Some(i) => handles
            .get(i)
            .map(|h| vec![(i, h)])
            .ok_or(AppError::HandleNotFound { kind, index: i }),
    }
}

//! Performance command implementation
//!
//! Handles performance factor status and control.

use crate::cli::args::{OutputFormat, PerformanceArgs, PerformanceCommands};
use crate::cli::output::{print_output, Message, PerformanceStatus};
use crate::commands::open_sysman;
use crate::config::Config;
use crate::domain::{EngineType, PerformanceFactor};
use crate::error::{Result, SysmanError};
use crate::services::PerformanceService;
use crate::sysman::Sysman;

/// Execute performance commands
pub fn run_performance(
    args: &PerformanceArgs,
    format: OutputFormat,
    config: &Config,
) -> Result<()> {
    let sysman = open_sysman(config)?;
    let dry_run = config.general.dry_run;

    match &args.command {
        PerformanceCommands::Status => run_status(&sysman, format),
        PerformanceCommands::Set { engine, factor } => {
            let engine = EngineType::from(*engine);
            let factor = PerformanceFactor::new(*factor)?;
            let service = match engine {
                EngineType::Media => PerformanceService::new(Some(factor), None, dry_run),
                _ => PerformanceService::new(None, Some(factor), dry_run),
            };
            if !sysman
                .performances()
                .iter()
                .any(|p| p.properties().engine == engine)
            {
                return Err(
                    SysmanError::Unsupported(format!("{} performance factor", engine)).into(),
                );
            }
            run_apply(&sysman, &service, format)
        }
        PerformanceCommands::Apply => {
            let service = PerformanceService::new(
                config.performance.media()?,
                config.performance.compute()?,
                dry_run,
            );
            run_apply(&sysman, &service, format)
        }
    }
}

fn run_status(sysman: &Sysman, format: OutputFormat) -> Result<()> {
    for (index, perf) in sysman.performances().iter().enumerate() {
        let props = perf.properties();
        let status = PerformanceStatus {
            index,
            engine: props.engine.to_string(),
            on_subdevice: props.on_subdevice,
            subdevice_id: props.subdevice_id,
            factor: perf.factor().ok(),
        };
        print_output(&status, format)?;
    }

    Ok(())
}

fn run_apply(sysman: &Sysman, service: &PerformanceService, format: OutputFormat) -> Result<()> {
    for (index, perf) in sysman.performances().iter().enumerate() {
        let engine = perf.properties().engine;
        let message = match service.apply_factor(perf) {
            Ok(Some(factor)) if service.is_dry_run() => Message {
                message: format!(
                    "[DRY RUN] Would set [{}] {} factor to {}",
                    index, engine, factor
                ),
                success: true,
            },
            Ok(Some(factor)) => Message {
                message: format!("Set [{}] {} factor to {}", index, engine, factor),
                success: true,
            },
            Ok(None) => continue,
            Err(e) => {
                log::warn!("Performance domain {}: {}", index, e);
                Message {
                    message: format!("Cannot set [{}] {} factor: {}", index, engine, e),
                    success: false,
                }
            }
        };
        print_output(&message, format)?;
    }

    Ok(())
}

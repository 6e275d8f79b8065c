//! Frequency command implementation
//!
//! Handles clock status, clock listing and range control.

use crate::cli::args::{FrequencyArgs, FrequencyCommands, OutputFormat};
use crate::cli::output::{print_output, ClockList, FrequencyStatus, Message};
use crate::commands::{open_sysman, select};
use crate::config::Config;
use crate::domain::FrequencyRange;
use crate::error::{Result, ServiceError};
use crate::services::FrequencyService;
use crate::sysman::{Frequency, Sysman};

use std::sync::Arc;

/// Execute frequency commands
pub fn run_frequency(args: &FrequencyArgs, format: OutputFormat, config: &Config) -> Result<()> {
    let sysman = open_sysman(config)?;
    let dry_run = config.general.dry_run;

    match &args.command {
        FrequencyCommands::Status => run_status(&sysman, format),
        FrequencyCommands::Clocks => run_clocks(&sysman, format),
        FrequencyCommands::Range { min, max, domain } => {
            let service = FrequencyService::new(Some(FrequencyRange::new(*min, *max)), dry_run);
            run_range(&sysman, &service, *domain, format)
        }
        FrequencyCommands::Reset { domain } => {
            let service = FrequencyService::new(None, dry_run);
            run_reset(&sysman, &service, *domain, format)
        }
        FrequencyCommands::Apply => match config.frequency.to_range()? {
            Some(range) => {
                let service = FrequencyService::new(Some(range), dry_run);
                run_range(&sysman, &service, None, format)
            }
            None => {
                print_output(
                    &Message {
                        message: "No frequency range configured".to_string(),
                        success: false,
                    },
                    format,
                )?;
                Ok(())
            }
        },
    }
}

fn run_status(sysman: &Sysman, format: OutputFormat) -> Result<()> {
    for (index, freq) in sysman.frequencies().iter().enumerate() {
        let props = freq.properties();
        let state = freq.state().unwrap_or_default();

        let status = FrequencyStatus {
            index,
            domain: props.domain.to_string(),
            on_subdevice: props.on_subdevice,
            subdevice_id: props.subdevice_id,
            can_control: props.can_control,
            hardware_min: props.min,
            hardware_max: props.max,
            range: freq.range().ok(),
            request: state.request,
            actual: state.actual,
            efficient: state.efficient,
            tdp: state.tdp,
            throttle_reasons: freq.throttle_reasons().active_reasons(),
        };

        print_output(&status, format)?;
    }

    Ok(())
}

fn run_clocks(sysman: &Sysman, format: OutputFormat) -> Result<()> {
    for (index, freq) in sysman.frequencies().iter().enumerate() {
        let mut count = 0;
        freq.available_clocks(&mut count, None);
        let mut clocks = Vec::with_capacity(count as usize);
        freq.available_clocks(&mut count, Some(&mut clocks));

        print_output(
            &ClockList {
                index,
                domain: freq.properties().domain.to_string(),
                clocks,
            },
            format,
        )?;
    }

    Ok(())
}

fn run_range(
    sysman: &Sysman,
    service: &FrequencyService,
    domain: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    for (index, freq) in select(sysman.frequencies(), domain, "frequency")? {
        let name = freq.properties().domain;
        let message = match service.apply_range(freq) {
            Ok(Some(range)) if service.is_dry_run() => Message {
                message: format!("[DRY RUN] Would set [{}] {} range to {}", index, name, range),
                success: true,
            },
            Ok(Some(range)) => Message {
                message: format!("Set [{}] {} range to {}", index, name, range),
                success: true,
            },
            Ok(None) => continue,
            Err(e) => failure(index, freq, e),
        };
        print_output(&message, format)?;
    }

    Ok(())
}

fn run_reset(
    sysman: &Sysman,
    service: &FrequencyService,
    domain: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    for (index, freq) in select(sysman.frequencies(), domain, "frequency")? {
        let name = freq.properties().domain;
        let message = match service.reset(freq) {
            Ok(()) if service.is_dry_run() => Message {
                message: format!("[DRY RUN] Would restore default [{}] {} range", index, name),
                success: true,
            },
            Ok(()) => Message {
                message: format!("Restored default [{}] {} range", index, name),
                success: true,
            },
            Err(e) => failure(index, freq, e),
        };
        print_output(&message, format)?;
    }

    Ok(())
}

fn failure(index: usize, freq: &Arc<Frequency>, err: ServiceError) -> Message {
    log::warn!("Frequency domain {}: {}", index, err);
    Message {
        message: format!(
            "Cannot change [{}] {} range: {}",
            index,
            freq.properties().domain,
            err
        ),
        success: false,
    }
}

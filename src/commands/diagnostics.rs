//! Diagnostics command implementation
//!
//! Lists firmware diagnostic suites and runs them.

use crate::cli::args::{DiagnosticsArgs, DiagnosticsCommands, OutputFormat};
use crate::cli::output::{print_output, DiagRunOutput, DiagSuiteEntry, Message};
use crate::commands::open_sysman;
use crate::config::Config;
use crate::error::{Result, SysmanError};
use crate::sysman::Sysman;

/// Execute diagnostics commands
pub fn run_diagnostics(
    args: &DiagnosticsArgs,
    format: OutputFormat,
    config: &Config,
) -> Result<()> {
    let sysman = open_sysman(config)?;

    match &args.command {
        DiagnosticsCommands::List => run_list(&sysman, format),
        DiagnosticsCommands::Run { suite, start, end } => run_suite(
            &sysman,
            suite,
            *start,
            *end,
            config.general.dry_run,
            format,
        ),
    }
}

fn run_list(sysman: &Sysman, format: OutputFormat) -> Result<()> {
    for (index, diag) in sysman.diagnostics().iter().enumerate() {
        let props = diag.properties();
        let entry = DiagSuiteEntry {
            index,
            name: props.name.clone(),
            on_subdevice: props.on_subdevice,
            subdevice_id: props.subdevice_id,
            tests: diag.tests().unwrap_or_default(),
        };
        print_output(&entry, format)?;
    }

    Ok(())
}

fn run_suite(
    sysman: &Sysman,
    suite: &str,
    start: u32,
    end: u32,
    dry_run: bool,
    format: OutputFormat,
) -> Result<()> {
    let matching: Vec<_> = sysman
        .diagnostics()
        .iter()
        .filter(|d| d.properties().name == suite)
        .collect();

    if matching.is_empty() {
        return Err(SysmanError::InvalidArgument(format!(
            "unknown diagnostic suite '{}'",
            suite
        ))
        .into());
    }

    for diag in matching {
        let props = diag.properties();

        if dry_run {
            print_output(
                &Message {
                    message: format!(
                        "[DRY RUN] Would run suite {} tests {}..={} on tile {}",
                        suite, start, end, props.subdevice_id
                    ),
                    success: true,
                },
                format,
            )?;
            continue;
        }

        log::info!(
            "Running diagnostic suite {} on tile {}",
            suite,
            props.subdevice_id
        );
        let report = diag.run_tests(start, end)?;

        print_output(
            &DiagRunOutput {
                suite: props.name.clone(),
                subdevice_id: props.subdevice_id,
                result: report.result,
                per_test: report.per_test,
            },
            format,
        )?;
    }

    Ok(())
}

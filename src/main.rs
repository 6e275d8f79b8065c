//! xesysman - GPU system management tool
//!
//! A command-line tool for querying and controlling GPU clock frequency,
//! memory, performance factors, temperature and firmware diagnostics.

use clap::Parser;
use xesysman::cli::args::{generate_completions, Cli, Commands};
use xesysman::commands::{
    run_diagnostics, run_frequency, run_list, run_memory, run_performance, run_temperature,
};
use xesysman::config::ConfigBuilder;
use xesysman::error::{AppError, SysmanError};

fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    logger_builder().parse_default_env().init();
    if std::env::var_os("RUST_LOG").is_none() {
        log::set_max_level(max_level(cli.verbose));
    }

    // Run the appropriate command
    let result = run(&cli);

    if let Err(e) = result {
        log::error!("{}", e);
        print_error(&e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), AppError> {
    let config = ConfigBuilder::new()
        .with_file(cli.config.as_deref())
        .with_verbose(cli.verbose.then_some(true))
        .with_dry_run(cli.dry_run.then_some(true))
        .with_card(cli.card)
        .with_sysfs_root(cli.sysfs_root.clone())
        .build();

    if config.general.verbose && log::max_level() < log::LevelFilter::Debug {
        log::set_max_level(log::LevelFilter::Debug);
    }

    match &cli.command {
        Commands::List => run_list(cli.format, &config),

        Commands::Frequency(args) => run_frequency(args, cli.format, &config),

        Commands::Memory(args) => run_memory(args, cli.format, &config),

        Commands::Performance(args) => run_performance(args, cli.format, &config),

        Commands::Temperature(args) => run_temperature(args, cli.format, &config),

        Commands::Diagnostics(args) => run_diagnostics(args, cli.format, &config),

        Commands::Completions { shell } => {
            generate_completions(*shell);
            Ok(())
        }
    }
}

/// Logger admitting records up to `debug`; `max_level` gates what is emitted
fn logger_builder() -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(log::LevelFilter::Debug)
        .format_timestamp(None);
    builder
}

fn max_level(verbose: bool) -> log::LevelFilter {
    if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    }
}

fn print_error(err: &AppError) {
    eprintln!("Error: {}", err);

    // Print helpful hints for common errors
    match err {
        AppError::DeviceNotFound(_) => {
            eprintln!();
            eprintln!("Hint: Make sure the i915 or xe kernel driver is loaded.");
            eprintln!("      Cards are listed under /sys/class/drm.");
        }
        AppError::Sysman(SysmanError::InsufficientPermissions(_)) => {
            eprintln!();
            eprintln!("Hint: Try running with sudo or as root.");
        }
        AppError::Sysman(SysmanError::DependencyUnavailable(_)) => {
            eprintln!();
            eprintln!("Hint: Telemetry needs the intel_pmt driver (modprobe intel_vsec).");
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;

    fn metadata(level: log::Level) -> log::Metadata<'static> {
        log::Metadata::builder()
            .level(level)
            .target("xesysman")
            .build()
    }

    #[test]
    fn test_logger_passes_debug_records() {
        let logger = logger_builder().build();
        assert!(logger.enabled(&metadata(log::Level::Debug)));
        assert!(!logger.enabled(&metadata(log::Level::Trace)));
    }

    #[test]
    fn test_max_level_follows_verbose() {
        assert_eq!(max_level(false), log::LevelFilter::Warn);
        assert_eq!(max_level(true), log::LevelFilter::Debug);
    }
}

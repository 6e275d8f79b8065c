//! CLI argument definitions using clap derive
//!
//! Defines all command-line arguments and subcommands.

use crate::domain::{EngineType, LAST_TEST_INDEX};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// GPU system management tool
///
/// Query and control clock frequency, memory, performance factors,
/// temperature sensors and firmware diagnostics through sysfs.
#[derive(Parser, Debug)]
#[command(name = "xesysman")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "XESYSMAN_CONFIG")]
    pub config: Option<String>,

    /// Target DRM card index
    #[arg(long, global = true)]
    pub card: Option<u32>,

    /// Resolve sysfs paths under this root instead of `/`
    #[arg(long, global = true, value_name = "DIR")]
    pub sysfs_root: Option<PathBuf>,

    /// Dry run mode - don't actually apply changes
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List detected GPUs and their domains
    List,

    /// Query and control clock frequency domains
    Frequency(FrequencyArgs),

    /// Show memory module state and bandwidth
    Memory(MemoryArgs),

    /// Query and control performance factors
    Performance(PerformanceArgs),

    /// Show temperature sensors
    Temperature(TemperatureArgs),

    /// List and run firmware diagnostic suites
    Diagnostics(DiagnosticsArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments for frequency commands
#[derive(Parser, Debug)]
pub struct FrequencyArgs {
    #[command(subcommand)]
    pub command: FrequencyCommands,
}

/// Frequency subcommands
#[derive(Subcommand, Debug)]
pub enum FrequencyCommands {
    /// Show current range, state and throttle reasons
    Status,

    /// List the supported clocks of each domain
    Clocks,

    /// Set the clock range on controllable domains
    Range {
        /// Lower limit in MHz
        min: f64,
        /// Upper limit in MHz
        max: f64,
        /// Only apply to the domain at this index
        #[arg(long)]
        domain: Option<usize>,
    },

    /// Restore the hardware default range
    Reset {
        /// Only reset the domain at this index
        #[arg(long)]
        domain: Option<usize>,
    },

    /// Apply the range from the configuration file
    Apply,
}

/// Arguments for memory commands
#[derive(Parser, Debug)]
pub struct MemoryArgs {
    #[command(subcommand)]
    pub command: MemoryCommands,
}

/// Memory subcommands
#[derive(Subcommand, Debug)]
pub enum MemoryCommands {
    /// Show properties, health, usage and bandwidth counters
    Status,
}

/// Arguments for performance factor commands
#[derive(Parser, Debug)]
pub struct PerformanceArgs {
    #[command(subcommand)]
    pub command: PerformanceCommands,
}

/// Performance subcommands
#[derive(Subcommand, Debug)]
pub enum PerformanceCommands {
    /// Show the factor of each engine
    Status,

    /// Set the factor of an engine class
    Set {
        /// Engine class
        #[arg(value_enum)]
        engine: EngineArg,
        /// Factor (0-100)
        #[arg(value_parser = parse_factor)]
        factor: f64,
    },

    /// Apply the factors from the configuration file
    Apply,
}

/// Engine class argument
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineArg {
    /// Media engines
    Media,
    /// Compute engines
    Compute,
}

impl From<EngineArg> for EngineType {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Media => EngineType::Media,
            EngineArg::Compute => EngineType::Compute,
        }
    }
}

/// Arguments for temperature commands
#[derive(Parser, Debug)]
pub struct TemperatureArgs {
    #[command(subcommand)]
    pub command: TemperatureCommands,
}

/// Temperature subcommands
#[derive(Subcommand, Debug)]
pub enum TemperatureCommands {
    /// Show each sensor's reading and limits
    Status,
}

/// Arguments for diagnostics commands
#[derive(Parser, Debug)]
pub struct DiagnosticsArgs {
    #[command(subcommand)]
    pub command: DiagnosticsCommands,
}

/// Diagnostics subcommands
#[derive(Subcommand, Debug)]
pub enum DiagnosticsCommands {
    /// List suites and their tests
    List,

    /// Run a suite
    Run {
        /// Suite name
        suite: String,
        /// First test index
        #[arg(long, default_value_t = 0)]
        start: u32,
        /// Last test index (defaults to the end of the suite)
        #[arg(long, default_value_t = LAST_TEST_INDEX)]
        end: u32,
    },
}

/// Output format
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for machine parsing
    Json,
    /// Compact single-line format
    Compact,
}

fn parse_factor(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    if !(0.0..=100.0).contains(&value) {
        return Err(format!("{} is outside 0-100", value));
    }
    Ok(value)
}

/// Generate shell completions and print to stdout
pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_list() {
        let args = Cli::try_parse_from(["xesysman", "list"]).unwrap();
        assert!(matches!(args.command, Commands::List));
    }

    #[test]
    fn test_cli_parse_globals() {
        let args = Cli::try_parse_from([
            "xesysman",
            "-v",
            "--card",
            "1",
            "--sysfs-root",
            "/tmp/sys",
            "--dry-run",
            "list",
        ])
        .unwrap();
        assert!(args.verbose);
        assert!(args.dry_run);
        assert_eq!(args.card, Some(1));
        assert_eq!(args.sysfs_root, Some(PathBuf::from("/tmp/sys")));
    }

    #[test]
    fn test_cli_parse_frequency_range() {
        let args = Cli::try_parse_from(["xesysman", "frequency", "range", "300", "1200"]).unwrap();
        let Commands::Frequency(freq) = args.command else {
            panic!("Expected Frequency command");
        };
        let FrequencyCommands::Range { min, max, domain } = freq.command else {
            panic!("Expected Range command");
        };
        assert_eq!((min, max, domain), (300.0, 1200.0, None));
    }

    #[test]
    fn test_cli_parse_performance_set() {
        let args =
            Cli::try_parse_from(["xesysman", "performance", "set", "compute", "40"]).unwrap();
        let Commands::Performance(perf) = args.command else {
            panic!("Expected Performance command");
        };
        let PerformanceCommands::Set { engine, factor } = perf.command else {
            panic!("Expected Set command");
        };
        assert_eq!(EngineType::from(engine), EngineType::Compute);
        assert_eq!(factor, 40.0);
    }

    #[test]
    fn test_cli_performance_factor_validation() {
        let result = Cli::try_parse_from(["xesysman", "performance", "set", "media", "150"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_diagnostics_defaults() {
        let args = Cli::try_parse_from(["xesysman", "diagnostics", "run", "array"]).unwrap();
        let Commands::Diagnostics(diag) = args.command else {
            panic!("Expected Diagnostics command");
        };
        let DiagnosticsCommands::Run { suite, start, end } = diag.command else {
            panic!("Expected Run command");
        };
        assert_eq!(suite, "array");
        assert_eq!((start, end), (0, LAST_TEST_INDEX));
    }
}

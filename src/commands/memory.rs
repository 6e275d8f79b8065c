//! Memory command implementation

use crate::cli::args::{MemoryArgs, MemoryCommands, OutputFormat};
use crate::cli::output::{print_output, MemoryStatus};
use crate::commands::open_sysman;
use crate::config::Config;
use crate::error::Result;

/// Execute memory commands
pub fn run_memory(args: &MemoryArgs, format: OutputFormat, config: &Config) -> Result<()> {
    let sysman = open_sysman(config)?;

    match &args.command {
        MemoryCommands::Status => {
            for (index, memory) in sysman.memories().iter().enumerate() {
                let props = memory.properties();
                let state = memory.state().ok();
                let bandwidth = match memory.bandwidth() {
                    Ok(bw) => Some(bw),
                    Err(e) => {
                        log::debug!("Memory module {} bandwidth: {}", index, e);
                        None
                    }
                };

                let status = MemoryStatus {
                    index,
                    memory_type: props.memory_type.to_string(),
                    location: format!("{:?}", props.location),
                    on_subdevice: props.on_subdevice,
                    subdevice_id: props.subdevice_id,
                    physical_size: props.physical_size,
                    num_channels: props.num_channels,
                    bus_width: props.bus_width,
                    health: state.map(|s| s.health.to_string()),
                    used_bytes: state.map(|s| s.used()),
                    size_bytes: state.map(|s| s.size),
                    read_counter: bandwidth.map(|b| b.read_counter),
                    write_counter: bandwidth.map(|b| b.write_counter),
                    max_bandwidth: bandwidth.map(|b| b.max_bandwidth),
                };

                print_output(&status, format)?;
            }
        }
    }

    Ok(())
}

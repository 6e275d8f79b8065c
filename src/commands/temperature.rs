//! Temperature command implementation

use crate::cli::args::{OutputFormat, TemperatureArgs, TemperatureCommands};
use crate::cli::output::{print_output, TemperatureStatus};
use crate::commands::open_sysman;
use crate::config::Config;
use crate::error::Result;

/// Execute temperature commands
pub fn run_temperature(
    args: &TemperatureArgs,
    format: OutputFormat,
    config: &Config,
) -> Result<()> {
    let sysman = open_sysman(config)?;

    match &args.command {
        TemperatureCommands::Status => {
            for (index, temp) in sysman.temperatures().iter().enumerate() {
                let props = temp.properties();
                let celsius = match temp.reading() {
                    Ok(value) => Some(value),
                    Err(e) => {
                        log::debug!("Sensor {} ({}): {}", index, props.sensor, e);
                        None
                    }
                };

                let status = TemperatureStatus {
                    index,
                    sensor: props.sensor.to_string(),
                    on_subdevice: props.on_subdevice,
                    subdevice_id: props.subdevice_id,
                    celsius,
                    max_celsius: props.max_temperature,
                };
                print_output(&status, format)?;
            }
        }
    }

    Ok(())
}

//! CLI entry point for daq-scpi
//!
//! Talks to one configured instrument through its driver's property table.
//!
//! # Usage
//!
//! ```bash
//! daq-scpi --driver rigol_dp900 --resource TCPIP0::192.168.1.50::5555::SOCKET id
//! daq-scpi get ch2.voltage_setpoint
//! daq-scpi set ch2.voltage_setpoint 5
//! daq-scpi query ":MEAS:VOLT? CH1"
//! daq-scpi --driver rigol_dho800 screenshot scope.png
//! ```
//!
//! Without `--driver`/`--resource` the instrument comes from `daq-scpi.toml`
//! or `DAQ_SCPI_INSTRUMENT__*` variables.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use daq_scpi::config::{Settings, DEFAULT_CONFIG_FILE};
use daq_scpi::instrument::rigol_dho800::RigolDho800;
use daq_scpi::instrument::{DriverKind, DriverSchema, Instrument, Scpi};
use daq_scpi::logging::{self, LogFormat, TracingConfig};
use daq_scpi::property::{Property, PropertyValue};
use std::path::PathBuf;
use tracing::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "daq-scpi")]
#[command(about = "Query and control SCPI bench instruments", long_about = None)]
struct Cli {
    /// Settings file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Resource string, overrides the settings file
    #[arg(long)]
    resource: Option<String>,

    /// Driver, overrides the settings file
    #[arg(long, value_enum)]
    driver: Option<DriverKind>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the identification string
    Id,

    /// List the driver's properties and channels
    List,

    /// Read a property (`name` or `chN.name`)
    Get {
        /// Property path
        property: String,
    },

    /// Write a property (`name` or `chN.name`)
    Set {
        /// Property path
        property: String,
        /// New value; numbers, `true`/`false` or text
        value: String,
    },

    /// Send a raw command
    Write {
        /// Command text
        command: String,
    },

    /// Send a raw query and print the reply
    Query {
        /// Query text
        command: String,
    },

    /// Save the DHO800 display to a file
    Screenshot {
        /// Output file
        file: PathBuf,
        /// Image format understood by `:DISP:DATA?`
        #[arg(long, default_value = "PNG")]
        format: String,
    },
}

/// A resolved `name` or `chN.name` argument.
struct PropertyPath<'s> {
    channel: Option<String>,
    property: &'s Property,
}

fn resolve<'s>(schema: &'s DriverSchema, path: &str) -> Result<PropertyPath<'s>> {
    if let Some((scope, name)) = path.split_once('.') {
        let channel = scope
            .strip_prefix("ch")
            .with_context(|| format!("Channel scope '{}' must look like ch1", scope))?;
        let property = schema.channel_property(channel, name)?;
        return Ok(PropertyPath {
            channel: Some(channel.to_string()),
            property,
        });
    }
    Ok(PropertyPath {
        channel: None,
        property: schema.property(path)?,
    })
}

fn get(instrument: &mut Instrument, path: &PropertyPath<'_>) -> Result<PropertyValue> {
    let value = match &path.channel {
        Some(ch) => instrument.channel(ch.as_str()).get(path.property)?,
        None => instrument.get(path.property)?,
    };
    Ok(value)
}

fn set(instrument: &mut Instrument, path: &PropertyPath<'_>, value: PropertyValue) -> Result<()> {
    match &path.channel {
        Some(ch) => instrument.channel(ch.as_str()).set(path.property, value)?,
        None => instrument.set(path.property, value)?,
    }
    Ok(())
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn list(schema: &DriverSchema) -> Result<()> {
    let describe = |p: &Property| {
        serde_json::json!({
            "name": p.name,
            "get": p.get_command,
            "set": p.set_command,
        })
    };
    print_json(&serde_json::json!({
        "driver": schema.kind.default_name(),
        "channels": schema.channels,
        "properties": schema.properties.iter().map(describe).collect::<Vec<_>>(),
        "channel_properties": schema.channel_properties.iter().map(describe).collect::<Vec<_>>(),
    }))
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut figment = Settings::figment(&cli.config);
    if let Some(resource) = &cli.resource {
        figment = figment.merge(("instrument.resource", resource));
    }
    if let Some(driver) = cli.driver {
        figment = figment.merge(("instrument.driver", driver));
    }
    Settings::from_figment(figment).with_context(|| {
        format!(
            "Failed to load settings from {} (or pass --driver and --resource)",
            cli.config.display()
        )
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    logging::init(TracingConfig::from_level_name(&settings.log_level)?.with_format(cli.log_format))?;

    let kind = settings.instrument.driver;
    let schema = kind.schema();

    if let Commands::List = cli.command {
        return list(&schema);
    }

    info!(driver = %kind, resource = %settings.instrument.resource, "opening instrument");
    let mut instrument = settings
        .instrument
        .open()
        .with_context(|| format!("Failed to open {}", settings.instrument.resource))?;

    match cli.command {
        Commands::List => {}
        Commands::Id => println!("{}", instrument.id()?),
        Commands::Get { property } => {
            let path = resolve(&schema, &property)?;
            let value = get(&mut instrument, &path)
                .with_context(|| format!("Failed to read {}", property))?;
            print_json(&value)?;
        }
        Commands::Set { property, value } => {
            let path = resolve(&schema, &property)?;
            set(&mut instrument, &path, PropertyValue::parse_user_input(&value))
                .with_context(|| format!("Failed to set {} to {}", property, value))?;
        }
        Commands::Write { command } => instrument.write(&command)?,
        Commands::Query { command } => println!("{}", instrument.ask(&command)?),
        Commands::Screenshot { file, format } => {
            if kind != DriverKind::RigolDho800 {
                bail!("Screenshots are only supported by the {}", DriverKind::RigolDho800);
            }
            let mut scope = RigolDho800::from_instrument(instrument);
            let written = scope
                .save_screen(&file, &format)
                .with_context(|| format!("Failed to save screen to {}", file.display()))?;
            info!(bytes = written, file = %file.display(), "screenshot saved");
            return Ok(());
        }
    }

    instrument.close()?;
    Ok(())
}

//! Configuration loading with Figment.
//!
//! Settings are layered, later sources winning:
//! 1. `daq-scpi.toml` (or the file given with `--config`)
//! 2. environment variables prefixed with `DAQ_SCPI_`, nested with `__`
//!    (`DAQ_SCPI_INSTRUMENT__RESOURCE=/dev/ttyUSB0`)
//!
//! # Example
//! ```no_run
//! use daq_scpi::config::Settings;
//!
//! let settings = Settings::load()?;
//! let mut instrument = settings.instrument.open()?;
//! # Ok::<(), daq_scpi::error::ScpiError>(())
//! ```

use crate::adapters::{ConnectionSettings, Parity, Resource, StopBits};
use crate::error::{ScpiError, ScpiResult};
use crate::instrument::{DriverKind, Instrument};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "daq-scpi.toml";

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "DAQ_SCPI_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Top-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// The instrument to talk to
    pub instrument: InstrumentSettings,
}

/// Which driver to use and where the instrument is attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentSettings {
    /// Driver name, e.g. `rigol_dp900`
    pub driver: DriverKind,
    /// Resource string (`/dev/ttyUSB0`, `ASRL3::INSTR`,
    /// `TCPIP0::192.168.1.50::5555::SOCKET`, `USB0::...::INSTR`)
    pub resource: String,
    /// Name used in logs, defaults to the model name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Overrides of the driver's connection defaults
    #[serde(default)]
    pub connection: ConnectionOverrides,
}

/// Optional overrides of [`ConnectionSettings`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionOverrides {
    /// Baud rate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baud_rate: Option<u32>,
    /// Data bits (5 to 8)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_bits: Option<u8>,
    /// Parity, by name or VISA code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parity: Option<Parity>,
    /// Stop bits, by name or VISA code (10, 15, 20)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_bits: Option<StopBits>,
    /// Reply timeout, e.g. `"2s"` or `"500ms"`
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,
    /// Terminator appended to commands
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_termination: Option<String>,
    /// Terminator ending replies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_termination: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ConnectionOverrides {
    /// Apply the overrides that are set on top of `base`.
    pub fn apply(&self, base: ConnectionSettings) -> ConnectionSettings {
        ConnectionSettings {
            baud_rate: self.baud_rate.unwrap_or(base.baud_rate),
            data_bits: self.data_bits.unwrap_or(base.data_bits),
            parity: self.parity.unwrap_or(base.parity),
            stop_bits: self.stop_bits.unwrap_or(base.stop_bits),
            timeout: self.timeout.unwrap_or(base.timeout),
            write_termination: self
                .write_termination
                .clone()
                .unwrap_or(base.write_termination),
            read_termination: self
                .read_termination
                .clone()
                .unwrap_or(base.read_termination),
        }
    }
}

impl InstrumentSettings {
    /// Driver defaults with the configured overrides applied.
    pub fn connection_settings(&self) -> ConnectionSettings {
        self.connection.apply(self.driver.connection())
    }

    /// Open the configured resource.
    pub fn open(&self) -> ScpiResult<Instrument> {
        self.driver.open(
            self.name.as_deref(),
            &self.resource,
            &self.connection_settings(),
        )
    }
}

impl Settings {
    /// Load from [`DEFAULT_CONFIG_FILE`] and the environment.
    pub fn load() -> ScpiResult<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from a specific file and the environment.
    pub fn load_from<P: AsRef<Path>>(path: P) -> ScpiResult<Self> {
        Self::from_figment(Self::figment(path))
    }

    /// The layered provider, for callers that merge further sources.
    pub fn figment<P: AsRef<Path>>(path: P) -> Figment {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Extract and validate.
    pub fn from_figment(figment: Figment) -> ScpiResult<Self> {
        let settings: Settings = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Semantic checks serde cannot express.
    pub fn validate(&self) -> ScpiResult<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ScpiError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        self.instrument.resource.parse::<Resource>()?;

        let connection = self.instrument.connection_settings();
        if !(5..=8).contains(&connection.data_bits) {
            return Err(ScpiError::Configuration(format!(
                "Invalid data_bits {}. Must be 5-8",
                connection.data_bits
            )));
        }
        if connection.baud_rate == 0 {
            return Err(ScpiError::Configuration(
                "baud_rate must be greater than 0".to_string(),
            ));
        }
        if connection.timeout.is_zero() {
            return Err(ScpiError::Configuration(
                "timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    #[serial]
    fn loads_file_with_driver_defaults() {
        let file = write_config(
            r#"
            [instrument]
            driver = "fluke_8808a"
            resource = "/dev/ttyUSB0"
            "#,
        );
        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.instrument.driver, DriverKind::Fluke8808a);
        let connection = settings.instrument.connection_settings();
        assert_eq!(connection.stop_bits, StopBits::Two);
        assert_eq!(connection.read_termination, "\r\n");
    }

    #[test]
    #[serial]
    fn overrides_accept_visa_codes_and_durations() {
        let file = write_config(
            r#"
            log_level = "debug"
            [instrument]
            driver = "victor_8045m"
            resource = "ASRL3::INSTR"
            [instrument.connection]
            stop_bits = 20
            parity = "even"
            timeout = "250ms"
            "#,
        );
        let settings = Settings::load_from(file.path()).unwrap();
        let connection = settings.instrument.connection_settings();
        assert_eq!(connection.baud_rate, 115_200);
        assert_eq!(connection.stop_bits, StopBits::Two);
        assert_eq!(connection.parity, Parity::Even);
        assert_eq!(connection.timeout, Duration::from_millis(250));
    }

    #[test]
    #[serial]
    fn environment_wins_over_file() {
        let file = write_config(
            r#"
            [instrument]
            driver = "rigol_dp900"
            resource = "TCPIP0::10.0.0.2::5555::SOCKET"
            "#,
        );
        std::env::set_var("DAQ_SCPI_INSTRUMENT__RESOURCE", "TCPIP0::10.0.0.3::5555::SOCKET");
        std::env::set_var("DAQ_SCPI_LOG_LEVEL", "warn");
        let settings = Settings::load_from(file.path());
        std::env::remove_var("DAQ_SCPI_INSTRUMENT__RESOURCE");
        std::env::remove_var("DAQ_SCPI_LOG_LEVEL");

        let settings = settings.unwrap();
        assert_eq!(settings.instrument.resource, "TCPIP0::10.0.0.3::5555::SOCKET");
        assert_eq!(settings.log_level, "warn");
    }

    #[test]
    #[serial]
    fn rejects_bad_values() {
        let file = write_config(
            r#"
            log_level = "chatty"
            [instrument]
            driver = "rigol_dm3068"
            resource = "/dev/ttyUSB0"
            "#,
        );
        assert!(matches!(
            Settings::load_from(file.path()),
            Err(ScpiError::Configuration(_))
        ));

        let file = write_config(
            r#"
            [instrument]
            driver = "rigol_dm3068"
            resource = "not a resource"
            "#,
        );
        assert!(matches!(
            Settings::load_from(file.path()),
            Err(ScpiError::Configuration(_))
        ));

        let file = write_config(
            r#"
            [instrument]
            driver = "keithley_2400"
            resource = "/dev/ttyUSB0"
            "#,
        );
        assert!(matches!(Settings::load_from(file.path()), Err(ScpiError::Config(_))));
    }

    #[test]
    fn overrides_round_trip_through_toml() {
        let overrides = ConnectionOverrides {
            timeout: Some(Duration::from_secs(3)),
            ..ConnectionOverrides::default()
        };
        let text = toml::to_string(&overrides).unwrap();
        assert_eq!(text.trim(), r#"timeout = "3s""#);
        let parsed: ConnectionOverrides = toml::from_str(&text).unwrap();
        assert_eq!(parsed, overrides);
    }
}

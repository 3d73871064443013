//! Fluke 8808A digital multimeter.
//!
//! The meter answers every command with a prompt line (`=>`), so the error
//! hooks read and log one line instead of polling `SYST:ERR?`.

use super::error_check::PromptLine;
use super::registry::{DriverKind, DriverSchema};
use super::scpi::{Driver, Scpi};
use super::Instrument;
use crate::adapters::{open_resource, Adapter, ConnectionSettings, StopBits};
use crate::error::ScpiResult;
use crate::limits::FLUKE_RESET_SETTLE;
use crate::property::{Cast, Property};
use std::time::Duration;
use tracing::debug;

/// Name used in logs. The firmware family name, not the model number.
pub const DEFAULT_NAME: &str = "Fluke 7341";

/// 9600 8N2, 5 s timeout, `\r\n` both ways.
pub fn connection() -> ConnectionSettings {
    ConnectionSettings::default()
        .with_baud_rate(9600)
        .with_stop_bits(StopBits::Two)
        .with_timeout(Duration::from_millis(5000))
        .with_termination("\r\n")
}

fn id() -> Property {
    Property::measurement("id", "*IDN?")
        .cast(Cast::Str)
        .no_split()
        .check_errors(true, false)
}

fn format() -> Property {
    Property::control("format", "FORMAT?", "FORMAT %d")
        .cast(Cast::Int)
        .check_errors(true, true)
}

fn function() -> Property {
    Property::control("function", "FUNC1?", "%s")
        .cast(Cast::Str)
        .check_errors(true, true)
}

fn value() -> Property {
    Property::measurement("value", "VAL1?").check_errors(true, false)
}

/// Declared properties.
pub fn schema() -> DriverSchema {
    DriverSchema {
        kind: DriverKind::Fluke8808a,
        channels: &[],
        properties: vec![id(), format(), function(), value()],
        channel_properties: Vec::new(),
    }
}

/// Fluke 8808A driver.
#[derive(Debug)]
pub struct Fluke8808a {
    inst: Instrument,
}

impl Fluke8808a {
    /// Wrap an opened adapter and install the prompt-reading hook.
    pub fn new(adapter: Box<dyn Adapter>) -> Self {
        Self::from_instrument(Instrument::new(DEFAULT_NAME, adapter))
    }

    /// Open `resource` with the 8808A serial settings.
    pub fn connect(resource: &str) -> ScpiResult<Self> {
        Ok(Self::new(open_resource(resource, &connection())?))
    }

    /// Wrap an existing instrument, replacing its error hook.
    pub fn from_instrument(inst: Instrument) -> Self {
        Self {
            inst: inst.with_error_check(PromptLine),
        }
    }

    /// Output format, 1 or 2.
    pub fn format(&mut self) -> ScpiResult<i64> {
        self.inst.get_as(&format())
    }

    /// Set the output format.
    pub fn set_format(&mut self, format_code: i64) -> ScpiResult<()> {
        self.inst.set(&format(), format_code)
    }

    /// Primary display function.
    pub fn function(&mut self) -> ScpiResult<String> {
        self.inst.get_as(&function())
    }

    /// Select a function by its command (`VDC`, `VAC`, `OHMS`, `WIRE4`, ...).
    pub fn set_function(&mut self, command: &str) -> ScpiResult<()> {
        self.inst.set(&function(), command)
    }

    /// Primary display value.
    pub fn value(&mut self) -> ScpiResult<f64> {
        self.inst.get_as(&value())
    }
}

impl Driver for Fluke8808a {
    fn instrument(&mut self) -> &mut Instrument {
        &mut self.inst
    }
}

impl Scpi for Fluke8808a {
    fn id(&mut self) -> ScpiResult<String> {
        self.inst.get_as(&id())
    }

    /// `*RST`, wait for the meter to settle, then consume its prompt.
    fn reset(&mut self) -> ScpiResult<()> {
        self.inst.write("*RST")?;
        std::thread::sleep(FLUKE_RESET_SETTLE);
        let prompt = self.inst.read()?;
        debug!(prompt = %prompt.trim(), "reset complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockAdapter;

    #[test]
    fn every_checked_access_consumes_a_prompt() {
        let mock = MockAdapter::new([
            (Some("*IDN?"), Some("FLUKE,8808A,1234567,1.0 D1.0")),
            (None, Some("=>")),
            (Some("VDC"), None),
            (None, Some("=>")),
            (Some("FUNC1?"), Some("VDC")),
            (None, Some("=>")),
            (Some("VAL1?"), Some("+1.2345E+0")),
            (None, Some("=>")),
        ]);
        let handle = mock.handle();
        let mut dmm = Fluke8808a::new(mock.boxed());
        assert_eq!(dmm.id().unwrap(), "FLUKE,8808A,1234567,1.0 D1.0");
        dmm.set_function("VDC").unwrap();
        assert_eq!(dmm.function().unwrap(), "VDC");
        assert_eq!(dmm.value().unwrap(), 1.2345);
        handle.assert_finished();
    }

    #[test]
    fn format_checks_both_directions() {
        let mock = MockAdapter::new([
            (Some("FORMAT 2"), None),
            (None, Some("=>")),
            (Some("FORMAT?"), Some("2")),
            (None, Some("=>")),
        ]);
        let handle = mock.handle();
        let mut dmm = Fluke8808a::new(mock.boxed());
        dmm.set_format(2).unwrap();
        assert_eq!(dmm.format().unwrap(), 2);
        handle.assert_finished();
    }

    #[test]
    fn connection_defaults() {
        let settings = connection();
        assert_eq!(settings.write_termination, "\r\n");
        assert_eq!(settings.stop_bits, StopBits::Two);
        assert_eq!(settings.timeout, Duration::from_secs(5));
    }
}

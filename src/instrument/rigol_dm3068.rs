//! Rigol DM3068 6.5 digit bench multimeter.

use super::registry::{DriverKind, DriverSchema};
use super::scpi::{idn, Driver, Scpi};
use super::Instrument;
use crate::adapters::{open_resource, Adapter, ConnectionSettings};
use crate::error::{ScpiError, ScpiResult};
use crate::property::{Property, PropertyValue, ValueMap};

/// Name used in logs.
pub const DEFAULT_NAME: &str = "Rigol DM3068";

/// Logical function names and their SCPI mnemonics.
pub const FUNCTIONS: [(&str, &str); 11] = [
    ("DCV", "VOLT:DC"),
    ("ACV", "VOLT:AC"),
    ("DCI", "CURR:DC"),
    ("ACI", "CURR:AC"),
    ("W2R", "RES"),
    ("W4R", "FRES"),
    ("FREQ", "FREQ"),
    ("PERIOD", "PER"),
    ("CONTINUITY", "CONT"),
    ("DIODE", "DIOD"),
    ("CAP", "CAP"),
];

/// `:FUNC?` replies and the mnemonic each one stands for.
const FUNCTION_REPLIES: [(&str, &str); 11] = [
    ("DCV", "VOLT:DC"),
    ("ACV", "VOLT:AC"),
    ("DCI", "CURR:DC"),
    ("ACI", "CURR:AC"),
    ("2WR", "RES"),
    ("4WR", "FRES"),
    ("FREQ", "FREQ"),
    ("PERI", "PER"),
    ("CONT", "CONT"),
    ("DIODE", "DIOD"),
    ("CAP", "CAP"),
];

fn normalise_function_reply(raw: &str) -> ScpiResult<PropertyValue> {
    let reply = raw.trim();
    FUNCTION_REPLIES
        .iter()
        .find(|(token, _)| *token == reply)
        .map(|(_, mnemonic)| PropertyValue::from(*mnemonic))
        .ok_or_else(|| ScpiError::Lookup(format!("unknown function reply '{}'", reply)))
}

fn function() -> Property {
    Property::control("function", ":FUNC?", ":FUNC:%s")
        .value_map(ValueMap::new(FUNCTIONS))
        .strict_keys()
        .get_process(normalise_function_reply)
}

fn beeper_enabled() -> Property {
    Property::control("beeper_enabled", "SYST:BEEP:STAT?", "SYST:BEEP:STAT %s")
        .value_map(ValueMap::bools(1i64, 0i64))
        .strict_keys()
}

fn scpi_version() -> Property {
    Property::measurement("scpi_version", "SYST:VERS?")
}

fn voltage_dc() -> Property {
    Property::measurement("voltage_dc", ":MEAS:VOLT:DC?")
}

/// Declared properties.
pub fn schema() -> DriverSchema {
    DriverSchema {
        kind: DriverKind::RigolDm3068,
        channels: &[],
        properties: vec![
            idn(),
            function(),
            beeper_enabled(),
            scpi_version(),
            voltage_dc(),
        ],
        channel_properties: Vec::new(),
    }
}

/// Rigol DM3068 driver.
#[derive(Debug)]
pub struct RigolDm3068 {
    inst: Instrument,
}

impl RigolDm3068 {
    /// Wrap an opened adapter.
    pub fn new(adapter: Box<dyn Adapter>) -> Self {
        Self::from_instrument(Instrument::new(DEFAULT_NAME, adapter))
    }

    /// Open `resource` with the default connection settings.
    pub fn connect(resource: &str) -> ScpiResult<Self> {
        Ok(Self::new(open_resource(resource, &ConnectionSettings::default())?))
    }

    /// Wrap an existing instrument.
    pub fn from_instrument(inst: Instrument) -> Self {
        Self { inst }
    }

    /// Measurement function, one of the [`FUNCTIONS`] names.
    pub fn function(&mut self) -> ScpiResult<String> {
        self.inst.get_as(&function())
    }

    /// Select the measurement function by logical name (`"DCV"`, `"W4R"`, ...).
    pub fn set_function(&mut self, name: &str) -> ScpiResult<()> {
        self.inst.set(&function(), name)
    }

    /// Beep once.
    pub fn beep(&mut self) -> ScpiResult<()> {
        self.inst.write("SYST:BEEP")
    }

    /// Beeper state.
    pub fn beeper_enabled(&mut self) -> ScpiResult<bool> {
        self.inst.get_as(&beeper_enabled())
    }

    /// Enable or disable the beeper.
    pub fn set_beeper_enabled(&mut self, enabled: bool) -> ScpiResult<()> {
        self.inst.set(&beeper_enabled(), enabled)
    }

    /// SCPI version implemented by the firmware.
    pub fn scpi_version(&mut self) -> ScpiResult<f64> {
        self.inst.get_as(&scpi_version())
    }

    /// One DC voltage reading in volts.
    pub fn voltage_dc(&mut self) -> ScpiResult<f64> {
        self.inst.get_as(&voltage_dc())
    }
}

impl Driver for RigolDm3068 {
    fn instrument(&mut self) -> &mut Instrument {
        &mut self.inst
    }
}

impl Scpi for RigolDm3068 {}

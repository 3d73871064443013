//! ITECH IT6322A triple output power supply.
//!
//! Each channel command is prefixed with `APPL CH<n>;` to select the output
//! before the actual query or setting.

use super::channel::Channel;
use super::registry::{require_channel, DriverKind, DriverSchema};
use super::scpi::{idn, Driver, Scpi};
use super::Instrument;
use crate::adapters::{open_resource, Adapter, ConnectionSettings};
use crate::error::ScpiResult;
use crate::property::{Allowed, Cast, Property, ValueMap};

/// Name used in logs.
pub const DEFAULT_NAME: &str = "IT6322A";

/// Output channel ids.
pub const CHANNELS: &[&str] = &["1", "2", "3"];

fn remote_control_enabled() -> Property {
    Property::setting("remote_control_enabled", "SYST:%s")
        .value_map(ValueMap::bools("REM", "LOC"))
        .strict_keys()
}

fn channel_select() -> Property {
    Property::control("channel_select", "INST:NSEL?", "INST:NSEL %d").cast(Cast::Int)
}

fn voltage_setpoint() -> Property {
    Property::control("voltage_setpoint", "APPL CH{ch}; VOLT?", "APPL CH{ch}; VOLT %g")
        .strict_range(0.0, 30.0)
        .dynamic()
}

fn current_setpoint() -> Property {
    Property::control("current_setpoint", "APPL CH{ch}; CURR?", "APPL CH{ch}; CURR %g")
        .strict_range(0.0, 1.0)
        .dynamic()
}

fn voltage() -> Property {
    Property::measurement("voltage", "APPL CH{ch}; MEAS:VOLT?")
}

fn current() -> Property {
    Property::measurement("current", "APPL CH{ch}; MEAS:CURR?")
}

fn output_enabled() -> Property {
    Property::control(
        "output_enabled",
        "APPL CH{ch}; CHAN:OUTP?",
        "APPL CH{ch}; CHAN:OUTP %s",
    )
    .value_map(ValueMap::bools(1i64, 0i64))
}

/// Declared properties.
pub fn schema() -> DriverSchema {
    DriverSchema {
        kind: DriverKind::ItechIt6322a,
        channels: CHANNELS,
        properties: vec![idn(), remote_control_enabled(), channel_select()],
        channel_properties: vec![
            voltage_setpoint(),
            current_setpoint(),
            voltage(),
            current(),
            output_enabled(),
        ],
    }
}

/// ITECH IT6322A driver.
#[derive(Debug)]
pub struct ItechIt6322a {
    inst: Instrument,
}

impl ItechIt6322a {
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

    /// Sound the beeper.
    pub fn beep(&mut self) -> ScpiResult<()> {
        self.inst.write("SYST:BEEP")
    }

    /// Switch between remote and local control.
    pub fn set_remote_control_enabled(&mut self, enabled: bool) -> ScpiResult<()> {
        self.inst.set(&remote_control_enabled(), enabled)
    }

    /// Output currently selected.
    pub fn channel_select(&mut self) -> ScpiResult<i64> {
        self.inst.get_as(&channel_select())
    }

    /// Select an output.
    pub fn set_channel_select(&mut self, channel: i64) -> ScpiResult<()> {
        self.inst.set(&channel_select(), channel)
    }

    /// Output channel `id` ("1" to "3").
    pub fn channel(&mut self, id: &str) -> ScpiResult<It6322aChannel<'_>> {
        require_channel(CHANNELS, id)?;
        Ok(It6322aChannel {
            ch: self.inst.channel(id),
        })
    }
}

impl Driver for ItechIt6322a {
    fn instrument(&mut self) -> &mut Instrument {
        &mut self.inst
    }
}

impl Scpi for ItechIt6322a {}

/// One IT6322A output.
#[derive(Debug)]
pub struct It6322aChannel<'a> {
    ch: Channel<'a>,
}

impl It6322aChannel<'_> {
    /// Voltage setpoint in volts.
    pub fn voltage_setpoint(&mut self) -> ScpiResult<f64> {
        self.ch.get_as(&voltage_setpoint())
    }

    /// Set the voltage setpoint.
    pub fn set_voltage_setpoint(&mut self, volts: f64) -> ScpiResult<()> {
        self.ch.set(&voltage_setpoint(), volts)
    }

    /// Narrow the accepted voltage setpoints of this output.
    pub fn set_voltage_bounds(&mut self, lo: f64, hi: f64) -> ScpiResult<()> {
        self.ch.set_bounds(&voltage_setpoint(), Allowed::range(lo, hi))
    }

    /// Current setpoint in amperes.
    pub fn current_setpoint(&mut self) -> ScpiResult<f64> {
        self.ch.get_as(&current_setpoint())
    }

    /// Set the current setpoint.
    pub fn set_current_setpoint(&mut self, amps: f64) -> ScpiResult<()> {
        self.ch.set(&current_setpoint(), amps)
    }

    /// Narrow the accepted current setpoints of this output.
    pub fn set_current_bounds(&mut self, lo: f64, hi: f64) -> ScpiResult<()> {
        self.ch.set_bounds(&current_setpoint(), Allowed::range(lo, hi))
    }

    /// Measured voltage.
    pub fn voltage(&mut self) -> ScpiResult<f64> {
        self.ch.get_as(&voltage())
    }

    /// Measured current.
    pub fn current(&mut self) -> ScpiResult<f64> {
        self.ch.get_as(&current())
    }

    /// Output state.
    pub fn output_enabled(&mut self) -> ScpiResult<bool> {
        self.ch.get_as(&output_enabled())
    }

    /// Switch the output on or off.
    pub fn set_output_enabled(&mut self, enabled: bool) -> ScpiResult<()> {
        self.ch.set(&output_enabled(), enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockAdapter;
    use crate::error::ScpiError;

    #[test]
    fn commands_carry_the_channel_prefix() {
        let mock = MockAdapter::new([
            (Some("APPL CH3; VOLT 3.3"), None),
            (Some("APPL CH3; CURR?"), Some("0.1")),
            (Some("APPL CH3; CHAN:OUTP 1"), None),
            (Some("APPL CH3; MEAS:CURR?"), Some("0.0421")),
        ]);
        let handle = mock.handle();
        let mut psu = ItechIt6322a::new(mock.boxed());
        let mut ch = psu.channel("3").unwrap();
        ch.set_voltage_setpoint(3.3).unwrap();
        assert_eq!(ch.current_setpoint().unwrap(), 0.1);
        ch.set_output_enabled(true).unwrap();
        assert_eq!(ch.current().unwrap(), 0.0421);
        handle.assert_finished();
    }

    #[test]
    fn current_limit_is_one_amp() {
        let mock = MockAdapter::new(Vec::<(Option<&str>, Option<&str>)>::new());
        let mut psu = ItechIt6322a::new(mock.boxed());
        assert!(matches!(
            psu.channel("1").unwrap().set_current_setpoint(1.5),
            Err(ScpiError::Validation(_))
        ));
    }

    #[test]
    fn instrument_level_commands() {
        let mock = MockAdapter::new([
            (Some("SYST:REM"), None),
            (Some("INST:NSEL?"), Some("2")),
            (Some("SYST:BEEP"), None),
        ]);
        let handle = mock.handle();
        let mut psu = ItechIt6322a::new(mock.boxed());
        psu.set_remote_control_enabled(true).unwrap();
        assert_eq!(psu.channel_select().unwrap(), 2);
        psu.beep().unwrap();
        handle.assert_finished();
    }
}

//! eTM L303SP programmable power supply.
//!
//! Serial only, 9600 baud, 8 data bits, no parity, two stop bits. The
//! setpoints apply to the selected output; the per-channel measurements
//! select the output with `APPL CH<n>` in the same command.

use super::channel::Channel;
use super::registry::{require_channel, DriverKind, DriverSchema};
use super::scpi::{idn, Driver, Scpi};
use super::Instrument;
use crate::adapters::{open_resource, Adapter, ConnectionSettings, StopBits};
use crate::error::ScpiResult;
use crate::property::{Allowed, Property, ValueMap};
use std::time::Duration;

/// Name used in logs.
pub const DEFAULT_NAME: &str = "L303SP";

/// Output channel ids.
pub const CHANNELS: &[&str] = &["1", "2", "3"];

/// 9600 8N2, 5 s timeout, `\n` both ways.
pub fn connection() -> ConnectionSettings {
    ConnectionSettings::default()
        .with_baud_rate(9600)
        .with_stop_bits(StopBits::Two)
        .with_timeout(Duration::from_millis(5000))
        .with_termination("\n")
}

fn remote_control_enabled() -> Property {
    Property::setting("remote_control_enabled", "SYST:%s")
        .value_map(ValueMap::bools("REM", "LOC"))
        .strict_keys()
}

fn output_enabled() -> Property {
    Property::control("output_enabled", "OUTP:STAT?", "OUTP:STAT %s")
        .value_map(ValueMap::bools("ON", "OFF"))
}

fn voltage_setpoint() -> Property {
    Property::control("voltage_setpoint", "VOLT?", "VOLT %g")
        .strict_range(0.0, 30.0)
        .dynamic()
}

fn current_setpoint() -> Property {
    Property::control("current_setpoint", "CURR?", "CURR %g")
        .strict_range(0.0, 3.0)
        .dynamic()
}

fn voltage() -> Property {
    Property::measurement("voltage", "APPL CH{ch}; MEAS:VOLT?")
}

fn current() -> Property {
    Property::measurement("current", "APPL CH{ch}; MEAS:CURR?")
}

/// Declared properties.
pub fn schema() -> DriverSchema {
    DriverSchema {
        kind: DriverKind::EtmL303sp,
        channels: CHANNELS,
        properties: vec![
            idn(),
            remote_control_enabled(),
            output_enabled(),
            voltage_setpoint(),
            current_setpoint(),
        ],
        channel_properties: vec![voltage(), current()],
    }
}

/// eTM L303SP driver.
#[derive(Debug)]
pub struct EtmL303sp {
    inst: Instrument,
}

impl EtmL303sp {
    /// Wrap an opened adapter.
    pub fn new(adapter: Box<dyn Adapter>) -> Self {
        Self::from_instrument(Instrument::new(DEFAULT_NAME, adapter))
    }

    /// Open `resource` with the default connection settings.
    pub fn connect(resource: &str) -> ScpiResult<Self> {
        Ok(Self::new(open_resource(resource, &connection())?))
    }

    /// Wrap an existing instrument.
    pub fn from_instrument(inst: Instrument) -> Self {
        Self { inst }
    }

    /// Sound the beeper.
    pub fn beep(&mut self) -> ScpiResult<()> {
        self.inst.write("SYST:BEEP")
    }

    /// Switch between remote and local (front panel) control.
    pub fn set_remote_control_enabled(&mut self, enabled: bool) -> ScpiResult<()> {
        self.inst.set(&remote_control_enabled(), enabled)
    }

    /// Output state.
    pub fn output_enabled(&mut self) -> ScpiResult<bool> {
        self.inst.get_as(&output_enabled())
    }

    /// Switch the output on or off.
    pub fn set_output_enabled(&mut self, enabled: bool) -> ScpiResult<()> {
        self.inst.set(&output_enabled(), enabled)
    }

    /// Voltage setpoint in volts.
    pub fn voltage_setpoint(&mut self) -> ScpiResult<f64> {
        self.inst.get_as(&voltage_setpoint())
    }

    /// Set the voltage setpoint, 0 to 30 V unless narrowed.
    pub fn set_voltage_setpoint(&mut self, volts: f64) -> ScpiResult<()> {
        self.inst.set(&voltage_setpoint(), volts)
    }

    /// Narrow the accepted voltage setpoints for this instrument.
    pub fn set_voltage_bounds(&mut self, lo: f64, hi: f64) -> ScpiResult<()> {
        self.inst.set_bounds(&voltage_setpoint(), Allowed::range(lo, hi))
    }

    /// Current setpoint in amperes.
    pub fn current_setpoint(&mut self) -> ScpiResult<f64> {
        self.inst.get_as(&current_setpoint())
    }

    /// Set the current setpoint, 0 to 3 A unless narrowed.
    pub fn set_current_setpoint(&mut self, amps: f64) -> ScpiResult<()> {
        self.inst.set(&current_setpoint(), amps)
    }

    /// Narrow the accepted current setpoints for this instrument.
    pub fn set_current_bounds(&mut self, lo: f64, hi: f64) -> ScpiResult<()> {
        self.inst.set_bounds(&current_setpoint(), Allowed::range(lo, hi))
    }

    /// Output channel `id` ("1" to "3").
    pub fn channel(&mut self, id: &str) -> ScpiResult<L303spChannel<'_>> {
        require_channel(CHANNELS, id)?;
        Ok(L303spChannel {
            ch: self.inst.channel(id),
        })
    }
}

impl Driver for EtmL303sp {
    fn instrument(&mut self) -> &mut Instrument {
        &mut self.inst
    }
}

impl Scpi for EtmL303sp {}

/// One L303SP output.
#[derive(Debug)]
pub struct L303spChannel<'a> {
    ch: Channel<'a>,
}

impl L303spChannel<'_> {
    /// Measured output voltage.
    pub fn voltage(&mut self) -> ScpiResult<f64> {
        self.ch.get_as(&voltage())
    }

    /// Measured output current.
    pub fn current(&mut self) -> ScpiResult<f64> {
        self.ch.get_as(&current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockAdapter;
    use crate::error::ScpiError;

    #[test]
    fn setpoints_and_output() {
        let mock = MockAdapter::new([
            (Some("SYST:REM"), None),
            (Some("VOLT 12.5"), None),
            (Some("CURR?"), Some("0.500")),
            (Some("OUTP:STAT ON"), None),
            (Some("OUTP:STAT?"), Some("ON")),
            (Some("SYST:BEEP"), None),
        ]);
        let handle = mock.handle();
        let mut psu = EtmL303sp::new(mock.boxed());
        psu.set_remote_control_enabled(true).unwrap();
        psu.set_voltage_setpoint(12.5).unwrap();
        assert_eq!(psu.current_setpoint().unwrap(), 0.5);
        psu.set_output_enabled(true).unwrap();
        assert!(psu.output_enabled().unwrap());
        psu.beep().unwrap();
        handle.assert_finished();
    }

    #[test]
    fn measurement_selects_the_channel() {
        let mock = MockAdapter::new([(Some("APPL CH2; MEAS:VOLT?"), Some("4.999"))]);
        let mut psu = EtmL303sp::new(mock.boxed());
        assert_eq!(psu.channel("2").unwrap().voltage().unwrap(), 4.999);
        assert!(matches!(psu.channel("4"), Err(ScpiError::UnknownChannel(_))));
    }

    #[test]
    fn narrowed_setpoint_rejects_before_sending() {
        let mock = MockAdapter::new(Vec::<(Option<&str>, Option<&str>)>::new());
        let handle = mock.handle();
        let mut psu = EtmL303sp::new(mock.boxed());
        psu.set_current_bounds(0.0, 1.0).unwrap();
        assert!(matches!(psu.set_current_setpoint(2.0), Err(ScpiError::Validation(_))));
        assert!(handle.written().is_empty());
    }

    #[test]
    fn serial_framing() {
        let settings = connection();
        assert_eq!(settings.stop_bits, StopBits::Two);
        assert_eq!(settings.timeout, Duration::from_secs(5));
    }
}

//! Rigol DP900 series triple output power supply.
//!
//! Every output carries its own setpoints and protection circuits, addressed
//! with `SOUR<n>` or a trailing `CH<n>` argument.

use super::channel::Channel;
use super::registry::{require_channel, DriverKind, DriverSchema};
use super::scpi::{idn, Driver, Scpi};
use super::Instrument;
use crate::adapters::{open_resource, Adapter, ConnectionSettings};
use crate::error::ScpiResult;
use crate::property::{Allowed, Cast, Property, ValueMap};

/// Name used in logs.
pub const DEFAULT_NAME: &str = "Rigol DP900";

/// Output channel ids.
pub const CHANNELS: &[&str] = &["1", "2", "3"];

fn remote_control_enabled() -> Property {
    Property::setting("remote_control_enabled", "SYST:%s")
        .value_map(ValueMap::bools("REM", "LOC"))
        .strict_keys()
}

fn channel_select() -> Property {
    Property::control("channel_select", "INST:NSEL?", "INST:NSEL %d")
        .cast(Cast::Int)
}

fn voltage_setpoint() -> Property {
    Property::control("voltage_setpoint", "SOUR{ch}:VOLT?", "SOUR{ch}:VOLT %g")
        .strict_range(0.0, 30.0)
        .dynamic()
}

fn current_setpoint() -> Property {
    Property::control("current_setpoint", "SOUR{ch}:CURR?", "SOUR{ch}:CURR %g")
        .strict_range(0.0, 3.0)
        .dynamic()
}

fn output_enabled() -> Property {
    Property::control("output_enabled", "OUTP:STAT? CH{ch}", "OUTP:STAT CH{ch}, %d")
        .value_map(ValueMap::bools(1i64, 0i64))
}

fn voltage() -> Property {
    Property::measurement("voltage", "MEAS:VOLT? CH{ch}")
}

fn current() -> Property {
    Property::measurement("current", "MEAS:CURR? CH{ch}")
}

fn power() -> Property {
    Property::measurement("power", "MEAS:POW? CH{ch}")
}

fn ovp_setpoint() -> Property {
    Property::control("ovp_setpoint", "SOUR{ch}:VOLT:PROT?", "SOUR{ch}:VOLT:PROT %g")
        .strict_range(0.0, 30.0)
}

fn ocp_setpoint() -> Property {
    Property::control("ocp_setpoint", "SOUR{ch}:CURR:PROT?", "SOUR{ch}:CURR:PROT %g")
        .strict_range(0.0, 3.0)
}

fn ovp_enabled() -> Property {
    Property::control(
        "ovp_enabled",
        "SOUR{ch}:VOLT:PROT:STAT?",
        "SOUR{ch}:VOLT:PROT:STAT %d",
    )
    .value_map(ValueMap::bools(1i64, 0i64))
}

fn ocp_enabled() -> Property {
    Property::control(
        "ocp_enabled",
        "SOUR{ch}:CURR:PROT:STAT?",
        "SOUR{ch}:CURR:PROT:STAT %d",
    )
    .value_map(ValueMap::bools(1i64, 0i64))
}

fn ovp_tripped() -> Property {
    Property::measurement("ovp_tripped", "SOUR{ch}:VOLT:PROT:TRIP?")
        .value_map(ValueMap::bools(1i64, 0i64))
}

fn ocp_tripped() -> Property {
    Property::measurement("ocp_tripped", "SOUR{ch}:CURR:PROT:TRIP?")
        .value_map(ValueMap::bools(1i64, 0i64))
}

/// Declared properties.
pub fn schema() -> DriverSchema {
    DriverSchema {
        kind: DriverKind::RigolDp900,
        channels: CHANNELS,
        properties: vec![idn(), remote_control_enabled(), channel_select()],
        channel_properties: vec![
            voltage_setpoint(),
            current_setpoint(),
            output_enabled(),
            voltage(),
            current(),
            power(),
            ovp_setpoint(),
            ocp_setpoint(),
            ovp_enabled(),
            ocp_enabled(),
            ovp_tripped(),
            ocp_tripped(),
        ],
    }
}

/// Rigol DP900 driver.
#[derive(Debug)]
pub struct RigolDp900 {
    inst: Instrument,
}

impl RigolDp900 {
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
        self.inst.write("SYST:BEEP:IMM")
    }

    /// Switch between remote and local control.
    pub fn set_remote_control_enabled(&mut self, enabled: bool) -> ScpiResult<()> {
        self.inst.set(&remote_control_enabled(), enabled)
    }

    /// Output currently selected on the front panel.
    pub fn channel_select(&mut self) -> ScpiResult<i64> {
        self.inst.get_as(&channel_select())
    }

    /// Select an output on the front panel.
    pub fn set_channel_select(&mut self, channel: i64) -> ScpiResult<()> {
        self.inst.set(&channel_select(), channel)
    }

    /// Output channel `id` ("1" to "3").
    pub fn channel(&mut self, id: &str) -> ScpiResult<Dp900Channel<'_>> {
        require_channel(CHANNELS, id)?;
        Ok(Dp900Channel {
            ch: self.inst.channel(id),
        })
    }
}

impl Driver for RigolDp900 {
    fn instrument(&mut self) -> &mut Instrument {
        &mut self.inst
    }
}

impl Scpi for RigolDp900 {}

/// One DP900 output.
#[derive(Debug)]
pub struct Dp900Channel<'a> {
    ch: Channel<'a>,
}

impl Dp900Channel<'_> {
    /// Voltage setpoint in volts.
    pub fn voltage_setpoint(&mut self) -> ScpiResult<f64> {
        self.ch.get_as(&voltage_setpoint())
    }

    /// Set the voltage setpoint, 0 to 30 V unless narrowed.
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

    /// Set the current setpoint, 0 to 3 A unless narrowed.
    pub fn set_current_setpoint(&mut self, amps: f64) -> ScpiResult<()> {
        self.ch.set(&current_setpoint(), amps)
    }

    /// Narrow the accepted current setpoints of this output.
    pub fn set_current_bounds(&mut self, lo: f64, hi: f64) -> ScpiResult<()> {
        self.ch.set_bounds(&current_setpoint(), Allowed::range(lo, hi))
    }

    /// Output state.
    pub fn output_enabled(&mut self) -> ScpiResult<bool> {
        self.ch.get_as(&output_enabled())
    }

    /// Switch the output on or off.
    pub fn set_output_enabled(&mut self, enabled: bool) -> ScpiResult<()> {
        self.ch.set(&output_enabled(), enabled)
    }

    /// Measured voltage.
    pub fn voltage(&mut self) -> ScpiResult<f64> {
        self.ch.get_as(&voltage())
    }

    /// Measured current.
    pub fn current(&mut self) -> ScpiResult<f64> {
        self.ch.get_as(&current())
    }

    /// Measured power.
    pub fn power(&mut self) -> ScpiResult<f64> {
        self.ch.get_as(&power())
    }

    /// Over-voltage protection threshold.
    pub fn ovp_setpoint(&mut self) -> ScpiResult<f64> {
        self.ch.get_as(&ovp_setpoint())
    }

    /// Set the over-voltage protection threshold.
    pub fn set_ovp_setpoint(&mut self, volts: f64) -> ScpiResult<()> {
        self.ch.set(&ovp_setpoint(), volts)
    }

    /// Over-current protection threshold.
    pub fn ocp_setpoint(&mut self) -> ScpiResult<f64> {
        self.ch.get_as(&ocp_setpoint())
    }

    /// Set the over-current protection threshold.
    pub fn set_ocp_setpoint(&mut self, amps: f64) -> ScpiResult<()> {
        self.ch.set(&ocp_setpoint(), amps)
    }

    /// Over-voltage protection state.
    pub fn ovp_enabled(&mut self) -> ScpiResult<bool> {
        self.ch.get_as(&ovp_enabled())
    }

    /// Enable or disable over-voltage protection.
    pub fn set_ovp_enabled(&mut self, enabled: bool) -> ScpiResult<()> {
        self.ch.set(&ovp_enabled(), enabled)
    }

    /// Over-current protection state.
    pub fn ocp_enabled(&mut self) -> ScpiResult<bool> {
        self.ch.get_as(&ocp_enabled())
    }

    /// Enable or disable over-current protection.
    pub fn set_ocp_enabled(&mut self, enabled: bool) -> ScpiResult<()> {
        self.ch.set(&ocp_enabled(), enabled)
    }

    /// True after the over-voltage protection fired.
    pub fn ovp_tripped(&mut self) -> ScpiResult<bool> {
        self.ch.get_as(&ovp_tripped())
    }

    /// True after the over-current protection fired.
    pub fn ocp_tripped(&mut self) -> ScpiResult<bool> {
        self.ch.get_as(&ocp_tripped())
    }

    /// Clear a tripped over-voltage protection.
    pub fn ovp_clear(&mut self) -> ScpiResult<()> {
        self.ch.write("SOUR{ch}:VOLT:PROT:CLE")
    }

    /// Clear a tripped over-current protection.
    pub fn ocp_clear(&mut self) -> ScpiResult<()> {
        self.ch.write("SOUR{ch}:CURR:PROT:CLE")
    }
}

//! Rigol DS1054Z oscilloscope, vertical controls of channels 1 and 2.

use super::channel::Channel;
use super::registry::{require_channel, DriverKind, DriverSchema};
use super::scpi::{idn, Driver, Scpi};
use super::Instrument;
use crate::adapters::{open_resource, Adapter, ConnectionSettings};
use crate::error::{ScpiError, ScpiResult};
use crate::property::{Property, PropertyValue, ValueMap};

/// Name used in logs.
pub const DEFAULT_NAME: &str = "Rigol DS1054Z";

/// Channel ids with vertical controls.
pub const CHANNELS: &[&str] = &["1", "2"];

/// Replies echo the header: `C1:VDIV 2.00E-01V`, `C1:CPL D1M`.
fn reply_argument(raw: &str) -> &str {
    let raw = raw.trim();
    raw.split_once(' ').map_or(raw, |(_, arg)| arg)
}

fn parse_vertical_division(raw: &str) -> ScpiResult<PropertyValue> {
    let arg = reply_argument(raw);
    let mut chars = arg.chars();
    chars.next_back();
    chars
        .as_str()
        .parse::<f64>()
        .map(PropertyValue::Float)
        .map_err(|_| ScpiError::Parse(format!("unexpected VDIV reply '{}'", raw.trim())))
}

fn parse_coupling(raw: &str) -> ScpiResult<PropertyValue> {
    reply_argument(raw)
        .chars()
        .next()
        .map(|c| PropertyValue::Str(c.to_string()))
        .ok_or_else(|| ScpiError::Parse(format!("unexpected CPL reply '{}'", raw.trim())))
}

fn vertical_division() -> Property {
    Property::control("vertical_division", "C{ch}:VDIV?", "C{ch}:VDIV %.2eV")
        .truncated_range(2e-3, 10.0)
        .get_process(parse_vertical_division)
}

fn coupling() -> Property {
    Property::control("coupling", "C{ch}:CPL?", "C{ch}:CPL %s1M")
        .value_map(ValueMap::new([("DC", "D"), ("AC", "A")]))
        .truncated_keys()
        .get_process(parse_coupling)
}

/// Declared properties.
pub fn schema() -> DriverSchema {
    DriverSchema {
        kind: DriverKind::RigolDs1054z,
        channels: CHANNELS,
        properties: vec![idn()],
        channel_properties: vec![vertical_division(), coupling()],
    }
}

/// Rigol DS1054Z driver.
#[derive(Debug)]
pub struct RigolDs1054z {
    inst: Instrument,
}

impl RigolDs1054z {
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

    /// Input channel `id` ("1" or "2").
    pub fn channel(&mut self, id: &str) -> ScpiResult<Ds1054zChannel<'_>> {
        require_channel(CHANNELS, id)?;
        Ok(Ds1054zChannel {
            ch: self.inst.channel(id),
        })
    }
}

impl Driver for RigolDs1054z {
    fn instrument(&mut self) -> &mut Instrument {
        &mut self.inst
    }
}

impl Scpi for RigolDs1054z {}

/// One DS1054Z input channel.
#[derive(Debug)]
pub struct Ds1054zChannel<'a> {
    ch: Channel<'a>,
}

impl Ds1054zChannel<'_> {
    /// Vertical sensitivity in V/div.
    pub fn vertical_division(&mut self) -> ScpiResult<f64> {
        self.ch.get_as(&vertical_division())
    }

    /// Set the vertical sensitivity, clamped to 2 mV to 10 V per division.
    pub fn set_vertical_division(&mut self, volts: f64) -> ScpiResult<()> {
        self.ch.set(&vertical_division(), volts)
    }

    /// Coupling, `"DC"` or `"AC"`.
    pub fn coupling(&mut self) -> ScpiResult<String> {
        self.ch.get_as(&coupling())
    }

    /// Set the coupling.
    pub fn set_coupling(&mut self, mode: &str) -> ScpiResult<()> {
        self.ch.set(&coupling(), mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockAdapter;

    #[test]
    fn vertical_division_reply_strips_header_and_unit() {
        assert_eq!(
            parse_vertical_division("C1:VDIV 2.00E-01V").unwrap(),
            PropertyValue::Float(0.2)
        );
        assert!(parse_vertical_division("C1:VDIV V").is_err());
    }

    #[test]
    fn vertical_division_is_clamped() {
        let mock = MockAdapter::new([
            (Some("C1:VDIV 1.00e+01V"), None::<&str>),
            (Some("C1:VDIV 2.00e-03V"), None),
            (Some("C1:VDIV 5.00e-01V"), None),
        ]);
        let handle = mock.handle();
        let mut scope = RigolDs1054z::new(mock.boxed());
        let mut ch = scope.channel("1").unwrap();
        ch.set_vertical_division(20.0).unwrap();
        ch.set_vertical_division(0.0001).unwrap();
        ch.set_vertical_division(0.5).unwrap();
        handle.assert_finished();
    }

    #[test]
    fn coupling_round_trip() {
        let mock = MockAdapter::new([
            (Some("C2:CPL A1M"), None),
            (Some("C2:CPL?"), Some("C2:CPL A1M")),
        ]);
        let handle = mock.handle();
        let mut scope = RigolDs1054z::new(mock.boxed());
        let mut ch = scope.channel("2").unwrap();
        ch.set_coupling("AC").unwrap();
        assert_eq!(ch.coupling().unwrap(), "AC");
        assert!(ch.set_coupling("GND").is_err());
        handle.assert_finished();
    }

    #[test]
    fn only_two_channels() {
        let mock = MockAdapter::new(Vec::<(Option<&str>, Option<&str>)>::new());
        let mut scope = RigolDs1054z::new(mock.boxed());
        assert!(matches!(scope.channel("3"), Err(ScpiError::UnknownChannel(_))));
    }
}

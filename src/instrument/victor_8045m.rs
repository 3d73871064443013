//! Victor 8045M dual display bench multimeter (USB serial, 115200 8N1).

use super::registry::{DriverKind, DriverSchema};
use super::scpi::{idn, Driver, Scpi};
use super::Instrument;
use crate::adapters::{open_resource, Adapter, ConnectionSettings, StopBits};
use crate::error::{ScpiError, ScpiResult};
use crate::property::{Property, PropertyValue, ValueMap};

/// Name used in logs.
pub const DEFAULT_NAME: &str = "Victor 8045M";

/// Logical function names and their `CONF:` mnemonics.
pub const FUNCTIONS: [(&str, &str); 11] = [
    ("DCV", "VOLT:DC"),
    ("ACV", "VOLT:AC"),
    ("DCI", "CURR:DC"),
    ("ACI", "CURR:AC"),
    ("R2W", "RES"),
    ("FREQ", "FREQ"),
    ("PERIOD", "PER"),
    ("CONTINUITY", "CONT"),
    ("DIODE", "DIOD"),
    ("CAP", "CAP"),
    ("TEMP", "TEMP:RTD"),
];

/// DC voltage ranges in volts and their `RANGE` codes.
pub const DCV_RANGES: [(f64, i64); 6] = [
    (0.05, 1),
    (0.5, 2),
    (5.0, 3),
    (50.0, 4),
    (500.0, 5),
    (1000.0, 6),
];

/// 115200 8N1.
pub fn connection() -> ConnectionSettings {
    ConnectionSettings::default()
        .with_baud_rate(115_200)
        .with_stop_bits(StopBits::One)
}

// `RANGE?` answers either with the range in volts ("5V") or with the bare
// code. Volts are turned back into the code so the map decodes both.
fn range_reply_to_code(raw: &str) -> ScpiResult<PropertyValue> {
    let in_volts = raw.contains('V');
    let text = raw.replace('V', "");
    let number: f64 = text
        .trim()
        .parse()
        .map_err(|_| ScpiError::Parse(format!("unexpected range reply '{}'", raw.trim())))?;
    if !in_volts {
        return Ok(PropertyValue::Float(number));
    }
    DCV_RANGES
        .iter()
        .find(|(volts, _)| *volts == number)
        .map(|(_, code)| PropertyValue::Int(*code))
        .ok_or_else(|| ScpiError::Lookup(format!("no DCV range of {} V", number)))
}

fn function() -> Property {
    Property::setting("function", "CONF:%s")
        .value_map(ValueMap::new(FUNCTIONS))
        .strict_keys()
}

fn reading() -> Property {
    Property::measurement("reading", "MEAS?")
}

fn reading_primary() -> Property {
    Property::measurement("reading_primary", "MEAS1?")
}

fn reading_secondary() -> Property {
    Property::measurement("reading_secondary", "MEAS2?")
}

fn rate() -> Property {
    Property::control("rate", "RATE?", "RATE %s").strict_set(["F", "M", "S"])
}

fn dcv_range() -> Property {
    Property::control("dcv_range", "RANGE?", "RANGE %s")
        .value_map(ValueMap::new(DCV_RANGES))
        .strict_keys()
        .get_process(range_reply_to_code)
}

/// Declared properties.
pub fn schema() -> DriverSchema {
    DriverSchema {
        kind: DriverKind::Victor8045m,
        channels: &[],
        properties: vec![
            idn(),
            function(),
            reading(),
            reading_primary(),
            reading_secondary(),
            rate(),
            dcv_range(),
        ],
        channel_properties: Vec::new(),
    }
}

/// Victor 8045M driver.
#[derive(Debug)]
pub struct Victor8045m {
    inst: Instrument,
}

impl Victor8045m {
    /// Wrap an opened adapter.
    pub fn new(adapter: Box<dyn Adapter>) -> Self {
        Self::from_instrument(Instrument::new(DEFAULT_NAME, adapter))
    }

    /// Open `resource` at 115200 baud.
    pub fn connect(resource: &str) -> ScpiResult<Self> {
        Ok(Self::new(open_resource(resource, &connection())?))
    }

    /// Wrap an existing instrument.
    pub fn from_instrument(inst: Instrument) -> Self {
        Self { inst }
    }

    /// Configure the measurement function (`"DCV"`, `"R2W"`, `"TEMP"`, ...).
    pub fn set_function(&mut self, name: &str) -> ScpiResult<()> {
        self.inst.set(&function(), name)
    }

    /// Primary value, followed by the secondary value in dual display mode.
    pub fn reading(&mut self) -> ScpiResult<Vec<f64>> {
        self.inst.get_as(&reading())
    }

    /// Primary display value.
    pub fn reading_primary(&mut self) -> ScpiResult<f64> {
        self.inst.get_as(&reading_primary())
    }

    /// Secondary display value.
    pub fn reading_secondary(&mut self) -> ScpiResult<f64> {
        self.inst.get_as(&reading_secondary())
    }

    /// Measurement rate: `F`ast, `M`edium or `S`low.
    pub fn rate(&mut self) -> ScpiResult<String> {
        self.inst.get_as(&rate())
    }

    /// Set the measurement rate.
    pub fn set_rate(&mut self, rate_code: &str) -> ScpiResult<()> {
        self.inst.set(&rate(), rate_code)
    }

    /// DC voltage range in volts.
    pub fn dcv_range(&mut self) -> ScpiResult<f64> {
        self.inst.get_as(&dcv_range())
    }

    /// Select a DC voltage range, one of [`DCV_RANGES`].
    pub fn set_dcv_range(&mut self, volts: f64) -> ScpiResult<()> {
        self.inst.set(&dcv_range(), volts)
    }
}

impl Driver for Victor8045m {
    fn instrument(&mut self) -> &mut Instrument {
        &mut self.inst
    }
}

impl Scpi for Victor8045m {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockAdapter;

    #[test]
    fn function_is_write_only() {
        let mock = MockAdapter::new([(Some("CONF:TEMP:RTD"), None::<&str>)]);
        let handle = mock.handle();
        let mut dmm = Victor8045m::new(mock.boxed());
        dmm.set_function("TEMP").unwrap();
        assert!(matches!(
            dmm.instrument().get(&function()),
            Err(ScpiError::AccessDenied { .. })
        ));
        handle.assert_finished();
    }

    #[test]
    fn dual_display_reading_is_a_list() {
        let mock = MockAdapter::new([
            (Some("MEAS?"), Some("1.2345,50.01")),
            (Some("MEAS?"), Some("1.2345")),
            (Some("MEAS2?"), Some("50.01")),
        ]);
        let mut dmm = Victor8045m::new(mock.boxed());
        assert_eq!(dmm.reading().unwrap(), vec![1.2345, 50.01]);
        assert_eq!(dmm.reading().unwrap(), vec![1.2345]);
        assert_eq!(dmm.reading_secondary().unwrap(), 50.01);
    }

    #[test]
    fn dcv_range_round_trip() {
        let mock = MockAdapter::new([
            (Some("RANGE 3"), None),
            (Some("RANGE?"), Some("5V")),
            (Some("RANGE?"), Some("6")),
        ]);
        let handle = mock.handle();
        let mut dmm = Victor8045m::new(mock.boxed());
        dmm.set_dcv_range(5.0).unwrap();
        assert_eq!(dmm.dcv_range().unwrap(), 5.0);
        assert_eq!(dmm.dcv_range().unwrap(), 1000.0);
        assert!(matches!(dmm.set_dcv_range(10.0), Err(ScpiError::Validation(_))));
        handle.assert_finished();
    }

    #[test]
    fn rate_is_restricted() {
        let mock = MockAdapter::new([(Some("RATE M"), None), (Some("RATE?"), Some("M"))]);
        let mut dmm = Victor8045m::new(mock.boxed());
        dmm.set_rate("M").unwrap();
        assert_eq!(dmm.rate().unwrap(), "M");
        assert!(dmm.set_rate("X").is_err());
    }

    #[test]
    fn framing_is_one_stop_bit() {
        assert_eq!(connection().baud_rate, 115_200);
        assert_eq!(connection().stop_bits, StopBits::One);
    }
}

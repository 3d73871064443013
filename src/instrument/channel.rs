//! Channel scope: the same descriptors, with `{ch}` bound to one id.

use super::Instrument;
use crate::error::{ScpiError, ScpiResult};
use crate::property::{format, Allowed, Property, PropertyValue};

/// A borrowed view of an [`Instrument`] scoped to one channel id.
///
/// Every `{ch}` in the command templates is replaced by the id. Bound
/// overrides set through a channel apply to that channel only.
#[derive(Debug)]
pub struct Channel<'a> {
    instrument: &'a mut Instrument,
    id: String,
}

impl<'a> Channel<'a> {
    pub(crate) fn new(instrument: &'a mut Instrument, id: String) -> Self {
        Self { instrument, id }
    }

    /// Channel id substituted into `{ch}`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The parent instrument.
    pub fn instrument(&mut self) -> &mut Instrument {
        self.instrument
    }

    /// Read a channel property.
    pub fn get(&mut self, property: &Property) -> ScpiResult<PropertyValue> {
        self.instrument.get_in(Some(&self.id), property)
    }

    /// Read a channel property and convert it to `T`.
    pub fn get_as<T>(&mut self, property: &Property) -> ScpiResult<T>
    where
        T: TryFrom<PropertyValue, Error = ScpiError>,
    {
        T::try_from(self.get(property)?)
    }

    /// Write a channel property.
    pub fn set(&mut self, property: &Property, value: impl Into<PropertyValue>) -> ScpiResult<()> {
        self.instrument.set_in(Some(&self.id), property, value.into())
    }

    /// Override the allowed values of a dynamic property on this channel.
    pub fn set_bounds(&mut self, property: &Property, allowed: Allowed) -> ScpiResult<()> {
        self.instrument.set_bounds_in(Some(&self.id), property, allowed)
    }

    /// Drop an override set with [`Channel::set_bounds`].
    pub fn reset_bounds(&mut self, property: &Property) {
        self.instrument.reset_bounds_in(Some(&self.id), property);
    }

    /// Allowed values currently in force on this channel.
    pub fn bounds(&self, property: &Property) -> Option<Allowed> {
        self.instrument.bounds_in(Some(&self.id), property)
    }

    /// Send `template` with `{ch}` substituted.
    pub fn write(&mut self, template: &str) -> ScpiResult<()> {
        let command = format::substitute_channel(template, Some(&self.id))?;
        self.instrument.write(&command)
    }

    /// Send the query `template` with `{ch}` substituted and read the reply.
    pub fn ask(&mut self, template: &str) -> ScpiResult<String> {
        let command = format::substitute_channel(template, Some(&self.id))?;
        self.instrument.ask(&command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockAdapter;

    fn voltage() -> Property {
        Property::control("voltage_setpoint", "SOUR{ch}:VOLT?", "SOUR{ch}:VOLT %g")
            .strict_range(0.0, 30.0)
            .dynamic()
    }

    #[test]
    fn channel_id_reaches_every_placeholder() {
        let mock = MockAdapter::new([
            (Some("SOUR2:VOLT 5"), None),
            (Some("SOUR2:VOLT?"), Some("5.000")),
            (Some("SOUR2:VOLT:PROT:CLE"), None),
        ]);
        let handle = mock.handle();
        let mut inst = Instrument::new("psu", mock.boxed());
        let mut ch = inst.channel("2");
        ch.set(&voltage(), 5i64).unwrap();
        assert_eq!(ch.get_as::<f64>(&voltage()).unwrap(), 5.0);
        ch.write("SOUR{ch}:VOLT:PROT:CLE").unwrap();
        handle.assert_finished();
    }

    #[test]
    fn channel_bounds_do_not_leak_to_siblings() {
        let mock = MockAdapter::new([(Some("SOUR1:VOLT 20"), None::<&str>)]);
        let mut inst = Instrument::new("psu", mock.boxed());
        inst.channel("3")
            .set_bounds(&voltage(), Allowed::range(0.0, 6.0))
            .unwrap();
        assert!(inst.channel("3").set(&voltage(), 20i64).is_err());
        inst.channel("1").set(&voltage(), 20i64).unwrap();
        assert_eq!(
            inst.channel("3").bounds(&voltage()),
            Some(Allowed::range(0.0, 6.0))
        );
    }
}

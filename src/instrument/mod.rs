//! Instrument root object, channel scopes and the per-device drivers.
//!
//! An [`Instrument`] owns the transport and runs [`Property`] descriptors
//! against it. Drivers wrap an `Instrument` and expose typed accessors; the
//! [`registry`] lists them for configuration and the CLI.

use crate::adapters::Adapter;
use crate::error::{ScpiError, ScpiResult};
use crate::property::{Allowed, Property, PropertyValue};
use std::collections::HashMap;
use tracing::{debug, warn};

pub mod binary_block;
pub mod channel;
pub mod error_check;
pub mod registry;
pub mod scpi;

pub mod etm_l303sp;
pub mod fluke_8808a;
pub mod itech_it6322a;
pub mod rigol_dg1022u;
pub mod rigol_dho800;
pub mod rigol_dm3068;
pub mod rigol_dp900;
pub mod rigol_ds1054z;
pub mod victor_8045m;

pub use channel::Channel;
pub use error_check::{ErrorCheck, NoErrorCheck, PromptLine, ScpiErrorQueue};
pub use registry::{DriverKind, DriverSchema};
pub use scpi::{Driver, Scpi};

type BoundsKey = (Option<String>, &'static str);

/// Root object owning the transport of one physical instrument.
///
/// All access goes through `&mut self`, so one instrument is driven by one
/// caller at a time. The adapter is closed on [`Instrument::close`] or drop.
pub struct Instrument {
    name: String,
    adapter: Box<dyn Adapter>,
    error_check: Box<dyn ErrorCheck>,
    bounds: HashMap<BoundsKey, Allowed>,
    closed: bool,
}

impl std::fmt::Debug for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instrument")
            .field("name", &self.name)
            .field("bounds", &self.bounds)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Instrument {
    /// Wrap an opened adapter. Errors are checked by draining `SYST:ERR?`.
    pub fn new(name: impl Into<String>, adapter: Box<dyn Adapter>) -> Self {
        Self {
            name: name.into(),
            adapter,
            error_check: Box::new(ScpiErrorQueue),
            bounds: HashMap::new(),
            closed: false,
        }
    }

    /// Replace the error-check hook.
    #[must_use]
    pub fn with_error_check(mut self, hook: impl ErrorCheck + 'static) -> Self {
        self.error_check = Box::new(hook);
        self
    }

    /// Replace the error-check hook with an already boxed one.
    #[must_use]
    pub fn with_boxed_error_check(mut self, hook: Box<dyn ErrorCheck>) -> Self {
        self.error_check = hook;
        self
    }

    /// Instrument name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Send a raw command.
    pub fn write(&mut self, command: &str) -> ScpiResult<()> {
        self.adapter.write(command)
    }

    /// Read one raw reply.
    pub fn read(&mut self) -> ScpiResult<String> {
        self.adapter.read()
    }

    /// Send a raw query and read the reply.
    pub fn ask(&mut self, command: &str) -> ScpiResult<String> {
        self.adapter.ask(command)
    }

    /// Read raw bytes, see [`Adapter::read_bytes`].
    pub fn read_bytes(
        &mut self,
        count: Option<usize>,
        break_on_termchar: bool,
    ) -> ScpiResult<Vec<u8>> {
        self.adapter.read_bytes(count, break_on_termchar)
    }

    pub(crate) fn adapter_mut(&mut self) -> &mut dyn Adapter {
        self.adapter.as_mut()
    }

    /// Read an instrument-level property.
    pub fn get(&mut self, property: &Property) -> ScpiResult<PropertyValue> {
        self.get_in(None, property)
    }

    /// Read a property and convert it to `T`.
    pub fn get_as<T>(&mut self, property: &Property) -> ScpiResult<T>
    where
        T: TryFrom<PropertyValue, Error = ScpiError>,
    {
        T::try_from(self.get(property)?)
    }

    /// Write an instrument-level property.
    pub fn set(&mut self, property: &Property, value: impl Into<PropertyValue>) -> ScpiResult<()> {
        self.set_in(None, property, value.into())
    }

    /// Override the allowed values of a dynamic instrument-level property.
    pub fn set_bounds(&mut self, property: &Property, allowed: Allowed) -> ScpiResult<()> {
        self.set_bounds_in(None, property, allowed)
    }

    /// Drop an override set with [`Instrument::set_bounds`].
    pub fn reset_bounds(&mut self, property: &Property) {
        self.bounds.remove(&(None, property.name));
    }

    /// Allowed values currently in force for an instrument-level property.
    pub fn bounds(&self, property: &Property) -> Option<Allowed> {
        self.bounds_in(None, property)
    }

    /// Scope for channel `id`.
    pub fn channel(&mut self, id: impl Into<String>) -> Channel<'_> {
        Channel::new(self, id.into())
    }

    /// Run the get error hook now.
    pub fn check_get_errors(&mut self) -> ScpiResult<()> {
        let errors = self.error_check.check_get_errors(self.adapter.as_mut())?;
        self.raise(errors)
    }

    /// Run the set error hook now.
    pub fn check_set_errors(&mut self) -> ScpiResult<()> {
        let errors = self.error_check.check_set_errors(self.adapter.as_mut())?;
        self.raise(errors)
    }

    fn raise(&self, errors: Vec<String>) -> ScpiResult<()> {
        if errors.is_empty() {
            Ok(())
        } else {
            warn!(instrument = %self.name, ?errors, "instrument reported errors");
            Err(ScpiError::Instrument(errors))
        }
    }

    /// Close the adapter. Idempotent.
    pub fn close(&mut self) -> ScpiResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!(instrument = %self.name, "closing");
        self.adapter.close()
    }

    pub(crate) fn get_in(
        &mut self,
        channel: Option<&str>,
        property: &Property,
    ) -> ScpiResult<PropertyValue> {
        let command = property.format_get(channel)?;
        let reply = self.adapter.ask(&command)?;
        if property.check_get_errors {
            self.check_get_errors()?;
        }
        let value = property.decode_reply(&reply)?;
        debug!(
            instrument = %self.name,
            property = property.name,
            channel,
            value = %value,
            "get"
        );
        Ok(value)
    }

    pub(crate) fn set_in(
        &mut self,
        channel: Option<&str>,
        property: &Property,
        value: PropertyValue,
    ) -> ScpiResult<()> {
        let bounds = self
            .bounds
            .get(&(channel.map(str::to_string), property.name));
        let command = property.prepare_set(value, bounds, channel)?;
        debug!(
            instrument = %self.name,
            property = property.name,
            channel,
            command = %command,
            "set"
        );
        self.adapter.write(&command)?;
        if property.check_set_errors {
            self.check_set_errors()?;
        }
        Ok(())
    }

    pub(crate) fn set_bounds_in(
        &mut self,
        channel: Option<&str>,
        property: &Property,
        allowed: Allowed,
    ) -> ScpiResult<()> {
        if !property.dynamic {
            return Err(ScpiError::Configuration(format!(
                "property '{}' does not accept bound overrides",
                property.name
            )));
        }
        debug!(
            instrument = %self.name,
            property = property.name,
            channel,
            allowed = %allowed,
            "bounds overridden"
        );
        self.bounds
            .insert((channel.map(str::to_string), property.name), allowed);
        Ok(())
    }

    pub(crate) fn reset_bounds_in(&mut self, channel: Option<&str>, property: &Property) {
        self.bounds
            .remove(&(channel.map(str::to_string), property.name));
    }

    pub(crate) fn bounds_in(&self, channel: Option<&str>, property: &Property) -> Option<Allowed> {
        self.bounds
            .get(&(channel.map(str::to_string), property.name))
            .cloned()
            .filter(|_| property.dynamic)
            .or_else(|| property.default_allowed())
    }
}

impl Drop for Instrument {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(instrument = %self.name, error = %e, "failed to close adapter");
        }
    }
}

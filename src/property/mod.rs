//! Property descriptor engine.
//!
//! A [`Property`] is a declarative description of one instrument attribute:
//! command templates, validation, value mapping and reply processing. The
//! descriptor itself never touches the transport. [`crate::instrument::Instrument`]
//! drives it through three pure steps:
//!
//! 1. [`Property::format_get`] builds the query string,
//! 2. [`Property::decode_reply`] turns the raw reply into a logical value,
//! 3. [`Property::prepare_set`] validates, maps and formats a logical value
//!    into the command string.
//!
//! Descriptors are plain values built once per driver with a small builder:
//!
//! ```
//! use daq_scpi::property::{Property, ValueMap};
//!
//! let output = Property::control("output_enabled", "OUTP:STAT?", "OUTP:STAT %s")
//!     .value_map(ValueMap::bools("ON", "OFF"))
//!     .strict_keys();
//! assert_eq!(output.prepare_set(true.into(), None, None).unwrap(), "OUTP:STAT ON");
//! ```

pub mod format;
pub mod validators;
pub mod value;
pub mod value_map;

pub use validators::{Allowed, Validator};
pub use value::PropertyValue;
pub use value_map::ValueMap;

use crate::error::{ScpiError, ScpiResult};

/// Transformation of the raw reply string into a value.
pub type GetProcess = fn(&str) -> ScpiResult<PropertyValue>;

/// Transformation applied to the wire value before formatting.
pub type SetProcess = fn(PropertyValue) -> ScpiResult<PropertyValue>;

/// Coercion applied to each reply element when no `get_process` is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cast {
    /// Parse as a float, keep the trimmed text if it is not numeric
    #[default]
    Float,
    /// Parse as an integer (floats are truncated)
    Int,
    /// Keep the trimmed text
    Str,
}

impl Cast {
    fn apply(self, raw: &str) -> ScpiResult<PropertyValue> {
        let text = raw.trim();
        match self {
            Cast::Float => Ok(text
                .parse::<f64>()
                .map(PropertyValue::Float)
                .unwrap_or_else(|_| PropertyValue::Str(text.to_string()))),
            Cast::Int => PropertyValue::Str(text.to_string())
                .as_i64()
                .map(PropertyValue::Int)
                .ok_or_else(|| ScpiError::Parse(format!("'{}' is not an integer", text))),
            Cast::Str => Ok(PropertyValue::Str(text.to_string())),
        }
    }
}

/// Declarative description of a gettable and/or settable attribute.
#[derive(Debug, Clone)]
pub struct Property {
    /// Identifier used in errors, bound overrides and the CLI
    pub name: &'static str,
    /// Query template, `None` for write-only properties
    pub get_command: Option<&'static str>,
    /// Command template with one value slot, `None` for read-only properties
    pub set_command: Option<&'static str>,
    /// Validator applied before any mapping
    pub validator: Option<Validator>,
    /// Values the validator checks against; `None` means the value map keys
    pub allowed: Option<Allowed>,
    /// Logical <-> wire translation
    pub value_map: Option<ValueMap>,
    /// Raw reply processing, replaces split and cast
    pub get_process: Option<GetProcess>,
    /// Wire value processing before formatting
    pub set_process: Option<SetProcess>,
    /// Reply element coercion
    pub cast: Cast,
    /// Split replies on `,` into a list
    pub split: bool,
    /// Allowed values may be overridden per instance
    pub dynamic: bool,
    /// Run the instrument's get error hook after reading
    pub check_get_errors: bool,
    /// Run the instrument's set error hook after writing
    pub check_set_errors: bool,
}

impl Property {
    fn new(
        name: &'static str,
        get_command: Option<&'static str>,
        set_command: Option<&'static str>,
    ) -> Self {
        Self {
            name,
            get_command,
            set_command,
            validator: None,
            allowed: None,
            value_map: None,
            get_process: None,
            set_process: None,
            cast: Cast::default(),
            split: true,
            dynamic: false,
            check_get_errors: false,
            check_set_errors: false,
        }
    }

    /// Gettable and settable property.
    pub fn control(name: &'static str, get: &'static str, set: &'static str) -> Self {
        Self::new(name, Some(get), Some(set))
    }

    /// Read-only property.
    pub fn measurement(name: &'static str, get: &'static str) -> Self {
        Self::new(name, Some(get), None)
    }

    /// Write-only property.
    pub fn setting(name: &'static str, set: &'static str) -> Self {
        Self::new(name, None, Some(set))
    }

    /// Attach a validator and the values it checks against.
    #[must_use]
    pub fn validate(mut self, validator: Validator, allowed: Allowed) -> Self {
        self.validator = Some(validator);
        self.allowed = Some(allowed);
        self
    }

    /// Reject values outside `[lo, hi]`.
    #[must_use]
    pub fn strict_range(self, lo: f64, hi: f64) -> Self {
        self.validate(Validator::StrictRange, Allowed::range(lo, hi))
    }

    /// Clamp values into `[lo, hi]`.
    #[must_use]
    pub fn truncated_range(self, lo: f64, hi: f64) -> Self {
        self.validate(Validator::TruncatedRange, Allowed::range(lo, hi))
    }

    /// Reject values that are not in `members`.
    #[must_use]
    pub fn strict_set<I, V>(self, members: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<PropertyValue>,
    {
        self.validate(Validator::StrictDiscreteSet, Allowed::set(members))
    }

    /// Reject values that are not keys of the value map.
    #[must_use]
    pub fn strict_keys(mut self) -> Self {
        self.validator = Some(Validator::StrictDiscreteSet);
        self.allowed = None;
        self
    }

    /// Snap values onto the keys of the value map.
    #[must_use]
    pub fn truncated_keys(mut self) -> Self {
        self.validator = Some(Validator::TruncatedDiscreteSet);
        self.allowed = None;
        self
    }

    /// Translate logical values through `map`.
    #[must_use]
    pub fn value_map(mut self, map: ValueMap) -> Self {
        self.value_map = Some(map);
        self
    }

    /// Process the raw reply with `f` instead of splitting and casting.
    #[must_use]
    pub fn get_process(mut self, f: GetProcess) -> Self {
        self.get_process = Some(f);
        self
    }

    /// Process the wire value with `f` before formatting.
    #[must_use]
    pub fn set_process(mut self, f: SetProcess) -> Self {
        self.set_process = Some(f);
        self
    }

    /// Coerce reply elements with `cast`.
    #[must_use]
    pub fn cast(mut self, cast: Cast) -> Self {
        self.cast = cast;
        self
    }

    /// Keep replies whole instead of splitting on `,`.
    #[must_use]
    pub fn no_split(mut self) -> Self {
        self.split = false;
        self
    }

    /// Allow per-instance bound overrides.
    #[must_use]
    pub fn dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }

    /// Run the instrument's error hooks after reads and/or writes.
    #[must_use]
    pub fn check_errors(mut self, get: bool, set: bool) -> Self {
        self.check_get_errors = get;
        self.check_set_errors = set;
        self
    }

    /// True when the property has a query command.
    pub fn is_gettable(&self) -> bool {
        self.get_command.is_some()
    }

    /// True when the property has a set command.
    pub fn is_settable(&self) -> bool {
        self.set_command.is_some()
    }

    /// Declared allowed values, falling back to the value map keys.
    pub fn default_allowed(&self) -> Option<Allowed> {
        self.allowed.clone().or_else(|| {
            self.value_map
                .as_ref()
                .map(|map| Allowed::Set(map.keys()))
        })
    }

    /// Build the query command for `channel`.
    pub fn format_get(&self, channel: Option<&str>) -> ScpiResult<String> {
        let template = self.get_command.ok_or(ScpiError::AccessDenied {
            property: self.name.to_string(),
            access: "write-only",
        })?;
        format::substitute_channel(template, channel)
    }

    /// Validate, map and format `value` into the set command.
    ///
    /// `bounds` replaces the declared allowed values when the property is
    /// dynamic. Nothing here touches the transport, so any error means no
    /// command was sent.
    pub fn prepare_set(
        &self,
        value: PropertyValue,
        bounds: Option<&Allowed>,
        channel: Option<&str>,
    ) -> ScpiResult<String> {
        let template = self.set_command.ok_or(ScpiError::AccessDenied {
            property: self.name.to_string(),
            access: "read-only",
        })?;

        let mut value = value;
        if let Some(validator) = self.validator {
            let allowed = match bounds.filter(|_| self.dynamic) {
                Some(bounds) => bounds.clone(),
                None => self.default_allowed().ok_or_else(|| {
                    ScpiError::Configuration(format!(
                        "property '{}' has a validator but no allowed values",
                        self.name
                    ))
                })?,
            };
            value = validator
                .apply(value, &allowed)
                .map_err(|e| match e {
                    ScpiError::Validation(msg) => {
                        ScpiError::Validation(format!("{}: {}", self.name, msg))
                    }
                    other => other,
                })?;
        }

        if let Some(map) = &self.value_map {
            value = map.encode(&value).cloned().ok_or_else(|| {
                ScpiError::validation(format!(
                    "{}: value '{}' is not one of {}",
                    self.name,
                    value,
                    Allowed::Set(map.keys())
                ))
            })?;
        }

        if let Some(process) = self.set_process {
            value = process(value)?;
        }

        let command = format::substitute_channel(template, channel)?;
        format::format_value(&command, &value)
    }

    /// Turn a raw reply into the logical value.
    pub fn decode_reply(&self, raw: &str) -> ScpiResult<PropertyValue> {
        let value = match self.get_process {
            Some(process) => process(raw)?,
            None if self.split && raw.contains(',') => PropertyValue::List(
                raw.split(',')
                    .map(|part| self.cast.apply(part))
                    .collect::<ScpiResult<Vec<_>>>()?,
            ),
            None => self.cast.apply(raw)?,
        };

        match &self.value_map {
            Some(map) => map.decode(&value).cloned().ok_or_else(|| {
                ScpiError::Lookup(format!(
                    "{}: reply '{}' matches no mapped value",
                    self.name, value
                ))
            }),
            None => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voltage() -> Property {
        Property::control("voltage_setpoint", "SOUR{ch}:VOLT?", "SOUR{ch}:VOLT %g")
            .strict_range(0.0, 30.0)
            .dynamic()
    }

    #[test]
    fn access_follows_declared_commands() {
        let write_only = Property::setting("remote", "SYST:%s");
        assert!(matches!(
            write_only.format_get(None),
            Err(ScpiError::AccessDenied { access: "write-only", .. })
        ));
        let read_only = Property::measurement("voltage", "MEAS:VOLT?");
        assert!(matches!(
            read_only.prepare_set(1i64.into(), None, None),
            Err(ScpiError::AccessDenied { access: "read-only", .. })
        ));
    }

    #[test]
    fn set_validates_then_formats() {
        let p = voltage();
        assert_eq!(
            p.prepare_set(30i64.into(), None, Some("2")).unwrap(),
            "SOUR2:VOLT 30"
        );
        assert!(matches!(
            p.prepare_set(30.1.into(), None, Some("2")),
            Err(ScpiError::Validation(_))
        ));
    }

    #[test]
    fn bounds_apply_only_to_dynamic_properties() {
        let narrow = Allowed::range(0.0, 5.0);
        assert!(voltage()
            .prepare_set(6i64.into(), Some(&narrow), Some("1"))
            .is_err());

        let fixed = Property::control("ovp", "VOLT:PROT?", "VOLT:PROT %g").strict_range(0.0, 30.0);
        assert_eq!(
            fixed.prepare_set(6i64.into(), Some(&narrow), None).unwrap(),
            "VOLT:PROT 6"
        );
    }

    #[test]
    fn mapped_values_round_trip() {
        let p = Property::control("output_enabled", "OUTP:STAT?", "OUTP:STAT %s")
            .value_map(ValueMap::bools("ON", "OFF"))
            .strict_keys();
        assert_eq!(p.prepare_set(true.into(), None, None).unwrap(), "OUTP:STAT ON");
        assert_eq!(p.decode_reply("OFF").unwrap(), PropertyValue::Bool(false));
        assert!(matches!(p.decode_reply("STBY"), Err(ScpiError::Lookup(_))));
        assert!(matches!(
            p.prepare_set("maybe".into(), None, None),
            Err(ScpiError::Validation(_))
        ));
    }

    #[test]
    fn unvalidated_map_still_rejects_unmapped_values() {
        let p = Property::setting("remote", "SYST:%s").value_map(ValueMap::bools("REM", "LOC"));
        assert!(matches!(
            p.prepare_set(1i64.into(), None, None),
            Err(ScpiError::Validation(_))
        ));
    }

    #[test]
    fn replies_are_split_and_cast() {
        let p = Property::measurement("reading", "MEAS?");
        assert_eq!(p.decode_reply("1.5\n").unwrap(), PropertyValue::Float(1.5));
        assert_eq!(
            p.decode_reply("1.5,-2").unwrap(),
            PropertyValue::List(vec![1.5.into(), (-2.0).into()])
        );
        assert_eq!(p.decode_reply("VOLT:DC").unwrap(), PropertyValue::Str("VOLT:DC".into()));

        let idn = Property::measurement("id", "*IDN?").cast(Cast::Str).no_split();
        assert_eq!(
            idn.decode_reply("RIGOL,DP932,1,2").unwrap(),
            PropertyValue::Str("RIGOL,DP932,1,2".into())
        );
        let int = Property::measurement("channel", "INST:NSEL?").cast(Cast::Int);
        assert_eq!(int.decode_reply("2").unwrap(), PropertyValue::Int(2));
        assert!(int.decode_reply("CH2").is_err());
    }

    #[test]
    fn get_process_runs_before_reverse_lookup() {
        fn coupling(raw: &str) -> ScpiResult<PropertyValue> {
            Ok(raw
                .rsplit(' ')
                .next()
                .and_then(|v| v.get(..1))
                .unwrap_or_default()
                .into())
        }
        let p = Property::control("coupling", "C{ch}:CPL?", "C{ch}:CPL %s1M")
            .value_map(ValueMap::new([("DC", "D"), ("AC", "A")]))
            .truncated_keys()
            .get_process(coupling);
        assert_eq!(p.decode_reply("C1:CPL A1M").unwrap(), PropertyValue::Str("AC".into()));
        assert_eq!(
            p.prepare_set("DC".into(), None, Some("1")).unwrap(),
            "C1:CPL D1M"
        );
    }
}

//! Bidirectional logical <-> wire token translation.

use super::value::PropertyValue;

/// Ordered mapping between logical values and wire tokens.
///
/// Logical keys are unique. Several keys may share one wire token
/// (`true`, `"on"` and `"ON"` all send `1`); decoding returns the first key
/// declared for a token.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueMap {
    entries: Vec<(PropertyValue, PropertyValue)>,
}

impl ValueMap {
    /// Build a map from `(logical, wire)` pairs. Later duplicates of a
    /// logical key are ignored.
    pub fn new<I, L, W>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (L, W)>,
        L: Into<PropertyValue>,
        W: Into<PropertyValue>,
    {
        let mut entries: Vec<(PropertyValue, PropertyValue)> = Vec::new();
        for (logical, wire) in pairs {
            let logical = logical.into();
            if !entries.iter().any(|(k, _)| *k == logical) {
                entries.push((logical, wire.into()));
            }
        }
        Self { entries }
    }

    /// `true -> on`, `false -> off`.
    pub fn bools(on: impl Into<PropertyValue>, off: impl Into<PropertyValue>) -> Self {
        Self::new([(true, on.into()), (false, off.into())])
    }

    /// `true`/`"on"`/`"ON" -> 1` and `false`/`"off"`/`"OFF" -> 0`.
    pub fn on_off_aliases() -> Self {
        Self::new([
            (PropertyValue::Bool(true), 1i64),
            ("on".into(), 1),
            ("ON".into(), 1),
            (PropertyValue::Bool(false), 0),
            ("off".into(), 0),
            ("OFF".into(), 0),
        ])
    }

    /// Wire token for a logical value.
    pub fn encode(&self, logical: &PropertyValue) -> Option<&PropertyValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == logical)
            .map(|(_, wire)| wire)
    }

    /// First logical value declared for a wire token.
    pub fn decode(&self, wire: &PropertyValue) -> Option<&PropertyValue> {
        self.entries
            .iter()
            .find(|(_, w)| w == wire)
            .map(|(logical, _)| logical)
    }

    /// Logical keys in declaration order.
    pub fn keys(&self) -> Vec<PropertyValue> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Iterate over `(logical, wire)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&PropertyValue, &PropertyValue)> {
        self.entries.iter().map(|(k, w)| (k, w))
    }

    /// Number of logical keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

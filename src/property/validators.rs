//! Allowed-value constraints and the validators that enforce them.
//!
//! Strict validators reject; truncating validators coerce the input to the
//! nearest allowed bound or member and return the adjusted value.

use super::value::PropertyValue;
use crate::error::{ScpiError, ScpiResult};
use std::fmt;

/// Set of values a property accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Allowed {
    /// Inclusive numeric range `[lo, hi]`
    Range(f64, f64),
    /// Discrete members
    Set(Vec<PropertyValue>),
}

impl Allowed {
    /// Inclusive numeric range.
    pub fn range(lo: f64, hi: f64) -> Self {
        Allowed::Range(lo.min(hi), lo.max(hi))
    }

    /// Discrete members.
    pub fn set<I, V>(members: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<PropertyValue>,
    {
        Allowed::Set(members.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Allowed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Allowed::Range(lo, hi) => write!(f, "[{}, {}]", lo, hi),
            Allowed::Set(members) => {
                f.write_str("{")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", m)?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Validation strategy attached to a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validator {
    /// Reject values outside `[lo, hi]`
    StrictRange,
    /// Clamp values to `[lo, hi]`
    TruncatedRange,
    /// Reject non-members
    StrictDiscreteSet,
    /// Snap non-members to the next allowed member
    TruncatedDiscreteSet,
}

impl Validator {
    /// Run the validator against `allowed`.
    pub fn apply(self, value: PropertyValue, allowed: &Allowed) -> ScpiResult<PropertyValue> {
        match (self, allowed) {
            (Validator::StrictRange, Allowed::Range(lo, hi)) => strict_range(value, *lo, *hi),
            (Validator::TruncatedRange, Allowed::Range(lo, hi)) => {
                truncated_range(value, *lo, *hi)
            }
            (Validator::StrictDiscreteSet, Allowed::Set(members)) => {
                strict_discrete_set(value, members)
            }
            (Validator::TruncatedDiscreteSet, Allowed::Set(members)) => {
                truncated_discrete_set(value, members)
            }
            (validator, allowed) => Err(ScpiError::Configuration(format!(
                "{:?} cannot check against {}",
                validator, allowed
            ))),
        }
    }
}

fn numeric(value: &PropertyValue) -> ScpiResult<f64> {
    match value {
        PropertyValue::Int(_) | PropertyValue::Float(_) => value
            .as_f64()
            .filter(|x| !x.is_nan())
            .ok_or_else(|| ScpiError::validation("value is not a number")),
        other => Err(ScpiError::validation(format!(
            "value '{}' ({}) is not a number",
            other,
            other.kind()
        ))),
    }
}

/// Accept `value` only when `lo <= value <= hi`.
pub fn strict_range(value: PropertyValue, lo: f64, hi: f64) -> ScpiResult<PropertyValue> {
    let x = numeric(&value)?;
    if x >= lo && x <= hi {
        Ok(value)
    } else {
        Err(ScpiError::validation(format!(
            "value {} is not in range [{}, {}]",
            value, lo, hi
        )))
    }
}

/// Clamp `value` into `[lo, hi]`.
pub fn truncated_range(value: PropertyValue, lo: f64, hi: f64) -> ScpiResult<PropertyValue> {
    let x = numeric(&value)?;
    if x < lo {
        Ok(PropertyValue::Float(lo))
    } else if x > hi {
        Ok(PropertyValue::Float(hi))
    } else {
        Ok(value)
    }
}

/// Accept `value` only when it is one of `members`.
pub fn strict_discrete_set(
    value: PropertyValue,
    members: &[PropertyValue],
) -> ScpiResult<PropertyValue> {
    if members.contains(&value) {
        Ok(value)
    } else {
        Err(ScpiError::validation(format!(
            "value '{}' is not in the discrete set {}",
            value,
            Allowed::Set(members.to_vec())
        )))
    }
}

/// Return members unchanged; snap numbers to the smallest member that is not
/// below them, or to the largest member.
pub fn truncated_discrete_set(
    value: PropertyValue,
    members: &[PropertyValue],
) -> ScpiResult<PropertyValue> {
    if members.contains(&value) {
        return Ok(value);
    }
    let x = numeric(&value)?;
    let mut numbers: Vec<(f64, &PropertyValue)> = members
        .iter()
        .filter(|m| m.is_number())
        .filter_map(|m| m.as_f64().map(|f| (f, m)))
        .collect();
    numbers.sort_by(|a, b| a.0.total_cmp(&b.0));
    numbers
        .iter()
        .find(|(m, _)| *m >= x)
        .or_else(|| numbers.last())
        .map(|(_, member)| (*member).clone())
        .ok_or_else(|| {
            ScpiError::validation(format!(
                "cannot snap '{}' to the non-numeric set {}",
                value,
                Allowed::Set(members.to_vec())
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_range_accepts_bounds_and_rejects_outside() {
        assert_eq!(strict_range(0i64.into(), 0.0, 30.0).unwrap(), PropertyValue::Int(0));
        assert_eq!(strict_range(30.0.into(), 0.0, 30.0).unwrap(), PropertyValue::Float(30.0));
        assert!(matches!(
            strict_range(30.1.into(), 0.0, 30.0),
            Err(ScpiError::Validation(_))
        ));
        assert!(strict_range((-0.001).into(), 0.0, 30.0).is_err());
        assert!(strict_range("ten".into(), 0.0, 30.0).is_err());
        assert!(strict_range(true.into(), 0.0, 30.0).is_err());
    }

    #[test]
    fn truncated_range_clamps_to_nearest_bound() {
        assert_eq!(truncated_range(100.0.into(), 2e-3, 10.0).unwrap(), PropertyValue::Float(10.0));
        assert_eq!(truncated_range(1e-6.into(), 2e-3, 10.0).unwrap(), PropertyValue::Float(2e-3));
        assert_eq!(truncated_range(0.5.into(), 2e-3, 10.0).unwrap(), PropertyValue::Float(0.5));
    }

    #[test]
    fn strict_discrete_set_returns_input_unchanged() {
        let members = vec![PropertyValue::from("F"), "M".into(), "S".into()];
        assert_eq!(
            strict_discrete_set("M".into(), &members).unwrap(),
            PropertyValue::Str("M".into())
        );
        assert!(strict_discrete_set("X".into(), &members).is_err());
    }

    #[test]
    fn truncated_discrete_set_snaps_upward() {
        let members: Vec<PropertyValue> = vec![3i64.into(), 4i64.into(), 5i64.into(), 6i64.into()];
        assert_eq!(truncated_discrete_set(4i64.into(), &members).unwrap(), PropertyValue::Int(4));
        assert_eq!(truncated_discrete_set(4.2.into(), &members).unwrap(), PropertyValue::Int(5));
        assert_eq!(truncated_discrete_set(9i64.into(), &members).unwrap(), PropertyValue::Int(6));
        assert_eq!(truncated_discrete_set(0i64.into(), &members).unwrap(), PropertyValue::Int(3));
    }

    #[test]
    fn truncated_discrete_set_rejects_unknown_text() {
        let members = vec![PropertyValue::from("DC"), "AC".into()];
        assert_eq!(
            truncated_discrete_set("AC".into(), &members).unwrap(),
            PropertyValue::Str("AC".into())
        );
        assert!(truncated_discrete_set("GND".into(), &members).is_err());
    }

    #[test]
    fn validator_needs_matching_allowed_kind() {
        let err = Validator::StrictRange
            .apply(1i64.into(), &Allowed::set(["A", "B"]))
            .unwrap_err();
        assert!(matches!(err, ScpiError::Configuration(_)));
    }
}

//! Command template formatting.
//!
//! Templates carry two kinds of slots:
//! - `{ch}`: the channel id, substituted with `strfmt` before anything else.
//! - one printf-style conversion (`%s`, `%d`, `%g`, `%e`, `%f`, `%x`) that
//!   receives the (validated, mapped) property value. `%%` is a literal `%`.
//!
//! The conversions follow C printf semantics, which is what instrument
//! programming manuals document (`VOLT %g`, `C1:VDIV %.2eV`).

use super::value::PropertyValue;
use crate::error::{ScpiError, ScpiResult};
use std::collections::HashMap;

/// Substitute every `{ch}` in `template` with `channel`.
///
/// Templates without braces are returned unchanged. A template that asks for
/// `{ch}` outside a channel scope is a declaration error.
pub fn substitute_channel(template: &str, channel: Option<&str>) -> ScpiResult<String> {
    if !template.contains('{') {
        return Ok(template.to_string());
    }
    let channel = channel.ok_or_else(|| {
        ScpiError::Format(format!(
            "template '{}' needs a channel id but none is in scope",
            template
        ))
    })?;
    let mut vars = HashMap::with_capacity(1);
    vars.insert("ch".to_string(), channel.to_string());
    strfmt::strfmt(template, &vars)
        .map_err(|e| ScpiError::Format(format!("template '{}': {}", template, e)))
}

#[derive(Debug, Default, Clone, Copy)]
struct Spec {
    left_align: bool,
    plus_sign: bool,
    space_sign: bool,
    zero_pad: bool,
    alternate: bool,
    width: usize,
    precision: Option<usize>,
    conversion: char,
}

/// Format `value` into the single printf-style slot of `template`.
pub fn format_value(template: &str, value: &PropertyValue) -> ScpiResult<String> {
    let mut out = String::with_capacity(template.len() + 16);
    let mut chars = template.chars().peekable();
    let mut used = false;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }

        let mut spec = Spec::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => spec.left_align = true,
                '+' => spec.plus_sign = true,
                ' ' => spec.space_sign = true,
                '0' => spec.zero_pad = true,
                '#' => spec.alternate = true,
                _ => break,
            }
            chars.next();
        }
        while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
            spec.width = spec.width * 10 + d as usize;
            chars.next();
        }
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut precision = 0usize;
            while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                precision = precision * 10 + d as usize;
                chars.next();
            }
            spec.precision = Some(precision);
        }
        spec.conversion = chars.next().ok_or_else(|| {
            ScpiError::Format(format!("template '{}' ends inside a conversion", template))
        })?;

        if used {
            return Err(ScpiError::Format(format!(
                "template '{}' has more than one value slot",
                template
            )));
        }
        used = true;
        out.push_str(&convert(&spec, value, template)?);
    }

    if !used {
        return Err(ScpiError::Format(format!(
            "template '{}' has no value slot",
            template
        )));
    }
    Ok(out)
}

fn convert(spec: &Spec, value: &PropertyValue, template: &str) -> ScpiResult<String> {
    let number = || {
        value.as_f64().ok_or_else(|| {
            ScpiError::Format(format!(
                "%{} in '{}' needs a number, got {} '{}'",
                spec.conversion,
                template,
                value.kind(),
                value
            ))
        })
    };

    let (sign_negative, body) = match spec.conversion {
        's' => {
            let mut text = value.to_string();
            if let Some(p) = spec.precision {
                text = text.chars().take(p).collect();
            }
            return Ok(pad(spec, false, text, false));
        }
        'd' | 'i' | 'u' => {
            let n = match value {
                PropertyValue::Bool(b) => i64::from(*b),
                other => other.as_i64().ok_or_else(|| {
                    ScpiError::Format(format!(
                        "%{} in '{}' needs a number, got {} '{}'",
                        spec.conversion,
                        template,
                        other.kind(),
                        other
                    ))
                })?,
            };
            (n < 0, n.unsigned_abs().to_string())
        }
        'x' | 'X' => {
            let n = value
                .as_i64()
                .ok_or_else(|| ScpiError::Format(format!("%x in '{}' needs an integer", template)))?;
            let digits = if spec.conversion == 'x' {
                format!("{:x}", n.unsigned_abs())
            } else {
                format!("{:X}", n.unsigned_abs())
            };
            (n < 0, digits)
        }
        'f' | 'F' => {
            let x = number()?;
            (
                x.is_sign_negative() && x != 0.0,
                format_fixed(x.abs(), spec.precision.unwrap_or(6)),
            )
        }
        'e' | 'E' => {
            let x = number()?;
            let text = format_exponent(x.abs(), spec.precision.unwrap_or(6));
            (
                x.is_sign_negative() && x != 0.0,
                upper_if(spec.conversion == 'E', text),
            )
        }
        'g' | 'G' => {
            let x = number()?;
            let text = format_general(x.abs(), spec.precision.unwrap_or(6), spec.alternate);
            (
                x.is_sign_negative() && x != 0.0,
                upper_if(spec.conversion == 'G', text),
            )
        }
        other => {
            return Err(ScpiError::Format(format!(
                "unsupported conversion '%{}' in '{}'",
                other, template
            )))
        }
    };
    Ok(pad(spec, sign_negative, body, true))
}

fn upper_if(upper: bool, text: String) -> String {
    if upper {
        text.to_uppercase()
    } else {
        text
    }
}

fn pad(spec: &Spec, negative: bool, body: String, numeric: bool) -> String {
    let sign = if !numeric {
        ""
    } else if negative {
        "-"
    } else if spec.plus_sign {
        "+"
    } else if spec.space_sign {
        " "
    } else {
        ""
    };
    let len = sign.len() + body.chars().count();
    if len >= spec.width {
        return format!("{}{}", sign, body);
    }
    let fill = spec.width - len;
    if spec.left_align {
        format!("{}{}{}", sign, body, " ".repeat(fill))
    } else if spec.zero_pad && numeric {
        format!("{}{}{}", sign, "0".repeat(fill), body)
    } else {
        format!("{}{}{}", " ".repeat(fill), sign, body)
    }
}

fn non_finite(x: f64) -> Option<String> {
    if x.is_nan() {
        Some("nan".to_string())
    } else if x.is_infinite() {
        Some("inf".to_string())
    } else {
        None
    }
}

fn format_fixed(x: f64, precision: usize) -> String {
    non_finite(x).unwrap_or_else(|| format!("{:.*}", precision, x))
}

/// Split Rust's `{:e}` output into mantissa and decimal exponent.
fn exponent_parts(x: f64, precision: usize) -> (String, i32) {
    let text = format!("{:.*e}", precision, x);
    match text.split_once('e') {
        Some((mantissa, exp)) => (mantissa.to_string(), exp.parse().unwrap_or(0)),
        None => (text, 0),
    }
}

fn join_exponent(mantissa: &str, exp: i32) -> String {
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{}e{}{:02}", mantissa, sign, exp.unsigned_abs())
}

fn format_exponent(x: f64, precision: usize) -> String {
    if let Some(text) = non_finite(x) {
        return text;
    }
    let (mantissa, exp) = exponent_parts(x, precision);
    join_exponent(&mantissa, exp)
}

fn strip_trailing_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

fn format_general(x: f64, precision: usize, keep_zeros: bool) -> String {
    if let Some(text) = non_finite(x) {
        return text;
    }
    let p = precision.max(1);
    if x == 0.0 {
        return if keep_zeros {
            format!("{:.*}", p - 1, 0.0)
        } else {
            "0".to_string()
        };
    }
    // The exponent after rounding to p significant digits decides the style.
    let (mantissa, exp) = exponent_parts(x, p - 1);
    if exp < -4 || exp >= p as i32 {
        let mantissa = if keep_zeros {
            mantissa.as_str()
        } else {
            strip_trailing_zeros(&mantissa)
        };
        join_exponent(mantissa, exp)
    } else {
        let decimals = (p as i32 - 1 - exp).max(0) as usize;
        let fixed = format!("{:.*}", decimals, x);
        if keep_zeros {
            fixed
        } else {
            strip_trailing_zeros(&fixed).to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(template: &str, value: impl Into<PropertyValue>) -> String {
        format_value(template, &value.into()).unwrap()
    }

    #[test]
    fn general_format_matches_printf() {
        assert_eq!(fmt("VOLT %g", 30i64), "VOLT 30");
        assert_eq!(fmt("VOLT %g", 30.0), "VOLT 30");
        assert_eq!(fmt("VOLT %g", 12.5), "VOLT 12.5");
        assert_eq!(fmt("%g", 0.0001), "0.0001");
        assert_eq!(fmt("%g", 0.00001), "1e-05");
        assert_eq!(fmt("%g", 1234567.0), "1.23457e+06");
        assert_eq!(fmt("%g", 123456.0), "123456");
        assert_eq!(fmt("%g", -2.5), "-2.5");
        assert_eq!(fmt("%g", 0.0), "0");
        assert_eq!(fmt("%g", 999999.5), "1e+06");
    }

    #[test]
    fn exponent_format_matches_printf() {
        assert_eq!(fmt("C1:VDIV %.2eV", 0.2), "C1:VDIV 2.00e-01V");
        assert_eq!(fmt("%e", 1.0), "1.000000e+00");
        assert_eq!(fmt("%.2e", 12345.0), "1.23e+04");
        assert_eq!(fmt("%.2e", -0.0005), "-5.00e-04");
        assert_eq!(fmt("%E", 1e100), "1.000000E+100");
    }

    #[test]
    fn integer_and_string_conversions() {
        assert_eq!(fmt("INST:NSEL %d", 2i64), "INST:NSEL 2");
        assert_eq!(fmt("%d", 2.9), "2");
        assert_eq!(fmt("%d", true), "1");
        assert_eq!(fmt("SYST:%s", "REM"), "SYST:REM");
        assert_eq!(fmt("C1:CPL %s1M", "D"), "C1:CPL D1M");
        assert_eq!(fmt("%05d", 42i64), "00042");
        assert_eq!(fmt("%-4s|", "A"), "A   |");
        assert_eq!(fmt("%+d", 3i64), "+3");
        assert_eq!(fmt("%x", 255i64), "ff");
        assert_eq!(fmt("100%% %d", 1i64), "100% 1");
    }

    #[test]
    fn fixed_format() {
        assert_eq!(fmt("%f", 1.5), "1.500000");
        assert_eq!(fmt("%.1f", 0.26), "0.3");
    }

    #[test]
    fn rejects_bad_templates() {
        let v = PropertyValue::Int(1);
        assert!(format_value("*RST", &v).is_err());
        assert!(format_value("%d %d", &v).is_err());
        assert!(format_value("VOLT %", &v).is_err());
        assert!(format_value("VOLT %q", &v).is_err());
        assert!(format_value("VOLT %g", &PropertyValue::Str("high".into())).is_err());
    }

    #[test]
    fn channel_substitution_replaces_every_occurrence() {
        assert_eq!(
            substitute_channel("SOUR{ch}:VOLT? CH{ch}", Some("2")).unwrap(),
            "SOUR2:VOLT? CH2"
        );
        assert_eq!(substitute_channel("*IDN?", None).unwrap(), "*IDN?");
        assert_eq!(substitute_channel("VOLT %g", Some("1")).unwrap(), "VOLT %g");
        assert!(substitute_channel("CHAN{ch}:DISP?", None).is_err());
    }
}

//! Canonical re-serialization of scalars as script literals.
//!
//! Values are written so that the same data always produces the same text
//! regardless of how it was quoted in the source.

use crate::ast::{Scalar, ScalarValue};

/// Literal for a scalar in value position.
///
/// Strings are JSON-quoted with `<`, U+2028 and U+2029 escaped so the
/// literal is safe to embed anywhere; numbers use script number syntax;
/// dates become `new Date("...")`.
pub fn encode_literal(scalar: &Scalar) -> String {
    match &scalar.value {
        ScalarValue::Null => "null".to_string(),
        ScalarValue::Bool(value) => value.to_string(),
        ScalarValue::Int(value) => value.to_string(),
        ScalarValue::Float(value) => encode_number(*value),
        ScalarValue::Str(value) => encode_string(value),
        ScalarValue::Date(value) => format!("new Date({})", encode_string(value)),
    }
}

/// Object key for a scalar in key position, as `JSON.stringify` would
/// write its value.
pub fn encode_key(scalar: &Scalar) -> String {
    match &scalar.value {
        ScalarValue::Null => "null".to_string(),
        ScalarValue::Bool(value) => value.to_string(),
        ScalarValue::Int(value) => value.to_string(),
        ScalarValue::Float(value) if value.is_finite() => encode_number(*value),
        ScalarValue::Float(_) => "null".to_string(),
        ScalarValue::Str(value) | ScalarValue::Date(value) => json_string(value),
    }
}

fn json_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

fn encode_string(value: &str) -> String {
    let json = json_string(value);
    if !json.contains(['<', '\u{2028}', '\u{2029}']) {
        return json;
    }
    let mut out = String::with_capacity(json.len() + 8);
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003C"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}

/// Number in the form a script engine prints it.
fn encode_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    let magnitude = value.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return value.to_string();
    }
    let exponential = format!("{value:e}");
    match exponential.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => exponential,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ScalarStyle;
    use lumen_carton::SourceRange;

    fn scalar(value: ScalarValue) -> Scalar {
        Scalar {
            value,
            style: ScalarStyle::Plain,
            span: SourceRange::default(),
            source: String::new(),
        }
    }

    #[test]
    fn test_strings_are_embedding_safe() {
        let value = scalar(ScalarValue::Str("</script>\"\n".into()));
        assert_eq!(encode_literal(&value), r#""\u003C/script>\"\n""#);
        assert_eq!(encode_key(&value), r#""</script>\"\n""#);
    }

    #[test]
    fn test_numbers() {
        let encode = |v: f64| encode_literal(&scalar(ScalarValue::Float(v)));
        assert_eq!(encode(1.5), "1.5");
        assert_eq!(encode(2.0), "2");
        assert_eq!(encode(-0.0), "-0");
        assert_eq!(encode(1e21), "1e+21");
        assert_eq!(encode(1.5e-7), "1.5e-7");
        assert_eq!(encode(f64::NAN), "NaN");
        assert_eq!(encode(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(encode_key(&scalar(ScalarValue::Float(f64::NAN))), "null");
    }

    #[test]
    fn test_dates_and_scalars() {
        assert_eq!(
            encode_literal(&scalar(ScalarValue::Date("2024-01-02".into()))),
            r#"new Date("2024-01-02")"#
        );
        assert_eq!(encode_literal(&scalar(ScalarValue::Null)), "null");
        assert_eq!(encode_literal(&scalar(ScalarValue::Bool(false))), "false");
        assert_eq!(encode_literal(&scalar(ScalarValue::Int(-12))), "-12");
        assert_eq!(encode_key(&scalar(ScalarValue::Int(3))), "3");
    }
}

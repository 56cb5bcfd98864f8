//! Range-checked numeric conversions
//!
//! JavaScript numbers are doubles. Every narrowing into a managed primitive
//! is checked: a value outside the target domain, or a fractional value for
//! an integral target, is a `NumericRangeError`. Nothing is truncated.

use conduit_sdk::{BridgeError, BridgeResult, CastKind, JsValue, ManagedValue};

use super::signature::TypeSignature;

/// Largest integer a double represents exactly (2^53 - 1)
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

fn range_error(value: impl ToString, target: &'static str) -> BridgeError {
    BridgeError::NumericRangeError {
        value: value.to_string(),
        target,
    }
}

fn integral(n: f64, min: f64, max: f64, target: &'static str) -> BridgeResult<f64> {
    if !n.is_finite() || n.fract() != 0.0 || n < min || n > max {
        return Err(range_error(n, target));
    }
    Ok(n)
}

/// Narrow to `byte`
pub fn to_byte(n: f64) -> BridgeResult<i8> {
    Ok(integral(n, i8::MIN as f64, i8::MAX as f64, "byte")? as i8)
}

/// Narrow to `short`
pub fn to_short(n: f64) -> BridgeResult<i16> {
    Ok(integral(n, i16::MIN as f64, i16::MAX as f64, "short")? as i16)
}

/// Narrow to `int`
pub fn to_int(n: f64) -> BridgeResult<i32> {
    Ok(integral(n, i32::MIN as f64, i32::MAX as f64, "int")? as i32)
}

/// Narrow a number to `long`; only the exactly-representable range is accepted
pub fn to_long(n: f64) -> BridgeResult<i64> {
    let max = MAX_SAFE_INTEGER as f64;
    Ok(integral(n, -max, max, "long")? as i64)
}

/// Parse the decimal text carried by a long cast
pub fn parse_long(text: &str) -> BridgeResult<i64> {
    text.trim()
        .parse::<i64>()
        .map_err(|_| range_error(text, "long"))
}

/// Narrow to `float`. NaN and infinities pass through; finite values beyond
/// `f32::MAX` do not
pub fn to_float(n: f64) -> BridgeResult<f32> {
    if n.is_finite() && n.abs() > f32::MAX as f64 {
        return Err(range_error(n, "float"));
    }
    Ok(n as f32)
}

/// A one-unit UTF-16 string as `char`
pub fn to_char(s: &str) -> BridgeResult<u16> {
    let mut units = s.encode_utf16();
    match (units.next(), units.next()) {
        (Some(unit), None) => Ok(unit),
        _ => Err(range_error(format!("{:?}", s), "char")),
    }
}

/// Convert a char code carried by a char cast
pub fn code_to_char(n: f64) -> BridgeResult<u16> {
    Ok(integral(n, 0.0, u16::MAX as f64, "char")? as u16)
}

/// `long` into JavaScript: a number when exact, otherwise a long cast carrying
/// the decimal text
pub fn long_to_js(value: i64) -> JsValue {
    if (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&value) {
        JsValue::Number(value as f64)
    } else {
        JsValue::cast(CastKind::Long, JsValue::String(value.to_string()))
    }
}

/// `char` into JavaScript as a one-unit string
pub fn char_to_js(unit: u16) -> JsValue {
    JsValue::String(String::from_utf16_lossy(&[unit]))
}

/// Validate a cast-helper argument at the cast site and wrap it
pub fn cast(kind: CastKind, value: &JsValue) -> BridgeResult<JsValue> {
    let payload = match value {
        JsValue::Cast(_, inner) => inner.as_ref(),
        other => other,
    };
    match (kind, payload) {
        (CastKind::Byte, JsValue::Number(n)) => {
            to_byte(*n)?;
        }
        (CastKind::Short, JsValue::Number(n)) => {
            to_short(*n)?;
        }
        (CastKind::Char, JsValue::String(s)) => {
            to_char(s)?;
        }
        (CastKind::Char, JsValue::Number(n)) => {
            code_to_char(*n)?;
        }
        (CastKind::Long, JsValue::Number(n)) => {
            to_long(*n)?;
        }
        (CastKind::Long, JsValue::String(s)) => {
            parse_long(s)?;
        }
        (CastKind::Float, JsValue::Number(n)) => {
            to_float(*n)?;
        }
        (CastKind::Double, JsValue::Number(_)) => {}
        (kind, other) => {
            return Err(BridgeError::TypeMismatch {
                expected: format!("{} payload", kind.function_name()),
                got: other.type_name().to_string(),
            })
        }
    }
    Ok(JsValue::cast(kind, payload.clone()))
}

/// Convert a JavaScript value into a managed primitive of type `target`
pub fn to_primitive(value: &JsValue, target: &TypeSignature) -> BridgeResult<ManagedValue> {
    let (kind, payload) = match value {
        JsValue::Cast(kind, inner) => (Some(*kind), inner.as_ref()),
        other => (None, other),
    };

    let converted = match (target, payload) {
        (TypeSignature::Boolean, JsValue::Bool(b)) => ManagedValue::Boolean(*b),
        (TypeSignature::Byte, JsValue::Number(n)) => ManagedValue::Byte(to_byte(*n)?),
        (TypeSignature::Short, JsValue::Number(n)) => ManagedValue::Short(to_short(*n)?),
        (TypeSignature::Int, JsValue::Number(n)) => ManagedValue::Int(to_int(*n)?),
        (TypeSignature::Long, JsValue::Number(n)) => ManagedValue::Long(to_long(*n)?),
        (TypeSignature::Long, JsValue::String(s)) if kind == Some(CastKind::Long) => {
            ManagedValue::Long(parse_long(s)?)
        }
        (TypeSignature::Float, JsValue::Number(n)) => ManagedValue::Float(to_float(*n)?),
        (TypeSignature::Double, JsValue::Number(n)) => ManagedValue::Double(*n),
        (TypeSignature::Char, JsValue::String(s)) => ManagedValue::Char(to_char(s)?),
        (TypeSignature::Char, JsValue::Number(n)) if kind == Some(CastKind::Char) => {
            ManagedValue::Char(code_to_char(*n)?)
        }
        (target, other) => {
            return Err(BridgeError::TypeMismatch {
                expected: target.type_name().to_string(),
                got: other.type_name().to_string(),
            })
        }
    };
    Ok(converted)
}

/// Convert a managed primitive into JavaScript; `None` for references
pub fn primitive_to_js(value: &ManagedValue) -> Option<JsValue> {
    let js = match value {
        ManagedValue::Void => JsValue::Undefined,
        ManagedValue::Boolean(b) => JsValue::Bool(*b),
        ManagedValue::Byte(v) => JsValue::Number(*v as f64),
        ManagedValue::Short(v) => JsValue::Number(*v as f64),
        ManagedValue::Int(v) => JsValue::Number(*v as f64),
        ManagedValue::Long(v) => long_to_js(*v),
        ManagedValue::Float(v) => JsValue::Number(*v as f64),
        ManagedValue::Double(v) => JsValue::Number(*v),
        ManagedValue::Char(c) => char_to_js(*c),
        ManagedValue::Null | ManagedValue::String(_) | ManagedValue::Object(_) => return None,
    };
    Some(js)
}

/// Box a cast value for an object-typed target
pub fn box_cast(kind: CastKind, payload: &JsValue) -> BridgeResult<ManagedValue> {
    let target = match kind {
        CastKind::Byte => TypeSignature::Byte,
        CastKind::Short => TypeSignature::Short,
        CastKind::Char => TypeSignature::Char,
        CastKind::Long => TypeSignature::Long,
        CastKind::Float => TypeSignature::Float,
        CastKind::Double => TypeSignature::Double,
    };
    to_primitive(&JsValue::cast(kind, payload.clone()), &target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_range() {
        assert_eq!(to_byte(127.0).unwrap(), 127);
        assert_eq!(to_byte(-128.0).unwrap(), -128);
        assert!(matches!(
            to_byte(128.0),
            Err(BridgeError::NumericRangeError { target: "byte", .. })
        ));
        assert!(to_byte(1.5).is_err());
        assert!(to_byte(f64::NAN).is_err());
    }

    #[test]
    fn test_long_limits() {
        assert_eq!(to_long(9_007_199_254_740_991.0).unwrap(), MAX_SAFE_INTEGER);
        assert!(to_long(9_007_199_254_740_992.0).is_err());
        assert_eq!(parse_long("9223372036854775807").unwrap(), i64::MAX);
        assert!(parse_long("9223372036854775808").is_err());
        assert!(parse_long("12x").is_err());
    }

    #[test]
    fn test_long_to_js() {
        assert_eq!(long_to_js(42), JsValue::Number(42.0));
        assert_eq!(
            long_to_js(i64::MAX),
            JsValue::cast(CastKind::Long, JsValue::string("9223372036854775807"))
        );
    }

    #[test]
    fn test_float_range() {
        assert_eq!(to_float(1.5).unwrap(), 1.5f32);
        assert!(to_float(f64::NAN).unwrap().is_nan());
        assert_eq!(to_float(f64::INFINITY).unwrap(), f32::INFINITY);
        assert!(to_float(1e39).is_err());
    }

    #[test]
    fn test_char_requires_single_unit() {
        assert_eq!(to_char("a").unwrap(), b'a' as u16);
        assert!(to_char("ab").is_err());
        assert!(to_char("").is_err());
        assert!(to_char("\u{1F600}").is_err());
        assert_eq!(char_to_js(b'z' as u16), JsValue::string("z"));
    }

    #[test]
    fn test_cast_validates_at_cast_site() {
        assert_eq!(
            cast(CastKind::Byte, &JsValue::number(5)).unwrap(),
            JsValue::cast(CastKind::Byte, JsValue::number(5))
        );
        assert!(matches!(
            cast(CastKind::Byte, &JsValue::number(300)),
            Err(BridgeError::NumericRangeError { .. })
        ));
        assert!(cast(CastKind::Long, &JsValue::string("123456789012345678")).is_ok());
        assert!(matches!(
            cast(CastKind::Double, &JsValue::Bool(true)),
            Err(BridgeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_to_primitive() {
        assert_eq!(
            to_primitive(&JsValue::number(7), &TypeSignature::Int).unwrap(),
            ManagedValue::Int(7)
        );
        assert_eq!(
            to_primitive(
                &JsValue::cast(CastKind::Long, JsValue::string("-9223372036854775808")),
                &TypeSignature::Long
            )
            .unwrap(),
            ManagedValue::Long(i64::MIN)
        );
        assert!(to_primitive(&JsValue::string("5"), &TypeSignature::Long).is_err());
        assert!(to_primitive(&JsValue::number(2.5), &TypeSignature::Int).is_err());
        assert_eq!(
            to_primitive(&JsValue::cast(CastKind::Char, JsValue::number(65)), &TypeSignature::Char).unwrap(),
            ManagedValue::Char(65)
        );
    }
}

//! Property tests for value marshaling and array bounds

mod common;

use common::fixture;
use conduit_bridge::marshal::numeric::{self, MAX_SAFE_INTEGER};
use conduit_bridge::BridgeError;
use conduit_sdk::{CastKind, JsValue, ManagedValue};
use proptest::prelude::*;

const ARRAY_SIGNATURES: [&str; 6] = ["[B", "[C", "[I", "[J", "[D", "[Ljava/lang/String;"];

fn elements(signature: &str, length: usize) -> Vec<ManagedValue> {
    (0..length)
        .map(|i| match signature {
            "[B" => ManagedValue::Byte(i as i8),
            "[C" => ManagedValue::Char(b'a' as u16 + i as u16),
            "[J" => ManagedValue::Long(i as i64),
            "[D" => ManagedValue::Double(i as f64),
            "[Ljava/lang/String;" => ManagedValue::String(i.to_string()),
            _ => ManagedValue::Int(i as i32),
        })
        .collect()
}

/// A value every element of `signature` accepts
fn storable(signature: &str) -> JsValue {
    match signature {
        "[C" | "[Ljava/lang/String;" => JsValue::string("x"),
        _ => JsValue::number(1),
    }
}

/// Write `value` into a one-element array of `signature` and read it back
fn store_and_load(signature: &str, initial: ManagedValue, value: &JsValue) -> JsValue {
    let f = fixture();
    let array = f.runtime.new_array(signature, vec![initial]).unwrap();
    f.bridge.set_array_element(array, 0, signature, value).unwrap();
    f.bridge.get_array_element(array, 0, signature).unwrap()
}

proptest! {
    #[test]
    fn array_get_succeeds_iff_in_bounds(
        signature in proptest::sample::select(ARRAY_SIGNATURES.to_vec()),
        length in 0usize..8,
        index in -16i64..16,
    ) {
        let f = fixture();
        let array = f.runtime.new_array(signature, elements(signature, length)).unwrap();

        let result = f.bridge.get_array_element(array, index, signature);
        if index >= 0 && (index as usize) < length {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result, Err(BridgeError::IndexOutOfRange { index, length }));
        }
    }

    #[test]
    fn array_set_succeeds_iff_in_bounds(
        signature in proptest::sample::select(ARRAY_SIGNATURES.to_vec()),
        length in 0usize..8,
        index in -16i64..16,
    ) {
        let f = fixture();
        let array = f.runtime.new_array(signature, elements(signature, length)).unwrap();
        let value = storable(signature);

        let result = f.bridge.set_array_element(array, index, signature, &value);
        if index >= 0 && (index as usize) < length {
            prop_assert!(result.is_ok());
            prop_assert_eq!(f.bridge.get_array_element(array, index, signature), Ok(value));
        } else {
            prop_assert_eq!(result, Err(BridgeError::IndexOutOfRange { index, length }));
        }
        prop_assert_eq!(f.runtime.element(array, length), None);
    }

    #[test]
    fn byte_elements_round_trip(v in any::<i8>()) {
        let value = JsValue::number(v);
        prop_assert_eq!(store_and_load("[B", ManagedValue::Byte(0), &value), value);
    }

    #[test]
    fn short_elements_round_trip(v in any::<i16>()) {
        let value = JsValue::number(v);
        prop_assert_eq!(store_and_load("[S", ManagedValue::Short(0), &value), value);
    }

    #[test]
    fn int_elements_round_trip(v in any::<i32>()) {
        let value = JsValue::number(v);
        prop_assert_eq!(store_and_load("[I", ManagedValue::Int(0), &value), value);
    }

    #[test]
    fn long_elements_round_trip(v in -MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER) {
        let value = JsValue::Number(v as f64);
        prop_assert_eq!(store_and_load("[J", ManagedValue::Long(0), &value), value);
    }

    #[test]
    fn float_elements_round_trip(v in any::<f32>().prop_filter("finite", |v| v.is_finite())) {
        let value = JsValue::Number(v as f64);
        prop_assert_eq!(store_and_load("[F", ManagedValue::Float(0.0), &value), value);
    }

    #[test]
    fn double_elements_round_trip(v in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
        let value = JsValue::Number(v);
        prop_assert_eq!(store_and_load("[D", ManagedValue::Double(0.0), &value), value);
    }

    #[test]
    fn char_elements_round_trip(c in any::<char>().prop_filter("one unit", |c| c.len_utf16() == 1)) {
        let value = JsValue::String(c.to_string());
        prop_assert_eq!(store_and_load("[C", ManagedValue::Char(0), &value), value);
    }

    #[test]
    fn long_cast_carries_any_long(v in any::<i64>()) {
        let value = JsValue::cast(CastKind::Long, JsValue::String(v.to_string()));
        let loaded = store_and_load("[J", ManagedValue::Long(0), &value);
        prop_assert_eq!(loaded, numeric::long_to_js(v));
    }

    #[test]
    fn int_narrowing_matches_range(v in any::<i64>()) {
        let narrowed = numeric::to_int(v as f64);
        let in_range = (i32::MIN as f64..=i32::MAX as f64).contains(&(v as f64));
        prop_assert_eq!(narrowed.is_ok(), in_range);
        if let Ok(n) = narrowed {
            prop_assert_eq!(n as f64, v as f64);
        }
    }

    #[test]
    fn fractions_never_narrow(whole in -1000i32..1000, frac in 0.001f64..0.999) {
        let n = whole as f64 + frac;
        prop_assert!(numeric::to_byte(n).is_err());
        prop_assert!(numeric::to_short(n).is_err());
        prop_assert!(numeric::to_int(n).is_err());
        prop_assert!(numeric::to_long(n).is_err());
    }
}

//! Bounds-checked array access

use conduit_sdk::{BridgeError, BridgeResult, JsValue, ManagedRuntime, ObjectHandle};

use super::Marshaler;

/// Length of a managed array
pub fn get_array_length(runtime: &dyn ManagedRuntime, array: ObjectHandle) -> BridgeResult<usize> {
    if !runtime.is_alive(array) {
        return Err(BridgeError::UnknownHandle(array.as_u32()));
    }
    runtime.array_length(array)
}

fn check_index(index: i64, length: usize) -> BridgeResult<usize> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < length)
        .ok_or(BridgeError::IndexOutOfRange { index, length })
}

/// Read `array[index]`. `signature` must match the array's runtime type.
pub fn get_array_element(
    m: &Marshaler<'_>,
    array: ObjectHandle,
    index: i64,
    signature: &str,
) -> BridgeResult<JsValue> {
    let length = get_array_length(m.runtime, array)?;
    let sig = m.objects.array_signature(array, signature)?;
    let index = check_index(index, length)?;
    let value = m.runtime.array_get(array, index)?;
    if !sig.admits(&value) {
        return Err(BridgeError::TypeMismatch {
            expected: format!("{} element", sig),
            got: value.type_name().to_string(),
        });
    }
    m.to_js(value)
}

/// Write `array[index] = value`, converting by the array's element type
pub fn set_array_element(
    m: &Marshaler<'_>,
    array: ObjectHandle,
    index: i64,
    signature: &str,
    value: &JsValue,
) -> BridgeResult<()> {
    let length = get_array_length(m.runtime, array)?;
    let sig = m.objects.array_signature(array, signature)?;
    let index = check_index(index, length)?;
    let value = m.to_managed(value, &sig.component)?;
    m.runtime.array_set(array, index, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_index() {
        assert_eq!(check_index(0, 3).unwrap(), 0);
        assert_eq!(check_index(2, 3).unwrap(), 2);
        assert_eq!(
            check_index(3, 3),
            Err(BridgeError::IndexOutOfRange { index: 3, length: 3 })
        );
        assert!(check_index(-1, 3).is_err());
        assert!(check_index(0, 0).is_err());
    }
}

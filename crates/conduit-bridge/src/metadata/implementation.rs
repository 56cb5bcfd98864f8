//! Scanning JavaScript implementation objects
//!
//! An implementation object is a plain object whose own callable properties
//! override managed methods and whose optional `interfaces` array names
//! extra interfaces to implement.

use std::hash::{Hash, Hasher};

use conduit_sdk::{BridgeError, BridgeResult, JsEngine, JsObjectId, JsValue, TypeDefinitionBuilder};
use rustc_hash::FxHasher;

use super::canonical_name;

/// Property listing implemented interfaces
pub const INTERFACES_PROPERTY: &str = "interfaces";

/// Own callable properties of `implementation`, in declaration order
pub fn get_method_overrides(engine: &dyn JsEngine, implementation: JsObjectId) -> BridgeResult<Vec<String>> {
    let mut overrides = Vec::new();
    for name in engine.own_property_names(implementation)? {
        if name == INTERFACES_PROPERTY || overrides.contains(&name) {
            continue;
        }
        let value = engine.get_property(implementation, &name)?;
        if engine.is_callable(&value) {
            overrides.push(name);
        }
    }
    Ok(overrides)
}

/// Names listed in the `interfaces` array, in declaration order
pub fn get_implemented_interfaces(
    engine: &dyn JsEngine,
    implementation: JsObjectId,
) -> BridgeResult<Vec<String>> {
    let list = match engine.get_property(implementation, INTERFACES_PROPERTY)? {
        JsValue::Undefined | JsValue::Null => return Ok(Vec::new()),
        JsValue::Object(id) => engine.array_elements(id)?,
        _ => None,
    };
    let elements = list.ok_or_else(|| {
        BridgeError::ArgumentError(format!("'{}' must be an array of type names", INTERFACES_PROPERTY))
    })?;

    let mut interfaces = Vec::with_capacity(elements.len());
    for element in elements {
        let name = match element {
            JsValue::String(s) => canonical_name(&s),
            other => {
                return Err(BridgeError::ArgumentError(format!(
                    "'{}' entries must be strings, got {}",
                    INTERFACES_PROPERTY,
                    other.type_name()
                )))
            }
        };
        if !interfaces.contains(&name) {
            interfaces.push(name);
        }
    }
    Ok(interfaces)
}

/// Deterministic name for the generated type described by `builder`
pub fn generated_type_name(builder: &TypeDefinitionBuilder) -> String {
    let mut hasher = FxHasher::default();
    builder.base().hash(&mut hasher);
    builder.is_interface().hash(&mut hasher);
    builder.overrides().hash(&mut hasher);
    builder.interfaces().hash(&mut hasher);
    format!("{}_conduit_{:016x}", builder.base(), hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_harness::InMemoryEngine;
    use conduit_sdk::TypeDefinition;

    fn noop(engine: &InMemoryEngine) -> JsValue {
        engine.new_function(|_, _, _| Ok(JsValue::Undefined))
    }

    #[test]
    fn test_runnable_implementation() {
        let engine = InMemoryEngine::new();
        let interfaces = engine.new_array(vec![JsValue::string("Runnable")]);
        let run = noop(&engine);
        let implementation = engine.object_with(vec![("interfaces", interfaces), ("run", run)]);

        assert_eq!(get_implemented_interfaces(&engine, implementation).unwrap(), ["Runnable"]);
        assert_eq!(get_method_overrides(&engine, implementation).unwrap(), ["run"]);
    }

    #[test]
    fn test_overrides_skip_non_callables() {
        let engine = InMemoryEngine::new();
        let (a, b) = (noop(&engine), noop(&engine));
        let implementation = engine.object_with(vec![
            ("toString", a),
            ("label", JsValue::string("x")),
            ("hashCode", b),
        ]);
        assert_eq!(
            get_method_overrides(&engine, implementation).unwrap(),
            ["toString", "hashCode"]
        );
        assert!(get_implemented_interfaces(&engine, implementation).unwrap().is_empty());
    }

    #[test]
    fn test_interfaces_must_be_array_of_strings() {
        let engine = InMemoryEngine::new();
        let bad = engine.object_with(vec![("interfaces", JsValue::string("Runnable"))]);
        assert!(matches!(
            get_implemented_interfaces(&engine, bad),
            Err(BridgeError::ArgumentError(_))
        ));

        let list = engine.new_array(vec![JsValue::number(1)]);
        let bad = engine.object_with(vec![("interfaces", list)]);
        assert!(get_implemented_interfaces(&engine, bad).is_err());
    }

    #[test]
    fn test_generated_name_is_deterministic() {
        let a = TypeDefinition::builder("com.example.Widget").override_method("run");
        let b = TypeDefinition::builder("com.example.Widget").override_method("run");
        let c = TypeDefinition::builder("com.example.Widget").override_method("stop");

        assert_eq!(generated_type_name(&a), generated_type_name(&b));
        assert_ne!(generated_type_name(&a), generated_type_name(&c));
        assert!(generated_type_name(&a).starts_with("com.example.Widget_conduit_"));
    }
}

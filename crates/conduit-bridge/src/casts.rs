//! Global numeric cast helpers: `byte`, `short`, `char`, `long`, `float`, `double`

use conduit_sdk::{BridgeError, CastKind, GlobalFunctionRegistry};

use crate::marshal::numeric;

/// Register one cast function per [`CastKind`]
pub fn create_global_cast_functions(registry: &mut GlobalFunctionRegistry) {
    for kind in CastKind::ALL {
        registry.register(kind.function_name(), move |args| match args {
            [value] => numeric::cast(kind, value),
            _ => Err(BridgeError::ArgumentError(format!(
                "{}() takes 1 argument, got {}",
                kind.function_name(),
                args.len()
            ))),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_sdk::JsValue;

    #[test]
    fn test_registers_all_casts() {
        let mut registry = GlobalFunctionRegistry::new();
        create_global_cast_functions(&mut registry);
        assert_eq!(registry.names(), ["byte", "short", "char", "long", "float", "double"]);
    }

    #[test]
    fn test_cast_functions_validate() {
        let mut registry = GlobalFunctionRegistry::new();
        create_global_cast_functions(&mut registry);

        let short = registry.get("short").unwrap();
        assert_eq!(
            short(&[JsValue::number(-5)]).unwrap(),
            JsValue::cast(CastKind::Short, JsValue::number(-5))
        );
        assert!(matches!(
            short(&[JsValue::number(40000)]),
            Err(BridgeError::NumericRangeError { target: "short", .. })
        ));
        assert!(matches!(short(&[]), Err(BridgeError::ArgumentError(_))));

        let ch = registry.get("char").unwrap();
        assert!(ch(&[JsValue::string("x")]).is_ok());
        assert!(ch(&[JsValue::string("xy")]).is_err());
    }
}

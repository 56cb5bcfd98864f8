//! Native functions exposed to JavaScript
//!
//! The bridge publishes a handful of global functions (cast helpers,
//! logging, diagnostics). They are collected in a [`GlobalFunctionRegistry`]
//! and handed to the engine in one pass.

use std::sync::Arc;

use crate::error::BridgeResult;
use crate::value::JsValue;

/// A native function callable from JavaScript
pub type NativeFunction = Arc<dyn Fn(&[JsValue]) -> BridgeResult<JsValue> + Send + Sync>;

/// Registry of global native functions indexed by name.
///
/// Preserves registration order so installation is deterministic.
#[derive(Default)]
pub struct GlobalFunctionRegistry {
    functions: Vec<(String, NativeFunction)>,
}

impl GlobalFunctionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
        }
    }

    /// Register a function by name, replacing an earlier registration
    pub fn register(
        &mut self,
        name: &str,
        function: impl Fn(&[JsValue]) -> BridgeResult<JsValue> + Send + Sync + 'static,
    ) {
        let function: NativeFunction = Arc::new(function);
        match self.functions.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = function,
            None => self.functions.push((name.to_string(), function)),
        }
    }

    /// Get a function by name
    pub fn get(&self, name: &str) -> Option<NativeFunction> {
        self.functions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, f)| f.clone())
    }

    /// Check if a function is registered
    pub fn contains(&self, name: &str) -> bool {
        self.functions.iter().any(|(n, _)| n == name)
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.functions.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Iterate over `(name, function)` pairs in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &NativeFunction)> + '_ {
        self.functions.iter().map(|(n, f)| (n.as_str(), f))
    }

    /// Get the number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl std::fmt::Debug for GlobalFunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalFunctionRegistry")
            .field("names", &self.names())
            .finish()
    }
}

//! JsEngine trait: the JavaScript side of the boundary
//!
//! The engine runs one isolate on one thread. The bridge only calls these
//! methods from that thread; `Send + Sync` is required so the service object
//! holding the engine can be shared with managed threads that queue callbacks.

use std::sync::Arc;

use crate::error::BridgeResult;
use crate::handler::NativeFunction;
use crate::value::{JsObjectId, JsValue};

/// GC visibility of a wrapper in the JavaScript heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strength {
    /// Collectable once unreachable
    Weak,
    /// Pinned; never collected
    Strong,
}

/// Invoked by the engine after its GC collected a weak wrapper
pub type CollectionHook = Arc<dyn Fn(JsObjectId) + Send + Sync>;

/// Abstract JavaScript engine
pub trait JsEngine: Send + Sync {
    /// Allocate a wrapper object for a managed instance of `type_name`
    fn create_wrapper(&self, type_name: &str) -> BridgeResult<JsObjectId>;

    /// Read a property, walking the prototype chain
    fn get_property(&self, object: JsObjectId, name: &str) -> BridgeResult<JsValue>;

    /// Write an own property
    fn set_property(&self, object: JsObjectId, name: &str, value: JsValue) -> BridgeResult<()>;

    /// Replace an object's prototype
    fn set_prototype(&self, object: JsObjectId, prototype: JsObjectId) -> BridgeResult<()>;

    /// Own enumerable property names in declaration order
    fn own_property_names(&self, object: JsObjectId) -> BridgeResult<Vec<String>>;

    /// Check whether a value can be called
    fn is_callable(&self, value: &JsValue) -> bool;

    /// Elements of an array object, or `None` if the object is not an array
    fn array_elements(&self, object: JsObjectId) -> BridgeResult<Option<Vec<JsValue>>>;

    /// Call `function` with `receiver` as `this`
    fn call_function(
        &self,
        function: &JsValue,
        receiver: &JsValue,
        args: &[JsValue],
    ) -> BridgeResult<JsValue>;

    /// Change a wrapper's GC visibility
    fn set_wrapper_strength(&self, object: JsObjectId, strength: Strength);

    /// Report external memory; returns the engine's new external total
    fn adjust_external_memory(&self, delta: i64) -> i64;

    /// Install a native function under a global name
    fn install_global_function(&self, name: &str, function: NativeFunction) -> BridgeResult<()>;

    /// Register the hook invoked after a weak wrapper is collected
    fn set_collection_hook(&self, hook: CollectionHook);
}

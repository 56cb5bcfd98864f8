//! ManagedRuntime trait: the managed side of the boundary
//!
//! Defines the narrow native-call interface the bridge consumes. The bridge
//! never sees managed-runtime internals: it addresses objects by
//! [`ObjectHandle`], types by [`TypeHandle`] and members by previously
//! resolved [`MetadataEntry`] descriptors.

use crate::error::BridgeResult;
use crate::metadata::MetadataEntry;
use crate::type_def::TypeDefinition;
use crate::value::{ManagedValue, ObjectHandle, TypeHandle};

/// Receiver of a member access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTarget {
    /// Instance member on an object
    Instance(ObjectHandle),
    /// Static member on a type
    Static(TypeHandle),
}

/// Method dispatch mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Most-derived override
    Virtual,
    /// The implementation declared by the given ancestor type
    NonVirtual(TypeHandle),
}

/// Abstract managed runtime.
///
/// Every method may be called from the JavaScript thread while a
/// managed-initiated callback is on the stack, so implementations must not
/// hold internal locks across calls back into the bridge.
pub trait ManagedRuntime: Send + Sync {
    // ========================================================================
    // Type resolution
    // ========================================================================

    /// Resolve a type by fully-qualified name
    fn find_class(&self, name: &str) -> BridgeResult<TypeHandle>;

    /// Generate a concrete type from a definition and return its handle
    fn generate_class(&self, definition: &TypeDefinition) -> BridgeResult<TypeHandle>;

    /// Fully-qualified name of a resolved type
    fn class_name(&self, ty: TypeHandle) -> BridgeResult<String>;

    /// Runtime type of an object
    fn class_of(&self, object: ObjectHandle) -> BridgeResult<TypeHandle>;

    /// Reflective class object for a type
    fn class_object(&self, ty: TypeHandle) -> BridgeResult<ObjectHandle>;

    /// One batch of encoded member descriptors (see [`crate::wire`])
    fn type_metadata(&self, name: &str, index: usize, batch_size: usize) -> BridgeResult<Vec<String>>;

    // ========================================================================
    // Instances and members
    // ========================================================================

    /// Reserve an object ID for an instance about to be constructed
    fn reserve_object_id(&self) -> ObjectHandle;

    /// Construct an instance.
    ///
    /// When a current object ID is set the new object must be registered
    /// under it; otherwise the runtime picks a fresh ID.
    fn new_instance(
        &self,
        ty: TypeHandle,
        constructor: &MetadataEntry,
        args: &[ManagedValue],
    ) -> BridgeResult<ObjectHandle>;

    /// Invoke a method
    fn call_method(
        &self,
        target: CallTarget,
        method: &MetadataEntry,
        dispatch: Dispatch,
        args: &[ManagedValue],
    ) -> BridgeResult<ManagedValue>;

    /// Read a field
    fn get_field(&self, target: CallTarget, field: &MetadataEntry) -> BridgeResult<ManagedValue>;

    /// Write a field
    fn set_field(
        &self,
        target: CallTarget,
        field: &MetadataEntry,
        value: ManagedValue,
    ) -> BridgeResult<()>;

    // ========================================================================
    // Arrays
    // ========================================================================

    /// Reported length of an array
    fn array_length(&self, array: ObjectHandle) -> BridgeResult<usize>;

    /// Read an element; the bridge has already bounds-checked `index`
    fn array_get(&self, array: ObjectHandle, index: usize) -> BridgeResult<ManagedValue>;

    /// Write an element; the bridge has already bounds-checked `index`
    fn array_set(&self, array: ObjectHandle, index: usize, value: ManagedValue) -> BridgeResult<()>;

    // ========================================================================
    // Reference strength
    // ========================================================================

    /// Check whether the runtime still knows the object
    fn is_alive(&self, object: ObjectHandle) -> bool;

    /// Pin the object so the managed GC cannot collect it
    fn make_strong(&self, object: ObjectHandle) -> BridgeResult<()>;

    /// Undo one `make_strong`
    fn make_weak(&self, object: ObjectHandle) -> BridgeResult<()>;

    /// Drop the bridge's reference; the ID may be reused afterwards
    fn release(&self, object: ObjectHandle) -> BridgeResult<()>;

    /// Set the per-call object-ID context field (`None` is the idle sentinel)
    fn set_current_object_id(&self, object: Option<ObjectHandle>);

    /// Read the per-call object-ID context field
    fn current_object_id(&self) -> Option<ObjectHandle>;

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Net change in managed heap bytes since the previous call
    fn take_memory_delta(&self) -> BridgeResult<i64>;

    /// Toggle the runtime's own verbose logging
    fn set_verbose_logging(&self, enabled: bool);

    /// Human-readable dump of the runtime's reference tables
    fn dump_reference_tables(&self) -> String;
}

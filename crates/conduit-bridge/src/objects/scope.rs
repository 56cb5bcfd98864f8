//! Scoped acquisitions around cross-boundary calls

use conduit_sdk::{ManagedRuntime, ObjectHandle};

use super::ObjectManager;

/// RAII guard for the runtime's current-object-ID context
///
/// Sets the context on creation and restores the previous value on drop,
/// so nested constructions unwind correctly on every exit path.
pub struct ObjectIdScope<'a> {
    runtime: &'a dyn ManagedRuntime,
    previous: Option<ObjectHandle>,
}

impl<'a> ObjectIdScope<'a> {
    pub fn new(runtime: &'a dyn ManagedRuntime, object: ObjectHandle) -> Self {
        let previous = runtime.current_object_id();
        runtime.set_current_object_id(Some(object));
        Self { runtime, previous }
    }
}

impl Drop for ObjectIdScope<'_> {
    fn drop(&mut self) {
        self.runtime.set_current_object_id(self.previous);
    }
}

/// RAII guard holding a receiver strong for a managed-initiated call
///
/// Created by [`ObjectManager::enter_call`]; demotes on drop.
pub struct CallScope<'a> {
    manager: &'a ObjectManager,
    handle: ObjectHandle,
}

impl<'a> CallScope<'a> {
    pub(super) fn new(manager: &'a ObjectManager, handle: ObjectHandle) -> Self {
        Self { manager, handle }
    }

    /// Receiver held by this scope
    pub fn handle(&self) -> ObjectHandle {
        self.handle
    }
}

impl Drop for CallScope<'_> {
    fn drop(&mut self) {
        self.manager.leave_call(self.handle);
    }
}

//! Object identity management
//!
//! Pairs managed-runtime object handles with JavaScript wrappers and keeps
//! the two garbage collectors in agreement:
//!
//! - **Identity**: at most one wrapper per live handle and vice versa
//! - **Strength**: a receiver of a managed-initiated call is strong for the
//!   call's duration, weak otherwise
//! - **Release**: a collected wrapper releases its handle on the managed side
//!
//! The table lock is held only for table mutation, never across a call into
//! either collaborator.

mod memory;
mod scope;
mod table;

use std::sync::Arc;

use conduit_sdk::{
    BridgeError, BridgeResult, JsEngine, JsObjectId, ManagedRuntime, ObjectHandle, Strength,
};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::marshal::ArraySignature;

pub use memory::MemoryPressure;
pub use scope::{CallScope, ObjectIdScope};
pub use table::{HandleSlot, HandleState, HandleTable};

/// Owner of the handle table
pub struct ObjectManager {
    runtime: Arc<dyn ManagedRuntime>,
    engine: Arc<dyn JsEngine>,
    table: Mutex<HandleTable>,
    memory: MemoryPressure,
}

impl ObjectManager {
    pub fn new(
        runtime: Arc<dyn ManagedRuntime>,
        engine: Arc<dyn JsEngine>,
        memory_report_interval: u32,
    ) -> Self {
        Self {
            runtime,
            engine,
            table: Mutex::new(HandleTable::new()),
            memory: MemoryPressure::new(memory_report_interval),
        }
    }

    /// Return the wrapper for `handle`, creating and binding one if needed.
    /// A handle whose construction is still in flight is `UnknownHandle`.
    pub fn create_js_wrapper(&self, handle: ObjectHandle, type_name: &str) -> BridgeResult<JsObjectId> {
        if let Some(slot) = self.table.lock().get(handle) {
            return Self::visible_wrapper(handle, slot);
        }
        if !self.runtime.is_alive(handle) {
            return Err(BridgeError::UnknownHandle(handle.as_u32()));
        }

        let wrapper = self.engine.create_wrapper(type_name)?;
        let mut table = self.table.lock();
        if let Some(slot) = table.get(handle) {
            return Self::visible_wrapper(handle, slot);
        }
        table.insert(handle, wrapper, HandleState::Bound, type_name)?;
        trace!(handle = handle.as_u32(), wrapper = wrapper.as_u64(), type_name, "bound wrapper");
        Ok(wrapper)
    }

    fn visible_wrapper(handle: ObjectHandle, slot: &HandleSlot) -> BridgeResult<JsObjectId> {
        match slot.state {
            HandleState::Bound => Ok(slot.wrapper),
            HandleState::Pending => Err(BridgeError::UnknownHandle(handle.as_u32())),
        }
    }

    /// Wrapper bound to `handle`, as seen from JavaScript
    pub fn lookup(&self, handle: ObjectHandle) -> BridgeResult<JsObjectId> {
        match self.table.lock().get(handle) {
            Some(slot) => Self::visible_wrapper(handle, slot),
            None => Err(BridgeError::UnknownHandle(handle.as_u32())),
        }
    }

    /// Wrapper for `handle` on the callback path; pending handles included
    pub fn callback_wrapper(&self, handle: ObjectHandle) -> BridgeResult<JsObjectId> {
        self.table
            .lock()
            .get(handle)
            .map(|slot| slot.wrapper)
            .ok_or(BridgeError::UnknownHandle(handle.as_u32()))
    }

    /// Handle bound to `wrapper`, if fully constructed
    pub fn handle_of(&self, wrapper: JsObjectId) -> Option<ObjectHandle> {
        let table = self.table.lock();
        let handle = table.handle_of(wrapper)?;
        match table.get(handle) {
            Some(slot) if slot.state == HandleState::Bound => Some(handle),
            _ => None,
        }
    }

    /// Handle linked to `wrapper` on the callback path; pending handles included
    pub fn callback_handle_of(&self, wrapper: JsObjectId) -> Option<ObjectHandle> {
        self.table.lock().handle_of(wrapper)
    }

    /// Whether `wrapper` is linked to a handle whose construction is in flight
    pub fn is_pending(&self, wrapper: JsObjectId) -> bool {
        let table = self.table.lock();
        table
            .handle_of(wrapper)
            .and_then(|h| table.get(h))
            .map_or(false, |slot| slot.state == HandleState::Pending)
    }

    /// Link a reserved ID to `wrapper` before the managed object exists
    pub fn link_pending(&self, handle: ObjectHandle, wrapper: JsObjectId, type_name: &str) -> BridgeResult<()> {
        self.table
            .lock()
            .insert(handle, wrapper, HandleState::Pending, type_name)
    }

    /// Promote a pending link once construction succeeded. `actual` is the
    /// handle the runtime registered the object under.
    pub fn commit(&self, reserved: ObjectHandle, actual: ObjectHandle) -> BridgeResult<()> {
        let mut table = self.table.lock();
        match table.get(reserved) {
            Some(slot) if slot.state == HandleState::Pending => {}
            _ => return Err(BridgeError::UnknownHandle(reserved.as_u32())),
        }
        table.rekey(reserved, actual)?;
        if let Some(slot) = table.get_mut(actual) {
            slot.state = HandleState::Bound;
        }
        Ok(())
    }

    /// Drop a pending link after construction failed
    pub fn abort(&self, reserved: ObjectHandle) {
        let mut table = self.table.lock();
        if matches!(table.get(reserved), Some(slot) if slot.state == HandleState::Pending) {
            table.remove(reserved);
        }
    }

    /// Explicitly release a bound handle
    pub fn release(&self, handle: ObjectHandle) -> BridgeResult<()> {
        let slot = {
            let mut table = self.table.lock();
            match table.get(handle) {
                None => return Err(BridgeError::UnknownHandle(handle.as_u32())),
                Some(slot) if slot.strong_depth > 0 => {
                    return Err(BridgeError::ArgumentError(format!(
                        "handle {} is the receiver of an active call",
                        handle
                    )))
                }
                Some(_) => {}
            }
            table.remove(handle)
        };
        if let Some(slot) = slot {
            debug!(handle = handle.as_u32(), wrapper = slot.wrapper.as_u64(), "released handle");
        }
        self.runtime.release(handle)
    }

    /// The engine collected `wrapper`; release its handle. Failures leak the
    /// managed object and are logged.
    pub fn wrapper_collected(&self, wrapper: JsObjectId) {
        let removed = self.table.lock().remove_wrapper(wrapper);
        let Some((handle, slot)) = removed else {
            return;
        };
        if slot.strong_depth > 0 {
            warn!(handle = handle.as_u32(), "collected wrapper of an active receiver");
        }
        if slot.state == HandleState::Pending {
            trace!(handle = handle.as_u32(), "collected wrapper of a pending handle");
            return;
        }
        match self.runtime.release(handle) {
            Ok(()) => trace!(handle = handle.as_u32(), "released collected wrapper"),
            Err(e) => warn!(
                handle = handle.as_u32(),
                error = %e,
                "failed to release handle of collected wrapper; managed object leaked"
            ),
        }
    }

    /// Hold `handle` strong until the returned scope drops
    pub fn enter_call(&self, handle: ObjectHandle) -> BridgeResult<CallScope<'_>> {
        let (wrapper, promote) = {
            let mut table = self.table.lock();
            let slot = table
                .get_mut(handle)
                .ok_or(BridgeError::UnknownHandle(handle.as_u32()))?;
            slot.strong_depth += 1;
            (slot.wrapper, slot.strong_depth == 1)
        };
        if promote {
            if let Err(e) = self.runtime.make_strong(handle) {
                if let Some(slot) = self.table.lock().get_mut(handle) {
                    slot.strong_depth -= 1;
                }
                return Err(e);
            }
            self.engine.set_wrapper_strength(wrapper, Strength::Strong);
        }
        Ok(CallScope::new(self, handle))
    }

    pub(crate) fn leave_call(&self, handle: ObjectHandle) {
        let demote = {
            let mut table = self.table.lock();
            match table.get_mut(handle) {
                Some(slot) if slot.strong_depth > 0 => {
                    slot.strong_depth -= 1;
                    (slot.strong_depth == 0).then_some(slot.wrapper)
                }
                _ => None,
            }
        };
        if let Some(wrapper) = demote {
            self.engine.set_wrapper_strength(wrapper, Strength::Weak);
            if let Err(e) = self.runtime.make_weak(handle) {
                warn!(handle = handle.as_u32(), error = %e, "failed to weaken receiver");
            }
        }
    }

    /// Current strength of a handle
    pub fn strength(&self, handle: ObjectHandle) -> Option<Strength> {
        self.table.lock().get(handle).map(|slot| {
            if slot.strong_depth > 0 {
                Strength::Strong
            } else {
                Strength::Weak
            }
        })
    }

    /// Type name a linked handle was wrapped as
    pub fn type_name(&self, handle: ObjectHandle) -> Option<String> {
        self.table.lock().get(handle).map(|slot| slot.type_name.clone())
    }

    /// Signature of an array, derived from its runtime class and cached in
    /// the slot of a linked handle. `requested` must describe the same array
    /// type; object names may use either slash or dotted form.
    pub fn array_signature(&self, array: ObjectHandle, requested: &str) -> BridgeResult<Arc<ArraySignature>> {
        let cached = self
            .table
            .lock()
            .get(array)
            .and_then(|slot| slot.array_signature.clone());
        let actual = match cached {
            Some(actual) => actual,
            None => {
                let class = self.runtime.class_name(self.runtime.class_of(array)?)?;
                let actual = Arc::new(ArraySignature::parse(&class).map_err(|_| BridgeError::TypeMismatch {
                    expected: "array".to_string(),
                    got: class.clone(),
                })?);
                if let Some(slot) = self.table.lock().get_mut(array) {
                    slot.array_signature = Some(actual.clone());
                }
                actual
            }
        };

        if actual.to_string() != requested {
            let parsed = ArraySignature::parse(requested)?;
            if parsed.canonical() != actual.canonical() {
                return Err(BridgeError::TypeMismatch {
                    expected: actual.to_string(),
                    got: requested.to_string(),
                });
            }
        }
        Ok(actual)
    }

    /// Memory-pressure reporter
    pub fn memory(&self) -> &MemoryPressure {
        &self.memory
    }

    /// Count a bridged call for memory-pressure reporting
    pub fn tick(&self) {
        self.memory.tick(self.runtime.as_ref(), self.engine.as_ref());
    }

    /// Report memory pressure now
    pub fn report_memory(&self) {
        self.memory.report(self.runtime.as_ref(), self.engine.as_ref());
    }

    /// Number of linked handles (bound and pending)
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.lock().is_empty()
    }

    /// Text report of the handle table, one line per handle
    pub fn dump(&self) -> String {
        let table = self.table.lock();
        let mut out = format!(
            "handle table: {} linked, {} released\n",
            table.len(),
            table.released()
        );
        for (handle, slot) in table.sorted() {
            let state = match slot.state {
                HandleState::Pending => "pending",
                HandleState::Bound => "bound",
            };
            let array = slot
                .array_signature
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&format!(
                "  {} -> wrapper {} [{}] strong_depth={} array={} type={}\n",
                handle,
                slot.wrapper.as_u64(),
                state,
                slot.strong_depth,
                array,
                slot.type_name
            ));
        }
        out
    }

    /// Unpair everything and release bound handles on the managed side
    pub fn release_all(&self) {
        let slots = self.table.lock().drain();
        for (handle, slot) in slots {
            if slot.strong_depth > 0 {
                self.engine.set_wrapper_strength(slot.wrapper, Strength::Weak);
                for _ in 0..slot.strong_depth {
                    if let Err(e) = self.runtime.make_weak(handle) {
                        warn!(handle = handle.as_u32(), error = %e, "failed to weaken handle at shutdown");
                        break;
                    }
                }
            }
            if slot.state == HandleState::Pending {
                continue;
            }
            if let Err(e) = self.runtime.release(handle) {
                warn!(handle = handle.as_u32(), error = %e, "failed to release handle at shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_harness::{CallCounters, InMemoryEngine, InMemoryRuntime};

    fn manager() -> (Arc<InMemoryRuntime>, Arc<InMemoryEngine>, ObjectManager) {
        let runtime = Arc::new(InMemoryRuntime::new());
        let engine = Arc::new(InMemoryEngine::new());
        let manager = ObjectManager::new(runtime.clone(), engine.clone(), 0);
        (runtime, engine, manager)
    }

    #[test]
    fn test_create_js_wrapper_is_idempotent() {
        let (runtime, _engine, manager) = manager();
        let h = runtime.allocate("java.lang.Object").unwrap();

        let w1 = manager.create_js_wrapper(h, "java.lang.Object").unwrap();
        let w2 = manager.create_js_wrapper(h, "java.lang.Object").unwrap();
        assert_eq!(w1, w2);
        assert_eq!(manager.lookup(h).unwrap(), w1);
        assert_eq!(manager.handle_of(w1), Some(h));
    }

    #[test]
    fn test_released_handle_is_unknown() {
        let (runtime, _engine, manager) = manager();
        let h = runtime.allocate("java.lang.Object").unwrap();
        manager.create_js_wrapper(h, "java.lang.Object").unwrap();

        manager.release(h).unwrap();
        assert_eq!(manager.lookup(h), Err(BridgeError::UnknownHandle(h.as_u32())));
        assert_eq!(
            manager.create_js_wrapper(h, "java.lang.Object"),
            Err(BridgeError::UnknownHandle(h.as_u32()))
        );
        assert!(!runtime.is_alive(h));
    }

    #[test]
    fn test_pending_handle_hidden_from_javascript() {
        let (runtime, engine, manager) = manager();
        let wrapper = engine.new_object();
        let h = runtime.reserve_object_id();

        manager.link_pending(h, wrapper, "java.lang.Object").unwrap();
        assert!(manager.handle_of(wrapper).is_none());
        assert_eq!(manager.lookup(h), Err(BridgeError::UnknownHandle(h.as_u32())));
        assert_eq!(
            manager.create_js_wrapper(h, "java.lang.Object"),
            Err(BridgeError::UnknownHandle(h.as_u32()))
        );
        assert_eq!(manager.callback_wrapper(h).unwrap(), wrapper);
        assert_eq!(manager.callback_handle_of(wrapper), Some(h));

        manager.commit(h, h).unwrap();
        assert_eq!(manager.handle_of(wrapper), Some(h));
        assert_eq!(manager.create_js_wrapper(h, "java.lang.Object"), Ok(wrapper));
    }

    #[test]
    fn test_collected_pending_wrapper_skips_release() {
        let (runtime, engine, manager) = manager();
        let wrapper = engine.new_object();
        let h = runtime.reserve_object_id();
        manager.link_pending(h, wrapper, "java.lang.Object").unwrap();

        let releases = CallCounters::get(&runtime.counters().release);
        manager.wrapper_collected(wrapper);
        assert!(manager.is_empty());
        assert_eq!(CallCounters::get(&runtime.counters().release), releases);
    }

    #[test]
    fn test_abort_unlinks_pending() {
        let (runtime, engine, manager) = manager();
        let wrapper = engine.new_object();
        let h = runtime.reserve_object_id();

        manager.link_pending(h, wrapper, "java.lang.Object").unwrap();
        manager.abort(h);
        assert!(manager.is_empty());
        assert!(manager.commit(h, h).is_err());
    }

    #[test]
    fn test_call_scope_nests() {
        let (runtime, engine, manager) = manager();
        let h = runtime.allocate("java.lang.Object").unwrap();
        let w = manager.create_js_wrapper(h, "java.lang.Object").unwrap();

        {
            let _outer = manager.enter_call(h).unwrap();
            {
                let _inner = manager.enter_call(h).unwrap();
                assert_eq!(runtime.strong_count(h), 1);
            }
            assert_eq!(manager.strength(h), Some(Strength::Strong));
            assert_eq!(engine.strength_of(w), Some(Strength::Strong));
        }
        assert_eq!(manager.strength(h), Some(Strength::Weak));
        assert_eq!(engine.strength_of(w), Some(Strength::Weak));
        assert_eq!(runtime.strong_count(h), 0);
    }

    #[test]
    fn test_release_refused_during_call() {
        let (runtime, _engine, manager) = manager();
        let h = runtime.allocate("java.lang.Object").unwrap();
        manager.create_js_wrapper(h, "java.lang.Object").unwrap();

        let scope = manager.enter_call(h).unwrap();
        assert!(matches!(manager.release(h), Err(BridgeError::ArgumentError(_))));
        drop(scope);
        manager.release(h).unwrap();
    }

    #[test]
    fn test_dump_lists_handles() {
        let (runtime, _engine, manager) = manager();
        let h = runtime.new_array("[I", vec![]).unwrap();
        manager.create_js_wrapper(h, "[I").unwrap();
        manager.array_signature(h, "[I").unwrap();
        assert!(matches!(
            manager.array_signature(h, "[B"),
            Err(BridgeError::TypeMismatch { .. })
        ));

        let dump = manager.dump();
        assert!(dump.contains("1 linked"));
        assert!(dump.contains("array=[I"));
    }
}

//! Handle table: one slot per bound or pending managed object

use std::sync::Arc;

use conduit_sdk::{BridgeError, BridgeResult, JsObjectId, ObjectHandle};
use rustc_hash::FxHashMap;

use crate::marshal::ArraySignature;

/// Binding state of a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Linked during construction; visible to the callback path only
    Pending,
    /// Fully constructed and visible to JavaScript
    Bound,
}

/// Per-handle bookkeeping
#[derive(Debug, Clone)]
pub struct HandleSlot {
    /// Paired wrapper
    pub wrapper: JsObjectId,
    /// Binding state
    pub state: HandleState,
    /// Nesting depth of managed-initiated calls on this receiver
    pub strong_depth: u32,
    /// Cached array signature, for array handles
    pub array_signature: Option<Arc<ArraySignature>>,
    /// Managed type name the wrapper was created for
    pub type_name: String,
}

/// Bidirectional handle/wrapper map
#[derive(Debug, Default)]
pub struct HandleTable {
    by_handle: FxHashMap<ObjectHandle, HandleSlot>,
    by_wrapper: FxHashMap<JsObjectId, ObjectHandle>,
    released: u64,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new pairing. Both sides must be unpaired.
    pub fn insert(
        &mut self,
        handle: ObjectHandle,
        wrapper: JsObjectId,
        state: HandleState,
        type_name: &str,
    ) -> BridgeResult<()> {
        if self.by_handle.contains_key(&handle) {
            return Err(BridgeError::ArgumentError(format!(
                "handle {} is already bound",
                handle
            )));
        }
        if let Some(other) = self.by_wrapper.get(&wrapper) {
            return Err(BridgeError::ArgumentError(format!(
                "wrapper {} is already bound to handle {}",
                wrapper.as_u64(),
                other
            )));
        }
        self.by_wrapper.insert(wrapper, handle);
        self.by_handle.insert(
            handle,
            HandleSlot {
                wrapper,
                state,
                strong_depth: 0,
                array_signature: None,
                type_name: type_name.to_string(),
            },
        );
        Ok(())
    }

    pub fn get(&self, handle: ObjectHandle) -> Option<&HandleSlot> {
        self.by_handle.get(&handle)
    }

    pub fn get_mut(&mut self, handle: ObjectHandle) -> Option<&mut HandleSlot> {
        self.by_handle.get_mut(&handle)
    }

    /// Handle paired with `wrapper`, in any state
    pub fn handle_of(&self, wrapper: JsObjectId) -> Option<ObjectHandle> {
        self.by_wrapper.get(&wrapper).copied()
    }

    /// Move a slot to a different handle (the runtime chose its own ID)
    pub fn rekey(&mut self, from: ObjectHandle, to: ObjectHandle) -> BridgeResult<()> {
        if from == to {
            return Ok(());
        }
        if self.by_handle.contains_key(&to) {
            return Err(BridgeError::ArgumentError(format!(
                "handle {} is already bound",
                to
            )));
        }
        let slot = self
            .by_handle
            .remove(&from)
            .ok_or(BridgeError::UnknownHandle(from.as_u32()))?;
        self.by_wrapper.insert(slot.wrapper, to);
        self.by_handle.insert(to, slot);
        Ok(())
    }

    /// Remove a pairing by handle
    pub fn remove(&mut self, handle: ObjectHandle) -> Option<HandleSlot> {
        let slot = self.by_handle.remove(&handle)?;
        self.by_wrapper.remove(&slot.wrapper);
        self.released += 1;
        Some(slot)
    }

    /// Remove a pairing by wrapper
    pub fn remove_wrapper(&mut self, wrapper: JsObjectId) -> Option<(ObjectHandle, HandleSlot)> {
        let handle = self.by_wrapper.get(&wrapper).copied()?;
        self.remove(handle).map(|slot| (handle, slot))
    }

    /// Remove every pairing
    pub fn drain(&mut self) -> Vec<(ObjectHandle, HandleSlot)> {
        self.by_wrapper.clear();
        let mut slots: Vec<_> = self.by_handle.drain().collect();
        self.released += slots.len() as u64;
        slots.sort_by_key(|(h, _)| *h);
        slots
    }

    /// Slots ordered by handle
    pub fn sorted(&self) -> Vec<(ObjectHandle, &HandleSlot)> {
        let mut slots: Vec<_> = self.by_handle.iter().map(|(h, s)| (*h, s)).collect();
        slots.sort_by_key(|(h, _)| *h);
        slots
    }

    pub fn len(&self) -> usize {
        self.by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_handle.is_empty()
    }

    /// Number of pairings removed so far
    pub fn released(&self) -> u64 {
        self.released
    }
}

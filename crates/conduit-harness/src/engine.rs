//! In-memory JavaScript engine
//!
//! Objects live in a flat heap keyed by [`JsObjectId`]. Only bridge wrappers
//! are collectable: plain objects, functions and arrays are treated as
//! permanently reachable, which keeps tests free of rooting bookkeeping while
//! still exercising wrapper strength.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use conduit_sdk::{
    BridgeError, BridgeResult, CollectionHook, JsEngine, JsObjectId, JsValue, NativeFunction, Strength,
};
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};

/// Body of a script function: engine, `this`, arguments
pub type FunctionBody =
    Arc<dyn Fn(&InMemoryEngine, &JsValue, &[JsValue]) -> BridgeResult<JsValue> + Send + Sync>;

#[derive(Clone)]
enum ObjectKind {
    Plain,
    Wrapper(String),
    Function(FunctionBody),
    Native(NativeFunction),
    Array(Vec<JsValue>),
}

struct JsObjectData {
    kind: ObjectKind,
    properties: Vec<(String, JsValue)>,
    prototype: Option<JsObjectId>,
    strength: Strength,
}

impl JsObjectData {
    fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            properties: Vec::new(),
            prototype: None,
            strength: Strength::Weak,
        }
    }

    fn own(&self, name: &str) -> Option<&JsValue> {
        self.properties.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    fn is_wrapper(&self) -> bool {
        matches!(self.kind, ObjectKind::Wrapper(_))
    }

    fn references(&self) -> Vec<JsObjectId> {
        let mut out: Vec<JsObjectId> = self.prototype.into_iter().collect();
        let mut push = |v: &JsValue| collect_ids(v, &mut out);
        for (_, v) in &self.properties {
            push(v);
        }
        if let ObjectKind::Array(elements) = &self.kind {
            for v in elements {
                push(v);
            }
        }
        out
    }
}

fn collect_ids(value: &JsValue, out: &mut Vec<JsObjectId>) {
    match value {
        JsValue::Object(id) => out.push(*id),
        JsValue::Cast(_, inner) => collect_ids(inner, out),
        _ => {}
    }
}

#[derive(Default)]
struct Heap {
    objects: FxHashMap<JsObjectId, JsObjectData>,
    next: u64,
    roots: FxHashMap<JsObjectId, usize>,
    globals: Vec<(String, JsObjectId)>,
}

impl Heap {
    fn alloc(&mut self, data: JsObjectData) -> JsObjectId {
        self.next += 1;
        let id = JsObjectId::new(self.next);
        self.objects.insert(id, data);
        id
    }

    fn get(&self, id: JsObjectId) -> BridgeResult<&JsObjectData> {
        self.objects
            .get(&id)
            .ok_or_else(|| BridgeError::javascript(format!("ReferenceError: object {} is not alive", id.as_u64())))
    }

    fn get_mut(&mut self, id: JsObjectId) -> BridgeResult<&mut JsObjectData> {
        self.objects
            .get_mut(&id)
            .ok_or_else(|| BridgeError::javascript(format!("ReferenceError: object {} is not alive", id.as_u64())))
    }
}

/// In-memory implementation of [`JsEngine`]
pub struct InMemoryEngine {
    heap: Mutex<Heap>,
    hook: RwLock<Option<CollectionHook>>,
    external_memory: AtomicI64,
}

impl InMemoryEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self {
            heap: Mutex::new(Heap::default()),
            hook: RwLock::new(None),
            external_memory: AtomicI64::new(0),
        }
    }

    /// Allocate an empty plain object
    pub fn new_object(&self) -> JsObjectId {
        self.heap.lock().alloc(JsObjectData::new(ObjectKind::Plain))
    }

    /// Allocate a plain object with the given own properties, in order
    pub fn object_with(&self, properties: Vec<(&str, JsValue)>) -> JsObjectId {
        let mut data = JsObjectData::new(ObjectKind::Plain);
        data.properties = properties
            .into_iter()
            .map(|(n, v)| (n.to_string(), v))
            .collect();
        self.heap.lock().alloc(data)
    }

    /// Allocate a script function
    pub fn new_function(
        &self,
        body: impl Fn(&InMemoryEngine, &JsValue, &[JsValue]) -> BridgeResult<JsValue> + Send + Sync + 'static,
    ) -> JsValue {
        let body: FunctionBody = Arc::new(body);
        JsValue::Object(self.heap.lock().alloc(JsObjectData::new(ObjectKind::Function(body))))
    }

    /// Allocate an array
    pub fn new_array(&self, elements: Vec<JsValue>) -> JsValue {
        JsValue::Object(self.heap.lock().alloc(JsObjectData::new(ObjectKind::Array(elements))))
    }

    /// Keep an object reachable until a matching [`unroot`](Self::unroot)
    pub fn root(&self, object: JsObjectId) {
        *self.heap.lock().roots.entry(object).or_insert(0) += 1;
    }

    /// Drop one root on an object
    pub fn unroot(&self, object: JsObjectId) {
        let mut heap = self.heap.lock();
        if let Some(count) = heap.roots.get_mut(&object) {
            *count -= 1;
            if *count == 0 {
                heap.roots.remove(&object);
            }
        }
    }

    /// Collect unreachable weak wrappers, then run the collection hook for
    /// each one outside the heap lock. Returns the collected IDs.
    pub fn collect_garbage(&self) -> Vec<JsObjectId> {
        let collected = {
            let mut heap = self.heap.lock();
            let mut stack: Vec<JsObjectId> = heap.roots.keys().copied().collect();
            stack.extend(heap.globals.iter().map(|(_, id)| *id));
            stack.extend(
                heap.objects
                    .iter()
                    .filter(|(_, o)| !o.is_wrapper() || o.strength == Strength::Strong)
                    .map(|(id, _)| *id),
            );

            let mut marked = FxHashSet::default();
            while let Some(id) = stack.pop() {
                if !marked.insert(id) {
                    continue;
                }
                if let Some(object) = heap.objects.get(&id) {
                    stack.extend(object.references());
                }
            }

            let mut dead: Vec<JsObjectId> = heap
                .objects
                .keys()
                .filter(|id| !marked.contains(id))
                .copied()
                .collect();
            dead.sort();
            for id in &dead {
                heap.objects.remove(id);
            }
            dead
        };

        let hook = self.hook.read().clone();
        if let Some(hook) = hook {
            for id in &collected {
                hook(*id);
            }
        }
        collected
    }

    /// Call an installed global function
    pub fn call_global(&self, name: &str, args: &[JsValue]) -> BridgeResult<JsValue> {
        let function = {
            let heap = self.heap.lock();
            heap.globals
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, id)| *id)
                .ok_or_else(|| BridgeError::javascript(format!("ReferenceError: {} is not defined", name)))?
        };
        self.call_function(&JsValue::Object(function), &JsValue::Undefined, args)
    }

    /// Check whether a global function is installed
    pub fn has_global(&self, name: &str) -> bool {
        self.heap.lock().globals.iter().any(|(n, _)| n == name)
    }

    /// Names of installed globals in installation order
    pub fn global_names(&self) -> Vec<String> {
        self.heap.lock().globals.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Current external memory total
    pub fn external_memory(&self) -> i64 {
        self.external_memory.load(Ordering::SeqCst)
    }

    /// Strength of a live wrapper
    pub fn strength_of(&self, object: JsObjectId) -> Option<Strength> {
        self.heap
            .lock()
            .objects
            .get(&object)
            .filter(|o| o.is_wrapper())
            .map(|o| o.strength)
    }

    /// Type name a wrapper was created for
    pub fn wrapper_type(&self, object: JsObjectId) -> Option<String> {
        match self.heap.lock().objects.get(&object).map(|o| &o.kind) {
            Some(ObjectKind::Wrapper(name)) => Some(name.clone()),
            _ => None,
        }
    }

    /// Prototype of an object
    pub fn prototype_of(&self, object: JsObjectId) -> Option<JsObjectId> {
        self.heap.lock().objects.get(&object).and_then(|o| o.prototype)
    }

    /// Check whether an object is still in the heap
    pub fn is_live(&self, object: JsObjectId) -> bool {
        self.heap.lock().objects.contains_key(&object)
    }
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl JsEngine for InMemoryEngine {
    fn create_wrapper(&self, type_name: &str) -> BridgeResult<JsObjectId> {
        Ok(self
            .heap
            .lock()
            .alloc(JsObjectData::new(ObjectKind::Wrapper(type_name.to_string()))))
    }

    fn get_property(&self, object: JsObjectId, name: &str) -> BridgeResult<JsValue> {
        let heap = self.heap.lock();
        let mut current = Some(object);
        let mut seen = FxHashSet::default();
        while let Some(id) = current {
            if !seen.insert(id) {
                break;
            }
            let data = heap.get(id)?;
            if let Some(v) = data.own(name) {
                return Ok(v.clone());
            }
            current = data.prototype;
        }
        Ok(JsValue::Undefined)
    }

    fn set_property(&self, object: JsObjectId, name: &str, value: JsValue) -> BridgeResult<()> {
        let mut heap = self.heap.lock();
        let data = heap.get_mut(object)?;
        match data.properties.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => data.properties.push((name.to_string(), value)),
        }
        Ok(())
    }

    fn set_prototype(&self, object: JsObjectId, prototype: JsObjectId) -> BridgeResult<()> {
        let mut heap = self.heap.lock();
        heap.get(prototype)?;
        heap.get_mut(object)?.prototype = Some(prototype);
        Ok(())
    }

    fn own_property_names(&self, object: JsObjectId) -> BridgeResult<Vec<String>> {
        let heap = self.heap.lock();
        Ok(heap
            .get(object)?
            .properties
            .iter()
            .map(|(n, _)| n.clone())
            .collect())
    }

    fn is_callable(&self, value: &JsValue) -> bool {
        let Some(id) = value.as_object() else {
            return false;
        };
        matches!(
            self.heap.lock().objects.get(&id).map(|o| &o.kind),
            Some(ObjectKind::Function(_)) | Some(ObjectKind::Native(_))
        )
    }

    fn array_elements(&self, object: JsObjectId) -> BridgeResult<Option<Vec<JsValue>>> {
        let heap = self.heap.lock();
        match &heap.get(object)?.kind {
            ObjectKind::Array(elements) => Ok(Some(elements.clone())),
            _ => Ok(None),
        }
    }

    fn call_function(&self, function: &JsValue, receiver: &JsValue, args: &[JsValue]) -> BridgeResult<JsValue> {
        let kind = match function.as_object() {
            Some(id) => self.heap.lock().objects.get(&id).map(|o| o.kind.clone()),
            None => None,
        };
        match kind {
            Some(ObjectKind::Function(body)) => body(self, receiver, args),
            Some(ObjectKind::Native(body)) => body(args),
            _ => Err(BridgeError::javascript(format!(
                "TypeError: {} is not a function",
                function.type_name()
            ))),
        }
    }

    fn set_wrapper_strength(&self, object: JsObjectId, strength: Strength) {
        if let Some(data) = self.heap.lock().objects.get_mut(&object) {
            data.strength = strength;
        }
    }

    fn adjust_external_memory(&self, delta: i64) -> i64 {
        self.external_memory.fetch_add(delta, Ordering::SeqCst) + delta
    }

    fn install_global_function(&self, name: &str, function: NativeFunction) -> BridgeResult<()> {
        let mut heap = self.heap.lock();
        let id = heap.alloc(JsObjectData::new(ObjectKind::Native(function)));
        match heap.globals.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = id,
            None => heap.globals.push((name.to_string(), id)),
        }
        Ok(())
    }

    fn set_collection_hook(&self, hook: CollectionHook) {
        *self.hook.write() = Some(hook);
    }
}

//! In-memory managed runtime
//!
//! A small object heap with single-inheritance classes, instance and static
//! fields, arrays, virtual and non-virtual dispatch, runtime-generated
//! subtypes whose overridden methods call back into JavaScript, and a
//! pin-count reference model.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use conduit_sdk::{
    wire, BridgeError, BridgeResult, CallTarget, Dispatch, ManagedRuntime, ManagedValue,
    MetadataEntry, ObjectHandle, TypeDefinition, TypeHandle,
};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::class::{default_value, element_admits, ClassBuilder, ClassDef, MethodBody};

/// Managed exception type used when a JavaScript callback fails
pub const JS_EXCEPTION_TYPE: &str = "com.conduit.JavaScriptException";

const OBJECT_BYTES: i64 = 64;
const ARRAY_HEADER_BYTES: i64 = 16;
const ARRAY_SLOT_BYTES: i64 = 8;

/// Route from the managed runtime into JavaScript.
///
/// Arguments: receiver, method name, arguments, return signature.
pub type JsCallback =
    Arc<dyn Fn(ObjectHandle, &str, &[ManagedValue], &str) -> BridgeResult<ManagedValue> + Send + Sync>;

/// Per-operation call counts, for asserting what crossed the boundary
#[derive(Debug, Default)]
pub struct CallCounters {
    /// `find_class` calls
    pub find_class: AtomicUsize,
    /// `generate_class` calls
    pub generate_class: AtomicUsize,
    /// `type_metadata` calls
    pub type_metadata: AtomicUsize,
    /// `new_instance` calls
    pub new_instance: AtomicUsize,
    /// `call_method` calls
    pub call_method: AtomicUsize,
    /// `release` calls
    pub release: AtomicUsize,
    /// `make_strong` calls
    pub make_strong: AtomicUsize,
    /// `make_weak` calls
    pub make_weak: AtomicUsize,
}

impl CallCounters {
    /// Read one counter
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

struct HeapObject {
    class: TypeHandle,
    fields: FxHashMap<String, ManagedValue>,
    elements: Option<Vec<ManagedValue>>,
    strong: u32,
}

impl HeapObject {
    fn size(&self) -> i64 {
        match &self.elements {
            Some(e) => ARRAY_HEADER_BYTES + ARRAY_SLOT_BYTES * e.len() as i64,
            None => OBJECT_BYTES,
        }
    }
}

enum Resolved {
    Body(MethodBody, Option<ObjectHandle>),
    JavaScript(ObjectHandle),
}

#[derive(Default)]
struct State {
    classes: Vec<ClassDef>,
    by_name: FxHashMap<String, TypeHandle>,
    objects: FxHashMap<ObjectHandle, HeapObject>,
    next_object: u32,
    class_objects: FxHashMap<TypeHandle, ObjectHandle>,
    memory_delta: i64,
}

impl State {
    fn class(&self, ty: TypeHandle) -> BridgeResult<&ClassDef> {
        self.classes
            .get(ty.as_u32() as usize)
            .ok_or_else(|| BridgeError::ClassNotFound(format!("type {}", ty.as_u32())))
    }

    fn lookup(&self, name: &str) -> BridgeResult<TypeHandle> {
        self.by_name
            .get(&dotted(name))
            .copied()
            .ok_or_else(|| BridgeError::ClassNotFound(name.to_string()))
    }

    fn chain(&self, start: TypeHandle) -> Vec<TypeHandle> {
        let mut chain = Vec::new();
        let mut current = Some(start);
        while let Some(ty) = current {
            chain.push(ty);
            current = self.classes.get(ty.as_u32() as usize).and_then(|c| c.superclass);
        }
        chain
    }

    /// Whether `class` is `interface`, or extends or implements it
    fn implements(&self, class: TypeHandle, interface: TypeHandle) -> bool {
        let mut pending = self.chain(class);
        let mut seen = Vec::new();
        while let Some(ty) = pending.pop() {
            if ty == interface {
                return true;
            }
            if seen.contains(&ty) {
                continue;
            }
            seen.push(ty);
            if let Some(def) = self.classes.get(ty.as_u32() as usize) {
                pending.extend(def.interfaces.iter().copied());
            }
        }
        false
    }

    fn next_id(&mut self) -> ObjectHandle {
        loop {
            self.next_object += 1;
            let id = ObjectHandle::new(self.next_object);
            if !self.objects.contains_key(&id) {
                return id;
            }
        }
    }

    fn object(&self, h: ObjectHandle) -> BridgeResult<&HeapObject> {
        self.objects
            .get(&h)
            .ok_or(BridgeError::UnknownHandle(h.as_u32()))
    }

    fn object_mut(&mut self, h: ObjectHandle) -> BridgeResult<&mut HeapObject> {
        self.objects
            .get_mut(&h)
            .ok_or(BridgeError::UnknownHandle(h.as_u32()))
    }

    fn register(&mut self, def: ClassDef) -> TypeHandle {
        let ty = TypeHandle::new(self.classes.len() as u32);
        self.by_name.insert(def.name.clone(), ty);
        self.classes.push(def);
        ty
    }

    fn instantiate(&mut self, id: ObjectHandle, class: TypeHandle) -> BridgeResult<()> {
        let mut fields = FxHashMap::default();
        for ty in self.chain(class) {
            for field in self.class(ty)?.instance_fields() {
                fields
                    .entry(field.name.clone())
                    .or_insert_with(|| default_value(&field.signature));
            }
        }
        let object = HeapObject {
            class,
            fields,
            elements: None,
            strong: 0,
        };
        self.memory_delta += object.size();
        self.objects.insert(id, object);
        Ok(())
    }

    fn remove(&mut self, h: ObjectHandle) -> Option<HeapObject> {
        let object = self.objects.remove(&h)?;
        self.memory_delta -= object.size();
        self.class_objects.retain(|_, obj| *obj != h);
        Some(object)
    }

    fn resolve(
        &self,
        start: TypeHandle,
        method: &MetadataEntry,
        receiver: Option<ObjectHandle>,
        dispatch: Dispatch,
    ) -> BridgeResult<Resolved> {
        for ty in self.chain(start) {
            let class = self.class(ty)?;
            let routed_to_js = class
                .generated
                .as_ref()
                .map_or(false, |g| g.overrides_method(&method.name));
            if let (true, Some(h), Dispatch::Virtual) = (routed_to_js, receiver, dispatch) {
                return Ok(Resolved::JavaScript(h));
            }
            if let Some(body) = class.body(&method.name, &method.signature) {
                return Ok(Resolved::Body(body, receiver));
            }
        }
        Err(BridgeError::managed(
            "java.lang.NoSuchMethodError",
            format!("{}.{}{}", method.declaring_type, method.name, method.signature),
        ))
    }

    fn static_owner(&self, start: TypeHandle, name: &str) -> Option<TypeHandle> {
        self.chain(start).into_iter().find(|ty| {
            self.classes
                .get(ty.as_u32() as usize)
                .map_or(false, |c| c.static_fields.contains_key(name))
        })
    }
}

fn dotted(name: &str) -> String {
    name.replace('/', ".")
}

fn return_signature(signature: &str) -> &str {
    signature
        .rfind(')')
        .map_or(signature, |pos| &signature[pos + 1..])
}

/// In-memory implementation of [`ManagedRuntime`]
pub struct InMemoryRuntime {
    state: Mutex<State>,
    current_object: Mutex<Option<ObjectHandle>>,
    handed_back: Mutex<Option<ObjectHandle>>,
    js_callback: RwLock<Option<JsCallback>>,
    verbose: AtomicBool,
    fail_memory_reports: AtomicBool,
    counters: CallCounters,
}

impl InMemoryRuntime {
    /// Create a runtime with `java.lang.Object`, `java.lang.String` and
    /// `java.lang.Class` registered
    pub fn new() -> Self {
        let runtime = Self {
            state: Mutex::new(State::default()),
            current_object: Mutex::new(None),
            handed_back: Mutex::new(None),
            js_callback: RwLock::new(None),
            verbose: AtomicBool::new(false),
            fail_memory_reports: AtomicBool::new(false),
            counters: CallCounters::default(),
        };
        {
            let mut state = runtime.state.lock();
            let object = ClassBuilder::new("java.lang.Object")
                .constructor("()V", |_, _, _| Ok(ManagedValue::Void))
                .method("toString", "()Ljava/lang/String;", |rt, this, _| {
                    let name = match this {
                        Some(h) => rt.class_name(rt.class_of(h)?)?,
                        None => "null".to_string(),
                    };
                    Ok(ManagedValue::String(name))
                })
                .method("hashCode", "()I", |_, this, _| {
                    Ok(ManagedValue::Int(this.map_or(0, |h| h.as_u32() as i32)))
                });
            state.register(Self::class_def(object, None, Vec::new()));

            let root = Some(TypeHandle::new(0));
            state.register(Self::class_def(ClassBuilder::new("java.lang.String"), root, Vec::new()));
            state.register(Self::class_def(
                ClassBuilder::new("java.lang.Class").final_field("name", "Ljava/lang/String;"),
                root,
                Vec::new(),
            ));
        }
        runtime
    }

    fn class_def(builder: ClassBuilder, superclass: Option<TypeHandle>, interfaces: Vec<TypeHandle>) -> ClassDef {
        ClassDef {
            name: dotted(&builder.name),
            superclass,
            is_interface: builder.is_interface,
            interfaces,
            members: builder.members,
            bodies: builder.bodies,
            static_fields: builder.static_fields,
            generated: None,
            array_element: None,
        }
    }

    /// Register a class
    pub fn define_class(&self, builder: ClassBuilder) -> BridgeResult<TypeHandle> {
        let mut state = self.state.lock();
        let superclass = match (&builder.superclass, builder.is_interface) {
            (Some(name), _) => Some(state.lookup(name)?),
            (None, false) => Some(state.lookup("java.lang.Object")?),
            (None, true) => None,
        };
        let interfaces = builder
            .interfaces
            .iter()
            .map(|i| state.lookup(i))
            .collect::<BridgeResult<Vec<_>>>()?;
        Ok(state.register(Self::class_def(builder, superclass, interfaces)))
    }

    /// Create an instance without running a constructor, as if managed code
    /// produced it
    pub fn allocate(&self, class_name: &str) -> BridgeResult<ObjectHandle> {
        let mut state = self.state.lock();
        let ty = state.lookup(class_name)?;
        let id = state.next_id();
        state.instantiate(id, ty)?;
        Ok(id)
    }

    /// Create an array with the given signature (e.g. `[I`)
    pub fn new_array(&self, signature: &str, elements: Vec<ManagedValue>) -> BridgeResult<ObjectHandle> {
        let mut state = self.state.lock();
        let ty = match state.by_name.get(&dotted(signature)) {
            Some(ty) => *ty,
            None => {
                let root = state.lookup("java.lang.Object")?;
                let mut def = Self::class_def(ClassBuilder::new(signature), Some(root), Vec::new());
                def.array_element = Some(signature.trim_start_matches('[').to_string());
                state.register(def)
            }
        };
        let id = state.next_id();
        let object = HeapObject {
            class: ty,
            fields: FxHashMap::default(),
            elements: Some(elements),
            strong: 0,
        };
        state.memory_delta += object.size();
        state.objects.insert(id, object);
        Ok(id)
    }

    /// Route generated-type overrides into JavaScript
    pub fn set_js_callback(&self, callback: JsCallback) {
        *self.js_callback.write() = Some(callback);
    }

    /// Read an instance field directly
    pub fn field_value(&self, object: ObjectHandle, name: &str) -> Option<ManagedValue> {
        self.state
            .lock()
            .objects
            .get(&object)
            .and_then(|o| o.fields.get(name).cloned())
    }

    /// Read an array element directly
    pub fn element(&self, array: ObjectHandle, index: usize) -> Option<ManagedValue> {
        self.state
            .lock()
            .objects
            .get(&array)
            .and_then(|o| o.elements.as_ref())
            .and_then(|e| e.get(index).cloned())
    }

    /// Current pin count of an object
    pub fn strong_count(&self, object: ObjectHandle) -> u32 {
        self.state
            .lock()
            .objects
            .get(&object)
            .map_or(0, |o| o.strong)
    }

    /// Number of live objects
    pub fn live_objects(&self) -> usize {
        self.state.lock().objects.len()
    }

    /// Definition the runtime generated under `name`, if any
    pub fn generated_definition(&self, name: &str) -> Option<TypeDefinition> {
        let state = self.state.lock();
        let ty = state.by_name.get(name)?;
        state.classes.get(ty.as_u32() as usize)?.generated.clone()
    }

    /// Whether the runtime type of `object` implements the named interface
    pub fn implements(&self, object: ObjectHandle, interface: &str) -> bool {
        let state = self.state.lock();
        match (state.objects.get(&object), state.by_name.get(&dotted(interface))) {
            (Some(o), Some(iface)) => state.implements(o.class, *iface),
            _ => false,
        }
    }

    /// Whether verbose logging was requested
    pub fn is_verbose(&self) -> bool {
        self.verbose.load(Ordering::SeqCst)
    }

    /// Make the next `new_instance` return `object` without constructing
    /// anything, ignoring the current object ID
    pub fn hand_back_instance(&self, object: ObjectHandle) {
        *self.handed_back.lock() = Some(object);
    }

    /// Make subsequent memory reports fail
    pub fn fail_memory_reports(&self, fail: bool) {
        self.fail_memory_reports.store(fail, Ordering::SeqCst);
    }

    /// Call counters
    pub fn counters(&self) -> &CallCounters {
        &self.counters
    }

    fn call_js(
        &self,
        receiver: ObjectHandle,
        method: &str,
        args: &[ManagedValue],
        return_signature: &str,
    ) -> BridgeResult<ManagedValue> {
        let callback = self.js_callback.read().clone();
        let callback = callback.ok_or_else(|| {
            BridgeError::managed("java.lang.IllegalStateException", "no JavaScript callback installed")
        })?;
        callback(receiver, method, args, return_signature).map_err(|e| match e {
            BridgeError::JavaScriptException { message } => BridgeError::managed(JS_EXCEPTION_TYPE, message),
            other => other,
        })
    }
}

impl Default for InMemoryRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagedRuntime for InMemoryRuntime {
    fn find_class(&self, name: &str) -> BridgeResult<TypeHandle> {
        self.counters.find_class.fetch_add(1, Ordering::SeqCst);
        self.state.lock().lookup(name)
    }

    fn generate_class(&self, definition: &TypeDefinition) -> BridgeResult<TypeHandle> {
        self.counters.generate_class.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        if let Some(ty) = state.by_name.get(&definition.name) {
            return Ok(*ty);
        }
        let base = state.lookup(&definition.base)?;
        let mut interfaces = definition
            .interfaces
            .iter()
            .map(|i| state.lookup(i))
            .collect::<BridgeResult<Vec<_>>>()?;
        let superclass = if definition.is_interface {
            interfaces.insert(0, base);
            state.lookup("java.lang.Object")?
        } else {
            if state.class(base)?.is_interface {
                return Err(BridgeError::managed(
                    "java.lang.IncompatibleClassChangeError",
                    format!("{} is an interface", definition.base),
                ));
            }
            base
        };

        let mut def = Self::class_def(ClassBuilder::new(&definition.name), Some(superclass), interfaces);
        def.generated = Some(definition.clone());
        Ok(state.register(def))
    }

    fn class_name(&self, ty: TypeHandle) -> BridgeResult<String> {
        Ok(self.state.lock().class(ty)?.name.clone())
    }

    fn class_of(&self, object: ObjectHandle) -> BridgeResult<TypeHandle> {
        Ok(self.state.lock().object(object)?.class)
    }

    fn class_object(&self, ty: TypeHandle) -> BridgeResult<ObjectHandle> {
        let mut state = self.state.lock();
        if let Some(obj) = state.class_objects.get(&ty) {
            return Ok(*obj);
        }
        let name = state.class(ty)?.name.clone();
        let class_ty = state.lookup("java.lang.Class")?;
        let id = state.next_id();
        state.instantiate(id, class_ty)?;
        state
            .object_mut(id)?
            .fields
            .insert("name".to_string(), ManagedValue::String(name));
        state.class_objects.insert(ty, id);
        Ok(id)
    }

    fn type_metadata(&self, name: &str, index: usize, batch_size: usize) -> BridgeResult<Vec<String>> {
        self.counters.type_metadata.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock();
        let ty = state.lookup(name)?;
        Ok(wire::encode_batch(&state.class(ty)?.members, index, batch_size))
    }

    fn reserve_object_id(&self) -> ObjectHandle {
        self.state.lock().next_id()
    }

    fn new_instance(
        &self,
        ty: TypeHandle,
        constructor: &MetadataEntry,
        args: &[ManagedValue],
    ) -> BridgeResult<ObjectHandle> {
        self.counters.new_instance.fetch_add(1, Ordering::SeqCst);
        if let Some(existing) = self.handed_back.lock().take() {
            return Ok(existing);
        }
        let (id, body) = {
            let mut state = self.state.lock();
            let class = state.class(ty)?;
            if class.is_interface {
                return Err(BridgeError::managed("java.lang.InstantiationException", class.name.clone()));
            }
            let body = state
                .chain(ty)
                .into_iter()
                .find_map(|t| state.classes[t.as_u32() as usize].body("<init>", &constructor.signature));
            if body.is_none() && constructor.signature != "()V" {
                return Err(BridgeError::managed(
                    "java.lang.NoSuchMethodError",
                    format!("{}.<init>{}", class.name, constructor.signature),
                ));
            }

            let id = match *self.current_object.lock() {
                Some(id) => id,
                None => state.next_id(),
            };
            if state.objects.contains_key(&id) {
                return Err(BridgeError::managed(
                    "java.lang.IllegalStateException",
                    format!("object id {} already in use", id),
                ));
            }
            state.instantiate(id, ty)?;
            (id, body)
        };

        if let Some(body) = body {
            if let Err(e) = body(self, Some(id), args) {
                self.state.lock().remove(id);
                return Err(e);
            }
        }
        Ok(id)
    }

    fn call_method(
        &self,
        target: CallTarget,
        method: &MetadataEntry,
        dispatch: Dispatch,
        args: &[ManagedValue],
    ) -> BridgeResult<ManagedValue> {
        self.counters.call_method.fetch_add(1, Ordering::SeqCst);
        let resolved = {
            let state = self.state.lock();
            let (receiver, start) = match target {
                CallTarget::Instance(h) => {
                    let class = state.object(h)?.class;
                    if method.is_interface {
                        let interface = state.lookup(&method.declaring_type)?;
                        if !state.implements(class, interface) {
                            return Err(BridgeError::managed(
                                "java.lang.IncompatibleClassChangeError",
                                format!("{} does not implement {}", state.class(class)?.name, method.declaring_type),
                            ));
                        }
                    }
                    let start = match dispatch {
                        Dispatch::Virtual => class,
                        Dispatch::NonVirtual(ty) => ty,
                    };
                    (Some(h), start)
                }
                CallTarget::Static(ty) => (None, ty),
            };
            state.resolve(start, method, receiver, dispatch)?
        };

        match resolved {
            Resolved::Body(body, receiver) => body(self, receiver, args),
            Resolved::JavaScript(receiver) => {
                self.call_js(receiver, &method.name, args, return_signature(&method.signature))
            }
        }
    }

    fn get_field(&self, target: CallTarget, field: &MetadataEntry) -> BridgeResult<ManagedValue> {
        let state = self.state.lock();
        let value = match target {
            CallTarget::Instance(h) => state.object(h)?.fields.get(&field.name).cloned(),
            CallTarget::Static(ty) => state
                .static_owner(ty, &field.name)
                .and_then(|owner| state.classes[owner.as_u32() as usize].static_fields.get(&field.name).cloned()),
        };
        value.ok_or_else(|| BridgeError::managed("java.lang.NoSuchFieldError", field.name.clone()))
    }

    fn set_field(&self, target: CallTarget, field: &MetadataEntry, value: ManagedValue) -> BridgeResult<()> {
        let mut state = self.state.lock();
        let slot = match target {
            CallTarget::Instance(h) => state.object_mut(h)?.fields.get_mut(&field.name),
            CallTarget::Static(ty) => match state.static_owner(ty, &field.name) {
                Some(owner) => state.classes[owner.as_u32() as usize]
                    .static_fields
                    .get_mut(&field.name),
                None => None,
            },
        };
        match slot {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(BridgeError::managed("java.lang.NoSuchFieldError", field.name.clone())),
        }
    }

    fn array_length(&self, array: ObjectHandle) -> BridgeResult<usize> {
        let state = self.state.lock();
        state
            .object(array)?
            .elements
            .as_ref()
            .map(|e| e.len())
            .ok_or_else(|| BridgeError::TypeMismatch {
                expected: "array".to_string(),
                got: "object".to_string(),
            })
    }

    fn array_get(&self, array: ObjectHandle, index: usize) -> BridgeResult<ManagedValue> {
        let state = self.state.lock();
        let elements = state.object(array)?.elements.as_ref();
        elements
            .and_then(|e| e.get(index).cloned())
            .ok_or_else(|| BridgeError::managed("java.lang.ArrayIndexOutOfBoundsException", index.to_string()))
    }

    fn array_set(&self, array: ObjectHandle, index: usize, value: ManagedValue) -> BridgeResult<()> {
        let mut state = self.state.lock();
        let class = state.object(array)?.class;
        if let Some(element) = &state.class(class)?.array_element {
            if !element_admits(element, &value) {
                return Err(BridgeError::managed(
                    "java.lang.ArrayStoreException",
                    format!("{} into [{}", value.type_name(), element),
                ));
            }
        }
        let slot = state
            .object_mut(array)?
            .elements
            .as_mut()
            .and_then(|e| e.get_mut(index));
        match slot {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(BridgeError::managed(
                "java.lang.ArrayIndexOutOfBoundsException",
                index.to_string(),
            )),
        }
    }

    fn is_alive(&self, object: ObjectHandle) -> bool {
        self.state.lock().objects.contains_key(&object)
    }

    fn make_strong(&self, object: ObjectHandle) -> BridgeResult<()> {
        self.counters.make_strong.fetch_add(1, Ordering::SeqCst);
        self.state.lock().object_mut(object)?.strong += 1;
        Ok(())
    }

    fn make_weak(&self, object: ObjectHandle) -> BridgeResult<()> {
        self.counters.make_weak.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        let obj = state.object_mut(object)?;
        if obj.strong == 0 {
            return Err(BridgeError::managed(
                "java.lang.IllegalStateException",
                format!("object {} is not pinned", object),
            ));
        }
        obj.strong -= 1;
        Ok(())
    }

    fn release(&self, object: ObjectHandle) -> BridgeResult<()> {
        self.counters.release.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        if state.object(object)?.strong > 0 {
            return Err(BridgeError::managed(
                "java.lang.IllegalStateException",
                format!("cannot release pinned object {}", object),
            ));
        }
        state.remove(object);
        Ok(())
    }

    fn set_current_object_id(&self, object: Option<ObjectHandle>) {
        *self.current_object.lock() = object;
    }

    fn current_object_id(&self) -> Option<ObjectHandle> {
        *self.current_object.lock()
    }

    fn take_memory_delta(&self) -> BridgeResult<i64> {
        if self.fail_memory_reports.load(Ordering::SeqCst) {
            return Err(BridgeError::managed("java.lang.IllegalStateException", "memory stats unavailable"));
        }
        Ok(std::mem::take(&mut self.state.lock().memory_delta))
    }

    fn set_verbose_logging(&self, enabled: bool) {
        self.verbose.store(enabled, Ordering::SeqCst);
    }

    fn dump_reference_tables(&self) -> String {
        let state = self.state.lock();
        let pinned = state.objects.values().filter(|o| o.strong > 0).count();
        format!(
            "managed heap: {} live objects, {} pinned, {} classes",
            state.objects.len(),
            pinned,
            state.classes.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget_runtime() -> InMemoryRuntime {
        let rt = InMemoryRuntime::new();
        rt.define_class(
            ClassBuilder::new("com.example.Widget")
                .field("size", "I")
                .method("getSize", "()I", |rt, this, _| {
                    Ok(rt.field_value(this.unwrap(), "size").unwrap())
                }),
        )
        .unwrap();
        rt
    }

    #[test]
    fn test_find_class_accepts_slash_names() {
        let rt = widget_runtime();
        assert_eq!(
            rt.find_class("com/example/Widget").unwrap(),
            rt.find_class("com.example.Widget").unwrap()
        );
        assert!(matches!(rt.find_class("com.example.Nope"), Err(BridgeError::ClassNotFound(_))));
    }

    #[test]
    fn test_new_instance_uses_current_object_id() {
        let rt = widget_runtime();
        let ty = rt.find_class("com.example.Widget").unwrap();
        let id = rt.reserve_object_id();
        rt.set_current_object_id(Some(id));
        let ctor = MetadataEntry::constructor("com.example.Widget", "()V");
        assert_eq!(rt.new_instance(ty, &ctor, &[]).unwrap(), id);
        rt.set_current_object_id(None);
        assert_eq!(rt.field_value(id, "size"), Some(ManagedValue::Int(0)));
    }

    #[test]
    fn test_release_refuses_pinned_objects() {
        let rt = widget_runtime();
        let h = rt.allocate("com.example.Widget").unwrap();
        rt.make_strong(h).unwrap();
        assert!(rt.release(h).is_err());
        rt.make_weak(h).unwrap();
        rt.release(h).unwrap();
        assert!(!rt.is_alive(h));
    }

    #[test]
    fn test_generated_override_routes_to_callback() {
        let rt = widget_runtime();
        let def = TypeDefinition::builder("com.example.Widget")
            .override_method("getSize")
            .build("gen.Widget");
        let ty = rt.generate_class(&def).unwrap();
        rt.set_js_callback(Arc::new(|_, method, _, ret| {
            assert_eq!(method, "getSize");
            assert_eq!(ret, "I");
            Ok(ManagedValue::Int(99))
        }));

        let ctor = MetadataEntry::constructor("gen.Widget", "()V");
        let h = rt.new_instance(ty, &ctor, &[]).unwrap();
        let get_size = MetadataEntry::method("com.example.Widget", "getSize", "()I");
        let base = rt.find_class("com.example.Widget").unwrap();

        let virtual_result = rt
            .call_method(CallTarget::Instance(h), &get_size, Dispatch::Virtual, &[])
            .unwrap();
        let super_result = rt
            .call_method(CallTarget::Instance(h), &get_size, Dispatch::NonVirtual(base), &[])
            .unwrap();
        assert_eq!(virtual_result, ManagedValue::Int(99));
        assert_eq!(super_result, ManagedValue::Int(0));
    }

    #[test]
    fn test_interface_calls_require_implementation() {
        let rt = widget_runtime();
        rt.define_class(ClassBuilder::new("java.lang.Runnable").interface().abstract_method("run", "()V"))
            .unwrap();
        rt.define_class(
            ClassBuilder::new("com.example.Task")
                .implements("java.lang.Runnable")
                .method("run", "()V", |_, _, _| Ok(ManagedValue::Void)),
        )
        .unwrap();
        let task = rt.allocate("com.example.Task").unwrap();
        let widget = rt.allocate("com.example.Widget").unwrap();
        let run = MetadataEntry::method("java.lang.Runnable", "run", "()V").as_interface();

        assert!(rt.implements(task, "java/lang/Runnable"));
        assert!(!rt.implements(widget, "java.lang.Runnable"));
        assert_eq!(
            rt.call_method(CallTarget::Instance(task), &run, Dispatch::Virtual, &[]),
            Ok(ManagedValue::Void)
        );
        assert!(matches!(
            rt.call_method(CallTarget::Instance(widget), &run, Dispatch::Virtual, &[]),
            Err(BridgeError::ManagedException { ref type_name, .. }) if type_name == "java.lang.IncompatibleClassChangeError"
        ));
    }

    #[test]
    fn test_array_store_checks_element_type() {
        let rt = InMemoryRuntime::new();
        let ints = rt.new_array("[I", vec![ManagedValue::Int(0)]).unwrap();
        assert!(rt.array_set(ints, 0, ManagedValue::Int(5)).is_ok());
        assert!(matches!(
            rt.array_set(ints, 0, ManagedValue::Byte(5)),
            Err(BridgeError::ManagedException { ref type_name, .. }) if type_name == "java.lang.ArrayStoreException"
        ));
        assert_eq!(rt.element(ints, 0), Some(ManagedValue::Int(5)));
        assert_eq!(rt.class_name(rt.class_of(ints).unwrap()).unwrap(), "[I");
    }

    #[test]
    fn test_memory_delta_tracks_allocation() {
        let rt = InMemoryRuntime::new();
        let h = rt.allocate("java.lang.Object").unwrap();
        assert_eq!(rt.take_memory_delta().unwrap(), OBJECT_BYTES);
        rt.release(h).unwrap();
        assert_eq!(rt.take_memory_delta().unwrap(), -OBJECT_BYTES);
        assert_eq!(rt.take_memory_delta().unwrap(), 0);
    }
}

//! Dispatch orchestration
//!
//! Entry points for both directions across the boundary:
//!
//! - JavaScript -> managed: [`Bridge::register_instance`],
//!   [`Bridge::call_java_method`], field and array access
//! - managed -> JavaScript: [`Bridge::call_js_method`], hopping onto the
//!   JavaScript thread when invoked from elsewhere

use std::sync::Arc;

use conduit_sdk::{
    BridgeError, BridgeResult, CallTarget, Dispatch, JsObjectId, JsValue, ManagedValue, MemberKind,
    MetadataEntry, ObjectHandle, TypeHandle,
};
use tracing::{trace, warn};

use crate::marshal::{array, field, FieldCallbackData, MethodSignature, TypeSignature};
use crate::metadata::{canonical_name, get_implemented_interfaces, get_method_overrides};
use crate::objects::ObjectIdScope;
use crate::Bridge;

/// Constructor selected by the caller's overload resolution, with its
/// JavaScript arguments
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorArgs {
    /// Constructor signature, e.g. `(I)V`
    pub signature: String,
    /// Arguments in declaration order
    pub values: Vec<JsValue>,
}

impl ConstructorArgs {
    pub fn new(signature: impl Into<String>, values: Vec<JsValue>) -> Self {
        Self {
            signature: signature.into(),
            values,
        }
    }

    /// No-argument constructor
    pub fn none() -> Self {
        Self::new("()V", Vec::new())
    }
}

impl Default for ConstructorArgs {
    fn default() -> Self {
        Self::none()
    }
}

impl Bridge {
    /// Wrapper for a managed object, created and bound on first request
    pub fn create_js_wrapper(&self, handle: ObjectHandle, type_name: &str) -> BridgeResult<JsObjectId> {
        self.ensure_running()?;
        self.objects().create_js_wrapper(handle, type_name)
    }

    /// Handle behind a wrapper value
    pub fn handle_of(&self, value: &JsValue) -> BridgeResult<ObjectHandle> {
        value
            .as_object()
            .and_then(|id| self.objects().handle_of(id))
            .ok_or_else(|| BridgeError::TypeMismatch {
                expected: "bridged object".to_string(),
                got: value.type_name().to_string(),
            })
    }

    /// Explicitly release a bound handle
    pub fn release(&self, handle: ObjectHandle) -> BridgeResult<()> {
        self.ensure_running()?;
        self.objects().release(handle)
    }

    /// Construct a managed instance of `class_name` and bind it to `wrapper`.
    ///
    /// With an `implementation` object declaring overrides or interfaces, a
    /// generated subtype is instantiated instead and `implementation` becomes
    /// the wrapper's prototype. Constructors that call overridden methods
    /// reach `wrapper` while construction is still in flight.
    ///
    /// Returns `Ok(false)` when the class cannot be resolved.
    pub fn register_instance(
        &self,
        wrapper: JsObjectId,
        class_name: &str,
        args: &ConstructorArgs,
        implementation: Option<JsObjectId>,
        is_interface: bool,
    ) -> BridgeResult<bool> {
        self.ensure_running()?;
        if self.objects().handle_of(wrapper).is_some() || self.objects().is_pending(wrapper) {
            return Err(BridgeError::ArgumentError(format!(
                "wrapper {} is already bound",
                wrapper.as_u64()
            )));
        }

        let ty = match self.metadata().resolve_class(class_name, implementation, is_interface) {
            Ok(ty) => ty,
            Err(e @ BridgeError::ClassNotFound(_)) => {
                warn!(class = class_name, error = %e, "instance registration failed to resolve class");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        let type_name = self.metadata().resolve_class_name(ty)?;

        let signature = MethodSignature::parse(&args.signature)?;
        if signature.ret != TypeSignature::Void {
            return Err(BridgeError::ArgumentError(format!(
                "constructor signature must return V: {}",
                args.signature
            )));
        }
        let constructor = self.constructor_entry(class_name, &args.signature, is_interface)?;
        let values = self.marshaler().to_managed_args(&args.values, &signature)?;

        if let Some(implementation) = implementation {
            self.engine().set_prototype(wrapper, implementation)?;
        }

        let reserved = self.runtime().reserve_object_id();
        self.objects().link_pending(reserved, wrapper, &type_name)?;
        let constructed = {
            let _scope = ObjectIdScope::new(self.runtime().as_ref(), reserved);
            self.runtime().new_instance(ty, &constructor, &values)
        };

        match constructed {
            Ok(actual) => {
                if let Err(e) = self.objects().commit(reserved, actual) {
                    self.objects().abort(reserved);
                    // An `actual` linked elsewhere belongs to another wrapper
                    if self.objects().callback_wrapper(actual).is_err() {
                        if let Err(release) = self.runtime().release(actual) {
                            warn!(handle = actual.as_u32(), error = %release, "failed to release unbindable instance; managed object leaked");
                        }
                    }
                    return Err(e);
                }
                if self.is_verbose() {
                    trace!(handle = actual.as_u32(), wrapper = wrapper.as_u64(), type_name = %type_name, "registered instance");
                }
                self.objects().report_memory();
                Ok(true)
            }
            Err(e) => {
                self.objects().abort(reserved);
                Err(e)
            }
        }
    }

    fn constructor_entry(&self, class_name: &str, signature: &str, is_interface: bool) -> BridgeResult<MetadataEntry> {
        let canonical = canonical_name(class_name);
        if is_interface {
            return Ok(MetadataEntry::constructor(&canonical, "()V"));
        }
        match self.metadata().constructor(&canonical, signature) {
            Ok(entry) => Ok(entry.as_ref().clone()),
            // Implicit default constructor
            Err(BridgeError::MethodNotFound { .. }) if signature == "()V" => {
                Ok(MetadataEntry::constructor(&canonical, signature))
            }
            Err(e) => Err(e),
        }
    }

    /// Call a managed method chosen by the caller's overload resolution.
    ///
    /// `entry` is `None` when no descriptor matched; that fails with
    /// `MethodNotFound` before anything crosses the boundary. With
    /// `is_super`, dispatch is non-virtual to `class_name`'s implementation.
    #[allow(clippy::too_many_arguments)]
    pub fn call_java_method(
        &self,
        caller: &JsValue,
        class_name: &str,
        method_name: &str,
        entry: Option<&MetadataEntry>,
        is_static: bool,
        is_super: bool,
        args: &[JsValue],
    ) -> BridgeResult<JsValue> {
        self.ensure_running()?;
        let entry = entry
            .filter(|e| e.kind == MemberKind::Method && e.name == method_name)
            .ok_or_else(|| BridgeError::method_not_found(canonical_name(class_name), method_name))?;
        if entry.is_static != is_static {
            return Err(BridgeError::ArgumentError(format!(
                "{}.{} static flag mismatch",
                entry.declaring_type, entry.name
            )));
        }

        let signature = MethodSignature::parse(&entry.signature)?;
        let marshaler = self.marshaler();
        let values = marshaler.to_managed_args(args, &signature)?;

        let target = if is_static {
            CallTarget::Static(self.resolve_type(class_name)?)
        } else {
            CallTarget::Instance(self.handle_of(caller)?)
        };
        let dispatch = if is_super && !is_static {
            Dispatch::NonVirtual(self.resolve_type(class_name)?)
        } else {
            Dispatch::Virtual
        };

        if self.is_verbose() {
            trace!(class = class_name, method = method_name, signature = %entry.signature, ?dispatch, "calling managed method");
        }
        let result = self.runtime().call_method(target, entry, dispatch, &values);
        self.objects().tick();
        marshaler.to_js(result?)
    }

    fn resolve_type(&self, class_name: &str) -> BridgeResult<TypeHandle> {
        self.metadata().resolve_class(class_name, None, false)
    }

    /// Invoke the JavaScript implementation of `method` on the wrapper bound
    /// to `receiver`. The receiver stays strong for the call's duration.
    pub fn call_js_method(
        &self,
        receiver: ObjectHandle,
        method: &str,
        args: &[ManagedValue],
        return_signature: &str,
    ) -> BridgeResult<ManagedValue> {
        self.ensure_running()?;
        if !self.executor().is_js_thread() {
            let method = method.to_string();
            let args = args.to_vec();
            let return_signature = return_signature.to_string();
            return self.executor().run_on_js_thread(move |bridge| {
                bridge.ensure_running()?;
                bridge.call_js_method_local(receiver, &method, &args, &return_signature)
            });
        }
        self.call_js_method_local(receiver, method, args, return_signature)
    }

    fn call_js_method_local(
        &self,
        receiver: ObjectHandle,
        method: &str,
        args: &[ManagedValue],
        return_signature: &str,
    ) -> BridgeResult<ManagedValue> {
        let ret = TypeSignature::parse(return_signature)?;
        let wrapper = self.objects().callback_wrapper(receiver)?;
        let _scope = self.objects().enter_call(receiver)?;

        let function = self.engine().get_property(wrapper, method)?;
        if !self.engine().is_callable(&function) {
            let class = self
                .objects()
                .type_name(receiver)
                .unwrap_or_else(|| receiver.to_string());
            return Err(BridgeError::method_not_found(class, method));
        }

        if self.is_verbose() {
            trace!(handle = receiver.as_u32(), method, "calling JavaScript method");
        }
        let marshaler = self.marshaler().for_callback();
        let js_args = marshaler.to_js_args(args)?;
        let result = self
            .engine()
            .call_function(&function, &JsValue::Object(wrapper), &js_args)?;
        marshaler.to_managed_return(&result, &ret)
    }

    /// Type lookup as a JavaScript value wrapping the managed class object
    pub fn find_class(&self, class_name: &str) -> BridgeResult<JsObjectId> {
        self.ensure_running()?;
        let ty = self.resolve_type(class_name)?;
        let class_object = self.runtime().class_object(ty)?;
        self.marshaler().wrap(class_object)
    }

    /// Resolve a type, generating an implementation subtype when needed
    pub fn resolve_class(
        &self,
        class_name: &str,
        implementation: Option<JsObjectId>,
        is_interface: bool,
    ) -> BridgeResult<TypeHandle> {
        self.ensure_running()?;
        self.metadata().resolve_class(class_name, implementation, is_interface)
    }

    /// Name of a resolved type
    pub fn resolve_class_name(&self, ty: TypeHandle) -> BridgeResult<String> {
        self.ensure_running()?;
        self.metadata().resolve_class_name(ty)
    }

    /// One metadata wire batch for `class_name` starting at `index`
    pub fn get_type_metadata(&self, class_name: &str, index: usize) -> BridgeResult<Vec<String>> {
        self.ensure_running()?;
        self.metadata().get_type_metadata(class_name, index)
    }

    /// Methods an implementation object overrides
    pub fn get_method_overrides(&self, implementation: JsObjectId) -> BridgeResult<Vec<String>> {
        self.ensure_running()?;
        get_method_overrides(self.engine().as_ref(), implementation)
    }

    /// Interfaces an implementation object declares
    pub fn get_implemented_interfaces(&self, implementation: JsObjectId) -> BridgeResult<Vec<String>> {
        self.ensure_running()?;
        get_implemented_interfaces(self.engine().as_ref(), implementation)
    }

    /// Descriptor of a method with an exact signature
    pub fn method_entry(&self, class_name: &str, method: &str, signature: &str) -> BridgeResult<Arc<MetadataEntry>> {
        self.ensure_running()?;
        self.metadata().method(class_name, method, signature)
    }

    /// Accessor data for a field
    pub fn field_accessor(&self, class_name: &str, field: &str) -> BridgeResult<FieldCallbackData> {
        self.ensure_running()?;
        FieldCallbackData::new(self.metadata().field(class_name, field)?)
    }

    /// Read a field through its accessor data
    pub fn get_java_field(&self, data: &FieldCallbackData, receiver: &JsValue) -> BridgeResult<JsValue> {
        self.ensure_running()?;
        field::get_java_field(&self.marshaler(), data, receiver)
    }

    /// Write a field through its accessor data
    pub fn set_java_field(&self, data: &FieldCallbackData, receiver: &JsValue, value: &JsValue) -> BridgeResult<()> {
        self.ensure_running()?;
        field::set_java_field(&self.marshaler(), data, receiver, value)
    }

    /// `array[index]`
    pub fn get_array_element(&self, array: ObjectHandle, index: i64, signature: &str) -> BridgeResult<JsValue> {
        self.ensure_running()?;
        array::get_array_element(&self.marshaler(), array, index, signature)
    }

    /// `array[index] = value`
    pub fn set_array_element(
        &self,
        array: ObjectHandle,
        index: i64,
        signature: &str,
        value: &JsValue,
    ) -> BridgeResult<()> {
        self.ensure_running()?;
        array::set_array_element(&self.marshaler(), array, index, signature, value)
    }

    /// Length of a managed array
    pub fn get_array_length(&self, array: ObjectHandle) -> BridgeResult<usize> {
        self.ensure_running()?;
        array::get_array_length(self.runtime().as_ref(), array)
    }
}

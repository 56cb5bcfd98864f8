//! Value marshaling between JavaScript and the managed runtime
//!
//! Primitive conversions are stateless and live in [`numeric`]. Reference
//! conversions go through the object manager so identity is preserved: the
//! same managed object always surfaces as the same wrapper.

pub mod array;
pub mod field;
pub mod numeric;
mod signature;

use conduit_sdk::{BridgeError, BridgeResult, JsValue, ManagedRuntime, ManagedValue, ObjectHandle};

use crate::metadata::MetadataStore;
use crate::objects::ObjectManager;

pub use field::FieldCallbackData;
pub use signature::{ArraySignature, MethodSignature, TypeSignature};

/// Converts values in both directions for one bridge instance
#[derive(Clone, Copy)]
pub struct Marshaler<'a> {
    pub(crate) runtime: &'a dyn ManagedRuntime,
    pub(crate) objects: &'a ObjectManager,
    pub(crate) metadata: &'a MetadataStore,
    /// Whether handles still under construction resolve
    callback: bool,
}

impl<'a> Marshaler<'a> {
    pub fn new(
        runtime: &'a dyn ManagedRuntime,
        objects: &'a ObjectManager,
        metadata: &'a MetadataStore,
    ) -> Self {
        Self {
            runtime,
            objects,
            metadata,
            callback: false,
        }
    }

    /// Marshaler for the callback path, where the receiver of a constructor
    /// in flight and its wrapper may appear as values
    pub fn for_callback(self) -> Self {
        Self {
            callback: true,
            ..self
        }
    }

    /// Convert a JavaScript value for a slot of type `target`
    pub fn to_managed(&self, value: &JsValue, target: &TypeSignature) -> BridgeResult<ManagedValue> {
        if target.is_primitive() {
            return numeric::to_primitive(value, target);
        }
        if *target == TypeSignature::Void {
            return Err(BridgeError::ArgumentError("void is not a value type".to_string()));
        }

        let converted = match value {
            JsValue::Undefined | JsValue::Null => ManagedValue::Null,
            JsValue::String(s) => ManagedValue::String(s.clone()),
            JsValue::Number(n) => ManagedValue::Double(*n),
            JsValue::Bool(b) => ManagedValue::Boolean(*b),
            JsValue::Cast(kind, payload) => numeric::box_cast(*kind, payload)?,
            JsValue::Object(id) => {
                let handle = if self.callback {
                    self.objects.callback_handle_of(*id)
                } else {
                    self.objects.handle_of(*id)
                };
                let handle = handle.ok_or_else(|| BridgeError::TypeMismatch {
                    expected: format!("bridged object for {}", target),
                    got: "plain object".to_string(),
                })?;
                ManagedValue::Object(handle)
            }
        };
        Ok(converted)
    }

    /// Convert a managed value for JavaScript, wrapping objects
    pub fn to_js(&self, value: ManagedValue) -> BridgeResult<JsValue> {
        if let Some(js) = numeric::primitive_to_js(&value) {
            return Ok(js);
        }
        match value {
            ManagedValue::String(s) => Ok(JsValue::String(s)),
            ManagedValue::Object(handle) => self.wrap(handle).map(JsValue::Object),
            _ => Ok(JsValue::Null),
        }
    }

    /// Wrapper for a managed object, created on first sight
    pub fn wrap(&self, handle: ObjectHandle) -> BridgeResult<conduit_sdk::JsObjectId> {
        if self.callback {
            if let Ok(wrapper) = self.objects.callback_wrapper(handle) {
                return Ok(wrapper);
            }
        }
        let class = self.runtime.class_of(handle)?;
        let type_name = self.metadata.resolve_class_name(class)?;
        self.objects.create_js_wrapper(handle, &type_name)
    }

    /// Convert call arguments against a method signature
    pub fn to_managed_args(&self, args: &[JsValue], signature: &MethodSignature) -> BridgeResult<Vec<ManagedValue>> {
        if args.len() != signature.params.len() {
            return Err(BridgeError::ArgumentError(format!(
                "expected {} arguments, got {}",
                signature.params.len(),
                args.len()
            )));
        }
        args.iter()
            .zip(&signature.params)
            .map(|(arg, ty)| self.to_managed(arg, ty))
            .collect()
    }

    /// Convert managed arguments for a JavaScript callback
    pub fn to_js_args(&self, args: &[ManagedValue]) -> BridgeResult<Vec<JsValue>> {
        args.iter().map(|arg| self.to_js(arg.clone())).collect()
    }

    /// Convert a JavaScript return value to the declared return type
    pub fn to_managed_return(&self, value: &JsValue, ret: &TypeSignature) -> BridgeResult<ManagedValue> {
        match ret {
            TypeSignature::Void => Ok(ManagedValue::Void),
            other => self.to_managed(value, other),
        }
    }
}

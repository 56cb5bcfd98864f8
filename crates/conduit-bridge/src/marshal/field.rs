//! Field accessors

use std::sync::Arc;

use conduit_sdk::{BridgeError, BridgeResult, CallTarget, JsValue, MemberKind, MetadataEntry};

use super::{Marshaler, TypeSignature};

/// Data attached to a field accessor: the cached descriptor and its parsed
/// type
#[derive(Debug, Clone)]
pub struct FieldCallbackData {
    pub entry: Arc<MetadataEntry>,
    pub signature: TypeSignature,
}

impl FieldCallbackData {
    pub fn new(entry: Arc<MetadataEntry>) -> BridgeResult<Self> {
        if entry.kind != MemberKind::Field {
            return Err(BridgeError::ArgumentError(format!(
                "{}.{} is not a field",
                entry.declaring_type, entry.name
            )));
        }
        let signature = TypeSignature::parse(&entry.signature)?;
        Ok(Self { entry, signature })
    }

    fn qualified_name(&self) -> String {
        format!("{}.{}", self.entry.declaring_type, self.entry.name)
    }

    // Static vs instance comes from the descriptor, never from the receiver.
    fn target(&self, m: &Marshaler<'_>, receiver: &JsValue) -> BridgeResult<CallTarget> {
        if self.entry.is_static {
            let class = m
                .metadata
                .resolve_class(&self.entry.declaring_type, None, false)?;
            return Ok(CallTarget::Static(class));
        }
        receiver
            .as_object()
            .and_then(|id| m.objects.handle_of(id))
            .map(CallTarget::Instance)
            .ok_or_else(|| BridgeError::TypeMismatch {
                expected: format!("instance of {}", self.entry.declaring_type),
                got: receiver.type_name().to_string(),
            })
    }
}

/// Read a field
pub fn get_java_field(m: &Marshaler<'_>, data: &FieldCallbackData, receiver: &JsValue) -> BridgeResult<JsValue> {
    let target = data.target(m, receiver)?;
    let value = m.runtime.get_field(target, &data.entry)?;
    m.to_js(value)
}

/// Write a field
pub fn set_java_field(
    m: &Marshaler<'_>,
    data: &FieldCallbackData,
    receiver: &JsValue,
    value: &JsValue,
) -> BridgeResult<()> {
    if data.entry.is_final {
        return Err(BridgeError::FinalField(data.qualified_name()));
    }
    let target = data.target(m, receiver)?;
    let value = m.to_managed(value, &data.signature)?;
    m.runtime.set_field(target, &data.entry, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_field_entries() {
        let method = Arc::new(MetadataEntry::method("a.B", "run", "()V"));
        assert!(matches!(FieldCallbackData::new(method), Err(BridgeError::ArgumentError(_))));

        let field = Arc::new(MetadataEntry::field("a.B", "x", "[I"));
        let data = FieldCallbackData::new(field).unwrap();
        assert_eq!(data.signature, TypeSignature::Array(Box::new(TypeSignature::Int)));
        assert_eq!(data.qualified_name(), "a.B.x");
    }
}

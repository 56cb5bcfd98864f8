//! Class definitions for the in-memory managed runtime

use std::sync::Arc;

use conduit_sdk::{BridgeResult, ManagedValue, MetadataEntry, ObjectHandle, TypeDefinition, TypeHandle};
use rustc_hash::FxHashMap;

use crate::runtime::InMemoryRuntime;

/// Body of a method or constructor.
///
/// Receives the runtime, the receiver (`None` for static members) and the
/// already-marshaled arguments.
pub type MethodBody = Arc<
    dyn Fn(&InMemoryRuntime, Option<ObjectHandle>, &[ManagedValue]) -> BridgeResult<ManagedValue>
        + Send
        + Sync,
>;

/// Registered class
pub(crate) struct ClassDef {
    pub(crate) name: String,
    pub(crate) superclass: Option<TypeHandle>,
    pub(crate) is_interface: bool,
    pub(crate) interfaces: Vec<TypeHandle>,
    pub(crate) members: Vec<MetadataEntry>,
    pub(crate) bodies: FxHashMap<(String, String), MethodBody>,
    pub(crate) static_fields: FxHashMap<String, ManagedValue>,
    pub(crate) generated: Option<TypeDefinition>,
    /// Element signature for array pseudo-classes
    pub(crate) array_element: Option<String>,
}

impl ClassDef {
    pub(crate) fn body(&self, name: &str, signature: &str) -> Option<MethodBody> {
        self.bodies
            .get(&(name.to_string(), signature.to_string()))
            .cloned()
    }

    pub(crate) fn instance_fields(&self) -> impl Iterator<Item = &MetadataEntry> + '_ {
        self.members
            .iter()
            .filter(|m| m.kind == conduit_sdk::MemberKind::Field && !m.is_static)
    }
}

/// Default value of a field with the given signature
pub(crate) fn default_value(signature: &str) -> ManagedValue {
    match signature.chars().next() {
        Some('Z') => ManagedValue::Boolean(false),
        Some('B') => ManagedValue::Byte(0),
        Some('C') => ManagedValue::Char(0),
        Some('S') => ManagedValue::Short(0),
        Some('I') => ManagedValue::Int(0),
        Some('J') => ManagedValue::Long(0),
        Some('F') => ManagedValue::Float(0.0),
        Some('D') => ManagedValue::Double(0.0),
        _ => ManagedValue::Null,
    }
}

/// Whether `value` may be stored in an array with element signature `element`
pub(crate) fn element_admits(element: &str, value: &ManagedValue) -> bool {
    match default_value(element) {
        ManagedValue::Null => matches!(
            value,
            ManagedValue::Null | ManagedValue::String(_) | ManagedValue::Object(_)
        ),
        primitive => std::mem::discriminant(&primitive) == std::mem::discriminant(value),
    }
}

/// Builder for classes registered with [`InMemoryRuntime::define_class`]
pub struct ClassBuilder {
    pub(crate) name: String,
    pub(crate) superclass: Option<String>,
    pub(crate) is_interface: bool,
    pub(crate) interfaces: Vec<String>,
    pub(crate) members: Vec<MetadataEntry>,
    pub(crate) bodies: FxHashMap<(String, String), MethodBody>,
    pub(crate) static_fields: FxHashMap<String, ManagedValue>,
}

impl ClassBuilder {
    /// Start a class with the given fully-qualified (dotted) name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            superclass: None,
            is_interface: false,
            interfaces: Vec::new(),
            members: Vec::new(),
            bodies: FxHashMap::default(),
            static_fields: FxHashMap::default(),
        }
    }

    /// Set the superclass
    pub fn extends(mut self, superclass: &str) -> Self {
        self.superclass = Some(superclass.to_string());
        self
    }

    /// Declare this type an interface
    pub fn interface(mut self) -> Self {
        self.is_interface = true;
        self
    }

    /// Add an implemented interface
    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    /// Add an instance method
    pub fn method(
        mut self,
        name: &str,
        signature: &str,
        body: impl Fn(&InMemoryRuntime, Option<ObjectHandle>, &[ManagedValue]) -> BridgeResult<ManagedValue>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        let mut entry = MetadataEntry::method(&self.name, name, signature);
        entry.is_interface = self.is_interface;
        self.members.push(entry);
        self.bodies
            .insert((name.to_string(), signature.to_string()), Arc::new(body));
        self
    }

    /// Add an abstract (body-less) method, e.g. on an interface
    pub fn abstract_method(mut self, name: &str, signature: &str) -> Self {
        let mut entry = MetadataEntry::method(&self.name, name, signature);
        entry.is_interface = self.is_interface;
        self.members.push(entry);
        self
    }

    /// Add a static method
    pub fn static_method(
        mut self,
        name: &str,
        signature: &str,
        body: impl Fn(&InMemoryRuntime, Option<ObjectHandle>, &[ManagedValue]) -> BridgeResult<ManagedValue>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.members
            .push(MetadataEntry::method(&self.name, name, signature).as_static());
        self.bodies
            .insert((name.to_string(), signature.to_string()), Arc::new(body));
        self
    }

    /// Add a constructor
    pub fn constructor(
        mut self,
        signature: &str,
        body: impl Fn(&InMemoryRuntime, Option<ObjectHandle>, &[ManagedValue]) -> BridgeResult<ManagedValue>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.members
            .push(MetadataEntry::constructor(&self.name, signature));
        self.bodies
            .insert(("<init>".to_string(), signature.to_string()), Arc::new(body));
        self
    }

    /// Add an instance field
    pub fn field(mut self, name: &str, signature: &str) -> Self {
        self.members
            .push(MetadataEntry::field(&self.name, name, signature));
        self
    }

    /// Add a final instance field
    pub fn final_field(mut self, name: &str, signature: &str) -> Self {
        self.members
            .push(MetadataEntry::field(&self.name, name, signature).as_final());
        self
    }

    /// Add a static field with an initial value
    pub fn static_field(mut self, name: &str, signature: &str, value: ManagedValue) -> Self {
        self.members
            .push(MetadataEntry::field(&self.name, name, signature).as_static());
        self.static_fields.insert(name.to_string(), value);
        self
    }
}

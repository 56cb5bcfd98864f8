//! Metadata store
//!
//! Lazily-populated cache of managed type information:
//!
//! - [`ClassResolutionCache`]: name <-> [`TypeHandle`], resolved once per name
//! - [`MetadataTreeNode`]: package/type namespace tree; each type node holds
//!   its member descriptors once first requested
//! - dynamic subtypes for JavaScript implementation objects, generated once
//!   per implementation shape
//!
//! Entries are never invalidated while the bridge runs.

mod class_cache;
mod implementation;
mod tree;

use std::sync::Arc;

use conduit_sdk::{
    wire, BridgeError, BridgeResult, JsEngine, JsObjectId, ManagedRuntime, MetadataEntry,
    TypeDefinition, TypeHandle,
};
use tracing::{debug, trace};

pub use class_cache::ClassResolutionCache;
pub use implementation::{
    generated_type_name, get_implemented_interfaces, get_method_overrides, INTERFACES_PROPERTY,
};
pub use tree::{MetadataTreeNode, TypeMembers};

/// Dotted form of a type name (`a/b/C` -> `a.b.C`)
pub fn canonical_name(name: &str) -> String {
    name.replace('/', ".")
}

/// Cache of resolved types and their members
pub struct MetadataStore {
    runtime: Arc<dyn ManagedRuntime>,
    engine: Arc<dyn JsEngine>,
    root: MetadataTreeNode,
    classes: ClassResolutionCache,
    batch_size: usize,
}

impl MetadataStore {
    pub fn new(runtime: Arc<dyn ManagedRuntime>, engine: Arc<dyn JsEngine>, batch_size: usize) -> Self {
        Self {
            runtime,
            engine,
            root: MetadataTreeNode::root(),
            classes: ClassResolutionCache::new(),
            batch_size: batch_size.max(1),
        }
    }

    /// Resolve a type by name.
    ///
    /// With an implementation object that declares overrides or interfaces,
    /// resolves (generating on first use) a subtype of `name` whose overridden
    /// methods call back into JavaScript.
    pub fn resolve_class(
        &self,
        name: &str,
        implementation: Option<JsObjectId>,
        is_interface: bool,
    ) -> BridgeResult<TypeHandle> {
        let canonical = canonical_name(name);
        let Some(implementation) = implementation else {
            return self.resolve_named(&canonical);
        };

        let overrides = get_method_overrides(self.engine.as_ref(), implementation)?;
        let interfaces = get_implemented_interfaces(self.engine.as_ref(), implementation)?;
        if overrides.is_empty() && interfaces.is_empty() {
            return self.resolve_named(&canonical);
        }

        let mut builder = TypeDefinition::builder(canonical.as_str()).interface(is_interface);
        for interface in interfaces {
            builder = builder.implements(interface);
        }
        for method in overrides {
            builder = builder.override_method(method);
        }
        let generated = generated_type_name(&builder);
        if let Some(handle) = self.classes.handle(&generated) {
            return Ok(handle);
        }

        self.resolve_named(&canonical)?;
        for interface in builder.interfaces() {
            self.resolve_named(interface)?;
        }
        let definition = builder.build(generated.as_str());
        let handle = self.runtime.generate_class(&definition)?;
        debug!(
            base = %definition.base,
            name = %definition.name,
            overrides = ?definition.overrides,
            interfaces = ?definition.interfaces,
            "generated implementation type"
        );
        self.classes.insert(&generated, handle);
        self.root.ensure_path(&generated);
        Ok(handle)
    }

    fn resolve_named(&self, canonical: &str) -> BridgeResult<TypeHandle> {
        if let Some(handle) = self.classes.handle(canonical) {
            return Ok(handle);
        }
        let handle = self.runtime.find_class(canonical)?;
        trace!(name = canonical, handle = handle.as_u32(), "resolved class");
        self.classes.insert(canonical, handle);
        self.root.ensure_path(canonical);
        Ok(handle)
    }

    /// Name of a resolved type
    pub fn resolve_class_name(&self, handle: TypeHandle) -> BridgeResult<String> {
        if let Some(name) = self.classes.name(handle) {
            return Ok(name);
        }
        let name = canonical_name(&self.runtime.class_name(handle)?);
        self.classes.insert(&name, handle);
        Ok(name)
    }

    /// One wire batch of member descriptors for `name`, starting at
    /// descriptor `index`
    pub fn get_type_metadata(&self, name: &str, index: usize) -> BridgeResult<Vec<String>> {
        let slots = self
            .runtime
            .type_metadata(&canonical_name(name), index, self.batch_size)?;
        wire::decode_batch(&slots)?;
        Ok(slots)
    }

    /// All members of `name`, fetched in batches on first request
    pub fn type_members(&self, name: &str) -> BridgeResult<Arc<TypeMembers>> {
        let canonical = canonical_name(name);
        let node = self.root.ensure_path(&canonical);
        node.members_or_try_init(|| self.fetch_members(&canonical))
    }

    fn fetch_members(&self, canonical: &str) -> BridgeResult<TypeMembers> {
        let mut entries = Vec::new();
        let mut index = 0;
        loop {
            let slots = self.runtime.type_metadata(canonical, index, self.batch_size)?;
            let batch = wire::decode_batch(&slots)?;
            if batch.entries.is_empty() && index < batch.total {
                return Err(BridgeError::MalformedMetadata(format!(
                    "empty batch at {} of {} for {}",
                    index, batch.total, canonical
                )));
            }
            let next = batch.next_index(index);
            entries.extend(batch.entries);
            match next {
                Some(n) => index = n,
                None => break,
            }
        }
        debug!(name = canonical, members = entries.len(), "loaded type metadata");
        Ok(TypeMembers::new(entries))
    }

    /// Method overloads named `method` declared by `class`
    pub fn methods(&self, class: &str, method: &str) -> BridgeResult<Vec<Arc<MetadataEntry>>> {
        Ok(self.type_members(class)?.methods(method).cloned().collect())
    }

    /// Method of `class` with an exact signature
    pub fn method(&self, class: &str, method: &str, signature: &str) -> BridgeResult<Arc<MetadataEntry>> {
        self.type_members(class)?
            .method(method, signature)
            .ok_or_else(|| BridgeError::method_not_found(canonical_name(class), method))
    }

    /// Field of `class`
    pub fn field(&self, class: &str, field: &str) -> BridgeResult<Arc<MetadataEntry>> {
        self.type_members(class)?.field(field).ok_or_else(|| {
            BridgeError::ArgumentError(format!("no field {} on {}", field, canonical_name(class)))
        })
    }

    /// Constructor of `class` with an exact signature
    pub fn constructor(&self, class: &str, signature: &str) -> BridgeResult<Arc<MetadataEntry>> {
        self.type_members(class)?
            .constructor(signature)
            .ok_or_else(|| BridgeError::method_not_found(canonical_name(class), "<init>"))
    }

    /// Namespace tree root
    pub fn tree(&self) -> &MetadataTreeNode {
        &self.root
    }

    /// Class resolution cache
    pub fn classes(&self) -> &ClassResolutionCache {
        &self.classes
    }

    /// Forget resolved classes (members stay in the tree)
    pub fn clear(&self) {
        self.classes.clear();
    }
}

//! Namespace tree: package segments down to types, types carry members

use std::sync::Arc;

use conduit_sdk::{MemberKind, MetadataEntry};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Members of one type, in declaration order
#[derive(Debug, Default)]
pub struct TypeMembers {
    entries: Vec<Arc<MetadataEntry>>,
}

impl TypeMembers {
    pub fn new(entries: Vec<MetadataEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(Arc::new).collect(),
        }
    }

    /// All members
    pub fn entries(&self) -> &[Arc<MetadataEntry>] {
        &self.entries
    }

    /// Method overloads named `name`
    pub fn methods<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Arc<MetadataEntry>> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.kind == MemberKind::Method && e.name == name)
    }

    /// Method with an exact signature
    pub fn method(&self, name: &str, signature: &str) -> Option<Arc<MetadataEntry>> {
        self.methods(name).find(|e| e.signature == signature).cloned()
    }

    /// Field named `name`
    pub fn field(&self, name: &str) -> Option<Arc<MetadataEntry>> {
        self.entries
            .iter()
            .find(|e| e.kind == MemberKind::Field && e.name == name)
            .cloned()
    }

    /// Constructor with an exact signature
    pub fn constructor(&self, signature: &str) -> Option<Arc<MetadataEntry>> {
        self.entries
            .iter()
            .find(|e| e.kind == MemberKind::Constructor && e.signature == signature)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One namespace segment
///
/// Children are only ever added; member lists are written once.
#[derive(Debug, Default)]
pub struct MetadataTreeNode {
    name: String,
    children: RwLock<FxHashMap<String, Arc<MetadataTreeNode>>>,
    members: OnceCell<Arc<TypeMembers>>,
}

impl MetadataTreeNode {
    pub fn root() -> Self {
        Self::default()
    }

    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct child named `segment`, if present
    pub fn child(&self, segment: &str) -> Option<Arc<MetadataTreeNode>> {
        self.children.read().get(segment).cloned()
    }

    /// Walk a dotted path, creating missing nodes
    pub fn ensure_path(&self, dotted: &str) -> Arc<MetadataTreeNode> {
        let mut segments = dotted.split('.');
        let first = segments.next().unwrap_or_default();
        let mut node = self.ensure_child(first);
        for segment in segments {
            node = node.ensure_child(segment);
        }
        node
    }

    /// Walk a dotted path without creating nodes
    pub fn find_path(&self, dotted: &str) -> Option<Arc<MetadataTreeNode>> {
        let mut segments = dotted.split('.');
        let mut node = self.child(segments.next()?)?;
        for segment in segments {
            node = node.child(segment)?;
        }
        Some(node)
    }

    fn ensure_child(&self, segment: &str) -> Arc<MetadataTreeNode> {
        if let Some(child) = self.child(segment) {
            return child;
        }
        self.children
            .write()
            .entry(segment.to_string())
            .or_insert_with(|| Arc::new(MetadataTreeNode::new(segment)))
            .clone()
    }

    /// Members, loading them on first access
    pub fn members_or_try_init<E>(
        &self,
        load: impl FnOnce() -> Result<TypeMembers, E>,
    ) -> Result<Arc<TypeMembers>, E> {
        self.members
            .get_or_try_init(|| load().map(Arc::new))
            .cloned()
    }

    /// Members if already loaded
    pub fn members(&self) -> Option<Arc<TypeMembers>> {
        self.members.get().cloned()
    }

    /// Number of direct children
    pub fn child_count(&self) -> usize {
        self.children.read().len()
    }
}

//! Values and handles that cross the bridge
//!
//! Two value universes meet here:
//!
//! - [`ManagedValue`]: the managed runtime's primitive and reference
//!   encodings. References are [`ObjectHandle`]s, never pointers.
//! - [`JsValue`]: what the JavaScript engine sees. Objects are
//!   [`JsObjectId`]s into the engine's heap.
//!
//! Neither side owns the other's memory: a handle is a tag.

use std::fmt;

// ============================================================================
// Handles
// ============================================================================

/// Opaque identifier of one managed-runtime object.
///
/// Unique for the lifetime of that object; reused only after explicit release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(u32);

impl ObjectHandle {
    /// Create a handle from its raw ID
    pub const fn new(id: u32) -> Self {
        ObjectHandle(id)
    }

    /// Get the raw ID value
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable handle to a resolved managed type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeHandle(u32);

impl TypeHandle {
    /// Create a type handle from its raw ID
    pub const fn new(id: u32) -> Self {
        TypeHandle(id)
    }

    /// Get the raw ID value
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

/// Identity of an object living in the JavaScript heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsObjectId(u64);

impl JsObjectId {
    /// Create an object ID from its raw value
    pub const fn new(id: u64) -> Self {
        JsObjectId(id)
    }

    /// Get the raw ID value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

// ============================================================================
// Managed values
// ============================================================================

/// A value in the managed runtime's encoding
#[derive(Debug, Clone, PartialEq)]
pub enum ManagedValue {
    /// No value (void return)
    Void,
    /// Null reference
    Null,
    /// `Z`
    Boolean(bool),
    /// `B`
    Byte(i8),
    /// `C` (one UTF-16 code unit)
    Char(u16),
    /// `S`
    Short(i16),
    /// `I`
    Int(i32),
    /// `J`
    Long(i64),
    /// `F`
    Float(f32),
    /// `D`
    Double(f64),
    /// Managed string
    String(String),
    /// Reference to a managed object
    Object(ObjectHandle),
}

impl ManagedValue {
    /// Get type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            ManagedValue::Void => "void",
            ManagedValue::Null => "null",
            ManagedValue::Boolean(_) => "boolean",
            ManagedValue::Byte(_) => "byte",
            ManagedValue::Char(_) => "char",
            ManagedValue::Short(_) => "short",
            ManagedValue::Int(_) => "int",
            ManagedValue::Long(_) => "long",
            ManagedValue::Float(_) => "float",
            ManagedValue::Double(_) => "double",
            ManagedValue::String(_) => "string",
            ManagedValue::Object(_) => "object",
        }
    }

    /// Get the object handle if this is a reference
    pub fn as_object(&self) -> Option<ObjectHandle> {
        match self {
            ManagedValue::Object(h) => Some(*h),
            _ => None,
        }
    }

    /// Check if value is null or void
    pub fn is_null(&self) -> bool {
        matches!(self, ManagedValue::Null | ManagedValue::Void)
    }
}

// ============================================================================
// JavaScript values
// ============================================================================

/// Numeric narrowing requested by one of the global cast functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastKind {
    /// `byte(x)`
    Byte,
    /// `short(x)`
    Short,
    /// `char(x)`
    Char,
    /// `long(x)`
    Long,
    /// `float(x)`
    Float,
    /// `double(x)`
    Double,
}

impl CastKind {
    /// Name of the global function that produces this cast
    pub const fn function_name(&self) -> &'static str {
        match self {
            CastKind::Byte => "byte",
            CastKind::Short => "short",
            CastKind::Char => "char",
            CastKind::Long => "long",
            CastKind::Float => "float",
            CastKind::Double => "double",
        }
    }

    /// All cast kinds, in installation order
    pub const ALL: [CastKind; 6] = [
        CastKind::Byte,
        CastKind::Short,
        CastKind::Char,
        CastKind::Long,
        CastKind::Float,
        CastKind::Double,
    ];
}

/// A value as seen by the JavaScript engine
#[derive(Debug, Clone, PartialEq)]
pub enum JsValue {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// Boolean primitive
    Bool(bool),
    /// Number primitive
    Number(f64),
    /// String primitive
    String(String),
    /// Heap object (plain object, function, array or bridged wrapper)
    Object(JsObjectId),
    /// Value marked by a global cast function; payload is a Number or,
    /// for `long`/`char`, possibly a String
    Cast(CastKind, Box<JsValue>),
}

impl JsValue {
    /// Create a number value
    pub fn number(n: impl Into<f64>) -> Self {
        JsValue::Number(n.into())
    }

    /// Create a string value
    pub fn string(s: impl Into<String>) -> Self {
        JsValue::String(s.into())
    }

    /// Create a cast value
    pub fn cast(kind: CastKind, payload: JsValue) -> Self {
        JsValue::Cast(kind, Box::new(payload))
    }

    /// Get type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "null",
            JsValue::Bool(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Object(_) => "object",
            JsValue::Cast(..) => "cast",
        }
    }

    /// Check for `null` or `undefined`
    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }

    /// Get the object ID if this is an object
    pub fn as_object(&self) -> Option<JsObjectId> {
        match self {
            JsValue::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// Get as f64 if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            JsValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as string slice if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Bool(b)
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<i32> for JsValue {
    fn from(n: i32) -> Self {
        JsValue::Number(n as f64)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(s.to_string())
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(s)
    }
}

impl From<JsObjectId> for JsValue {
    fn from(id: JsObjectId) -> Self {
        JsValue::Object(id)
    }
}

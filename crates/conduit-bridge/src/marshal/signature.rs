//! Compact type signatures
//!
//! `Z B C S I J F D V` for primitives and void, `L<name>;` for object types
//! and `[<type>` for arrays. Method signatures are `(<params>)<return>`.

use std::fmt;

use conduit_sdk::{BridgeError, BridgeResult, ManagedValue};

/// Deepest array nesting a signature may describe
pub const MAX_ARRAY_RANK: usize = 255;

/// Signature of a single value type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSignature {
    /// `Z`
    Boolean,
    /// `B`
    Byte,
    /// `C`
    Char,
    /// `S`
    Short,
    /// `I`
    Int,
    /// `J`
    Long,
    /// `F`
    Float,
    /// `D`
    Double,
    /// `V`, return position only
    Void,
    /// `L<name>;`, name kept in slash form
    Object(String),
    /// `[<component>`
    Array(Box<TypeSignature>),
}

impl TypeSignature {
    /// Parse a complete single-type signature
    pub fn parse(signature: &str) -> BridgeResult<Self> {
        let (ty, rest) = Self::parse_prefix(signature)?;
        if !rest.is_empty() {
            return Err(malformed(signature));
        }
        Ok(ty)
    }

    fn parse_prefix(input: &str) -> BridgeResult<(Self, &str)> {
        let rank = input.bytes().take_while(|b| *b == b'[').count();
        if rank > MAX_ARRAY_RANK {
            return Err(BridgeError::ArgumentError(format!(
                "array rank {} exceeds {}",
                rank, MAX_ARRAY_RANK
            )));
        }

        let body = &input[rank..];
        let mut chars = body.chars();
        let mut ty = match chars.next() {
            Some('Z') => TypeSignature::Boolean,
            Some('B') => TypeSignature::Byte,
            Some('C') => TypeSignature::Char,
            Some('S') => TypeSignature::Short,
            Some('I') => TypeSignature::Int,
            Some('J') => TypeSignature::Long,
            Some('F') => TypeSignature::Float,
            Some('D') => TypeSignature::Double,
            Some('V') if rank == 0 => TypeSignature::Void,
            Some('L') => {
                let name = chars.as_str();
                let end = name.find(';').filter(|end| *end > 0).ok_or_else(|| malformed(input))?;
                chars = name[end + 1..].chars();
                TypeSignature::Object(name[..end].to_string())
            }
            _ => return Err(malformed(input)),
        };
        for _ in 0..rank {
            ty = TypeSignature::Array(Box::new(ty));
        }
        Ok((ty, chars.as_str()))
    }

    /// Same signature with object names in dotted form
    pub fn canonical(&self) -> TypeSignature {
        match self {
            TypeSignature::Object(name) => TypeSignature::Object(name.replace('/', ".")),
            TypeSignature::Array(component) => TypeSignature::Array(Box::new(component.canonical())),
            other => other.clone(),
        }
    }

    /// Whether this is one of the eight primitive types
    pub fn is_primitive(&self) -> bool {
        !matches!(
            self,
            TypeSignature::Void | TypeSignature::Object(_) | TypeSignature::Array(_)
        )
    }

    /// Whether this is the managed string type
    pub fn is_string(&self) -> bool {
        matches!(self, TypeSignature::Object(name) if name == "java/lang/String" || name == "java.lang.String")
    }

    /// Whether values of this type are references
    pub fn is_reference(&self) -> bool {
        matches!(self, TypeSignature::Object(_) | TypeSignature::Array(_))
    }

    /// Short name used in range errors
    pub fn type_name(&self) -> &'static str {
        match self {
            TypeSignature::Boolean => "boolean",
            TypeSignature::Byte => "byte",
            TypeSignature::Char => "char",
            TypeSignature::Short => "short",
            TypeSignature::Int => "int",
            TypeSignature::Long => "long",
            TypeSignature::Float => "float",
            TypeSignature::Double => "double",
            TypeSignature::Void => "void",
            TypeSignature::Object(_) => "object",
            TypeSignature::Array(_) => "array",
        }
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSignature::Boolean => f.write_str("Z"),
            TypeSignature::Byte => f.write_str("B"),
            TypeSignature::Char => f.write_str("C"),
            TypeSignature::Short => f.write_str("S"),
            TypeSignature::Int => f.write_str("I"),
            TypeSignature::Long => f.write_str("J"),
            TypeSignature::Float => f.write_str("F"),
            TypeSignature::Double => f.write_str("D"),
            TypeSignature::Void => f.write_str("V"),
            TypeSignature::Object(name) => write!(f, "L{};", name),
            TypeSignature::Array(component) => write!(f, "[{}", component),
        }
    }
}

/// Parameter and return types of a method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    /// Parameter types in order
    pub params: Vec<TypeSignature>,
    /// Return type
    pub ret: TypeSignature,
}

impl MethodSignature {
    /// Parse `(<params>)<return>`
    pub fn parse(signature: &str) -> BridgeResult<Self> {
        let body = signature.strip_prefix('(').ok_or_else(|| malformed(signature))?;
        let close = body.find(')').ok_or_else(|| malformed(signature))?;

        let mut params = Vec::new();
        let mut rest = &body[..close];
        while !rest.is_empty() {
            let (ty, tail) = TypeSignature::parse_prefix(rest)?;
            if ty == TypeSignature::Void {
                return Err(malformed(signature));
            }
            params.push(ty);
            rest = tail;
        }

        let ret = TypeSignature::parse(&body[close + 1..])?;
        Ok(Self { params, ret })
    }
}

/// Element type and rank of an array, cached alongside array handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArraySignature {
    /// Type of the elements one level down
    pub component: TypeSignature,
    /// Innermost non-array type
    pub base: TypeSignature,
    /// Number of dimensions
    pub rank: usize,
}

impl ArraySignature {
    /// Parse a signature starting with at least one `[`
    pub fn parse(signature: &str) -> BridgeResult<Self> {
        match TypeSignature::parse(signature)? {
            TypeSignature::Array(component) => {
                let mut rank = 1;
                let mut base = component.as_ref();
                while let TypeSignature::Array(inner) = base {
                    rank += 1;
                    base = inner;
                }
                let base = base.clone();
                Ok(Self {
                    component: *component,
                    base,
                    rank,
                })
            }
            _ => Err(BridgeError::ArgumentError(format!(
                "not an array signature: {}",
                signature
            ))),
        }
    }
}

impl ArraySignature {
    /// Whole array type with object names in dotted form
    pub fn canonical(&self) -> TypeSignature {
        TypeSignature::Array(Box::new(self.component.canonical()))
    }

    /// Whether `value` can be an element of this array
    pub fn admits(&self, value: &ManagedValue) -> bool {
        match (&self.component, value) {
            (TypeSignature::Boolean, ManagedValue::Boolean(_))
            | (TypeSignature::Byte, ManagedValue::Byte(_))
            | (TypeSignature::Char, ManagedValue::Char(_))
            | (TypeSignature::Short, ManagedValue::Short(_))
            | (TypeSignature::Int, ManagedValue::Int(_))
            | (TypeSignature::Long, ManagedValue::Long(_))
            | (TypeSignature::Float, ManagedValue::Float(_))
            | (TypeSignature::Double, ManagedValue::Double(_)) => true,
            (component, ManagedValue::Null | ManagedValue::String(_) | ManagedValue::Object(_)) => {
                component.is_reference()
            }
            _ => false,
        }
    }
}

impl fmt::Display for ArraySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.component)
    }
}

fn malformed(signature: &str) -> BridgeError {
    BridgeError::ArgumentError(format!("malformed signature: {:?}", signature))
}

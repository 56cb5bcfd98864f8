//! Member descriptors
//!
//! A [`MetadataEntry`] describes one method, field or constructor of a
//! managed type. Entries are immutable once constructed; the bridge caches
//! them behind `Arc` for the lifetime of the process.

use crate::error::{BridgeError, BridgeResult};

/// Kind of member a descriptor refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Instance or static method
    Method,
    /// Instance or static field
    Field,
    /// Constructor
    Constructor,
}

impl MemberKind {
    const fn flag_char(&self) -> char {
        match self {
            MemberKind::Method => 'M',
            MemberKind::Field => 'F',
            MemberKind::Constructor => 'C',
        }
    }

    fn from_flag_char(c: char) -> Option<Self> {
        match c {
            'M' => Some(MemberKind::Method),
            'F' => Some(MemberKind::Field),
            'C' => Some(MemberKind::Constructor),
            _ => None,
        }
    }
}

/// Descriptor of one member of a managed type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetadataEntry {
    /// Member name (`<init>` for constructors)
    pub name: String,
    /// Type signature (`(IJ)V` for methods, `I` for fields)
    pub signature: String,
    /// Member kind
    pub kind: MemberKind,
    /// Static member
    pub is_static: bool,
    /// Final field (assignment rejected)
    pub is_final: bool,
    /// Declared on an interface or reached through super dispatch
    pub is_interface: bool,
    /// Fully-qualified name of the declaring type
    pub declaring_type: String,
}

impl MetadataEntry {
    /// Create an instance method descriptor
    pub fn method(declaring_type: &str, name: &str, signature: &str) -> Self {
        Self::new(MemberKind::Method, declaring_type, name, signature)
    }

    /// Create an instance field descriptor
    pub fn field(declaring_type: &str, name: &str, signature: &str) -> Self {
        Self::new(MemberKind::Field, declaring_type, name, signature)
    }

    /// Create a constructor descriptor
    pub fn constructor(declaring_type: &str, signature: &str) -> Self {
        Self::new(MemberKind::Constructor, declaring_type, "<init>", signature)
    }

    fn new(kind: MemberKind, declaring_type: &str, name: &str, signature: &str) -> Self {
        Self {
            name: name.to_string(),
            signature: signature.to_string(),
            kind,
            is_static: false,
            is_final: false,
            is_interface: false,
            declaring_type: declaring_type.to_string(),
        }
    }

    /// Mark as static
    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Mark as final
    pub fn as_final(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Mark as interface member
    pub fn as_interface(mut self) -> Self {
        self.is_interface = true;
        self
    }

    /// Encode kind and modifiers as a wire flags string (e.g. `"Msf"`)
    pub fn flags(&self) -> String {
        let mut flags = String::with_capacity(4);
        flags.push(self.kind.flag_char());
        if self.is_static {
            flags.push('s');
        }
        if self.is_final {
            flags.push('f');
        }
        if self.is_interface {
            flags.push('i');
        }
        flags
    }

    /// Rebuild a descriptor from its wire slots
    pub fn from_slots(
        name: &str,
        signature: &str,
        flags: &str,
        declaring_type: &str,
    ) -> BridgeResult<Self> {
        let mut chars = flags.chars();
        let kind = chars
            .next()
            .and_then(MemberKind::from_flag_char)
            .ok_or_else(|| BridgeError::MalformedMetadata(format!("bad member kind in '{}'", flags)))?;

        let mut entry = Self::new(kind, declaring_type, name, signature);
        for c in chars {
            let slot = match c {
                's' => &mut entry.is_static,
                'f' => &mut entry.is_final,
                'i' => &mut entry.is_interface,
                other => {
                    return Err(BridgeError::MalformedMetadata(format!(
                        "unknown flag '{}' in '{}'",
                        other, flags
                    )))
                }
            };
            if *slot {
                return Err(BridgeError::MalformedMetadata(format!(
                    "duplicate flag '{}' in '{}'",
                    c, flags
                )));
            }
            *slot = true;
        }
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_encoding() {
        let entry = MetadataEntry::field("a.B", "MAX", "I").as_static().as_final();
        assert_eq!(entry.flags(), "Fsf");
        assert_eq!(MetadataEntry::method("a.B", "run", "()V").flags(), "M");
        assert_eq!(MetadataEntry::constructor("a.B", "()V").name, "<init>");
    }

    #[test]
    fn test_from_slots_accepts_any_flag_order() {
        let entry = MetadataEntry::from_slots("run", "()V", "Mis", "a.B").unwrap();
        assert!(entry.is_static);
        assert!(entry.is_interface);
        assert!(!entry.is_final);
        assert_eq!(entry.kind, MemberKind::Method);
    }

    #[test]
    fn test_from_slots_rejects_bad_flags() {
        assert!(MetadataEntry::from_slots("x", "I", "", "a.B").is_err());
        assert!(MetadataEntry::from_slots("x", "I", "Q", "a.B").is_err());
        assert!(MetadataEntry::from_slots("x", "I", "Fz", "a.B").is_err());
        assert!(MetadataEntry::from_slots("x", "I", "Fss", "a.B").is_err());
    }
}

//! Dynamic type definitions
//!
//! When a JavaScript implementation object extends a managed class or
//! implements a managed interface, the bridge describes the type it needs as
//! a [`TypeDefinition`] and the managed runtime generates the actual code.

/// Request to generate a concrete managed type at runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDefinition {
    /// Name of the generated type
    pub name: String,
    /// Base class, or the interface being implemented when `is_interface`
    pub base: String,
    /// `base` names an interface rather than a class
    pub is_interface: bool,
    /// Methods whose bodies call back into JavaScript, in declaration order
    pub overrides: Vec<String>,
    /// Additional interfaces the generated type implements, in declaration order
    pub interfaces: Vec<String>,
}

impl TypeDefinition {
    /// Start a definition extending `base`
    pub fn builder(base: impl Into<String>) -> TypeDefinitionBuilder {
        TypeDefinitionBuilder {
            base: base.into(),
            is_interface: false,
            overrides: Vec::new(),
            interfaces: Vec::new(),
        }
    }

    /// Check whether `method` is routed to JavaScript
    pub fn overrides_method(&self, method: &str) -> bool {
        self.overrides.iter().any(|m| m == method)
    }
}

/// Builder for [`TypeDefinition`]
#[derive(Debug, Clone)]
pub struct TypeDefinitionBuilder {
    base: String,
    is_interface: bool,
    overrides: Vec<String>,
    interfaces: Vec<String>,
}

impl TypeDefinitionBuilder {
    /// Treat the base as an interface
    pub fn interface(mut self, is_interface: bool) -> Self {
        self.is_interface = is_interface;
        self
    }

    /// Add a method override (duplicates are ignored)
    pub fn override_method(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.overrides.contains(&name) {
            self.overrides.push(name);
        }
        self
    }

    /// Add an implemented interface (duplicates are ignored)
    pub fn implements(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.interfaces.contains(&name) {
            self.interfaces.push(name);
        }
        self
    }

    /// Base type name
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Whether the base is an interface
    pub fn is_interface(&self) -> bool {
        self.is_interface
    }

    /// Overrides collected so far
    pub fn overrides(&self) -> &[String] {
        &self.overrides
    }

    /// Interfaces collected so far
    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    /// Finish the definition under the given generated name
    pub fn build(self, name: impl Into<String>) -> TypeDefinition {
        TypeDefinition {
            name: name.into(),
            base: self.base,
            is_interface: self.is_interface,
            overrides: self.overrides,
            interfaces: self.interfaces,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_preserves_declaration_order() {
        let def = TypeDefinition::builder("java.lang.Object")
            .override_method("run")
            .override_method("toString")
            .override_method("run")
            .implements("java.lang.Runnable")
            .build("gen.Runner");

        assert_eq!(def.overrides, ["run", "toString"]);
        assert_eq!(def.interfaces, ["java.lang.Runnable"]);
        assert!(def.overrides_method("toString"));
        assert!(!def.overrides_method("hashCode"));
        assert!(!def.is_interface);
    }

    #[test]
    fn test_interface_flag() {
        let def = TypeDefinition::builder("java.lang.Runnable")
            .interface(true)
            .build("gen.R");
        assert!(def.is_interface);
        assert_eq!(def.base, "java.lang.Runnable");
    }
}

//! Error taxonomy shared across the bridge boundary

/// Result type for every fallible bridge operation
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Bridge error types
///
/// Resolution failures (`ClassNotFound`, `MethodNotFound`, `UnknownHandle`)
/// indicate a logic error at the call site and are never retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    /// The managed runtime could not locate or load a type
    #[error("Class not found: {0}")]
    ClassNotFound(String),

    /// No member descriptor matches the requested method
    #[error("Method not found: {class}.{method}")]
    MethodNotFound {
        /// Declaring or target type name
        class: String,
        /// Method name
        method: String,
    },

    /// Handle referenced after release, or never registered
    #[error("Unknown object handle: {0}")]
    UnknownHandle(u32),

    /// Array index outside `[0, length)`
    #[error("Index {index} out of range for array of length {length}")]
    IndexOutOfRange {
        /// Requested index
        index: i64,
        /// Reported array length
        length: usize,
    },

    /// Value outside the target numeric domain
    #[error("Value {value} is out of range for {target}")]
    NumericRangeError {
        /// Textual form of the rejected value
        value: String,
        /// Target type name (e.g. "byte")
        target: &'static str,
    },

    /// Exception raised by managed code during a bridged call
    #[error("{type_name}: {message}")]
    ManagedException {
        /// Fully-qualified managed exception type
        type_name: String,
        /// Exception message
        message: String,
    },

    /// Error raised by JavaScript code during a callback
    #[error("JavaScript error: {message}")]
    JavaScriptException {
        /// Error message (including the JS error name when known)
        message: String,
    },

    /// Value has the wrong shape for the requested conversion
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name
        got: String,
    },

    /// Invalid argument (arity, malformed signature, bad option)
    #[error("Argument error: {0}")]
    ArgumentError(String),

    /// Assignment to a final field
    #[error("Cannot assign to final field {0}")]
    FinalField(String),

    /// Metadata batch violates the wire schema
    #[error("Malformed metadata: {0}")]
    MalformedMetadata(String),

    /// Bridge used after `shutdown`
    #[error("Bridge has been shut down")]
    ShutDown,
}

impl BridgeError {
    /// Shorthand for a managed-side exception
    pub fn managed(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        BridgeError::ManagedException {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a JavaScript-side exception
    pub fn javascript(message: impl Into<String>) -> Self {
        BridgeError::JavaScriptException {
            message: message.into(),
        }
    }

    /// Shorthand for a missing method
    pub fn method_not_found(class: impl Into<String>, method: impl Into<String>) -> Self {
        BridgeError::MethodNotFound {
            class: class.into(),
            method: method.into(),
        }
    }

    /// Name of the JavaScript error constructor the embedder should throw.
    ///
    /// Managed exceptions keep their managed type name so scripts can
    /// discriminate on it.
    pub fn js_error_name(&self) -> &str {
        match self {
            BridgeError::ClassNotFound(_)
            | BridgeError::MethodNotFound { .. }
            | BridgeError::UnknownHandle(_) => "ReferenceError",
            BridgeError::IndexOutOfRange { .. } | BridgeError::NumericRangeError { .. } => {
                "RangeError"
            }
            BridgeError::TypeMismatch { .. }
            | BridgeError::ArgumentError(_)
            | BridgeError::FinalField(_) => "TypeError",
            BridgeError::ManagedException { type_name, .. } => type_name,
            BridgeError::JavaScriptException { .. }
            | BridgeError::MalformedMetadata(_)
            | BridgeError::ShutDown => "Error",
        }
    }

    /// Check whether this is a resolution failure
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            BridgeError::ClassNotFound(_)
                | BridgeError::MethodNotFound { .. }
                | BridgeError::UnknownHandle(_)
        )
    }
}

impl From<String> for BridgeError {
    fn from(s: String) -> Self {
        BridgeError::ArgumentError(s)
    }
}

impl From<&str> for BridgeError {
    fn from(s: &str) -> Self {
        BridgeError::ArgumentError(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_error_names() {
        assert_eq!(BridgeError::ClassNotFound("a.B".into()).js_error_name(), "ReferenceError");
        assert_eq!(
            BridgeError::IndexOutOfRange { index: 3, length: 3 }.js_error_name(),
            "RangeError"
        );
        assert_eq!(
            BridgeError::managed("java.io.IOException", "disk").js_error_name(),
            "java.io.IOException"
        );
        assert_eq!(BridgeError::FinalField("x".into()).js_error_name(), "TypeError");
    }

    #[test]
    fn test_managed_exception_display_keeps_type_and_message() {
        let err = BridgeError::managed("java.lang.IllegalStateException", "boom");
        assert_eq!(err.to_string(), "java.lang.IllegalStateException: boom");
    }

    #[test]
    fn test_resolution_failures() {
        assert!(BridgeError::UnknownHandle(7).is_resolution_failure());
        assert!(BridgeError::method_not_found("a.B", "c").is_resolution_failure());
        assert!(!BridgeError::ShutDown.is_resolution_failure());
    }
}

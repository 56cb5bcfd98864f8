//! Conduit SDK - contract types for the JavaScript/managed-runtime bridge
//!
//! This crate holds everything both sides of the bridge must agree on
//! without depending on the bridge itself:
//!
//! - **Values and handles**: [`ManagedValue`], [`JsValue`], [`ObjectHandle`]
//! - **Errors**: the [`BridgeError`] taxonomy
//! - **Collaborators**: the [`ManagedRuntime`] and [`JsEngine`] traits
//! - **Metadata**: [`MetadataEntry`] and the versioned [`wire`] format
//! - **Dynamic types**: [`TypeDefinition`] requests for generated subtypes

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod engine;
pub mod error;
pub mod handler;
pub mod metadata;
pub mod runtime;
pub mod type_def;
pub mod value;
pub mod wire;

pub use engine::{CollectionHook, JsEngine, Strength};
pub use error::{BridgeError, BridgeResult};
pub use handler::{GlobalFunctionRegistry, NativeFunction};
pub use metadata::{MemberKind, MetadataEntry};
pub use runtime::{CallTarget, Dispatch, ManagedRuntime};
pub use type_def::{TypeDefinition, TypeDefinitionBuilder};
pub use value::{CastKind, JsObjectId, JsValue, ManagedValue, ObjectHandle, TypeHandle};
pub use wire::MetadataBatch;

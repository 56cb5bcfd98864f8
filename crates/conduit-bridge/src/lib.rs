//! Conduit Bridge
//!
//! Invocation and object-identity bridge between a JavaScript engine and a
//! managed object runtime. JavaScript can construct managed objects, call
//! their methods, read and write their fields and index their arrays; the
//! managed runtime can call methods implemented in JavaScript.
//!
//! - **Metadata** (`metadata` module): lazily-built type and member cache
//! - **Marshaling** (`marshal` module): range-checked value conversion,
//!   array and field access
//! - **Objects** (`objects` module): handle/wrapper identity and reference
//!   strength across both garbage collectors
//! - **Dispatch** (`dispatch` module): calls in both directions
//!
//! # Example
//!
//! ```rust,ignore
//! use conduit_bridge::{Bridge, BridgeBindings, ConstructorArgs};
//!
//! let bridge = Bridge::init(BridgeBindings::new(runtime, engine))?;
//! let wrapper = engine.create_wrapper("com.example.Widget")?;
//! bridge.register_instance(wrapper, "com.example.Widget", &ConstructorArgs::none(), None, false)?;
//! ```

#![warn(rust_2018_idioms)]

pub mod casts;
pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod executor;
pub mod marshal;
pub mod metadata;
pub mod objects;
mod service;

pub use casts::create_global_cast_functions;
pub use config::{BridgeBindings, BridgeConfig, ConfigError, ExitHook};
pub use diagnostics::{LogLevel, JS_LOG_TARGET};
pub use dispatch::ConstructorArgs;
pub use marshal::{ArraySignature, FieldCallbackData, MethodSignature, TypeSignature};
pub use metadata::MetadataStore;
pub use objects::ObjectManager;
pub use service::Bridge;

pub use conduit_sdk::{BridgeError, BridgeResult};

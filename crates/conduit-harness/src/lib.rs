//! In-memory collaborators for exercising the bridge
//!
//! [`InMemoryRuntime`] stands in for the managed runtime and
//! [`InMemoryEngine`] for the JavaScript engine. Both keep their whole heap
//! in process and expose inspection helpers (pin counts, wrapper strength,
//! call counters) that tests assert against.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod class;
mod engine;
mod runtime;

pub use class::{ClassBuilder, MethodBody};
pub use engine::{FunctionBody, InMemoryEngine};
pub use runtime::{CallCounters, InMemoryRuntime, JsCallback, JS_EXCEPTION_TYPE};

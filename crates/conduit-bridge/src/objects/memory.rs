//! Memory-pressure feedback from the managed heap to the JavaScript GC

use std::sync::atomic::{AtomicU32, Ordering};

use conduit_sdk::{JsEngine, ManagedRuntime};
use tracing::{debug, warn};

/// Periodically forwards the managed heap's byte delta to the engine's
/// external-memory accounting
#[derive(Debug)]
pub struct MemoryPressure {
    interval: u32,
    calls: AtomicU32,
}

impl MemoryPressure {
    /// Report every `interval` calls; 0 disables periodic reports
    pub fn new(interval: u32) -> Self {
        Self {
            interval,
            calls: AtomicU32::new(0),
        }
    }

    /// Count one bridged call, reporting when the interval elapses
    pub fn tick(&self, runtime: &dyn ManagedRuntime, engine: &dyn JsEngine) {
        if self.interval == 0 {
            return;
        }
        let calls = self.calls.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        if calls % self.interval == 0 {
            self.report(runtime, engine);
        }
    }

    /// Report now. Failures are logged and otherwise ignored.
    pub fn report(&self, runtime: &dyn ManagedRuntime, engine: &dyn JsEngine) {
        match runtime.take_memory_delta() {
            Ok(0) => {}
            Ok(delta) => {
                let total = engine.adjust_external_memory(delta);
                debug!(delta, total, "reported managed memory pressure");
            }
            Err(e) => warn!(error = %e, "memory pressure report failed"),
        }
    }
}

//! The bridge service object
//!
//! One [`Bridge`] owns every piece of process-wide bridge state: the handle
//! table, the metadata and class caches, the callback queue and the
//! verbosity flag. It is created by [`Bridge::init`] and shared as an
//! `Arc<Bridge>`; engine hooks and global functions hold it weakly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use conduit_sdk::{
    BridgeError, BridgeResult, GlobalFunctionRegistry, JsEngine, JsObjectId, ManagedRuntime,
};
use tracing::{debug, info};

use crate::casts::create_global_cast_functions;
use crate::config::{BridgeBindings, BridgeConfig, ExitHook};
use crate::diagnostics::register_diagnostics;
use crate::executor::JsThreadExecutor;
use crate::marshal::Marshaler;
use crate::metadata::MetadataStore;
use crate::objects::ObjectManager;

/// Process-wide bridge between one JavaScript engine and one managed runtime
pub struct Bridge {
    runtime: Arc<dyn ManagedRuntime>,
    engine: Arc<dyn JsEngine>,
    config: BridgeConfig,
    metadata: MetadataStore,
    objects: ObjectManager,
    executor: JsThreadExecutor,
    exit_hook: ExitHook,
    verbose: AtomicBool,
    shut_down: AtomicBool,
}

impl Bridge {
    /// Build the bridge. The calling thread becomes the JavaScript thread.
    pub fn init(bindings: BridgeBindings) -> BridgeResult<Arc<Self>> {
        let BridgeBindings {
            runtime,
            engine,
            config,
            exit_hook,
        } = bindings;
        config
            .validate()
            .map_err(|e| BridgeError::ArgumentError(e.to_string()))?;

        let bridge = Arc::new(Self {
            metadata: MetadataStore::new(runtime.clone(), engine.clone(), config.metadata_batch_size),
            objects: ObjectManager::new(runtime.clone(), engine.clone(), config.memory_report_interval),
            executor: JsThreadExecutor::new(),
            runtime,
            engine,
            exit_hook,
            verbose: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
            config,
        });

        let weak = Arc::downgrade(&bridge);
        bridge.engine.set_collection_hook(Arc::new(move |wrapper| {
            if let Some(bridge) = weak.upgrade() {
                bridge.wrapper_collected(wrapper);
            }
        }));

        bridge.set_verbose_logging(bridge.config.verbose_logging);
        if bridge.config.install_globals {
            bridge.install_globals()?;
        }

        info!(
            metadata_batch_size = bridge.config.metadata_batch_size,
            memory_report_interval = bridge.config.memory_report_interval,
            "bridge initialized"
        );
        Ok(bridge)
    }

    /// Install the cast helpers and diagnostics functions as globals
    pub fn install_globals(self: &Arc<Self>) -> BridgeResult<()> {
        let mut registry = GlobalFunctionRegistry::new();
        create_global_cast_functions(&mut registry);
        register_diagnostics(&mut registry, Arc::downgrade(self));
        for (name, function) in registry.iter() {
            self.engine.install_global_function(name, function.clone())?;
        }
        debug!(functions = ?registry.names(), "installed globals");
        Ok(())
    }

    /// Release every bound handle and refuse further work. Idempotent.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.executor.close();
        let linked = self.objects.len();
        self.objects.release_all();
        self.metadata.clear();
        info!(released = linked, "bridge shut down");
    }

    /// Whether [`shutdown`](Self::shutdown) has run
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    pub(crate) fn ensure_running(&self) -> BridgeResult<()> {
        if self.is_shut_down() {
            Err(BridgeError::ShutDown)
        } else {
            Ok(())
        }
    }

    /// Engine hook: a weak wrapper was collected
    pub fn wrapper_collected(&self, wrapper: JsObjectId) {
        if self.is_shut_down() {
            return;
        }
        self.objects.wrapper_collected(wrapper);
    }

    /// Run callbacks queued by other threads. Call from the JavaScript thread.
    pub fn run_pending_callbacks(&self) -> usize {
        self.executor.drain(self)
    }

    /// Verbose boundary tracing
    pub fn is_verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    /// Toggle verbose tracing here and in the managed runtime
    pub fn set_verbose_logging(&self, enabled: bool) {
        self.verbose.store(enabled, Ordering::Relaxed);
        self.runtime.set_verbose_logging(enabled);
    }

    pub(crate) fn marshaler(&self) -> Marshaler<'_> {
        Marshaler::new(self.runtime.as_ref(), &self.objects, &self.metadata)
    }

    pub(crate) fn executor(&self) -> &JsThreadExecutor {
        &self.executor
    }

    pub(crate) fn exit_hook(&self) -> &ExitHook {
        &self.exit_hook
    }

    pub fn runtime(&self) -> &Arc<dyn ManagedRuntime> {
        &self.runtime
    }

    pub fn engine(&self) -> &Arc<dyn JsEngine> {
        &self.engine
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn objects(&self) -> &ObjectManager {
        &self.objects
    }

    /// Weak reference for hooks that must not keep the bridge alive
    pub fn downgrade(self: &Arc<Self>) -> Weak<Self> {
        Arc::downgrade(self)
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("config", &self.config)
            .field("linked_handles", &self.objects.len())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

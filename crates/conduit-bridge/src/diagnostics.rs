//! Diagnostics entry points exposed to JavaScript
//!
//! `__log`, `__dumpReferenceTables`, `__enableVerboseLogging`,
//! `__disableVerboseLogging` and `__exit`. Log calls become `tracing`
//! events under the [`JS_LOG_TARGET`] target; the library never installs a
//! subscriber.

use std::str::FromStr;
use std::sync::{Arc, Weak};

use conduit_sdk::{BridgeError, BridgeResult, GlobalFunctionRegistry, JsValue};
use tracing::{debug, error, info, trace, warn};

use crate::Bridge;

/// Target of events emitted for JavaScript log calls
pub const JS_LOG_TARGET: &str = "conduit::js";

/// Severity accepted by `__log`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(BridgeError::ArgumentError(format!("unknown log level '{}'", other))),
        }
    }
}

/// Emit one JavaScript log message
pub fn log_message(level: LogLevel, message: &str) {
    match level {
        LogLevel::Trace => trace!(target: JS_LOG_TARGET, "{}", message),
        LogLevel::Debug => debug!(target: JS_LOG_TARGET, "{}", message),
        LogLevel::Info => info!(target: JS_LOG_TARGET, "{}", message),
        LogLevel::Warn => warn!(target: JS_LOG_TARGET, "{}", message),
        LogLevel::Error => error!(target: JS_LOG_TARGET, "{}", message),
    }
}

fn display(value: &JsValue) -> String {
    match value {
        JsValue::String(s) => s.clone(),
        JsValue::Number(n) => n.to_string(),
        JsValue::Bool(b) => b.to_string(),
        JsValue::Cast(_, inner) => display(inner),
        JsValue::Object(id) => format!("[object {}]", id.as_u64()),
        other => other.type_name().to_string(),
    }
}

impl Bridge {
    /// `__log(message, level?)`
    pub fn log_method_callback(&self, args: &[JsValue]) -> BridgeResult<JsValue> {
        let message = args.first().map(display).unwrap_or_default();
        let level = match args.get(1) {
            None | Some(JsValue::Undefined) => LogLevel::default(),
            Some(JsValue::String(s)) => s.parse()?,
            Some(other) => {
                return Err(BridgeError::TypeMismatch {
                    expected: "log level string".to_string(),
                    got: other.type_name().to_string(),
                })
            }
        };
        log_message(level, &message);
        Ok(JsValue::Undefined)
    }

    /// Handle table followed by the managed runtime's own reference tables
    pub fn dump_reference_tables(&self) -> String {
        let mut report = self.objects().dump();
        report.push_str(&self.runtime().dump_reference_tables());
        report
    }

    /// `__dumpReferenceTables()`: logs the report and returns it
    pub fn dump_reference_tables_method_callback(&self, _args: &[JsValue]) -> BridgeResult<JsValue> {
        let report = self.dump_reference_tables();
        info!(target: JS_LOG_TARGET, "{}", report);
        Ok(JsValue::String(report))
    }

    /// `__enableVerboseLogging()`
    pub fn enable_verbose_logging_method_callback(&self, _args: &[JsValue]) -> BridgeResult<JsValue> {
        self.set_verbose_logging(true);
        Ok(JsValue::Undefined)
    }

    /// `__disableVerboseLogging()`
    pub fn disable_verbose_logging_method_callback(&self, _args: &[JsValue]) -> BridgeResult<JsValue> {
        self.set_verbose_logging(false);
        Ok(JsValue::Undefined)
    }

    /// `__exit(code?)`
    pub fn exit_method_callback(&self, args: &[JsValue]) -> BridgeResult<JsValue> {
        let code = match args.first() {
            None | Some(JsValue::Undefined) => 0,
            Some(JsValue::Number(n)) if n.fract() == 0.0 && (i32::MIN as f64..=i32::MAX as f64).contains(n) => {
                *n as i32
            }
            Some(other) => {
                return Err(BridgeError::ArgumentError(format!(
                    "exit code must be an integer, got {}",
                    display(other)
                )))
            }
        };
        info!(code, "exit requested from JavaScript");
        (self.exit_hook())(code);
        Ok(JsValue::Undefined)
    }
}

type Callback = fn(&Bridge, &[JsValue]) -> BridgeResult<JsValue>;

/// Register the diagnostics globals, each holding the bridge weakly
pub fn register_diagnostics(registry: &mut GlobalFunctionRegistry, bridge: Weak<Bridge>) {
    let entries: [(&str, Callback); 5] = [
        ("__log", Bridge::log_method_callback),
        ("__dumpReferenceTables", Bridge::dump_reference_tables_method_callback),
        ("__enableVerboseLogging", Bridge::enable_verbose_logging_method_callback),
        ("__disableVerboseLogging", Bridge::disable_verbose_logging_method_callback),
        ("__exit", Bridge::exit_method_callback),
    ];
    for (name, callback) in entries {
        let bridge = bridge.clone();
        registry.register(name, move |args| {
            let bridge: Arc<Bridge> = bridge.upgrade().ok_or(BridgeError::ShutDown)?;
            bridge.ensure_running()?;
            callback(&bridge, args)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parse() {
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::default(), LogLevel::Info);
        assert!(matches!(
            "loud".parse::<LogLevel>(),
            Err(BridgeError::ArgumentError(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(display(&JsValue::string("hi")), "hi");
        assert_eq!(display(&JsValue::number(3)), "3");
        assert_eq!(display(&JsValue::Null), "null");
    }
}

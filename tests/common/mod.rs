//! Shared fixtures for integration tests.
//!
//! - A registry preloaded with the built-in `os` / `os.path` modules
//! - Modules whose initialisers are slow or fail a set number of times
//! - A loader wrapper that counts `load` calls
//! - Tracing output routed through the test harness

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use dashmap::DashMap;
use lateimport::runtime::{
    builtins, LoadResult, ModuleLoader, ModuleRegistry, NativeFunction, ObjectRef, Value,
};

/// Route `tracing` output through the test writer. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lateimport=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Registry with the built-in modules installed.
pub fn registry() -> Arc<ModuleRegistry> {
    init_tracing();
    let registry = Arc::new(ModuleRegistry::new());
    builtins::install(&registry);
    registry
}

/// Register `name` with an initialiser that sleeps for `delay` before
/// defining `value = 42` and a `double(n)` function.
pub fn register_slow_module(registry: &ModuleRegistry, name: &str, delay: Duration) {
    let module_name = name.to_string();
    registry.register(name, move |m| {
        thread::sleep(delay);
        m.insert("value", 42_i64);
        m.insert(
            "double",
            Value::object(NativeFunction::new(module_name.clone(), "double", |args, _| {
                match args {
                    [Value::Long(n)] => Ok(Value::Long(n * 2)),
                    _ => Err(lateimport::runtime::CallError::arguments(
                        "double",
                        "expected one int",
                    )),
                }
            })),
        );
        Ok(())
    });
}

/// Register `name` with an initialiser that fails its first `failures`
/// attempts. Returns the attempt counter.
pub fn register_flaky_module(
    registry: &ModuleRegistry,
    name: &str,
    failures: usize,
) -> Arc<AtomicUsize> {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    registry.register(name, move |m| {
        if counter.fetch_add(1, Ordering::SeqCst) < failures {
            return Err("transient failure".to_string());
        }
        m.insert("ready", true);
        Ok(())
    });
    attempts
}

/// Loader that counts every `load` call before delegating to a registry.
///
/// Each call sleeps first, so racing callers that were not serialised by the
/// caller all reach the registry and show up in the count.
pub struct CountingLoader {
    inner: Arc<ModuleRegistry>,
    delay: Duration,
    calls: DashMap<String, usize>,
}

impl CountingLoader {
    pub fn new(inner: Arc<ModuleRegistry>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner,
            delay,
            calls: DashMap::new(),
        })
    }

    /// Number of `load` calls made for `path`.
    pub fn calls(&self, path: &str) -> usize {
        self.calls.get(path).map_or(0, |n| *n)
    }
}

impl ModuleLoader for CountingLoader {
    fn load(&self, path: &str) -> LoadResult<ObjectRef> {
        *self.calls.entry(path.to_string()).or_insert(0) += 1;
        thread::sleep(self.delay);
        self.inner.load(path)
    }
}

//! Built-in modules.
//!
//! A minimal `os` / `os.path` pair backed by `std::path`, enough to exercise
//! deferred resolution end to end without any user-registered modules.

use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};
use std::sync::Arc;

use super::function::NativeFunction;
use super::loader::{ModuleLoader, ModuleRegistry};
use super::object::{CallError, CallResult};
use super::value::Value;

/// Register the built-in modules on `registry`.
///
/// `os.path` is reachable from `os` even before it has been loaded: the `os`
/// module loads it on first access to `path`.
pub fn install(registry: &Arc<ModuleRegistry>) {
    let weak = Arc::downgrade(registry);
    registry.register("os", move |m| {
        m.insert("name", std::env::consts::FAMILY);
        m.insert("sep", MAIN_SEPARATOR_STR);
        let registry = weak.clone();
        m.install_getattr_hook(Arc::new(move |name: &str| match (name, registry.upgrade()) {
            ("path", Some(registry)) => registry.load("os.path").map(|path| Some(Value::Object(path))),
            _ => Ok(None),
        }));
        Ok(())
    });

    registry.register("os.path", |m| {
        m.insert("sep", MAIN_SEPARATOR_STR);
        m.insert(
            "join",
            Value::object(
                NativeFunction::new("os.path", "join", |args, _| join(args))
                    .with_doc("Join one or more path segments."),
            ),
        );
        m.insert(
            "basename",
            Value::object(NativeFunction::new("os.path", "basename", |args, _| {
                let path = single_str("basename", args)?;
                Ok(Value::from(
                    Path::new(path)
                        .file_name()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                ))
            })),
        );
        m.insert(
            "dirname",
            Value::object(NativeFunction::new("os.path", "dirname", |args, _| {
                let path = single_str("dirname", args)?;
                Ok(Value::from(
                    Path::new(path)
                        .parent()
                        .map(|p| p.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                ))
            })),
        );
        Ok(())
    });
}

/// Platform path join: an absolute segment discards everything before it.
fn join(args: &[Value]) -> CallResult<Value> {
    if args.is_empty() {
        return Err(CallError::arguments("join", "expected at least 1 argument, got 0"));
    }
    let mut path = PathBuf::new();
    for arg in args {
        let segment = arg.as_str().ok_or_else(|| {
            CallError::arguments(
                "join",
                format!("expected str segments, got '{}'", arg.type_name()),
            )
        })?;
        path.push(segment);
    }
    Ok(Value::Str(path.to_string_lossy().into_owned()))
}

fn single_str<'a>(callee: &str, args: &'a [Value]) -> CallResult<&'a str> {
    match args {
        [Value::Str(s)] => Ok(s.as_str()),
        _ => Err(CallError::arguments(
            callee,
            format!("expected exactly one str argument, got {}", args.len()),
        )),
    }
}

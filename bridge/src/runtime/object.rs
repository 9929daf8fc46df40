//! Interpreter object instances

use rhai::{Dynamic, FnPtr, Map};

/// One interpreter-side object created from a scripted class
///
/// The value is a Rhai object map. `generation` records which interpreter
/// created it; calls from an older generation are rejected by the runtime.
#[derive(Debug, Clone)]
pub struct ScriptObject {
    pub(crate) id: u64,
    pub(crate) generation: u64,
    pub(crate) class_name: String,
    pub(crate) value: Dynamic,
}

impl ScriptObject {
    /// Process-unique identity of this instance
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn value(&self) -> &Dynamic {
        &self.value
    }

    /// Read a field. Returns `None` when the object has no such key.
    pub fn get(&self, field: &str) -> Option<Dynamic> {
        self.value
            .read_lock::<Map>()
            .and_then(|map| map.get(field).cloned())
    }

    /// Write a field, adding it if absent
    pub fn set(&mut self, field: &str, value: Dynamic) {
        if let Some(mut map) = self.value.write_lock::<Map>() {
            map.insert(field.into(), value);
        }
    }

    /// Name of the Rhai function a method property points to
    pub fn method_fn(&self, method: &str) -> Option<String> {
        self.get(method)
            .and_then(|value| value.try_cast::<FnPtr>())
            .map(|ptr| ptr.fn_name().to_string())
    }

    /// Keys currently present on the object
    pub fn keys(&self) -> Vec<String> {
        self.value
            .read_lock::<Map>()
            .map(|map| map.keys().map(|k| k.to_string()).collect())
            .unwrap_or_default()
    }
}

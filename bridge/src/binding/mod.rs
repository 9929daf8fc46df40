//! Binding instances: the per-object bridge between host and interpreter

mod instance;
pub mod lifecycle;
pub mod property;

pub use instance::{BindingInstance, BindingState, HookHandle, ScriptRef};
pub use lifecycle::{HookCategory, HookPayload, LifecycleHook, PayloadKind};
pub use property::{resolve_field, BindingValue, PropertyBinding};

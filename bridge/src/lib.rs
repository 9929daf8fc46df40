//! Script behaviour bridge
//!
//! Lets host objects delegate their lifecycle to behaviour classes written in
//! a small class-based script dialect. The crate analyzes script sources,
//! hosts a sandboxed interpreter, binds one interpreter object to every
//! attached behaviour and keeps those objects current when scripts change.

pub mod analysis;
pub mod binding;
pub mod config;
pub mod error;
pub mod host;
pub mod reload;
pub mod runtime;
pub mod scene;

/// Common imports for hosts embedding the bridge
pub mod prelude {
    pub use crate::analysis::{ClassDescriptor, FieldBinding, ScriptMeta};
    pub use crate::binding::{
        BindingInstance, BindingState, BindingValue, HookPayload, LifecycleHook, PropertyBinding,
        ScriptRef,
    };
    pub use crate::config::BridgeConfig;
    pub use crate::error::{BridgeError, BridgeResult};
    pub use crate::host::{Collision, EventSink, HostComponent, HostObject, TagRegistry};
    pub use crate::reload::{HotReloadCoordinator, ReloadOutcome, ScriptWatcher};
    pub use crate::runtime::{
        DirectorySource, HostServices, MemorySource, ScriptAsset, ScriptRuntime, ScriptSource,
    };
    pub use crate::scene::Scene;

    pub use glam::{Quat, Vec3};
    pub use rhai::{self, Dynamic};
}

/// Initialize logging for the bridge
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

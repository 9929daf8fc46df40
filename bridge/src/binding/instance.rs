//! Per-object bridge between a host object and one interpreter object

use super::lifecycle::{HookPayload, LifecycleHook};
use super::property::{resolve_field, PropertyBinding};
use crate::analysis::ClassDescriptor;
use crate::error::{BridgeError, BridgeResult};
use crate::host::HostObject;
use crate::runtime::lowering::method_fn;
use crate::runtime::{ScriptObject, ScriptRuntime, GAME_OBJECT_FIELD, TRANSFORM_FIELD};
use rhai::Dynamic;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Reference from a host component to a script class
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScriptRef {
    pub class_name: String,
}

impl ScriptRef {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
        }
    }

    /// Class name from an asset path: the file name up to its first `.`
    pub fn from_asset_path(path: impl AsRef<Path>) -> Option<Self> {
        let file_name = path.as_ref().file_name()?.to_str()?;
        let class_name = file_name.split('.').next()?;
        if class_name.is_empty() {
            return None;
        }
        Some(Self::new(class_name))
    }
}

/// Lifecycle state of a binding instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Unattached,
    Initializing,
    Active,
    Reinitializing,
    Destroyed,
}

/// Resolved hook: the script function to call and its declared parameter count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookHandle {
    pub fn_name: String,
    pub arity: usize,
}

/// Live scripted behaviour attached to one host object
#[derive(Debug)]
pub struct BindingInstance {
    owner: HostObject,
    script: Option<ScriptRef>,
    properties: Vec<PropertyBinding>,
    state: BindingState,
    object: Option<ScriptObject>,
    descriptor: Option<Arc<ClassDescriptor>>,
    hooks: HashMap<LifecycleHook, HookHandle>,
    started: bool,
    reinitializations: u64,
}

impl BindingInstance {
    pub fn new(owner: HostObject) -> Self {
        Self {
            owner,
            script: None,
            properties: Vec::new(),
            state: BindingState::Unattached,
            object: None,
            descriptor: None,
            hooks: HashMap::new(),
            started: false,
            reinitializations: 0,
        }
    }

    pub fn owner(&self) -> &HostObject {
        &self.owner
    }

    pub fn script(&self) -> Option<&ScriptRef> {
        self.script.as_ref()
    }

    pub fn properties(&self) -> &[PropertyBinding] {
        &self.properties
    }

    /// Replace the host-supplied bindings. They apply on the next reload.
    pub fn set_properties(&mut self, properties: Vec<PropertyBinding>) {
        self.properties = properties;
    }

    pub fn state(&self) -> BindingState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == BindingState::Active
    }

    pub fn descriptor(&self) -> Option<&ClassDescriptor> {
        self.descriptor.as_deref()
    }

    pub fn object(&self) -> Option<&ScriptObject> {
        self.object.as_ref()
    }

    /// Identity of the current interpreter object
    pub fn object_id(&self) -> Option<u64> {
        self.object.as_ref().map(ScriptObject::id)
    }

    /// Read a field of the current interpreter object
    pub fn field(&self, name: &str) -> Option<Dynamic> {
        self.object.as_ref().and_then(|object| object.get(name))
    }

    pub fn has_hook(&self, hook: LifecycleHook) -> bool {
        self.hooks.contains_key(&hook)
    }

    /// Hooks the current class implements
    pub fn hooks(&self) -> impl Iterator<Item = LifecycleHook> + '_ {
        self.hooks.keys().copied()
    }

    /// Number of successful reloads
    pub fn reinitializations(&self) -> u64 {
        self.reinitializations
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    fn component_name(&self) -> String {
        match &self.script {
            Some(script) => format!("{} on {}", script.class_name, self.owner),
            None => self.owner.to_string(),
        }
    }

    fn unresolved(&self, runtime: &ScriptRuntime, class_name: &str) -> BridgeError {
        let loaded = runtime.loaded_class_names().join(", ");
        error!(
            component = %self.owner,
            class = class_name,
            loaded = %loaded,
            "Script class is not loaded, behaviour stays unattached"
        );
        BridgeError::UnresolvedClass {
            class_name: class_name.to_string(),
            component: self.owner.to_string(),
            loaded,
        }
    }

    /// Attach a script class and initialize it
    ///
    /// If the class is not loaded the instance keeps the reference, stays
    /// `Unattached` and can be brought up later with [`reload`](Self::reload).
    pub fn attach(
        &mut self,
        runtime: &ScriptRuntime,
        script: ScriptRef,
        properties: Vec<PropertyBinding>,
    ) -> BridgeResult<()> {
        if self.state != BindingState::Unattached {
            return Err(BridgeError::InvalidState(format!(
                "cannot attach {} while {:?}",
                script.class_name, self.state
            )));
        }

        let class_name = script.class_name.clone();
        self.script = Some(script);
        self.properties = properties;

        let Some(descriptor) = runtime.class(&class_name) else {
            return Err(self.unresolved(runtime, &class_name));
        };

        self.state = BindingState::Initializing;
        self.initialize(runtime, descriptor)
    }

    /// Discard the interpreter object and initialize again from the current class
    pub fn reload(&mut self, runtime: &ScriptRuntime) -> BridgeResult<()> {
        let was_active = match self.state {
            BindingState::Active => true,
            BindingState::Unattached if self.script.is_some() => false,
            BindingState::Unattached => {
                return Err(BridgeError::InvalidState("no script attached".into()))
            }
            state => {
                return Err(BridgeError::InvalidState(format!(
                    "cannot reload {} while {:?}",
                    self.component_name(),
                    state
                )))
            }
        };
        let Some(class_name) = self.script.as_ref().map(|s| s.class_name.clone()) else {
            return Err(BridgeError::InvalidState("no script attached".into()));
        };

        self.state = if was_active {
            BindingState::Reinitializing
        } else {
            BindingState::Initializing
        };
        self.hooks.clear();
        self.object = None;
        self.descriptor = None;

        let Some(descriptor) = runtime.class(&class_name) else {
            self.state = BindingState::Unattached;
            return Err(self.unresolved(runtime, &class_name));
        };

        self.initialize(runtime, descriptor)?;
        self.reinitializations += 1;
        info!(
            component = %self.component_name(),
            object_id = ?self.object_id(),
            "Reloaded behaviour"
        );
        Ok(())
    }

    fn initialize(
        &mut self,
        runtime: &ScriptRuntime,
        descriptor: Arc<ClassDescriptor>,
    ) -> BridgeResult<()> {
        let mut object = match runtime.instantiate(&descriptor) {
            Ok(object) => object,
            Err(e) => {
                error!(component = %self.component_name(), error = %e, "Failed to instantiate script class");
                self.state = BindingState::Unattached;
                return Err(e);
            }
        };

        object.set(GAME_OBJECT_FIELD, Dynamic::from(self.owner.clone()));
        object.set(TRANSFORM_FIELD, Dynamic::from(self.owner.transform()));

        let hooks: HashMap<LifecycleHook, HookHandle> = descriptor
            .method_names()
            .filter_map(|name| {
                let hook = LifecycleHook::from_name(name)?;
                let handle = HookHandle {
                    fn_name: object
                        .method_fn(name)
                        .unwrap_or_else(|| method_fn(&descriptor.name, name)),
                    arity: descriptor.arity(name).unwrap_or(0),
                };
                Some((hook, handle))
            })
            .collect();

        for field in &descriptor.fields {
            let Some(binding) = self.properties.iter().find(|p| p.name == field.field_name) else {
                debug!(field = %field.field_name, class = %descriptor.name, "No binding supplied, field left unset");
                continue;
            };
            if let Some(value) = resolve_field(field, binding, runtime.tags()) {
                object.set(&field.field_name, value);
            }
        }

        self.object = Some(object);
        self.descriptor = Some(descriptor);
        self.hooks = hooks;
        self.started = false;
        self.state = BindingState::Active;

        debug!(
            component = %self.component_name(),
            object_id = ?self.object_id(),
            hooks = self.hooks.len(),
            "Behaviour initialized"
        );

        if let Err(e) = self.call_hook(runtime, LifecycleHook::Awake, Vec::new()) {
            error!(component = %self.component_name(), error = %e, "Awake failed");
        }
        Ok(())
    }

    fn call_hook(
        &mut self,
        runtime: &ScriptRuntime,
        hook: LifecycleHook,
        mut args: Vec<Dynamic>,
    ) -> BridgeResult<bool> {
        let Some(handle) = self.hooks.get(&hook) else {
            return Ok(false);
        };
        let Some(object) = self.object.as_mut() else {
            return Ok(false);
        };

        args.resize(handle.arity, Dynamic::UNIT);
        runtime.call(object, &handle.fn_name, args).map(|_| true)
    }

    /// Forward a lifecycle hook. Returns whether a script method ran.
    pub fn dispatch(
        &mut self,
        runtime: &ScriptRuntime,
        hook: LifecycleHook,
        payload: HookPayload,
    ) -> BridgeResult<bool> {
        if payload.kind() != hook.payload_kind() {
            return Err(BridgeError::PayloadMismatch {
                hook,
                expected: hook.payload_kind(),
                actual: payload.kind(),
            });
        }
        if self.state != BindingState::Active {
            return Ok(false);
        }
        self.call_hook(runtime, hook, payload.into_args())
    }

    /// Forward a hook given by name
    pub fn dispatch_named(
        &mut self,
        runtime: &ScriptRuntime,
        name: &str,
        payload: HookPayload,
    ) -> BridgeResult<bool> {
        let hook = LifecycleHook::from_name(name)
            .ok_or_else(|| BridgeError::UnknownHook(name.to_string()))?;
        self.dispatch(runtime, hook, payload)
    }

    /// Run `Start` the first time this is called after (re)initialization
    pub fn start(&mut self, runtime: &ScriptRuntime) -> BridgeResult<bool> {
        if self.started || self.state != BindingState::Active {
            return Ok(false);
        }
        self.started = true;
        self.call_hook(runtime, LifecycleHook::Start, Vec::new())
    }

    /// Run `OnDestroy` and release the interpreter object
    pub fn destroy(&mut self, runtime: &ScriptRuntime) -> BridgeResult<()> {
        if self.state == BindingState::Destroyed {
            return Ok(());
        }

        let result = if self.state == BindingState::Active {
            self.call_hook(runtime, LifecycleHook::OnDestroy, Vec::new())
                .map(|_| ())
        } else {
            Ok(())
        };
        if let Err(e) = &result {
            error!(component = %self.component_name(), error = %e, "OnDestroy failed");
        }

        self.hooks.clear();
        self.object = None;
        self.descriptor = None;
        self.state = BindingState::Destroyed;
        debug!(component = %self.component_name(), "Behaviour destroyed");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::host::{Collision, HostComponent};
    use crate::runtime::MemorySource;

    const PROBE: &str = r#"
class Probe extends Behaviour {
    @Light light;
    @GameObject target;
    awakes = 0;
    updates = 0;
    last = ();

    Awake() { this.awakes += 1; }
    Update() { this.updates += 1; }
    OnCollisionEnter(collision) { this.last = collision.other.name; }
    OnApplicationPause() { this.last = "paused"; }
    OnDestroy() { this.gameObject.destroyed = true; }
    Helper() { }
}
"#;

    fn runtime() -> ScriptRuntime {
        let mut runtime = ScriptRuntime::new(BridgeConfig::default()).unwrap();
        runtime
            .load_all_scripts(&MemorySource::new().with("Probe.rhai", PROBE))
            .unwrap();
        runtime
    }

    fn attached(runtime: &ScriptRuntime) -> BindingInstance {
        let mut instance = BindingInstance::new(HostObject::new("Lamp"));
        instance
            .attach(runtime, ScriptRef::new("Probe"), Vec::new())
            .unwrap();
        instance
    }

    #[test]
    fn test_script_ref_from_asset_path() {
        assert_eq!(
            ScriptRef::from_asset_path("scripts/Toggle.behaviour.rhai"),
            Some(ScriptRef::new("Toggle"))
        );
        assert_eq!(ScriptRef::from_asset_path("scripts/.hidden"), None);
    }

    #[test]
    fn test_attach_binds_intrinsics_and_runs_awake() {
        let runtime = runtime();
        let instance = attached(&runtime);

        assert_eq!(instance.state(), BindingState::Active);
        assert_eq!(instance.field("awakes").unwrap().as_int().unwrap(), 1);

        let game_object = instance.field(GAME_OBJECT_FIELD).unwrap().try_cast::<HostObject>();
        assert!(game_object.unwrap().ptr_eq(instance.owner()));
        let transform = instance.field(TRANSFORM_FIELD).unwrap().try_cast::<HostComponent>();
        assert!(transform.unwrap().ptr_eq(&instance.owner().transform()));
    }

    #[test]
    fn test_hooks_are_lifecycle_methods_only() {
        let runtime = runtime();
        let instance = attached(&runtime);

        let mut hooks: Vec<_> = instance.hooks().collect();
        hooks.sort();
        assert_eq!(
            hooks,
            vec![
                LifecycleHook::Awake,
                LifecycleHook::Update,
                LifecycleHook::OnDestroy,
                LifecycleHook::OnCollisionEnter,
                LifecycleHook::OnApplicationPause,
            ]
        );
        assert!(!instance.has_hook(LifecycleHook::Start));
    }

    #[test]
    fn test_dispatch_only_declared_hooks() {
        let runtime = runtime();
        let mut instance = attached(&runtime);

        assert!(instance
            .dispatch(&runtime, LifecycleHook::Update, HookPayload::None)
            .unwrap());
        assert!(!instance
            .dispatch(&runtime, LifecycleHook::LateUpdate, HookPayload::None)
            .unwrap());
        assert_eq!(instance.field("updates").unwrap().as_int().unwrap(), 1);
    }

    #[test]
    fn test_payload_is_marshalled_and_padded() {
        let runtime = runtime();
        let mut instance = attached(&runtime);

        let wall = HostObject::new("Wall");
        instance
            .dispatch(
                &runtime,
                LifecycleHook::OnCollisionEnter,
                HookPayload::Collision(Collision::new(wall)),
            )
            .unwrap();
        assert_eq!(instance.field("last").unwrap().into_string().unwrap(), "Wall");

        // The script omits the flag parameter; the payload is dropped
        instance
            .dispatch(&runtime, LifecycleHook::OnApplicationPause, HookPayload::Flag(true))
            .unwrap();
        assert_eq!(instance.field("last").unwrap().into_string().unwrap(), "paused");
    }

    #[test]
    fn test_payload_mismatch_and_unknown_hook() {
        let runtime = runtime();
        let mut instance = attached(&runtime);

        let err = instance
            .dispatch(&runtime, LifecycleHook::OnCollisionEnter, HookPayload::Flag(true))
            .unwrap_err();
        assert!(matches!(err, BridgeError::PayloadMismatch { .. }));

        let err = instance
            .dispatch_named(&runtime, "OnFrobnicate", HookPayload::None)
            .unwrap_err();
        assert!(matches!(err, BridgeError::UnknownHook(_)));
    }

    #[test]
    fn test_unresolved_class_stays_unattached() {
        let runtime = runtime();
        let mut instance = BindingInstance::new(HostObject::new("Lamp"));
        let err = instance
            .attach(&runtime, ScriptRef::new("Missing"), Vec::new())
            .unwrap_err();

        match err {
            BridgeError::UnresolvedClass { class_name, loaded, .. } => {
                assert_eq!(class_name, "Missing");
                assert_eq!(loaded, "Probe");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(instance.state(), BindingState::Unattached);
        assert!(!instance
            .dispatch(&runtime, LifecycleHook::Update, HookPayload::None)
            .unwrap());
    }

    #[test]
    fn test_reload_replaces_object() {
        let runtime = runtime();
        let mut instance = attached(&runtime);
        instance
            .dispatch(&runtime, LifecycleHook::Update, HookPayload::None)
            .unwrap();
        let before = instance.object_id().unwrap();

        instance.reload(&runtime).unwrap();
        assert_ne!(instance.object_id().unwrap(), before);
        assert_eq!(instance.field("updates").unwrap().as_int().unwrap(), 0);
        assert_eq!(instance.field("awakes").unwrap().as_int().unwrap(), 1);
        assert_eq!(instance.reinitializations(), 1);
    }

    #[test]
    fn test_missing_binding_leaves_field_unset() {
        let runtime = runtime();
        let light = HostComponent::detached("Light");
        let mut instance = BindingInstance::new(HostObject::new("Lamp"));
        instance
            .attach(
                &runtime,
                ScriptRef::new("Probe"),
                vec![PropertyBinding::component("light", light.clone())],
            )
            .unwrap();

        assert!(instance
            .field("light")
            .unwrap()
            .try_cast::<HostComponent>()
            .unwrap()
            .ptr_eq(&light));
        assert!(instance.field("target").unwrap().is_unit());
    }

    #[test]
    fn test_destroy_runs_on_destroy_once() {
        let runtime = runtime();
        let mut instance = attached(&runtime);
        let owner = instance.owner().clone();

        instance.destroy(&runtime).unwrap();
        assert_eq!(instance.state(), BindingState::Destroyed);
        assert!(instance.object().is_none());
        assert_eq!(owner.get("destroyed").and_then(|v| v.as_bool().ok()), Some(true));

        instance.destroy(&runtime).unwrap();
        assert!(matches!(
            instance.reload(&runtime),
            Err(BridgeError::InvalidState(_))
        ));
    }
}

//! Live binding instances and the frame driver

use crate::binding::{BindingInstance, HookPayload, LifecycleHook, PropertyBinding, ScriptRef};
use crate::error::{BridgeError, BridgeResult};
use crate::host::{lock_write, HostObject};
use crate::runtime::ScriptRuntime;
use hecs::Entity;
use tracing::{debug, error, info};

/// Every attached scripted behaviour, one entity each
pub struct Scene {
    world: hecs::World,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            world: hecs::World::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.world.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.world.is_empty()
    }

    /// Entities in the scene
    pub fn entities(&self) -> Vec<Entity> {
        self.world.iter().map(|entity| entity.entity()).collect()
    }

    /// Spawn an unattached behaviour for a host object
    pub fn spawn_behaviour(&mut self, owner: HostObject) -> Entity {
        let entity = self.world.spawn((BindingInstance::new(owner),));
        debug!(entity = ?entity, "Spawned behaviour");
        entity
    }

    pub fn get(&self, entity: Entity) -> Option<hecs::Ref<'_, BindingInstance>> {
        self.world.get::<&BindingInstance>(entity).ok()
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut BindingInstance> {
        self.world
            .query_one_mut::<&mut BindingInstance>(entity)
            .ok()
    }

    fn instance_mut(&mut self, entity: Entity) -> BridgeResult<&mut BindingInstance> {
        self.get_mut(entity)
            .ok_or_else(|| BridgeError::InvalidState(format!("no behaviour on entity {entity:?}")))
    }

    /// Attach a script to a spawned behaviour
    pub fn attach(
        &mut self,
        runtime: &ScriptRuntime,
        entity: Entity,
        script: ScriptRef,
        properties: Vec<PropertyBinding>,
    ) -> BridgeResult<()> {
        self.instance_mut(entity)?.attach(runtime, script, properties)
    }

    /// Spawn and attach in one step
    ///
    /// The entity is kept when attachment fails so a later reload can bring
    /// it up once the class is loaded.
    pub fn add_behaviour(
        &mut self,
        runtime: &ScriptRuntime,
        owner: HostObject,
        script: ScriptRef,
        properties: Vec<PropertyBinding>,
    ) -> Entity {
        let entity = self.spawn_behaviour(owner);
        if let Err(e) = self.attach(runtime, entity, script, properties) {
            error!(entity = ?entity, error = %e, "Failed to attach behaviour");
        }
        entity
    }

    /// Forward a hook to one behaviour
    pub fn dispatch(
        &mut self,
        runtime: &ScriptRuntime,
        entity: Entity,
        hook: LifecycleHook,
        payload: HookPayload,
    ) -> BridgeResult<bool> {
        self.instance_mut(entity)?.dispatch(runtime, hook, payload)
    }

    /// Forward a hook to every active behaviour. Returns how many methods ran.
    pub fn broadcast(
        &mut self,
        runtime: &ScriptRuntime,
        hook: LifecycleHook,
        payload: HookPayload,
    ) -> usize {
        let mut invoked = 0;
        for (entity, instance) in self.world.query_mut::<&mut BindingInstance>() {
            match instance.dispatch(runtime, hook, payload.clone()) {
                Ok(true) => invoked += 1,
                Ok(false) => {}
                Err(e) => error!(entity = ?entity, hook = %hook, error = %e, "Hook failed"),
            }
        }
        invoked
    }

    /// Advance the clock and run Start, Update and LateUpdate
    pub fn update_frame(&mut self, runtime: &ScriptRuntime, delta_time: f64) {
        lock_write(&runtime.services().clock).advance(delta_time);

        for (entity, instance) in self.world.query_mut::<&mut BindingInstance>() {
            if let Err(e) = instance.start(runtime) {
                error!(entity = ?entity, error = %e, "Start failed");
            }
        }

        self.broadcast(runtime, LifecycleHook::Update, HookPayload::None);
        self.broadcast(runtime, LifecycleHook::LateUpdate, HookPayload::None);

        lock_write(&runtime.services().input).clear_frame_data();
    }

    /// Run OnDestroy and remove the behaviour
    pub fn destroy(&mut self, runtime: &ScriptRuntime, entity: Entity) -> BridgeResult<()> {
        let result = self.instance_mut(entity)?.destroy(runtime);
        let _ = self.world.despawn(entity);
        debug!(entity = ?entity, "Despawned behaviour");
        result
    }

    /// Destroy every behaviour
    pub fn destroy_all(&mut self, runtime: &ScriptRuntime) {
        for entity in self.entities() {
            if let Err(e) = self.destroy(runtime, entity) {
                error!(entity = ?entity, error = %e, "Destroy failed");
            }
        }
    }

    /// Entities whose script reference names `class_name`
    pub fn instances_of(&self, class_name: &str) -> Vec<Entity> {
        self.world
            .query::<&BindingInstance>()
            .iter()
            .filter(|(_, instance)| {
                instance
                    .script()
                    .is_some_and(|script| script.class_name == class_name)
            })
            .map(|(entity, _)| entity)
            .collect()
    }

    /// Reload every behaviour using a class. Returns successful reloads.
    pub fn reload_class(&mut self, runtime: &ScriptRuntime, class_name: &str) -> usize {
        let mut reloaded = 0;
        for (entity, instance) in self.world.query_mut::<&mut BindingInstance>() {
            let matches = instance
                .script()
                .is_some_and(|script| script.class_name == class_name);
            if !matches {
                continue;
            }
            match instance.reload(runtime) {
                Ok(()) => reloaded += 1,
                Err(e) => error!(entity = ?entity, class = class_name, error = %e, "Reload failed"),
            }
        }
        info!(class = class_name, reloaded, "Reloaded behaviours");
        reloaded
    }

    /// Reload every behaviour that has a script. Returns successful reloads.
    pub fn reload_all(&mut self, runtime: &ScriptRuntime) -> usize {
        let mut reloaded = 0;
        for (entity, instance) in self.world.query_mut::<&mut BindingInstance>() {
            if instance.script().is_none() {
                continue;
            }
            match instance.reload(runtime) {
                Ok(()) => reloaded += 1,
                Err(e) => error!(entity = ?entity, error = %e, "Reload failed"),
            }
        }
        info!(reloaded, "Reloaded all behaviours");
        reloaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::runtime::MemorySource;

    const TICKER: &str = r#"
class Ticker extends Behaviour {
    starts = 0;
    updates = 0;
    late = 0;
    Start() { this.starts += 1; }
    Update() { this.updates += 1; }
    LateUpdate() { this.late = Time::frame(); }
}
"#;

    fn setup() -> (ScriptRuntime, Scene, Entity) {
        let mut runtime = ScriptRuntime::new(BridgeConfig::default()).unwrap();
        runtime
            .load_all_scripts(&MemorySource::new().with("Ticker.rhai", TICKER))
            .unwrap();
        let mut scene = Scene::new();
        let entity = scene.add_behaviour(
            &runtime,
            HostObject::new("Clock"),
            ScriptRef::new("Ticker"),
            Vec::new(),
        );
        (runtime, scene, entity)
    }

    fn int_field(scene: &Scene, entity: Entity, name: &str) -> i64 {
        scene
            .get(entity)
            .and_then(|instance| instance.field(name))
            .and_then(|value| value.as_int().ok())
            .unwrap_or(-1)
    }

    #[test]
    fn test_update_frame_runs_start_once() {
        let (runtime, mut scene, entity) = setup();
        scene.update_frame(&runtime, 0.016);
        scene.update_frame(&runtime, 0.016);

        assert_eq!(int_field(&scene, entity, "starts"), 1);
        assert_eq!(int_field(&scene, entity, "updates"), 2);
        assert_eq!(int_field(&scene, entity, "late"), 2);
    }

    #[test]
    fn test_unattached_behaviours_are_kept() {
        let (runtime, mut scene, _) = setup();
        let missing = scene.add_behaviour(
            &runtime,
            HostObject::new("Ghost"),
            ScriptRef::new("Missing"),
            Vec::new(),
        );
        assert_eq!(scene.len(), 2);
        assert!(!scene.get(missing).unwrap().is_active());
        assert_eq!(
            scene.broadcast(&runtime, LifecycleHook::Update, HookPayload::None),
            1
        );
    }

    #[test]
    fn test_reload_class_targets_matching_instances() {
        let (runtime, mut scene, entity) = setup();
        scene.add_behaviour(&runtime, HostObject::new("Other"), ScriptRef::new("Missing"), Vec::new());

        assert_eq!(scene.instances_of("Ticker"), vec![entity]);
        assert_eq!(scene.reload_class(&runtime, "Ticker"), 1);
        assert_eq!(scene.get(entity).unwrap().reinitializations(), 1);
    }

    #[test]
    fn test_destroy_despawns() {
        let (runtime, mut scene, entity) = setup();
        scene.destroy(&runtime, entity).unwrap();
        assert!(scene.is_empty());
        assert!(scene.destroy(&runtime, entity).is_err());
    }
}

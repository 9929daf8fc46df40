//! End-to-end behaviour scenarios through the public API

use behaviour_bridge::prelude::*;
use behaviour_bridge::runtime::ReloadStatus;
use rhai::Dynamic;

const TOGGLE: &str = r#"
// Flips a light whenever the player presses space
class Toggle extends Behaviour {
    @Light light;
    @Text() label;
    @List(Button) buttons;
    updates = 0;

    Update() {
        this.updates += 1;
        if Input::get_key_down("Space") {
            this.light["enabled"] = !this.light["enabled"];
        }
    }
}
"#;

const HELPER: &str = r#"
class Helper {
    Update() {}
}
"#;

fn runtime_with(scripts: &[(&str, &str)]) -> ScriptRuntime {
    let mut source = MemorySource::new();
    for (id, text) in scripts {
        source.insert(*id, *text);
    }
    let mut runtime = ScriptRuntime::new(BridgeConfig::default()).expect("Failed to build runtime");
    runtime
        .load_all_scripts(&source)
        .expect("Failed to load scripts");
    runtime
}

#[test]
fn test_toggle_scenario() {
    let runtime = runtime_with(&[("Toggle.rhai", TOGGLE)]);

    let lamp = HostObject::new("Lamp");
    let light = lamp.add_component("Light");
    light.set("enabled", Dynamic::from(true));

    let mut instance = BindingInstance::new(lamp.clone());
    instance
        .attach(
            &runtime,
            ScriptRef::new("Toggle"),
            vec![PropertyBinding::component("light", light.clone())],
        )
        .expect("Failed to attach Toggle");

    let ran = instance
        .dispatch(&runtime, LifecycleHook::Update, HookPayload::None)
        .unwrap();
    assert!(ran);

    let bound = instance.field("light").unwrap().try_cast::<HostComponent>().unwrap();
    assert!(bound.ptr_eq(&light));
    assert_eq!(instance.field("updates").unwrap().as_int().unwrap(), 1);
    // Update declares no parameters and a call carrying any argument is rejected,
    // so the dispatch above passed none
    let mut object = instance.object().cloned().unwrap();
    let update = object.method_fn("Update").unwrap();
    assert!(runtime.call(&mut object, &update, vec![Dynamic::UNIT]).is_err());
    assert_eq!(instance.descriptor().unwrap().arity("Update"), Some(0));
    // No key was pressed, so the light is untouched
    assert!(light.get("enabled").unwrap().as_bool().unwrap());

    // Intrinsic fields point back at the owning object
    let owner = instance.field("gameObject").unwrap().try_cast::<HostObject>().unwrap();
    assert!(owner.ptr_eq(&lamp));
}

#[test]
fn test_toggle_reacts_to_input() {
    let runtime = runtime_with(&[("Toggle.rhai", TOGGLE)]);
    let lamp = HostObject::new("Lamp");
    let light = lamp.add_component("Light");
    light.set("enabled", Dynamic::from(true));

    let mut scene = Scene::new();
    scene.add_behaviour(
        &runtime,
        lamp,
        ScriptRef::new("Toggle"),
        vec![PropertyBinding::component("light", light.clone())],
    );

    runtime
        .services()
        .with_input(|input| input.set_key_pressed("Space", true));
    scene.update_frame(&runtime, 0.016);
    assert!(!light.get("enabled").unwrap().as_bool().unwrap());

    // Still held, but no longer a fresh press
    scene.update_frame(&runtime, 0.016);
    assert!(!light.get("enabled").unwrap().as_bool().unwrap());
}

#[test]
fn test_missing_binding_leaves_field_unset() {
    let runtime = runtime_with(&[("Toggle.rhai", TOGGLE)]);
    let mut instance = BindingInstance::new(HostObject::new("Lamp"));
    instance
        .attach(&runtime, ScriptRef::new("Toggle"), Vec::new())
        .expect("Attach without bindings should succeed");

    assert!(instance.is_active());
    assert!(instance.field("light").unwrap().is_unit());
    assert!(instance.field("label").unwrap().is_unit());
}

#[test]
fn test_non_behaviour_class_is_not_loaded() {
    let mut runtime = ScriptRuntime::new(BridgeConfig::default()).unwrap();
    let report = runtime
        .load_all_scripts(
            &MemorySource::new()
                .with("Toggle.rhai", TOGGLE)
                .with("Helper.rhai", HELPER),
        )
        .unwrap();

    assert_eq!(report.rejected, vec!["Helper".to_string()]);
    assert_eq!(runtime.loaded_class_names(), vec!["Toggle".to_string()]);

    let mut instance = BindingInstance::new(HostObject::new("Thing"));
    let result = instance.attach(&runtime, ScriptRef::new("Helper"), Vec::new());
    assert!(matches!(result, Err(BridgeError::UnresolvedClass { .. })));
    assert_eq!(instance.state(), BindingState::Unattached);
}

#[test]
fn test_reload_one_is_idempotent() {
    let mut runtime = runtime_with(&[("Toggle.rhai", TOGGLE)]);
    let revision = runtime.record("Toggle").unwrap().revision;

    let changed = TOGGLE.replace("updates = 0", "updates = 10");
    assert_eq!(runtime.reload_one(&changed, "Toggle").unwrap(), ReloadStatus::Reloaded);
    let reloaded = runtime.record("Toggle").unwrap().revision;
    assert!(reloaded > revision);

    assert_eq!(runtime.reload_one(&changed, "Toggle").unwrap(), ReloadStatus::Unchanged);
    assert_eq!(runtime.record("Toggle").unwrap().revision, reloaded);
}

#[test]
fn test_reload_then_awake_uses_new_object() {
    let awake = "class Greeter extends Behaviour { awakes = 0; Awake() { this.awakes += 1; } }";
    let runtime = runtime_with(&[("Greeter.rhai", awake)]);

    let mut instance = BindingInstance::new(HostObject::new("Sign"));
    instance
        .attach(&runtime, ScriptRef::new("Greeter"), Vec::new())
        .unwrap();
    let before = instance.object_id().unwrap();

    instance.reload(&runtime).unwrap();
    let after = instance.object_id().unwrap();
    assert_ne!(before, after);
    assert_eq!(instance.field("awakes").unwrap().as_int().unwrap(), 1);

    instance
        .dispatch(&runtime, LifecycleHook::Awake, HookPayload::None)
        .unwrap();
    assert_eq!(instance.object_id().unwrap(), after);
    assert_eq!(instance.field("awakes").unwrap().as_int().unwrap(), 2);
}

#[test]
fn test_collision_payload_reaches_script() {
    let script = r#"
class Bumper extends Behaviour {
    hits = [];
    OnCollisionEnter(collision) { this.hits.push(collision.other.name); }
}
"#;
    let runtime = runtime_with(&[("Bumper.rhai", script)]);
    let mut scene = Scene::new();
    let entity = scene.add_behaviour(
        &runtime,
        HostObject::new("Bumper"),
        ScriptRef::new("Bumper"),
        Vec::new(),
    );

    let wall = HostObject::new("Wall");
    scene
        .dispatch(
            &runtime,
            entity,
            LifecycleHook::OnCollisionEnter,
            HookPayload::Collision(Collision::new(wall)),
        )
        .unwrap();

    let hits = scene.get(entity).unwrap().field("hits").unwrap().into_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].clone().into_string().unwrap(), "Wall");
}

#[test]
fn test_similar_class_names_keep_separate_methods() {
    let boss = r#"class Enemy_Boss extends Behaviour { who = ""; Update() { this.who = "boss"; } }"#;
    let enemy = r#"class Enemy extends Behaviour { who = ""; Boss_Update() { this.who = "enemy"; } }"#;
    let runtime = runtime_with(&[("1_Enemy_Boss.rhai", boss), ("2_Enemy.rhai", enemy)]);

    let mut instance = BindingInstance::new(HostObject::new("Boss"));
    instance
        .attach(&runtime, ScriptRef::new("Enemy_Boss"), Vec::new())
        .unwrap();
    instance
        .dispatch(&runtime, LifecycleHook::Update, HookPayload::None)
        .unwrap();
    assert_eq!(instance.field("who").unwrap().into_string().unwrap(), "boss");
}

#[test]
fn test_class_named_new_leaves_constructors_alone() {
    let foo = "class Foo extends Behaviour { made = true; }";
    let odd = "class new { Foo() { 42 } }";
    let runtime = runtime_with(&[("Foo.rhai", foo), ("new.rhai", odd)]);

    let mut instance = BindingInstance::new(HostObject::new("Thing"));
    instance
        .attach(&runtime, ScriptRef::new("Foo"), Vec::new())
        .expect("Foo should still construct");
    assert!(instance.field("made").unwrap().as_bool().unwrap());
}

//! Headless player that drives scripted behaviours frame by frame

use behaviour_bridge::prelude::*;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "player", about = "Run scripted behaviours against a demo lamp scene")]
struct Args {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scripts directory, overriding the configured one
    #[arg(long)]
    scripts: Option<PathBuf>,

    /// Class attached to the lamp
    #[arg(long, default_value = "Toggle")]
    class: String,

    /// Number of frames to run
    #[arg(long, default_value_t = 240)]
    frames: u64,

    /// Seconds per frame
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f64,

    /// Press space every this many frames
    #[arg(long, default_value_t = 60)]
    press_every: u64,

    /// Watch the scripts directory and hot reload changes
    #[arg(long)]
    watch: bool,

    /// Print the script-visible host API and exit
    #[arg(long)]
    describe: bool,
}

/// Host side of the demo: the objects the lamp script is wired to
struct LampRig {
    lamp: HostObject,
    light: HostComponent,
    label: HostComponent,
    toggled: EventSink,
}

impl LampRig {
    fn build() -> (Self, Vec<PropertyBinding>) {
        let lamp = HostObject::new("Lamp");
        let light = lamp.add_component("Light");
        light.set("enabled", Dynamic::from(true));
        light.set("intensity", Dynamic::from(1.0_f64));

        let label = HostObject::new("Label").add_component("Text");
        label.set("text", Dynamic::from(String::new()));

        let panel = HostObject::new("Panel");
        let buttons = vec![panel.add_component("Button"), panel.add_component("Button")];

        let toggled = EventSink::new("onToggle");
        toggled.subscribe(|args| {
            info!(args = ?args, "Lamp toggled");
        });

        let bindings = vec![
            PropertyBinding::component("light", light.clone()),
            PropertyBinding::component("label", label.clone()),
            PropertyBinding::components("buttons", buttons),
            PropertyBinding::event("onToggle", toggled.clone()),
        ];
        (
            Self {
                lamp,
                light,
                label,
                toggled,
            },
            bindings,
        )
    }

    fn report(&self) {
        info!(
            object = %self.lamp,
            enabled = ?self.light.get("enabled"),
            label = ?self.label.get("text"),
            toggles = self.toggled.invocation_count(),
            "Lamp state"
        );
    }
}

fn load_config(args: &Args) -> BridgeResult<BridgeConfig> {
    let mut config = match &args.config {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };
    if let Some(scripts) = &args.scripts {
        config.asset_root = scripts.clone();
        config.scripts_dir = ".".to_string();
    }
    if args.watch {
        config.watch.enabled = true;
    }
    config.validate()?;
    Ok(config)
}

fn run(args: Args) -> BridgeResult<()> {
    let config = load_config(&args)?;
    let script_runtime = ScriptRuntime::new(config.clone())?;

    if args.describe {
        println!("{}", script_runtime.describe_api());
        return Ok(());
    }

    let shared = behaviour_bridge::runtime::install(script_runtime)?;
    let mut runtime = shared.write().unwrap_or_else(|e| e.into_inner());

    let source = DirectorySource::from_config(&config);
    let report = runtime.load_all_scripts(&source)?;
    for (asset, reason) in &report.failed {
        warn!(asset = %asset, reason = %reason, "Script not loaded");
    }

    let (rig, bindings) = LampRig::build();
    let mut scene = Scene::new();
    scene.add_behaviour(&runtime, rig.lamp.clone(), ScriptRef::new(&args.class), bindings);

    let watcher = if config.watch.enabled {
        Some(ScriptWatcher::from_config(&config)?)
    } else {
        None
    };
    let mut coordinator = HotReloadCoordinator::new();

    info!(frames = args.frames, class = %args.class, "Running");
    for frame in 0..args.frames {
        let pressed = args.press_every > 0 && frame % args.press_every == 0;
        runtime
            .services()
            .with_input(|input| input.set_key_pressed("Space", pressed));

        scene.update_frame(&runtime, args.dt);

        if let Some(watcher) = &watcher {
            let changes = watcher.poll_changes();
            if !changes.is_empty() {
                coordinator.process_changes(&mut runtime, &mut scene, changes);
            }
            std::thread::sleep(Duration::from_secs_f64(args.dt));
        }
    }

    scene.broadcast(&runtime, LifecycleHook::OnApplicationQuit, HookPayload::None);
    scene.destroy_all(&runtime);
    rig.report();

    if let Some(watcher) = watcher {
        watcher.stop()?;
    }
    info!(
        reloads = coordinator.reload_count(),
        generation = runtime.generation(),
        "Player finished"
    );
    Ok(())
}

fn main() -> ExitCode {
    behaviour_bridge::init_logging();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Player failed");
            ExitCode::FAILURE
        }
    }
}

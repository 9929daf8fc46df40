//! Hot reload: propagate changed script assets to the interpreter and to live behaviours

mod watcher;

pub use watcher::ScriptWatcher;

use crate::analysis;
use crate::error::BridgeResult;
use crate::runtime::{LoadReport, ReloadStatus, ScriptAsset, ScriptRuntime, ScriptSource};
use crate::scene::Scene;
use std::path::PathBuf;
use tracing::{debug, error, info};

/// What a single asset change led to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Text matched the loaded source
    Unchanged { class: String },
    /// The class was redefined and `instances` behaviours were reinitialized
    Reloaded { class: String, instances: usize },
}

impl ReloadOutcome {
    pub fn class(&self) -> &str {
        match self {
            ReloadOutcome::Unchanged { class } | ReloadOutcome::Reloaded { class, .. } => class,
        }
    }
}

/// Result of a full interpreter reset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetReport {
    pub load: LoadReport,
    /// Behaviours reinitialized against the new interpreter
    pub instances: usize,
}

/// Applies script changes in order: interpreter first, then every live behaviour
#[derive(Debug, Default)]
pub struct HotReloadCoordinator {
    reloads: u64,
    resets: u64,
}

impl HotReloadCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classes successfully redefined so far
    pub fn reload_count(&self) -> u64 {
        self.reloads
    }

    /// Full resets performed so far
    pub fn reset_count(&self) -> u64 {
        self.resets
    }

    /// Redefine the class in a changed asset and reinitialize its behaviours
    pub fn on_asset_changed(
        &mut self,
        runtime: &mut ScriptRuntime,
        scene: &mut Scene,
        asset: &ScriptAsset,
    ) -> BridgeResult<ReloadOutcome> {
        let (_, meta) = analysis::analyze_source(&asset.id, &asset.text)?;
        let class = meta.class.name;
        let known = known_class_for(runtime, &asset.id).unwrap_or_else(|| class.clone());

        match runtime.reload_asset(asset, &known)? {
            ReloadStatus::Unchanged => {
                debug!(asset = %asset.id, class = %known, "Asset unchanged");
                Ok(ReloadOutcome::Unchanged { class: known })
            }
            ReloadStatus::Reloaded => {
                self.reloads += 1;
                let instances = scene.reload_class(runtime, &class);
                info!(asset = %asset.id, class = %class, instances, "Hot reloaded script");
                Ok(ReloadOutcome::Reloaded { class, instances })
            }
        }
    }

    /// Discard the interpreter, load every asset again and reinitialize all behaviours
    pub fn reload_all(
        &mut self,
        runtime: &mut ScriptRuntime,
        scene: &mut Scene,
        source: &dyn ScriptSource,
    ) -> BridgeResult<ResetReport> {
        let load = runtime.reload_all(source)?;
        let instances = scene.reload_all(runtime);
        self.resets += 1;
        info!(
            classes = load.loaded.len(),
            instances,
            generation = runtime.generation(),
            "Reset script runtime"
        );
        Ok(ResetReport { load, instances })
    }

    /// Handle paths reported by a watcher. Failures are logged and skipped.
    pub fn process_changes(
        &mut self,
        runtime: &mut ScriptRuntime,
        scene: &mut Scene,
        paths: impl IntoIterator<Item = PathBuf>,
    ) -> Vec<ReloadOutcome> {
        let mut outcomes = Vec::new();
        for path in paths {
            if !runtime.config().is_script_file(&path) {
                debug!(path = ?path, "Ignoring change to a non-script file");
                continue;
            }
            let asset = match ScriptAsset::read(&path) {
                Ok(asset) => asset,
                Err(e) => {
                    error!(path = ?path, error = %e, "Failed to read changed script");
                    continue;
                }
            };
            match self.on_asset_changed(runtime, scene, &asset) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!(path = ?path, error = %e, "Hot reload failed"),
            }
        }
        outcomes
    }
}

/// The class an asset registered last, if any
fn known_class_for(runtime: &ScriptRuntime, asset_id: &str) -> Option<String> {
    runtime
        .loaded_class_names()
        .into_iter()
        .find(|name| runtime.record(name).is_some_and(|r| r.asset_id == asset_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::ScriptRef;
    use crate::config::BridgeConfig;
    use crate::host::HostObject;
    use crate::runtime::MemorySource;

    const COUNTER_V1: &str = "class Counter extends Behaviour { step = 1; }";
    const COUNTER_V2: &str = "class Counter extends Behaviour { step = 2; }";

    fn setup() -> (ScriptRuntime, Scene) {
        let mut runtime = ScriptRuntime::new(BridgeConfig::default()).unwrap();
        runtime
            .load_all_scripts(&MemorySource::new().with("Counter.rhai", COUNTER_V1))
            .unwrap();
        let mut scene = Scene::new();
        for name in ["A", "B"] {
            scene.add_behaviour(&runtime, HostObject::new(name), ScriptRef::new("Counter"), Vec::new());
        }
        (runtime, scene)
    }

    #[test]
    fn test_changed_asset_reinitializes_instances() {
        let (mut runtime, mut scene) = setup();
        let mut coordinator = HotReloadCoordinator::new();

        let outcome = coordinator
            .on_asset_changed(&mut runtime, &mut scene, &ScriptAsset::new("Counter.rhai", COUNTER_V2))
            .unwrap();
        assert_eq!(
            outcome,
            ReloadOutcome::Reloaded {
                class: "Counter".into(),
                instances: 2
            }
        );
        for entity in scene.entities() {
            let step = scene.get(entity).unwrap().field("step").unwrap();
            assert_eq!(step.as_int().unwrap(), 2);
        }
        assert_eq!(coordinator.reload_count(), 1);
    }

    #[test]
    fn test_identical_asset_is_unchanged() {
        let (mut runtime, mut scene) = setup();
        let mut coordinator = HotReloadCoordinator::new();
        let outcome = coordinator
            .on_asset_changed(&mut runtime, &mut scene, &ScriptAsset::new("Counter.rhai", COUNTER_V1))
            .unwrap();
        assert_eq!(outcome.class(), "Counter");
        assert!(matches!(outcome, ReloadOutcome::Unchanged { .. }));
        assert_eq!(coordinator.reload_count(), 0);
    }

    #[test]
    fn test_broken_asset_keeps_previous_class() {
        let (mut runtime, mut scene) = setup();
        let mut coordinator = HotReloadCoordinator::new();
        let result = coordinator.on_asset_changed(
            &mut runtime,
            &mut scene,
            &ScriptAsset::new("Counter.rhai", "class Counter extends Behaviour { step = ; }"),
        );
        assert!(result.is_err());
        assert_eq!(runtime.cached_source("Counter"), Some(COUNTER_V1));
    }

    #[test]
    fn test_reset_reinitializes_everything() {
        let (mut runtime, mut scene) = setup();
        let mut coordinator = HotReloadCoordinator::new();
        let before = runtime.generation();

        let report = coordinator
            .reload_all(
                &mut runtime,
                &mut scene,
                &MemorySource::new().with("Counter.rhai", COUNTER_V2),
            )
            .unwrap();
        assert_eq!(report.instances, 2);
        assert_eq!(report.load.loaded, vec!["Counter".to_string()]);
        assert_eq!(runtime.generation(), before + 1);
        assert_eq!(coordinator.reset_count(), 1);
    }

    #[test]
    fn test_process_changes_skips_unreadable_and_foreign_paths() {
        let (mut runtime, mut scene) = setup();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Counter.rhai");
        std::fs::write(&path, COUNTER_V2).unwrap();
        std::fs::write(dir.path().join("notes.txt"), COUNTER_V2).unwrap();

        let mut coordinator = HotReloadCoordinator::new();
        let outcomes = coordinator.process_changes(
            &mut runtime,
            &mut scene,
            vec![dir.path().join("missing.rhai"), dir.path().join("notes.txt"), path],
        );
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].class(), "Counter");
    }
}

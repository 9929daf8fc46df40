//! Interpreter host
//!
//! [`ScriptRuntime`] owns the Rhai engine, the accumulated script AST and the
//! table of loaded behaviour classes. Classes are lowered into Rhai functions
//! (see [`lowering`]) and merged into the AST as they load. A full
//! [`ScriptRuntime::reload_all`] builds a fresh interpreter and bumps the
//! generation counter so objects created by the old one can be detected.

pub mod lowering;
pub mod namespaces;
mod object;
pub mod source;

pub use namespaces::{FrameClock, HostServices, InputState};
pub use object::ScriptObject;
pub use source::{DirectorySource, MemorySource, ScriptAsset, ScriptSource, SourceListing};

use crate::analysis::{self, ClassDescriptor, ScriptAst, BASE_CLASS_NAME};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::host::{lock_read, register_host_types, TagRegistry};
use lowering::{constructor_fn, lower_class};
use rhai::{CallFnOptions, Dynamic, Engine, Scope, AST};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock};
use tracing::{debug, error, info, warn};

/// Field holding the host object a behaviour is attached to
pub const GAME_OBJECT_FIELD: &str = "gameObject";

/// Field holding the spatial component of that host object
pub const TRANSFORM_FIELD: &str = "transform";

/// Host-defined base class every attachable script class extends
const BASE_STUB_SOURCE: &str = "class Behaviour { @GameObject gameObject; @Transform transform; }";

/// A loaded class and the source it came from
#[derive(Debug, Clone)]
pub struct ClassRecord {
    pub descriptor: Arc<ClassDescriptor>,
    /// Text last loaded for this class, compared on reload
    pub source: String,
    pub asset_id: String,
    /// Incremented on every registration
    pub revision: u64,
}

/// Outcome of loading a set of script assets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Registered class names in load order
    pub loaded: Vec<String>,
    /// Assets without any class declaration
    pub skipped: Vec<String>,
    /// Classes that do not extend the base class
    pub rejected: Vec<String>,
    /// Assets that failed to read, parse or execute, with the error text
    pub failed: Vec<(String, String)>,
}

/// Outcome of reloading one class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadStatus {
    /// The text matched the cached source; nothing was done
    Unchanged,
    Reloaded,
}

enum AssetOutcome {
    Loaded(String),
    Skipped,
    Rejected(String),
}

/// Shared handle to a runtime
pub type SharedRuntime = Arc<RwLock<ScriptRuntime>>;

static RUNTIME: OnceLock<SharedRuntime> = OnceLock::new();

/// Install the process-wide runtime. Fails if one is already installed.
pub fn install(runtime: ScriptRuntime) -> BridgeResult<SharedRuntime> {
    let shared = Arc::new(RwLock::new(runtime));
    RUNTIME
        .set(shared.clone())
        .map_err(|_| BridgeError::InvalidState("a script runtime is already installed".into()))?;
    info!("Installed process-wide script runtime");
    Ok(shared)
}

/// The process-wide runtime, if one was installed
pub fn instance() -> Option<SharedRuntime> {
    RUNTIME.get().cloned()
}

/// The embedded interpreter and its loaded classes
pub struct ScriptRuntime {
    config: BridgeConfig,
    tags: TagRegistry,
    services: HostServices,
    engine: Engine,
    ast: AST,
    base_stub: Arc<ClassDescriptor>,
    classes: BTreeMap<String, ClassRecord>,
    generation: u64,
    next_revision: u64,
    next_object_id: AtomicU64,
}

impl ScriptRuntime {
    /// Create the interpreter with fresh host services
    pub fn new(config: BridgeConfig) -> BridgeResult<Self> {
        Self::with_services(config, HostServices::new())
    }

    /// Create the interpreter reading input and time from `services`
    pub fn with_services(config: BridgeConfig, services: HostServices) -> BridgeResult<Self> {
        let tags = TagRegistry::with_component_tags(config.extra_component_tags.iter().cloned());
        let (engine, ast, base_stub) = build_interpreter(&config, &services)?;

        info!(
            namespaces = ?config.namespaces,
            tags = tags.tags().count(),
            "Script runtime initialized"
        );

        Ok(Self {
            config,
            tags,
            services,
            engine,
            ast,
            base_stub,
            classes: BTreeMap::new(),
            generation: 1,
            next_revision: 1,
            next_object_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    pub fn services(&self) -> &HostServices {
        &self.services
    }

    /// Interpreter generation, incremented by every `reload_all`
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Descriptor of the host-defined base class
    pub fn base_stub(&self) -> &ClassDescriptor {
        &self.base_stub
    }

    /// Names of loaded classes in name order
    pub fn loaded_class_names(&self) -> Vec<String> {
        self.classes.keys().cloned().collect()
    }

    pub fn is_loaded(&self, class_name: &str) -> bool {
        self.classes.contains_key(class_name)
    }

    pub fn class(&self, class_name: &str) -> Option<Arc<ClassDescriptor>> {
        self.classes.get(class_name).map(|r| r.descriptor.clone())
    }

    pub fn record(&self, class_name: &str) -> Option<&ClassRecord> {
        self.classes.get(class_name)
    }

    /// Source text last loaded for a class
    pub fn cached_source(&self, class_name: &str) -> Option<&str> {
        self.classes.get(class_name).map(|r| r.source.as_str())
    }

    /// Plain-text description of the API scripts can use
    pub fn describe_api(&self) -> String {
        namespaces::describe_host_api(&self.config.namespaces, &self.tags)
    }

    /// Load every asset the source exposes
    ///
    /// Failures are isolated per asset and collected in the report.
    pub fn load_all_scripts(&mut self, source: &dyn ScriptSource) -> BridgeResult<LoadReport> {
        let listing = source.scripts()?;
        Ok(self.load_listing(listing))
    }

    fn load_listing(&mut self, listing: SourceListing) -> LoadReport {
        let mut report = LoadReport {
            failed: listing.unreadable,
            ..Default::default()
        };

        for asset in &listing.assets {
            match self.load_asset(asset) {
                Ok(AssetOutcome::Loaded(name)) => report.loaded.push(name),
                Ok(AssetOutcome::Skipped) => report.skipped.push(asset.id.clone()),
                Ok(AssetOutcome::Rejected(name)) => report.rejected.push(name),
                Err(e) => {
                    error!(asset = %asset.id, error = %e, "Failed to load script");
                    report.failed.push((asset.id.clone(), e.to_string()));
                }
            }
        }

        info!(
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            rejected = report.rejected.len(),
            failed = report.failed.len(),
            "Loaded scripts"
        );
        report
    }

    fn load_asset(&mut self, asset: &ScriptAsset) -> BridgeResult<AssetOutcome> {
        let ast = analysis::parse(&asset.text).map_err(|e| BridgeError::parse(&asset.id, e))?;
        if !analysis::is_valid(&ast) {
            debug!(asset = %asset.id, "Skipping script without a class declaration");
            return Ok(AssetOutcome::Skipped);
        }

        self.execute(&asset.id, &ast)?;

        let meta = analysis::analyze(&ast).map_err(|e| BridgeError::invalid(&asset.id, e))?;
        if !meta.class.extends_base_stub {
            warn!(
                asset = %asset.id,
                class = %meta.class.name,
                super_class = ?meta.class.super_class,
                "Class does not extend {BASE_CLASS_NAME}, not available for attachment"
            );
            return Ok(AssetOutcome::Rejected(meta.class.name));
        }

        let name = meta.class.name.clone();
        self.register(asset, meta.class);
        Ok(AssetOutcome::Loaded(name))
    }

    /// Lower every class of a parsed file and merge it into the interpreter
    fn execute(&mut self, origin: &str, ast: &ScriptAst) -> BridgeResult<()> {
        let lowered: String = ast.classes().map(lower_class).collect();
        let compiled = self.engine.compile(&lowered).map_err(|e| BridgeError::Interpreter {
            context: origin.to_string(),
            message: e.to_string(),
        })?;
        // Later definitions replace earlier ones with the same name and arity
        self.ast.combine(compiled);
        debug!(asset = origin, "Executed class declarations");
        Ok(())
    }

    fn register(&mut self, asset: &ScriptAsset, descriptor: ClassDescriptor) {
        if let Some(existing) = self.classes.get(&descriptor.name) {
            if existing.asset_id != asset.id {
                warn!(
                    class = %descriptor.name,
                    previous = %existing.asset_id,
                    asset = %asset.id,
                    "Class already loaded from another asset, replacing"
                );
            }
        }

        let revision = self.next_revision;
        self.next_revision += 1;

        info!(
            class = %descriptor.name,
            asset = %asset.id,
            fields = descriptor.fields.len(),
            methods = descriptor.methods.len(),
            revision,
            "Registered script class"
        );

        self.classes.insert(
            descriptor.name.clone(),
            ClassRecord {
                descriptor: Arc::new(descriptor),
                source: asset.text.clone(),
                asset_id: asset.id.clone(),
                revision,
            },
        );
    }

    /// Construct a new interpreter object of a class
    pub fn instantiate(&self, descriptor: &ClassDescriptor) -> BridgeResult<ScriptObject> {
        let constructor = constructor_fn(&descriptor.name);
        let options = CallFnOptions::new().eval_ast(false);
        let value: Dynamic = self
            .engine
            .call_fn_with_options(options, &mut Scope::new(), &self.ast, &constructor, ())
            .map_err(|e| BridgeError::interpreter(format!("{}::new", descriptor.name), &e))?;

        if !value.is_map() {
            return Err(BridgeError::Interpreter {
                context: format!("{}::new", descriptor.name),
                message: format!("constructor returned {} instead of an object", value.type_name()),
            });
        }

        let id = self.next_object_id.fetch_add(1, Ordering::Relaxed);
        debug!(class = %descriptor.name, object_id = id, "Instantiated script object");
        Ok(ScriptObject {
            id,
            generation: self.generation,
            class_name: descriptor.name.clone(),
            value,
        })
    }

    /// Call a script function with `this` bound to `object`
    pub fn call(
        &self,
        object: &mut ScriptObject,
        fn_name: &str,
        args: Vec<Dynamic>,
    ) -> BridgeResult<Dynamic> {
        if object.generation != self.generation {
            return Err(BridgeError::StaleObject {
                object_id: object.id,
                class_name: object.class_name.clone(),
            });
        }

        let context = format!("{}#{}::{}", object.class_name, object.id, fn_name);
        let options = CallFnOptions::new()
            .eval_ast(false)
            .rewind_scope(true)
            .bind_this_ptr(&mut object.value);

        self.engine
            .call_fn_with_options(options, &mut Scope::new(), &self.ast, fn_name, args)
            .map_err(|e| BridgeError::interpreter(context, &e))
    }

    /// Reload one class from new source text
    ///
    /// Byte-identical text for an already loaded class is a no-op.
    pub fn reload_one(&mut self, text: &str, known_class: &str) -> BridgeResult<ReloadStatus> {
        let origin = self
            .classes
            .get(known_class)
            .map(|r| r.asset_id.clone())
            .unwrap_or_else(|| known_class.to_string());
        self.reload_asset(&ScriptAsset::new(origin, text), known_class)
    }

    /// Reload one class from an asset, recording the asset identity
    pub fn reload_asset(&mut self, asset: &ScriptAsset, known_class: &str) -> BridgeResult<ReloadStatus> {
        if self.cached_source(known_class) == Some(asset.text.as_str()) {
            debug!(class = known_class, "Source unchanged, skipping reload");
            return Ok(ReloadStatus::Unchanged);
        }

        let (ast, meta) = analysis::analyze_source(&asset.id, &asset.text)?;
        if !meta.class.extends_base_stub {
            return Err(BridgeError::InvalidScript {
                origin: asset.id.clone(),
                reason: format!("class '{}' does not extend {}", meta.class.name, BASE_CLASS_NAME),
            });
        }
        if meta.class.name != known_class {
            warn!(
                expected = known_class,
                found = %meta.class.name,
                asset = %asset.id,
                "Reloaded source declares a different class"
            );
        }

        self.execute(&asset.id, &ast)?;
        self.register(asset, meta.class);
        Ok(ReloadStatus::Reloaded)
    }

    /// Discard the interpreter and every loaded class, then load again
    ///
    /// The replacement interpreter is built and the source listed before
    /// anything is discarded. Either failing leaves the current state untouched.
    pub fn reload_all(&mut self, source: &dyn ScriptSource) -> BridgeResult<LoadReport> {
        let (engine, ast, base_stub) = build_interpreter(&self.config, &self.services)?;
        let listing = source.scripts()?;

        self.engine = engine;
        self.ast = ast;
        self.base_stub = base_stub;
        self.classes.clear();
        self.generation += 1;

        // Per-frame input does not carry over a reset
        crate::host::lock_write(&self.services.input).clear_frame_data();

        info!(generation = self.generation, "Interpreter reset");
        Ok(self.load_listing(listing))
    }

    /// Frame clock shared with the `Time` namespace
    pub fn clock(&self) -> FrameClock {
        *lock_read(&self.services.clock)
    }
}

fn build_interpreter(
    config: &BridgeConfig,
    services: &HostServices,
) -> BridgeResult<(Engine, AST, Arc<ClassDescriptor>)> {
    let mut engine = Engine::new();

    let limits = &config.limits;
    engine.set_max_expr_depths(limits.max_expr_depth, limits.max_function_expr_depth);
    engine.set_max_call_levels(limits.max_call_levels);
    engine.set_max_operations(limits.max_operations);
    engine.set_max_string_size(limits.max_string_size);
    engine.set_max_array_size(limits.max_array_size);
    engine.set_max_map_size(limits.max_map_size);

    engine.disable_symbol("eval");

    engine.on_print(|text| info!(target: "script", "{}", text));
    engine.on_debug(|text, source, position| {
        debug!(target: "script", source = source.unwrap_or(""), line = ?position.line(), "{}", text)
    });

    register_host_types(&mut engine);
    namespaces::register_namespaces(&mut engine, &config.namespaces, services)?;

    let stub = analysis::parse(BASE_STUB_SOURCE)
        .map_err(|e| BridgeError::HostCapability(format!("base class definition: {e}")))?;
    let meta = analysis::analyze(&stub)
        .map_err(|e| BridgeError::HostCapability(format!("base class definition: {e}")))?;
    let lowered: String = stub.classes().map(lower_class).collect();
    let ast = engine
        .compile(&lowered)
        .map_err(|e| BridgeError::HostCapability(format!("base class definition: {e}")))?;

    debug!(class = %meta.class.name, "Defined base class");
    Ok((engine, ast, Arc::new(meta.class)))
}

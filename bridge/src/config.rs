//! Configuration for the bridge runtime

use crate::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Runtime configuration, loadable from a JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Root directory for all assets
    pub asset_root: PathBuf,
    /// Directory name for scripts (relative to asset_root)
    pub scripts_dir: String,
    /// File extensions treated as scripts, without the dot
    pub script_extensions: Vec<String>,
    /// Also scan subdirectories of the scripts directory
    pub scan_subdirectories: bool,
    /// Host namespaces scripts may use
    pub namespaces: Vec<String>,
    /// Component decorator tags added to the built-in registry
    pub extra_component_tags: Vec<String>,
    pub limits: EngineLimits,
    pub watch: WatchConfig,
}

/// Interpreter safety limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineLimits {
    pub max_expr_depth: usize,
    pub max_function_expr_depth: usize,
    pub max_call_levels: usize,
    pub max_operations: u64,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_expr_depth: 100,
            max_function_expr_depth: 100,
            max_call_levels: 50,
            max_operations: 100_000,
            max_string_size: 10_000,
            max_array_size: 10_000,
            max_map_size: 1_000,
        }
    }
}

/// File watching for hot reload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub enabled: bool,
    /// Minimum time between two reloads of the same file
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            debounce_ms: 100,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        debug!(path = ?path, scripts = ?config.scripts_root(), "Loaded bridge configuration");
        Ok(config)
    }

    /// Directory holding script assets
    pub fn scripts_root(&self) -> PathBuf {
        self.asset_root.join(&self.scripts_dir)
    }

    /// Get the full path to a script file by class name
    pub fn script_path(&self, name: &str) -> BridgeResult<PathBuf> {
        if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
            return Err(BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Invalid script name: {name}"),
            )));
        }
        let extension = self
            .script_extensions
            .first()
            .map(String::as_str)
            .unwrap_or("rhai");
        let path = self.scripts_root().join(format!("{name}.{extension}"));
        debug!(name = name, path = ?path, "Generated script path");
        Ok(path)
    }

    /// True when `path` has one of the configured script extensions
    pub fn is_script_file(&self, path: &Path) -> bool {
        has_script_extension(path, &self.script_extensions)
    }

    /// Check that the asset directories exist
    pub fn validate(&self) -> Result<(), std::io::Error> {
        if !self.asset_root.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Asset root directory not found: {:?}", self.asset_root),
            ));
        }

        let scripts_path = self.scripts_root();
        if !scripts_path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Scripts directory not found: {scripts_path:?}"),
            ));
        }

        Ok(())
    }
}

/// True when `path` ends in one of `extensions`, given without the dot
pub fn has_script_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e == ext))
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            scripts_dir: "scripts".to_string(),
            script_extensions: vec!["rhai".to_string()],
            scan_subdirectories: false,
            namespaces: ["Debug", "Math", "Input", "Time"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            extra_component_tags: Vec::new(),
            limits: EngineLimits::default(),
            watch: WatchConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_path() {
        let config = BridgeConfig {
            asset_root: PathBuf::from("player/assets"),
            ..Default::default()
        };

        let path = config.script_path("Toggle").unwrap();
        assert_eq!(path, PathBuf::from("player/assets/scripts/Toggle.rhai"));
    }

    #[test]
    fn test_script_path_rejects_traversal() {
        let config = BridgeConfig::default();
        assert!(config.script_path("../evil").is_err());
        assert!(config.script_path("some/path/evil").is_err());
        assert!(config.script_path("some\\path\\evil").is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: BridgeConfig =
            serde_json::from_str(r#"{ "scripts_dir": "behaviours", "limits": { "max_operations": 5 } }"#)
                .unwrap();
        assert_eq!(config.scripts_dir, "behaviours");
        assert_eq!(config.limits.max_operations, 5);
        assert_eq!(config.limits.max_call_levels, 50);
        assert_eq!(config.script_extensions, vec!["rhai".to_string()]);
        assert!(!config.watch.enabled);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.json");
        std::fs::write(&path, r#"{ "namespaces": ["Debug"], "watch": { "enabled": true } }"#).unwrap();

        let config = BridgeConfig::load(&path).unwrap();
        assert_eq!(config.namespaces, vec!["Debug".to_string()]);
        assert!(config.watch.enabled);
        assert_eq!(config.watch.debounce_ms, 100);
    }

    #[test]
    fn test_validate_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig {
            asset_root: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        std::fs::create_dir(dir.path().join("scripts")).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_is_script_file() {
        let config = BridgeConfig::default();
        assert!(config.is_script_file(Path::new("a/Toggle.rhai")));
        assert!(!config.is_script_file(Path::new("a/Toggle.txt")));
        assert!(!config.is_script_file(Path::new("a/rhai")));
    }
}

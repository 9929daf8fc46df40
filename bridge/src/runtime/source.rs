//! Script asset providers

use crate::config::{has_script_extension, BridgeConfig};
use crate::error::BridgeResult;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One script file: its identity and current text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptAsset {
    pub id: String,
    pub text: String,
}

impl ScriptAsset {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    /// Read an asset from disk, using the path as its identity
    pub fn read(path: &Path) -> BridgeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(path.display().to_string(), text))
    }
}

/// Result of enumerating a source
#[derive(Debug, Clone, Default)]
pub struct SourceListing {
    pub assets: Vec<ScriptAsset>,
    /// Assets that were found but could not be read, with the error text
    pub unreadable: Vec<(String, String)>,
}

/// Something that can enumerate script assets
pub trait ScriptSource {
    fn scripts(&self) -> BridgeResult<SourceListing>;
}

/// Scripts stored in a directory on disk
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    extensions: Vec<String>,
    recursive: bool,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, extensions: Vec<String>, recursive: bool) -> Self {
        Self {
            root: root.into(),
            extensions,
            recursive,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(
            config.scripts_root(),
            config.script_extensions.clone(),
            config.scan_subdirectories,
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collect(&self, dir: &Path, out: &mut Vec<PathBuf>) -> BridgeResult<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                if self.recursive {
                    self.collect(&path, out)?;
                }
                continue;
            }
            if has_script_extension(&path, &self.extensions) {
                out.push(path);
            }
        }
        Ok(())
    }
}

impl ScriptSource for DirectorySource {
    fn scripts(&self) -> BridgeResult<SourceListing> {
        let mut paths = Vec::new();
        self.collect(&self.root, &mut paths)?;
        paths.sort();

        let mut listing = SourceListing::default();
        for path in paths {
            match ScriptAsset::read(&path) {
                Ok(asset) => listing.assets.push(asset),
                Err(e) => {
                    warn!(path = ?path, error = %e, "Failed to read script asset");
                    listing
                        .unreadable
                        .push((path.display().to_string(), e.to_string()));
                }
            }
        }

        debug!(
            root = ?self.root,
            assets = listing.assets.len(),
            unreadable = listing.unreadable.len(),
            "Scanned script directory"
        );
        Ok(listing)
    }
}

/// Scripts held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    assets: Vec<ScriptAsset>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(id, text);
        self
    }

    /// Add or replace an asset
    pub fn insert(&mut self, id: impl Into<String>, text: impl Into<String>) {
        let asset = ScriptAsset::new(id, text);
        match self.assets.iter_mut().find(|a| a.id == asset.id) {
            Some(existing) => *existing = asset,
            None => self.assets.push(asset),
        }
    }

    pub fn remove(&mut self, id: &str) {
        self.assets.retain(|a| a.id != id);
    }
}

impl ScriptSource for MemorySource {
    fn scripts(&self) -> BridgeResult<SourceListing> {
        Ok(SourceListing {
            assets: self.assets.clone(),
            unreadable: Vec::new(),
        })
    }
}

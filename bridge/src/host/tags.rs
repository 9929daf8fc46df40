//! Decorator tag registry

use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Host type category a decorator tag binds to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostTypeCategory {
    /// Any host object
    GenericObject,
    /// A typed component attached to a host object
    Component,
    /// A host event scripts can raise
    EventSink,
}

impl fmt::Display for HostTypeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HostTypeCategory::GenericObject => "object",
            HostTypeCategory::Component => "component",
            HostTypeCategory::EventSink => "event",
        };
        f.write_str(name)
    }
}

const OBJECT_TAGS: &[&str] = &["GameObject", "Object"];

const EVENT_TAGS: &[&str] = &["Event"];

const COMPONENT_TAGS: &[&str] = &[
    "Transform",
    "Light",
    "Camera",
    "Text",
    "Button",
    "Image",
    "Slider",
    "Rigidbody",
    "Collider",
    "AudioSource",
    "Animator",
    "Canvas",
    "MeshRenderer",
    "SpriteRenderer",
    "ParticleSystem",
];

/// Closed mapping from decorator tags to host type categories
///
/// Populated once before the runtime starts. Looking up a tag that was never
/// registered yields `None`, which binding treats as a configuration error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRegistry {
    tags: BTreeMap<String, HostTypeCategory>,
}

impl TagRegistry {
    /// Registry with the built-in host tags
    pub fn new() -> Self {
        let mut tags = BTreeMap::new();
        for tag in OBJECT_TAGS {
            tags.insert(tag.to_string(), HostTypeCategory::GenericObject);
        }
        for tag in EVENT_TAGS {
            tags.insert(tag.to_string(), HostTypeCategory::EventSink);
        }
        for tag in COMPONENT_TAGS {
            tags.insert(tag.to_string(), HostTypeCategory::Component);
        }
        Self { tags }
    }

    /// Built-in tags plus extra component types
    pub fn with_component_tags<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for tag in extra {
            registry.register_component(tag);
        }
        registry
    }

    /// Add a component tag. Existing tags keep their category.
    pub fn register_component(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if self.tags.contains_key(&tag) {
            debug!(tag = %tag, "Decorator tag already registered");
            return;
        }
        debug!(tag = %tag, "Registering component tag");
        self.tags.insert(tag, HostTypeCategory::Component);
    }

    pub fn resolve(&self, tag: &str) -> Option<HostTypeCategory> {
        self.tags.get(tag).copied()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    /// All registered tags in name order
    pub fn tags(&self) -> impl Iterator<Item = (&str, HostTypeCategory)> {
        self.tags.iter().map(|(tag, category)| (tag.as_str(), *category))
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//! Host objects and components visible to scripts

use super::{lock_read, lock_write, next_handle_id};
use glam::{Quat, Vec3};
use rhai::Dynamic;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};

/// Type name of the spatial component every host object owns
pub const TRANSFORM_TAG: &str = "Transform";

struct ObjectData {
    id: u64,
    name: String,
    active: bool,
    components: Vec<HostComponent>,
    properties: BTreeMap<String, Dynamic>,
}

/// Shared handle to a generic host object
///
/// Cloning the handle shares the underlying object. Every object owns a
/// `Transform` component created with it.
#[derive(Clone)]
pub struct HostObject {
    inner: Arc<RwLock<ObjectData>>,
}

impl HostObject {
    pub fn new(name: impl Into<String>) -> Self {
        let object = Self {
            inner: Arc::new(RwLock::new(ObjectData {
                id: next_handle_id(),
                name: name.into(),
                active: true,
                components: Vec::new(),
                properties: BTreeMap::new(),
            })),
        };

        let transform = object.add_component(TRANSFORM_TAG);
        transform.set("position", Dynamic::from(Vec3::ZERO));
        transform.set("rotation", Dynamic::from(Quat::IDENTITY));
        transform.set("scale", Dynamic::from(Vec3::ONE));
        object
    }

    pub fn id(&self) -> u64 {
        lock_read(&self.inner).id
    }

    pub fn name(&self) -> String {
        lock_read(&self.inner).name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        lock_write(&self.inner).name = name.into();
    }

    pub fn is_active(&self) -> bool {
        lock_read(&self.inner).active
    }

    pub fn set_active(&self, active: bool) {
        lock_write(&self.inner).active = active;
    }

    /// Attach a new component of the given type to this object
    pub fn add_component(&self, type_name: impl Into<String>) -> HostComponent {
        let component = HostComponent::with_owner(type_name, Arc::downgrade(&self.inner));
        lock_write(&self.inner).components.push(component.clone());
        component
    }

    /// First component with the given type name
    pub fn get_component(&self, type_name: &str) -> Option<HostComponent> {
        lock_read(&self.inner)
            .components
            .iter()
            .find(|c| c.type_name() == type_name)
            .cloned()
    }

    pub fn components(&self) -> Vec<HostComponent> {
        lock_read(&self.inner).components.clone()
    }

    /// The spatial component created with the object
    pub fn transform(&self) -> HostComponent {
        match self.get_component(TRANSFORM_TAG) {
            Some(transform) => transform,
            None => self.add_component(TRANSFORM_TAG),
        }
    }

    /// Read a script-visible property
    pub fn get(&self, property: &str) -> Option<Dynamic> {
        lock_read(&self.inner).properties.get(property).cloned()
    }

    /// Write a script-visible property
    pub fn set(&self, property: impl Into<String>, value: Dynamic) {
        lock_write(&self.inner)
            .properties
            .insert(property.into(), value);
    }

    /// True when both handles refer to the same object
    pub fn ptr_eq(&self, other: &HostObject) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for HostObject {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = lock_read(&self.inner);
        f.debug_struct("HostObject")
            .field("id", &data.id)
            .field("name", &data.name)
            .field("active", &data.active)
            .field("components", &data.components.len())
            .finish()
    }
}

impl fmt::Display for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = lock_read(&self.inner);
        write!(f, "{}#{}", data.name, data.id)
    }
}

struct ComponentData {
    id: u64,
    type_name: String,
    owner: Weak<RwLock<ObjectData>>,
    properties: BTreeMap<String, Dynamic>,
}

/// Shared handle to a typed host component
#[derive(Clone)]
pub struct HostComponent {
    inner: Arc<RwLock<ComponentData>>,
}

impl HostComponent {
    /// Create a component that does not belong to any object
    pub fn detached(type_name: impl Into<String>) -> Self {
        Self::with_owner(type_name, Weak::new())
    }

    fn with_owner(type_name: impl Into<String>, owner: Weak<RwLock<ObjectData>>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ComponentData {
                id: next_handle_id(),
                type_name: type_name.into(),
                owner,
                properties: BTreeMap::new(),
            })),
        }
    }

    pub fn id(&self) -> u64 {
        lock_read(&self.inner).id
    }

    pub fn type_name(&self) -> String {
        lock_read(&self.inner).type_name.clone()
    }

    /// The object this component is attached to, if it is still alive
    pub fn owner(&self) -> Option<HostObject> {
        lock_read(&self.inner)
            .owner
            .upgrade()
            .map(|inner| HostObject { inner })
    }

    pub fn get(&self, property: &str) -> Option<Dynamic> {
        lock_read(&self.inner).properties.get(property).cloned()
    }

    pub fn set(&self, property: impl Into<String>, value: Dynamic) {
        lock_write(&self.inner)
            .properties
            .insert(property.into(), value);
    }

    pub fn ptr_eq(&self, other: &HostComponent) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for HostComponent {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for HostComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = lock_read(&self.inner);
        f.debug_struct("HostComponent")
            .field("id", &data.id)
            .field("type_name", &data.type_name)
            .field("properties", &data.properties.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl fmt::Display for HostComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = lock_read(&self.inner);
        write!(f, "{}#{}", data.type_name, data.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_owns_transform() {
        let lamp = HostObject::new("Lamp");
        let transform = lamp.transform();
        assert_eq!(transform.type_name(), TRANSFORM_TAG);
        assert_eq!(
            transform.get("scale").and_then(|v| v.try_cast::<Vec3>()),
            Some(Vec3::ONE)
        );
        assert!(transform.owner().unwrap().ptr_eq(&lamp));
    }

    #[test]
    fn test_get_component_by_type() {
        let lamp = HostObject::new("Lamp");
        let light = lamp.add_component("Light");
        assert!(lamp.get_component("Light").unwrap().ptr_eq(&light));
        assert!(lamp.get_component("Camera").is_none());
        assert_eq!(lamp.components().len(), 2);
    }

    #[test]
    fn test_handles_share_state() {
        let lamp = HostObject::new("Lamp");
        let alias = lamp.clone();
        alias.set_name("Renamed");
        alias.set("power", Dynamic::from(3_i64));
        assert_eq!(lamp.name(), "Renamed");
        assert_eq!(lamp.get("power").and_then(|v| v.as_int().ok()), Some(3));
        assert_ne!(lamp, HostObject::new("Renamed"));
    }

    #[test]
    fn test_detached_component_has_no_owner() {
        let collider = HostComponent::detached("Collider");
        assert!(collider.owner().is_none());
    }

    #[test]
    fn test_owner_is_weak() {
        let component = {
            let lamp = HostObject::new("Lamp");
            lamp.add_component("Light")
        };
        assert!(component.owner().is_none());
    }
}

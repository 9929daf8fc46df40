//! Host-supplied property bindings and their resolution against decorated fields

use crate::analysis::FieldBinding;
use crate::host::{EventSink, HostComponent, HostObject, HostTypeCategory, TagRegistry};
use rhai::{Array, Dynamic};
use tracing::{debug, error, warn};

/// Value the host assigned to a named field
#[derive(Debug, Clone, PartialEq)]
pub enum BindingValue {
    Object(Option<HostObject>),
    Component(Option<HostComponent>),
    Event(Option<EventSink>),
    ObjectList(Vec<HostObject>),
    ComponentList(Vec<HostComponent>),
    EventList(Vec<EventSink>),
}

impl BindingValue {
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            BindingValue::ObjectList(_) | BindingValue::ComponentList(_) | BindingValue::EventList(_)
        )
    }

    fn describe(&self) -> &'static str {
        match self {
            BindingValue::Object(_) => "object",
            BindingValue::Component(_) => "component",
            BindingValue::Event(_) => "event",
            BindingValue::ObjectList(_) => "object list",
            BindingValue::ComponentList(_) => "component list",
            BindingValue::EventList(_) => "event list",
        }
    }
}

/// A host-side reference recorded for one script field
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyBinding {
    pub name: String,
    pub value: BindingValue,
}

impl PropertyBinding {
    pub fn new(name: impl Into<String>, value: BindingValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn object(name: impl Into<String>, object: HostObject) -> Self {
        Self::new(name, BindingValue::Object(Some(object)))
    }

    pub fn component(name: impl Into<String>, component: HostComponent) -> Self {
        Self::new(name, BindingValue::Component(Some(component)))
    }

    pub fn event(name: impl Into<String>, event: EventSink) -> Self {
        Self::new(name, BindingValue::Event(Some(event)))
    }

    pub fn objects(name: impl Into<String>, objects: Vec<HostObject>) -> Self {
        Self::new(name, BindingValue::ObjectList(objects))
    }

    pub fn components(name: impl Into<String>, components: Vec<HostComponent>) -> Self {
        Self::new(name, BindingValue::ComponentList(components))
    }

    pub fn events(name: impl Into<String>, events: Vec<EventSink>) -> Self {
        Self::new(name, BindingValue::EventList(events))
    }

    /// A recorded field with no reference assigned yet
    pub fn unset(name: impl Into<String>) -> Self {
        Self::new(name, BindingValue::Object(None))
    }
}

fn to_array<T: Clone + Send + Sync + 'static>(items: &[T]) -> Array {
    items.iter().cloned().map(Dynamic::from).collect()
}

/// Compute the interpreter value for a decorated field
///
/// Returns `None` when the field should be left untouched: the tag is
/// unknown, the reference is null, or a list was supplied for a singular field.
pub fn resolve_field(
    field: &FieldBinding,
    binding: &PropertyBinding,
    tags: &TagRegistry,
) -> Option<Dynamic> {
    let Some(category) = tags.resolve(&field.binding_kind) else {
        error!(
            field = %field.field_name,
            tag = %field.binding_kind,
            "Unknown decorator tag, field not bound"
        );
        return None;
    };

    if field.is_collection {
        let list = match (category, &binding.value) {
            (HostTypeCategory::GenericObject, BindingValue::ObjectList(items)) => to_array(items),
            (HostTypeCategory::EventSink, BindingValue::EventList(items)) => to_array(items),
            (HostTypeCategory::Component, BindingValue::ComponentList(items)) => to_array(items),
            (_, value) => {
                warn!(
                    field = %field.field_name,
                    expected = %category,
                    supplied = value.describe(),
                    "Collection field bound to a mismatched value, using an empty list"
                );
                Array::new()
            }
        };
        return Some(Dynamic::from_array(list));
    }

    match (category, &binding.value) {
        (HostTypeCategory::GenericObject, BindingValue::Object(Some(object))) => {
            Some(Dynamic::from(object.clone()))
        }
        (HostTypeCategory::EventSink, BindingValue::Event(Some(event))) => {
            Some(Dynamic::from(event.clone()))
        }
        (HostTypeCategory::Component, BindingValue::Component(Some(component))) => {
            Some(Dynamic::from(component.clone()))
        }
        (HostTypeCategory::Component, BindingValue::Object(Some(object))) => {
            Some(Dynamic::from(object.clone()))
        }
        (_, BindingValue::Object(None) | BindingValue::Component(None) | BindingValue::Event(None)) => {
            debug!(field = %field.field_name, "Binding has no reference, field left unset");
            None
        }
        (_, value) => {
            warn!(
                field = %field.field_name,
                expected = %category,
                supplied = value.describe(),
                "Field bound to a mismatched value, field left unset"
            );
            None
        }
    }
}

//! Host handle types shared with the interpreter
//!
//! These are the values that cross the interpreter boundary: host objects,
//! typed components, event sinks, collision payloads and glam vectors. They are
//! registered on every interpreter instance independently of the namespace
//! allow-list.

mod event;
mod object;
pub mod tags;

pub use event::{Collision, EventListener, EventSink};
pub use object::{HostComponent, HostObject, TRANSFORM_TAG};
pub use tags::{HostTypeCategory, TagRegistry};

use glam::{Quat, Vec3};
use rhai::{Dynamic, Engine, ImmutableString};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_handle_id() -> u64 {
    NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Read a lock, recovering the data if a previous holder panicked
pub(crate) fn lock_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

/// Write a lock, recovering the data if a previous holder panicked
pub(crate) fn lock_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

fn optional<T: Clone + Send + Sync + 'static>(value: Option<T>) -> Dynamic {
    value.map(Dynamic::from).unwrap_or(Dynamic::UNIT)
}

/// Register host handle types with a Rhai engine
pub fn register_host_types(engine: &mut Engine) {
    debug!("Registering host handle types");

    register_spatial_types(engine);

    engine
        .register_type_with_name::<HostObject>("HostObject")
        .register_get("id", |o: &mut HostObject| o.id() as i64)
        .register_get_set(
            "name",
            |o: &mut HostObject| o.name(),
            |o: &mut HostObject, name: String| o.set_name(name),
        )
        .register_get_set(
            "active",
            |o: &mut HostObject| o.is_active(),
            |o: &mut HostObject, active: bool| o.set_active(active),
        )
        .register_get("transform", |o: &mut HostObject| o.transform())
        .register_fn("get_component", |o: &mut HostObject, tag: &str| {
            optional(o.get_component(tag))
        })
        .register_indexer_get(|o: &mut HostObject, property: ImmutableString| {
            o.get(property.as_str()).unwrap_or(Dynamic::UNIT)
        })
        .register_indexer_set(|o: &mut HostObject, property: ImmutableString, value: Dynamic| {
            o.set(property.as_str(), value)
        })
        .register_fn("==", |a: &mut HostObject, b: HostObject| a.ptr_eq(&b))
        .register_fn("!=", |a: &mut HostObject, b: HostObject| !a.ptr_eq(&b))
        .register_fn("to_string", |o: &mut HostObject| o.to_string());

    engine
        .register_type_with_name::<HostComponent>("HostComponent")
        .register_get("id", |c: &mut HostComponent| c.id() as i64)
        .register_get("type_name", |c: &mut HostComponent| c.type_name())
        .register_get("gameObject", |c: &mut HostComponent| optional(c.owner()))
        .register_indexer_get(|c: &mut HostComponent, property: ImmutableString| {
            c.get(property.as_str()).unwrap_or(Dynamic::UNIT)
        })
        .register_indexer_set(|c: &mut HostComponent, property: ImmutableString, value: Dynamic| {
            c.set(property.as_str(), value)
        })
        .register_fn("==", |a: &mut HostComponent, b: HostComponent| a.ptr_eq(&b))
        .register_fn("!=", |a: &mut HostComponent, b: HostComponent| !a.ptr_eq(&b))
        .register_fn("to_string", |c: &mut HostComponent| c.to_string());

    engine
        .register_type_with_name::<EventSink>("EventSink")
        .register_get("name", |e: &mut EventSink| e.name().to_string())
        .register_get("invocations", |e: &mut EventSink| e.invocation_count() as i64)
        .register_fn("invoke", |e: &mut EventSink| e.invoke(&[]))
        .register_fn("invoke", |e: &mut EventSink, arg: Dynamic| e.invoke(&[arg]))
        .register_fn("to_string", |e: &mut EventSink| format!("Event({})", e.name()));

    engine
        .register_type_with_name::<Collision>("Collision")
        .register_get("other", |c: &mut Collision| c.other.clone())
        .register_get("contact_point", |c: &mut Collision| c.contact_point)
        .register_get("relative_velocity", |c: &mut Collision| c.relative_velocity)
        .register_get("impulse", |c: &mut Collision| c.impulse);

    debug!("Host handle types registered");
}

fn register_spatial_types(engine: &mut Engine) {
    engine
        .register_type_with_name::<Vec3>("Vec3")
        .register_get_set(
            "x",
            |v: &mut Vec3| v.x as f64,
            |v: &mut Vec3, x: f64| v.x = x as f32,
        )
        .register_get_set(
            "y",
            |v: &mut Vec3| v.y as f64,
            |v: &mut Vec3, y: f64| v.y = y as f32,
        )
        .register_get_set(
            "z",
            |v: &mut Vec3| v.z as f64,
            |v: &mut Vec3, z: f64| v.z = z as f32,
        )
        .register_fn("+", |a: Vec3, b: Vec3| a + b)
        .register_fn("-", |a: Vec3, b: Vec3| a - b)
        .register_fn("*", |a: Vec3, b: f64| a * b as f32)
        .register_fn("*", |a: f64, b: Vec3| b * a as f32)
        .register_fn("/", |a: Vec3, b: f64| a / b as f32)
        .register_fn("==", |a: &mut Vec3, b: Vec3| *a == b)
        .register_fn("!=", |a: &mut Vec3, b: Vec3| *a != b)
        .register_fn("length", |v: &mut Vec3| v.length() as f64)
        .register_fn("normalize", |v: &mut Vec3| v.normalize_or_zero())
        .register_fn("dot", |a: &mut Vec3, b: Vec3| a.dot(b) as f64)
        .register_fn("cross", |a: &mut Vec3, b: Vec3| a.cross(b))
        .register_fn("to_string", |v: &mut Vec3| {
            format!("Vec3({}, {}, {})", v.x, v.y, v.z)
        });

    engine
        .register_type_with_name::<Quat>("Quat")
        .register_fn("*", |a: Quat, b: Quat| a * b)
        .register_fn("*", |q: Quat, v: Vec3| q * v)
        .register_fn("slerp", |a: &mut Quat, b: Quat, t: f64| a.slerp(b, t as f32))
        .register_fn("to_string", |q: &mut Quat| {
            format!("Quat({}, {}, {}, {})", q.x, q.y, q.z, q.w)
        });
}

//! Event sinks and collision payloads

use super::{lock_read, lock_write, next_handle_id, HostObject};
use glam::Vec3;
use rhai::Dynamic;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Host-side listener subscribed to an event sink
pub type EventListener = Arc<dyn Fn(&[Dynamic]) + Send + Sync>;

struct EventData {
    id: u64,
    name: String,
    listeners: RwLock<Vec<EventListener>>,
    invocations: AtomicU64,
}

/// A host event that scripts can raise with `invoke()`
#[derive(Clone)]
pub struct EventSink {
    inner: Arc<EventData>,
}

impl EventSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventData {
                id: next_handle_id(),
                name: name.into(),
                listeners: RwLock::new(Vec::new()),
                invocations: AtomicU64::new(0),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Register a host listener
    pub fn subscribe(&self, listener: impl Fn(&[Dynamic]) + Send + Sync + 'static) {
        lock_write(&self.inner.listeners).push(Arc::new(listener));
    }

    /// Raise the event, calling every listener in subscription order
    pub fn invoke(&self, args: &[Dynamic]) {
        self.inner.invocations.fetch_add(1, Ordering::Relaxed);
        // Listeners may subscribe further listeners
        let listeners = lock_read(&self.inner.listeners).clone();
        for listener in listeners {
            listener(args);
        }
    }

    /// Number of times the event has been raised
    pub fn invocation_count(&self) -> u64 {
        self.inner.invocations.load(Ordering::Relaxed)
    }

    pub fn ptr_eq(&self, other: &EventSink) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for EventSink {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("invocations", &self.invocation_count())
            .finish()
    }
}

/// Payload passed to collision hooks
#[derive(Debug, Clone)]
pub struct Collision {
    pub other: HostObject,
    pub contact_point: Vec3,
    pub relative_velocity: Vec3,
    pub impulse: Vec3,
}

impl Collision {
    pub fn new(other: HostObject) -> Self {
        Self {
            other,
            contact_point: Vec3::ZERO,
            relative_velocity: Vec3::ZERO,
            impulse: Vec3::ZERO,
        }
    }

    pub fn with_contact(mut self, contact_point: Vec3) -> Self {
        self.contact_point = contact_point;
        self
    }

    pub fn with_velocity(mut self, relative_velocity: Vec3) -> Self {
        self.relative_velocity = relative_velocity;
        self
    }

    pub fn with_impulse(mut self, impulse: Vec3) -> Self {
        self.impulse = impulse;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI64;

    #[test]
    fn test_invoke_reaches_listeners() {
        let sink = EventSink::new("clicked");
        let total = Arc::new(AtomicI64::new(0));

        let seen = total.clone();
        sink.subscribe(move |args| {
            let value = args.first().and_then(|a| a.as_int().ok()).unwrap_or(1);
            seen.fetch_add(value, Ordering::SeqCst);
        });

        sink.invoke(&[]);
        sink.invoke(&[Dynamic::from(5_i64)]);

        assert_eq!(total.load(Ordering::SeqCst), 6);
        assert_eq!(sink.invocation_count(), 2);
    }

    #[test]
    fn test_clones_share_listeners() {
        let sink = EventSink::new("clicked");
        let alias = sink.clone();
        alias.invoke(&[]);
        assert_eq!(sink.invocation_count(), 1);
        assert_eq!(sink, alias);
    }
}

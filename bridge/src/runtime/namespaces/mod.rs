//! Host namespaces exposed to scripts
//!
//! Only namespaces named in the configured allow-list are registered on an
//! interpreter. Input and clock state live in [`HostServices`], which outlives
//! individual interpreter instances.

mod debug;
mod input;
mod math;
mod time;

pub use input::{InputState, SharedInput};
pub use time::{FrameClock, SharedClock};

use crate::error::{BridgeError, BridgeResult};
use crate::host::TagRegistry;
use rhai::Engine;
use std::fmt::Write as _;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Namespaces a script may be granted
pub const AVAILABLE_NAMESPACES: &[&str] = &["Debug", "Math", "Input", "Time"];

/// Host state read by namespace functions
#[derive(Clone, Debug, Default)]
pub struct HostServices {
    pub input: SharedInput,
    pub clock: SharedClock,
}

impl HostServices {
    pub fn new() -> Self {
        Self {
            input: Arc::new(RwLock::new(InputState::new())),
            clock: Arc::new(RwLock::new(FrameClock::default())),
        }
    }

    /// Update the input state seen by scripts
    pub fn with_input<R>(&self, f: impl FnOnce(&mut InputState) -> R) -> R {
        f(&mut crate::host::lock_write(&self.input))
    }
}

/// Register the allow-listed namespaces on an engine
pub fn register_namespaces(
    engine: &mut Engine,
    allowed: &[String],
    services: &HostServices,
) -> BridgeResult<()> {
    for name in allowed {
        let module = match name.as_str() {
            "Debug" => debug::build_module(),
            "Math" => math::build_module(),
            "Input" => input::build_module(&services.input),
            "Time" => time::build_module(&services.clock),
            other => {
                return Err(BridgeError::HostCapability(format!(
                    "namespace '{}' is not available (available: {})",
                    other,
                    AVAILABLE_NAMESPACES.join(", ")
                )))
            }
        };
        debug!(namespace = %name, "Exposing host namespace");
        engine.register_static_module(name.as_str(), module.into());
    }
    Ok(())
}

/// Plain-text description of the host API visible to scripts
pub fn describe_host_api(allowed: &[String], tags: &TagRegistry) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Namespaces:");
    for name in allowed {
        let functions = match name.as_str() {
            "Debug" => "log(value), warn(value), error(value)",
            "Math" => {
                "vec3(x, y, z), vec3_zero(), vec3_one(), quat_identity(), quat_from_rotation_y(a), \
                 rad(d), deg(r), sin(x), cos(x), abs(x), sqrt(x), min(a, b), max(a, b), \
                 clamp(x, lo, hi), lerp(a, b, t), PI, TAU"
            }
            "Input" => {
                "is_key_pressed(key), get_key_down(key), is_mouse_button_pressed(button), \
                 mouse_position(), mouse_delta()"
            }
            "Time" => "delta(), elapsed(), frame()",
            _ => continue,
        };
        let _ = writeln!(out, "  {name}::{{ {functions} }}");
    }

    let _ = writeln!(out, "Types:");
    let _ = writeln!(
        out,
        "  HostObject {{ id, name, active, transform, get_component(tag), <property> }}"
    );
    let _ = writeln!(
        out,
        "  HostComponent {{ id, type_name, gameObject, <property> }}"
    );
    let _ = writeln!(out, "  EventSink {{ name, invocations, invoke(), invoke(arg) }}");
    let _ = writeln!(
        out,
        "  Collision {{ other, contact_point, relative_velocity, impulse }}"
    );
    let _ = writeln!(out, "  Vec3 {{ x, y, z, length(), normalize(), dot(v), cross(v) }}");
    let _ = writeln!(out, "  Quat {{ slerp(q, t) }}");

    let _ = writeln!(out, "Decorator tags:");
    for (tag, category) in tags.tags() {
        let _ = writeln!(out, "  @{tag} -> {category}");
    }

    out
}

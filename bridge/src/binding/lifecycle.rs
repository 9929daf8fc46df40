//! Lifecycle hooks the host can dispatch into scripts

use crate::host::{Collision, HostComponent};
use rhai::Dynamic;
use std::fmt;
use std::str::FromStr;

/// Host event group a hook belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookCategory {
    Basic,
    Physics3D,
    Physics2D,
    Rendering,
    Application,
    Gui,
    Animation,
}

/// Shape of the payload a hook receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    None,
    Collision,
    /// The other collider of a trigger contact
    Collider,
    Flag,
    /// Layer index
    Index,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PayloadKind::None => "empty",
            PayloadKind::Collision => "collision",
            PayloadKind::Collider => "collider",
            PayloadKind::Flag => "boolean",
            PayloadKind::Index => "integer",
        };
        f.write_str(name)
    }
}

macro_rules! lifecycle_hooks {
    ($($hook:ident => $category:ident, $payload:ident;)+) => {
        /// Recognized lifecycle hook names
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum LifecycleHook {
            $($hook,)+
        }

        impl LifecycleHook {
            /// Every hook in declaration order
            pub const ALL: &'static [LifecycleHook] = &[$(LifecycleHook::$hook,)+];

            /// Method name a script declares to receive this hook
            pub fn as_str(self) -> &'static str {
                match self {
                    $(LifecycleHook::$hook => stringify!($hook),)+
                }
            }

            pub fn category(self) -> HookCategory {
                match self {
                    $(LifecycleHook::$hook => HookCategory::$category,)+
                }
            }

            pub fn payload_kind(self) -> PayloadKind {
                match self {
                    $(LifecycleHook::$hook => PayloadKind::$payload,)+
                }
            }
        }

        impl FromStr for LifecycleHook {
            type Err = String;

            fn from_str(name: &str) -> Result<Self, Self::Err> {
                match name {
                    $(stringify!($hook) => Ok(LifecycleHook::$hook),)+
                    other => Err(other.to_string()),
                }
            }
        }
    };
}

lifecycle_hooks! {
    Awake => Basic, None;
    Start => Basic, None;
    OnEnable => Basic, None;
    OnDisable => Basic, None;
    Update => Basic, None;
    LateUpdate => Basic, None;
    FixedUpdate => Basic, None;
    OnDestroy => Basic, None;
    OnCollisionEnter => Physics3D, Collision;
    OnCollisionStay => Physics3D, Collision;
    OnCollisionExit => Physics3D, Collision;
    OnTriggerEnter => Physics3D, Collider;
    OnTriggerStay => Physics3D, Collider;
    OnTriggerExit => Physics3D, Collider;
    OnCollisionEnter2D => Physics2D, Collision;
    OnCollisionStay2D => Physics2D, Collision;
    OnCollisionExit2D => Physics2D, Collision;
    OnTriggerEnter2D => Physics2D, Collider;
    OnTriggerStay2D => Physics2D, Collider;
    OnTriggerExit2D => Physics2D, Collider;
    OnBecameVisible => Rendering, None;
    OnBecameInvisible => Rendering, None;
    OnWillRenderObject => Rendering, None;
    OnRenderObject => Rendering, None;
    OnApplicationFocus => Application, Flag;
    OnApplicationPause => Application, Flag;
    OnApplicationQuit => Application, None;
    OnGUI => Gui, None;
    OnDrawGizmos => Gui, None;
    OnDrawGizmosSelected => Gui, None;
    OnAnimatorIK => Animation, Index;
    OnAnimatorMove => Animation, None;
}

impl LifecycleHook {
    /// Look up a hook by its exact, case-sensitive name
    pub fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

impl fmt::Display for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event data passed along with a hook
#[derive(Debug, Clone, Default)]
pub enum HookPayload {
    #[default]
    None,
    Collision(Collision),
    Collider(HostComponent),
    Flag(bool),
    Index(i64),
}

impl HookPayload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            HookPayload::None => PayloadKind::None,
            HookPayload::Collision(_) => PayloadKind::Collision,
            HookPayload::Collider(_) => PayloadKind::Collider,
            HookPayload::Flag(_) => PayloadKind::Flag,
            HookPayload::Index(_) => PayloadKind::Index,
        }
    }

    /// Marshal the payload into interpreter arguments
    pub fn into_args(self) -> Vec<Dynamic> {
        match self {
            HookPayload::None => Vec::new(),
            HookPayload::Collision(collision) => vec![Dynamic::from(collision)],
            HookPayload::Collider(collider) => vec![Dynamic::from(collider)],
            HookPayload::Flag(flag) => vec![Dynamic::from(flag)],
            HookPayload::Index(index) => vec![Dynamic::from(index)],
        }
    }
}

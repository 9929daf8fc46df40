//! Error types shared by the bridge runtime

use crate::analysis::{InvalidScriptError, ParseError};
use crate::binding::lifecycle::{LifecycleHook, PayloadKind};

/// Errors surfaced by the analyzer, the interpreter host and binding instances
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Malformed script source
    #[error("{origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: ParseError,
    },

    /// Well-formed source that cannot be used as a behaviour
    #[error("invalid script '{origin}': {reason}")]
    InvalidScript { origin: String, reason: String },

    /// A component references a class the runtime has not loaded
    #[error(
        "script class '{class_name}' requested by '{component}' is not loaded (loaded classes: [{loaded}])"
    )]
    UnresolvedClass {
        class_name: String,
        component: String,
        loaded: String,
    },

    /// Interpreter construction or namespace exposure failed
    #[error("host capability error: {0}")]
    HostCapability(String),

    /// The interpreter raised an error while running script code
    #[error("{context} - {message}")]
    Interpreter { context: String, message: String },

    /// An interpreter object outlived the interpreter that created it
    #[error("object #{object_id} of class '{class_name}' belongs to a discarded interpreter")]
    StaleObject { object_id: u64, class_name: String },

    /// Operation not allowed in the current binding state
    #[error("invalid binding state: {0}")]
    InvalidState(String),

    /// A hook name outside the lifecycle allow-list
    #[error("unknown lifecycle hook '{0}'")]
    UnknownHook(String),

    /// Hook payload does not match the hook signature
    #[error("hook {hook} expects a {expected} payload, got {actual}")]
    PayloadMismatch {
        hook: LifecycleHook,
        expected: PayloadKind,
        actual: PayloadKind,
    },

    /// IO error when reading script assets or configuration
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be decoded
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),
}

impl BridgeError {
    /// Attach asset identity to a parse error
    pub fn parse(origin: impl Into<String>, source: ParseError) -> Self {
        BridgeError::Parse {
            origin: origin.into(),
            source,
        }
    }

    /// Attach asset identity to an analysis failure
    pub fn invalid(origin: impl Into<String>, error: InvalidScriptError) -> Self {
        BridgeError::InvalidScript {
            origin: origin.into(),
            reason: error.reason,
        }
    }

    /// Convert an interpreter error, keeping its script position when present
    pub fn interpreter(context: impl Into<String>, error: &rhai::EvalAltResult) -> Self {
        let context = context.into();
        let position = error.position();
        let context = if position.is_none() {
            context
        } else {
            format!(
                "{}:{}:{}",
                context,
                position.line().unwrap_or(0),
                position.position().unwrap_or(0)
            )
        };
        BridgeError::Interpreter {
            context,
            message: error.to_string(),
        }
    }
}

/// Convenience result alias
pub type BridgeResult<T> = Result<T, BridgeError>;

//! Debug namespace: script logging routed to tracing

use rhai::{Dynamic, Module};
use tracing::{error, info, warn};

pub(super) fn build_module() -> Module {
    let mut module = Module::new();

    module.set_native_fn("log", |message: Dynamic| {
        info!(target: "script", "{}", message);
        Ok(())
    });
    module.set_native_fn("warn", |message: Dynamic| {
        warn!(target: "script", "{}", message);
        Ok(())
    });
    module.set_native_fn("error", |message: Dynamic| {
        error!(target: "script", "{}", message);
        Ok(())
    });

    module
}

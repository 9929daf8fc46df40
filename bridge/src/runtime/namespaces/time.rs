//! Time namespace for scripts

use crate::host::lock_read;
use rhai::Module;
use std::sync::{Arc, RwLock};

/// Frame clock advanced by the host driver
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameClock {
    /// Seconds since the previous frame
    pub delta: f64,
    /// Seconds since the clock started
    pub elapsed: f64,
    pub frame: u64,
}

impl FrameClock {
    pub fn advance(&mut self, delta: f64) {
        self.delta = delta.max(0.0);
        self.elapsed += self.delta;
        self.frame += 1;
    }
}

pub type SharedClock = Arc<RwLock<FrameClock>>;

pub(super) fn build_module(clock: &SharedClock) -> Module {
    let mut module = Module::new();

    let state = clock.clone();
    module.set_native_fn("delta", move || Ok(lock_read(&state).delta));

    let state = clock.clone();
    module.set_native_fn("elapsed", move || Ok(lock_read(&state).elapsed));

    let state = clock.clone();
    module.set_native_fn("frame", move || Ok(lock_read(&state).frame as i64));

    module
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::lock_write;
    use rhai::Engine;

    #[test]
    fn test_clock_advance() {
        let mut clock = FrameClock::default();
        clock.advance(0.5);
        clock.advance(0.25);
        assert_eq!(clock.frame, 2);
        assert_eq!(clock.elapsed, 0.75);
        assert_eq!(clock.delta, 0.25);

        clock.advance(-1.0);
        assert_eq!(clock.delta, 0.0);
    }

    #[test]
    fn test_module_reads_shared_clock() {
        let clock: SharedClock = Arc::new(RwLock::new(FrameClock::default()));
        let mut engine = Engine::new();
        engine.register_static_module("Time", build_module(&clock).into());

        lock_write(&clock).advance(0.5);
        let frame: i64 = engine.eval("Time::frame()").unwrap();
        let delta: f64 = engine.eval("Time::delta()").unwrap();
        assert_eq!(frame, 1);
        assert_eq!(delta, 0.5);
    }
}

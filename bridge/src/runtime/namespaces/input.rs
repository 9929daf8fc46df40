//! Input namespace for scripts

use crate::host::lock_read;
use rhai::{Dynamic, Module};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

/// Input state shared between the host and scripts
#[derive(Clone, Debug, Default)]
pub struct InputState {
    pub keys_pressed: HashSet<String>,
    /// Keys that went down since the last `clear_frame_data`
    pub keys_down: HashSet<String>,
    pub mouse_position: (f32, f32),
    pub mouse_delta: (f32, f32),
    pub mouse_buttons: HashSet<u8>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-frame data, called after each frame
    pub fn clear_frame_data(&mut self) {
        self.keys_down.clear();
        self.mouse_delta = (0.0, 0.0);
    }

    /// Set a key as pressed or released
    pub fn set_key_pressed(&mut self, key: impl Into<String>, pressed: bool) {
        let key = key.into();
        if pressed {
            if self.keys_pressed.insert(key.clone()) {
                self.keys_down.insert(key);
            }
        } else {
            self.keys_pressed.remove(&key);
        }
    }

    pub fn set_mouse_position(&mut self, x: f32, y: f32) {
        self.mouse_position = (x, y);
    }

    pub fn add_mouse_delta(&mut self, dx: f32, dy: f32) {
        self.mouse_delta.0 += dx;
        self.mouse_delta.1 += dy;
    }

    pub fn set_mouse_button(&mut self, button: u8, pressed: bool) {
        if pressed {
            self.mouse_buttons.insert(button);
        } else {
            self.mouse_buttons.remove(&button);
        }
    }
}

pub type SharedInput = Arc<RwLock<InputState>>;

pub(super) fn build_module(input: &SharedInput) -> Module {
    let mut module = Module::new();

    let state = input.clone();
    module.set_native_fn("is_key_pressed", move |key: &str| {
        Ok(lock_read(&state).keys_pressed.contains(key))
    });

    let state = input.clone();
    module.set_native_fn("get_key_down", move |key: &str| {
        Ok(lock_read(&state).keys_down.contains(key))
    });

    let state = input.clone();
    module.set_native_fn("is_mouse_button_pressed", move |button: i64| {
        let Ok(button) = u8::try_from(button) else {
            return Ok(false);
        };
        Ok(lock_read(&state).mouse_buttons.contains(&button))
    });

    let state = input.clone();
    module.set_native_fn("mouse_position", move || {
        let state = lock_read(&state);
        Ok(vec![
            Dynamic::from(state.mouse_position.0 as f64),
            Dynamic::from(state.mouse_position.1 as f64),
        ])
    });

    let state = input.clone();
    module.set_native_fn("mouse_delta", move || {
        let state = lock_read(&state);
        Ok(vec![
            Dynamic::from(state.mouse_delta.0 as f64),
            Dynamic::from(state.mouse_delta.1 as f64),
        ])
    });

    module
}

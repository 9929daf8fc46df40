//! Math namespace for scripts

use glam::{Quat, Vec3};
use rhai::Module;

pub(super) fn build_module() -> Module {
    let mut module = Module::new();

    module.set_native_fn("vec3", |x: f64, y: f64, z: f64| {
        Ok(Vec3::new(x as f32, y as f32, z as f32))
    });
    module.set_native_fn("vec3_zero", || Ok(Vec3::ZERO));
    module.set_native_fn("vec3_one", || Ok(Vec3::ONE));
    module.set_native_fn("quat_identity", || Ok(Quat::IDENTITY));
    module.set_native_fn("quat_from_rotation_y", |angle: f64| {
        Ok(Quat::from_rotation_y(angle as f32))
    });

    module.set_native_fn("rad", |degrees: f64| Ok(degrees.to_radians()));
    module.set_native_fn("deg", |radians: f64| Ok(radians.to_degrees()));
    module.set_native_fn("sin", |x: f64| Ok(x.sin()));
    module.set_native_fn("cos", |x: f64| Ok(x.cos()));
    module.set_native_fn("abs", |x: f64| Ok(x.abs()));
    module.set_native_fn("sqrt", |x: f64| Ok(x.sqrt()));
    module.set_native_fn("min", |a: f64, b: f64| Ok(a.min(b)));
    module.set_native_fn("max", |a: f64, b: f64| Ok(a.max(b)));
    module.set_native_fn("clamp", |x: f64, min: f64, max: f64| Ok(x.clamp(min, max)));
    module.set_native_fn("lerp", |a: f64, b: f64, t: f64| Ok(a + (b - a) * t));

    module.set_var("PI", std::f64::consts::PI);
    module.set_var("TAU", std::f64::consts::TAU);

    module
}

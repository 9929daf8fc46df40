//! Lowering of class declarations into Rhai function definitions
//!
//! A class `C` becomes a constructor function returning an object map plus one
//! function per method. The object map holds every field and one `Fn` pointer
//! per method, so `this.m()` works inside scripts.
//!
//! Generated names carry the byte length of the class name (`new7_Counter`,
//! `m7_Counter_Bump`) so no two class and method pairs share a name.

use crate::analysis::ClassDecl;
use std::fmt::Write as _;

/// Name of the Rhai function constructing instances of `class_name`
pub fn constructor_fn(class_name: &str) -> String {
    format!("new{}_{class_name}", class_name.len())
}

/// Name of the Rhai function implementing `method` of `class_name`
pub fn method_fn(class_name: &str, method: &str) -> String {
    format!("m{}_{class_name}_{method}", class_name.len())
}

/// Render a class declaration as Rhai source
pub fn lower_class(class: &ClassDecl) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "fn {}() {{", constructor_fn(&class.name));
    match class.super_class.as_deref() {
        Some(super_class) if is_identifier(super_class) => {
            let _ = writeln!(out, "    let obj = {}();", constructor_fn(super_class));
        }
        _ => {
            let _ = writeln!(out, "    let obj = #{{}};");
        }
    }

    for field in class.fields() {
        let value = field.initializer.as_deref().unwrap_or("()");
        let _ = writeln!(out, "    obj[\"{}\"] = {};", field.name, value);
    }
    for method in class.methods() {
        let _ = writeln!(
            out,
            "    obj[\"{}\"] = Fn(\"{}\");",
            method.name,
            method_fn(&class.name, &method.name)
        );
    }
    let _ = writeln!(out, "    obj");
    let _ = writeln!(out, "}}");

    for method in class.methods() {
        let _ = writeln!(
            out,
            "fn {}({}) {{\n{}\n}}",
            method_fn(&class.name, &method.name),
            method.params.join(", "),
            method.body
        );
    }

    out
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

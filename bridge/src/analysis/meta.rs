//! Binding metadata produced by the analyzer

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Analysis result for one script file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptMeta {
    /// Namespaces named by import directives
    pub imports: Vec<String>,
    /// The first class declared in the file
    pub class: ClassDescriptor,
}

/// Structural description of a scripted class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    pub name: String,
    /// Textual superclass, if any
    pub super_class: Option<String>,
    /// True only when the superclass is the reserved base stub
    pub extends_base_stub: bool,
    /// Decorated fields in declaration order
    pub fields: Vec<FieldBinding>,
    /// Declared method names mapped to their parameter count
    pub methods: BTreeMap<String, usize>,
}

impl ClassDescriptor {
    /// Declared method names, unfiltered
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Number of parameters a method declares
    pub fn arity(&self, name: &str) -> Option<usize> {
        self.methods.get(name).copied()
    }

    pub fn field(&self, name: &str) -> Option<&FieldBinding> {
        self.fields.iter().find(|f| f.field_name == name)
    }
}

/// A decorated field that receives a host reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldBinding {
    pub field_name: String,
    /// Normalized decorator tag (inner tag for collections)
    pub binding_kind: String,
    pub is_collection: bool,
    /// Decorator text as written
    pub decorator: String,
}

impl FieldBinding {
    /// Classify a decorator expression into a binding
    ///
    /// `List(T)` binds a collection of `T`, `T()` binds a single `T`, and any
    /// other expression is used verbatim as a single binding tag.
    pub fn from_decorator(field_name: impl Into<String>, decorator: &str) -> Self {
        let expression = decorator.trim();
        let (binding_kind, is_collection) = classify_decorator(expression);
        Self {
            field_name: field_name.into(),
            binding_kind,
            is_collection,
            decorator: expression.to_string(),
        }
    }
}

fn classify_decorator(expression: &str) -> (String, bool) {
    if let Some(inner) = expression
        .strip_prefix("List(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let inner = inner.trim();
        if !inner.is_empty() {
            return (inner.to_string(), true);
        }
    }

    if let Some(name) = expression.strip_suffix("()") {
        let name = name.trim();
        if !name.is_empty() {
            return (name.to_string(), false);
        }
    }

    (expression.to_string(), false)
}

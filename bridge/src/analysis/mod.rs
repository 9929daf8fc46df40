//! Script analyzer
//!
//! Pure functions from script text to structural metadata. Nothing here touches
//! the interpreter or any runtime state.

pub mod ast;
pub mod meta;
mod parser;

pub use ast::{ClassDecl, FieldDecl, ImportDecl, MethodDecl, ScriptAst, Span};
pub use meta::{ClassDescriptor, FieldBinding, ScriptMeta};
pub use parser::ParseError;

use crate::error::{BridgeError, BridgeResult};

/// Reserved name of the scripted base class every attachable class extends
pub const BASE_CLASS_NAME: &str = "Behaviour";

/// Well-formed source that cannot be analyzed as a behaviour script
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct InvalidScriptError {
    pub reason: String,
}

impl InvalidScriptError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Parse script text into a syntax tree
pub fn parse(source: &str) -> Result<ScriptAst, ParseError> {
    parser::parse_script(source)
}

/// True when the file declares at least one class
pub fn is_valid(ast: &ScriptAst) -> bool {
    ast.classes().next().is_some()
}

/// Extract binding metadata from the first class of a parsed script
pub fn analyze(ast: &ScriptAst) -> Result<ScriptMeta, InvalidScriptError> {
    if !is_valid(ast) {
        return Err(InvalidScriptError::new("script does not declare a class"));
    }
    let class = ast
        .classes()
        .next()
        .ok_or_else(|| InvalidScriptError::new("script does not declare a class"))?;

    let fields = class
        .fields()
        .filter_map(|field| {
            field
                .decorators
                .first()
                .map(|decorator| FieldBinding::from_decorator(&field.name, &decorator.expression))
        })
        .collect();

    let methods = class
        .methods()
        .map(|method| (method.name.clone(), method.params.len()))
        .collect();

    Ok(ScriptMeta {
        imports: ast.imports().map(|import| import.path.clone()).collect(),
        class: ClassDescriptor {
            name: class.name.clone(),
            super_class: class.super_class.clone(),
            extends_base_stub: class.super_class.as_deref() == Some(BASE_CLASS_NAME),
            fields,
            methods,
        },
    })
}

/// Parse and analyze in one step, tagging failures with the asset identity
pub fn analyze_source(origin: &str, source: &str) -> BridgeResult<(ScriptAst, ScriptMeta)> {
    let ast = parse(source).map_err(|e| BridgeError::parse(origin, e))?;
    let meta = analyze(&ast).map_err(|e| BridgeError::invalid(origin, e))?;
    Ok((ast, meta))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOGGLE: &str = r#"
class Toggle extends Behaviour {
    @Light light;
    @Text() label;
    @List(Button) buttons;
    @GameObject @Light target;
    presses = 0;

    Update() { this.presses += 1; }
    OnCollisionEnter(collision) { }
    Flip() { }
}
"#;

    #[test]
    fn test_fields_keep_declaration_order() {
        let meta = analyze(&parse(TOGGLE).unwrap()).unwrap();
        let names: Vec<_> = meta.class.fields.iter().map(|f| f.field_name.as_str()).collect();
        assert_eq!(names, vec!["light", "label", "buttons", "target"]);

        let kinds: Vec<_> = meta
            .class
            .fields
            .iter()
            .map(|f| (f.binding_kind.as_str(), f.is_collection))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("Light", false),
                ("Text", false),
                ("Button", true),
                ("GameObject", false),
            ]
        );
    }

    #[test]
    fn test_methods_are_unfiltered() {
        let meta = analyze(&parse(TOGGLE).unwrap()).unwrap();
        let names: Vec<_> = meta.class.method_names().collect();
        assert_eq!(names, vec!["Flip", "OnCollisionEnter", "Update"]);
        assert_eq!(meta.class.arity("OnCollisionEnter"), Some(1));
    }

    #[test]
    fn test_base_class_check_is_textual() {
        let meta = analyze(&parse(TOGGLE).unwrap()).unwrap();
        assert!(meta.class.extends_base_stub);

        let other = analyze(&parse("class Plain extends Helper { }").unwrap()).unwrap();
        assert!(!other.class.extends_base_stub);
        assert_eq!(other.class.super_class.as_deref(), Some("Helper"));

        let none = analyze(&parse("class Bare { }").unwrap()).unwrap();
        assert!(!none.class.extends_base_stub);

        let dotted = analyze(&parse("class Dotted extends ns.Behaviour { }").unwrap()).unwrap();
        assert!(!dotted.class.extends_base_stub);
    }

    #[test]
    fn test_first_class_wins_and_imports_are_collected() {
        let source = r#"
import "Math";
class First extends Behaviour { }
class Second extends Behaviour { }
"#;
        let meta = analyze(&parse(source).unwrap()).unwrap();
        assert_eq!(meta.class.name, "First");
        assert_eq!(meta.imports, vec!["Math".to_string()]);
    }

    #[test]
    fn test_file_without_class_is_invalid() {
        let ast = parse("import \"Math\";").unwrap();
        assert!(!is_valid(&ast));
        assert!(analyze(&ast).is_err());
    }

    #[test]
    fn test_analyze_source_tags_origin() {
        let err = analyze_source("scripts/Broken.rhai", "class {").unwrap_err();
        assert!(matches!(err, BridgeError::Parse { .. }));
        assert!(err.to_string().starts_with("scripts/Broken.rhai"));

        let err = analyze_source("scripts/Empty.rhai", "").unwrap_err();
        assert!(matches!(err, BridgeError::InvalidScript { .. }));
    }
}

//! Syntax tree for behaviour scripts
//!
//! Only the class skeleton is structured. Method bodies and field initializers
//! stay as Rhai source text; they are syntax-checked during parsing and compiled
//! by the interpreter host when the class is executed.

use serde::{Deserialize, Serialize};

/// Location of a node in the script file (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A parsed script file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptAst {
    /// Top-level items in declaration order
    pub items: Vec<Item>,
}

impl ScriptAst {
    /// Iterate over class declarations in declaration order
    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Class(class) => Some(class),
            Item::Import(_) => None,
        })
    }

    /// Iterate over import directives in declaration order
    pub fn imports(&self) -> impl Iterator<Item = &ImportDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Import(import) => Some(import),
            Item::Class(_) => None,
        })
    }
}

/// A top-level item
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Import(ImportDecl),
    Class(ClassDecl),
}

/// `import "Namespace" [as alias];`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub path: String,
    pub alias: Option<String>,
    pub span: Span,
}

/// `class Name [extends Super] { members }`
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    /// Textual form of the superclass expression
    pub super_class: Option<String>,
    pub members: Vec<Member>,
    pub span: Span,
}

impl ClassDecl {
    pub fn fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.members.iter().filter_map(|member| match member {
            Member::Field(field) => Some(field),
            Member::Method(_) => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(|member| match member {
            Member::Method(method) => Some(method),
            Member::Field(_) => None,
        })
    }
}

/// A class member
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
}

/// A decorator such as `@Light`, `@Text()` or `@List(Button)`
#[derive(Debug, Clone, PartialEq)]
pub struct Decorator {
    /// Expression text after `@`, whitespace removed
    pub expression: String,
    pub span: Span,
}

/// A field declaration
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub decorators: Vec<Decorator>,
    /// Rhai expression used as the initial value
    pub initializer: Option<String>,
    pub span: Span,
}

/// A method declaration
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    pub params: Vec<String>,
    /// Rhai statements between the braces
    pub body: String,
    pub decorators: Vec<Decorator>,
    pub span: Span,
}

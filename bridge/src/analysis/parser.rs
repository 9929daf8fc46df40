//! Parser for behaviour script files
//!
//! The class skeleton (imports, class headers, decorators, fields, method
//! signatures) is parsed here by hand. Method bodies and field initializers are
//! captured verbatim and checked with the Rhai parser so that syntax errors are
//! reported against the original file position.

use super::ast::{ClassDecl, Decorator, FieldDecl, ImportDecl, Item, Member, MethodDecl, ScriptAst, Span};
use std::collections::HashSet;
use tracing::debug;

/// Member modifiers the class layer does not support
const UNSUPPORTED_MODIFIERS: &[&str] = &["static", "get", "set", "async", "constructor"];

/// Error type for script parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Parse a script file into its syntax tree
pub fn parse_script(source: &str) -> Result<ScriptAst, ParseError> {
    let mut parser = Parser::new(source);
    let ast = parser.parse_items()?;
    debug!(items = ast.items.len(), "Parsed script");
    Ok(ast)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn span(&self) -> Span {
        Span::new(self.line, self.column)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.line, self.column)
    }

    fn text(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    fn parse_items(&mut self) -> Result<ScriptAst, ParseError> {
        let mut items = Vec::new();

        loop {
            self.skip_trivia()?;
            match self.peek() {
                None => break,
                Some(';') => {
                    self.bump();
                }
                Some(_) if self.at_keyword("import") => {
                    items.push(Item::Import(self.parse_import()?));
                }
                Some(_) if self.at_keyword("class") => {
                    items.push(Item::Class(self.parse_class()?));
                }
                Some(_) => {
                    return Err(self.error("expected `class` or `import` at top level"));
                }
            }
        }

        Ok(ScriptAst { items })
    }

    fn parse_import(&mut self) -> Result<ImportDecl, ParseError> {
        let span = self.span();
        self.keyword("import")?;
        self.skip_trivia()?;
        let path = self.string_literal()?;
        self.skip_trivia()?;

        let alias = if self.at_keyword("as") {
            self.keyword("as")?;
            self.skip_trivia()?;
            Some(self.ident()?)
        } else {
            None
        };

        self.skip_trivia()?;
        self.expect(';')?;
        Ok(ImportDecl { path, alias, span })
    }

    fn parse_class(&mut self) -> Result<ClassDecl, ParseError> {
        let span = self.span();
        self.keyword("class")?;
        self.skip_trivia()?;
        let name = self.ident()?;
        self.skip_trivia()?;

        let super_class = if self.at_keyword("extends") {
            self.keyword("extends")?;
            self.skip_trivia()?;
            Some(self.dotted_name()?)
        } else {
            None
        };

        self.skip_trivia()?;
        self.expect('{')?;

        let mut members = Vec::new();
        let mut seen = HashSet::new();

        loop {
            self.skip_trivia()?;
            match self.peek() {
                None => return Err(self.error(format!("unterminated body of class `{name}`"))),
                Some('}') => {
                    self.bump();
                    break;
                }
                Some(';') => {
                    self.bump();
                }
                Some(_) => {
                    let member = self.parse_member()?;
                    let (member_name, member_span) = match &member {
                        Member::Field(field) => (&field.name, field.span),
                        Member::Method(method) => (&method.name, method.span),
                    };
                    if !seen.insert(member_name.clone()) {
                        return Err(ParseError::new(
                            format!("member `{member_name}` is declared more than once in class `{name}`"),
                            member_span.line,
                            member_span.column,
                        ));
                    }
                    members.push(member);
                }
            }
        }

        Ok(ClassDecl {
            name,
            super_class,
            members,
            span,
        })
    }

    fn parse_member(&mut self) -> Result<Member, ParseError> {
        let mut decorators = Vec::new();
        while self.peek() == Some('@') {
            decorators.push(self.decorator()?);
            self.skip_trivia()?;
        }

        let span = self.span();
        let name = self.ident()?;
        if UNSUPPORTED_MODIFIERS.contains(&name.as_str()) {
            return Err(ParseError::new(
                format!("`{name}` members are not supported in behaviour classes"),
                span.line,
                span.column,
            ));
        }
        self.skip_trivia()?;

        match self.peek() {
            Some('(') => {
                let params = self.params()?;
                self.skip_trivia()?;
                let (body, body_span) = self.block()?;
                check_method_body(&params, &body, body_span)?;
                Ok(Member::Method(MethodDecl {
                    name,
                    params,
                    body,
                    decorators,
                    span,
                }))
            }
            Some('=') => {
                self.bump();
                self.skip_trivia()?;
                let init_span = self.span();
                let start = self.pos;
                let end = self.scan_raw(';', "field initializer")?;
                let initializer = self.text(start, end).trim().to_string();
                self.bump();
                if initializer.is_empty() {
                    return Err(ParseError::new(
                        format!("field `{name}` has an empty initializer"),
                        init_span.line,
                        init_span.column,
                    ));
                }
                check_initializer(&initializer, init_span)?;
                Ok(Member::Field(FieldDecl {
                    name,
                    decorators,
                    initializer: Some(initializer),
                    span,
                }))
            }
            Some(';') => {
                self.bump();
                Ok(Member::Field(FieldDecl {
                    name,
                    decorators,
                    initializer: None,
                    span,
                }))
            }
            Some(ch) if ch == '}' || ch == '@' || is_ident_start(ch) => {
                Ok(Member::Field(FieldDecl {
                    name,
                    decorators,
                    initializer: None,
                    span,
                }))
            }
            Some(ch) => Err(self.error(format!("unexpected `{ch}` after member `{name}`"))),
            None => Err(self.error("unexpected end of file in class body")),
        }
    }

    fn decorator(&mut self) -> Result<Decorator, ParseError> {
        let span = self.span();
        self.expect('@')?;
        let mut expression = self.dotted_name()?;

        if self.peek() == Some('(') {
            let start = self.pos;
            self.bump();
            let end = self.scan_raw(')', "decorator arguments")?;
            self.bump();
            let raw = self.text(start, end + 1);
            expression.extend(raw.chars().filter(|c| !c.is_whitespace()));
        }

        Ok(Decorator { expression, span })
    }

    fn params(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect('(')?;
        let mut params = Vec::new();

        loop {
            self.skip_trivia()?;
            if self.peek() == Some(')') {
                self.bump();
                break;
            }
            if !params.is_empty() {
                self.expect(',')?;
                self.skip_trivia()?;
            }
            let param = self.ident()?;
            if params.contains(&param) {
                return Err(self.error(format!("duplicate parameter `{param}`")));
            }
            params.push(param);
        }

        Ok(params)
    }

    /// Capture the text between a pair of braces
    fn block(&mut self) -> Result<(String, Span), ParseError> {
        let span = self.span();
        self.expect('{')?;
        let start = self.pos;
        let end = self.scan_raw('}', "method body")?;
        self.bump();
        Ok((self.text(start, end), span))
    }

    /// Scan raw Rhai text up to `terminator` at nesting depth zero.
    /// Returns the position of the terminator without consuming it.
    fn scan_raw(&mut self, terminator: char, what: &str) -> Result<usize, ParseError> {
        let mut stack: Vec<char> = Vec::new();

        loop {
            let Some(ch) = self.peek() else {
                return Err(self.error(format!("unterminated {what}")));
            };

            if stack.is_empty() && ch == terminator {
                return Ok(self.pos);
            }

            match ch {
                '"' | '\'' => self.skip_quoted(ch)?,
                '`' => self.skip_template()?,
                '/' if matches!(self.peek_at(1), Some('/') | Some('*')) => self.skip_comment()?,
                '(' => {
                    stack.push(')');
                    self.bump();
                }
                '[' => {
                    stack.push(']');
                    self.bump();
                }
                '{' => {
                    stack.push('}');
                    self.bump();
                }
                ')' | ']' | '}' => match stack.pop() {
                    Some(expected) if expected == ch => {
                        self.bump();
                    }
                    Some(expected) => {
                        return Err(self.error(format!("mismatched `{ch}`, expected `{expected}`")));
                    }
                    None => return Err(self.error(format!("unexpected `{ch}` in {what}"))),
                },
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn skip_quoted(&mut self, quote: char) -> Result<(), ParseError> {
        let span = self.span();
        self.bump();
        loop {
            match self.bump() {
                None => {
                    return Err(ParseError::new(
                        "unterminated string literal",
                        span.line,
                        span.column,
                    ))
                }
                Some('\\') => {
                    self.bump();
                }
                Some(ch) if ch == quote => return Ok(()),
                Some(_) => {}
            }
        }
    }

    fn skip_template(&mut self) -> Result<(), ParseError> {
        let span = self.span();
        self.bump();
        loop {
            match self.peek() {
                None => {
                    return Err(ParseError::new(
                        "unterminated template string",
                        span.line,
                        span.column,
                    ))
                }
                Some('`') => {
                    self.bump();
                    return Ok(());
                }
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    self.bump();
                    self.bump();
                    self.scan_raw('}', "string interpolation")?;
                    self.bump();
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn skip_comment(&mut self) -> Result<(), ParseError> {
        let span = self.span();
        self.bump();
        match self.bump() {
            Some('/') => {
                while let Some(ch) = self.peek() {
                    if ch == '\n' {
                        break;
                    }
                    self.bump();
                }
                Ok(())
            }
            Some('*') => {
                // Rhai block comments nest
                let mut depth = 1;
                while depth > 0 {
                    match self.bump() {
                        None => {
                            return Err(ParseError::new(
                                "unterminated block comment",
                                span.line,
                                span.column,
                            ))
                        }
                        Some('/') if self.peek() == Some('*') => {
                            self.bump();
                            depth += 1;
                        }
                        Some('*') if self.peek() == Some('/') => {
                            self.bump();
                            depth -= 1;
                        }
                        Some(_) => {}
                    }
                }
                Ok(())
            }
            _ => Err(ParseError::new("expected comment", span.line, span.column)),
        }
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                Some(ch) if ch.is_whitespace() => {
                    self.bump();
                }
                Some('/') if matches!(self.peek_at(1), Some('/') | Some('*')) => {
                    self.skip_comment()?;
                }
                _ => return Ok(()),
            }
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        let len = keyword.chars().count();
        let matches = keyword
            .chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c));
        matches && !self.peek_at(len).is_some_and(is_ident_continue)
    }

    fn keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        if !self.at_keyword(keyword) {
            return Err(self.error(format!("expected `{keyword}`")));
        }
        for _ in keyword.chars() {
            self.bump();
        }
        Ok(())
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        match self.peek() {
            Some(ch) if ch == expected => {
                self.bump();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("expected `{expected}`, found `{ch}`"))),
            None => Err(self.error(format!("expected `{expected}`, found end of file"))),
        }
    }

    fn ident(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(ch) if is_ident_start(ch) => {
                let start = self.pos;
                while self.peek().is_some_and(is_ident_continue) {
                    self.bump();
                }
                Ok(self.text(start, self.pos))
            }
            Some(ch) => Err(self.error(format!("expected identifier, found `{ch}`"))),
            None => Err(self.error("expected identifier, found end of file")),
        }
    }

    fn dotted_name(&mut self) -> Result<String, ParseError> {
        let mut name = self.ident()?;
        while self.peek() == Some('.') && self.peek_at(1).is_some_and(is_ident_start) {
            self.bump();
            name.push('.');
            name.push_str(&self.ident()?);
        }
        Ok(name)
    }

    fn string_literal(&mut self) -> Result<String, ParseError> {
        let span = self.span();
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error("expected string literal")),
        };
        self.bump();

        let mut value = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(ParseError::new(
                        "unterminated string literal",
                        span.line,
                        span.column,
                    ))
                }
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(ch) => value.push(ch),
                    None => return Err(self.error("unterminated escape sequence")),
                },
                Some(ch) if ch == quote => return Ok(value),
                Some(ch) => value.push(ch),
            }
        }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Check a method body with the Rhai parser. `anchor` is the opening brace.
fn check_method_body(params: &[String], body: &str, anchor: Span) -> Result<(), ParseError> {
    let prefix = format!("fn syntax_check({}) {{", params.join(", "));
    let snippet = format!("{prefix}{body}}}");
    check_rhai_syntax(&snippet, prefix.chars().count(), anchor)
}

/// Check a field initializer. `anchor` is the first character of the expression.
fn check_initializer(expression: &str, anchor: Span) -> Result<(), ParseError> {
    let prefix = "fn syntax_check() { let initial_value = ";
    let snippet = format!("{prefix}{expression}; }}");
    check_rhai_syntax(&snippet, prefix.chars().count() + 1, anchor)
}

fn check_rhai_syntax(snippet: &str, anchor_offset: usize, anchor: Span) -> Result<(), ParseError> {
    let engine = rhai::Engine::new_raw();
    match engine.compile(snippet) {
        Ok(_) => Ok(()),
        Err(err) => {
            let position = err.position();
            let line = position.line().unwrap_or(1);
            let column = position.position().unwrap_or(anchor_offset);
            let (line, column) = if line <= 1 {
                (anchor.line, anchor.column + column.saturating_sub(anchor_offset))
            } else {
                (anchor.line + line - 1, column)
            };
            Err(ParseError::new(err.err_type().to_string(), line, column))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_class_skeleton() {
        let source = r#"
import "Math";
import "Input" as input;

// A toggling light
class Toggle extends Behaviour {
    @Light
    light;
    @List(Button) buttons;
    @Text() label
    presses = 0;

    Update() {
        if Input::get_key_down("Space") { this.Flip(); }
    }

    Flip() { this.presses += 1; }
}
"#;
        let ast = parse_script(source).unwrap();
        assert_eq!(ast.imports().count(), 2);
        let class = ast.classes().next().unwrap();
        assert_eq!(class.name, "Toggle");
        assert_eq!(class.super_class.as_deref(), Some("Behaviour"));
        assert_eq!(class.fields().count(), 4);
        assert_eq!(class.methods().count(), 2);

        let label = class.fields().find(|f| f.name == "label").unwrap();
        assert_eq!(label.decorators[0].expression, "Text()");

        let presses = class.fields().find(|f| f.name == "presses").unwrap();
        assert_eq!(presses.initializer.as_deref(), Some("0"));
        assert!(presses.decorators.is_empty());

        let import = ast.imports().nth(1).unwrap();
        assert_eq!(import.path, "Input");
        assert_eq!(import.alias.as_deref(), Some("input"));
    }

    #[test]
    fn test_braces_inside_strings_and_comments() {
        let source = r#"
class Braces extends Behaviour {
    Awake() {
        let text = "}}}";
        // }
        /* { nested /* } */ } */
        let t = `value ${ if true { 1 } else { 2 } } }`;
        let c = '}';
    }
}
"#;
        let ast = parse_script(source).unwrap();
        let class = ast.classes().next().unwrap();
        let method = class.methods().next().unwrap();
        assert!(method.body.contains("let c = '}';"));
    }

    #[test]
    fn test_method_parameters() {
        let source = "class Hits extends Behaviour { OnCollisionEnter(collision) { } Move(dx, dy) { } }";
        let ast = parse_script(source).unwrap();
        let class = ast.classes().next().unwrap();
        let params: Vec<_> = class.methods().map(|m| m.params.len()).collect();
        assert_eq!(params, vec![1, 2]);
    }

    #[test]
    fn test_rhai_syntax_error_is_mapped_to_file_position() {
        let source = "class Broken extends Behaviour {\n    Update() {\n        let x = ;\n    }\n}\n";
        let err = parse_script(source).unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_unterminated_class_is_an_error() {
        let err = parse_script("class Open extends Behaviour {\n  @Light light;\n").unwrap_err();
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn test_duplicate_member_is_an_error() {
        let err = parse_script("class Twice { a; a; }").unwrap_err();
        assert!(err.message.contains("more than once"));
    }

    #[test]
    fn test_unsupported_modifier_is_an_error() {
        let err = parse_script("class Static { static count = 1; }").unwrap_err();
        assert!(err.message.contains("not supported"));
    }

    #[test]
    fn test_top_level_statement_is_an_error() {
        let err = parse_script("let x = 1;").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("top level"));
    }

    #[test]
    fn test_initializer_requires_semicolon() {
        assert!(parse_script("class Init { speed = 1.0 }").is_err());
        assert!(parse_script("class Init { speed = #{ a: 1, b: [1, 2] }; }").is_ok());
    }
}

//! Result value trees
//!
//! The payload of an MI record is a comma-separated list of `name=value`
//! results, where a value is a quoted c-string, a `{...}` tuple, or a
//! `[...]` list. The whole payload parses into one anonymous root tuple.

use std::fmt::Write as _;

use crate::common::{Error, Result};

use super::token::{next_token, Token, TokenKind};

/// The shape of a single MI value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    /// A c-string or bare word, stored unquoted and unescaped
    Simple(String),
    /// `{...}`: members may be named or anonymous
    Tuple(Vec<ResultValue>),
    /// `[...]`: elements may be named (gdb emits both forms)
    Array(Vec<ResultValue>),
}

/// One named node of a result tree; the name is empty for anonymous values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultValue {
    pub name: String,
    pub kind: ValueKind,
}

impl ResultValue {
    pub fn simple(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ValueKind::Simple(value.into()),
        }
    }

    pub fn tuple(name: impl Into<String>, members: Vec<ResultValue>) -> Self {
        Self {
            name: name.into(),
            kind: ValueKind::Tuple(members),
        }
    }

    pub fn array(name: impl Into<String>, elements: Vec<ResultValue>) -> Self {
        Self {
            name: name.into(),
            kind: ValueKind::Array(elements),
        }
    }

    /// Children of a tuple or array; empty slice for simple values
    pub fn children(&self) -> &[ResultValue] {
        match &self.kind {
            ValueKind::Simple(_) => &[],
            ValueKind::Tuple(members) => members,
            ValueKind::Array(elements) => elements,
        }
    }

    /// First direct child with the given name
    pub fn find(&self, name: &str) -> Option<&ResultValue> {
        self.children().iter().find(|child| child.name == name)
    }

    /// Drill down a dot-separated path such as `"bkpt.number"`
    pub fn path(&self, path: &str) -> Option<&ResultValue> {
        let mut node = self;
        for part in path.split('.') {
            node = node.find(part)?;
        }
        Some(node)
    }

    /// String content of this node, when simple
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Simple(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// String content of the named direct child
    pub fn string_of(&self, name: &str) -> Option<&str> {
        self.find(name).and_then(|child| child.as_str())
    }

    /// Integer content of the named direct child
    pub fn int_of(&self, name: &str) -> Option<i64> {
        self.string_of(name).and_then(|s| s.parse().ok())
    }

    /// MI boolean flag: `"1"` is true, anything else (or absence) is false
    pub fn bool_flag(&self, name: &str) -> bool {
        self.string_of(name) == Some("1")
    }

    /// Canonical single-line rendering, used for logging and tests
    pub fn make_debug_string(&self) -> String {
        let mut out = String::new();
        self.write_debug(&mut out);
        out
    }

    fn write_debug(&self, out: &mut String) {
        if !self.name.is_empty() {
            let _ = write!(out, "{}=", self.name);
        }
        match &self.kind {
            ValueKind::Simple(s) => out.push_str(s),
            ValueKind::Tuple(members) => {
                out.push('{');
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    member.write_debug(out);
                }
                out.push('}');
            }
            ValueKind::Array(elements) => {
                out.push('[');
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    element.write_debug(out);
                }
                out.push(']');
            }
        }
    }
}

/// Undo MI c-string escaping on quoted token content
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Simple token content: strip quotes and unescape when quoted
fn token_content(source: &str, token: &Token) -> String {
    let text = token.text(source);
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        unescape(&text[1..text.len() - 1])
    } else {
        text.to_string()
    }
}

struct Parser<'a> {
    source: &'a str,
    pos: usize,
    peeked: Option<Token>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            peeked: None,
        }
    }

    fn peek(&mut self) -> Option<Token> {
        if self.peeked.is_none() {
            self.peeked = next_token(self.source, self.pos);
            if let Some(t) = self.peeked {
                self.pos = t.end;
            }
        }
        self.peeked
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.peek();
        self.peeked = None;
        t
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        match self.advance() {
            Some(t) if t.kind == kind => Ok(t),
            Some(t) => Err(Error::parse(format!(
                "expected {:?} at {}, got {:?}",
                kind,
                t.start,
                t.text(self.source)
            ))),
            None => Err(Error::parse(format!("expected {:?}, got end of input", kind))),
        }
    }

    /// `name=value` result, or a bare anonymous value
    fn parse_result(&mut self) -> Result<ResultValue> {
        let first = self
            .advance()
            .ok_or_else(|| Error::parse("expected a value, got end of input"))?;

        match first.kind {
            TokenKind::String => {
                if matches!(self.peek(), Some(t) if t.kind == TokenKind::Equal) {
                    self.advance();
                    let mut value = self.parse_bare_value()?;
                    value.name = token_content(self.source, &first);
                    Ok(value)
                } else {
                    Ok(ResultValue::simple("", token_content(self.source, &first)))
                }
            }
            TokenKind::TupleStart => self.parse_tuple(""),
            TokenKind::ListStart => self.parse_array(""),
            _ => Err(Error::parse(format!(
                "unexpected {:?} at {}",
                first.text(self.source),
                first.start
            ))),
        }
    }

    /// A value with no name of its own (right-hand side of `=`)
    fn parse_bare_value(&mut self) -> Result<ResultValue> {
        let first = self
            .advance()
            .ok_or_else(|| Error::parse("expected a value, got end of input"))?;
        match first.kind {
            TokenKind::String => Ok(ResultValue::simple("", token_content(self.source, &first))),
            TokenKind::TupleStart => self.parse_tuple(""),
            TokenKind::ListStart => self.parse_array(""),
            _ => Err(Error::parse(format!(
                "unexpected {:?} at {}",
                first.text(self.source),
                first.start
            ))),
        }
    }

    /// Members after `{`, up to and including the closing `}`
    fn parse_tuple(&mut self, name: &str) -> Result<ResultValue> {
        let mut members = Vec::new();
        if matches!(self.peek(), Some(t) if t.kind == TokenKind::TupleEnd) {
            self.advance();
            return Ok(ResultValue::tuple(name, members));
        }
        loop {
            members.push(self.parse_result()?);
            match self.advance() {
                Some(t) if t.kind == TokenKind::Comma => continue,
                Some(t) if t.kind == TokenKind::TupleEnd => break,
                Some(t) => {
                    return Err(Error::parse(format!(
                        "expected ',' or '}}' at {}, got {:?}",
                        t.start,
                        t.text(self.source)
                    )))
                }
                None => return Err(Error::parse("unterminated tuple")),
            }
        }
        Ok(ResultValue::tuple(name, members))
    }

    /// Elements after `[`, up to and including the closing `]`
    fn parse_array(&mut self, name: &str) -> Result<ResultValue> {
        let mut elements = Vec::new();
        if matches!(self.peek(), Some(t) if t.kind == TokenKind::ListEnd) {
            self.advance();
            return Ok(ResultValue::array(name, elements));
        }
        loop {
            elements.push(self.parse_result()?);
            match self.advance() {
                Some(t) if t.kind == TokenKind::Comma => continue,
                Some(t) if t.kind == TokenKind::ListEnd => break,
                Some(t) => {
                    return Err(Error::parse(format!(
                        "expected ',' or ']' at {}, got {:?}",
                        t.start,
                        t.text(self.source)
                    )))
                }
                None => return Err(Error::parse("unterminated list")),
            }
        }
        Ok(ResultValue::array(name, elements))
    }
}

/// Parse a record payload (the text after the result class) into an
/// anonymous root tuple. An empty payload yields an empty root.
pub fn parse_value(text: &str) -> Result<ResultValue> {
    let mut parser = Parser::new(text);
    let mut members = Vec::new();

    if parser.peek().is_none() {
        return Ok(ResultValue::tuple("", members));
    }
    loop {
        members.push(parser.parse_result()?);
        match parser.advance() {
            Some(t) if t.kind == TokenKind::Comma => continue,
            Some(t) => {
                return Err(Error::parse(format!(
                    "trailing {:?} at {}",
                    t.text(text),
                    t.start
                )))
            }
            None => break,
        }
    }
    Ok(ResultValue::tuple("", members))
}

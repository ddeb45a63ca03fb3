//! Reader for the Lua table subset used by LuaDist metadata.
//!
//! `dist.info` files are a sequence of assignments and `dist.manifest`
//! files are a `return { ... }` chunk:
//! ```text
//! name = "md5"
//! version = "1.2"
//! depends = { "lua ~> 5.1" }
//! ```
//! Only constructors and literals are understood; anything that would need
//! evaluation (calls, operators other than unary minus) is a parse error.

use crate::error::{Error, Result};
use std::path::PathBuf;

/// A literal Lua value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(String),
    Table(Table),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }
}

/// A table constructor: positional items plus keyed fields in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub array: Vec<Value>,
    pub fields: Vec<(String, Value)>,
}

impl Table {
    /// Last value assigned to `key`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }
}

/// Parse a chunk into a table.
///
/// A `return <table>` chunk yields that table; a chunk of `name = value`
/// statements yields a table of those fields.
pub fn parse_chunk(source: &str) -> Result<Table> {
    let mut parser = Parser::new(source);
    parser.skip_trivia()?;

    if parser.eat_keyword("return") {
        parser.skip_trivia()?;
        let value = parser.value()?;
        parser.skip_trivia()?;
        parser.eat(b';');
        parser.skip_trivia()?;
        if !parser.at_end() {
            return Err(parser.error("unexpected content after return"));
        }
        return match value {
            Value::Table(t) => Ok(t),
            _ => Err(parser.error("expected a table after return")),
        };
    }

    let mut table = Table::default();
    while !parser.at_end() {
        let name = parser.name()?;
        parser.skip_trivia()?;
        parser.expect(b'=')?;
        parser.skip_trivia()?;
        let value = parser.value()?;
        table.fields.push((name, value));
        parser.skip_trivia()?;
        parser.eat(b';');
        parser.skip_trivia()?;
    }
    Ok(table)
}

/// Parse a file, attributing errors to its path.
pub fn parse_file(path: &std::path::Path) -> Result<Table> {
    let source = std::fs::read_to_string(path)?;
    parse_chunk(&source).map_err(|e| match e {
        Error::Parse { line, message, .. } => Error::Parse {
            path: path.to_path_buf(),
            line,
            message,
        },
        other => other,
    })
}

/// Deepest nesting of values accepted before giving up
const MAX_DEPTH: usize = 64;

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            src: source.as_bytes(),
            pos: 0,
            line: 1,
            depth: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Parse {
            path: PathBuf::new(),
            line: self.line,
            message: message.into(),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: u8) -> Result<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", c as char)))
        }
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        let end = self.pos + word.len();
        if self.src.get(self.pos..end) == Some(word.as_bytes())
            && !self.src.get(end).is_some_and(|c| is_name_char(*c))
        {
            self.pos = end;
            true
        } else {
            false
        }
    }

    /// Skip whitespace and comments
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_whitespace() => {
                    self.bump();
                }
                Some(b'-') if self.peek_at(1) == Some(b'-') => {
                    self.pos += 2;
                    if let Some(level) = self.long_bracket_level() {
                        self.long_bracket(level)?;
                    } else {
                        while let Some(c) = self.peek() {
                            if c == b'\n' {
                                break;
                            }
                            self.bump();
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn name(&mut self) -> Result<String> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == b'_' => {}
            _ => return Err(self.error("expected a name")),
        }
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
        Ok(String::from_utf8_lossy(&self.src[start..self.pos]).into_owned())
    }

    fn value(&mut self) -> Result<Value> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(format!("values nested deeper than {MAX_DEPTH} levels")));
        }
        self.depth += 1;
        let value = self.literal();
        self.depth -= 1;
        value
    }

    fn literal(&mut self) -> Result<Value> {
        match self.peek() {
            Some(b'{') => self.table().map(Value::Table),
            Some(b'"') | Some(b'\'') => self.quoted().map(Value::Str),
            Some(b'[') => match self.long_bracket_level() {
                Some(level) => self.long_bracket(level).map(Value::Str),
                None => Err(self.error("unexpected '['")),
            },
            Some(b'-') => {
                self.bump();
                self.skip_trivia()?;
                match self.value()? {
                    Value::Number(n) => Ok(Value::Number(-n)),
                    _ => Err(self.error("unary minus on a non-number")),
                }
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number().map(Value::Number),
            Some(c) if c.is_ascii_alphabetic() || c == b'_' => {
                let word = self.name()?;
                match word.as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "nil" => Ok(Value::Nil),
                    other => Err(self.error(format!("unsupported expression '{other}'"))),
                }
            }
            Some(c) => Err(self.error(format!("unexpected '{}'", c as char))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn table(&mut self) -> Result<Table> {
        self.expect(b'{')?;
        let mut table = Table::default();

        loop {
            self.skip_trivia()?;
            if self.eat(b'}') {
                return Ok(table);
            }

            if self.peek() == Some(b'[') && self.long_bracket_level().is_none() {
                // [key] = value
                self.bump();
                self.skip_trivia()?;
                let key = match self.value()? {
                    Value::Str(s) => s,
                    Value::Number(n) => format_number(n),
                    _ => return Err(self.error("unsupported table key")),
                };
                self.skip_trivia()?;
                self.expect(b']')?;
                self.skip_trivia()?;
                self.expect(b'=')?;
                self.skip_trivia()?;
                let value = self.value()?;
                table.fields.push((key, value));
            } else if self.is_named_field() {
                let key = self.name()?;
                self.skip_trivia()?;
                self.expect(b'=')?;
                self.skip_trivia()?;
                let value = self.value()?;
                table.fields.push((key, value));
            } else {
                let value = self.value()?;
                table.array.push(value);
            }

            self.skip_trivia()?;
            if self.eat(b',') || self.eat(b';') {
                continue;
            }
            self.skip_trivia()?;
            if self.eat(b'}') {
                return Ok(table);
            }
            return Err(self.error("expected ',' or '}' in table"));
        }
    }

    /// Lookahead for `name =` (but not `name ==`)
    fn is_named_field(&self) -> bool {
        let mut i = self.pos;
        match self.src.get(i) {
            Some(c) if c.is_ascii_alphabetic() || *c == b'_' => {}
            _ => return false,
        }
        while self.src.get(i).is_some_and(|c| is_name_char(*c)) {
            i += 1;
        }
        while self.src.get(i).is_some_and(|c| c.is_ascii_whitespace()) {
            i += 1;
        }
        self.src.get(i) == Some(&b'=') && self.src.get(i + 1) != Some(&b'=')
    }

    fn quoted(&mut self) -> Result<String> {
        let quote = self.bump().ok_or_else(|| self.error("expected a string"))?;
        let mut out = Vec::new();
        loop {
            match self.bump() {
                None | Some(b'\n') => return Err(self.error("unfinished string")),
                Some(c) if c == quote => break,
                Some(b'\\') => match self.bump() {
                    Some(b'n') => out.push(b'\n'),
                    Some(b't') => out.push(b'\t'),
                    Some(b'r') => out.push(b'\r'),
                    Some(b'a') => out.push(0x07),
                    Some(b'b') => out.push(0x08),
                    Some(b'f') => out.push(0x0c),
                    Some(b'v') => out.push(0x0b),
                    Some(b'\n') => out.push(b'\n'),
                    Some(d) if d.is_ascii_digit() => {
                        let mut code = u32::from(d - b'0');
                        for _ in 0..2 {
                            match self.peek() {
                                Some(n) if n.is_ascii_digit() => {
                                    code = code * 10 + u32::from(n - b'0');
                                    self.bump();
                                }
                                _ => break,
                            }
                        }
                        let byte =
                            u8::try_from(code).map_err(|_| self.error("escape too large"))?;
                        out.push(byte);
                    }
                    Some(other) => out.push(other),
                    None => return Err(self.error("unfinished string")),
                },
                Some(c) => out.push(c),
            }
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Level of a long bracket opening at the cursor (`[[` is 0, `[=[` is 1)
    fn long_bracket_level(&self) -> Option<usize> {
        if self.peek() != Some(b'[') {
            return None;
        }
        let mut level = 0;
        while self.peek_at(1 + level) == Some(b'=') {
            level += 1;
        }
        (self.peek_at(1 + level) == Some(b'[')).then_some(level)
    }

    fn long_bracket(&mut self, level: usize) -> Result<String> {
        for _ in 0..level + 2 {
            self.bump();
        }
        // A newline right after the opening bracket is skipped
        if self.peek() == Some(b'\r') {
            self.bump();
        }
        if self.peek() == Some(b'\n') {
            self.bump();
        }

        let start = self.pos;
        loop {
            match self.peek() {
                None => return Err(self.error("unfinished long string or comment")),
                Some(b']') => {
                    let closes = (1..=level).all(|i| self.peek_at(i) == Some(b'='))
                        && self.peek_at(level + 1) == Some(b']');
                    if closes {
                        let text = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
                        for _ in 0..level + 2 {
                            self.bump();
                        }
                        return Ok(text);
                    }
                    self.bump();
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn number(&mut self) -> Result<f64> {
        let start = self.pos;
        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x') | Some(b'X')) {
            self.pos += 2;
            let digits = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let text = String::from_utf8_lossy(&self.src[digits..self.pos]);
            return i64::from_str_radix(&text, 16)
                .map(|n| n as f64)
                .map_err(|_| self.error("invalid hex number"));
        }

        while let Some(c) = self.peek() {
            let exponent_sign = (c == b'+' || c == b'-')
                && self.pos > start
                && matches!(self.src[self.pos - 1], b'e' | b'E');
            if c.is_ascii_digit() || c == b'.' || c == b'e' || c == b'E' || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = String::from_utf8_lossy(&self.src[start..self.pos]);
        text.parse::<f64>()
            .map_err(|_| self.error(format!("invalid number '{text}'")))
    }
}

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

//! Restricted literal reader for list-encoded metadata values.
//!
//! Metadata exporters write multi-valued attributes as list literals such as
//! `['ORIGINAL', 'PRIMARY']`, and the standard catalog encodes its term lists as
//! `{'Enumerated Values': [...], 'Defined Terms': [...]}`. This reader accepts
//! exactly that grammar: quoted strings, numbers, lists and string-keyed
//! dictionaries. Nothing is evaluated; any other input is rejected.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::CharIndices;

static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?$").expect("valid number regex")
});

/// Maximum nesting depth accepted before the reader gives up.
const MAX_DEPTH: usize = 32;

/// A parsed literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// A quoted string with escapes resolved.
    Str(String),
    /// A number, kept as its source text.
    Number(String),
    /// A bracketed list.
    List(Vec<Literal>),
    /// A braced mapping with string keys.
    Dict(BTreeMap<String, Literal>),
}

impl Literal {
    /// Text used to compare the literal against a term set.
    ///
    /// Terms are strings, so only string literals have term text. A bare
    /// `00` reads as a number and never matches the term `'00'`.
    pub fn as_term(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            Literal::Number(_) | Literal::List(_) | Literal::Dict(_) => None,
        }
    }
}

/// Reason a literal could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralError {
    pub position: usize,
    pub message: &'static str,
}

impl std::fmt::Display for LiteralError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at byte {}", self.message, self.position)
    }
}

impl std::error::Error for LiteralError {}

/// Parses a complete literal; trailing content other than whitespace is an error.
pub fn parse_literal(input: &str) -> Result<Literal, LiteralError> {
    let mut reader = Reader {
        input,
        chars: input.char_indices().peekable(),
    };
    let literal = reader.value(0)?;
    reader.skip_whitespace();
    match reader.chars.peek() {
        None => Ok(literal),
        Some(&(pos, _)) => Err(LiteralError {
            position: pos,
            message: "unexpected trailing input",
        }),
    }
}

struct Reader<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl Reader<'_> {
    fn error(&mut self, message: &'static str) -> LiteralError {
        let position = self.chars.peek().map_or(self.input.len(), |&(pos, _)| pos);
        LiteralError { position, message }
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn value(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.skip_whitespace();
        match self.chars.peek().map(|&(_, c)| c) {
            Some('[') => self.list(depth),
            Some('{') => self.dict(depth),
            Some('\'') | Some('"') => self.string().map(Literal::Str),
            Some(c) if c.is_ascii_digit() || matches!(c, '+' | '-' | '.') => self.number(),
            Some(_) => Err(self.error("unsupported literal")),
            None => Err(self.error("empty input")),
        }
    }

    fn list(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        self.chars.next();
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.chars.next_if(|&(_, c)| c == ']').is_some() {
                return Ok(Literal::List(items));
            }
            items.push(self.value(depth + 1)?);
            self.skip_whitespace();
            match self.chars.next() {
                Some((_, ',')) => continue,
                Some((_, ']')) => return Ok(Literal::List(items)),
                _ => return Err(self.error("expected ',' or ']'")),
            }
        }
    }

    fn dict(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        self.chars.next();
        let mut entries = BTreeMap::new();
        loop {
            self.skip_whitespace();
            if self.chars.next_if(|&(_, c)| c == '}').is_some() {
                return Ok(Literal::Dict(entries));
            }
            let key = match self.chars.peek() {
                Some(&(_, '\'')) | Some(&(_, '"')) => self.string()?,
                _ => return Err(self.error("dictionary keys must be strings")),
            };
            self.skip_whitespace();
            if self.chars.next_if(|&(_, c)| c == ':').is_none() {
                return Err(self.error("expected ':'"));
            }
            let value = self.value(depth + 1)?;
            entries.insert(key, value);
            self.skip_whitespace();
            match self.chars.next() {
                Some((_, ',')) => continue,
                Some((_, '}')) => return Ok(Literal::Dict(entries)),
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        let Some((_, quote)) = self.chars.next() else {
            return Err(self.error("expected quote"));
        };
        let mut out = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                c if c == quote => return Ok(out),
                '\\' => match self.chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, '0')) => out.push('\0'),
                    Some((_, e @ ('\\' | '\'' | '"'))) => out.push(e),
                    Some((_, other)) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => break,
                },
                '\n' => return Err(self.error("newline in string")),
                c => out.push(c),
            }
        }
        Err(self.error("unterminated string"))
    }

    fn number(&mut self) -> Result<Literal, LiteralError> {
        let start = self.chars.peek().map_or(self.input.len(), |&(pos, _)| pos);
        let mut end = start;
        while let Some((pos, c)) = self
            .chars
            .next_if(|&(_, c)| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            end = pos + c.len_utf8();
        }
        let text = &self.input[start..end];
        let message = if !NUMBER.is_match(text) {
            "malformed number"
        } else if has_leading_zero(text) {
            "leading zeros in integer"
        } else {
            return Ok(Literal::Number(text.to_string()));
        };
        Err(LiteralError {
            position: start,
            message,
        })
    }
}

/// Integers such as `007` are not literals, while `00` and `0.5` are.
fn has_leading_zero(text: &str) -> bool {
    let digits = text.trim_start_matches(|c: char| c == '+' || c == '-');
    let is_integer = digits.bytes().all(|b| b.is_ascii_digit());
    is_integer && digits.len() > 1 && digits.starts_with('0') && digits.bytes().any(|b| b != b'0')
}

//! Text grammar for parameter and return types as written in corpus manifests.
//!
//! ```text
//! value   := ["mut "] base
//! base    := scalar | scalar "*" | scalar "[" len "]" | "cstr" | "bytes[" INT "]"
//!          | "struct{" scalar ("," scalar)* "}"
//! len     := product ("+" product)*
//! product := atom ("*" atom)*
//! atom    := INT | IDENT | "(" len ")"
//! return  := "void" | "ptr" | "cstr" | scalar
//! ```
//!
//! Scalar names come from the compatibility vocabulary ([`crate::compat::CompatType`]).

use thiserror::Error;

use super::{is_c_identifier, LenExpr, ReturnType, ScalarType, ValueType};
use crate::compat::CompatType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeParseError {
    #[error("empty type")]
    Empty,
    #[error("unknown type name '{0}'")]
    UnknownType(String),
    #[error("'mut' only applies to pointer types, got '{0}'")]
    MutOnValue(String),
    #[error("malformed type '{text}': {reason}")]
    Malformed { text: String, reason: String },
    #[error("malformed length expression '{text}': {reason}")]
    BadLength { text: String, reason: String },
}

fn malformed(text: &str, reason: impl Into<String>) -> TypeParseError {
    TypeParseError::Malformed { text: text.to_string(), reason: reason.into() }
}

fn scalar(name: &str) -> Result<ScalarType, TypeParseError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TypeParseError::Empty);
    }
    CompatType::from_name(name)
        .map(CompatType::scalar)
        .ok_or_else(|| TypeParseError::UnknownType(name.to_string()))
}

/// Parse a parameter type such as `int4`, `mut uint1[n*2]`, `cstr` or `struct{int4,float8}`.
pub fn parse_value_type(text: &str) -> Result<ValueType, TypeParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TypeParseError::Empty);
    }

    let (mutable, body) = match trimmed.strip_prefix("mut ") {
        Some(rest) => (true, rest.trim()),
        None => (false, trimmed),
    };

    if body == "cstr" {
        return Ok(ValueType::CString { mutable });
    }

    if let Some(rest) = body.strip_prefix("struct") {
        if mutable {
            return Err(TypeParseError::MutOnValue(trimmed.to_string()));
        }
        let inner = rest
            .trim()
            .strip_prefix('{')
            .and_then(|r| r.strip_suffix('}'))
            .ok_or_else(|| malformed(trimmed, "expected struct{...}"))?;
        let fields = inner
            .split(',')
            .filter(|f| !f.trim().is_empty())
            .map(scalar)
            .collect::<Result<Vec<_>, _>>()?;
        if fields.is_empty() {
            return Err(malformed(trimmed, "struct needs at least one field"));
        }
        return Ok(ValueType::Aggregate { fields });
    }

    if let Some(elem) = body.strip_suffix('*') {
        let elem = scalar(elem)?;
        return Ok(ValueType::Buffer { elem, len: LenExpr::Const(1), mutable });
    }

    if let Some(open) = body.find('[') {
        let inner = body[open + 1..]
            .strip_suffix(']')
            .ok_or_else(|| malformed(trimmed, "unterminated '['"))?;
        let head = body[..open].trim();
        if head == "bytes" {
            let size = inner
                .trim()
                .parse::<u64>()
                .map_err(|_| malformed(trimmed, "bytes[N] needs a constant size"))?;
            return Ok(ValueType::Bytes { size, mutable });
        }
        let elem = scalar(head)?;
        let len = parse_len_expr(inner)?;
        return Ok(ValueType::Buffer { elem, len, mutable });
    }

    let s = scalar(body)?;
    if mutable {
        return Err(TypeParseError::MutOnValue(trimmed.to_string()));
    }
    Ok(ValueType::Scalar(s))
}

/// Parse a return type: `void`, `ptr`, `cstr` or a scalar name.
pub fn parse_return_type(text: &str) -> Result<ReturnType, TypeParseError> {
    match text.trim() {
        "" => Err(TypeParseError::Empty),
        "void" => Ok(ReturnType::Void),
        "ptr" => Ok(ReturnType::Pointer),
        "cstr" => Ok(ReturnType::CString),
        other => scalar(other).map(ReturnType::Scalar),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Int(u64),
    Ident(String),
    Plus,
    Star,
    Open,
    Close,
}

fn tokenize(text: &str) -> Result<Vec<Token>, TypeParseError> {
    let bad = |reason: &str| TypeParseError::BadLength { text: text.to_string(), reason: reason.to_string() };
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let digits: String = chars[start..i].iter().collect();
                let value = digits.parse::<u64>().map_err(|_| bad("integer literal too large"))?;
                tokens.push(Token::Int(value));
            }
            c if c == '_' || c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i] == '_' || chars[i].is_ascii_alphanumeric()) {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                debug_assert!(is_c_identifier(&ident));
                tokens.push(Token::Ident(ident));
            }
            _ => return Err(bad(&format!("unexpected character '{c}'"))),
        }
    }
    Ok(tokens)
}

struct LenParser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl LenParser<'_> {
    fn error(&self, reason: &str) -> TypeParseError {
        TypeParseError::BadLength { text: self.text.to_string(), reason: reason.to_string() }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn sum(&mut self) -> Result<LenExpr, TypeParseError> {
        let mut lhs = self.product()?;
        while self.peek() == Some(&Token::Plus) {
            self.pos += 1;
            let rhs = self.product()?;
            lhs = LenExpr::Add(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn product(&mut self) -> Result<LenExpr, TypeParseError> {
        let mut lhs = self.atom()?;
        while self.peek() == Some(&Token::Star) {
            self.pos += 1;
            let rhs = self.atom()?;
            lhs = LenExpr::Mul(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn atom(&mut self) -> Result<LenExpr, TypeParseError> {
        let token = self.peek().cloned().ok_or_else(|| self.error("unexpected end"))?;
        self.pos += 1;
        match token {
            Token::Int(n) => Ok(LenExpr::Const(n)),
            Token::Ident(name) => Ok(LenExpr::Param(name)),
            Token::Open => {
                let inner = self.sum()?;
                if self.peek() != Some(&Token::Close) {
                    return Err(self.error("missing ')'"));
                }
                self.pos += 1;
                Ok(inner)
            }
            Token::Plus | Token::Star | Token::Close => Err(self.error("expected a number or name")),
        }
    }
}

/// Parse a buffer length expression such as `n`, `16`, `rows*cols` or `(n+1)*4`.
pub fn parse_len_expr(text: &str) -> Result<LenExpr, TypeParseError> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(TypeParseError::BadLength { text: text.to_string(), reason: "empty".into() });
    }
    let mut parser = LenParser { text, tokens, pos: 0 };
    let expr = parser.sum()?;
    if parser.pos != parser.tokens.len() {
        return Err(parser.error("trailing tokens"));
    }
    Ok(expr)
}

//! Inline marker parsing for template text lines.
//!
//! A text line is split into literal runs, `@name.sub` property references
//! and `@{ expr }` inline expressions. `@@` yields a literal `@`; any other
//! `@` that does not start a marker is kept as text.

use std::fmt;

use crate::error::ParseErrorKind;

/// A dotted identifier sequence such as `order.customer.name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath(pub Vec<String>);

impl PropertyPath {
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// A parsed piece of a template line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Literal(String),
    PropertyRef(PropertyPath),
    /// Raw, trimmed expression text from `@{ … }`.
    InlineExpr(String),
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Byte length of `ident(.ident)*` at the start of `s`. A dot is only
/// consumed when an identifier follows it.
fn path_len(s: &[u8]) -> usize {
    let mut len = 0;
    loop {
        let ident = s[len..].iter().take_while(|b| is_ident_char(**b)).count();
        len += ident;
        if s.get(len) == Some(&b'.') && s.get(len + 1).copied().is_some_and(is_ident_start) {
            len += 1;
        } else {
            return len;
        }
    }
}

/// Finds the `}` closing an inline expression whose body starts at `body`,
/// skipping quoted strings and balancing nested braces. Returns the byte
/// offset of that brace within `s`.
pub(crate) fn find_closing_brace(s: &str, body: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = body;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'{' => depth += 1,
                b'}' if depth == 0 => return Some(i),
                b'}' => depth -= 1,
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Splits one non-code line into fragments.
pub fn parse_fragments(line: &str) -> Result<Vec<Fragment>, ParseErrorKind> {
    let bytes = line.as_bytes();
    let mut fragments = Vec::new();
    let mut literal = String::new();
    let mut last = 0;
    let mut i = 0;

    while let Some(offset) = line[i..].find('@') {
        let at = i + offset;
        literal.push_str(&line[last..at]);
        let next = bytes.get(at + 1).copied();

        match next {
            Some(b'@') => {
                literal.push('@');
                i = at + 2;
            }
            Some(b'{') => {
                let close = find_closing_brace(line, at + 2)
                    .ok_or(ParseErrorKind::UnterminatedExpression)?;
                let expr = line[at + 2..close].trim();
                if expr.is_empty() {
                    return Err(ParseErrorKind::EmptyExpression);
                }
                flush(&mut literal, &mut fragments);
                fragments.push(Fragment::InlineExpr(expr.to_string()));
                i = close + 1;
            }
            Some(b) if is_ident_start(b) => {
                let len = path_len(&bytes[at + 1..]);
                let path = line[at + 1..at + 1 + len]
                    .split('.')
                    .map(str::to_string)
                    .collect();
                flush(&mut literal, &mut fragments);
                fragments.push(Fragment::PropertyRef(PropertyPath(path)));
                i = at + 1 + len;
            }
            _ => {
                literal.push('@');
                i = at + 1;
            }
        }
        last = i;
    }

    literal.push_str(&line[last..]);
    flush(&mut literal, &mut fragments);
    Ok(fragments)
}

fn flush(literal: &mut String, fragments: &mut Vec<Fragment>) {
    if !literal.is_empty() {
        fragments.push(Fragment::Literal(std::mem::take(literal)));
    }
}

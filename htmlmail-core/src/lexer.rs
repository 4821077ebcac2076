//! Tokenizer for the expression and statement language used inside `@{ … }`.
//!
//! Tokenization is line-local: code blocks are tokenized one source line at a
//! time so every token can be traced back to its line. A `//` comment ends
//! the line.

use std::fmt;

use crate::error::ParseErrorKind;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Var,
    If,
    Else,
    For,
    Foreach,
    While,
    In,
    True,
    False,
    Null,

    // Grouping
    LParen,   // (
    RParen,   // )
    LBrace,   // {
    RBrace,   // }
    LBracket, // [
    RBracket, // ]

    // Punctuation
    Dot,
    Semi,
    Question,
    Colon,

    // Assignment
    Assign,      // =
    PlusAssign,  // +=
    MinusAssign, // -=
    StarAssign,  // *=
    SlashAssign, // /=
    PlusPlus,
    MinusMinus,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    AndAnd,
    OrOr,

    // Data
    Ident(String),
    Number(f64),
    Str(String),
}

impl Token {
    /// Tokens that, at the start of a code-block line, mark it as a statement.
    pub fn starts_statement(&self) -> bool {
        matches!(
            self,
            Token::Var
                | Token::If
                | Token::Else
                | Token::For
                | Token::Foreach
                | Token::While
                | Token::LBrace
                | Token::RBrace
                | Token::Semi
        )
    }

    /// Tokens that cannot end a statement line, so the next line continues it.
    pub fn expects_more(&self) -> bool {
        !matches!(
            self,
            Token::RParen
                | Token::RBrace
                | Token::LBrace
                | Token::RBracket
                | Token::Semi
                | Token::Else
                | Token::PlusPlus
                | Token::MinusMinus
                | Token::True
                | Token::False
                | Token::Null
                | Token::Ident(_)
                | Token::Number(_)
                | Token::Str(_)
        )
    }

    /// Tokens that can only continue an expression begun on an earlier line.
    pub fn continues_expression(&self) -> bool {
        matches!(
            self,
            Token::Plus
                | Token::Minus
                | Token::Star
                | Token::Slash
                | Token::Percent
                | Token::EqEq
                | Token::NotEq
                | Token::Lt
                | Token::Gt
                | Token::LtEq
                | Token::GtEq
                | Token::AndAnd
                | Token::OrOr
                | Token::Question
                | Token::Colon
                | Token::Dot
                | Token::RParen
                | Token::RBracket
        )
    }

    /// Assignment-family operators that may follow a bare identifier.
    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            Token::Assign
                | Token::PlusAssign
                | Token::MinusAssign
                | Token::StarAssign
                | Token::SlashAssign
                | Token::PlusPlus
                | Token::MinusMinus
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Token::Var => "`var`",
            Token::If => "`if`",
            Token::Else => "`else`",
            Token::For => "`for`",
            Token::Foreach => "`foreach`",
            Token::While => "`while`",
            Token::In => "`in`",
            Token::True => "`true`",
            Token::False => "`false`",
            Token::Null => "`null`",
            Token::LParen => "`(`",
            Token::RParen => "`)`",
            Token::LBrace => "`{`",
            Token::RBrace => "`}`",
            Token::LBracket => "`[`",
            Token::RBracket => "`]`",
            Token::Dot => "`.`",
            Token::Semi => "`;`",
            Token::Question => "`?`",
            Token::Colon => "`:`",
            Token::Assign => "`=`",
            Token::PlusAssign => "`+=`",
            Token::MinusAssign => "`-=`",
            Token::StarAssign => "`*=`",
            Token::SlashAssign => "`/=`",
            Token::PlusPlus => "`++`",
            Token::MinusMinus => "`--`",
            Token::Plus => "`+`",
            Token::Minus => "`-`",
            Token::Star => "`*`",
            Token::Slash => "`/`",
            Token::Percent => "`%`",
            Token::Bang => "`!`",
            Token::EqEq => "`==`",
            Token::NotEq => "`!=`",
            Token::Lt => "`<`",
            Token::Gt => "`>`",
            Token::LtEq => "`<=`",
            Token::GtEq => "`>=`",
            Token::AndAnd => "`&&`",
            Token::OrOr => "`||`",
            Token::Ident(name) => return write!(f, "identifier `{name}`"),
            Token::Number(n) => return write!(f, "number `{n}`"),
            Token::Str(s) => return write!(f, "string {s:?}"),
        };
        f.write_str(s)
    }
}

/// A token with its byte range in the tokenized text.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub start: usize,
    pub end: usize,
}

const SYMBOLS: &[(&str, Token)] = &[
    ("&&", Token::AndAnd),
    ("||", Token::OrOr),
    ("==", Token::EqEq),
    ("!=", Token::NotEq),
    ("<=", Token::LtEq),
    (">=", Token::GtEq),
    ("+=", Token::PlusAssign),
    ("-=", Token::MinusAssign),
    ("*=", Token::StarAssign),
    ("/=", Token::SlashAssign),
    ("++", Token::PlusPlus),
    ("--", Token::MinusMinus),
    ("(", Token::LParen),
    (")", Token::RParen),
    ("{", Token::LBrace),
    ("}", Token::RBrace),
    ("[", Token::LBracket),
    ("]", Token::RBracket),
    (".", Token::Dot),
    (";", Token::Semi),
    ("?", Token::Question),
    (":", Token::Colon),
    ("=", Token::Assign),
    ("+", Token::Plus),
    ("-", Token::Minus),
    ("*", Token::Star),
    ("/", Token::Slash),
    ("%", Token::Percent),
    ("!", Token::Bang),
    ("<", Token::Lt),
    (">", Token::Gt),
];

#[derive(Clone)]
pub struct Tokenizer<'a> {
    input: &'a str,
    cursor: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, cursor: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.cursor..]
    }

    fn advance(&mut self, n: usize) {
        self.cursor += n;
    }

    /// Produces the next token, `Ok(None)` at end of input or at a `//` comment.
    pub fn next_token(&mut self) -> Result<Option<Spanned>, ParseErrorKind> {
        let rest = self.remaining();
        let trimmed = rest.trim_start();
        self.advance(rest.len() - trimmed.len());

        let rest = self.remaining();
        let Some(first) = rest.chars().next() else {
            return Ok(None);
        };
        if rest.starts_with("//") {
            self.cursor = self.input.len();
            return Ok(None);
        }

        let start = self.cursor;
        let token = if first == '"' || first == '\'' {
            self.string(first)?
        } else if first.is_ascii_digit() {
            self.number()?
        } else if first.is_ascii_alphabetic() || first == '_' {
            self.word()
        } else if let Some((sym, token)) = SYMBOLS.iter().find(|(sym, _)| rest.starts_with(sym)) {
            self.advance(sym.len());
            token.clone()
        } else {
            return Err(ParseErrorKind::UnexpectedChar(first));
        };

        Ok(Some(Spanned {
            token,
            start,
            end: self.cursor,
        }))
    }

    fn string(&mut self, quote: char) -> Result<Token, ParseErrorKind> {
        let mut s = String::new();
        let mut chars = self.remaining().char_indices().skip(1);
        while let Some((idx, c)) = chars.next() {
            if c == quote {
                self.advance(idx + c.len_utf8());
                return Ok(Token::Str(s));
            }
            if c == '\\' {
                match chars.next() {
                    Some((_, 'n')) => s.push('\n'),
                    Some((_, 't')) => s.push('\t'),
                    Some((_, 'r')) => s.push('\r'),
                    Some((_, esc)) => s.push(esc),
                    None => break,
                }
            } else {
                s.push(c);
            }
        }
        Err(ParseErrorKind::UnterminatedString)
    }

    fn number(&mut self) -> Result<Token, ParseErrorKind> {
        let rest = self.remaining();
        let bytes = rest.as_bytes();
        let mut len = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
        // A fraction needs a digit after the dot; `items.0` style access is not a number.
        if bytes.get(len) == Some(&b'.') && bytes.get(len + 1).is_some_and(u8::is_ascii_digit) {
            len += 1;
            len += bytes[len..].iter().take_while(|b| b.is_ascii_digit()).count();
        }
        let text = &rest[..len];
        if bytes.get(len).is_some_and(|b| b.is_ascii_alphabetic() || *b == b'_') {
            let bad: String = rest
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.')
                .collect();
            return Err(ParseErrorKind::InvalidNumber(bad));
        }
        let value = text
            .parse::<f64>()
            .map_err(|_| ParseErrorKind::InvalidNumber(text.to_string()))?;
        self.advance(len);
        Ok(Token::Number(value))
    }

    fn word(&mut self) -> Token {
        let word: &str = {
            let rest = self.remaining();
            let len = rest
                .bytes()
                .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
                .count();
            &rest[..len]
        };
        self.advance(word.len());

        match word {
            "var" => Token::Var,
            "if" => Token::If,
            "else" => Token::Else,
            "for" => Token::For,
            "foreach" => Token::Foreach,
            "while" => Token::While,
            "in" => Token::In,
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            _ => Token::Ident(word.to_string()),
        }
    }
}

/// Tokenizes a whole line (or inline expression body).
pub fn tokenize(input: &str) -> Result<Vec<Spanned>, ParseErrorKind> {
    let mut tokenizer = Tokenizer::new(input);
    let mut tokens = Vec::new();
    while let Some(token) = tokenizer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input)
            .expect("tokenize")
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("foreach (var item in Model.Items)"),
            vec![
                Token::Foreach,
                Token::LParen,
                Token::Var,
                Token::Ident("item".into()),
                Token::In,
                Token::Ident("Model".into()),
                Token::Dot,
                Token::Ident("Items".into()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn longest_operator_wins() {
        assert_eq!(
            kinds("a <= b && c != d; i++"),
            vec![
                Token::Ident("a".into()),
                Token::LtEq,
                Token::Ident("b".into()),
                Token::AndAnd,
                Token::Ident("c".into()),
                Token::NotEq,
                Token::Ident("d".into()),
                Token::Semi,
                Token::Ident("i".into()),
                Token::PlusPlus,
            ]
        );
    }

    #[test]
    fn numbers_and_strings() {
        assert_eq!(
            kinds(r#"1.5 + 'it\'s' + "a\"b""#),
            vec![
                Token::Number(1.5),
                Token::Plus,
                Token::Str("it's".into()),
                Token::Plus,
                Token::Str("a\"b".into()),
            ]
        );
    }

    #[test]
    fn braces_inside_strings_are_not_tokens() {
        assert_eq!(kinds(r#""}{""#), vec![Token::Str("}{".into())]);
    }

    #[test]
    fn comment_ends_line() {
        assert_eq!(kinds("x = 1; // note {"), kinds("x = 1;"));
    }

    #[test]
    fn spans_cover_source_text() {
        let tokens = tokenize("  total  }").unwrap();
        assert_eq!((tokens[0].start, tokens[0].end), (2, 7));
        assert_eq!((tokens[1].start, tokens[1].end), (9, 10));
    }

    #[test]
    fn errors() {
        assert_eq!(tokenize("\"open"), Err(ParseErrorKind::UnterminatedString));
        assert_eq!(tokenize("a # b"), Err(ParseErrorKind::UnexpectedChar('#')));
        assert_eq!(
            tokenize("12abc"),
            Err(ParseErrorKind::InvalidNumber("12abc".into()))
        );
    }
}

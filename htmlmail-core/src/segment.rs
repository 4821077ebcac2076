//! Line segmentation: splits template source into text lines and code-block
//! lines.
//!
//! A line whose trimmed content starts with `@{` opens a code block. Braces
//! in the block's code lines are counted and the block closes at the `}` that
//! balances the opener, usually a lone `}` line. Inside a block, lines that do
//! not start a statement are template text and are emitted where they appear.

use crate::error::{ParseErrorKind, Result, TemplateError};
use crate::fragment::{parse_fragments, Fragment};
use crate::lexer::{tokenize, Spanned, Token, Tokenizer};

/// Line terminator used when joining rendered lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Newline {
    #[default]
    Lf,
    CrLf,
}

impl Newline {
    pub fn detect(source: &str) -> Self {
        if source.contains("\r\n") {
            Newline::CrLf
        } else {
            Newline::Lf
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Newline::Lf => "\n",
            Newline::CrLf => "\r\n",
        }
    }
}

/// A template line rendered as output text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    /// 1-based source line.
    pub number: usize,
    pub fragments: Vec<Fragment>,
    /// The code block this line is interleaved with, if any.
    pub block: Option<usize>,
}

/// Raw statement text belonging to an open code block.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeLine {
    pub number: usize,
    pub text: String,
    pub block: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Text(TextLine),
    Code(CodeLine),
}

impl Line {
    pub fn number(&self) -> usize {
        match self {
            Line::Text(t) => t.number,
            Line::Code(c) => c.number,
        }
    }

    pub fn block(&self) -> Option<usize> {
        match self {
            Line::Text(t) => t.block,
            Line::Code(c) => Some(c.block),
        }
    }
}

/// Segmented template source.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub lines: Vec<Line>,
    /// Number of source lines, used to tell the final line apart.
    pub line_count: usize,
    pub newline: Newline,
}

enum Scan {
    /// Still inside the block. `continues` is set when the line ends
    /// mid-expression; `pending` when its last statement lacks a terminator.
    Open {
        depth: usize,
        continues: bool,
        pending: bool,
    },
    Closed { at: usize },
}

/// Walks the tokens of `text`, starting at brace depth `depth`, and reports
/// where the depth first returns to zero.
fn scan_braces(text: &str, mut depth: usize) -> std::result::Result<Scan, ParseErrorKind> {
    let mut tokenizer = Tokenizer::new(text);
    let mut last = None;
    while let Some(spanned) = tokenizer.next_token()? {
        match spanned.token {
            Token::LBrace => depth += 1,
            Token::RBrace => {
                depth -= 1;
                if depth == 0 {
                    return Ok(Scan::Closed { at: spanned.start });
                }
            }
            _ => {}
        }
        last = Some(spanned.token);
    }
    Ok(Scan::Open {
        depth,
        continues: last.as_ref().is_some_and(Token::expects_more),
        pending: last.is_some_and(|t| {
            !matches!(
                t,
                Token::Semi | Token::LBrace | Token::RBrace | Token::RParen | Token::Else
            )
        }),
    })
}

/// Whether a code-block line starts a statement rather than template text.
pub(crate) fn is_statement(text: &str) -> bool {
    let trimmed = text.trim_start();
    if trimmed.starts_with("//") {
        return true;
    }
    // Only the leading tokens matter; a close brace may be followed by text
    // that does not tokenize.
    let mut tokenizer = Tokenizer::new(trimmed);
    let first = match tokenizer.next_token() {
        Ok(Some(spanned)) => spanned.token,
        _ => return false,
    };
    if first.starts_statement() {
        return true;
    }
    match (first, tokenizer.next_token()) {
        (Token::Ident(_), Ok(Some(second))) => second.token.is_assignment(),
        _ => false,
    }
}

/// Whether `text` opens with an operator that only makes sense as the
/// continuation of an unterminated statement.
fn leads_with_operator(text: &str) -> bool {
    matches!(
        Tokenizer::new(text).next_token(),
        Ok(Some(spanned)) if spanned.token.continues_expression()
    )
}

/// A line led by `if`, `for`, `foreach`, or `while` that cannot start that
/// statement is almost always template text missing its `@:` marker.
fn keyword_text(text: &str) -> Option<ParseErrorKind> {
    let mut tokenizer = Tokenizer::new(text);
    let Ok(Some(first)) = tokenizer.next_token() else {
        return None;
    };
    if !matches!(
        first.token,
        Token::If | Token::For | Token::Foreach | Token::While
    ) {
        return None;
    }
    let cause = match tokenizer.next_token() {
        Ok(None) => return None,
        Ok(Some(Spanned {
            token: Token::LParen,
            ..
        })) => tokenize(text).err()?,
        Ok(Some(other)) => ParseErrorKind::UnexpectedToken {
            expected: Token::LParen.to_string(),
            found: other.token.to_string(),
        },
        Err(kind) => kind,
    };
    Some(ParseErrorKind::TextInCodeBlock {
        text: text.trim().to_string(),
        cause: Box::new(cause),
    })
}

enum Mode {
    Text,
    Code {
        depth: usize,
        opened_at: usize,
        block: usize,
        continued: bool,
        pending: bool,
    },
}

struct Segmenter {
    lines: Vec<Line>,
    mode: Mode,
    blocks: usize,
}

impl Segmenter {
    fn text(&mut self, number: usize, content: &str, block: Option<usize>) -> Result<()> {
        let fragments =
            parse_fragments(content).map_err(|kind| TemplateError::parse(number, kind))?;
        self.lines.push(Line::Text(TextLine {
            number,
            fragments,
            block,
        }));
        Ok(())
    }

    fn code(&mut self, number: usize, text: &str, block: usize) {
        if !text.trim().is_empty() {
            self.lines.push(Line::Code(CodeLine {
                number,
                text: text.to_string(),
                block,
            }));
        }
    }

    fn next_block(&mut self) -> usize {
        self.blocks += 1;
        self.blocks - 1
    }

    fn line(&mut self, number: usize, line: &str) -> Result<()> {
        let trimmed = line.trim();
        match self.mode {
            Mode::Text if trimmed.starts_with("@{") => {
                let marker = line.len() - line.trim_start().len();
                let rest = &line[marker + 2..];
                let scan = scan_braces(rest, 1).map_err(|kind| TemplateError::parse(number, kind))?;
                match scan {
                    Scan::Closed { at } => {
                        // `@{ expr }` on a line of its own is an inline expression.
                        if !is_statement(&rest[..at]) {
                            return self.text(number, line, None);
                        }
                        trailing(number, &rest[at + 1..])?;
                        let block = self.next_block();
                        self.code(number, &rest[..at], block);
                    }
                    Scan::Open {
                        depth,
                        continues,
                        pending,
                    } => {
                        let block = self.next_block();
                        self.code(number, rest, block);
                        self.mode = Mode::Code {
                            depth,
                            opened_at: number,
                            block,
                            continued: continues,
                            pending,
                        };
                    }
                }
                Ok(())
            }
            Mode::Text => self.text(number, line, None),
            Mode::Code {
                depth,
                opened_at,
                block,
                continued,
                pending,
            } => {
                if trimmed.is_empty() {
                    return Ok(());
                }
                if !continued && !(pending && leads_with_operator(trimmed)) {
                    if let Some(pos) =
                        line.find("@:").filter(|pos| line[..*pos].trim().is_empty())
                    {
                        return self.text(number, &line[pos + 2..], Some(block));
                    }
                    if !is_statement(trimmed) {
                        return self.text(number, line, Some(block));
                    }
                    if let Some(kind) = keyword_text(trimmed) {
                        return Err(TemplateError::parse(number, kind));
                    }
                }
                let scan =
                    scan_braces(line, depth).map_err(|kind| TemplateError::parse(number, kind))?;
                match scan {
                    Scan::Closed { at } => {
                        trailing(number, &line[at + 1..])?;
                        self.code(number, &line[..at], block);
                        self.mode = Mode::Text;
                    }
                    Scan::Open {
                        depth,
                        continues,
                        pending,
                    } => {
                        self.code(number, line, block);
                        self.mode = Mode::Code {
                            depth,
                            opened_at,
                            block,
                            continued: continues,
                            pending,
                        };
                    }
                }
                Ok(())
            }
        }
    }
}

fn trailing(number: usize, after: &str) -> Result<()> {
    let after = after.trim();
    if after.is_empty() || tokenize(after).is_ok_and(|t| t.is_empty()) {
        Ok(())
    } else {
        Err(TemplateError::parse(
            number,
            ParseErrorKind::TrailingContent(after.to_string()),
        ))
    }
}

/// Segments raw template text into lines.
pub fn segment(source: &str) -> Result<Template> {
    let mut segmenter = Segmenter {
        lines: Vec::new(),
        mode: Mode::Text,
        blocks: 0,
    };

    let mut line_count = 0;
    for (idx, raw) in source.split('\n').enumerate() {
        line_count = idx + 1;
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        segmenter.line(line_count, line)?;
    }

    if let Mode::Code { opened_at, .. } = segmenter.mode {
        return Err(TemplateError::parse(
            opened_at,
            ParseErrorKind::UnterminatedBlock { opened_at },
        ));
    }

    Ok(Template {
        lines: segmenter.lines,
        line_count,
        newline: Newline::detect(source),
    })
}

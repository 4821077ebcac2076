//! Recursive-descent parser for code blocks and inline expressions.
//!
//! A code block is parsed from a stream of [`Unit`]s: tokens from its code
//! lines plus the already-lowered text lines interleaved with them. A text
//! unit may appear anywhere a statement may.

use crate::ast::{AssignOp, BinOp, Expr, UnaryOp};
use crate::error::{ParseErrorKind, Result, TemplateError};
use crate::fragment::PropertyPath;
use crate::ir::{Instruction, InstructionKind};
use crate::lexer::{tokenize, Token};

#[derive(Debug, Clone, PartialEq)]
pub enum Unit {
    Token {
        token: Token,
        line: usize,
    },
    Text {
        line: usize,
        instructions: Vec<Instruction>,
    },
}

impl Unit {
    /// Tokenizes one code line.
    pub fn tokens(text: &str, line: usize) -> Result<Vec<Unit>> {
        let tokens = tokenize(text).map_err(|kind| TemplateError::parse(line, kind))?;
        Ok(tokens
            .into_iter()
            .map(|spanned| Unit::Token {
                token: spanned.token,
                line,
            })
            .collect())
    }

    fn line(&self) -> usize {
        match self {
            Unit::Token { line, .. } | Unit::Text { line, .. } => *line,
        }
    }
}

/// Parses the body of an inline `@{ … }` expression.
pub fn parse_expression(text: &str, line: usize) -> Result<Expr> {
    let mut parser = Parser::new(Unit::tokens(text, line)?, line);
    let expr = parser.expr()?;
    if parser.peek(0).is_some() {
        return Err(parser.unexpected("end of expression"));
    }
    Ok(expr)
}

pub struct Parser {
    units: Vec<Unit>,
    pos: usize,
    end_line: usize,
}

impl Parser {
    pub fn new(units: Vec<Unit>, end_line: usize) -> Self {
        Self {
            units,
            pos: 0,
            end_line,
        }
    }

    fn peek(&self, n: usize) -> Option<&Unit> {
        self.units.get(self.pos + n)
    }

    fn peek_token(&self, n: usize) -> Option<&Token> {
        match self.peek(n) {
            Some(Unit::Token { token, .. }) => Some(token),
            _ => None,
        }
    }

    fn line(&self) -> usize {
        self.peek(0).map_or(self.end_line, Unit::line)
    }

    fn consume(&mut self) -> Option<Unit> {
        let unit = self.units.get(self.pos).cloned();
        if unit.is_some() {
            self.pos += 1;
        }
        unit
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek_token(0) == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    fn unexpected(&self, expected: &str) -> TemplateError {
        let expected = expected.to_string();
        let kind = match self.peek(0) {
            Some(Unit::Token { token, .. }) => ParseErrorKind::UnexpectedToken {
                expected,
                found: token.to_string(),
            },
            Some(Unit::Text { .. }) => ParseErrorKind::UnexpectedText { expected },
            None => ParseErrorKind::UnexpectedEnd { expected },
        };
        TemplateError::parse(self.line(), kind)
    }

    fn ident(&mut self, what: &str) -> Result<String> {
        match self.peek_token(0) {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    /// Parses a whole code block.
    pub fn parse_block(mut self) -> Result<Vec<Instruction>> {
        self.statements(false)
    }

    fn statements(&mut self, braced: bool) -> Result<Vec<Instruction>> {
        let mut out = Vec::new();
        loop {
            match self.peek(0) {
                None if braced => return Err(self.unexpected("`}`")),
                None => break,
                Some(Unit::Token {
                    token: Token::RBrace,
                    ..
                }) if braced => {
                    self.pos += 1;
                    break;
                }
                _ => out.extend(self.statement()?),
            }
        }
        Ok(out)
    }

    fn statement(&mut self) -> Result<Vec<Instruction>> {
        let line = self.line();
        let token = match self.peek(0) {
            Some(Unit::Text { .. }) => {
                return match self.consume() {
                    Some(Unit::Text { instructions, .. }) => Ok(instructions),
                    _ => Ok(Vec::new()),
                };
            }
            Some(Unit::Token { token, .. }) => token.clone(),
            None => return Err(self.unexpected("a statement")),
        };

        let kind = match token {
            Token::Semi => {
                self.pos += 1;
                return Ok(Vec::new());
            }
            Token::LBrace => {
                self.pos += 1;
                InstructionKind::Scope(self.statements(true)?)
            }
            Token::Var => {
                let decl = self.declaration()?;
                self.expect(Token::Semi)?;
                return Ok(vec![decl]);
            }
            Token::Ident(_) => {
                let assign = self.assignment()?;
                self.expect(Token::Semi)?;
                return Ok(vec![assign]);
            }
            Token::If => self.if_statement()?,
            Token::For => self.for_statement()?,
            Token::Foreach => self.foreach_statement()?,
            Token::While => {
                self.pos += 1;
                let condition = self.condition()?;
                let body = self.body()?;
                InstructionKind::While { condition, body }
            }
            _ => return Err(self.unexpected("a statement")),
        };
        Ok(vec![Instruction::new(line, kind)])
    }

    /// A braced block or a single statement.
    fn body(&mut self) -> Result<Vec<Instruction>> {
        if self.eat(&Token::LBrace) {
            self.statements(true)
        } else {
            self.statement()
        }
    }

    fn condition(&mut self) -> Result<Expr> {
        self.expect(Token::LParen)?;
        let expr = self.expr()?;
        self.expect(Token::RParen)?;
        Ok(expr)
    }

    fn declaration(&mut self) -> Result<Instruction> {
        let line = self.line();
        self.expect(Token::Var)?;
        let name = self.ident("a variable name")?;
        let value = if self.eat(&Token::Assign) {
            Some(self.expr()?)
        } else {
            None
        };
        Ok(Instruction::new(line, InstructionKind::Declare { name, value }))
    }

    fn assignment(&mut self) -> Result<Instruction> {
        let line = self.line();
        let name = self.ident("a variable name")?;
        let op = match self.peek_token(0) {
            Some(Token::Assign) => AssignOp::Set,
            Some(Token::PlusAssign) => AssignOp::Add,
            Some(Token::MinusAssign) => AssignOp::Sub,
            Some(Token::StarAssign) => AssignOp::Mul,
            Some(Token::SlashAssign) => AssignOp::Div,
            Some(Token::PlusPlus | Token::MinusMinus) => {
                let op = if self.peek_token(0) == Some(&Token::PlusPlus) {
                    AssignOp::Add
                } else {
                    AssignOp::Sub
                };
                self.pos += 1;
                return Ok(Instruction::new(
                    line,
                    InstructionKind::Assign {
                        name,
                        op,
                        value: Expr::Number(1.0),
                    },
                ));
            }
            _ => return Err(self.unexpected("an assignment operator")),
        };
        self.pos += 1;
        let value = self.expr()?;
        Ok(Instruction::new(line, InstructionKind::Assign { name, op, value }))
    }

    fn if_statement(&mut self) -> Result<InstructionKind> {
        self.expect(Token::If)?;
        let mut branches = vec![(self.condition()?, self.body()?)];
        let mut otherwise = None;

        while self.eat(&Token::Else) {
            if self.eat(&Token::If) {
                branches.push((self.condition()?, self.body()?));
            } else {
                otherwise = Some(self.body()?);
                break;
            }
        }
        Ok(InstructionKind::If {
            branches,
            otherwise,
        })
    }

    fn for_statement(&mut self) -> Result<InstructionKind> {
        self.expect(Token::For)?;
        self.expect(Token::LParen)?;

        let init = match self.peek_token(0) {
            Some(Token::Semi) => None,
            Some(Token::Var) => Some(Box::new(self.declaration()?)),
            _ => Some(Box::new(self.assignment()?)),
        };
        self.expect(Token::Semi)?;

        let condition = match self.peek_token(0) {
            Some(Token::Semi) => None,
            _ => Some(self.expr()?),
        };
        self.expect(Token::Semi)?;

        let step = match self.peek_token(0) {
            Some(Token::RParen) => None,
            _ => Some(Box::new(self.assignment()?)),
        };
        self.expect(Token::RParen)?;

        let body = self.body()?;
        Ok(InstructionKind::For {
            init,
            condition,
            step,
            body,
        })
    }

    fn foreach_statement(&mut self) -> Result<InstructionKind> {
        self.expect(Token::Foreach)?;
        self.expect(Token::LParen)?;
        self.eat(&Token::Var);
        let binding = self.ident("a loop variable")?;
        self.expect(Token::In)?;
        let iterable = self.expr()?;
        self.expect(Token::RParen)?;
        let body = self.body()?;
        Ok(InstructionKind::Foreach {
            binding,
            iterable,
            body,
        })
    }

    // -----------------------------------------------------------------------
    // Expressions, lowest precedence first
    // -----------------------------------------------------------------------

    pub fn expr(&mut self) -> Result<Expr> {
        let test = self.or()?;
        if !self.eat(&Token::Question) {
            return Ok(test);
        }
        let then = self.expr()?;
        self.expect(Token::Colon)?;
        let otherwise = self.expr()?;
        Ok(Expr::Conditional(
            Box::new(test),
            Box::new(then),
            Box::new(otherwise),
        ))
    }

    fn binary_level(
        &mut self,
        ops: &[(Token, BinOp)],
        next: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut lhs = next(self)?;
        'outer: loop {
            for (token, op) in ops {
                if self.eat(token) {
                    let rhs = next(self)?;
                    lhs = Expr::Binary(Box::new(lhs), *op, Box::new(rhs));
                    continue 'outer;
                }
            }
            return Ok(lhs);
        }
    }

    fn or(&mut self) -> Result<Expr> {
        self.binary_level(&[(Token::OrOr, BinOp::Or)], Self::and)
    }

    fn and(&mut self) -> Result<Expr> {
        self.binary_level(&[(Token::AndAnd, BinOp::And)], Self::equality)
    }

    fn equality(&mut self) -> Result<Expr> {
        self.binary_level(
            &[(Token::EqEq, BinOp::Eq), (Token::NotEq, BinOp::NotEq)],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                (Token::LtEq, BinOp::LtEq),
                (Token::GtEq, BinOp::GtEq),
                (Token::Lt, BinOp::Lt),
                (Token::Gt, BinOp::Gt),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Expr> {
        self.binary_level(
            &[(Token::Plus, BinOp::Add), (Token::Minus, BinOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                (Token::Star, BinOp::Mul),
                (Token::Slash, BinOp::Div),
                (Token::Percent, BinOp::Rem),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat(&Token::Bang) {
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.unary()?)));
        }
        if self.eat(&Token::Minus) {
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.unary()?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let name = self.ident("a member name")?;
                expr = match expr {
                    Expr::Path(mut path) => {
                        path.0.push(name);
                        Expr::Path(path)
                    }
                    other => Expr::Member(Box::new(other), name),
                };
            } else if self.eat(&Token::LBracket) {
                let index = self.expr()?;
                self.expect(Token::RBracket)?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        let Some(token) = self.peek_token(0).cloned() else {
            return Err(self.unexpected("an expression"));
        };
        let expr = match token {
            Token::Number(n) => Expr::Number(n),
            Token::Str(s) => Expr::Str(s),
            Token::True => Expr::Bool(true),
            Token::False => Expr::Bool(false),
            Token::Null => Expr::Null,
            Token::Ident(name) => Expr::Path(PropertyPath(vec![name])),
            Token::LParen => {
                self.pos += 1;
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                return Ok(inner);
            }
            _ => return Err(self.unexpected("an expression")),
        };
        self.pos += 1;
        Ok(expr)
    }
}

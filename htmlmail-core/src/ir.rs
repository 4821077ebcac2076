//! The executable intermediate form and the builder that produces it from a
//! segmented [`Template`].
//!
//! Text lines lower to one instruction per fragment followed by
//! [`InstructionKind::EmitNewline`] unless the line is the last line of the
//! template. Each code block's lines, together with the text lines
//! interleaved with them, are parsed as one statement list, so text inside
//! an `if` body becomes part of that body.

use crate::ast::{AssignOp, Expr};
use crate::error::Result;
use crate::fragment::Fragment;
use crate::parser::{parse_expression, Parser, Unit};
use crate::segment::{Line, Newline, Template, TextLine};

/// One executable step together with the source line it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub line: usize,
    pub kind: InstructionKind,
}

impl Instruction {
    pub fn new(line: usize, kind: InstructionKind) -> Self {
        Self { line, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstructionKind {
    EmitLiteral(String),
    EmitValue(Expr),
    EmitNewline,
    /// `var name = value;`
    Declare {
        name: String,
        value: Option<Expr>,
    },
    /// `name = value;`, `name += value;`, `name++;`, ...
    Assign {
        name: String,
        op: AssignOp,
        value: Expr,
    },
    If {
        branches: Vec<(Expr, Vec<Instruction>)>,
        otherwise: Option<Vec<Instruction>>,
    },
    For {
        init: Option<Box<Instruction>>,
        condition: Option<Expr>,
        step: Option<Box<Instruction>>,
        body: Vec<Instruction>,
    },
    Foreach {
        binding: String,
        iterable: Expr,
        body: Vec<Instruction>,
    },
    While {
        condition: Expr,
        body: Vec<Instruction>,
    },
    /// A bare `{ ... }` block.
    Scope(Vec<Instruction>),
}

/// A compiled template. Immutable; may be evaluated any number of times,
/// from any thread.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    pub newline: Newline,
}

/// Lowers one text line to emit instructions.
pub(crate) fn text_instructions(line: &TextLine, last: bool) -> Result<Vec<Instruction>> {
    let mut out = Vec::with_capacity(line.fragments.len() + 1);
    for fragment in &line.fragments {
        let kind = match fragment {
            Fragment::Literal(text) => InstructionKind::EmitLiteral(text.clone()),
            Fragment::PropertyRef(path) => InstructionKind::EmitValue(Expr::Path(path.clone())),
            Fragment::InlineExpr(text) => {
                InstructionKind::EmitValue(parse_expression(text, line.number)?)
            }
        };
        out.push(Instruction::new(line.number, kind));
    }
    if !last {
        out.push(Instruction::new(line.number, InstructionKind::EmitNewline));
    }
    Ok(out)
}

/// Builds a [`Program`] from segmented lines.
pub fn build(template: &Template) -> Result<Program> {
    let mut instructions = Vec::new();
    let lines = &template.lines;
    let mut i = 0;

    while i < lines.len() {
        let Some(block) = lines[i].block() else {
            if let Line::Text(text) = &lines[i] {
                let last = text.number == template.line_count;
                instructions.extend(text_instructions(text, last)?);
            }
            i += 1;
            continue;
        };

        let mut units = Vec::new();
        let mut end_line = lines[i].number();
        while i < lines.len() && lines[i].block() == Some(block) {
            end_line = lines[i].number();
            match &lines[i] {
                Line::Code(code) => units.extend(Unit::tokens(&code.text, code.number)?),
                Line::Text(text) => {
                    let last = text.number == template.line_count;
                    units.push(Unit::Text {
                        line: text.number,
                        instructions: text_instructions(text, last)?,
                    });
                }
            }
            i += 1;
        }
        instructions.extend(Parser::new(units, end_line).parse_block()?);
    }

    tracing::debug!(instructions = instructions.len(), "built template program");
    Ok(Program {
        instructions,
        newline: template.newline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinOp;
    use crate::segment::segment;

    fn compile(source: &str) -> Program {
        build(&segment(source).expect("segment")).expect("build")
    }

    fn kinds(instructions: &[Instruction]) -> Vec<&InstructionKind> {
        instructions.iter().map(|i| &i.kind).collect()
    }

    #[test]
    fn newline_only_between_lines() {
        let program = compile("a\nb");
        assert_eq!(
            kinds(&program.instructions),
            vec![
                &InstructionKind::EmitLiteral("a".into()),
                &InstructionKind::EmitNewline,
                &InstructionKind::EmitLiteral("b".into()),
            ]
        );
    }

    #[test]
    fn property_ref_and_inline_expr_lower_to_emit_value() {
        let program = compile("@name @{ n + 1 }");
        assert_eq!(
            kinds(&program.instructions),
            vec![
                &InstructionKind::EmitValue(Expr::path(["name"])),
                &InstructionKind::EmitLiteral(" ".into()),
                &InstructionKind::EmitValue(Expr::Binary(
                    Box::new(Expr::path(["n"])),
                    BinOp::Add,
                    Box::new(Expr::Number(1.0)),
                )),
            ]
        );
    }

    #[test]
    fn text_inside_if_is_nested() {
        let program = compile("@{ if (count > 0) {\nYou have @count items.\n} else {\nNo items.\n} }");
        assert_eq!(program.instructions.len(), 1);
        let InstructionKind::If { branches, otherwise } = &program.instructions[0].kind else {
            panic!("expected if, got {:?}", program.instructions[0]);
        };
        assert_eq!(branches.len(), 1);
        assert_eq!(
            kinds(&branches[0].1),
            vec![
                &InstructionKind::EmitLiteral("You have ".into()),
                &InstructionKind::EmitValue(Expr::path(["count"])),
                &InstructionKind::EmitLiteral(" items.".into()),
                &InstructionKind::EmitNewline,
            ]
        );
        let otherwise = otherwise.as_ref().expect("else branch");
        assert_eq!(otherwise[0].line, 4);
    }

    #[test]
    fn newline_convention_follows_source() {
        assert_eq!(compile("first\r\nsecond").newline, Newline::CrLf);
        assert_eq!(compile("first\nsecond").newline, Newline::Lf);
    }
}

//! Program evaluator.
//!
//! Instructions run strictly in source order and append to a single output
//! buffer. Values printed by the template resolve their paths as required;
//! conditions resolve them as optional so a missing member reads as false.

use std::collections::HashMap;
use std::sync::Arc;

use crate::accessor::{self, Resolution};
use crate::ast::{BinOp, Expr, UnaryOp};
use crate::error::{Result, TemplateError};
use crate::ir::{Instruction, InstructionKind, Program};
use crate::value::Value;

/// Name the model is bound to in every template.
pub const MODEL_BINDING: &str = "Model";

/// Caller-controlled evaluation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Record warnings for suspicious but well-defined operations, such as
    /// division by zero.
    pub strict: bool,
    /// Upper bound on the total number of loop iterations in one render.
    /// `None` means unbounded.
    pub max_iterations: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub line: usize,
    pub message: String,
}

/// Output of a successful render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub warnings: Vec<Warning>,
}

/// Variable bindings for one render.
///
/// The bottom scope holds only the model binding and is never written. The
/// scope above it holds top-level declarations, which stay visible across
/// code blocks.
pub struct Environment {
    model: Value,
    scopes: Vec<HashMap<String, Value>>,
}

impl Environment {
    pub fn new(model: Value) -> Self {
        let globals = HashMap::from([(MODEL_BINDING.to_string(), model.clone())]);
        Self {
            model,
            scopes: vec![globals, HashMap::new()],
        }
    }

    /// Locals (innermost first), then the model binding, then the model's
    /// own members.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        for scope in self.scopes.iter().rev() {
            if let Some(val) = scope.get(name) {
                return Some(val.clone());
            }
        }
        accessor::member(&self.model, name)
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        if self.scopes.len() > 2 {
            self.scopes.pop();
        }
    }

    fn declare(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if name == MODEL_BINDING {
            return Err(TemplateError::evaluation(
                line,
                format!("`{MODEL_BINDING}` is reserved"),
            ));
        }
        let scope = self.scopes.last_mut().ok_or_else(|| {
            TemplateError::evaluation(line, "no scope to declare a variable in")
        })?;
        if scope.contains_key(name) {
            return Err(TemplateError::evaluation(
                line,
                format!("variable `{name}` is already declared in this scope"),
            ));
        }
        scope.insert(name.to_string(), value);
        Ok(())
    }

    fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        for scope in self.scopes[1..].iter_mut().rev() {
            if let Some(slot) = scope.get_mut(name) {
                *slot = value;
                return Ok(());
            }
        }
        let message = if name == MODEL_BINDING || accessor::member(&self.model, name).is_some() {
            format!("cannot assign to model member `{name}`")
        } else {
            format!("assignment to undeclared variable `{name}`")
        };
        Err(TemplateError::evaluation(line, message))
    }
}

struct Evaluator<'o> {
    env: Environment,
    options: &'o RenderOptions,
    out: String,
    warnings: Vec<Warning>,
    iterations: u64,
    newline: &'static str,
}

impl Program {
    /// Renders against a model with default options.
    pub fn render(&self, model: Value) -> Result<String> {
        self.render_with(model, &RenderOptions::default())
            .map(|rendered| rendered.text)
    }

    /// Renders against a model, returning output and any warnings.
    pub fn render_with(&self, model: Value, options: &RenderOptions) -> Result<Rendered> {
        let mut evaluator = Evaluator {
            env: Environment::new(model),
            options,
            out: String::new(),
            warnings: Vec::new(),
            iterations: 0,
            newline: self.newline.as_str(),
        };
        evaluator.run(&self.instructions)?;
        tracing::debug!(
            bytes = evaluator.out.len(),
            warnings = evaluator.warnings.len(),
            "rendered template"
        );
        Ok(Rendered {
            text: evaluator.out,
            warnings: evaluator.warnings,
        })
    }
}

impl Evaluator<'_> {
    fn run(&mut self, instructions: &[Instruction]) -> Result<()> {
        for instruction in instructions {
            self.exec(instruction)?;
        }
        Ok(())
    }

    fn run_scoped(&mut self, instructions: &[Instruction]) -> Result<()> {
        self.env.push_scope();
        let result = self.run(instructions);
        self.env.pop_scope();
        result
    }

    fn tick(&mut self, line: usize) -> Result<()> {
        self.iterations += 1;
        match self.options.max_iterations {
            Some(max) if self.iterations > max => Err(TemplateError::evaluation(
                line,
                format!("loop iteration limit of {max} exceeded"),
            )),
            _ => Ok(()),
        }
    }

    fn warn(&mut self, line: usize, message: String) {
        tracing::warn!(line, "{message}");
        self.warnings.push(Warning { line, message });
    }

    fn condition(&mut self, expr: &Expr, line: usize) -> Result<bool> {
        Ok(self.eval(expr, Resolution::Optional, line)?.is_truthy())
    }

    fn exec(&mut self, instruction: &Instruction) -> Result<()> {
        let line = instruction.line;
        match &instruction.kind {
            InstructionKind::EmitLiteral(text) => self.out.push_str(text),
            InstructionKind::EmitNewline => self.out.push_str(self.newline),
            InstructionKind::EmitValue(expr) => {
                let value = self.eval(expr, Resolution::Required, line)?;
                if matches!(value, Value::List(_) | Value::Object(_)) {
                    return Err(TemplateError::evaluation(
                        line,
                        format!("cannot render a {} as text", value.kind()),
                    ));
                }
                self.out.push_str(&value.to_string());
            }
            InstructionKind::Declare { name, value } => {
                let value = match value {
                    Some(expr) => self.eval(expr, Resolution::Required, line)?,
                    None => Value::Null,
                };
                self.env.declare(name, value, line)?;
            }
            InstructionKind::Assign { name, op, value } => {
                let rhs = self.eval(value, Resolution::Required, line)?;
                let value = match op.binary() {
                    None => rhs,
                    Some(bin) => {
                        let current = self.env.lookup(name).ok_or_else(|| {
                            TemplateError::evaluation(
                                line,
                                format!("assignment to undeclared variable `{name}`"),
                            )
                        })?;
                        self.binary(bin, current, rhs, line)?
                    }
                };
                self.env.assign(name, value, line)?;
            }
            InstructionKind::If {
                branches,
                otherwise,
            } => {
                for (condition, body) in branches {
                    if self.condition(condition, line)? {
                        return self.run_scoped(body);
                    }
                }
                if let Some(body) = otherwise {
                    self.run_scoped(body)?;
                }
            }
            InstructionKind::For {
                init,
                condition,
                step,
                body,
            } => {
                self.env.push_scope();
                let result = self.for_loop(init.as_deref(), condition.as_ref(), step.as_deref(), body, line);
                self.env.pop_scope();
                result?;
            }
            InstructionKind::Foreach {
                binding,
                iterable,
                body,
            } => {
                let items: Arc<[Value]> = match self.eval(iterable, Resolution::Required, line)? {
                    Value::List(items) => items,
                    other => match other.elements() {
                        Some(items) => items.into(),
                        None => {
                            return Err(TemplateError::evaluation(
                                line,
                                format!("cannot iterate over a {}", other.kind()),
                            ))
                        }
                    },
                };
                for item in items.iter() {
                    self.tick(line)?;
                    self.env.push_scope();
                    let result = self
                        .env
                        .declare(binding, item.clone(), line)
                        .and_then(|()| self.run(body));
                    self.env.pop_scope();
                    result?;
                }
            }
            InstructionKind::While { condition, body } => {
                while self.condition(condition, line)? {
                    self.tick(line)?;
                    self.run_scoped(body)?;
                }
            }
            InstructionKind::Scope(body) => self.run_scoped(body)?,
        }
        Ok(())
    }

    fn for_loop(
        &mut self,
        init: Option<&Instruction>,
        condition: Option<&Expr>,
        step: Option<&Instruction>,
        body: &[Instruction],
        line: usize,
    ) -> Result<()> {
        if let Some(init) = init {
            self.exec(init)?;
        }
        loop {
            if let Some(condition) = condition {
                if !self.condition(condition, line)? {
                    return Ok(());
                }
            }
            self.tick(line)?;
            self.run_scoped(body)?;
            if let Some(step) = step {
                self.exec(step)?;
            }
        }
    }

    fn eval(&mut self, expr: &Expr, mode: Resolution, line: usize) -> Result<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Path(path) => {
                let segments = path.segments();
                let Some((root, rest)) = segments.split_first() else {
                    return Ok(Value::Absent);
                };
                match self.env.lookup(root) {
                    Some(value) => accessor::resolve(value, &segments[..1], rest, mode, line),
                    None if mode == Resolution::Optional => Ok(Value::Absent),
                    None => Err(TemplateError::PathNotFound {
                        line,
                        path: root.clone(),
                    }),
                }
            }
            Expr::Member(base, name) => {
                let base = self.eval(base, mode, line)?;
                accessor::resolve(base, &[], std::slice::from_ref(name), mode, line)
            }
            Expr::Index(base, index) => {
                let base = self.eval(base, mode, line)?;
                let index = self.eval(index, mode, line)?;
                accessor::index(&base, &index, mode, line)
            }
            Expr::Unary(UnaryOp::Not, operand) => {
                Ok(Value::Bool(!self.eval(operand, mode, line)?.is_truthy()))
            }
            Expr::Unary(UnaryOp::Neg, operand) => match self.eval(operand, mode, line)? {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(TemplateError::type_error(
                    line,
                    format!("cannot negate a {}", other.kind()),
                )),
            },
            Expr::Binary(lhs, BinOp::And, rhs) => {
                if !self.eval(lhs, mode, line)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval(rhs, mode, line)?.is_truthy()))
            }
            Expr::Binary(lhs, BinOp::Or, rhs) => {
                if self.eval(lhs, mode, line)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval(rhs, mode, line)?.is_truthy()))
            }
            Expr::Binary(lhs, op, rhs) => {
                let l = self.eval(lhs, mode, line)?;
                let r = self.eval(rhs, mode, line)?;
                self.binary(*op, l, r, line)
            }
            Expr::Conditional(test, then, otherwise) => {
                if self.eval(test, Resolution::Optional, line)?.is_truthy() {
                    self.eval(then, mode, line)
                } else {
                    self.eval(otherwise, mode, line)
                }
            }
        }
    }

    fn binary(&mut self, op: BinOp, l: Value, r: Value, line: usize) -> Result<Value> {
        let mismatch = |l: &Value, r: &Value| {
            TemplateError::type_error(
                line,
                format!(
                    "operator `{}` cannot be applied to {} and {}",
                    op.symbol(),
                    l.kind(),
                    r.kind()
                ),
            )
        };

        match op {
            BinOp::Add => match (&l, &r) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::List(_) | Value::Object(_), _) | (_, Value::List(_) | Value::Object(_)) => {
                    Err(mismatch(&l, &r))
                }
                (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::Str(format!("{l}{r}"))),
                _ => Err(mismatch(&l, &r)),
            },
            BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => {
                let (Value::Number(a), Value::Number(b)) = (&l, &r) else {
                    return Err(mismatch(&l, &r));
                };
                let (a, b) = (*a, *b);
                if matches!(op, BinOp::Div | BinOp::Rem) && b == 0.0 && self.options.strict {
                    self.warn(line, format!("division by zero (`{a} {} 0`)", op.symbol()));
                }
                Ok(Value::Number(match op {
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                    _ => a % b,
                }))
            }
            BinOp::Eq | BinOp::NotEq => {
                let equal = match (&l, &r) {
                    _ if l.is_nullish() || r.is_nullish() => l.is_nullish() && r.is_nullish(),
                    (Value::Number(_), Value::Number(_))
                    | (Value::Str(_), Value::Str(_))
                    | (Value::Bool(_), Value::Bool(_))
                    | (Value::List(_), Value::List(_))
                    | (Value::Object(_), Value::Object(_)) => l == r,
                    _ => return Err(mismatch(&l, &r)),
                };
                Ok(Value::Bool(equal == (op == BinOp::Eq)))
            }
            BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq => {
                let ordering = match (&l, &r) {
                    (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                    (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                    _ => return Err(mismatch(&l, &r)),
                };
                // NaN compares false with everything.
                let Some(ordering) = ordering else {
                    return Ok(Value::Bool(false));
                };
                Ok(Value::Bool(match op {
                    BinOp::Lt => ordering.is_lt(),
                    BinOp::Gt => ordering.is_gt(),
                    BinOp::LtEq => ordering.is_le(),
                    _ => ordering.is_ge(),
                }))
            }
            BinOp::And | BinOp::Or => Ok(Value::Bool(match op {
                BinOp::And => l.is_truthy() && r.is_truthy(),
                _ => l.is_truthy() || r.is_truthy(),
            })),
        }
    }
}

//! Model accessor: resolves property paths and indexes against values.
//!
//! Resolution is either [`Resolution::Required`], where a missing member is a
//! [`TemplateError::PathNotFound`], or [`Resolution::Optional`], where it
//! yields [`Value::Absent`]. The evaluator picks the mode per use site.

use crate::error::{Result, TemplateError};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Output positions: a missing member is an error.
    Required,
    /// Condition positions: a missing member is absent.
    Optional,
}

/// `Count` and `Length` (any case) on sequences and strings.
fn builtin(base: &Value, name: &str) -> Option<Value> {
    if !name.eq_ignore_ascii_case("count") && !name.eq_ignore_ascii_case("length") {
        return None;
    }
    let len = match base {
        Value::Str(s) => s.chars().count(),
        other => other.element_count()?,
    };
    Some(Value::Number(len as f64))
}

/// Looks up one member; `None` when the value has no such member.
pub fn member(base: &Value, name: &str) -> Option<Value> {
    let found = match base {
        Value::Object(object) => object.member(name),
        _ => None,
    };
    found.or_else(|| builtin(base, name))
}

/// Resolves `segments` one after another starting from `base`.
///
/// `prefix` is the already-resolved part of the path, used to report the
/// full dotted path on failure.
pub fn resolve(
    base: Value,
    prefix: &[String],
    segments: &[String],
    mode: Resolution,
    line: usize,
) -> Result<Value> {
    let mut current = base;
    for (i, name) in segments.iter().enumerate() {
        if matches!(current, Value::Absent) {
            return Ok(Value::Absent);
        }
        current = match member(&current, name) {
            Some(value) => value,
            None if mode == Resolution::Optional => return Ok(Value::Absent),
            None => {
                let path = prefix
                    .iter()
                    .chain(&segments[..=i])
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(".");
                return Err(TemplateError::PathNotFound { line, path });
            }
        };
    }
    Ok(current)
}

/// `base[index]`: list elements by whole-number position, object members by
/// string key.
pub fn index(base: &Value, index: &Value, mode: Resolution, line: usize) -> Result<Value> {
    match (base, index) {
        (Value::Absent, _) if mode == Resolution::Optional => Ok(Value::Absent),
        (Value::Object(_) | Value::List(_), Value::Str(key)) => match member(base, key) {
            Some(value) => Ok(value),
            None if mode == Resolution::Optional => Ok(Value::Absent),
            None => Err(TemplateError::PathNotFound {
                line,
                path: format!("[{key:?}]"),
            }),
        },
        (Value::List(_) | Value::Object(_), Value::Number(n)) => {
            let count = base.element_count().ok_or_else(|| {
                TemplateError::type_error(line, "cannot index an object with a number")
            })?;
            let found = (n.fract() == 0.0 && *n >= 0.0)
                .then(|| base.element(*n as usize))
                .flatten();
            match found {
                Some(value) => Ok(value),
                None if mode == Resolution::Optional => Ok(Value::Absent),
                None => Err(TemplateError::evaluation(
                    line,
                    format!("index {} is out of range for a list of {count}", Value::Number(*n)),
                )),
            }
        }
        _ => Err(TemplateError::type_error(
            line,
            format!("cannot index a {} with a {}", base.kind(), index.kind()),
        )),
    }
}

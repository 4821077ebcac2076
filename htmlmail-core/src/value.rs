//! Runtime values and the introspection capability models expose.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;

/// Named-member access over a model object.
///
/// [`Value::from_serialize`] covers any `serde::Serialize` model; implement
/// this trait directly to expose computed members or avoid the conversion.
pub trait Introspect: fmt::Debug + Send + Sync {
    /// The member called `name`, or `None` when it does not exist.
    fn member(&self, name: &str) -> Option<Value>;

    /// Names of all members, in a stable order.
    fn member_names(&self) -> Vec<String>;

    /// Elements when the object is itself a sequence.
    fn elements(&self) -> Option<Vec<Value>> {
        None
    }

    /// Number of elements. Override together with [`Introspect::element`]
    /// so counting and indexing do not materialize the whole sequence.
    fn element_count(&self) -> Option<usize> {
        self.elements().map(|items| items.len())
    }

    /// The element at `index`; `None` past the end or when not a sequence.
    fn element(&self, index: usize) -> Option<Value> {
        self.elements()?.into_iter().nth(index)
    }
}

#[derive(Clone, Debug)]
pub enum Value {
    Str(String),
    Number(f64),
    Bool(bool),
    Null,
    /// A property path that does not exist; distinct from a present `null`.
    Absent,
    List(Arc<[Value]>),
    Object(Arc<dyn Introspect>),
}

impl Value {
    /// Converts a serializable model into a value tree.
    pub fn from_serialize<T: Serialize + ?Sized>(model: &T) -> Result<Value> {
        Ok(Value::from(serde_json::to_value(model)?))
    }

    pub fn object(object: impl Introspect + 'static) -> Value {
        Value::Object(Arc::new(object))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Object(_) => true,
            Value::Null | Value::Absent => false,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Null | Value::Absent)
    }

    /// Short name of the value's kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
            Value::Absent => "absent",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }

    /// Elements of a sequence value, copied out.
    pub fn elements(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) => Some(items.to_vec()),
            Value::Object(object) => object.elements(),
            _ => None,
        }
    }

    /// Length of a sequence value.
    pub fn element_count(&self) -> Option<usize> {
        match self {
            Value::List(items) => Some(items.len()),
            Value::Object(object) => object.element_count(),
            _ => None,
        }
    }

    /// One element of a sequence value.
    pub fn element(&self, index: usize) -> Option<Value> {
        match self {
            Value::List(items) => items.get(index).cloned(),
            Value::Object(object) => object.element(index),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) | (Value::Absent, Value::Absent) => true,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Integral numbers print without a fraction; magnitudes from 1e21 up use
/// exponent notation.
fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    const EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
    const EXPONENT_FROM: f64 = 1e21;
    if n.fract() == 0.0 && n.abs() <= EXACT {
        write!(f, "{}", n as i64)
    } else if n.is_finite() && n.abs() >= EXPONENT_FROM {
        write!(f, "{n:e}")
    } else {
        write!(f, "{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Number(n) => write_number(f, *n),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null | Value::Absent => Ok(()),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Object(_) => f.write_str("[object]"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items.into())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::object(ModelObject(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            )),
        }
    }
}

/// A model object built from serialized data.
#[derive(Debug, Clone, Default)]
pub struct ModelObject(pub BTreeMap<String, Value>);

impl ModelObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }
}

impl Introspect for ModelObject {
    fn member(&self, name: &str) -> Option<Value> {
        self.0.get(name).cloned()
    }

    fn member_names(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }
}

//! Dynamic values produced by records, virtual nodes and expressions.

use crate::expr::EvalError;
use crate::pad::Pad;
use chrono::NaiveDate;
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Something with attributes that expressions can look into
///
/// Records and virtual index nodes both implement this so that rules such
/// as `item.pub_date` or `this._id` can be evaluated against either.
pub trait Object: Send + Sync + fmt::Debug {
    /// Short type name used in error messages
    fn type_name(&self) -> &'static str;

    /// Stable identity (usually the object's path)
    fn identity(&self) -> String;

    /// Look up an attribute by name
    ///
    /// Missing attributes evaluate to [`Value::Undefined`] rather than
    /// an error; errors are reserved for failures while computing a value.
    fn attr(self: Arc<Self>, name: &str, pad: &dyn Pad) -> Result<Value, EvalError>;

    /// Upcast for downcasting to the concrete type
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A dynamically typed value
#[derive(Clone)]
pub enum Value {
    /// Missing value; the string explains why it is missing
    Undefined(String),
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Date(NaiveDate),
    List(Vec<Value>),
    Object(Arc<dyn Object>),
}

impl Value {
    /// Create an undefined marker with a hint
    pub fn undefined(hint: impl Into<String>) -> Self {
        Value::Undefined(hint.into())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined(_))
    }

    /// Truthiness as templates see it
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined(_) | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Str(s) => !s.is_empty(),
            Value::Date(_) => true,
            Value::List(items) => !items.is_empty(),
            Value::Object(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined(_) => "undefined",
            Value::Null => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::Date(_) => "date",
            Value::List(_) => "list",
            Value::Object(obj) => obj.type_name(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<dyn Object>> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Downcast an object value to a concrete type
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Value::Object(obj) => obj.clone().into_any().downcast::<T>().ok(),
            _ => None,
        }
    }

    /// String form of the value
    ///
    /// Undefined and none render as the empty string.
    pub fn render(&self) -> String {
        match self {
            Value::Undefined(_) | Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Str(s) => s.clone(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::List(items) => items
                .iter()
                .map(Value::render)
                .collect::<Vec<_>>()
                .join(", "),
            Value::Object(obj) => obj.identity(),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined(hint) => write!(f, "Undefined({:?})", hint),
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Date(d) => write!(f, "Date({})", d),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Object(obj) => write!(f, "Object({:?})", obj),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // Undefined markers compare equal regardless of their hint
            (Value::Undefined(_), Value::Undefined(_)) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                Arc::ptr_eq(a, b) || (a.type_name() == b.type_name() && a.identity() == b.identity())
            }
            _ => false,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Undefined(_) | Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(obj) => serializer.serialize_str(&obj.identity()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

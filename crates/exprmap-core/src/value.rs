//! Runtime values produced by evaluating mapping expressions.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::compile::Function;
use crate::errors::{MapError, Result};
use crate::expr::Lambda;
use crate::mapper::{Mapper, MapperRef};
use crate::types::{SequenceKind, Type};

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Arc<str>),
    Object(Arc<Object>),
    Sequence(Sequence),
    Function(Function),
    /// An unevaluated lambda carried as data
    Expression(Lambda),
    Mapper(Mapper),
    MapperRef(MapperRef),
}

/// A record with named fields in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    type_name: Arc<str>,
    fields: IndexMap<Arc<str>, Value>,
}

impl Object {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: Arc::from(type_name),
            fields: IndexMap::new(),
        }
    }

    pub fn with(mut self, field: &str, value: Value) -> Self {
        self.fields.insert(Arc::from(field), value);
        self
    }

    pub fn set(&mut self, field: &str, value: Value) {
        self.fields.insert(Arc::from(field), value);
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_ref(), v))
    }

    pub fn into_value(self) -> Value {
        Value::Object(Arc::new(self))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    kind: SequenceKind,
    items: Arc<Vec<Value>>,
}

impl Sequence {
    pub fn new(kind: SequenceKind, items: Vec<Value>) -> Self {
        Self {
            kind,
            items: Arc::new(items),
        }
    }

    pub fn kind(&self) -> SequenceKind {
        self.kind
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Same items, viewed as a different kind of sequence.
    pub fn with_kind(&self, kind: SequenceKind) -> Self {
        Self {
            kind,
            items: Arc::clone(&self.items),
        }
    }

    /// Maps every item through `mapper`, eagerly.
    pub fn map_with(&self, mapper: &Mapper) -> Result<Sequence> {
        let items = self
            .items
            .iter()
            .map(|item| mapper.map(item))
            .collect::<Result<Vec<_>>>()?;
        Ok(Sequence::new(SequenceKind::Enumerable, items))
    }
}

impl Value {
    pub fn string(value: &str) -> Self {
        Value::String(Arc::from(value))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::Sequence(Sequence::new(SequenceKind::List, items))
    }

    /// The default value of `ty`: zero for value types, null otherwise.
    pub fn default_for(ty: &Type) -> Value {
        match ty {
            Type::Bool => Value::Bool(false),
            Type::Int => Value::Int(0),
            Type::Float => Value::Float(0.0),
            _ => Value::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Sequence(_) => "sequence",
            Value::Function(_) => "function",
            Value::Expression(_) => "expression",
            Value::Mapper(_) => "mapper",
            Value::MapperRef(_) => "mapper reference",
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Value::Sequence(sequence) => Some(sequence),
            _ => None,
        }
    }

    /// Field lookup that fails on null and on missing fields.
    pub fn field(&self, name: &str) -> Result<&Value> {
        match self {
            Value::Object(object) => object.field(name).ok_or_else(|| MapError::MissingField {
                ty: object.type_name().to_string(),
                field: name.to_string(),
            }),
            Value::Null => Err(MapError::NullReference {
                context: name.to_string(),
            }),
            other => Err(MapError::type_mismatch(name, "object", other.type_name())),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Sequence(a), Value::Sequence(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Expression(a), Value::Expression(b)) => a.structurally_eq(b),
            (Value::Mapper(a), Value::Mapper(b)) => a.id() == b.id(),
            (Value::MapperRef(a), Value::MapperRef(b)) => a.id() == b.id(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Object(object) => {
                write!(f, "{} {{", object.type_name())?;
                for (i, (name, value)) in object.fields().enumerate() {
                    write!(f, "{}{}: {}", if i == 0 { " " } else { ", " }, name, value)?;
                }
                write!(f, " }}")
            }
            Value::Sequence(sequence) => {
                write!(f, "[")?;
                for (i, item) in sequence.items().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Function(function) => write!(f, "<fn {}>", function.lambda()),
            Value::Expression(lambda) => write!(f, "{}", lambda),
            Value::Mapper(mapper) => write!(f, "<mapper #{}>", mapper.id()),
            Value::MapperRef(mapper) => write!(f, "<mapper #{}>", mapper.id()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::string(value)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        value.into_value()
    }
}

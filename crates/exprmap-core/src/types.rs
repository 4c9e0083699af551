//! Runtime type descriptors for mapping expressions.
//!
//! Types are plain values compared structurally. Sequence types expose their
//! capabilities so the inlining engine can pick a projection without knowing
//! every concrete collection shape.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceKind {
    /// Lazily enumerated in-memory sequence
    Enumerable,
    /// Materialized list; also enumerable
    List,
    /// Deferred query; enumerable and query-translatable
    Queryable,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub params: Vec<Type>,
    pub ret: Box<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    Int,
    Float,
    String,
    Object(Arc<str>),
    Sequence(SequenceKind, Box<Type>),
    Function(FunctionType),
    /// An unevaluated lambda tree, as handed to a query provider
    Quoted(FunctionType),
    Mapper(Box<Type>, Box<Type>),
}

/// What a value of some type can be treated as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    Enumerable(Type),
    Queryable(Type),
}

impl Type {
    pub fn object(name: &str) -> Self {
        Type::Object(Arc::from(name))
    }

    pub fn enumerable(element: Type) -> Self {
        Type::Sequence(SequenceKind::Enumerable, Box::new(element))
    }

    pub fn list(element: Type) -> Self {
        Type::Sequence(SequenceKind::List, Box::new(element))
    }

    pub fn queryable(element: Type) -> Self {
        Type::Sequence(SequenceKind::Queryable, Box::new(element))
    }

    pub fn function(params: Vec<Type>, ret: Type) -> Self {
        Type::Function(FunctionType {
            params,
            ret: Box::new(ret),
        })
    }

    pub fn mapper(input: Type, output: Type) -> Self {
        Type::Mapper(Box::new(input), Box::new(output))
    }

    /// Value types have a non-null default.
    pub fn is_value_type(&self) -> bool {
        matches!(self, Type::Bool | Type::Int | Type::Float)
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        match self {
            Type::Sequence(SequenceKind::Queryable, element) => vec![
                Capability::Queryable((**element).clone()),
                Capability::Enumerable((**element).clone()),
            ],
            Type::Sequence(_, element) => vec![Capability::Enumerable((**element).clone())],
            _ => Vec::new(),
        }
    }

    pub fn queryable_element(&self) -> Option<Type> {
        self.capabilities().into_iter().find_map(|c| match c {
            Capability::Queryable(element) => Some(element),
            Capability::Enumerable(_) => None,
        })
    }

    pub fn enumerable_element(&self) -> Option<Type> {
        self.capabilities().into_iter().find_map(|c| match c {
            Capability::Enumerable(element) => Some(element),
            Capability::Queryable(_) => None,
        })
    }

    pub fn sequence_kind(&self) -> Option<SequenceKind> {
        match self {
            Type::Sequence(kind, _) => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Func<")?;
        for param in &self.params {
            write!(f, "{}, ", param)?;
        }
        write!(f, "{}>", self.ret)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::String => write!(f, "string"),
            Type::Object(name) => write!(f, "{}", name),
            Type::Sequence(SequenceKind::Enumerable, el) => write!(f, "IEnumerable<{}>", el),
            Type::Sequence(SequenceKind::List, el) => write!(f, "List<{}>", el),
            Type::Sequence(SequenceKind::Queryable, el) => write!(f, "IQueryable<{}>", el),
            Type::Function(func) => write!(f, "{}", func),
            Type::Quoted(func) => write!(f, "Expression<{}>", func),
            Type::Mapper(input, output) => write!(f, "IMapper<{}, {}>", input, output),
        }
    }
}

/// A field of an object type. Identity is `(declaring_type, name)`.
#[derive(Debug, Clone)]
pub struct Member {
    declaring_type: Arc<str>,
    name: Arc<str>,
    ty: Type,
}

impl Member {
    pub fn new(declaring_type: &str, name: &str, ty: Type) -> Self {
        Self {
            declaring_type: Arc::from(declaring_type),
            name: Arc::from(name),
            ty,
        }
    }

    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.declaring_type == other.declaring_type && self.name == other.name
    }
}

impl Eq for Member {}

impl Hash for Member {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.declaring_type.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_type, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queryable_is_also_enumerable() {
        let ty = Type::queryable(Type::Int);
        assert_eq!(ty.queryable_element(), Some(Type::Int));
        assert_eq!(ty.enumerable_element(), Some(Type::Int));
    }

    #[test]
    fn test_list_is_not_queryable() {
        let ty = Type::list(Type::String);
        assert_eq!(ty.queryable_element(), None);
        assert_eq!(ty.enumerable_element(), Some(Type::String));
    }

    #[test]
    fn test_scalar_has_no_capabilities() {
        assert!(Type::Int.capabilities().is_empty());
        assert!(Type::object("Cat").capabilities().is_empty());
    }

    #[test]
    fn test_member_identity_ignores_type() {
        let a = Member::new("Cat", "Name", Type::String);
        let b = Member::new("Cat", "Name", Type::Int);
        let c = Member::new("Dog", "Name", Type::String);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::list(Type::object("Cat")).to_string(), "List<Cat>");
        assert_eq!(
            Type::mapper(Type::object("Cat"), Type::object("CatDto")).to_string(),
            "IMapper<Cat, CatDto>"
        );
        assert_eq!(
            Type::function(vec![Type::Int], Type::Bool).to_string(),
            "Func<int, bool>"
        );
    }
}

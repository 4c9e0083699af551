//! Callable operations and the markers that attach call-site transformers
//! to them.
//!
//! An operation either has a native implementation, used when a compiled
//! expression is evaluated, or is a placeholder that only exists to be
//! rewritten away before compilation.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::errors::{BoxError, MapError, Result};
use crate::rewrite::driver::RewriteSettings;
use crate::rewrite::transformers::{self, CallTransformer};
use crate::types::SequenceKind;
use crate::value::{Sequence, Value};

pub type NativeFn = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

pub type TransformerFactory =
    fn(&RewriteSettings) -> std::result::Result<Arc<dyn CallTransformer>, BoxError>;

/// Signature of an operation; the transformer cache is keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationKey {
    pub declaring_type: Arc<str>,
    pub name: Arc<str>,
    /// Argument count, not counting the receiver
    pub arity: usize,
    pub is_instance: bool,
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}/{}", self.declaring_type, self.name, self.arity)
    }
}

/// Declares which call-site transformer rewrites calls to an operation.
#[derive(Clone, Copy)]
pub struct TransformerMarker {
    name: &'static str,
    factory: TransformerFactory,
}

impl TransformerMarker {
    pub const fn new(name: &'static str, factory: TransformerFactory) -> Self {
        Self { name, factory }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn instantiate(
        &self,
        settings: &RewriteSettings,
        operation: &OperationKey,
    ) -> Result<Arc<dyn CallTransformer>> {
        (self.factory)(settings).map_err(|source| MapError::TransformerInstantiation {
            transformer: self.name,
            operation: operation.to_string(),
            source,
        })
    }
}

impl fmt::Debug for TransformerMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerMarker")
            .field("name", &self.name)
            .finish()
    }
}

#[derive(Clone)]
pub struct Operation(Arc<OperationDef>);

struct OperationDef {
    key: OperationKey,
    markers: Vec<TransformerMarker>,
    implementation: Option<NativeFn>,
}

impl Operation {
    pub fn builder(declaring_type: &str, name: &str, arity: usize) -> OperationBuilder {
        OperationBuilder {
            key: OperationKey {
                declaring_type: Arc::from(declaring_type),
                name: Arc::from(name),
                arity,
                is_instance: false,
            },
            markers: Vec::new(),
            implementation: None,
        }
    }

    pub fn key(&self) -> &OperationKey {
        &self.0.key
    }

    pub fn markers(&self) -> &[TransformerMarker] {
        &self.0.markers
    }

    pub fn is_placeholder(&self) -> bool {
        self.0.implementation.is_none()
    }

    /// Runs the native implementation. The receiver, if any, comes first.
    pub fn invoke(&self, args: &[Value]) -> Result<Value> {
        match &self.0.implementation {
            Some(implementation) => implementation(args),
            None => Err(MapError::PlaceholderInvoked {
                operation: self.0.key.to_string(),
            }),
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("key", &self.0.key)
            .field("markers", &self.0.markers)
            .finish()
    }
}

pub struct OperationBuilder {
    key: OperationKey,
    markers: Vec<TransformerMarker>,
    implementation: Option<NativeFn>,
}

impl OperationBuilder {
    pub fn instance(mut self) -> Self {
        self.key.is_instance = true;
        self
    }

    pub fn implemented_by<F>(mut self, implementation: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.implementation = Some(Arc::new(implementation));
        self
    }

    pub fn transformed_by(mut self, marker: TransformerMarker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn build(self) -> Operation {
        Operation(Arc::new(OperationDef {
            key: self.key,
            markers: self.markers,
            implementation: self.implementation,
        }))
    }
}

// ============================================================================
// Built-in operations
// ============================================================================

macro_rules! builtin {
    ($(#[$meta:meta])* $name:ident => $init:expr) => {
        $(#[$meta])*
        pub fn $name() -> Operation {
            static OPERATION: OnceLock<Operation> = OnceLock::new();
            OPERATION.get_or_init(|| $init).clone()
        }
    };
}

builtin!(
    /// `Enumerable.Select(source, projection)` over an in-memory sequence.
    enumerable_select => Operation::builder("Enumerable", "Select", 2)
        .implemented_by(|args| select(args, SequenceKind::Enumerable))
        .build()
);

builtin!(
    /// `Queryable.Select(source, quotedProjection)`.
    queryable_select => Operation::builder("Queryable", "Select", 2)
        .implemented_by(|args| select(args, SequenceKind::Queryable))
        .build()
);

builtin!(
    to_list => Operation::builder("Enumerable", "ToList", 1)
        .implemented_by(|args| convert(args, SequenceKind::List))
        .build()
);

builtin!(
    as_enumerable => Operation::builder("Enumerable", "AsEnumerable", 1)
        .implemented_by(|args| convert(args, SequenceKind::Enumerable))
        .build()
);

builtin!(
    as_queryable => Operation::builder("Queryable", "AsQueryable", 1)
        .implemented_by(|args| convert(args, SequenceKind::Queryable))
        .build()
);

builtin!(
    to_upper => Operation::builder("String", "ToUpper", 0)
        .instance()
        .implemented_by(|args| match args.first() {
            Some(Value::String(s)) => Ok(Value::string(&s.to_uppercase())),
            Some(Value::Null) | None => Err(MapError::NullReference {
                context: "ToUpper".to_string(),
            }),
            Some(other) => Err(MapError::type_mismatch("ToUpper", "string", other.type_name())),
        })
        .build()
);

builtin!(
    /// `Mapper.Include(source, mapper)`: inlines the mapper or mapping
    /// expression without a null guard. Placeholder.
    include => Operation::builder("Mapper", "Include", 2)
        .transformed_by(transformers::INCLUDE)
        .build()
);

builtin!(
    /// `Mapper.Include(source)`: the mapper is found through the configured
    /// resolvers. Placeholder.
    include_resolved => Operation::builder("Mapper", "Include", 1)
        .transformed_by(transformers::INCLUDE_RESOLVED)
        .build()
);

builtin!(
    map_with => Operation::builder("MapWith", "MapWith", 2)
        .transformed_by(transformers::MAP_WITH)
        .implemented_by(|args| {
            let mapper = mapper_argument(args.get(1), "MapWith")?;
            mapper.map(args.first().unwrap_or(&Value::Null))
        })
        .build()
);

builtin!(
    map_all_with => Operation::builder("MapWith", "MapAllWith", 2)
        .transformed_by(transformers::MAP_ALL_WITH)
        .implemented_by(|args| {
            let mapper = mapper_argument(args.get(1), "MapAllWith")?;
            let source = sequence_argument(args.first(), "MapAllWith")?;
            let mapped = source.map_with(&mapper)?;
            let kind = match source.kind() {
                SequenceKind::Queryable => SequenceKind::Queryable,
                _ => SequenceKind::Enumerable,
            };
            Ok(Value::Sequence(mapped.with_kind(kind)))
        })
        .build()
);

builtin!(
    /// `mapper.Map(source)` on a mapper instance.
    mapper_map => Operation::builder("IMapper", "Map", 1)
        .instance()
        .transformed_by(transformers::MAPPER_MAP)
        .implemented_by(|args| {
            let mapper = mapper_argument(args.first(), "Map")?;
            mapper.map(args.get(1).unwrap_or(&Value::Null))
        })
        .build()
);

fn select(args: &[Value], kind: SequenceKind) -> Result<Value> {
    let source = sequence_argument(args.first(), "Select")?;
    let projection = match args.get(1) {
        Some(Value::Function(function)) => function,
        Some(other) => {
            return Err(MapError::type_mismatch(
                "Select",
                "function",
                other.type_name(),
            ))
        }
        None => {
            return Err(MapError::NullReference {
                context: "Select".to_string(),
            })
        }
    };
    let items = source
        .items()
        .iter()
        .map(|item| projection.call(std::slice::from_ref(item)))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Sequence(Sequence::new(kind, items)))
}

fn convert(args: &[Value], kind: SequenceKind) -> Result<Value> {
    let source = sequence_argument(args.first(), "conversion")?;
    Ok(Value::Sequence(source.with_kind(kind)))
}

fn sequence_argument<'a>(value: Option<&'a Value>, context: &str) -> Result<&'a Sequence> {
    match value {
        Some(Value::Sequence(sequence)) => Ok(sequence),
        Some(Value::Null) | None => Err(MapError::NullReference {
            context: context.to_string(),
        }),
        Some(other) => Err(MapError::type_mismatch(
            context,
            "sequence",
            other.type_name(),
        )),
    }
}

fn mapper_argument(value: Option<&Value>, context: &str) -> Result<crate::mapper::Mapper> {
    match value {
        Some(Value::Mapper(mapper)) => Ok(mapper.clone()),
        Some(Value::MapperRef(mapper)) => mapper.get().ok_or(MapError::NullMapper),
        Some(Value::Null) | None => Err(MapError::NullMapper),
        Some(other) => Err(MapError::type_mismatch(
            context,
            "mapper",
            other.type_name(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_shared() {
        assert!(Arc::ptr_eq(&include().0, &include().0));
        assert_eq!(include().key(), include().key());
        assert_ne!(include().key(), include_resolved().key());
    }

    #[test]
    fn test_placeholder_invocation_fails() {
        let err = include().invoke(&[Value::Null, Value::Null]).unwrap_err();
        assert!(matches!(err, MapError::PlaceholderInvoked { .. }));
    }

    #[test]
    fn test_to_list_keeps_items() {
        let seq = Value::Sequence(Sequence::new(
            SequenceKind::Enumerable,
            vec![Value::Int(1), Value::Int(2)],
        ));
        let list = to_list().invoke(&[seq]).unwrap();
        let list = list.as_sequence().unwrap();
        assert_eq!(list.kind(), SequenceKind::List);
        assert_eq!(list.items(), &[Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_to_upper() {
        let result = to_upper().invoke(&[Value::string("tom")]).unwrap();
        assert_eq!(result, Value::string("TOM"));
    }

    #[test]
    fn test_markers_registered() {
        assert_eq!(map_with().markers().len(), 1);
        assert!(enumerable_select().markers().is_empty());
        assert!(!map_with().is_placeholder());
        assert!(include().is_placeholder());
    }
}

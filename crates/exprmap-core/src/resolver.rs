//! Mapper lookup for includes that do not name their mapper.

use rustc_hash::FxHashMap;

use crate::errors::{MapError, Result};
use crate::expr::{Call, Lambda};
use crate::mapper::{Mapper, MapperId, MapperRef};
use crate::types::Type;

/// What a resolver is asked for: a mapper from `input_type` to
/// `output_type`, needed by `call`.
pub struct ResolveRequest<'a> {
    pub call: &'a Call,
    pub input_type: &'a Type,
    pub output_type: &'a Type,
}

/// A resolver's answer. A reference carries its identity before its
/// expression, so a mapper resolving to itself is recognised while it is
/// still being built.
#[derive(Debug, Clone)]
pub enum ResolvedMapper {
    Mapper(Mapper),
    Ref(MapperRef),
}

impl ResolvedMapper {
    pub fn id(&self) -> MapperId {
        match self {
            ResolvedMapper::Mapper(mapper) => mapper.id(),
            ResolvedMapper::Ref(slot) => slot.id(),
        }
    }

    pub fn input_type(&self) -> &Type {
        match self {
            ResolvedMapper::Mapper(mapper) => mapper.input_type(),
            ResolvedMapper::Ref(slot) => slot.input_type(),
        }
    }

    pub fn output_type(&self) -> &Type {
        match self {
            ResolvedMapper::Mapper(mapper) => mapper.output_type(),
            ResolvedMapper::Ref(slot) => slot.output_type(),
        }
    }

    /// The transformed expression. An unfilled reference is a null mapper.
    pub fn expression(&self) -> Result<Lambda> {
        match self {
            ResolvedMapper::Mapper(mapper) => Ok(mapper.expression().clone()),
            ResolvedMapper::Ref(slot) => slot
                .get()
                .map(|mapper| mapper.expression().clone())
                .ok_or(MapError::NullMapper),
        }
    }
}

impl From<Mapper> for ResolvedMapper {
    fn from(mapper: Mapper) -> Self {
        ResolvedMapper::Mapper(mapper)
    }
}

impl From<MapperRef> for ResolvedMapper {
    fn from(slot: MapperRef) -> Self {
        ResolvedMapper::Ref(slot)
    }
}

pub trait MapperResolver: Send + Sync {
    /// `None` when this resolver does not know a suitable mapper.
    fn resolve(&self, request: &ResolveRequest<'_>) -> Option<ResolvedMapper>;
}

impl<F, R> MapperResolver for F
where
    F: Fn(&ResolveRequest<'_>) -> Option<R> + Send + Sync,
    R: Into<ResolvedMapper>,
{
    fn resolve(&self, request: &ResolveRequest<'_>) -> Option<ResolvedMapper> {
        self(request).map(Into::into)
    }
}

/// Mappers and mapper references keyed by the pair of types they map
/// between.
#[derive(Default, Clone)]
pub struct MapperRegistry {
    mappers: FxHashMap<(Type, Type), ResolvedMapper>,
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mapper or reference, replacing any earlier entry for the
    /// same pair.
    pub fn register(&mut self, mapper: impl Into<ResolvedMapper>) {
        let mapper = mapper.into();
        let key = (mapper.input_type().clone(), mapper.output_type().clone());
        self.mappers.insert(key, mapper);
    }

    pub fn with(mut self, mapper: impl Into<ResolvedMapper>) -> Self {
        self.register(mapper);
        self
    }

    pub fn get(&self, input: &Type, output: &Type) -> Option<&ResolvedMapper> {
        self.mappers.get(&(input.clone(), output.clone()))
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }
}

impl MapperResolver for MapperRegistry {
    fn resolve(&self, request: &ResolveRequest<'_>) -> Option<ResolvedMapper> {
        self.get(request.input_type, request.output_type).cloned()
    }
}

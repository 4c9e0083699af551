use crate::expr::Lambda;
use crate::mapper::MapperId;
use crate::types::Type;

/// What is being rewritten: the mapper under construction, if any, and the
/// types it maps between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingContext {
    mapper: Option<MapperId>,
    input_type: Option<Type>,
    output_type: Type,
}

impl MappingContext {
    pub fn new(mapper: Option<MapperId>, input_type: Option<Type>, output_type: Type) -> Self {
        Self {
            mapper,
            input_type,
            output_type,
        }
    }

    /// Context for a standalone lambda that no mapper owns.
    pub fn for_lambda(lambda: &Lambda) -> Self {
        Self::new(
            None,
            lambda.parameter(0).map(|p| p.ty().clone()),
            lambda.return_type().clone(),
        )
    }

    pub fn for_mapper(mapper: MapperId, lambda: &Lambda) -> Self {
        Self {
            mapper: Some(mapper),
            ..Self::for_lambda(lambda)
        }
    }

    pub fn mapper(&self) -> Option<MapperId> {
        self.mapper
    }

    pub fn input_type(&self) -> Option<&Type> {
        self.input_type.as_ref()
    }

    pub fn output_type(&self) -> &Type {
        &self.output_type
    }

    /// True when `id` is the mapper this context belongs to.
    pub fn is_current(&self, id: MapperId) -> bool {
        self.mapper == Some(id)
    }
}

//! In-memory translatable sequences.
//!
//! A [`Query`] keeps its pipeline as an expression tree instead of running
//! it, the way a query provider would, and only evaluates when executed.

use tracing::debug;

use crate::calls;
use crate::compile;
use crate::errors::{MapError, Result};
use crate::expr::Expr;
use crate::mapper::Mapper;
use crate::types::{SequenceKind, Type};
use crate::value::{Sequence, Value};

#[derive(Clone, Debug)]
pub struct Query {
    expression: Expr,
}

impl Query {
    pub fn from_values(element: Type, items: Vec<Value>) -> Query {
        Query {
            expression: Expr::constant(
                Value::Sequence(Sequence::new(SequenceKind::Queryable, items)),
                Type::queryable(element),
            ),
        }
    }

    /// Wraps an expression of queryable type.
    pub fn from_expression(expression: Expr) -> Result<Query> {
        if expression.ty().queryable_element().is_none() {
            return Err(MapError::invalid_argument(
                "expression",
                format!("`{}` is not queryable", expression.ty()),
            ));
        }
        Ok(Query { expression })
    }

    pub fn expression(&self) -> &Expr {
        &self.expression
    }

    pub fn element_type(&self) -> Option<Type> {
        self.expression.ty().queryable_element()
    }

    /// Appends a projection through the mapper's expression. Nothing is
    /// evaluated.
    pub fn map_with(&self, mapper: &Mapper) -> Result<Query> {
        let expression = calls::select(self.expression.clone(), mapper.expression().clone())?;
        debug!(mapper = %mapper.id(), "Projected query through mapper");
        Ok(Query { expression })
    }

    pub fn execute(&self) -> Result<Sequence> {
        match compile::evaluate(&self.expression)? {
            Value::Sequence(sequence) => Ok(sequence),
            other => Err(MapError::type_mismatch(
                "query",
                "sequence",
                other.type_name(),
            )),
        }
    }
}

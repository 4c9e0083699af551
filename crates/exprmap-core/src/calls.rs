//! Builders for calls to the built-in operations, used to write mapping
//! expressions by hand.

use crate::errors::{MapError, Result};
use crate::expr::{Expr, Lambda};
use crate::operations;
use crate::types::{SequenceKind, Type};

/// Output type of a mapper-valued expression: a mapper, or a (quoted)
/// lambda.
fn mapper_output(mapper: &Expr) -> Result<Type> {
    match mapper.ty() {
        Type::Mapper(_, output) => Ok((**output).clone()),
        Type::Function(func) | Type::Quoted(func) => Ok((*func.ret).clone()),
        other => Err(MapError::invalid_argument(
            "mapper",
            format!("`{}` is not a mapper or a mapping expression", other),
        )),
    }
}

fn element_of(source: &Expr) -> Result<Type> {
    source.ty().enumerable_element().ok_or_else(|| {
        MapError::invalid_argument("source", format!("`{}` is not a sequence", source.ty()))
    })
}

/// `Include(source, mapper)`
pub fn include(source: Expr, mapper: Expr) -> Result<Expr> {
    let ty = mapper_output(&mapper)?;
    Expr::call(&operations::include(), None, vec![source, mapper], ty)
}

/// `Include<TResult>(source)`, resolved through the configured resolvers.
pub fn include_resolved(source: Expr, output: Type) -> Result<Expr> {
    Expr::call(&operations::include_resolved(), None, vec![source], output)
}

/// `source.MapWith(mapper)` for a single object.
pub fn map_with(source: Expr, mapper: Expr) -> Result<Expr> {
    let ty = mapper_output(&mapper)?;
    Expr::call(&operations::map_with(), None, vec![source, mapper], ty)
}

/// `source.MapWith(mapper)` for a collection.
pub fn map_all_with(source: Expr, mapper: Expr) -> Result<Expr> {
    let output = mapper_output(&mapper)?;
    let ty = match source.ty().sequence_kind() {
        Some(SequenceKind::Queryable) => Type::queryable(output),
        _ => Type::enumerable(output),
    };
    Expr::call(&operations::map_all_with(), None, vec![source, mapper], ty)
}

/// `mapper.Map(source)`
pub fn map(mapper: Expr, source: Expr) -> Result<Expr> {
    let ty = mapper_output(&mapper)?;
    Expr::call(&operations::mapper_map(), Some(mapper), vec![source], ty)
}

/// Projects `source` through `projection`, preferring the query-translatable
/// form when the source supports it.
pub fn select(source: Expr, projection: Lambda) -> Result<Expr> {
    if source.ty().queryable_element().is_some() {
        let ty = Type::queryable(projection.return_type().clone());
        return Expr::call(
            &operations::queryable_select(),
            None,
            vec![source, Expr::quote(projection)],
            ty,
        );
    }
    if source.ty().enumerable_element().is_some() {
        let ty = Type::enumerable(projection.return_type().clone());
        return Expr::call(
            &operations::enumerable_select(),
            None,
            vec![source, Expr::lambda(projection)],
            ty,
        );
    }
    Err(MapError::UnsupportedCollection {
        ty: source.ty().to_string(),
    })
}

pub fn to_list(source: Expr) -> Result<Expr> {
    let ty = Type::list(element_of(&source)?);
    Expr::call(&operations::to_list(), None, vec![source], ty)
}

pub fn as_enumerable(source: Expr) -> Result<Expr> {
    let ty = Type::enumerable(element_of(&source)?);
    Expr::call(&operations::as_enumerable(), None, vec![source], ty)
}

pub fn as_queryable(source: Expr) -> Result<Expr> {
    let ty = Type::queryable(element_of(&source)?);
    Expr::call(&operations::as_queryable(), None, vec![source], ty)
}

pub fn to_upper(source: Expr) -> Result<Expr> {
    Expr::call(&operations::to_upper(), Some(source), Vec::new(), Type::String)
}

//! Inlining of mapper bodies into call sites.

use tracing::debug;
use uuid::Uuid;

use super::context::MappingContext;
use super::substitute::{occurs_in, substitute, substitute_lambda};
use crate::calls;
use crate::compile;
use crate::errors::{MapError, Result};
use crate::expr::{Expr, Lambda};
use crate::mapper::MapperId;
use crate::value::Value;

/// Fails when `id` is the mapper whose expression is being rewritten.
pub fn check_recursion(id: MapperId, cx: &MappingContext) -> Result<()> {
    if cx.is_current(id) {
        return Err(MapError::RecursiveMapper);
    }
    Ok(())
}

/// Evaluates a mapper argument locally and returns the lambda to inline.
///
/// The argument may hold a mapper, a late-bound mapper reference or a raw
/// mapping expression.
pub fn resolve_mapper_argument(argument: &Expr, cx: &MappingContext) -> Result<Lambda> {
    match compile::evaluate(argument)? {
        Value::Mapper(mapper) => {
            check_recursion(mapper.id(), cx)?;
            Ok(mapper.expression().clone())
        }
        Value::MapperRef(mapper) => {
            check_recursion(mapper.id(), cx)?;
            mapper
                .get()
                .map(|m| m.expression().clone())
                .ok_or(MapError::NullMapper)
        }
        Value::Expression(lambda) => Ok(lambda),
        Value::Function(function) => Ok(function.lambda().clone()),
        Value::Null => Err(MapError::NullMapper),
        other => Err(MapError::type_mismatch(
            argument.to_string(),
            "mapper",
            other.type_name(),
        )),
    }
}

/// Substitutes `source` for the single parameter of `lambda` in its body.
pub fn inline_lambda(lambda: &Lambda, source: &Expr) -> Result<Expr> {
    let [parameter] = lambda.parameters() else {
        return Err(MapError::invalid_argument(
            "mapper",
            format!(
                "a mapping expression takes one parameter, `{}` takes {}",
                lambda,
                lambda.parameters().len()
            ),
        ));
    };
    if parameter.ty() != source.ty() {
        return Err(MapError::invalid_argument(
            "mapper",
            format!(
                "`{}` maps {}, the source `{}` is {}",
                lambda,
                parameter.ty(),
                source,
                source.ty()
            ),
        ));
    }
    if parameter.ptr_eq(source) {
        return Ok(lambda.body().clone());
    }
    if occurs_in(source, parameter)? {
        // the parameter node is shared with the call site; rename it first
        let fresh = Expr::parameter(
            parameter.parameter_name().unwrap_or_default(),
            parameter.ty().clone(),
        );
        let renamed = substitute_lambda(lambda, &[(parameter.clone(), fresh.clone())])?;
        return substitute(renamed.body(), &[(fresh, source.clone())]);
    }
    substitute(lambda.body(), &[(parameter.clone(), source.clone())])
}

/// `source == default ? default(result) : body`
pub fn null_guarded(source: &Expr, body: Expr) -> Expr {
    let result_default = Expr::default_value(body.ty());
    Expr::condition(
        Expr::equal(source.clone(), Expr::default_value(source.ty())),
        result_default,
        body,
    )
}

/// Inlines a mapper over a single object.
pub fn inline_object(
    source: &Expr,
    mapper: &Expr,
    null_propagation: bool,
    cx: &MappingContext,
) -> Result<Expr> {
    let lambda = resolve_mapper_argument(mapper, cx)?;
    let body = inline_lambda(&lambda, source)?;
    debug!(source = %source, null_propagation, "Inlined object mapping");
    if null_propagation {
        Ok(null_guarded(source, body))
    } else {
        Ok(body)
    }
}

/// Inlines a mapper over every element of a collection, as a projection
/// over a fresh parameter.
pub fn inline_collection(
    source: &Expr,
    mapper: &Expr,
    parameter_prefix: &str,
    cx: &MappingContext,
) -> Result<Expr> {
    let element = source
        .ty()
        .enumerable_element()
        .ok_or_else(|| MapError::UnsupportedCollection {
            ty: source.ty().to_string(),
        })?;
    let lambda = resolve_mapper_argument(mapper, cx)?;
    let name = format!("{}{}", parameter_prefix, Uuid::new_v4().simple());
    let parameter = Expr::parameter(&name, element);
    let body = inline_lambda(&lambda, &parameter)?;
    let projection = Lambda::unary(parameter, body)?;
    debug!(source = %source, parameter = %name, "Inlined collection mapping");
    calls::select(source.clone(), projection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Member, Type};

    fn cat_mapper_lambda() -> Lambda {
        let c = Expr::parameter("c", Type::object("Cat"));
        let body = Expr::new_object(Type::object("CatDto"))
            .assign(
                Member::new("CatDto", "Id", Type::Int),
                c.member(&Member::new("Cat", "Id", Type::Int)),
            )
            .build()
            .unwrap();
        Lambda::unary(c, body).unwrap()
    }

    #[test]
    fn test_object_inline_with_null_guard() {
        let lambda = cat_mapper_lambda();
        let x = Expr::parameter("x", Type::object("Thing"));
        let source = x.member(&Member::new("Thing", "FavoriteCat", Type::object("Cat")));
        let cx = MappingContext::new(None, None, Type::object("CatDto"));

        let result = inline_object(&source, &Expr::expression_constant(&lambda), true, &cx).unwrap();

        assert_eq!(
            result.to_string(),
            "((x.FavoriteCat == null) ? null : new CatDto { Id = x.FavoriteCat.Id })"
        );
    }

    #[test]
    fn test_collection_inline_uses_fresh_parameter() {
        let lambda = cat_mapper_lambda();
        let x = Expr::parameter("x", Type::object("Thing"));
        let cats = x.member(&Member::new("Thing", "Cats", Type::list(Type::object("Cat"))));
        let cx = MappingContext::new(None, None, Type::object("ThingDto"));

        let result =
            inline_collection(&cats, &Expr::expression_constant(&lambda), "map_", &cx).unwrap();

        let call = result.as_call().unwrap();
        let projection = call.arguments[1].as_lambda().unwrap();
        let name = projection.parameters()[0].parameter_name().unwrap();
        assert!(name.starts_with("map_"));
        assert_eq!(name.len(), "map_".len() + 32);
    }

    #[test]
    fn test_collection_inline_rejects_scalar() {
        let lambda = cat_mapper_lambda();
        let n = Expr::parameter("n", Type::Int);
        let cx = MappingContext::new(None, None, Type::Int);
        let err = inline_collection(&n, &Expr::expression_constant(&lambda), "map_", &cx)
            .unwrap_err();
        assert!(matches!(err, MapError::UnsupportedCollection { .. }));
    }

    #[test]
    fn test_null_mapper_argument() {
        let cx = MappingContext::new(None, None, Type::Int);
        let null = Expr::null(Type::mapper(Type::Int, Type::Int));
        let err = resolve_mapper_argument(&null, &cx).unwrap_err();
        assert!(matches!(err, MapError::NullMapper));
    }
}

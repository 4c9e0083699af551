//! Call-site transformers for the built-in mapping operations.

use std::sync::Arc;

use tracing::trace;

use super::context::MappingContext;
use super::driver::RewriteSettings;
use super::inline::{check_recursion, inline_collection, inline_lambda, inline_object};
use crate::errors::{BoxError, MapError, Result};
use crate::expr::{Call, Expr};
use crate::operations::TransformerMarker;
use crate::resolver::{MapperResolver, ResolveRequest};

/// Rewrites a call to the operation it is attached to.
///
/// `node` is the whole call node and `call` its contents. The returned tree
/// replaces the node and is not visited again.
pub trait CallTransformer: Send + Sync {
    fn transform(&self, node: &Expr, call: &Call, cx: &MappingContext) -> Result<Expr>;
}

pub const INCLUDE: TransformerMarker = TransformerMarker::new("IncludeTransformer", include);
pub const INCLUDE_RESOLVED: TransformerMarker =
    TransformerMarker::new("IncludeResolvedTransformer", include_resolved);
pub const MAP_WITH: TransformerMarker = TransformerMarker::new("MapWithObjectTransformer", map_with);
pub const MAP_ALL_WITH: TransformerMarker =
    TransformerMarker::new("MapWithCollectionTransformer", map_all_with);
pub const MAPPER_MAP: TransformerMarker = TransformerMarker::new("MapTransformer", mapper_map);

fn include(_: &RewriteSettings) -> std::result::Result<Arc<dyn CallTransformer>, BoxError> {
    Ok(Arc::new(IncludeTransformer))
}

fn include_resolved(
    settings: &RewriteSettings,
) -> std::result::Result<Arc<dyn CallTransformer>, BoxError> {
    Ok(Arc::new(IncludeResolvedTransformer {
        resolvers: settings.resolvers.clone(),
    }))
}

fn map_with(settings: &RewriteSettings) -> std::result::Result<Arc<dyn CallTransformer>, BoxError> {
    Ok(Arc::new(MapWithObjectTransformer {
        null_propagation: settings.options.null_propagation,
    }))
}

fn map_all_with(
    settings: &RewriteSettings,
) -> std::result::Result<Arc<dyn CallTransformer>, BoxError> {
    Ok(Arc::new(MapWithCollectionTransformer {
        parameter_prefix: settings.options.projection_parameter_prefix.clone(),
    }))
}

fn mapper_map(settings: &RewriteSettings) -> std::result::Result<Arc<dyn CallTransformer>, BoxError> {
    Ok(Arc::new(MapTransformer {
        null_propagation: settings.options.null_propagation,
    }))
}

fn argument<'a>(call: &'a Call, index: usize) -> Result<&'a Expr> {
    call.arguments.get(index).ok_or_else(|| {
        MapError::invalid_argument(
            "arguments",
            format!("`{}` is missing argument {}", call.operation.key(), index),
        )
    })
}

/// `Include(source, mapper)`: the mapper body, no null guard.
pub struct IncludeTransformer;

impl CallTransformer for IncludeTransformer {
    fn transform(&self, _node: &Expr, call: &Call, cx: &MappingContext) -> Result<Expr> {
        inline_object(argument(call, 0)?, argument(call, 1)?, false, cx)
    }
}

/// `Include<T>(source)`: the first resolver that knows a mapper from the
/// source type to `T` wins.
pub struct IncludeResolvedTransformer {
    resolvers: Vec<Arc<dyn MapperResolver>>,
}

impl CallTransformer for IncludeResolvedTransformer {
    fn transform(&self, node: &Expr, call: &Call, cx: &MappingContext) -> Result<Expr> {
        let source = argument(call, 0)?;
        let request = ResolveRequest {
            call,
            input_type: source.ty(),
            output_type: node.ty(),
        };
        let mapper = self
            .resolvers
            .iter()
            .find_map(|resolver| resolver.resolve(&request))
            .ok_or_else(|| MapError::UnresolvedMapper {
                call: node.to_string(),
            })?;
        trace!(mapper = %mapper.id(), "Resolved mapper for {}", node);
        check_recursion(mapper.id(), cx)?;
        inline_lambda(&mapper.expression()?, source)
    }
}

/// `source.MapWith(mapper)` on an object.
pub struct MapWithObjectTransformer {
    null_propagation: bool,
}

impl CallTransformer for MapWithObjectTransformer {
    fn transform(&self, _node: &Expr, call: &Call, cx: &MappingContext) -> Result<Expr> {
        inline_object(
            argument(call, 0)?,
            argument(call, 1)?,
            self.null_propagation,
            cx,
        )
    }
}

/// `source.MapWith(mapper)` on a collection.
pub struct MapWithCollectionTransformer {
    parameter_prefix: String,
}

impl CallTransformer for MapWithCollectionTransformer {
    fn transform(&self, _node: &Expr, call: &Call, cx: &MappingContext) -> Result<Expr> {
        inline_collection(
            argument(call, 0)?,
            argument(call, 1)?,
            &self.parameter_prefix,
            cx,
        )
    }
}

/// `mapper.Map(source)`: the mapper is the receiver.
pub struct MapTransformer {
    null_propagation: bool,
}

impl CallTransformer for MapTransformer {
    fn transform(&self, _node: &Expr, call: &Call, cx: &MappingContext) -> Result<Expr> {
        let mapper = call.receiver.as_ref().ok_or_else(|| {
            MapError::invalid_argument("receiver", "`Map` is called without a mapper")
        })?;
        inline_object(argument(call, 0)?, mapper, self.null_propagation, cx)
    }
}

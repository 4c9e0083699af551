//! The call-site rewrite pass.
//!
//! Walks a lambda, and for every call whose operation carries a transformer
//! marker hands the call to that transformer. Transformer instances are
//! created once per operation and cached for the lifetime of the rewriter.

use std::fmt;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::{debug, trace};

use super::context::MappingContext;
use super::transformers::CallTransformer;
use crate::config::{MapperConfig, RewriteOptions};
use crate::errors::{MapError, Result};
use crate::expr::{walk, walk_lambda, Expr, ExprKind, ExprRewriter, Lambda};
use crate::operations::{Operation, OperationKey};
use crate::resolver::MapperResolver;

/// Everything a transformer factory may read.
#[derive(Clone, Default)]
pub struct RewriteSettings {
    pub options: RewriteOptions,
    /// Consulted in order by resolver-based includes
    pub resolvers: Vec<Arc<dyn MapperResolver>>,
}

impl RewriteSettings {
    pub fn new(options: RewriteOptions) -> Self {
        Self {
            options,
            resolvers: Vec::new(),
        }
    }

    pub fn from_config(config: &MapperConfig) -> Self {
        Self::new(config.rewrite_options.clone())
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn MapperResolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }
}

impl fmt::Debug for RewriteSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RewriteSettings")
            .field("options", &self.options)
            .field("resolvers", &self.resolvers.len())
            .finish()
    }
}

pub struct CallSiteRewriter {
    settings: RewriteSettings,
    /// `None` records an operation without a marker
    transformers: DashMap<OperationKey, Option<Arc<dyn CallTransformer>>>,
}

impl Default for CallSiteRewriter {
    fn default() -> Self {
        Self::new()
    }
}

impl CallSiteRewriter {
    pub fn new() -> Self {
        Self::with_settings(RewriteSettings::default())
    }

    pub fn with_settings(settings: RewriteSettings) -> Self {
        Self {
            settings,
            transformers: DashMap::new(),
        }
    }

    /// The process-wide rewriter with default settings.
    pub fn shared() -> Arc<CallSiteRewriter> {
        static SHARED: OnceLock<Arc<CallSiteRewriter>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(CallSiteRewriter::new())))
    }

    pub fn settings(&self) -> &RewriteSettings {
        &self.settings
    }

    /// Number of operations whose transformer lookup has been cached.
    pub fn cached_operations(&self) -> usize {
        self.transformers.len()
    }

    pub fn rewrite_lambda(&self, lambda: &Lambda, cx: &MappingContext) -> Result<Lambda> {
        walk_lambda(&mut RewritePass { rewriter: self, cx }, lambda)
    }

    pub fn rewrite_expr(&self, expr: &Expr, cx: &MappingContext) -> Result<Expr> {
        RewritePass { rewriter: self, cx }.rewrite(expr)
    }

    /// The transformer for `operation`, instantiating and caching it on
    /// first use. Failed instantiations are not cached.
    pub fn transformer_for(&self, operation: &Operation) -> Result<Option<Arc<dyn CallTransformer>>> {
        let key = operation.key();
        if let Some(cached) = self.transformers.get(key) {
            trace!(operation = %key, "Transformer cache hit");
            return Ok(cached.value().clone());
        }

        let transformer = match operation.markers() {
            [] => None,
            [marker] => {
                let transformer = marker.instantiate(&self.settings, key)?;
                debug!(operation = %key, transformer = marker.name(), "Instantiated call transformer");
                Some(transformer)
            }
            _ => {
                return Err(MapError::MultipleTransformerMarkers {
                    operation: key.to_string(),
                })
            }
        };

        let entry = self.transformers.entry(key.clone()).or_insert(transformer);
        Ok(entry.value().clone())
    }
}

struct RewritePass<'a> {
    rewriter: &'a CallSiteRewriter,
    cx: &'a MappingContext,
}

impl ExprRewriter for RewritePass<'_> {
    fn rewrite(&mut self, expr: &Expr) -> Result<Expr> {
        if let ExprKind::Call(call) = expr.kind() {
            if let Some(transformer) = self.rewriter.transformer_for(&call.operation)? {
                trace!(call = %expr, "Rewriting call site");
                return transformer.transform(expr, call, self.cx);
            }
        }
        walk(self, expr)
    }
}

/// Rewrites every marked call site in `lambda` with the shared rewriter.
pub fn apply_transformations(lambda: &Lambda) -> Result<Lambda> {
    CallSiteRewriter::shared().rewrite_lambda(lambda, &MappingContext::for_lambda(lambda))
}

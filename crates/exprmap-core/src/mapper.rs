//! Mappers and the transformation pipeline they are built through.
//!
//! A mapper keeps the expression it was given, the transformed expression
//! every call site is inlined into, and a delegate compiled from the latter
//! on first use.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::compile::CompiledLambda;
use crate::errors::{MapError, Result};
use crate::expr::Lambda;
use crate::rewrite::{merge, CallSiteRewriter, MappingContext};
use crate::types::Type;
use crate::value::Value;

static NEXT_MAPPER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MapperId(u64);

impl MapperId {
    fn next() -> Self {
        MapperId(NEXT_MAPPER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for MapperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// When an expression transformer runs relative to the call-site pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPosition {
    Beginning,
    #[default]
    End,
}

/// A whole-expression rewrite applied while a mapper is built.
pub trait ExpressionTransformer: Send + Sync {
    fn transform(&self, expression: &Lambda, cx: &MappingContext) -> Result<Lambda>;

    fn position(&self) -> RunPosition {
        RunPosition::End
    }
}

/// Expression transformers around the call-site rewrite pass.
#[derive(Clone)]
pub struct TransformPipeline {
    before: Vec<Arc<dyn ExpressionTransformer>>,
    after: Vec<Arc<dyn ExpressionTransformer>>,
    rewriter: Arc<CallSiteRewriter>,
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self::new(CallSiteRewriter::shared())
    }
}

impl TransformPipeline {
    pub fn new(rewriter: Arc<CallSiteRewriter>) -> Self {
        Self {
            before: Vec::new(),
            after: Vec::new(),
            rewriter,
        }
    }

    pub fn with_transformer(mut self, transformer: Arc<dyn ExpressionTransformer>) -> Self {
        match transformer.position() {
            RunPosition::Beginning => self.before.push(transformer),
            RunPosition::End => self.after.push(transformer),
        }
        self
    }

    pub fn rewriter(&self) -> &Arc<CallSiteRewriter> {
        &self.rewriter
    }

    pub fn apply(&self, expression: &Lambda, cx: &MappingContext) -> Result<Lambda> {
        let mut current = expression.clone();
        for transformer in &self.before {
            current = transformer.transform(&current, cx)?;
        }
        current = self.rewriter.rewrite_lambda(&current, cx)?;
        for transformer in &self.after {
            current = transformer.transform(&current, cx)?;
        }
        Ok(current)
    }
}

fn input_type_of(expression: &Lambda) -> Result<Type> {
    match expression.parameters() {
        [parameter] => Ok(parameter.ty().clone()),
        params => Err(MapError::invalid_argument(
            "expression",
            format!("a mapper expression takes one parameter, not {}", params.len()),
        )),
    }
}

#[derive(Clone)]
pub struct Mapper(Arc<MapperInner>);

struct MapperInner {
    id: MapperId,
    input_type: Type,
    output_type: Type,
    original: Lambda,
    expression: Lambda,
    pipeline: TransformPipeline,
    compiled: OnceLock<CompiledLambda>,
}

impl Mapper {
    /// Builds a mapper with the shared call-site rewriter and no extra
    /// transformers.
    pub fn new(expression: Lambda) -> Result<Mapper> {
        Self::with_pipeline(expression, TransformPipeline::default())
    }

    pub fn with_pipeline(expression: Lambda, pipeline: TransformPipeline) -> Result<Mapper> {
        Self::build(MapperId::next(), expression, pipeline)
    }

    fn build(id: MapperId, original: Lambda, pipeline: TransformPipeline) -> Result<Mapper> {
        let input_type = input_type_of(&original)?;
        let output_type = original.return_type().clone();
        let cx = MappingContext::for_mapper(id, &original);
        let expression = pipeline.apply(&original, &cx)?;
        debug!(mapper = %id, "Built mapper {} -> {}", input_type, output_type);
        Ok(Mapper(Arc::new(MapperInner {
            id,
            input_type,
            output_type,
            original,
            expression,
            pipeline,
            compiled: OnceLock::new(),
        })))
    }

    pub fn id(&self) -> MapperId {
        self.0.id
    }

    pub fn input_type(&self) -> &Type {
        &self.0.input_type
    }

    pub fn output_type(&self) -> &Type {
        &self.0.output_type
    }

    /// The expression as given, before any transformation.
    pub fn original_expression(&self) -> &Lambda {
        &self.0.original
    }

    /// The transformed expression.
    pub fn expression(&self) -> &Lambda {
        &self.0.expression
    }

    pub fn pipeline(&self) -> &TransformPipeline {
        &self.0.pipeline
    }

    pub fn compiled(&self) -> &CompiledLambda {
        self.0.compiled.get_or_init(|| {
            debug!(mapper = %self.0.id, "Compiling mapper expression");
            CompiledLambda::new(&self.0.expression)
        })
    }

    /// Maps `input`. The default value of the input type maps to the default
    /// value of the output type without running the expression.
    pub fn map(&self, input: &Value) -> Result<Value> {
        if *input == Value::default_for(&self.0.input_type) {
            return Ok(Value::default_for(&self.0.output_type));
        }
        self.compiled().invoke(std::slice::from_ref(input))
    }

    /// A new mapper over `expression` with the same transformers.
    pub fn with_expression(&self, expression: Lambda) -> Result<Mapper> {
        Mapper::with_pipeline(expression, self.0.pipeline.clone())
    }

    /// Merges `extension` over the transformed expression.
    pub fn merge(&self, extension: &Lambda) -> Result<Mapper> {
        self.with_expression(merge(self.expression(), extension)?)
    }

    /// Merges `extension` over the original expression, so the merged
    /// result is transformed as a whole.
    pub fn merge_original(&self, extension: &Lambda) -> Result<Mapper> {
        self.with_expression(merge(self.original_expression(), extension)?)
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("id", &self.0.id)
            .field("expression", &self.0.expression)
            .finish()
    }
}

/// A mapper whose identity exists before its expression.
///
/// The expression is supplied exactly once through
/// [`MapperRef::use_expression`]. Until then the reference can be embedded in
/// other mapping expressions, which is how a mapper refers to itself.
#[derive(Clone)]
pub struct MapperRef(Arc<MapperSlot>);

struct MapperSlot {
    id: MapperId,
    input_type: Type,
    output_type: Type,
    pipeline: TransformPipeline,
    mapper: OnceLock<Mapper>,
}

impl MapperRef {
    pub fn new(input_type: Type, output_type: Type) -> Self {
        Self::with_pipeline(input_type, output_type, TransformPipeline::default())
    }

    pub fn with_pipeline(input_type: Type, output_type: Type, pipeline: TransformPipeline) -> Self {
        MapperRef(Arc::new(MapperSlot {
            id: MapperId::next(),
            input_type,
            output_type,
            pipeline,
            mapper: OnceLock::new(),
        }))
    }

    pub fn id(&self) -> MapperId {
        self.0.id
    }

    pub fn input_type(&self) -> &Type {
        &self.0.input_type
    }

    pub fn output_type(&self) -> &Type {
        &self.0.output_type
    }

    pub fn get(&self) -> Option<Mapper> {
        self.0.mapper.get().cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.0.mapper.get().is_some()
    }

    /// Supplies the expression. Fails with `ExpressionAlreadyPresent` on any
    /// call after the first successful one.
    pub fn use_expression(&self, expression: Lambda) -> Result<Mapper> {
        if self.is_initialized() {
            return Err(MapError::ExpressionAlreadyPresent);
        }
        let input_type = input_type_of(&expression)?;
        if input_type != self.0.input_type || *expression.return_type() != self.0.output_type {
            return Err(MapError::invalid_argument(
                "expression",
                format!(
                    "maps {} -> {}, the reference is declared {} -> {}",
                    input_type,
                    expression.return_type(),
                    self.0.input_type,
                    self.0.output_type
                ),
            ));
        }
        let mapper = Mapper::build(self.0.id, expression, self.0.pipeline.clone())?;
        self.0
            .mapper
            .set(mapper.clone())
            .map_err(|_| MapError::ExpressionAlreadyPresent)?;
        Ok(mapper)
    }

    pub fn map(&self, input: &Value) -> Result<Value> {
        self.get().ok_or(MapError::NullMapper)?.map(input)
    }
}

impl fmt::Debug for MapperRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapperRef")
            .field("id", &self.0.id)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

//! Mock implementations for testing

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use exprmap_core::{
    ExpressionTransformer, Lambda, MapperResolver, MappingContext, ResolveRequest,
    ResolvedMapper, Result, RunPosition, Type,
};

/// A resolver that records every request and answers with a fixed mapper
/// or mapper reference
#[derive(Debug, Default)]
pub struct RecordingResolver {
    answer: Option<ResolvedMapper>,
    requests: Mutex<Vec<(Type, Type)>>,
}

impl RecordingResolver {
    pub fn answering(mapper: impl Into<ResolvedMapper>) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(mapper.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn requests(&self) -> Vec<(Type, Type)> {
        self.requests.lock().unwrap().clone()
    }
}

impl MapperResolver for RecordingResolver {
    fn resolve(&self, request: &ResolveRequest<'_>) -> Option<ResolvedMapper> {
        self.requests
            .lock()
            .unwrap()
            .push((request.input_type.clone(), request.output_type.clone()));
        self.answer.clone()
    }
}

/// An expression transformer that counts its invocations and leaves the
/// expression unchanged
#[derive(Debug, Default)]
pub struct CountingTransformer {
    position: RunPosition,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl CountingTransformer {
    pub fn at(position: RunPosition) -> Arc<Self> {
        Arc::new(Self {
            position,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Renderings of the expressions this transformer was given
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl ExpressionTransformer for CountingTransformer {
    fn transform(&self, expression: &Lambda, _cx: &MappingContext) -> Result<Lambda> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(expression.to_string());
        Ok(expression.clone())
    }

    fn position(&self) -> RunPosition {
        self.position
    }
}

pub mod calls;
pub mod compile;
pub mod config;
pub mod errors;
pub mod expr;
pub mod mapper;
pub mod operations;
pub mod query;
pub mod resolver;
pub mod rewrite;
pub mod types;
pub mod value;

pub use compile::{CompiledLambda, Function};
pub use config::{MapperConfig, RewriteOptions};
pub use errors::{ErrorKind, MapError, MergeSide, Result};
pub use expr::{
    Assignment, BinaryOp, Call, Constructor, Expr, ExprKind, ExprRewriter, Lambda, MemberInit,
    UnaryOp,
};
pub use mapper::{ExpressionTransformer, Mapper, MapperId, MapperRef, RunPosition, TransformPipeline};
pub use operations::{Operation, OperationKey, TransformerMarker};
pub use query::Query;
pub use resolver::{MapperRegistry, MapperResolver, ResolveRequest, ResolvedMapper};
pub use rewrite::{
    apply_transformations, merge, substitute, substitute_lambda, CallSiteRewriter,
    CallTransformer, MappingContext, RewriteSettings,
};
pub use types::{Capability, FunctionType, Member, SequenceKind, Type};
pub use value::{Object, Sequence, Value};

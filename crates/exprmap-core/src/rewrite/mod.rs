//! Tree rewrites: parameter substitution, construction merging, mapper
//! inlining and call-site dispatch.

pub mod context;
pub mod driver;
pub mod inline;
pub mod merge;
pub mod substitute;
pub mod transformers;

pub use context::MappingContext;
pub use driver::{apply_transformations, CallSiteRewriter, RewriteSettings};
pub use merge::merge;
pub use substitute::{substitute, substitute_lambda};
pub use transformers::CallTransformer;

use std::fmt;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Coarse classification of a [`MapError`], mirroring the exception classes
/// callers of a mapping library usually branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidOperation,
    NotSupported,
    Config,
}

/// Which side of a merge an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeSide {
    Source,
    Extension,
}

impl fmt::Display for MergeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeSide::Source => write!(f, "source"),
            MergeSide::Extension => write!(f, "extension"),
        }
    }
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("Invalid argument `{argument}`: {message}")]
    InvalidArgument {
        argument: &'static str,
        message: String,
    },

    #[error("The {side} expression does not have a construction body")]
    InvalidTreeShape { side: MergeSide },

    #[error("Unable to resolve the mapper for the expression `{call}`")]
    UnresolvedMapper { call: String },

    #[error(
        "Original value requested for `{member}` with no fallback and no corresponding source assignment"
    )]
    OriginalValueMissing { member: String },

    #[error("Original value can only be used inside an expression given to merge")]
    OriginalValueOutsideMerge,

    #[error("The mapper is null")]
    NullMapper,

    #[error("Recursive mapper inclusion is not allowed")]
    RecursiveMapper,

    #[error("Failed to instantiate transformer `{transformer}` declared on `{operation}`")]
    TransformerInstantiation {
        transformer: &'static str,
        operation: String,
        #[source]
        source: BoxError,
    },

    #[error("Multiple transformer markers on one operation is unsupported: `{operation}`")]
    MultipleTransformerMarkers { operation: String },

    #[error("Cannot find a projection for collection type `{ty}`")]
    UnsupportedCollection { ty: String },

    #[error("An expression is already present")]
    ExpressionAlreadyPresent,

    #[error("`{operation}` should only be used in mapping expressions, or its transformer has not been applied")]
    PlaceholderInvoked { operation: String },

    #[error("Lambda parameter `{name}` was rewritten to a non-parameter expression")]
    InvalidParameterRewrite { name: String },

    #[error("Null reference while evaluating `{context}`")]
    NullReference { context: String },

    #[error("Type mismatch in `{context}`: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: String,
        found: String,
    },

    #[error("Object of type `{ty}` has no field `{field}`")]
    MissingField { ty: String, field: String },

    #[error("Parameter `{name}` is not bound in this scope")]
    UnboundParameter { name: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MapError {
    pub(crate) fn invalid_argument(argument: &'static str, message: impl Into<String>) -> Self {
        MapError::InvalidArgument {
            argument,
            message: message.into(),
        }
    }

    pub(crate) fn type_mismatch(
        context: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        MapError::TypeMismatch {
            context: context.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MapError::InvalidArgument { .. } | MapError::InvalidTreeShape { .. } => {
                ErrorKind::InvalidArgument
            }
            MapError::UnsupportedCollection { .. } => ErrorKind::NotSupported,
            MapError::Config(_) | MapError::Io(_) => ErrorKind::Config,
            MapError::UnresolvedMapper { .. }
            | MapError::OriginalValueMissing { .. }
            | MapError::OriginalValueOutsideMerge
            | MapError::NullMapper
            | MapError::RecursiveMapper
            | MapError::TransformerInstantiation { .. }
            | MapError::MultipleTransformerMarkers { .. }
            | MapError::ExpressionAlreadyPresent
            | MapError::PlaceholderInvoked { .. }
            | MapError::InvalidParameterRewrite { .. }
            | MapError::NullReference { .. }
            | MapError::TypeMismatch { .. }
            | MapError::MissingField { .. }
            | MapError::UnboundParameter { .. } => ErrorKind::InvalidOperation,
        }
    }
}

pub type Result<T> = std::result::Result<T, MapError>;

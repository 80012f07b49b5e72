use crate::dtype::DType;
use crate::param::ParamId;
use crate::shape::Shape;

/// Enumeration representing the various errors that can occur within belief.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BeliefError {
    /// Hyperparameter out of its valid range, reported at construction
    #[error("Invalid config: {0}")]
    InvalidConfig(Box<str>),
    /// Gradient is not stored in dense layout
    #[error("Gradient of parameter {param} is not dense, sparse gradients are not supported")]
    UnsupportedGradientLayout {
        /// Parameter carrying the gradient
        param: ParamId,
    },
    /// Two tensors that must agree in shape do not
    #[error("Shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch {
        /// Expected shape
        expected: Shape,
        /// Found shape
        found: Shape,
    },
    /// Unexpected dtype found
    #[error("Wrong dtype: expected {expected}, found {found}")]
    DTypeMismatch {
        /// Expected dtype
        expected: DType,
        /// Found dtype
        found: DType,
    },
    /// Handle does not point into the parameter store
    #[error("Parameter {param} is not in the parameter store")]
    UnknownParameter {
        /// Offending handle
        param: ParamId,
    },
    /// Parameter registered in more than one group
    #[error("Parameter {param} appears in more than one parameter group")]
    DuplicateParameter {
        /// Offending handle
        param: ParamId,
    },
}

impl BeliefError {
    /// Invalid config error with caller location appended,
    /// so that the failing check can be found quickly.
    #[track_caller]
    pub fn invalid_config(e: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        let mut e: String = e.into();
        e.push_str(&format!(", {}:{}", location.file(), location.line()));
        Self::InvalidConfig(e.into())
    }
}

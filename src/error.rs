use derive_more::Display;

/// Errors returned by the permutation, permuter, and realignment operations.
///
/// These are deterministic. An operation that fails leaves its inputs untouched, retrying with the same arguments will fail again.
#[derive(Clone, Debug, Display, Eq, PartialEq, thiserror::Error)]
pub enum PermutationError {
    /// A size, swap count, index list, or class is outside of its valid domain.
    #[display(fmt = "invalid argument: {}", _0)]
    InvalidArgument(String),
    /// A permutation length does not match the flattened image size or feature count, or weight arrays do not have the expected layout.
    #[display(fmt = "shape mismatch: {}", _0)]
    ShapeMismatch(String),
}

impl PermutationError {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
    pub(crate) fn shape_mismatch(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }
    /// Whether this is [`InvalidArgument`](Self::InvalidArgument).
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
    /// Whether this is [`ShapeMismatch`](Self::ShapeMismatch).
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, Self::ShapeMismatch(_))
    }
}

impl From<ndarray::ShapeError> for PermutationError {
    fn from(error: ndarray::ShapeError) -> Self {
        Self::shape_mismatch(error.to_string())
    }
}

/// Result of the typed core operations.
pub type PermutationResult<T> = Result<T, PermutationError>;

//! Error types for collection views.

/// Result type alias for view operations.
pub type Result<T> = std::result::Result<T, ViewError>;

/// Errors that can occur while querying or synchronizing a view.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewError {
    /// A flat index outside `[0, count)`.
    #[error("index {index} is out of range for a view of {count} items")]
    IndexOutOfRange { index: usize, count: usize },

    /// Two values that do not support ordering met at a sort level.
    #[error("cannot order {left} against {right} at sort level {level}")]
    NotComparable {
        level: usize,
        left: String,
        right: String,
    },

    /// A group id that is not part of the view's top-level groups.
    #[error("group is not a top-level group of this view")]
    GroupNotFound,

    /// The mirror, group tree and index mapping disagree.
    #[error("view state is inconsistent: {0}")]
    Inconsistent(String),
}

impl ViewError {
    /// Create an out-of-range error.
    pub fn out_of_range(index: usize, count: usize) -> Self {
        Self::IndexOutOfRange { index, count }
    }

    /// Create a comparison error.
    pub fn not_comparable(level: usize, left: impl Into<String>, right: impl Into<String>) -> Self {
        Self::NotComparable {
            level,
            left: left.into(),
            right: right.into(),
        }
    }

    /// Create an internal-consistency error.
    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::Inconsistent(message.into())
    }
}

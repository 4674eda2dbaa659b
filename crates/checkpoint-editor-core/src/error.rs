//! Error types for local edit operations.

use thiserror::Error;

/// Errors raised by edits against the local draft.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EditError {
    /// A step index does not exist in the current list.
    #[error("step index {index} is out of bounds (len: {len})")]
    IndexOutOfBounds { index: usize, len: usize },
}

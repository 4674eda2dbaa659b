//! Error types for edit sessions.

use checkpoint_editor_core::{ChainId, EditError};
use miette::Diagnostic;
use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by sessions, views and their writes.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
#[non_exhaustive]
pub enum SyncError {
    /// The chain does not exist. Terminal for the session.
    #[error("chain {0} not found")]
    #[diagnostic(code(checkpoint::not_found))]
    NotFound(ChainId),

    /// The current user does not own the chain.
    #[error("only the owner can edit chain {0}")]
    #[diagnostic(
        code(checkpoint::not_owner),
        help("sign in as the chain's owner to edit or complete steps")
    )]
    NotOwner(ChainId),

    /// The session was closed; no further edits are accepted.
    #[error("edit session is closed")]
    #[diagnostic(code(checkpoint::closed))]
    Closed,

    /// A remote call did not finish in time.
    #[error("{operation} timed out")]
    #[diagnostic(code(checkpoint::timeout))]
    Timeout { operation: &'static str },

    /// The remote store reported a failure.
    #[error(transparent)]
    #[diagnostic(code(checkpoint::store))]
    Store(#[from] StoreError),

    /// The edit itself was invalid.
    #[error(transparent)]
    #[diagnostic(code(checkpoint::edit))]
    Edit(#[from] EditError),

    /// A write task was cancelled before it reported back.
    #[error("write was cancelled")]
    #[diagnostic(code(checkpoint::cancelled))]
    Cancelled,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    #[diagnostic(code(checkpoint::config))]
    Config(String),
}

impl SyncError {
    /// Map a store error, promoting `NotFound` to the session-level variant.
    pub(crate) fn from_store(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(id) => SyncError::NotFound(id),
            other => SyncError::Store(other),
        }
    }
}

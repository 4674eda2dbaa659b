//! Remote document store abstraction.
//!
//! The store is authoritative. Reads and partial writes are async; changes
//! are pushed through a subscription that also echoes the local client's
//! own writes.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use checkpoint_editor_core::{Chain, ChainId, ChainPatch};
use parking_lot::Mutex;
use thiserror::Error;

/// Errors reported by a [`RemoteStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    /// The document does not exist.
    #[error("chain {0} not found")]
    NotFound(ChainId),

    /// The store refused the write.
    #[error("write rejected: {0}")]
    Rejected(String),

    /// Transport-level failure.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Callback invoked with the current document on every change.
pub type ChangeCallback = Arc<dyn Fn(Chain) + Send + Sync + 'static>;

/// Authoritative document store.
pub trait RemoteStore: Send + Sync + 'static {
    /// Point read.
    fn get(&self, id: &ChainId) -> impl Future<Output = Result<Chain, StoreError>> + Send;

    /// Shallow-merge `patch` over the stored document, stamp `updated_at`,
    /// and return the resulting document.
    fn update(
        &self,
        id: &ChainId,
        patch: ChainPatch,
    ) -> impl Future<Output = Result<Chain, StoreError>> + Send;

    /// Deliver the current document immediately (if it exists) and again on
    /// every subsequent change, until the returned guard is dropped.
    fn subscribe(&self, id: &ChainId, on_change: ChangeCallback) -> Subscription;
}

type Unsubscribe = Box<dyn FnOnce() + Send + 'static>;

/// Guard for a live subscription. Unsubscribes exactly once, on
/// [`Subscription::cancel`] or on drop.
pub struct Subscription {
    unsubscribe: Mutex<Option<Unsubscribe>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Mutex::new(Some(Box::new(unsubscribe))),
        }
    }

    pub fn cancel(&self) {
        let unsubscribe = self.unsubscribe.lock().take();
        if let Some(unsubscribe) = unsubscribe {
            unsubscribe();
        }
    }

    pub fn is_active(&self) -> bool {
        self.unsubscribe.lock().is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

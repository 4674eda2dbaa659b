//! Read-only chain page with the owner's completion shortcut.

use std::sync::Arc;

use checkpoint_editor_core::{Chain, ChainId, ChainPatch, UserId, cascade};

use crate::collaborators::{Identity, Route};
use crate::error::SyncError;
use crate::store::RemoteStore;

/// A loaded chain as seen by `viewer`.
///
/// Unlike [`crate::EditSession`] there is no subscription or debounce: the
/// only write is [`ChainView::complete_through`], awaited in place.
pub struct ChainView<S: RemoteStore> {
    store: Arc<S>,
    chain: Chain,
    viewer: Option<UserId>,
}

impl<S: RemoteStore> ChainView<S> {
    pub async fn load(
        store: Arc<S>,
        id: &ChainId,
        identity: &dyn Identity,
    ) -> Result<Self, SyncError> {
        let chain = store.get(id).await.map_err(SyncError::from_store)?;
        Ok(Self {
            store,
            chain,
            viewer: identity.current_user(),
        })
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn is_owner(&self) -> bool {
        self.viewer
            .as_ref()
            .is_some_and(|viewer| self.chain.is_owned_by(viewer))
    }

    /// Mark steps `0..=index` complete and the rest incomplete.
    ///
    /// Returns `Ok(false)` without writing when the viewer is not the owner.
    /// The local copy is updated before the write, and stays updated if the
    /// write fails.
    pub async fn complete_through(&mut self, index: usize) -> Result<bool, SyncError> {
        if !self.is_owner() {
            tracing::debug!(chain = %self.chain.id, "ignoring completion from non-owner");
            return Ok(false);
        }
        let next = cascade(&self.chain.checkpoints, index)?;
        self.chain.checkpoints = next.clone();

        let updated = self
            .store
            .update(&self.chain.id, ChainPatch::checkpoints(next))
            .await
            .map_err(SyncError::from_store)?;
        self.chain = updated;
        Ok(true)
    }

    /// Where the owner goes to edit this chain. `None` for anyone else.
    pub fn edit_route(&self) -> Option<Route> {
        self.is_owner()
            .then(|| Route::ChainEdit(self.chain.id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use checkpoint_editor_core::{EditError, Step};

    use super::*;
    use crate::collaborators::StaticIdentity;
    use crate::memory::MemoryStore;
    use crate::store::StoreError;

    fn seeded() -> (Arc<MemoryStore>, Chain) {
        let store = Arc::new(MemoryStore::new());
        let chain = store.create_with_steps(
            UserId::new("owner"),
            "Climb",
            vec![Step::new("a"), Step::new("b"), Step::new("c")],
        );
        (store, chain)
    }

    #[tokio::test]
    async fn test_owner_completes_prefix() {
        let (store, chain) = seeded();
        let mut view = ChainView::load(store.clone(), &chain.id, &StaticIdentity::signed_in("owner"))
            .await
            .unwrap();
        assert!(view.is_owner());

        assert!(view.complete_through(1).await.unwrap());
        let done: Vec<bool> = view.chain().checkpoints.iter().map(|s| s.completed).collect();
        assert_eq!(done, vec![true, true, false]);
        assert_eq!(store.get(&chain.id).await.unwrap().checkpoints, view.chain().checkpoints);
    }

    #[tokio::test]
    async fn test_non_owner_is_ignored() {
        let (store, chain) = seeded();
        for identity in [StaticIdentity::anonymous(), StaticIdentity::signed_in("other")] {
            let mut view = ChainView::load(store.clone(), &chain.id, &identity)
                .await
                .unwrap();
            assert!(!view.is_owner());
            assert_eq!(view.edit_route(), None);
            assert!(!view.complete_through(0).await.unwrap());
        }
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_and_missing() {
        let (store, chain) = seeded();
        let owner = StaticIdentity::signed_in("owner");
        let mut view = ChainView::load(store.clone(), &chain.id, &owner).await.unwrap();
        assert_eq!(
            view.complete_through(3).await,
            Err(SyncError::Edit(EditError::IndexOutOfBounds { index: 3, len: 3 }))
        );
        assert_eq!(view.edit_route(), Some(Route::ChainEdit(chain.id.clone())));

        let missing = ChainId::new("nope");
        assert!(matches!(
            ChainView::load(store, &missing, &owner).await,
            Err(SyncError::NotFound(id)) if id == missing
        ));
    }

    #[tokio::test]
    async fn test_failed_write_keeps_local_completion() {
        let (store, chain) = seeded();
        store.fail_next_update(StoreError::Unavailable("offline".into()));
        let mut view = ChainView::load(store.clone(), &chain.id, &StaticIdentity::signed_in("owner"))
            .await
            .unwrap();

        assert!(view.complete_through(0).await.is_err());
        assert!(view.chain().checkpoints[0].completed);
        assert!(!store.get(&chain.id).await.unwrap().checkpoints[0].completed);
    }
}

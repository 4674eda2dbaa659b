//! In-process [`RemoteStore`] implementation.
//!
//! Behaves like a push-capable document database: every accepted write is
//! stamped and fanned out to the document's subscribers, the writer's own
//! subscription included. Also carries the chain directory operations
//! (create, lookup by share code, per-owner listing) and a few knobs for
//! exercising slow or failing writes.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use std::time::Duration;

use checkpoint_editor_core::{Chain, ChainId, ChainPatch, Step, UserId};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::Rng;
use rand::distr::Alphanumeric;
use smol_str::SmolStr;

use crate::store::{ChangeCallback, RemoteStore, StoreError, Subscription};

const ID_LEN: usize = 20;
const CODE_LEN: usize = 8;

#[derive(Default)]
struct Inner {
    chains: HashMap<ChainId, Chain>,
    subscribers: HashMap<ChainId, Vec<(u64, ChangeCallback)>>,
    next_subscriber: u64,
    last_stamp: Option<DateTime<Utc>>,
    writes: Vec<(ChainId, ChainPatch)>,
    attempts: usize,
    latency: Option<Duration>,
    failures: VecDeque<StoreError>,
}

impl Inner {
    /// Strictly increasing write timestamp.
    fn next_stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + chrono::Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    fn callbacks(&self, id: &ChainId) -> Vec<ChangeCallback> {
        self.subscribers
            .get(id)
            .map(|subs| subs.iter().map(|(_, cb)| cb.clone()).collect())
            .unwrap_or_default()
    }
}

fn random_token(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Shared in-memory chain store. Cloning shares the same documents.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty, private chain owned by `owner`.
    pub fn create(&self, owner: UserId, title: impl Into<String>) -> Chain {
        self.create_with_steps(owner, title, Vec::new())
    }

    /// Create a chain with initial steps.
    pub fn create_with_steps(
        &self,
        owner: UserId,
        title: impl Into<String>,
        checkpoints: Vec<Step>,
    ) -> Chain {
        let mut inner = self.inner.lock();
        let stamp = inner.next_stamp();
        let chain = Chain {
            id: ChainId::new(random_token(ID_LEN)),
            owner_id: owner,
            title: title.into(),
            checkpoints,
            is_public: false,
            code: SmolStr::new(random_token(CODE_LEN)),
            created_at: stamp,
            updated_at: stamp,
        };
        inner.chains.insert(chain.id.clone(), chain.clone());
        tracing::debug!(chain = %chain.id, owner = %chain.owner_id, "chain created");
        chain
    }

    /// Look a chain up by its share code.
    pub fn find_by_code(&self, code: &str) -> Option<Chain> {
        self.inner
            .lock()
            .chains
            .values()
            .find(|c| c.code == code)
            .cloned()
    }

    /// All chains owned by `owner`, newest first.
    pub fn list_for_owner(&self, owner: &UserId) -> Vec<Chain> {
        let mut chains: Vec<Chain> = self
            .inner
            .lock()
            .chains
            .values()
            .filter(|c| &c.owner_id == owner)
            .cloned()
            .collect();
        chains.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        chains
    }

    /// Delay every subsequent write by `latency` before it is applied.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.inner.lock().latency = latency;
    }

    /// Make the next write fail with `error` instead of being applied.
    pub fn fail_next_update(&self, error: StoreError) {
        self.inner.lock().failures.push_back(error);
    }

    /// Accepted writes, in commit order.
    pub fn writes(&self) -> Vec<(ChainId, ChainPatch)> {
        self.inner.lock().writes.clone()
    }

    /// Accepted writes for one chain.
    pub fn writes_for(&self, id: &ChainId) -> Vec<ChainPatch> {
        self.inner
            .lock()
            .writes
            .iter()
            .filter(|(target, _)| target == id)
            .map(|(_, patch)| patch.clone())
            .collect()
    }

    /// Number of `update` calls, accepted or not.
    pub fn attempts(&self) -> usize {
        self.inner.lock().attempts
    }

    pub fn subscriber_count(&self, id: &ChainId) -> usize {
        self.inner
            .lock()
            .subscribers
            .get(id)
            .map_or(0, |subs| subs.len())
    }

    fn unsubscribe(inner: &Weak<Mutex<Inner>>, id: &ChainId, token: u64) {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let mut inner = inner.lock();
        if let Some(subs) = inner.subscribers.get_mut(id) {
            subs.retain(|(t, _)| *t != token);
            if subs.is_empty() {
                inner.subscribers.remove(id);
            }
        }
    }
}

impl RemoteStore for MemoryStore {
    async fn get(&self, id: &ChainId) -> Result<Chain, StoreError> {
        self.inner
            .lock()
            .chains
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn update(&self, id: &ChainId, patch: ChainPatch) -> Result<Chain, StoreError> {
        let latency = self.inner.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let (chain, callbacks) = {
            let mut inner = self.inner.lock();
            inner.attempts += 1;
            if let Some(error) = inner.failures.pop_front() {
                tracing::debug!(chain = %id, %error, "injected write failure");
                return Err(error);
            }

            let stamp = inner.next_stamp();
            let chain = {
                let chain = inner
                    .chains
                    .get_mut(id)
                    .ok_or_else(|| StoreError::NotFound(id.clone()))?;
                patch.apply_to(chain);
                chain.updated_at = stamp;
                chain.clone()
            };
            inner.writes.push((id.clone(), patch));
            (chain, inner.callbacks(id))
        };

        // Fan out without holding the lock; subscribers may call back in.
        for callback in callbacks {
            callback(chain.clone());
        }
        Ok(chain)
    }

    fn subscribe(&self, id: &ChainId, on_change: ChangeCallback) -> Subscription {
        let (token, current) = {
            let mut inner = self.inner.lock();
            let token = inner.next_subscriber;
            inner.next_subscriber += 1;
            inner
                .subscribers
                .entry(id.clone())
                .or_default()
                .push((token, on_change.clone()));
            (token, inner.chains.get(id).cloned())
        };

        if let Some(chain) = current {
            on_change(chain);
        }

        let weak = Arc::downgrade(&self.inner);
        let id = id.clone();
        Subscription::new(move || Self::unsubscribe(&weak, &id, token))
    }
}

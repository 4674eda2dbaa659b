//! The edit session: local draft, merge suppression, and write scheduling.
//!
//! ## Sync flow
//!
//! 1. **Open**: read the chain, check ownership, subscribe. The subscription
//!    delivers the current document immediately and on every change,
//!    including echoes of our own writes.
//! 2. **Inbound snapshot**: each field is adopted only while its
//!    [`FieldSync`] is `Clean`; a field with a local edit pending or in
//!    flight keeps its local value. Title and checkpoints merge
//!    independently.
//! 3. **Typing** (title, step text): record undo, update the draft, mark
//!    the field `LocalPending`, re-arm that field's debounce timer. On
//!    expiry the *current* value is written and the field moves to `Saving`.
//! 4. **Structural edits** (add, cascade, reorder, undo/redo): record undo,
//!    update the draft, write immediately. Any armed timer for the written
//!    fields is cancelled since the write already carries their latest value.
//! 5. **Write resolved**: a field returns to `Clean` only once its newest
//!    write has landed. It is then reconciled with whichever is newer: the
//!    document returned by the write or the last snapshot seen. A failed
//!    write also reopens the field but leaves the local value in place
//!    until the next snapshot, and flips the save indicator to `Error`.
//! 6. **Close**: unsubscribe and cancel every pending timer. Edits still
//!    waiting for their debounce window are discarded.

use std::sync::{Arc, Weak};

use checkpoint_editor_core::{
    Chain, ChainId, ChainPatch, Draft, DragResult, EditError, Field, FieldSync, HistoryCommand,
    KeyBindings, KeyEvent, SaveStatus, Step, UndoStack, UserId, WriteTicket, cascade, move_step,
};
use parking_lot::{Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::collaborators::{Identity, Navigator, Route};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::persister::DebouncedPersister;
use crate::status::SaveTracker;
use crate::store::{RemoteStore, Subscription};

const WRITES_ISSUED: &str = "checkpoint_writes_issued_total";
const WRITES_FAILED: &str = "checkpoint_writes_failed_total";
const SNAPSHOTS_ADOPTED: &str = "checkpoint_snapshot_fields_adopted_total";
const SNAPSHOTS_SUPPRESSED: &str = "checkpoint_snapshot_fields_suppressed_total";

/// Stable keyboard handler for a session. Returns whether the event was
/// consumed.
pub type KeyHandler = Arc<dyn Fn(&KeyEvent) -> bool + Send + Sync + 'static>;

/// A remote write that has been issued. Dropping it does not cancel the
/// write; awaiting it reports the outcome.
#[derive(Debug)]
pub struct PendingWrite {
    handle: JoinHandle<Result<(), SyncError>>,
}

impl PendingWrite {
    pub async fn wait(self) -> Result<(), SyncError> {
        match self.handle.await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Cancelled),
        }
    }
}

struct SessionState {
    draft: Draft,
    fields: [FieldSync; 2],
    history: UndoStack,
    persister: DebouncedPersister,
    tracker: SaveTracker,
    last_remote: Option<Chain>,
    last_ticket: WriteTicket,
    subscription: Option<Subscription>,
    closed: bool,
}

impl SessionState {
    fn next_ticket(&mut self) -> WriteTicket {
        self.last_ticket += 1;
        self.last_ticket
    }

    fn field(&mut self, field: Field) -> &mut FieldSync {
        &mut self.fields[field.index()]
    }

    fn set_patch_field(&self, patch: &mut ChainPatch, field: Field) {
        match field {
            Field::Title => patch.title = Some(self.draft.title.clone()),
            Field::Checkpoints => patch.checkpoints = Some(self.draft.checkpoints.clone()),
        }
    }

    fn adopt(&mut self, field: Field, chain: &Chain) {
        match field {
            Field::Title => self.draft.title = chain.title.clone(),
            Field::Checkpoints => self.draft.checkpoints = chain.checkpoints.clone(),
        }
    }

    /// Remember `chain` as the latest remote view unless it is older than
    /// what we already have.
    fn observe(&mut self, chain: &Chain) -> bool {
        match &self.last_remote {
            Some(seen) if seen.updated_at > chain.updated_at => false,
            _ => {
                self.last_remote = Some(chain.clone());
                true
            }
        }
    }
}

struct Shared<S> {
    id: ChainId,
    owner: UserId,
    store: Arc<S>,
    identity: Arc<dyn Identity>,
    config: SyncConfig,
    bindings: KeyBindings,
    runtime: Handle,
    state: Mutex<SessionState>,
}

impl<S: RemoteStore> Shared<S> {
    fn lock_open(&self) -> Result<MutexGuard<'_, SessionState>, SyncError> {
        let state = self.state.lock();
        if state.closed {
            return Err(SyncError::Closed);
        }
        Ok(state)
    }

    fn is_owner(&self) -> bool {
        self.identity.current_user().as_ref() == Some(&self.owner)
    }

    fn apply_remote(&self, chain: Chain) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.closed {
            return;
        }
        if !state.observe(&chain) {
            tracing::debug!(chain = %self.id, "ignoring out-of-order snapshot");
            return;
        }

        for field in Field::ALL {
            if state.fields[field.index()].accepts_remote() {
                state.adopt(field, &chain);
                metrics::counter!(SNAPSHOTS_ADOPTED, "field" => field.as_str()).increment(1);
            } else {
                tracing::trace!(chain = %self.id, %field, "suppressing remote value during local edit");
                metrics::counter!(SNAPSHOTS_SUPPRESSED, "field" => field.as_str()).increment(1);
            }
        }
    }

    // ---- edits ----------------------------------------------------------

    fn set_title(self: &Arc<Self>, title: String) -> Result<(), SyncError> {
        let mut guard = self.lock_open()?;
        let state = &mut *guard;
        state.history.record(&state.draft);
        state.draft.title = title;
        state.field(Field::Title).begin_edit();
        self.schedule(state, Field::Title);
        Ok(())
    }

    fn set_step_text(self: &Arc<Self>, index: usize, text: String) -> Result<(), SyncError> {
        let mut guard = self.lock_open()?;
        let state = &mut *guard;
        let len = state.draft.checkpoints.len();
        if index >= len {
            return Err(EditError::IndexOutOfBounds { index, len }.into());
        }
        state.history.record(&state.draft);
        state.draft.checkpoints[index].text = text;
        state.field(Field::Checkpoints).begin_edit();
        self.schedule(state, Field::Checkpoints);
        Ok(())
    }

    fn add_step(self: &Arc<Self>) -> Result<PendingWrite, SyncError> {
        let mut guard = self.lock_open()?;
        let state = &mut *guard;
        state.history.record(&state.draft);
        let position = state.draft.checkpoints.len() + 1;
        state.draft.checkpoints.push(Step::placeholder(position));
        Ok(self.persist_now(state, &[Field::Checkpoints]))
    }

    fn toggle(self: &Arc<Self>, index: usize) -> Result<PendingWrite, SyncError> {
        let mut guard = self.lock_open()?;
        if !self.is_owner() {
            tracing::warn!(chain = %self.id, "completion toggle refused for non-owner");
            return Err(SyncError::NotOwner(self.id.clone()));
        }
        let state = &mut *guard;
        let next = cascade(&state.draft.checkpoints, index)?;
        state.history.record(&state.draft);
        state.draft.checkpoints = next;
        Ok(self.persist_now(state, &[Field::Checkpoints]))
    }

    fn move_step(
        self: &Arc<Self>,
        from: usize,
        to: Option<usize>,
    ) -> Result<Option<PendingWrite>, SyncError> {
        let mut guard = self.lock_open()?;
        let state = &mut *guard;
        let Some(next) = move_step(&state.draft.checkpoints, from, to) else {
            return Ok(None);
        };
        state.history.record(&state.draft);
        state.draft.checkpoints = next;
        Ok(Some(self.persist_now(state, &[Field::Checkpoints])))
    }

    fn undo(self: &Arc<Self>) -> Result<Option<PendingWrite>, SyncError> {
        let mut guard = self.lock_open()?;
        let state = &mut *guard;
        let Some(prev) = state.history.undo(&state.draft) else {
            return Ok(None);
        };
        state.draft = prev;
        Ok(Some(self.persist_now(state, &Field::ALL)))
    }

    fn redo(self: &Arc<Self>) -> Result<Option<PendingWrite>, SyncError> {
        let mut guard = self.lock_open()?;
        let state = &mut *guard;
        let Some(next) = state.history.redo(&state.draft) else {
            return Ok(None);
        };
        state.draft = next;
        Ok(Some(self.persist_now(state, &Field::ALL)))
    }

    /// Write every field whose debounce window is still open, right now.
    fn flush(self: &Arc<Self>) -> Result<Option<PendingWrite>, SyncError> {
        let mut guard = self.lock_open()?;
        let state = &mut *guard;
        let mut patch = ChainPatch::default();
        let mut tickets = Vec::new();
        for field in Field::ALL {
            state.persister.cancel(field);
            if !state.fields[field.index()].is_pending() {
                continue;
            }
            let ticket = state.next_ticket();
            state.field(field).debounce_fired(ticket);
            state.set_patch_field(&mut patch, field);
            tickets.push((field, ticket));
        }
        if tickets.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.spawn_write(state, patch, tickets)))
    }

    fn handle_key(self: &Arc<Self>, event: &KeyEvent) -> bool {
        let Some(command) = self.bindings.resolve(event) else {
            return false;
        };
        let result = match command {
            HistoryCommand::Undo => self.undo(),
            HistoryCommand::Redo => self.redo(),
        };
        result.is_ok()
    }

    // ---- persistence ----------------------------------------------------

    fn schedule(self: &Arc<Self>, state: &mut SessionState, field: Field) {
        let shared: Weak<Self> = Arc::downgrade(self);
        state
            .persister
            .arm(field, self.config.debounce(), move |generation| async move {
                if let Some(shared) = shared.upgrade() {
                    shared.debounce_elapsed(field, generation);
                }
            });
    }

    fn debounce_elapsed(self: &Arc<Self>, field: Field, generation: u64) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.closed || !state.persister.disarm(field, generation) {
            return;
        }
        let ticket = state.next_ticket();
        if !state.field(field).debounce_fired(ticket) {
            return;
        }
        let mut patch = ChainPatch::default();
        state.set_patch_field(&mut patch, field);
        tracing::debug!(chain = %self.id, %field, "debounce window elapsed, writing");
        // Fire-and-forget: the outcome lands in the field state and status.
        let _write = self.spawn_write(state, patch, vec![(field, ticket)]);
    }

    fn persist_now(self: &Arc<Self>, state: &mut SessionState, fields: &[Field]) -> PendingWrite {
        let mut patch = ChainPatch::default();
        let mut tickets = Vec::with_capacity(fields.len());
        for &field in fields {
            state.persister.cancel(field);
            let ticket = state.next_ticket();
            state.field(field).begin_immediate(ticket);
            state.set_patch_field(&mut patch, field);
            tickets.push((field, ticket));
        }
        self.spawn_write(state, patch, tickets)
    }

    fn spawn_write(
        self: &Arc<Self>,
        state: &mut SessionState,
        patch: ChainPatch,
        tickets: Vec<(Field, WriteTicket)>,
    ) -> PendingWrite {
        let seq = state.tracker.begin();
        metrics::counter!(WRITES_ISSUED).increment(1);
        tracing::debug!(
            chain = %self.id,
            title = patch.title.is_some(),
            checkpoints = patch.checkpoints.is_some(),
            "issuing write"
        );

        let shared = Arc::clone(self);
        let handle = self.runtime.spawn(async move {
            let result = shared.send(patch).await;
            shared.write_finished(seq, &tickets, result)
        });
        PendingWrite { handle }
    }

    async fn send(&self, patch: ChainPatch) -> Result<Chain, SyncError> {
        let update = self.store.update(&self.id, patch);
        let result = match self.config.write_timeout() {
            Some(limit) => tokio::time::timeout(limit, update)
                .await
                .map_err(|_| SyncError::Timeout { operation: "write" })?,
            None => update.await,
        };
        result.map_err(SyncError::from_store)
    }

    fn write_finished(
        self: &Arc<Self>,
        seq: u64,
        tickets: &[(Field, WriteTicket)],
        result: Result<Chain, SyncError>,
    ) -> Result<(), SyncError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        match result {
            Ok(chain) => {
                state.observe(&chain);
                let newest = state.last_remote.clone().unwrap_or(chain);
                for &(field, ticket) in tickets {
                    if state.field(field).write_resolved(ticket) && !state.closed {
                        state.adopt(field, &newest);
                    }
                }
                if let Some(epoch) = state.tracker.succeeded(seq) {
                    self.linger(epoch);
                }
                Ok(())
            }
            Err(error) => {
                tracing::warn!(chain = %self.id, %error, "write failed; keeping local state");
                metrics::counter!(WRITES_FAILED).increment(1);
                for &(field, ticket) in tickets {
                    state.field(field).write_failed(ticket);
                }
                state.tracker.failed(seq, error.to_string());
                Err(error)
            }
        }
    }

    fn linger(self: &Arc<Self>, epoch: u64) {
        let shared = Arc::downgrade(self);
        let linger = self.config.saved_linger();
        self.runtime.spawn(async move {
            tokio::time::sleep(linger).await;
            if let Some(shared) = shared.upgrade() {
                shared.state.lock().tracker.linger_elapsed(epoch);
            }
        });
    }

    fn close(&self) {
        let subscription = {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.persister.cancel_all();
            state.subscription.take()
        };
        drop(subscription);
        tracing::info!(chain = %self.id, "edit session closed");
    }
}

/// Editor-side synchronization engine for one chain.
///
/// Edits are applied to the local draft synchronously; their remote writes
/// run on the tokio runtime the session was opened on. Dropping the session
/// closes it.
pub struct EditSession<S: RemoteStore> {
    shared: Arc<Shared<S>>,
    key_handler: KeyHandler,
}

impl<S: RemoteStore> EditSession<S> {
    /// Open `id` for editing.
    ///
    /// Fails with [`SyncError::NotFound`] if the chain does not exist (or the
    /// initial read times out with [`SyncError::Timeout`]), and with
    /// [`SyncError::NotOwner`] unless the current user owns it.
    pub async fn open(
        store: Arc<S>,
        id: ChainId,
        identity: Arc<dyn Identity>,
        config: SyncConfig,
    ) -> Result<Self, SyncError> {
        let read = store.get(&id);
        let chain = match config.load_timeout() {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| SyncError::Timeout { operation: "load" })?,
            None => read.await,
        }
        .map_err(SyncError::from_store)?;

        if identity.current_user().as_ref() != Some(&chain.owner_id) {
            tracing::warn!(chain = %id, "refusing edit session for non-owner");
            return Err(SyncError::NotOwner(id));
        }

        let runtime = Handle::current();
        let state = SessionState {
            draft: chain.draft(),
            fields: Default::default(),
            history: UndoStack::new(config.max_undo_steps),
            persister: DebouncedPersister::new(runtime.clone()),
            tracker: SaveTracker::new(),
            last_remote: None,
            last_ticket: 0,
            subscription: None,
            closed: false,
        };
        let shared = Arc::new(Shared {
            id: id.clone(),
            owner: chain.owner_id.clone(),
            store,
            identity,
            config,
            bindings: KeyBindings::default(),
            runtime,
            state: Mutex::new(state),
        });
        shared.apply_remote(chain);

        let weak = Arc::downgrade(&shared);
        let subscription = shared.store.subscribe(
            &id,
            Arc::new(move |chain: Chain| {
                if let Some(shared) = weak.upgrade() {
                    shared.apply_remote(chain);
                }
            }),
        );
        shared.state.lock().subscription = Some(subscription);

        let weak = Arc::downgrade(&shared);
        let key_handler: KeyHandler = Arc::new(move |event: &KeyEvent| {
            weak.upgrade()
                .is_some_and(|shared| shared.handle_key(event))
        });

        tracing::info!(chain = %id, "edit session opened");
        Ok(Self {
            shared,
            key_handler,
        })
    }

    pub fn id(&self) -> &ChainId {
        &self.shared.id
    }

    // ---- mutations ------------------------------------------------------

    /// Replace the title. Persisted after the debounce window.
    pub fn set_title(&self, title: impl Into<String>) -> Result<(), SyncError> {
        self.shared.set_title(title.into())
    }

    /// Replace one step's text. Persisted after the debounce window.
    pub fn set_step_text(&self, index: usize, text: impl Into<String>) -> Result<(), SyncError> {
        self.shared.set_step_text(index, text.into())
    }

    /// Append `Step {n}` and persist immediately.
    pub fn add_step(&self) -> Result<PendingWrite, SyncError> {
        self.shared.add_step()
    }

    /// Complete every step up to and including `index`, un-complete the
    /// rest, and persist immediately. Owner only.
    pub fn toggle(&self, index: usize) -> Result<PendingWrite, SyncError> {
        self.shared.toggle(index)
    }

    /// Move a step. `Ok(None)` when there is nothing to move.
    pub fn move_step(
        &self,
        from: usize,
        to: Option<usize>,
    ) -> Result<Option<PendingWrite>, SyncError> {
        self.shared.move_step(from, to)
    }

    /// [`EditSession::move_step`] from a drag gesture.
    pub fn apply_drag(&self, drag: DragResult) -> Result<Option<PendingWrite>, SyncError> {
        self.shared.move_step(drag.source, drag.destination)
    }

    /// Restore the previous draft and persist it in full. `Ok(None)` when
    /// there is nothing to undo.
    pub fn undo(&self) -> Result<Option<PendingWrite>, SyncError> {
        self.shared.undo()
    }

    pub fn redo(&self) -> Result<Option<PendingWrite>, SyncError> {
        self.shared.redo()
    }

    /// Skip the remaining debounce window and write pending fields now.
    pub fn flush(&self) -> Result<Option<PendingWrite>, SyncError> {
        self.shared.flush()
    }

    /// The session's keyboard handler. The same handler is returned for the
    /// whole session; it does nothing once the session is closed.
    pub fn key_handler(&self) -> KeyHandler {
        Arc::clone(&self.key_handler)
    }

    // ---- observation ----------------------------------------------------

    pub fn draft(&self) -> Draft {
        self.shared.state.lock().draft.clone()
    }

    pub fn title(&self) -> String {
        self.shared.state.lock().draft.title.clone()
    }

    pub fn checkpoints(&self) -> Vec<Step> {
        self.shared.state.lock().draft.checkpoints.clone()
    }

    pub fn field_state(&self, field: Field) -> FieldSync {
        self.shared.state.lock().fields[field.index()]
    }

    pub fn has_pending_debounce(&self, field: Field) -> bool {
        self.shared.state.lock().persister.is_pending(field)
    }

    pub fn status(&self) -> SaveStatus {
        self.shared.state.lock().tracker.current()
    }

    /// Receiver for save indicator changes.
    pub fn watch_status(&self) -> watch::Receiver<SaveStatus> {
        self.shared.state.lock().tracker.subscribe()
    }

    pub fn can_undo(&self) -> bool {
        self.shared.state.lock().history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.shared.state.lock().history.can_redo()
    }

    pub fn is_owner(&self) -> bool {
        self.shared.is_owner()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    // ---- teardown -------------------------------------------------------

    /// Unsubscribe and cancel pending debounce timers. Idempotent.
    pub fn close(&self) {
        self.shared.close();
    }

    /// Leave without saving pending edits.
    pub fn cancel(self, navigator: &dyn Navigator) {
        self.close();
        navigator.navigate(Route::MyChains);
    }

    /// Persist everything, then leave for the chain's view page.
    ///
    /// Pending debounced edits are flushed. If the last write failed, the
    /// whole draft is written again. The session is closed and navigation
    /// happens only once every write in flight has landed; on error the
    /// session stays open with its draft intact so the save can be retried.
    pub async fn save_and_view(&self, navigator: &dyn Navigator) -> Result<(), SyncError> {
        if let Some(write) = self.flush()? {
            write.wait().await?;
        }
        let retry = {
            let mut guard = self.shared.lock_open()?;
            let state = &mut *guard;
            state
                .tracker
                .current()
                .is_error()
                .then(|| self.shared.persist_now(state, &Field::ALL))
        };
        if let Some(write) = retry {
            write.wait().await?;
        }
        let mut in_flight = self.shared.state.lock().tracker.watch_in_flight();
        if in_flight.wait_for(|n| *n == 0).await.is_err() {
            return Err(SyncError::Cancelled);
        }

        self.close();
        navigator.navigate(Route::ChainView(self.shared.id.clone()));
        Ok(())
    }
}

impl<S: RemoteStore> Drop for EditSession<S> {
    fn drop(&mut self) {
        self.shared.close();
    }
}

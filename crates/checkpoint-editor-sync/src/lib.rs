//! checkpoint-editor-sync: keeps a checkpoint chain editor in step with a
//! remote document store.
//!
//! This crate provides:
//! - `RemoteStore`: the document store seam (get, shallow update, subscribe)
//! - `MemoryStore`: an in-process store with latency and failure injection
//! - `EditSession`: the editor engine, with per-field merge suppression,
//!   debounced text writes, immediate structural writes and undo/redo
//! - `ChainView`: the read-only page with the owner's completion shortcut
//! - `SyncConfig`: session tunables from JSON or `CHECKPOINT_*` variables
//!
//! With the `telemetry` feature, [`telemetry`] installs a console tracing
//! subscriber and a Prometheus recorder.

mod collaborators;
mod config;
mod error;
mod memory;
mod persister;
mod session;
mod status;
mod store;
mod view;

#[cfg(feature = "telemetry")]
pub mod telemetry;

pub use collaborators::{Identity, Navigator, RecordingNavigator, Route, StaticIdentity};
pub use config::SyncConfig;
pub use error::SyncError;
pub use memory::MemoryStore;
pub use persister::DebouncedPersister;
pub use session::{EditSession, KeyHandler, PendingWrite};
pub use store::{ChangeCallback, RemoteStore, StoreError, Subscription};
pub use view::ChainView;

pub use checkpoint_editor_core::{
    Chain, ChainId, ChainPatch, DragResult, Draft, EditError, Field, FieldSync, HistoryCommand,
    KeyBindings, KeyChord, KeyEvent, SaveStatus, Step, UserId,
};

//! checkpoint-editor-core: editing logic for checkpoint chains without any
//! runtime or storage dependency.
//!
//! This crate provides:
//! - `Chain`, `Step`, `ChainPatch`, `Draft` - the document model
//! - `UndoStack` - bounded whole-draft undo/redo
//! - `cascade` / `move_step` - the completion cascade and drag reorder
//! - `FieldSync`, `SaveStatus` - per-field sync state and the save indicator
//! - `KeyBindings` - undo/redo chords

pub mod cascade;
pub mod error;
pub mod keymap;
pub mod model;
pub mod reorder;
pub mod sync_state;
pub mod undo;

pub use cascade::{cascade, is_completion_prefix};
pub use error::EditError;
pub use keymap::{HistoryCommand, KeyBindings, KeyChord, KeyEvent};
pub use model::{Chain, ChainId, ChainPatch, Draft, Field, Step, UserId};
pub use reorder::{DragResult, move_step};
pub use smol_str::SmolStr;
pub use sync_state::{FieldSync, SaveStatus, WriteTicket};
pub use undo::{DEFAULT_MAX_UNDO_STEPS, UndoStack};

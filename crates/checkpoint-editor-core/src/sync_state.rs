//! Per-field synchronization state and the user-facing save status.
//!
//! Each editable field runs its own small state machine deciding whether an
//! inbound remote snapshot may overwrite the local value:
//!
//! ```text
//!            begin_edit                debounce_fired(t)
//!   Clean ─────────────▶ LocalPending ───────────────────▶ Saving{t}
//!     ▲                       ▲        begin_immediate(t)     │
//!     │                       └──────── begin_edit ◀──────────┤
//!     └───────────── write_resolved(t) / write_failed(t) ◀────┘
//! ```
//!
//! Remote values are accepted only in `Clean`. A resolution carrying an
//! older ticket than the latest write is ignored, so overlapping writes to
//! the same field keep the field suppressed until the newest one lands.

use smol_str::SmolStr;

/// Identifies one remote write issued for a field.
pub type WriteTicket = u64;

/// Synchronization state of a single field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FieldSync {
    /// Local and remote agree as far as we know; remote snapshots are adopted.
    #[default]
    Clean,
    /// A local edit is waiting for its debounce window.
    LocalPending,
    /// A write is in flight; `ticket` is the newest one issued.
    Saving { ticket: WriteTicket },
}

impl FieldSync {
    /// Whether an inbound remote value for this field should be adopted.
    pub fn accepts_remote(&self) -> bool {
        matches!(self, FieldSync::Clean)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, FieldSync::LocalPending)
    }

    pub fn is_saving(&self) -> bool {
        matches!(self, FieldSync::Saving { .. })
    }

    /// A local keystroke-style edit started.
    pub fn begin_edit(&mut self) {
        *self = FieldSync::LocalPending;
    }

    /// The debounce window elapsed and write `ticket` was issued.
    ///
    /// Only meaningful from `LocalPending`; returns whether it applied.
    pub fn debounce_fired(&mut self, ticket: WriteTicket) -> bool {
        if self.is_pending() {
            *self = FieldSync::Saving { ticket };
            true
        } else {
            false
        }
    }

    /// An immediate (non-debounced) write `ticket` was issued.
    pub fn begin_immediate(&mut self, ticket: WriteTicket) {
        *self = FieldSync::Saving { ticket };
    }

    /// Write `ticket` landed. Returns `true` if the field became clean.
    pub fn write_resolved(&mut self, ticket: WriteTicket) -> bool {
        match *self {
            FieldSync::Saving { ticket: current } if current == ticket => {
                *self = FieldSync::Clean;
                true
            }
            _ => false,
        }
    }

    /// Write `ticket` failed. Local state stays authoritative but the field
    /// reopens to remote snapshots. Returns `true` if the field became clean.
    pub fn write_failed(&mut self, ticket: WriteTicket) -> bool {
        self.write_resolved(ticket)
    }
}

/// Save indicator state exposed to the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SaveStatus {
    /// Nothing in flight.
    #[default]
    Idle,
    /// At least one write is in flight.
    Saving,
    /// All writes landed; reverts to `Idle` after a short linger.
    Saved,
    /// A write was rejected or timed out.
    Error(SmolStr),
}

impl SaveStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn is_saving(&self) -> bool {
        matches!(self, Self::Saving)
    }

    /// Returns the error message if in error state.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(msg) => Some(msg.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debounced_cycle() {
        let mut field = FieldSync::default();
        assert!(field.accepts_remote());

        field.begin_edit();
        assert!(!field.accepts_remote());

        assert!(field.debounce_fired(1));
        assert_eq!(field, FieldSync::Saving { ticket: 1 });
        assert!(!field.accepts_remote());

        assert!(field.write_resolved(1));
        assert!(field.accepts_remote());
    }

    #[test]
    fn test_edit_during_save_keeps_suppression() {
        let mut field = FieldSync::default();
        field.begin_edit();
        field.debounce_fired(1);
        field.begin_edit();

        assert!(!field.write_resolved(1));
        assert!(field.is_pending());
        assert!(!field.accepts_remote());
    }

    #[test]
    fn test_stale_ticket_ignored() {
        let mut field = FieldSync::default();
        field.begin_immediate(1);
        field.begin_immediate(2);

        assert!(!field.write_resolved(1));
        assert!(field.is_saving());
        assert!(field.write_resolved(2));
        assert!(field.accepts_remote());
    }

    #[test]
    fn test_debounce_fire_requires_pending() {
        let mut field = FieldSync::default();
        assert!(!field.debounce_fired(3));
        assert_eq!(field, FieldSync::Clean);
    }

    #[test]
    fn test_failure_reopens_field() {
        let mut field = FieldSync::default();
        field.begin_immediate(4);
        assert!(field.write_failed(4));
        assert!(field.accepts_remote());
    }

    #[test]
    fn test_save_status_helpers() {
        assert_eq!(SaveStatus::default(), SaveStatus::Idle);
        assert!(SaveStatus::Saving.is_saving());
        let err = SaveStatus::Error("offline".into());
        assert!(err.is_error());
        assert_eq!(err.error_message(), Some("offline"));
        assert_eq!(SaveStatus::Saved.error_message(), None);
    }
}

//! Save indicator bookkeeping.
//!
//! Tracks in-flight writes and publishes a [`SaveStatus`] on a watch channel.
//! A failure is sticky: the indicator stays on `Error` until a write issued
//! *after* the failure succeeds.

use checkpoint_editor_core::SaveStatus;
use smol_str::SmolStr;
use tokio::sync::watch;

#[derive(Debug)]
pub(crate) struct SaveTracker {
    tx: watch::Sender<SaveStatus>,
    in_flight: watch::Sender<usize>,
    next_seq: u64,
    failure: Option<(u64, SmolStr)>,
    epoch: u64,
}

impl SaveTracker {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(SaveStatus::Idle);
        let (in_flight, _rx) = watch::channel(0);
        Self {
            tx,
            in_flight,
            next_seq: 0,
            failure: None,
            epoch: 0,
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.tx.subscribe()
    }

    pub(crate) fn current(&self) -> SaveStatus {
        self.tx.borrow().clone()
    }

    pub(crate) fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Receiver for the number of writes still in flight.
    pub(crate) fn watch_in_flight(&self) -> watch::Receiver<usize> {
        self.in_flight.subscribe()
    }

    /// A write is about to be issued. Returns its sequence number.
    pub(crate) fn begin(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight.send_modify(|n| *n += 1);
        self.publish();
        seq
    }

    /// Write `seq` landed. Returns the epoch to hand to [`Self::linger_elapsed`]
    /// when the indicator switched to `Saved`.
    pub(crate) fn succeeded(&mut self, seq: u64) -> Option<u64> {
        self.in_flight.send_modify(|n| *n = n.saturating_sub(1));
        if matches!(self.failure, Some((failed, _)) if seq > failed) {
            self.failure = None;
        }
        self.publish();
        matches!(*self.tx.borrow(), SaveStatus::Saved).then_some(self.epoch)
    }

    /// Write `seq` was rejected or timed out.
    pub(crate) fn failed(&mut self, seq: u64, message: impl Into<SmolStr>) {
        self.in_flight.send_modify(|n| *n = n.saturating_sub(1));
        let newest = match &self.failure {
            Some((failed, _)) => seq.max(*failed),
            None => seq,
        };
        self.failure = Some((newest, message.into()));
        self.publish();
    }

    /// Revert `Saved` to `Idle` if nothing happened since `epoch`.
    pub(crate) fn linger_elapsed(&mut self, epoch: u64) {
        if self.epoch == epoch && matches!(*self.tx.borrow(), SaveStatus::Saved) {
            self.set(SaveStatus::Idle);
        }
    }

    fn publish(&mut self) {
        let next = match (&self.failure, self.in_flight()) {
            (Some((_, message)), _) => SaveStatus::Error(message.clone()),
            (None, 0) => SaveStatus::Saved,
            (None, _) => SaveStatus::Saving,
        };
        self.set(next);
    }

    fn set(&mut self, status: SaveStatus) {
        self.epoch += 1;
        self.tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}

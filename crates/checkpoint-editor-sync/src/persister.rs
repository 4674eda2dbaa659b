//! Per-field debounce timers.
//!
//! Each field owns at most one armed timer. Re-arming aborts the previous
//! timer, so a burst of edits produces a single firing after the last one.
//! Every arming bumps the field's generation; the fire callback receives
//! its generation and must check it with [`DebouncedPersister::disarm`]
//! before acting, which filters out a timer that woke up just as it was
//! being replaced.

use std::future::Future;
use std::time::Duration;

use checkpoint_editor_core::Field;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Cancellable timer handle for one field.
#[derive(Debug, Default)]
struct DebounceTimer {
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl DebounceTimer {
    fn abort(&mut self) -> bool {
        self.generation += 1;
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    fn is_armed(&self) -> bool {
        self.handle.is_some()
    }
}

/// Two independent debounce timers, one per [`Field`].
#[derive(Debug)]
pub struct DebouncedPersister {
    runtime: Handle,
    timers: [DebounceTimer; 2],
}

impl DebouncedPersister {
    /// Timers are spawned on `runtime`, so arming works from any thread.
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            timers: Default::default(),
        }
    }

    /// Persister bound to the runtime of the calling task.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Cancel `field`'s pending timer and start a new one.
    ///
    /// After `window`, `fire` is called with the arming's generation.
    pub fn arm<F, Fut>(&mut self, field: Field, window: Duration, fire: F) -> u64
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let timer = &mut self.timers[field.index()];
        timer.abort();
        let generation = timer.generation;
        timer.handle = Some(self.runtime.spawn(async move {
            tokio::time::sleep(window).await;
            fire(generation).await;
        }));
        generation
    }

    /// Claim a fired timer. Returns `false` if `generation` is stale, i.e.
    /// the field was re-armed or cancelled since.
    ///
    /// The handle is released without aborting, since the caller is
    /// usually the timer task itself.
    pub fn disarm(&mut self, field: Field, generation: u64) -> bool {
        let timer = &mut self.timers[field.index()];
        if timer.generation != generation || timer.handle.is_none() {
            return false;
        }
        timer.handle = None;
        true
    }

    /// Abort `field`'s timer. Returns whether one was pending.
    pub fn cancel(&mut self, field: Field) -> bool {
        self.timers[field.index()].abort()
    }

    pub fn cancel_all(&mut self) {
        for timer in &mut self.timers {
            timer.abort();
        }
    }

    pub fn is_pending(&self, field: Field) -> bool {
        self.timers[field.index()].is_armed()
    }
}

impl Drop for DebouncedPersister {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

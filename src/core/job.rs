//! Background jobs with poll-based completion.
//!
//! Jobs run on the rayon global pool. The caller receives a `JobHandle`
//! it can poll once per tick with `is_completed()`; the only blocking wait
//! is `complete()`, reserved for teardown.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

#[derive(Debug, Default)]
struct Signal {
    done: Mutex<bool>,
    cond: Condvar,
}

impl Signal {
    fn finish(&self) {
        let mut done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        *done = true;
        self.cond.notify_all();
    }
}

/// Opaque token for an in-flight computation.
///
/// A default handle is already complete, so it can stand in for
/// "nothing to wait for".
#[derive(Clone, Debug, Default)]
pub struct JobHandle {
    signal: Option<Arc<Signal>>,
}

impl JobHandle {
    /// A handle with nothing outstanding.
    pub fn completed() -> Self {
        Self::default()
    }

    /// Non-blocking completion check.
    pub fn is_completed(&self) -> bool {
        match &self.signal {
            Some(signal) => *signal.done.lock().unwrap_or_else(PoisonError::into_inner),
            None => true,
        }
    }

    /// Block until the job has finished.
    pub fn complete(&self) {
        let Some(signal) = &self.signal else {
            return;
        };
        let mut done = signal.done.lock().unwrap_or_else(PoisonError::into_inner);
        while !*done {
            done = signal.cond.wait(done).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Marks the signal done when dropped, so a panicking job still completes.
struct CompletionGuard(Arc<Signal>);

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Run `job` in the background and return its completion handle.
pub fn spawn<F>(job: F) -> JobHandle
where
    F: FnOnce() + Send + 'static,
{
    let signal = Arc::new(Signal::default());
    let guard = CompletionGuard(Arc::clone(&signal));
    rayon::spawn(move || {
        let _guard = guard;
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            log::error!("Background job panicked");
        }
    });
    JobHandle { signal: Some(signal) }
}

/// A background job that produces a value.
pub struct Task<T> {
    handle: JobHandle,
    slot: Arc<Mutex<Option<T>>>,
}

impl<T: Send + 'static> Task<T> {
    /// Run `job` in the background; its output is collected with `try_take`.
    pub fn spawn<F>(job: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let slot = Arc::new(Mutex::new(None));
        let out = Arc::clone(&slot);
        let handle = spawn(move || {
            let value = job();
            *out.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
        });
        Self { handle, slot }
    }

    /// Completion handle of the underlying job.
    pub fn handle(&self) -> &JobHandle {
        &self.handle
    }

    /// Take the output if the job has finished.
    ///
    /// Returns `None` while running. A finished job that panicked yields
    /// `Some(None)`.
    pub fn try_take(&self) -> Option<Option<T>> {
        if !self.handle.is_completed() {
            return None;
        }
        Some(self.slot.lock().unwrap_or_else(PoisonError::into_inner).take())
    }

    /// Block until finished and take the output.
    pub fn wait(self) -> Option<T> {
        self.handle.complete();
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

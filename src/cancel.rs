use std::sync::{Arc, Mutex, atomic::{AtomicBool, Ordering}};

use crossbeam::channel::{Receiver, Sender};

/// Shared flag used to stop every stage of a pipeline, for example when the sink fails and the
/// upstream stages would otherwise be left blocked on a handoff that nobody will ever drain.
///
/// As well as a flag that stages can poll between operations, the token provides a crossbeam
/// Receiver which becomes ready (disconnected) when the token is cancelled. This can be added to
/// a `select!` alongside a blocking send/recv so that the blocking operation can be aborted.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
    signal: Receiver<()>,
}

struct Inner {
    cancelled: AtomicBool,
    /// Nothing is ever sent on this. Dropping it disconnects every clone of `signal`, which wakes
    /// anyone selecting on it.
    trigger: Mutex<Option<Sender<()>>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (trigger, signal) = crossbeam::channel::bounded(0);
        CancelToken {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
            }),
            signal,
        }
    }

    /// Cancels the token. Calling this more than once has no further effect.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            drop(self.inner.trigger.lock().expect("Cancel trigger lock poisoned").take());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Receiver that is ready to receive (with a disconnected error) once the token is cancelled.
    pub fn signal(&self) -> &Receiver<()> {
        &self.signal
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

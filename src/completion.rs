use crossbeam::channel::{Receiver, Sender};

/// Creates a single-use signal, used by the final stage of a pipeline to tell whoever started the
/// pipeline that it has finished, along with a value (usually the stage's report).
pub fn new<T>() -> (CompletionSignal<T>, CompletionWaiter<T>) {
    let (s, r) = crossbeam::channel::bounded(1);
    (CompletionSignal { inner: s }, CompletionWaiter { inner: r })
}

pub struct CompletionSignal<T> {
    inner: Sender<T>,
}

impl<T> CompletionSignal<T> {
    /// Fires the signal. This consumes the signal, so it can only happen once.
    pub fn signal(self, value: T) {
        // If the waiter has gone away then nobody cares that we're done, which is fine.
        let _ = self.inner.send(value);
    }
}

pub struct CompletionWaiter<T> {
    inner: Receiver<T>,
}

impl<T> CompletionWaiter<T> {
    /// Blocks until the signal fires. Returns None if the signal was dropped without firing
    /// (e.g. the signalling thread panicked).
    pub fn wait(self) -> Option<T> {
        self.inner.recv().ok()
    }
}

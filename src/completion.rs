//! # Completion Signals
//!
//! Every transition and store write hands back a `Completion`: a one-shot
//! signal that fires exactly once with success or a failure, then is spent.
//! There is no value channel and no cancellation: callers either await it,
//! poll it with `try_wait`, or drop it and move on.

use std::fmt;

use tokio::sync::oneshot;

/// The resolving half of a [`Completion`]. Held internally by whatever
/// performs the work; resolving consumes it, so a signal can never fire twice.
pub struct CompletionSource<E> {
    tx: oneshot::Sender<Result<(), E>>,
}

impl<E> CompletionSource<E> {
    /// Fire the signal. Ignores a dropped receiver; an abandoned
    /// completion is inert, not an error.
    pub fn resolve(self, result: Result<(), E>) {
        let _ = self.tx.send(result);
    }
}

/// A single-fire completion signal: fires once with `Ok(())` or an error,
/// then finishes.
pub struct Completion<E> {
    rx: oneshot::Receiver<Result<(), E>>,
}

impl<E> Completion<E> {
    /// A completion paired with the source that will resolve it.
    pub fn pending() -> (CompletionSource<E>, Completion<E>) {
        let (tx, rx) = oneshot::channel();
        (CompletionSource { tx }, Completion { rx })
    }

    /// A completion that has already fired, for synchronous paths.
    pub fn resolved(result: Result<(), E>) -> Completion<E> {
        let (source, completion) = Completion::pending();
        source.resolve(result);
        completion
    }

    /// Wait for the signal to fire.
    ///
    /// If the source was dropped without resolving, the signal will never
    /// fire; this future stays pending rather than fabricating a result.
    pub async fn wait(self) -> Result<(), E> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => futures::future::pending().await,
        }
    }

    /// Check for the result without blocking. `None` until the signal fires.
    pub fn try_wait(&mut self) -> Option<Result<(), E>> {
        self.rx.try_recv().ok()
    }
}

impl<E> fmt::Debug for Completion<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Completion")
    }
}

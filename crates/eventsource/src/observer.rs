//! Synchronous fan-out of newly persisted events.

/// Receives every event produced by `Repository::apply` after it was
/// persisted.
///
/// Observers run inline on the caller's task and should return quickly;
/// a panicking observer unwinds into the caller.
pub trait EventObserver<E>: Send + Sync {
    fn on_event(&self, event: &E);
}

impl<E, F> EventObserver<E> for F
where
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        self(event)
    }
}

use tokio_util::sync::CancellationToken;

/// The signaling half of a cancellation pair. Not `Clone`: only the
/// owner of a request may cancel it.
#[derive(Debug)]
pub struct CancelSource(CancellationToken);

/// The observing half of a cancellation pair. Cheap to clone; signaling
/// is idempotent and monotonic, so any number of observers may check or
/// await it without coordination.
#[derive(Debug, Clone)]
pub struct CancelObserver(CancellationToken);

/// Construct a fresh, unsignaled cancellation pair.
pub fn cancel_pair() -> (CancelSource, CancelObserver) {
    let token = CancellationToken::new();
    (CancelSource(token.clone()), CancelObserver(token))
}

impl CancelSource {
    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.cancel();
    }

    /// Derive an observer from this source.
    pub fn observer(&self) -> CancelObserver {
        CancelObserver(self.0.clone())
    }
}

impl CancelObserver {
    /// `true` if [`CancelSource::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }

    /// Resolve once cancellation is signaled. Resolves immediately if
    /// already cancelled.
    pub async fn cancelled(&self) {
        self.0.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observer_reflects_source_state() {
        let (source, observer) = cancel_pair();
        assert!(!observer.is_cancelled());
        source.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn cancel_is_idempotent() {
        let (source, observer) = cancel_pair();
        source.cancel();
        source.cancel();
        assert!(observer.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_future_resolves_after_signal() {
        let (source, observer) = cancel_pair();
        let handle = tokio::spawn(async move {
            observer.cancelled().await;
        });
        tokio::task::yield_now().await;
        source.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_future_resolves_immediately_if_already_cancelled() {
        let (source, observer) = cancel_pair();
        source.cancel();
        observer.cancelled().await;
    }
}

/// Polled cancellation request. Queried once per processed line, so it must be
/// cheap and free of side effects.
///
/// Any `Fn() -> bool` closure is a signal, e.g. `|| token.is_cancelled()` for a
/// `tokio_util::sync::CancellationToken` or `|| flag.load(Ordering::Relaxed)`.
pub trait CancellationSignal: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

impl<F> CancellationSignal for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_cancelled(&self) -> bool {
        self()
    }
}

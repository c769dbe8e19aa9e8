/// Best-effort notification before each instrument in a batch. Observer
/// failures are logged and ignored by the orchestrator; they never
/// affect control flow.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(
        &self,
        current: usize,
        total: usize,
        instrument_id: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Default observer: does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn on_progress(
        &self,
        _current: usize,
        _total: usize,
        _instrument_id: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

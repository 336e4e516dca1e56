//! Stage lifecycle: spawn handles, structured exit status, bounded joins.

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::warn;

/// Stage-fatal failures. Transient conditions (empty channel on receive,
/// full channel on publish) never surface here.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("frame acquisition failed: {0}")]
    Capture(String),

    #[error("pixel conversion failed: {0}")]
    Convert(String),

    #[error("model inference failed: {0}")]
    Inference(String),

    #[error("stage panicked: {0}")]
    Panicked(&'static str),
}

/// Join handle for a pipeline stage thread.
///
/// A stage runs until the stop flag is raised or it hits a fatal error;
/// either way its exit status comes back through `join_timeout`.
pub struct StageHandle {
    name: &'static str,
    inner: JoinHandle<Result<(), StageError>>,
}

impl StageHandle {
    pub fn new(name: &'static str, inner: JoinHandle<Result<(), StageError>>) -> Self {
        Self { name, inner }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the stage thread has already exited.
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Join the stage, waiting at most `timeout`.
    ///
    /// Returns `None` when the stage failed to terminate in time; the
    /// thread is abandoned and its resources may leak, which is acceptable
    /// for process-exit cleanup.
    pub fn join_timeout(self, timeout: Duration) -> Option<Result<(), StageError>> {
        let deadline = Instant::now() + timeout;
        while !self.inner.is_finished() {
            if Instant::now() >= deadline {
                warn!("{} stage did not terminate within {:?}, abandoning", self.name, timeout);
                return None;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        match self.inner.join() {
            Ok(status) => Some(status),
            Err(_) => Some(Err(StageError::Panicked(self.name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn join_returns_stage_status() {
        let handle = StageHandle::new("test", std::thread::spawn(|| Ok(())));
        assert!(matches!(
            handle.join_timeout(Duration::from_secs(1)),
            Some(Ok(()))
        ));
    }

    #[test]
    fn join_times_out_on_stuck_stage() {
        let stop = Arc::new(AtomicBool::new(false));
        let stage_stop = stop.clone();
        let handle = StageHandle::new(
            "stuck",
            std::thread::spawn(move || {
                while !stage_stop.load(Ordering::Relaxed) {
                    std::thread::sleep(Duration::from_millis(5));
                }
                Ok(())
            }),
        );
        assert!(handle.join_timeout(Duration::from_millis(50)).is_none());
        stop.store(true, Ordering::Relaxed);
    }
}

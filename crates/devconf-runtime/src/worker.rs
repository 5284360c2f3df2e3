//! [`AnalysisWorker`] – background reader of parameter snapshots.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::params::ParamCell;
use crate::RuntimeError;

/// Runs an analysis closure on a fixed period with a fresh snapshot of a
/// [`ParamCell`].  The cell's lock is released before the closure runs.
pub struct AnalysisWorker {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl AnalysisWorker {
    /// Spawn the worker thread.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::Worker`] if the thread cannot be spawned.
    pub fn spawn<T, F>(
        cell: Arc<ParamCell<T>>,
        period: Duration,
        mut analyze: F,
    ) -> Result<Self, RuntimeError>
    where
        T: Clone + Send + 'static,
        F: FnMut(T) + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name("devconf-analysis".to_string())
            .spawn(move || {
                debug!("analysis worker started");
                while !stop.load(Ordering::SeqCst) {
                    let params = cell.snapshot();
                    analyze(params);
                    thread::sleep(period);
                }
                debug!("analysis worker stopped");
            })?;
        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    /// Signal the worker and wait for it to finish its current pass.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("analysis worker panicked");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn worker_sees_stored_parameters() {
        let cell = Arc::new(ParamCell::new(0u32));
        let (tx, rx) = mpsc::channel();
        let mut worker = AnalysisWorker::spawn(Arc::clone(&cell), Duration::from_millis(1), move |v| {
            let _ = tx.send(v);
        })
        .unwrap();

        cell.store(42);
        let seen = rx
            .iter()
            .find(|v| *v == 42)
            .expect("worker never observed the stored value");
        assert_eq!(seen, 42);

        worker.stop();
        assert!(!worker.is_running());
    }

    #[test]
    fn stop_is_idempotent() {
        let cell = Arc::new(ParamCell::new(()));
        let mut worker =
            AnalysisWorker::spawn(cell, Duration::from_millis(1), |_| {}).unwrap();
        worker.stop();
        worker.stop();
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, TryRecvError};

use crate::audio::analysis::Analyzer;
use crate::audio::clip::AmbisonicClip;
use crate::audio::features::AnalysisResult;
use crate::error::AnalysisError;

/// Outcome of a background analysis.
#[derive(Debug)]
pub enum WorkerEvent {
    Ready(Arc<AnalysisResult>),
    Failed(AnalysisError),
}

struct Job {
    id: u64,
    cancel: Arc<AtomicBool>,
    rx: Receiver<Result<AnalysisResult, AnalysisError>>,
}

/// Runs at most one analysis at a time off the caller's thread.
///
/// Submitting a new clip cancels the job in flight; its result, if it still
/// arrives, goes to a dropped channel and is never observed.
pub struct AnalysisWorker {
    analyzer: Arc<Analyzer>,
    job: Option<Job>,
    next_id: u64,
}

impl AnalysisWorker {
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            job: None,
            next_id: 0,
        }
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn is_busy(&self) -> bool {
        self.job.is_some()
    }

    /// Start analysing `clip`, abandoning any job still running.
    pub fn submit(&mut self, clip: Arc<AmbisonicClip>) -> std::io::Result<u64> {
        self.cancel();

        let id = self.next_id;
        self.next_id += 1;

        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx) = crossbeam_channel::bounded(1);
        let analyzer = Arc::clone(&self.analyzer);
        let flag = Arc::clone(&cancel);

        thread::Builder::new()
            .name(format!("analysis-{}", id))
            .spawn(move || {
                let outcome = analyzer.analyze_cancellable(&clip, &flag);
                // Receiver is gone when the job was superseded
                let _ = tx.send(outcome);
            })?;

        log::info!("Analysis job #{} started", id);
        self.job = Some(Job { id, cancel, rx });
        Ok(id)
    }

    /// Abandon the job in flight, if any.
    pub fn cancel(&mut self) {
        if let Some(job) = self.job.take() {
            job.cancel.store(true, Ordering::Relaxed);
            log::info!("Analysis job #{} cancelled", job.id);
        }
    }

    /// Non-blocking check for the current job's outcome.
    pub fn poll(&mut self) -> Option<WorkerEvent> {
        let job = self.job.as_ref()?;
        let event = match job.rx.try_recv() {
            Ok(outcome) => Self::event(job.id, outcome),
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Self::lost(job.id),
        };
        self.job = None;
        Some(event)
    }

    /// Block until the current job finishes. `None` when nothing is running.
    pub fn wait(&mut self) -> Option<WorkerEvent> {
        let job = self.job.take()?;
        Some(match job.rx.recv() {
            Ok(outcome) => Self::event(job.id, outcome),
            Err(_) => Self::lost(job.id),
        })
    }

    fn event(id: u64, outcome: Result<AnalysisResult, AnalysisError>) -> WorkerEvent {
        match outcome {
            Ok(result) => {
                log::info!("Analysis job #{} finished ({} frames)", id, result.frame_count);
                WorkerEvent::Ready(Arc::new(result))
            }
            Err(e) => {
                log::warn!("Analysis job #{} failed: {}", id, e);
                WorkerEvent::Failed(e)
            }
        }
    }

    fn lost(id: u64) -> WorkerEvent {
        log::error!("Analysis job #{} exited without a result", id);
        WorkerEvent::Failed(AnalysisError::Cancelled)
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analysis::AnalyzerConfig;

    fn worker() -> AnalysisWorker {
        AnalysisWorker::new(Analyzer::new(AnalyzerConfig::default()).unwrap())
    }

    fn clip(channels: usize, len: usize) -> Arc<AmbisonicClip> {
        Arc::new(AmbisonicClip::new(vec![0.0; channels * len], channels, 48000))
    }

    #[test]
    fn delivers_finished_result() {
        let mut worker = worker();
        worker.submit(clip(4, 4096)).unwrap();
        assert!(worker.is_busy());
        match worker.wait() {
            Some(WorkerEvent::Ready(result)) => assert_eq!(result.frame_count, 6),
            other => panic!("unexpected {:?}", other),
        }
        assert!(!worker.is_busy());
        assert!(worker.poll().is_none());
    }

    #[test]
    fn reports_precondition_failures() {
        let mut worker = worker();
        worker.submit(clip(2, 4096)).unwrap();
        match worker.wait() {
            Some(WorkerEvent::Failed(AnalysisError::InsufficientChannels { found: 2 })) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn new_submission_supersedes_old() {
        let mut worker = worker();
        worker.submit(clip(4, 48000 * 4)).unwrap();
        worker.submit(clip(4, 2048)).unwrap();
        match worker.wait() {
            Some(WorkerEvent::Ready(result)) => assert_eq!(result.frame_count, 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn cancel_leaves_worker_idle() {
        let mut worker = worker();
        worker.submit(clip(4, 4096)).unwrap();
        worker.cancel();
        assert!(!worker.is_busy());
        assert!(worker.wait().is_none());
    }
}

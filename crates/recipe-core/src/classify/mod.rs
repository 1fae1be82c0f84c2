//! Concurrent batch classification of text lines.
//!
//! Every line of a document is dispatched to a [`LabelBackend`] on its own
//! task, with at most `max_concurrent` classifications in flight. The call
//! returns once every line has produced a label, failed, or timed out.
//! Failed lines are logged and left out; they never abort the batch.
//!
//! Lines are indexed before dispatch and written into write-once slots, so the
//! output follows input order regardless of completion order.

pub mod backend;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::error::PipelineError;
use crate::types::{ClassifiedLine, Label};

pub use backend::LabelBackend;

/// Default number of simultaneous in-flight classifications.
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

/// Default per-line timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Dispatches lines to a backend with bounded concurrency.
#[derive(Clone)]
pub struct BatchClassifier {
    backend: Arc<dyn LabelBackend>,
    max_concurrent: usize,
    timeout: Duration,
}

impl BatchClassifier {
    pub fn new(backend: Arc<dyn LabelBackend>) -> Self {
        Self {
            backend,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a classifier using the concurrency and timeout from `settings`.
    pub fn from_settings(backend: Arc<dyn LabelBackend>, settings: &Settings) -> Self {
        Self::new(backend)
            .with_max_concurrent(settings.max_concurrent_classifications)
            .with_timeout(settings.classify_timeout())
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Classify `lines`, returning the successful results in input order.
    ///
    /// An empty result for non-empty input means the backend is unavailable;
    /// callers fall back to [`crate::segment`]. If `cancel` fires, in-flight
    /// work is aborted and whatever finished so far is returned.
    pub async fn classify(
        &self,
        lines: &[String],
        cancel: &CancellationToken,
    ) -> Vec<ClassifiedLine> {
        if lines.is_empty() {
            return Vec::new();
        }

        let permits = Arc::new(Semaphore::new(self.max_concurrent));
        let mut in_flight: JoinSet<(usize, Result<Label, PipelineError>)> = JoinSet::new();

        for (index, line) in lines.iter().enumerate() {
            let backend = self.backend.clone();
            let permits = permits.clone();
            let timeout = self.timeout;
            let line = line.clone();

            in_flight.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => {
                        match tokio::time::timeout(timeout, backend.classify_one(&line)).await {
                            Ok(Ok(label)) => Ok(label),
                            Ok(Err(e)) => Err(PipelineError::Classification {
                                index,
                                message: format!("{:#}", e),
                            }),
                            Err(_) => Err(PipelineError::Classification {
                                index,
                                message: format!("timed out after {}ms", timeout.as_millis()),
                            }),
                        }
                    }
                    Err(_) => Err(PipelineError::Cancelled),
                };
                (index, result)
            });
        }

        let mut slots: Vec<Option<Label>> = vec![None; lines.len()];
        let mut failed = 0usize;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    tracing::debug!(
                        remaining = in_flight.len(),
                        "Classification cancelled, aborting in-flight lines"
                    );
                    in_flight.abort_all();
                    break;
                }

                joined = in_flight.join_next() => {
                    let Some(joined) = joined else {
                        break;
                    };
                    match joined {
                        Ok((index, Ok(label))) => slots[index] = Some(label),
                        Ok((index, Err(e))) => {
                            tracing::warn!(index, error = %e, "Line classification failed");
                            failed += 1;
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Classification task panicked");
                            failed += 1;
                        }
                    }
                }
            }
        }

        let results: Vec<ClassifiedLine> = lines
            .iter()
            .zip(slots)
            .filter_map(|(line, label)| label.map(|label| ClassifiedLine::new(line.clone(), label)))
            .collect();

        tracing::debug!(
            backend = self.backend.backend_name(),
            total = lines.len(),
            classified = results.len(),
            failed,
            "Batch classification finished"
        );

        results
    }
}

//! Batch orchestration: dispatch, retire, write, count, and report.
//!
//! [`RunState`] is owned by the retire loop and mutated at exactly one point
//! per completed item, in both modes. In bounded-parallel mode all sources
//! are spawned up front behind a semaphore, and results are retired in
//! submission order, which also fixes the consolidated file order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::Semaphore;

use super::events::{EventSender, Events, Progress, RunEvent};
use crate::error::CaptionError;
use crate::llm::CaptionClient;
use crate::output::ResultWriter;
use crate::report::{CostBreakdown, FailedItem, RunEnd, RunReport};
use crate::types::{
    CaptionOutcome, CaptionResult, ConcurrencyMode, ImageSource, RunConfiguration, TokenUsage,
};

/// The breaker tripped. The report is complete up to the abort.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct RunAborted {
    pub error: CaptionError,
    pub report: Box<RunReport>,
}

/// Mutable counters for one run.
#[derive(Debug, Default)]
struct RunState {
    total: usize,
    processed: usize,
    consecutive_failures: u32,
    failed: Vec<FailedItem>,
    usage: TokenUsage,
    /// Set once when the breaker trips
    tripped: Option<u32>,
}

impl RunState {
    fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    fn progress(&self) -> Progress {
        Progress {
            processed: self.processed,
            total: self.total,
        }
    }

    fn record_success(&mut self, usage: TokenUsage) {
        self.processed += 1;
        self.usage += usage;
        self.consecutive_failures = 0;
    }

    fn record_failure(&mut self, source: ImageSource, error: String, threshold: Option<u32>) {
        self.processed += 1;
        self.failed.push(FailedItem { source, error });
        self.consecutive_failures += 1;
        if let Some(t) = threshold {
            if self.tripped.is_none() && self.consecutive_failures >= t {
                self.tripped = Some(t);
            }
        }
    }
}

/// Consecutive-failure count in completion order, shared by parallel tasks.
///
/// Workers see each other's results as soon as they finish, so queued
/// sources stop being dispatched even while an earlier, slower source is
/// still holding up in-order retirement.
#[derive(Debug)]
struct CompletionBreaker {
    threshold: Option<u32>,
    consecutive: Mutex<u32>,
    tripped: AtomicBool,
}

impl CompletionBreaker {
    fn new(threshold: Option<u32>) -> Self {
        Self {
            threshold,
            consecutive: Mutex::new(0),
            tripped: AtomicBool::new(false),
        }
    }

    fn observe(&self, success: bool) {
        let Some(threshold) = self.threshold else {
            return;
        };
        let mut consecutive = self
            .consecutive
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if success {
            *consecutive = 0;
        } else {
            *consecutive += 1;
            if *consecutive >= threshold {
                self.tripped.store(true, Ordering::SeqCst);
            }
        }
    }

    fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }
}

/// Runs one batch of captioning requests.
pub struct Orchestrator {
    client: Arc<CaptionClient>,
    config: RunConfiguration,
    events: Events,
    cancel: Arc<AtomicBool>,
}

impl Orchestrator {
    pub fn new(client: Arc<CaptionClient>, config: RunConfiguration) -> Self {
        Self {
            client,
            config,
            events: Events::default(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Send progress events to `sender`.
    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.events = Events::new(Some(sender));
        self
    }

    /// Use an externally owned cancellation flag (e.g. wired to ctrl-c).
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Flag checked between dispatches; setting it stops new requests.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn config(&self) -> &RunConfiguration {
        &self.config
    }

    /// Caption every source and write the results.
    ///
    /// Per-item failures are recorded in the report. The only error is the
    /// consecutive-failure breaker, which still carries the full report. A
    /// [`RunEvent::Finished`] is emitted exactly once on every path.
    pub async fn run(
        &self,
        sources: &[ImageSource],
        instruction: &str,
        mut writer: ResultWriter,
    ) -> Result<RunReport, RunAborted> {
        let mut state = RunState::new(sources.len());
        let workers = match self.config.mode {
            ConcurrencyMode::Sequential => 1,
            ConcurrencyMode::BoundedParallel { workers } => workers.max(1),
        };

        tracing::info!(
            "Captioning {} images via {} ({:?}, {}px)",
            sources.len(),
            self.client.provider_name(),
            self.config.mode,
            self.config.resolution
        );
        self.events.emit(RunEvent::Started {
            total: sources.len(),
            workers,
        });

        match self.config.mode {
            ConcurrencyMode::Sequential => {
                self.run_sequential(sources, instruction, &mut writer, &mut state)
                    .await
            }
            ConcurrencyMode::BoundedParallel { .. } => {
                self.run_parallel(sources, instruction, workers, &mut writer, &mut state)
                    .await
            }
        }

        self.finalize(state, &writer)
    }

    async fn run_sequential(
        &self,
        sources: &[ImageSource],
        instruction: &str,
        writer: &mut ResultWriter,
        state: &mut RunState,
    ) {
        for (index, source) in sources.iter().enumerate() {
            if self.is_cancelled() {
                tracing::warn!("Run cancelled, {} images not sent", sources.len() - index);
                break;
            }
            self.events.emit(RunEvent::Dispatched {
                index,
                source: source.clone(),
            });
            let result = self.client.caption(source, instruction).await;
            self.retire(index, result, writer, state);
            if state.tripped.is_some() {
                break;
            }
        }
    }

    async fn run_parallel(
        &self,
        sources: &[ImageSource],
        instruction: &str,
        workers: usize,
        writer: &mut ResultWriter,
        state: &mut RunState,
    ) {
        let semaphore = Arc::new(Semaphore::new(workers));
        let halt = Arc::new(AtomicBool::new(false));
        let breaker = Arc::new(CompletionBreaker::new(self.config.breaker_threshold()));
        let instruction: Arc<str> = Arc::from(instruction);
        let mut handles = Vec::with_capacity(sources.len());

        for (index, source) in sources.iter().enumerate() {
            let semaphore = semaphore.clone();
            let halt = halt.clone();
            let breaker = breaker.clone();
            let cancel = self.cancel.clone();
            let client = self.client.clone();
            let instruction = instruction.clone();
            let events = self.events.clone();
            let source = source.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                if halt.load(Ordering::SeqCst)
                    || breaker.is_tripped()
                    || cancel.load(Ordering::SeqCst)
                {
                    return None;
                }
                events.emit(RunEvent::Dispatched {
                    index,
                    source: source.clone(),
                });
                let result = client.caption(&source, &instruction).await;
                breaker.observe(result.is_success());
                Some(result)
            }));
        }

        let mut not_sent = 0usize;
        for (index, handle) in handles.into_iter().enumerate() {
            let result = match handle.await {
                Ok(Some(result)) => result,
                Ok(None) => {
                    not_sent += 1;
                    continue;
                }
                Err(e) => {
                    tracing::error!("Captioning task panicked: {e}");
                    CaptionResult::failure(
                        sources[index].clone(),
                        format!("Captioning task panicked: {e}"),
                    )
                }
            };
            self.retire(index, result, writer, state);
            if state.tripped.is_some() {
                halt.store(true, Ordering::SeqCst);
            }
        }

        if breaker.is_tripped() && state.tripped.is_none() {
            state.tripped = self.config.breaker_threshold();
        }
        if not_sent > 0 {
            tracing::warn!("{not_sent} images were not sent");
        }
    }

    /// Single mutation point for one completed item.
    fn retire(
        &self,
        index: usize,
        result: CaptionResult,
        writer: &mut ResultWriter,
        state: &mut RunState,
    ) {
        let threshold = self.config.breaker_threshold();
        let CaptionResult { source, outcome } = result;

        match outcome {
            CaptionOutcome::Success { caption, usage } => match writer.write(&source, &caption) {
                Ok(path) => {
                    state.record_success(usage);
                    self.events.emit(RunEvent::Succeeded {
                        index,
                        source,
                        path,
                    });
                }
                Err(e) => {
                    tracing::error!("Error writing caption for {}: {}", source, e);
                    // Tokens were spent even though nothing was saved
                    state.usage += usage;
                    let error = e.to_string();
                    state.record_failure(source.clone(), error.clone(), threshold);
                    self.events.emit(RunEvent::Failed {
                        index,
                        source,
                        error,
                    });
                }
            },
            CaptionOutcome::Failure { error, usage } => {
                state.usage += usage;
                state.record_failure(source.clone(), error.clone(), threshold);
                self.events.emit(RunEvent::Failed {
                    index,
                    source,
                    error,
                });
            }
        }

        self.events.emit(RunEvent::Progress(state.progress()));
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn finalize(&self, state: RunState, writer: &ResultWriter) -> Result<RunReport, RunAborted> {
        let end = match state.tripped {
            Some(threshold) => RunEnd::Aborted { threshold },
            None if self.is_cancelled() && state.processed < state.total => RunEnd::Cancelled,
            None => RunEnd::Completed,
        };

        let report = RunReport {
            total: state.total,
            processed: state.processed,
            written: writer.written(),
            usage: state.usage,
            cost: CostBreakdown::from_usage(&state.usage, &self.config.pricing),
            failed: state.failed,
            end,
            output_dir: writer.run_dir().to_path_buf(),
        };

        tracing::info!(
            "Run finished: {} processed, {} failed, {} tokens",
            report.processed,
            report.failed.len(),
            report.usage.total_tokens
        );
        self.events
            .emit(RunEvent::Finished(Box::new(report.clone())));

        match end {
            RunEnd::Aborted { threshold } => Err(RunAborted {
                error: CaptionError::TooManyConsecutiveFailures { threshold },
                report: Box::new(report),
            }),
            RunEnd::Completed | RunEnd::Cancelled => Ok(report),
        }
    }
}

//! Progress events from a running batch to whoever is presenting it.
//!
//! Events travel over an unbounded tokio channel so a slow consumer never
//! stalls dispatch. For any one item, its [`RunEvent::Dispatched`] is always
//! sent before its terminal event.

use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::report::RunReport;
use crate::types::ImageSource;

pub type EventSender = mpsc::UnboundedSender<RunEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<RunEvent>;

/// Create a sender/receiver pair for run events.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// `(processed, total)` projection of the run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.processed as f64 * 100.0 / self.total as f64
    }
}

#[derive(Debug, Clone)]
pub enum RunEvent {
    /// The run is about to dispatch `total` sources
    Started { total: usize, workers: usize },
    /// A request for this source is being sent
    Dispatched { index: usize, source: ImageSource },
    /// The caption was generated and written to `path`
    Succeeded {
        index: usize,
        source: ImageSource,
        path: PathBuf,
    },
    Failed {
        index: usize,
        source: ImageSource,
        error: String,
    },
    Progress(Progress),
    /// Sent exactly once, last
    Finished(Box<RunReport>),
}

impl RunEvent {
    /// Free-text status line for display.
    pub fn status(&self) -> Option<String> {
        match self {
            Self::Started { total, workers } => Some(format!(
                "Processing {total} images with {workers} worker(s)"
            )),
            Self::Dispatched { source, .. } => Some(format!("Processing {source}")),
            Self::Succeeded { source, .. } => Some(format!("Completed {source}")),
            Self::Failed { source, error, .. } => Some(format!("Error on {source}: {error}")),
            Self::Progress(_) | Self::Finished(_) => None,
        }
    }
}

/// Optional event sink; sending never fails the run.
#[derive(Debug, Clone, Default)]
pub(crate) struct Events(Option<EventSender>);

impl Events {
    pub(crate) fn new(sender: Option<EventSender>) -> Self {
        Self(sender)
    }

    pub(crate) fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.0 {
            // Receiver gone means nobody is watching
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        let progress = Progress {
            processed: 1,
            total: 4,
        };
        assert_eq!(progress.percent(), 25.0);
        let empty = Progress {
            processed: 0,
            total: 0,
        };
        assert_eq!(empty.percent(), 100.0);
    }

    #[test]
    fn test_status_lines() {
        let source = ImageSource::parse("https://x/a.png");
        let event = RunEvent::Dispatched {
            index: 0,
            source: source.clone(),
        };
        assert_eq!(event.status().as_deref(), Some("Processing https://x/a.png"));
        assert!(RunEvent::Progress(Progress {
            processed: 1,
            total: 1
        })
        .status()
        .is_none());
    }

    #[test]
    fn test_emit_after_receiver_dropped_is_silent() {
        let (tx, rx) = event_channel();
        drop(rx);
        Events::new(Some(tx)).emit(RunEvent::Started {
            total: 1,
            workers: 1,
        });
        Events::default().emit(RunEvent::Started {
            total: 1,
            workers: 1,
        });
    }
}

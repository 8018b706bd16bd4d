//! End-of-run reporting: token costs and grouped failures.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::config::PricingConfig;
use crate::types::{ImageSource, TokenUsage};

/// Files listed per failure group before collapsing into "... and N more".
pub const MAX_FILES_PER_GROUP: usize = 5;

/// A source that failed, with the error message it failed with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedItem {
    pub source: ImageSource,
    pub error: String,
}

/// Failures sharing one error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureGroup {
    pub error: String,
    /// Up to [`MAX_FILES_PER_GROUP`] file names, in encounter order
    pub files: Vec<String>,
    /// Files beyond the listed ones
    pub overflow: usize,
}

/// Group failures by identical error message.
///
/// Groups appear in first-seen order and files keep their encounter order
/// within a group.
pub fn group_failures(failed: &[FailedItem]) -> Vec<FailureGroup> {
    let mut groups: Vec<FailureGroup> = Vec::new();
    for item in failed {
        let name = item.source.file_name().to_string();
        let group = match groups.iter().position(|g| g.error == item.error) {
            Some(idx) => &mut groups[idx],
            None => {
                groups.push(FailureGroup {
                    error: item.error.clone(),
                    files: Vec::new(),
                    overflow: 0,
                });
                let last = groups.len() - 1;
                &mut groups[last]
            }
        };
        if group.files.len() < MAX_FILES_PER_GROUP {
            group.files.push(name);
        } else {
            group.overflow += 1;
        }
    }
    groups
}

/// Dollar cost of the tokens actually used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub input: f64,
    pub output: f64,
    pub total: f64,
}

impl CostBreakdown {
    pub fn from_usage(usage: &TokenUsage, pricing: &PricingConfig) -> Self {
        let input = usage.prompt_tokens as f64 * pricing.input_per_token;
        let output = usage.completion_tokens as f64 * pricing.output_per_token;
        Self {
            input,
            output,
            total: input + output,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEnd {
    Completed,
    /// The consecutive-failure breaker tripped at this threshold
    Aborted { threshold: u32 },
    /// Stopped between dispatches on request
    Cancelled,
}

/// Final state of a run, built exactly once when the run ends.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Sources handed to the run
    pub total: usize,
    /// Sources that completed, successfully or not
    pub processed: usize,
    /// Captions written to disk
    pub written: usize,
    pub usage: TokenUsage,
    pub cost: CostBreakdown,
    pub failed: Vec<FailedItem>,
    pub end: RunEnd,
    /// Run folder (may not exist if nothing was written there)
    pub output_dir: PathBuf,
}

impl RunReport {
    pub fn failure_groups(&self) -> Vec<FailureGroup> {
        group_failures(&self.failed)
    }

    pub fn succeeded(&self) -> usize {
        self.processed - self.failed.len()
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.end, RunEnd::Aborted { .. })
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Processed {} of {} images", self.processed, self.total)?;
        writeln!(
            f,
            "Tokens: {} input, {} output, {} total",
            self.usage.prompt_tokens, self.usage.completion_tokens, self.usage.total_tokens
        )?;
        write!(
            f,
            "Cost: ${:.4} input + ${:.4} output = ${:.4} total",
            self.cost.input, self.cost.output, self.cost.total
        )?;

        if !self.failed.is_empty() {
            write!(f, "\n\n{} failed:", self.failed.len())?;
            for group in self.failure_groups() {
                write!(f, "\n  {}", group.error)?;
                for file in &group.files {
                    write!(f, "\n    - {file}")?;
                }
                if group.overflow > 0 {
                    write!(f, "\n    ... and {} more", group.overflow)?;
                }
            }
        }

        match self.end {
            RunEnd::Completed => Ok(()),
            RunEnd::Aborted { threshold } => {
                write!(f, "\n\nAborted after {threshold} consecutive failures")
            }
            RunEnd::Cancelled => write!(f, "\n\nCancelled before all images were sent"),
        }
    }
}

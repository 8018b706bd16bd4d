//! Vista Core - batch image captioning library.
//!
//! Vista sends images (remote URLs or local files) to a vision-capable chat
//! model and saves the captions it gets back, either as one file per image
//! or as a single consolidated log per run.
//!
//! # Architecture
//!
//! ```text
//! Inputs → Resolve → Estimate → Orchestrate (encode → caption → write) → Report
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vista_core::{
//!     CaptionClient, ClientOptions, Config, OpenAiProvider, Orchestrator, ResultWriter,
//!     RunConfiguration, SourceResolver,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let run = RunConfiguration::from_config(&config)?;
//!     let validation = SourceResolver::new(run.write).resolve(&["https://example.com/cat.jpg"]);
//!
//!     let provider = OpenAiProvider::from_config(&config.openai, None)?;
//!     let client = CaptionClient::new(Arc::new(provider), ClientOptions::from_run(&run));
//!     let writer = ResultWriter::new("output/run", run.write);
//!
//!     let report = Orchestrator::new(Arc::new(client), run)
//!         .run(&validation.to_process, "What's in this image?", writer)
//!         .await?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod cost;
pub mod error;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod presets;
pub mod report;
pub mod tier;
pub mod types;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use config::Config;
pub use cost::{estimate_cost, Resolution};
pub use error::{CaptionError, ConfigError, Result, VistaError};
pub use llm::{CaptionClient, CaptionProvider, ClientOptions, OpenAiProvider};
pub use output::{run_output_dir, ResultWriter};
pub use pipeline::{Orchestrator, RunAborted, RunEvent, SourceResolver, ValidationResult};
pub use presets::{load_presets, Preset};
pub use report::{RunEnd, RunReport};
pub use tier::{TierLimits, TierRegistry};
pub use types::{CaptionResult, ConcurrencyMode, ImageSource, RunConfiguration, WritePolicy};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

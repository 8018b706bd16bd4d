//! Batch captioning pipeline.
//!
//! - **discovery**: Expand directories and source lists into raw inputs
//! - **resolve**: Classify inputs and filter missing or already-captioned ones
//! - **encode**: Downscale and base64-encode local images
//! - **events**: Progress channel from a run to its presenter
//! - **orchestrator**: Dispatch, retire, write, and report a batch

pub mod discovery;
pub mod encode;
pub mod events;
pub mod orchestrator;
pub mod resolve;

// Re-exports for convenient access
pub use discovery::{parse_source_list, SourceDiscovery};
pub use encode::{EncodedImage, ImageEncoder};
pub use events::{event_channel, EventReceiver, EventSender, Progress, RunEvent};
pub use orchestrator::{Orchestrator, RunAborted};
pub use resolve::{SourceResolver, ValidationResult};

//! Captioning calls against a vision-capable chat model.
//!
//! [`CaptionProvider`] abstracts the backend. [`CaptionClient`] wraps a
//! provider with encoding, deadlines, retries and error-shaped response
//! detection.

pub mod client;
pub mod openai;
pub mod provider;
pub(crate) mod retry;

pub use client::{CaptionClient, ClientOptions};
pub use openai::OpenAiProvider;
pub use provider::{
    resolve_env_var, CaptionProvider, CaptionRequest, CaptionResponse, ImageReference,
};

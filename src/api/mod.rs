//! Hosted text-generation access.
//!
//! - `completions_api.rs`: stateless POST with retry on upstream 5xx
//! - `completions_client.rs`: [`TextGenerator`] seam and its rate-limited HTTP implementation

pub mod completions_api;
pub mod completions_client;

pub use completions_client::{CompletionsClient, TextGenerator};

// Enhancement pipeline: wire types, the service client, and the step that
// turns a staged upload into enhanced image bytes.

mod client;
mod enhancer;
mod error;
mod gemini;

pub use client::{DEFAULT_API_BASE, DEFAULT_MODEL, GeminiClient, GeminiClientConfig};
pub use enhancer::Enhancer;
pub use error::EnhanceError;

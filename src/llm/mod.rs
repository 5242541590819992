//! Text completion endpoints.

mod openai;

pub use openai::OpenAICompletion;

use crate::config::SamplingSettings;
use crate::error::Result;
use async_trait::async_trait;

/// A model that turns a prompt into text.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Complete a single-turn prompt. Implementations make one attempt and
    /// report failures as `Generation` errors.
    async fn complete(&self, system: Option<&str>, prompt: &str, sampling: SamplingSettings) -> Result<String>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

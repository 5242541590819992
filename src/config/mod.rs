//! Configuration module for docquery.
//!
//! Handles loading application settings, prompt templates and credentials.

mod credentials;
mod prompts;
mod settings;

pub use credentials::{Credentials, BUCKET_VAR, EMBEDDING_TOKEN_VAR, GENERATION_KEY_VAR};
pub use prompts::{InsightsPrompts, Prompts, StagePrompts, NO_ANSWER_FALLBACK, NO_SUMMARY_FALLBACK};
pub use settings::{
    ChunkingSettings, CredentialRef, EmbeddingSettings, EndpointSettings, FailurePolicy,
    GeneralSettings, InsightsMode, InsightsSettings, PromptSettings, RetrievalSettings,
    SamplingSettings, ServerSettings, Settings, StorageSettings,
};

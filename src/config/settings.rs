//! Configuration settings for docquery.

use crate::chunking::ChunkingStrategy;
use crate::index::Metric;
use crate::rag::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub storage: StorageSettings,
    pub embedding: EmbeddingSettings,
    pub generation: EndpointSettings,
    pub formatting: EndpointSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub insights: InsightsSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            general: GeneralSettings::default(),
            storage: StorageSettings::default(),
            embedding: EmbeddingSettings::default(),
            generation: EndpointSettings::generation(),
            formatting: EndpointSettings::formatting(),
            chunking: ChunkingSettings::default(),
            retrieval: RetrievalSettings::default(),
            insights: InsightsSettings::default(),
            server: ServerSettings::default(),
            prompts: PromptSettings::default(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for request-scoped temporary files.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            temp_dir: "/tmp/docquery".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Blob store settings. The bucket name itself is a credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding one subdirectory per bucket.
    pub root: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: "~/.docquery/buckets".to_string(),
        }
    }
}

/// Which credential an endpoint authenticates with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CredentialRef {
    EmbeddingToken,
    GenerationKey,
}

/// Embedding endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// OpenAI-compatible API base URL.
    pub api_base: String,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions produced by the model.
    pub dimensions: u32,
    /// Send `dimensions` in the request (only some models accept it).
    pub request_dimensions: bool,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            api_base: "https://router.huggingface.co/v1".to_string(),
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            request_dimensions: false,
            timeout_secs: 60,
        }
    }
}

/// Sampling parameters for one task on one endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SamplingSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A completion endpoint (generation or formatting stage).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    /// OpenAI-compatible API base URL.
    pub api_base: String,
    /// Model identifier.
    pub model: String,
    /// Credential used as the bearer key.
    pub credential: CredentialRef,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Sampling for question answering.
    pub answer: SamplingSettings,
    /// Sampling for summaries.
    pub summary: SamplingSettings,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self::generation()
    }
}

impl EndpointSettings {
    /// Defaults for the raw-answer generation endpoint.
    pub fn generation() -> Self {
        Self {
            api_base: "https://router.huggingface.co/v1".to_string(),
            model: "mistralai/Mixtral-8x7B-Instruct-v0.1".to_string(),
            credential: CredentialRef::EmbeddingToken,
            timeout_secs: 120,
            answer: SamplingSettings {
                temperature: 0.7,
                max_tokens: 200,
            },
            summary: SamplingSettings {
                temperature: 0.5,
                max_tokens: 300,
            },
        }
    }

    /// Defaults for the Markdown formatting endpoint.
    pub fn formatting() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            model: "gemini-1.5-pro".to_string(),
            credential: CredentialRef::GenerationKey,
            timeout_secs: 120,
            answer: SamplingSettings {
                temperature: 0.5,
                max_tokens: 500,
            },
            summary: SamplingSettings {
                temperature: 0.5,
                max_tokens: 500,
            },
        }
    }
}

/// Text chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Chunking strategy (fixed, boundary).
    pub strategy: ChunkingStrategy,
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            strategy: ChunkingStrategy::Fixed,
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Distance metric used by the vector index.
    pub metric: Metric,
    /// Chunks retrieved for question answering.
    pub answer_k: usize,
    /// Chunks retrieved for summaries.
    pub summary_k: usize,
    /// Fixed retrieval query used for summaries.
    pub summary_query: String,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            metric: Metric::L2,
            answer_k: 2,
            summary_k: 5,
            summary_query: "Summarize the document".to_string(),
        }
    }
}

/// How document insights are derived.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InsightsMode {
    /// Line-length and word-frequency heuristics.
    #[default]
    Local,
    /// Ask the formatting endpoint.
    Llm,
}

/// Document insight settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsSettings {
    pub mode: InsightsMode,
    /// Lines longer than this count as key points.
    pub key_point_min_chars: usize,
    pub max_key_points: usize,
    pub max_keywords: usize,
    /// Characters of document text sent to the model in llm mode.
    pub max_prompt_chars: usize,
}

impl Default for InsightsSettings {
    fn default() -> Self {
        Self {
            mode: InsightsMode::Local,
            key_point_min_chars: 50,
            max_key_points: 5,
            max_keywords: 5,
            max_prompt_chars: 12_000,
        }
    }
}

/// What the HTTP layer does with pipeline failures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Always 200, with an apologetic payload and the error attached.
    #[default]
    Degraded,
    /// Map the error kind to a status code.
    Propagate,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Origins allowed by CORS.
    pub allowed_origins: Vec<String>,
    pub failure_policy: FailurePolicy,
    /// Rendering applied to the formatted answer.
    pub output_format: OutputFormat,
    /// Largest accepted upload body.
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            failure_policy: FailurePolicy::Degraded,
            output_format: OutputFormat::Markdown,
            max_upload_bytes: 200 * 1024 * 1024,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the pipeline cannot honor.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::DocqueryError;

        if self.chunking.chunk_size == 0 {
            return Err(DocqueryError::Config("chunking.chunk_size must be > 0".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(DocqueryError::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.answer_k == 0 || self.retrieval.summary_k == 0 {
            return Err(DocqueryError::Config("retrieval k values must be > 0".into()));
        }
        if self.retrieval.summary_query.trim().is_empty() {
            return Err(DocqueryError::Config("retrieval.summary_query must not be empty".into()));
        }
        if self.embedding.dimensions == 0 {
            return Err(DocqueryError::Config("embedding.dimensions must be > 0".into()));
        }
        for (name, base) in [
            ("embedding", &self.embedding.api_base),
            ("generation", &self.generation.api_base),
            ("formatting", &self.formatting.api_base),
        ] {
            url::Url::parse(base).map_err(|e| {
                DocqueryError::Config(format!("{}.api_base is not a valid URL: {}", name, e))
            })?;
        }
        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::DocqueryError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docquery")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded blob store root.
    pub fn storage_root(&self) -> PathBuf {
        Self::expand_path(&self.storage.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.chunking.chunk_size, 1000);
        assert_eq!(settings.chunking.chunk_overlap, 200);
        assert_eq!(settings.retrieval.answer_k, 2);
        assert_eq!(settings.retrieval.summary_k, 5);
        assert_eq!(settings.generation.answer.temperature, 0.7);
        assert_eq!(settings.formatting.answer.max_tokens, 500);
        assert_eq!(settings.formatting.credential, CredentialRef::GenerationKey);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let mut settings = Settings::default();
        settings.chunking.chunk_overlap = 1000;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_blank_summary_query_is_rejected() {
        let mut settings = Settings::default();
        settings.retrieval.summary_query = "  ".to_string();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("summary_query"));
    }

    #[test]
    fn test_load_partial_file_keeps_formatting_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[chunking]\nchunk_size = 500\nchunk_overlap = 50\n\n[server]\nfailure_policy = \"propagate\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.chunking.chunk_size, 500);
        assert_eq!(settings.server.failure_policy, FailurePolicy::Propagate);
        assert_eq!(settings.formatting.model, "gemini-1.5-pro");
        assert_eq!(settings.generation.model, "mistralai/Mixtral-8x7B-Instruct-v0.1");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut settings = Settings::default();
        settings.retrieval.answer_k = 4;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.retrieval.answer_k, 4);
    }
}

//! OpenAI-compatible embeddings implementation.

use super::Embedder;
use crate::config::EmbeddingSettings;
use crate::error::{DocqueryError, Result};
use crate::openai::{create_client_with_timeout, ApiClient};
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Embedder backed by any endpoint speaking the OpenAI embeddings API.
pub struct OpenAIEmbedder {
    client: ApiClient,
    model: String,
    dimensions: usize,
    request_dimensions: bool,
}

impl OpenAIEmbedder {
    /// Create an embedder from settings and the embedding token.
    pub fn from_settings(settings: &EmbeddingSettings, api_key: &str) -> Result<Self> {
        let client = create_client_with_timeout(
            &settings.api_base,
            api_key,
            Duration::from_secs(settings.timeout_secs),
        )?;
        Ok(Self::with_client(
            client,
            &settings.model,
            settings.dimensions as usize,
            settings.request_dimensions,
        ))
    }

    /// Create an embedder around an existing client.
    pub fn with_client(client: ApiClient, model: &str, dimensions: usize, request_dimensions: bool) -> Self {
        Self {
            client,
            model: model.to_string(),
            dimensions,
            request_dimensions,
        }
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| DocqueryError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        // Providers cap the batch size, process in slices
        const BATCH_SIZE: usize = 100;
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let mut args = CreateEmbeddingRequestArgs::default();
            args.model(&self.model)
                .input(EmbeddingInput::StringArray(chunk.to_vec()));
            if self.request_dimensions {
                args.dimensions(self.dimensions as u32);
            }
            let request = args
                .build()
                .map_err(|e| DocqueryError::Embedding(format!("Failed to build request: {}", e)))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| DocqueryError::Embedding(format!("Embedding API error: {}", e)))?;

            if response.data.len() != chunk.len() {
                return Err(DocqueryError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    chunk.len(),
                    response.data.len()
                )));
            }

            // Sort by index to ensure correct order
            let mut embeddings: Vec<_> = response.data.into_iter().collect();
            embeddings.sort_by_key(|e| e.index);

            for embedding_data in embeddings {
                if embedding_data.embedding.len() != self.dimensions {
                    return Err(DocqueryError::Embedding(format!(
                        "Model {} returned {} dimensions, configured for {}",
                        self.model,
                        embedding_data.embedding.len(),
                        self.dimensions
                    )));
                }
                all_embeddings.push(embedding_data.embedding);
            }
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

//! OpenAI-compatible chat completions.

use super::CompletionModel;
use crate::config::{EndpointSettings, SamplingSettings};
use crate::error::{DocqueryError, Result, Stage};
use crate::openai::{create_client_with_timeout, ApiClient};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Completion model reached through the chat completions API.
pub struct OpenAICompletion {
    client: ApiClient,
    model: String,
    stage: Stage,
}

impl OpenAICompletion {
    /// Create a completion model for an endpoint. `stage` tags the errors it reports.
    pub fn from_settings(settings: &EndpointSettings, api_key: &str, stage: Stage) -> Result<Self> {
        let client = create_client_with_timeout(
            &settings.api_base,
            api_key,
            Duration::from_secs(settings.timeout_secs),
        )?;
        Ok(Self::with_client(client, &settings.model, stage))
    }

    pub fn with_client(client: ApiClient, model: &str, stage: Stage) -> Self {
        Self {
            client,
            model: model.to_string(),
            stage,
        }
    }

    fn error(&self, message: impl std::fmt::Display) -> DocqueryError {
        DocqueryError::generation(self.stage, message.to_string())
    }
}

#[async_trait]
impl CompletionModel for OpenAICompletion {
    #[instrument(skip(self, system, prompt), fields(model = %self.model, stage = %self.stage))]
    async fn complete(&self, system: Option<&str>, prompt: &str, sampling: SamplingSettings) -> Result<String> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()
                    .map_err(|e| self.error(e))?
                    .into(),
            );
        }
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| self.error(e))?
                .into(),
        );

        // OpenAI-compatible hosts still expect the legacy `max_tokens` field.
        #[allow(deprecated)]
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(sampling.temperature)
            .max_tokens(sampling.max_tokens)
            .build()
            .map_err(|e| self.error(e))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| self.error(format!("API error: {}", e)))?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| self.error("empty response from model"))?;

        debug!(chars = text.len(), "Completion received");
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai::create_client;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_body(content: Option<&str>) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1,
            "model": "test-chat",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })
    }

    fn sampling() -> SamplingSettings {
        SamplingSettings {
            temperature: 0.5,
            max_tokens: 300,
        }
    }

    #[tokio::test]
    async fn test_complete_sends_sampling_and_trims() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer key-1"))
            .and(body_partial_json(json!({ "model": "test-chat", "max_tokens": 300 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(Some("  Alpha.  \n"))))
            .expect(1)
            .mount(&server)
            .await;

        let client = create_client(&format!("{}/v1", server.uri()), "key-1").unwrap();
        let model = OpenAICompletion::with_client(client, "test-chat", Stage::Generation);

        let text = model.complete(None, "Question?", sampling()).await.unwrap();
        assert_eq!(text, "Alpha.");
    }

    #[tokio::test]
    async fn test_failure_is_tagged_with_stage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": { "message": "unavailable", "type": "server_error", "param": null, "code": null }
            })))
            .mount(&server)
            .await;

        let client = create_client(&format!("{}/v1", server.uri()), "k").unwrap();
        let model = OpenAICompletion::with_client(client, "test-chat", Stage::Formatting);

        let err = model.complete(Some("sys"), "x", sampling()).await.unwrap_err();
        assert!(matches!(
            err,
            DocqueryError::Generation { stage: Stage::Formatting, .. }
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_fails_on_first_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": { "message": "quota exceeded", "type": "rate_limit", "param": null, "code": null }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = create_client(&format!("{}/v1", server.uri()), "k").unwrap();
        let model = OpenAICompletion::with_client(client, "test-chat", Stage::Generation);

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            model.complete(None, "x", sampling()),
        )
        .await
        .expect("rate-limited call must not be retried");
        assert!(matches!(
            result,
            Err(DocqueryError::Generation { stage: Stage::Generation, .. })
        ));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_content_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(None)))
            .mount(&server)
            .await;

        let client = create_client(&format!("{}/v1", server.uri()), "k").unwrap();
        let model = OpenAICompletion::with_client(client, "test-chat", Stage::Generation);

        assert!(model.complete(None, "x", sampling()).await.is_err());
    }

    #[tokio::test]
    async fn test_timeout_is_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_body(Some("late")))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = crate::openai::create_client_with_timeout(
            &format!("{}/v1", server.uri()),
            "k",
            Duration::from_millis(200),
        )
        .unwrap();
        let model = OpenAICompletion::with_client(client, "test-chat", Stage::Generation);

        let err = model.complete(None, "x", sampling()).await.unwrap_err();
        assert!(matches!(err, DocqueryError::Generation { stage: Stage::Generation, .. }));
    }
}

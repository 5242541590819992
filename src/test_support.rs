//! Deterministic fakes shared by unit tests.

use crate::chunking::Chunk;
use crate::config::SamplingSettings;
use crate::embedding::Embedder;
use crate::error::{DocqueryError, Result, Stage};
use crate::llm::CompletionModel;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const VOCABULARY: &[&str] = &[
    "alpha", "beta", "gamma", "delta", "rust", "pdf", "summary", "document",
];

/// Embeds text as normalized keyword counts plus a constant bias component.
pub struct KeywordEmbedder {
    model: String,
    padding: usize,
    fail: bool,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self {
            model: "keyword-test".to_string(),
            padding: 0,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Report a different model name.
    pub fn named(model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..Self::new()
        }
    }

    /// Append zero components, changing the dimension.
    pub fn padded(padding: usize) -> Self {
        Self {
            padding,
            ..Self::new()
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let mut v: Vec<f32> = VOCABULARY
            .iter()
            .map(|term| words.iter().filter(|w| *w == term).count() as f32)
            .collect();
        v.push(1.0);

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        for x in &mut v {
            *x /= norm;
        }
        v.extend(std::iter::repeat(0.0).take(self.padding));
        v
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail {
            return Err(DocqueryError::Embedding("embedding service unavailable".into()));
        }
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.fail {
            return Err(DocqueryError::Embedding("embedding service unavailable".into()));
        }
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len() + 1 + self.padding
    }
}

/// Completion model that replies with a fixed text (or fails) and records its prompts.
pub struct ScriptedModel {
    reply: Option<String>,
    stage: Stage,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn replying(reply: &str, stage: Stage) -> Self {
        Self {
            reply: Some(reply.to_string()),
            stage,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call as if the endpoint timed out.
    pub fn timing_out(stage: Stage) -> Self {
        Self {
            reply: None,
            ..Self::replying("", stage)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, _system: Option<&str>, prompt: &str, _sampling: SamplingSettings) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => Err(DocqueryError::generation(self.stage, "operation timed out")),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Chunks in order, with offsets as if joined without separators.
pub fn chunks_of(texts: &[&str]) -> Vec<Chunk> {
    let mut start = 0;
    texts
        .iter()
        .enumerate()
        .map(|(order, text)| {
            let chunk = Chunk {
                text: text.to_string(),
                order,
                start,
            };
            start += text.chars().count();
            chunk
        })
        .collect()
}

//! Pipeline orchestrator for docquery.
//!
//! Coordinates upload (store, compress, extract, chunk, embed, index) and the
//! per-request query and summary pipelines. Every request works in its own
//! scratch directory, removed when the request ends however it ends.

use crate::chunking::TextSplitter;
use crate::compress::{compressed_path, Compressor};
use crate::config::{Credentials, InsightsMode, Prompts, Settings};
use crate::document::{Document, DocumentId, FileKind};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{DocqueryError, ErrorReport, Result, Stage};
use crate::extract::{self, parse_model_insights, DocumentInsights, Table};
use crate::index::{IndexRepository, VectorIndex};
use crate::llm::{CompletionModel, OpenAICompletion};
use crate::rag::{ResponseFormatter, Retriever, Task, TaskSampling, TwoStageAnswerer};
use crate::storage::{download_to, put_file, BlobStore, FsBlobStore};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{info, instrument, warn};

/// Answer returned when a question could not be answered.
pub const ANSWER_APOLOGY: &str =
    "Sorry, I couldn't answer that question right now. Please try again later.";

/// Summary returned when a document could not be summarized.
pub const SUMMARY_APOLOGY: &str =
    "Sorry, I couldn't summarize this document right now. Please try again later.";

/// Where an upload was stored.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    pub document_id: String,
    pub original_key: String,
    pub compressed_key: String,
}

/// Extracted text and derived highlights of a PDF.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentData {
    pub text: String,
    pub key_points: Vec<String>,
    pub keywords: Vec<String>,
    pub tables: Vec<Table>,
    pub metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl DocumentData {
    /// Empty payload carrying the failure.
    pub fn degraded(err: &DocqueryError) -> Self {
        Self {
            error: Some(ErrorReport::from(err)),
            ..Self::default()
        }
    }
}

/// Result of a question.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub raw_answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl QueryResponse {
    /// Apologetic payload for a failed question.
    pub fn degraded(err: &DocqueryError) -> Self {
        Self {
            answer: ANSWER_APOLOGY.to_string(),
            raw_answer: String::new(),
            error: Some(ErrorReport::from(err)),
        }
    }
}

/// Result of a summary.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
    pub raw_summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl SummaryResponse {
    /// Apologetic payload for a failed summary.
    pub fn degraded(err: &DocqueryError) -> Self {
        Self {
            summary: SUMMARY_APOLOGY.to_string(),
            raw_summary: String::new(),
            error: Some(ErrorReport::from(err)),
        }
    }
}

/// The main orchestrator for the docquery pipeline.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    store: Arc<dyn BlobStore>,
    embedder: Arc<dyn Embedder>,
    format_model: Arc<dyn CompletionModel>,
    splitter: TextSplitter,
    indexes: IndexRepository,
    retriever: Retriever,
    answerer: TwoStageAnswerer,
    compressor: Compressor,
    temp_dir: PathBuf,
}

impl Orchestrator {
    /// Create an orchestrator talking to the configured endpoints and bucket.
    pub fn new(settings: Settings, credentials: &Credentials) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let store: Arc<dyn BlobStore> =
            Arc::new(FsBlobStore::new(settings.storage_root(), &credentials.bucket)?);

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::from_settings(
            &settings.embedding,
            &credentials.embedding_token,
        )?);

        let generator: Arc<dyn CompletionModel> = Arc::new(OpenAICompletion::from_settings(
            &settings.generation,
            credentials.resolve(settings.generation.credential),
            Stage::Generation,
        )?);

        let format_model: Arc<dyn CompletionModel> = Arc::new(OpenAICompletion::from_settings(
            &settings.formatting,
            credentials.resolve(settings.formatting.credential),
            Stage::Formatting,
        )?);

        info!(
            "Using {} for embeddings, {} for generation, {} for formatting",
            settings.embedding.model, settings.generation.model, settings.formatting.model
        );

        Self::with_components(settings, prompts, store, embedder, generator, format_model)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        store: Arc<dyn BlobStore>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn CompletionModel>,
        format_model: Arc<dyn CompletionModel>,
    ) -> Result<Self> {
        settings.validate()?;

        let temp_dir = settings.temp_dir();
        std::fs::create_dir_all(&temp_dir)?;

        let splitter = TextSplitter::from_settings(&settings.chunking)?;
        let indexes = IndexRepository::new(store.clone(), temp_dir.clone());
        let retriever = Retriever::new(embedder.clone());
        let answerer = TwoStageAnswerer::new(
            generator,
            format_model.clone(),
            TaskSampling::from(&settings.generation),
            TaskSampling::from(&settings.formatting),
        )
        .with_prompts(prompts.clone())
        .with_renderer(ResponseFormatter::new(settings.server.output_format));

        Ok(Self {
            settings,
            prompts,
            store,
            embedder,
            format_model,
            splitter,
            indexes,
            retriever,
            answerer,
            compressor: Compressor::default(),
            temp_dir,
        })
    }

    /// Replace the compressor (e.g. to point at a specific ffmpeg).
    pub fn with_compressor(mut self, compressor: Compressor) -> Self {
        self.compressor = compressor;
        self
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn scratch(&self, prefix: &str) -> Result<TempDir> {
        std::fs::create_dir_all(&self.temp_dir)?;
        Ok(tempfile::Builder::new().prefix(prefix).tempdir_in(&self.temp_dir)?)
    }

    /// Store an upload, its compressed copy and, for PDFs, its index.
    #[instrument(skip(self, data), fields(size = data.len()))]
    pub async fn upload(&self, filename: &str, data: &[u8]) -> Result<UploadReceipt> {
        let result = self.upload_inner(filename, data).await;
        if let Err(e) = &result {
            log_failure("upload", None, e);
        }
        result
    }

    async fn upload_inner(&self, filename: &str, data: &[u8]) -> Result<UploadReceipt> {
        let kind = FileKind::from_filename(filename)?;
        if data.is_empty() {
            return Err(DocqueryError::InvalidInput(format!("{} is empty", filename)));
        }

        let document = Document::new(DocumentId::generate(kind));
        let scratch = self.scratch("upload-")?;

        let original = scratch.path().join(format!("original.{}", kind.extension()));
        tokio::fs::write(&original, data).await?;
        self.store.put(&document.original_key, data).await?;
        info!(document_id = %document.id, "Stored original");

        let compressed = compressed_path(scratch.path(), kind);
        self.compressor.compress(kind, &original, &compressed).await?;
        put_file(self.store.as_ref(), &document.compressed_key, &compressed).await?;
        info!(document_id = %document.id, "Stored compressed copy");

        if kind == FileKind::Pdf {
            self.index_pdf(&document.id, original).await?;
        }

        Ok(UploadReceipt {
            document_id: document.id.to_string(),
            original_key: document.original_key,
            compressed_key: document.compressed_key,
        })
    }

    async fn index_pdf(&self, id: &DocumentId, path: PathBuf) -> Result<()> {
        let extracted = extract::extract_pdf_blocking(path).await?;
        let chunks = self.splitter.split(&extracted.text);
        if chunks.is_empty() {
            warn!(document_id = %id, "PDF has no extractable text, storing an empty index");
        }

        let index = VectorIndex::build(&chunks, self.embedder.as_ref(), self.settings.retrieval.metric).await?;
        self.indexes.store(id, &index).await?;
        info!(document_id = %id, chunks = index.len(), "Indexed document");
        Ok(())
    }

    /// Extracted text, insights, tables and metadata of an uploaded PDF.
    #[instrument(skip(self))]
    pub async fn document_data(&self, document_id: &str) -> Result<DocumentData> {
        let result = self.document_data_inner(document_id).await;
        if let Err(e) = &result {
            log_failure("document_data", Some(document_id), e);
        }
        result
    }

    async fn document_data_inner(&self, document_id: &str) -> Result<DocumentData> {
        let id = DocumentId::parse(document_id)?;
        if id.kind() != FileKind::Pdf {
            return Err(DocqueryError::InvalidInput(
                "document data is only available for PDFs".to_string(),
            ));
        }

        let scratch = self.scratch("document-")?;
        let path = scratch.path().join("original.pdf");
        download_to(self.store.as_ref(), &id.original_key(), &path).await?;
        let extracted = extract::extract_pdf_blocking(path).await?;

        let insights = match self.settings.insights.mode {
            InsightsMode::Local => {
                let s = &self.settings.insights;
                DocumentInsights::local(
                    &extracted.text,
                    s.key_point_min_chars,
                    s.max_key_points,
                    s.max_keywords,
                )
            }
            InsightsMode::Llm => self.model_insights(&extracted.text).await?,
        };

        Ok(DocumentData {
            text: extracted.text,
            key_points: insights.key_points,
            keywords: insights.keywords,
            tables: extracted.tables,
            metadata: extracted.metadata,
            error: None,
        })
    }

    async fn model_insights(&self, text: &str) -> Result<DocumentInsights> {
        let s = &self.settings.insights;
        let excerpt: String = text.chars().take(s.max_prompt_chars).collect();

        let mut vars = HashMap::new();
        vars.insert("text".to_string(), excerpt);
        vars.insert("max_key_points".to_string(), s.max_key_points.to_string());
        vars.insert("max_keywords".to_string(), s.max_keywords.to_string());
        let prompt = self.prompts.render_with_custom(&self.prompts.insights.user, &vars);

        let response = self
            .format_model
            .complete(
                Some(&self.prompts.insights.system),
                &prompt,
                self.settings.formatting.summary,
            )
            .await?;

        Ok(parse_model_insights(&response, s.max_key_points, s.max_keywords))
    }

    /// Answer a question about a document.
    #[instrument(skip(self, question))]
    pub async fn query(&self, document_id: &str, question: &str) -> Result<QueryResponse> {
        let k = self.settings.retrieval.answer_k;
        let result = self
            .run(document_id, question, k, Task::Question(question.to_string()))
            .await;

        match result {
            Ok(staged) => Ok(QueryResponse {
                answer: staged.formatted,
                raw_answer: staged.raw,
                error: None,
            }),
            Err(e) => {
                log_failure("query", Some(document_id), &e);
                Err(e)
            }
        }
    }

    /// Summarize a document.
    #[instrument(skip(self))]
    pub async fn summarize(&self, document_id: &str) -> Result<SummaryResponse> {
        let retrieval = &self.settings.retrieval;
        let result = self
            .run(document_id, &retrieval.summary_query, retrieval.summary_k, Task::Summary)
            .await;

        match result {
            Ok(staged) => Ok(SummaryResponse {
                summary: staged.formatted,
                raw_summary: staged.raw,
                error: None,
            }),
            Err(e) => {
                log_failure("summarize", Some(document_id), &e);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        document_id: &str,
        retrieval_query: &str,
        k: usize,
        task: Task,
    ) -> Result<crate::rag::StagedAnswer> {
        let id = DocumentId::parse(document_id)?;
        if retrieval_query.trim().is_empty() {
            return Err(DocqueryError::InvalidInput("question is empty".to_string()));
        }

        let index = self.indexes.load(&id).await?;
        let retrieval = self.retriever.retrieve(&index, retrieval_query, k).await?;
        self.answerer.answer(&task, &retrieval.context).await
    }
}

/// Pipeline step an error came from, for logs.
fn failed_stage(err: &DocqueryError) -> String {
    match err {
        DocqueryError::Generation { stage, .. } => stage.to_string(),
        other => other.kind().as_str().to_string(),
    }
}

fn log_failure(operation: &str, document_id: Option<&str>, err: &DocqueryError) {
    warn!(
        operation = operation,
        document_id = document_id.unwrap_or("-"),
        stage = %failed_stage(err),
        error = %err,
        "Request failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InsightsMode, NO_ANSWER_FALLBACK};
    use crate::error::ErrorKind;
    use crate::extract::test_pdf;
    use crate::storage::MemoryBlobStore;
    use crate::test_support::{KeywordEmbedder, ScriptedModel};

    const DOC_ID: &str = "0123456789abcdef0123456789abcdef.pdf";

    struct Harness {
        orchestrator: Orchestrator,
        store: Arc<MemoryBlobStore>,
        generator: Arc<ScriptedModel>,
        formatter: Arc<ScriptedModel>,
        temp: tempfile::TempDir,
    }

    impl Harness {
        fn scratch_entries(&self) -> usize {
            std::fs::read_dir(self.temp.path()).map(|d| d.count()).unwrap_or(0)
        }
    }

    fn harness_with(
        generator: ScriptedModel,
        formatter: ScriptedModel,
        configure: impl FnOnce(&mut Settings),
    ) -> Harness {
        let temp = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.general.temp_dir = temp.path().to_string_lossy().into_owned();
        configure(&mut settings);

        let store = Arc::new(MemoryBlobStore::new());
        let generator = Arc::new(generator);
        let formatter = Arc::new(formatter);
        let orchestrator = Orchestrator::with_components(
            settings,
            Prompts::default(),
            store.clone(),
            Arc::new(KeywordEmbedder::new()),
            generator.clone(),
            formatter.clone(),
        )
        .unwrap();

        Harness {
            orchestrator,
            store,
            generator,
            formatter,
            temp,
        }
    }

    fn harness() -> Harness {
        harness_with(
            ScriptedModel::replying("Alpha comes first.", Stage::Generation),
            ScriptedModel::replying("**Answer**: Alpha comes first.", Stage::Formatting),
            |_| {},
        )
    }

    fn alpha_text() -> String {
        let mut text = String::from("Alpha Alpha Alpha Beta Gamma. ");
        while text.chars().count() < 3000 {
            text.push_str("lorem ipsum dolor ");
        }
        text.chars().take(3000).collect()
    }

    async fn store_index(h: &Harness, id: &str, text: &str) {
        let id = DocumentId::parse(id).unwrap();
        let chunks = h.orchestrator.splitter.split(text);
        let index = VectorIndex::build(&chunks, &KeywordEmbedder::new(), h.orchestrator.settings.retrieval.metric)
            .await
            .unwrap();
        h.orchestrator.indexes.store(&id, &index).await.unwrap();
    }

    #[tokio::test]
    async fn test_alpha_scenario() {
        let h = harness();
        let text = alpha_text();
        assert_eq!(h.orchestrator.splitter.split(&text).len(), 4);

        store_index(&h, DOC_ID, &text).await;
        let response = h.orchestrator.query(DOC_ID, "What is Alpha?").await.unwrap();

        assert_eq!(response.answer, "**Answer**: Alpha comes first.");
        assert_eq!(response.raw_answer, "Alpha comes first.");
        assert!(response.error.is_none());

        let stage1 = &h.generator.prompts()[0];
        assert!(stage1.contains("Alpha Alpha Alpha"));
        assert_eq!(h.formatter.calls(), 1);
        assert_eq!(h.scratch_entries(), 0);
    }

    #[tokio::test]
    async fn test_never_uploaded_document_degrades_cleanly() {
        let h = harness();

        let err = h.orchestrator.query(DOC_ID, "What is Alpha?").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let degraded = QueryResponse::degraded(&err);
        assert_eq!(degraded.answer, ANSWER_APOLOGY);
        assert!(degraded.raw_answer.is_empty());
        assert_eq!(h.generator.calls(), 0);
        assert_eq!(h.scratch_entries(), 0);
    }

    #[tokio::test]
    async fn test_stage_one_timeout_never_calls_formatter() {
        let h = harness_with(
            ScriptedModel::timing_out(Stage::Generation),
            ScriptedModel::replying("unused", Stage::Formatting),
            |_| {},
        );
        store_index(&h, DOC_ID, &alpha_text()).await;

        let err = h.orchestrator.query(DOC_ID, "What is Alpha?").await.unwrap_err();
        assert!(matches!(err, DocqueryError::Generation { stage: Stage::Generation, .. }));

        let degraded = QueryResponse::degraded(&err);
        assert_eq!(degraded.answer, ANSWER_APOLOGY);
        assert_eq!(degraded.raw_answer, "");
        assert_eq!(h.formatter.calls(), 0);
        assert_eq!(h.scratch_entries(), 0);
    }

    #[tokio::test]
    async fn test_invalid_id_is_rejected_before_any_work() {
        let h = harness();
        let err = h.orchestrator.summarize("../../etc/passwd").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(h.store.keys().is_empty());
        assert_eq!(h.generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_summary_uses_summary_retrieval() {
        let h = harness_with(
            ScriptedModel::replying(NO_ANSWER_FALLBACK, Stage::Generation),
            ScriptedModel::replying("**Summary**: short.", Stage::Formatting),
            |_| {},
        );
        store_index(&h, DOC_ID, &alpha_text()).await;

        let response = h.orchestrator.summarize(DOC_ID).await.unwrap();
        assert_eq!(response.summary, "**Summary**: short.");
        assert_eq!(response.raw_summary, NO_ANSWER_FALLBACK);
        assert!(h.generator.prompts()[0].contains("summary of the document"));
    }

    #[tokio::test]
    async fn test_upload_pdf_stores_everything() {
        let h = harness();
        let pdf = test_pdf::build(
            &[&["Alpha is the first letter of the Greek alphabet used in physics"]],
            Some("Letters"),
        );

        let receipt = h.orchestrator.upload("Letters.PDF", &pdf).await.unwrap();
        let id = DocumentId::parse(&receipt.document_id).unwrap();
        assert_eq!(id.kind(), FileKind::Pdf);
        assert_eq!(receipt.original_key, format!("documents/{}", id));
        assert_eq!(receipt.compressed_key, format!("compressed/{}", id));

        let keys = h.store.keys();
        assert!(keys.contains(&id.original_key()));
        assert!(keys.contains(&id.compressed_key()));
        assert!(keys.contains(&id.index_primary_key()));
        assert!(keys.contains(&id.index_sidecar_key()));
        assert_eq!(h.scratch_entries(), 0);

        let data = h.orchestrator.document_data(id.as_str()).await.unwrap();
        assert!(data.text.contains("Greek alphabet"));
        assert_eq!(data.metadata.get("Title").map(String::as_str), Some("Letters"));
        assert!(data.key_points.iter().any(|p| p.contains("Greek")));

        h.orchestrator.query(id.as_str(), "What is Alpha?").await.unwrap();
        assert!(h.generator.prompts()[0].contains("Greek alphabet"));
    }

    #[tokio::test]
    async fn test_upload_rejects_unsupported_type() {
        let h = harness();
        let err = h.orchestrator.upload("notes.txt", b"hello").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(h.store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_upload_video_without_ffmpeg_fails_as_compression() {
        let h = harness();
        let orchestrator = h
            .orchestrator
            .with_compressor(Compressor::with_ffmpeg("ffmpeg-does-not-exist-here"));

        let err = orchestrator.upload("clip.mp4", b"\0\0\0\x18ftypmp42").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Compression);
    }

    #[tokio::test]
    async fn test_document_data_rejects_video() {
        let h = harness();
        let err = h
            .orchestrator
            .document_data("0123456789abcdef0123456789abcdef.mp4")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_document_data_with_model_insights() {
        let h = harness_with(
            ScriptedModel::replying("unused", Stage::Generation),
            ScriptedModel::replying(
                r#"{"key_points": ["Alpha leads"], "keywords": ["alpha", "greek"]}"#,
                Stage::Formatting,
            ),
            |s| s.insights.mode = InsightsMode::Llm,
        );
        let pdf = test_pdf::build(&[&["Alpha and Beta"]], None);
        let receipt = h.orchestrator.upload("letters.pdf", &pdf).await.unwrap();

        let data = h.orchestrator.document_data(&receipt.document_id).await.unwrap();
        assert_eq!(data.key_points, vec!["Alpha leads"]);
        assert_eq!(data.keywords, vec!["alpha", "greek"]);
        assert!(h.formatter.prompts()[0].contains("Alpha and Beta"));
    }
}

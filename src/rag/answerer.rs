//! Two-stage answer generation.
//!
//! Stage 1 asks the generation endpoint for a plain answer grounded in the
//! retrieved context. Stage 2 asks the formatting endpoint to lay that answer
//! out as Markdown. A failed stage ends the request; nothing is retried.

use super::ResponseFormatter;
use crate::config::{EndpointSettings, Prompts, SamplingSettings, StagePrompts};
use crate::error::{DocqueryError, Result, Stage};
use crate::llm::CompletionModel;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Question(String),
    Summary,
}

impl Task {
    fn name(&self) -> &'static str {
        match self {
            Task::Question(_) => "answer",
            Task::Summary => "summary",
        }
    }
}

/// Sampling for each task on one endpoint.
#[derive(Debug, Clone, Copy)]
pub struct TaskSampling {
    pub answer: SamplingSettings,
    pub summary: SamplingSettings,
}

impl TaskSampling {
    fn for_task(&self, task: &Task) -> SamplingSettings {
        match task {
            Task::Question(_) => self.answer,
            Task::Summary => self.summary,
        }
    }
}

impl From<&EndpointSettings> for TaskSampling {
    fn from(settings: &EndpointSettings) -> Self {
        Self {
            answer: settings.answer,
            summary: settings.summary,
        }
    }
}

/// Output of both stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAnswer {
    /// Stage 2 output after rendering.
    pub formatted: String,
    /// Stage 1 output.
    pub raw: String,
}

/// Generation followed by formatting.
pub struct TwoStageAnswerer {
    generator: Arc<dyn CompletionModel>,
    format_model: Arc<dyn CompletionModel>,
    generation_sampling: TaskSampling,
    format_sampling: TaskSampling,
    prompts: Prompts,
    renderer: ResponseFormatter,
}

impl TwoStageAnswerer {
    pub fn new(
        generator: Arc<dyn CompletionModel>,
        format_model: Arc<dyn CompletionModel>,
        generation_sampling: TaskSampling,
        format_sampling: TaskSampling,
    ) -> Self {
        Self {
            generator,
            format_model,
            generation_sampling,
            format_sampling,
            prompts: Prompts::default(),
            renderer: ResponseFormatter::default(),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_renderer(mut self, renderer: ResponseFormatter) -> Self {
        self.renderer = renderer;
        self
    }

    fn templates(&self, task: &Task) -> &StagePrompts {
        match task {
            Task::Question(_) => &self.prompts.answer,
            Task::Summary => &self.prompts.summary,
        }
    }

    /// Run both stages for `task` over the retrieved `context`.
    #[instrument(skip(self, context), fields(task = task.name(), context_chars = context.len()))]
    pub async fn answer(&self, task: &Task, context: &str) -> Result<StagedAnswer> {
        let templates = self.templates(task);

        let mut vars = HashMap::new();
        vars.insert("context".to_string(), context.to_string());
        if let Task::Question(question) = task {
            vars.insert("question".to_string(), question.clone());
        }

        let prompt = self.prompts.render_with_custom(&templates.generate, &vars);
        let raw = self
            .generator
            .complete(None, &prompt, self.generation_sampling.for_task(task))
            .await
            .map_err(|e| at_stage(Stage::Generation, e))?;
        debug!(raw_chars = raw.len(), "Generation stage complete");

        vars.insert("raw".to_string(), raw.clone());
        let prompt = self.prompts.render_with_custom(&templates.format, &vars);
        let formatted = self
            .format_model
            .complete(None, &prompt, self.format_sampling.for_task(task))
            .await
            .map_err(|e| at_stage(Stage::Formatting, e))?;
        debug!(formatted_chars = formatted.len(), "Formatting stage complete");

        Ok(StagedAnswer {
            formatted: self.renderer.format(&formatted),
            raw,
        })
    }
}

/// Attribute an error to the stage that produced it.
fn at_stage(stage: Stage, err: DocqueryError) -> DocqueryError {
    match err {
        DocqueryError::Generation { message, .. } => DocqueryError::generation(stage, message),
        other => DocqueryError::generation(stage, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NO_ANSWER_FALLBACK, NO_SUMMARY_FALLBACK};
    use crate::test_support::ScriptedModel;

    fn sampling() -> TaskSampling {
        TaskSampling::from(&EndpointSettings::generation())
    }

    fn answerer(generator: Arc<ScriptedModel>, formatter: Arc<ScriptedModel>) -> TwoStageAnswerer {
        TwoStageAnswerer::new(generator, formatter, sampling(), sampling())
    }

    #[tokio::test]
    async fn test_both_stages_run_in_order() {
        let generator = Arc::new(ScriptedModel::replying("Alpha is first.", Stage::Generation));
        let formatter = Arc::new(ScriptedModel::replying("**Answer**: Alpha is first.", Stage::Formatting));
        let answerer = answerer(generator.clone(), formatter.clone());

        let out = answerer
            .answer(&Task::Question("What is Alpha?".into()), "Alpha context")
            .await
            .unwrap();

        assert_eq!(out.raw, "Alpha is first.");
        assert_eq!(out.formatted, "**Answer**: Alpha is first.");

        let stage1 = &generator.prompts()[0];
        assert!(stage1.contains("Alpha context"));
        assert!(stage1.contains("What is Alpha?"));
        assert!(stage1.contains(NO_ANSWER_FALLBACK));
        assert!(formatter.prompts()[0].contains("Alpha is first."));
    }

    #[tokio::test]
    async fn test_summary_uses_summary_prompts() {
        let generator = Arc::new(ScriptedModel::replying("A summary.", Stage::Generation));
        let formatter = Arc::new(ScriptedModel::replying("**Summary**", Stage::Formatting));
        let answerer = answerer(generator.clone(), formatter);

        answerer.answer(&Task::Summary, "ctx").await.unwrap();
        assert!(generator.prompts()[0].contains(NO_SUMMARY_FALLBACK));
    }

    #[tokio::test]
    async fn test_stage_one_failure_skips_formatting() {
        let generator = Arc::new(ScriptedModel::timing_out(Stage::Generation));
        let formatter = Arc::new(ScriptedModel::replying("unused", Stage::Formatting));
        let answerer = answerer(generator.clone(), formatter.clone());

        let err = answerer
            .answer(&Task::Question("q".into()), "ctx")
            .await
            .unwrap_err();

        assert!(matches!(err, DocqueryError::Generation { stage: Stage::Generation, .. }));
        assert_eq!(generator.calls(), 1);
        assert_eq!(formatter.calls(), 0);
    }

    #[tokio::test]
    async fn test_stage_two_failure_is_attributed() {
        let generator = Arc::new(ScriptedModel::replying("raw", Stage::Generation));
        // Tagged as generation by the model itself; the answerer re-attributes it.
        let formatter = Arc::new(ScriptedModel::timing_out(Stage::Generation));
        let answerer = answerer(generator, formatter);

        let err = answerer.answer(&Task::Summary, "ctx").await.unwrap_err();
        assert!(matches!(err, DocqueryError::Generation { stage: Stage::Formatting, .. }));
    }

    #[tokio::test]
    async fn test_renderer_applies_to_formatted_only() {
        let generator = Arc::new(ScriptedModel::replying("raw *text*", Stage::Generation));
        let formatter = Arc::new(ScriptedModel::replying("**bold**", Stage::Formatting));
        let answerer = answerer(generator, formatter)
            .with_renderer(ResponseFormatter::new(crate::rag::OutputFormat::Html));

        let out = answerer.answer(&Task::Summary, "ctx").await.unwrap();
        assert_eq!(out.raw, "raw *text*");
        assert!(out.formatted.contains("<strong>bold</strong>"));
    }
}

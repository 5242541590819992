//! Prompt templates for docquery.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.
//! Templates use `{{name}}` placeholders.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("placeholder pattern is valid"));

/// Phrase the generation model is told to emit when the context has no answer.
pub const NO_ANSWER_FALLBACK: &str = "No relevant information found.";

/// Phrase the generation model is told to emit when it cannot summarize.
pub const NO_SUMMARY_FALLBACK: &str = "Insufficient information for summary.";

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    /// Question answering (`{{context}}`, `{{question}}`, `{{raw}}`).
    pub answer: StagePrompts,
    /// Summaries (`{{context}}`, `{{raw}}`).
    pub summary: StagePrompts,
    /// Document insight extraction (`{{text}}`, `{{max_key_points}}`, `{{max_keywords}}`).
    pub insights: InsightsPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            answer: StagePrompts::answer(),
            summary: StagePrompts::summary(),
            insights: InsightsPrompts::default(),
            variables: HashMap::new(),
        }
    }
}

/// Templates for the two answerer stages of one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagePrompts {
    /// Stage 1: raw answer from retrieved context.
    pub generate: String,
    /// Stage 2: Markdown layout of the raw answer.
    pub format: String,
}

impl StagePrompts {
    fn answer() -> Self {
        Self {
            generate: format!(
                r#"[INST]
Context: {{{{context}}}}

Question: {{{{question}}}}

Instructions:
- Provide a concise, accurate answer to the question based on the context.
- If the context lacks relevant information, state: "{NO_ANSWER_FALLBACK}"
- Avoid unnecessary details.

Answer:
[/INST]"#
            ),
            format: r#"**Input Response**: {{raw}}

**Instructions**:
- Format the input response into a structured output with the following sections:
  - **Answer**: A concise answer in 1-2 sentences.
  - **Insights**: 2-4 bullet-point insights derived from the response.
  - **Table**: A Markdown table summarizing key information (e.g., question, answer, source).
  - **Diagram**: A simple ASCII or Markdown-based flowchart or diagram (if applicable, e.g., for processes).
- Use Markdown formatting for clarity.
- Clean up stray punctuation and keep the tone casual and friendly.
- If the response lacks sufficient information, note it in the answer section.
- Ensure the output is clean and suitable for frontend rendering.

**Formatted Output**:"#
                .to_string(),
        }
    }

    fn summary() -> Self {
        Self {
            generate: format!(
                r#"[INST]
Context: {{{{context}}}}

Instructions:
- Provide a concise summary of the document in 3-5 sentences.
- Focus on the main topics and key information.
- If the context is insufficient, state: "{NO_SUMMARY_FALLBACK}"

Summary:
[/INST]"#
            ),
            format: r#"**Input Summary**: {{raw}}

**Instructions**:
- Format the input summary into a structured output with the following sections:
  - **Summary**: A concise summary in 3-5 sentences.
  - **Insights**: 3-5 bullet-point insights derived from the summary.
  - **Table**: A Markdown table summarizing key information (e.g., main topics, key points).
  - **Diagram**: A simple ASCII or Markdown-based flowchart (if applicable, e.g., for processes).
- Use Markdown formatting for clarity.
- Clean up stray punctuation and keep the tone casual and friendly.
- If the summary lacks sufficient information, note it in the summary section.
- Ensure the output is clean and suitable for frontend rendering.

**Formatted Output**:"#
                .to_string(),
        }
    }
}

/// Prompts for model-derived document insights.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsPrompts {
    pub system: String,
    pub user: String,
}

impl Default for InsightsPrompts {
    fn default() -> Self {
        Self {
            system: "You extract key points and keywords from documents. Respond with JSON only.".to_string(),
            user: r#"Read the document below and extract:
- up to {{max_key_points}} key points, each a single sentence
- up to {{max_keywords}} keywords, each one or two lowercase words

Respond with a JSON object exactly like:
{"key_points": ["..."], "keywords": ["..."]}

If you cannot produce JSON, use these section markers instead:
Key Points:
- ...
Keywords:
- ...

Document:
{{text}}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Self::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let answer_path = custom_path.join("answer.toml");
            if answer_path.exists() {
                let content = std::fs::read_to_string(&answer_path)?;
                prompts.answer = toml::from_str(&content)?;
            }

            let summary_path = custom_path.join("summary.toml");
            if summary_path.exists() {
                let content = std::fs::read_to_string(&summary_path)?;
                prompts.summary = toml::from_str(&content)?;
            }

            let insights_path = custom_path.join("insights.toml");
            if insights_path.exists() {
                let content = std::fs::read_to_string(&insights_path)?;
                prompts.insights = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are resolved in one pass over the template, so values that
    /// themselves contain `{{name}}` are inserted verbatim. Unknown
    /// placeholders are left as they are.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        PLACEHOLDER_RE
            .replace_all(template, |caps: &regex::Captures| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts_carry_fallbacks() {
        let prompts = Prompts::default();
        assert!(prompts.answer.generate.contains(NO_ANSWER_FALLBACK));
        assert!(prompts.answer.generate.contains("{{context}}"));
        assert!(prompts.answer.generate.contains("{{question}}"));
        assert!(prompts.summary.generate.contains(NO_SUMMARY_FALLBACK));
        assert!(prompts.summary.format.contains("{{raw}}"));
        assert!(prompts.answer.format.contains("**Diagram**"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), "doc says {{question}}".to_string());
        vars.insert("question".to_string(), "Q {{context}}".to_string());

        for _ in 0..32 {
            let prompts = Prompts::default();
            let out = prompts.render_with_custom("C: {{context}} | Q: {{question}} | {{missing}}", &vars);
            assert_eq!(out, "C: doc says {{question}} | Q: Q {{context}} | {{missing}}");
        }
    }

    #[test]
    fn test_provided_vars_override_custom() {
        let mut custom = HashMap::new();
        custom.insert("tone".to_string(), "formal".to_string());
        custom.insert("name".to_string(), "config".to_string());
        let prompts = Prompts::load(None, Some(&custom)).unwrap();

        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "request".to_string());
        let out = prompts.render_with_custom("{{name}} / {{tone}}", &vars);
        assert_eq!(out, "request / formal");
    }

    #[test]
    fn test_custom_dir_overrides_answer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("answer.toml"),
            "generate = \"Q: {{question}}\"\nformat = \"F: {{raw}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.answer.generate, "Q: {{question}}");
        assert!(prompts.summary.generate.contains(NO_SUMMARY_FALLBACK));
    }
}

//! Key points and keywords for the document data view.
//!
//! Two sources: cheap local heuristics over the extracted text, or a model
//! response. Model output is parsed as JSON first and falls back to
//! section markers; a missing section yields an empty list, never a panic.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::warn;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("word pattern is valid"));

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

/// Derived highlights of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInsights {
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl DocumentInsights {
    /// First `max` trimmed lines longer than `min_chars`.
    pub fn local_key_points(text: &str, min_chars: usize, max: usize) -> Vec<String> {
        text.split('\n')
            .map(str::trim)
            .filter(|line| line.chars().count() > min_chars)
            .take(max)
            .map(str::to_string)
            .collect()
    }

    /// Heuristic insights computed from the text alone.
    pub fn local(text: &str, min_chars: usize, max_key_points: usize, max_keywords: usize) -> Self {
        let mut counter = KeywordCounter::default();
        counter.add_text(text);
        Self {
            key_points: Self::local_key_points(text, min_chars, max_key_points),
            keywords: counter.most_common(max_keywords),
        }
    }
}

/// Word frequency counter that remembers first occurrence for tie-breaking.
#[derive(Debug, Default)]
pub struct KeywordCounter {
    counts: HashMap<String, (usize, usize)>,
    seen: usize,
}

impl KeywordCounter {
    /// Count lowercase `\w+` tokens, skipping stop words.
    pub fn add_text(&mut self, text: &str) {
        let lowered = text.to_lowercase();
        for word in WORD_RE.find_iter(&lowered).map(|m| m.as_str()) {
            if STOP_WORDS.contains(&word) {
                continue;
            }
            let order = self.seen;
            let entry = self.counts.entry(word.to_string()).or_insert((0, order));
            entry.0 += 1;
            self.seen += 1;
        }
    }

    /// Highest counts first; equal counts keep first-seen order.
    pub fn most_common(&self, n: usize) -> Vec<String> {
        let mut entries: Vec<(&String, &(usize, usize))> = self.counts.iter().collect();
        entries.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
        entries.into_iter().take(n).map(|(w, _)| w.clone()).collect()
    }
}

/// Parse a model response into insights, truncating to the requested sizes.
pub fn parse_model_insights(response: &str, max_key_points: usize, max_keywords: usize) -> DocumentInsights {
    let mut insights = parse_json(response).unwrap_or_else(|| parse_markers(response));
    insights.key_points.retain(|p| !p.trim().is_empty());
    insights.keywords.retain(|k| !k.trim().is_empty());
    insights.key_points.truncate(max_key_points);
    insights.keywords.truncate(max_keywords);
    insights
}

fn parse_json(response: &str) -> Option<DocumentInsights> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&response[start..=end]).ok()
}

/// Marker headings recognised in free-text responses (lowercased, no colon).
const KEY_POINT_MARKERS: &[&str] = &["key points", "key_points", "keypoints"];
const KEYWORD_MARKERS: &[&str] = &["keywords", "key words"];

#[derive(Clone, Copy, PartialEq)]
enum Section {
    None,
    KeyPoints,
    Keywords,
}

fn parse_markers(response: &str) -> DocumentInsights {
    let mut insights = DocumentInsights::default();
    let mut section = Section::None;
    let mut saw_key_points = false;
    let mut saw_keywords = false;

    for raw_line in response.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        let (heading, inline) = split_heading(line);
        if KEY_POINT_MARKERS.contains(&heading.as_str()) {
            section = Section::KeyPoints;
            saw_key_points = true;
            push_items(&mut insights.key_points, inline, false);
            continue;
        }
        if KEYWORD_MARKERS.contains(&heading.as_str()) {
            section = Section::Keywords;
            saw_keywords = true;
            push_items(&mut insights.keywords, inline, true);
            continue;
        }

        match section {
            Section::KeyPoints => push_items(&mut insights.key_points, strip_bullet(line), false),
            Section::Keywords => push_items(&mut insights.keywords, strip_bullet(line), true),
            Section::None => {}
        }
    }

    if !saw_key_points {
        warn!("Model insights response had no key points section");
    }
    if !saw_keywords {
        warn!("Model insights response had no keywords section");
    }

    insights
}

/// Split `**Key Points:** rest` into (`key points`, `rest`). Lines without a
/// colon return the whole line lowercased and no inline content.
fn split_heading(line: &str) -> (String, &str) {
    let cleaned = line.trim_start_matches(['#', '*', ' ']);
    match cleaned.split_once(':') {
        Some((head, rest)) => (
            head.trim().trim_end_matches('*').trim().to_lowercase(),
            rest.trim_start_matches('*').trim(),
        ),
        None => (cleaned.trim_end_matches('*').trim().to_lowercase(), ""),
    }
}

fn strip_bullet(line: &str) -> &str {
    let trimmed = line.trim_start_matches(['-', '*', '•', ' ']);
    // Numbered items: "1. text" / "2) text"
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &trimmed[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return rest.trim();
        }
    }
    trimmed.trim()
}

fn push_items(target: &mut Vec<String>, content: &str, comma_separated: bool) {
    if content.is_empty() {
        return;
    }
    if comma_separated {
        target.extend(
            content
                .split(',')
                .map(|s| s.trim().trim_matches('"').to_string())
                .filter(|s| !s.is_empty()),
        );
    } else {
        target.push(content.to_string());
    }
}

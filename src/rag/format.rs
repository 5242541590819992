//! Final rendering of formatted answers.

use super::OutputFormat;
use pulldown_cmark::{html, Event, Options, Parser};

/// Applies the configured output format to formatting-stage Markdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseFormatter {
    format: OutputFormat,
}

impl ResponseFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, markdown: &str) -> String {
        match self.format {
            OutputFormat::Markdown => markdown.to_string(),
            OutputFormat::Html => render_html(markdown),
        }
    }
}

/// CommonMark to HTML. Raw HTML from the model is emitted as escaped text.
fn render_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_is_passthrough() {
        let md = "**Answer**: Alpha.\n\n| a | b |\n|---|---|\n| 1 | 2 |\n";
        assert_eq!(ResponseFormatter::default().format(md), md);
    }

    #[test]
    fn test_html_renders_tables() {
        let out = ResponseFormatter::new(OutputFormat::Html)
            .format("**Answer**\n\n| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(out.contains("<strong>Answer</strong>"));
        assert!(out.contains("<table>"));
    }

    #[test]
    fn test_html_escapes_raw_html() {
        let out = ResponseFormatter::new(OutputFormat::Html).format("hi <script>alert(1)</script>");
        assert!(!out.contains("<script>"));
        assert!(out.contains("&lt;script&gt;"));
    }
}

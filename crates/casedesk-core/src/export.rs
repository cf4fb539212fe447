//! Plain-text and Markdown export of generated documents.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Text,
    Markdown,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "txt" | "text" | "plain" => Ok(ExportFormat::Text),
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            other => Err(CoreError::InvalidExportFormat(other.to_string())),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Markdown => "md",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Text => "text/plain; charset=utf-8",
            ExportFormat::Markdown => "text/markdown; charset=utf-8",
        }
    }
}

/// A rendered export ready to hand to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

pub fn export(name: &str, content: &str, format: ExportFormat) -> ExportedDocument {
    let body = match format {
        ExportFormat::Text => strip_markdown(content),
        ExportFormat::Markdown => content.to_string(),
    };
    ExportedDocument {
        filename: export_filename(name, format),
        content_type: format.content_type(),
        body,
    }
}

pub fn export_filename(name: &str, format: ExportFormat) -> String {
    format!("{}.{}", name.replace(' ', "_"), format.extension())
}

struct Rule {
    re: Regex,
    with: &'static str,
}

static RULES: OnceLock<Vec<Rule>> = OnceLock::new();

// Applied in order; later rules see the output of earlier ones.
fn rules() -> &'static [Rule] {
    RULES.get_or_init(|| {
        [
            (r"\*\*\*(.+?)\*\*\*", "$1"),
            (r"\*\*(.+?)\*\*", "$1"),
            (r"\*(.+?)\*", "$1"),
            (r"__(.+?)__", "$1"),
            (r"_(.+?)_", "$1"),
            (r"(?m)^#{1,6}\s+(.+)$", "$1"),
            (r"(?m)^\s*[-*+]\s+", "• "),
            (r"(?m)^\s*(\d+)\.\s+", "$1. "),
            (r"(?m)^\s*>\s+", ""),
            (r"(?m)^[-*_]{3,}$", ""),
            (r"```[\s\S]*?```", ""),
            (r"`(.+?)`", "$1"),
            (r"\n{3,}", "\n\n"),
        ]
        .into_iter()
        .map(|(pattern, with)| Rule {
            re: Regex::new(pattern).unwrap(),
            with,
        })
        .collect()
    })
}

/// Remove Markdown markup, keeping the text and list structure.
pub fn strip_markdown(content: &str) -> String {
    rules().iter().fold(content.to_string(), |text, rule| {
        rule.re.replace_all(&text, rule.with).into_owned()
    })
}

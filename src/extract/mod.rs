
use pulldown_cmark::{Event, Parser, TagEnd};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

use crate::{RagError, Result};

/// Document formats that can be turned into plain text for chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Text,
    Markdown,
    Html,
    Csv,
    Json,
}

impl FileType {
    /// Map a file extension (without the dot, any case) to a file type
    #[inline]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "txt" | "text" | "log" => Some(Self::Text),
            "md" | "markdown" => Some(Self::Markdown),
            "html" | "htm" => Some(Self::Html),
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    #[inline]
    pub fn from_path(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| {
                RagError::Extraction(format!(
                    "Unsupported file type: {} (supported: txt, md, html, csv, json)",
                    path.display()
                ))
            })
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for FileType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extract the readable text of a document
#[inline]
pub fn extract_text(content: &[u8], file_type: FileType) -> Result<String> {
    let source = std::str::from_utf8(content)
        .map_err(|e| RagError::Extraction(format!("Document is not valid UTF-8: {}", e)))?;

    let text = match file_type {
        FileType::Text => source.to_string(),
        FileType::Markdown => markdown_to_text(source),
        FileType::Html => html_to_text(source),
        FileType::Csv => csv_to_text(source),
        FileType::Json => json_to_text(source)?,
    };

    debug!(
        "Extracted {} characters of text from {} document",
        text.len(),
        file_type
    );
    Ok(text)
}

fn markdown_to_text(markdown: &str) -> String {
    let mut text = String::with_capacity(markdown.len());

    for event in Parser::new(markdown) {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak | Event::End(TagEnd::TableCell) => {
                text.push(' ');
            }
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::Item
                | TagEnd::CodeBlock
                | TagEnd::TableRow
                | TagEnd::TableHead,
            ) => text.push('\n'),
            _ => {}
        }
    }

    text
}

fn html_to_text(html: &str) -> String {
    let unwanted_selector =
        Selector::parse("script, style, noscript, template, nav, header, footer")
            .expect("valid selector");
    let main_content_selector = Selector::parse("main, article").expect("valid selector");
    let body_selector = Selector::parse("body").expect("valid selector");

    // Prefer the main content, then the whole body, then the whole document
    let document = Html::parse_document(html);
    let content_html = document
        .select(&main_content_selector)
        .next()
        .or_else(|| document.select(&body_selector).next())
        .map_or_else(|| document.html(), |element| element.html());

    let mut content = Html::parse_fragment(&content_html);
    let unwanted_node_ids: Vec<_> = content
        .select(&unwanted_selector)
        .map(|element| element.id())
        .collect();
    for node_id in unwanted_node_ids {
        if let Some(mut node) = content.tree.get_mut(node_id) {
            node.detach();
        }
    }

    content
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn csv_to_text(csv: &str) -> String {
    csv.lines()
        .map(|line| {
            line.split(',')
                .map(|cell| cell.trim().trim_matches('"'))
                .filter(|cell| !cell.is_empty())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn json_to_text(json: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| RagError::Extraction(format!("Invalid JSON document: {}", e)))?;

    let mut lines = Vec::new();
    flatten_json(&value, "", &mut lines);
    Ok(lines.join("\n"))
}

fn flatten_json(value: &serde_json::Value, path: &str, lines: &mut Vec<String>) {
    use serde_json::Value;

    let leaf = |rendered: String, lines: &mut Vec<String>| {
        if path.is_empty() {
            lines.push(rendered);
        } else {
            lines.push(format!("{}: {}", path, rendered));
        }
    };

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                flatten_json(child, &child_path, lines);
            }
        }
        Value::Array(items) => {
            for child in items {
                flatten_json(child, path, lines);
            }
        }
        Value::String(s) => leaf(s.clone(), lines),
        Value::Number(n) => leaf(n.to_string(), lines),
        Value::Bool(b) => leaf(b.to_string(), lines),
        Value::Null => {}
    }
}

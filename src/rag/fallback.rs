//! Heuristic answers for when the generation gateway is unavailable
//!
//! The extractor looks for the kind of fact a question asks about (a name, a
//! date, an amount, a place) with regular expressions, then falls back to
//! quoting context sentences that share words with the question.


use fancy_regex::Regex;
use itertools::Itertools;
use std::sync::LazyLock;
use tracing::debug;

use crate::embeddings::normalize_text;
use crate::generation::prompt::strip_section_headers;

/// Returned when nothing in the context relates to the question
pub const FALLBACK_APOLOGY: &str = "I couldn't generate an answer from the available documents. \
     Please try rephrasing your question or asking about a more specific detail.";

const MAX_MATCHES_PER_CATEGORY: usize = 5;
const MAX_SENTENCES: usize = 3;
const MIN_SENTENCE_LENGTH: usize = 10;
const MIN_KEYWORD_LENGTH: usize = 3;

/// Produces an answer from retrieved context without a language model
pub trait FallbackExtractor: Send + Sync {
    /// Never fails; the worst case is [`FALLBACK_APOLOGY`]
    fn extract(&self, question: &str, context: &str) -> String;
}

/// Regex and keyword-overlap extraction
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicExtractor;

impl FallbackExtractor for HeuristicExtractor {
    #[inline]
    fn extract(&self, question: &str, context: &str) -> String {
        let context = strip_section_headers(context);

        let typed = extract_typed_facts(question, &context);
        if !typed.is_empty() {
            debug!("Fallback answered with typed extraction");
            return typed;
        }

        let sentences = matching_sentences(question, &context);
        if !sentences.is_empty() {
            debug!(
                "Fallback answered with {} matching sentences",
                sentences.len()
            );
            return sentences.join(" ");
        }

        debug!("Fallback found nothing related to the question");
        FALLBACK_APOLOGY.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FactCategory {
    Name,
    Date,
    Number,
    Location,
}

impl FactCategory {
    const ALL: [Self; 4] = [Self::Name, Self::Date, Self::Number, Self::Location];

    fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Name => &["name", "who"],
            Self::Date => &["date", "when"],
            Self::Number => &[
                "number", "amount", "value", "how much", "how many", "total", "cost", "price",
            ],
            Self::Location => &["location", "where", "address"],
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Name => "Names",
            Self::Date => "Dates",
            Self::Number => "Values",
            Self::Location => "Locations",
        }
    }

    fn patterns(self) -> &'static [Regex] {
        match self {
            Self::Name => &NAME_PATTERNS,
            Self::Date => &DATE_PATTERNS,
            Self::Number => &NUMBER_PATTERNS,
            Self::Location => &LOCATION_PATTERNS,
        }
    }

    /// Whether the question asks for this kind of fact
    ///
    /// Single-word keywords match a whole word or its plural, so "names"
    /// selects names but "whole" does not select "who".
    fn is_asked_for(self, question: &str) -> bool {
        let question = question.to_lowercase();
        let words: Vec<&str> = question
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        self.keywords().iter().any(|keyword| {
            if keyword.contains(' ') {
                question.contains(keyword)
            } else {
                words.iter().any(|word| is_word_or_plural(word, keyword))
            }
        })
    }
}

fn is_word_or_plural(word: &str, keyword: &str) -> bool {
    word == keyword
        || word.strip_suffix('s').is_some_and(|singular| {
            singular == keyword || singular.strip_suffix('e') == Some(keyword)
        })
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
}

const MONTH: &str = "(?:Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|June?|July?|Aug(?:ust)?|Sep(?:t(?:ember)?)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)";

static NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i:\b(?:full name|name|applicant|patient|customer|employee|contact|author)\s*[:\-]\s*)([A-Z][A-Za-z'\-]+(?:[ \t]+[A-Z][A-Za-z'\-]+){0,3})",
        r"\b(?:Mr|Mrs|Ms|Miss|Dr|Prof)\.?\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?",
    ])
});

static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\b\d{4}-\d{2}-\d{2}\b",
        r"\b\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2,4}\b",
        &format!(r"\b{MONTH}\.?\s+\d{{1,2}}(?:st|nd|rd|th)?,?\s+\d{{4}}\b"),
        &format!(r"\b\d{{1,2}}(?:st|nd|rd|th)?\s+{MONTH}\.?,?\s+\d{{4}}\b"),
    ])
});

static NUMBER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\b([A-Za-z][A-Za-z ]{1,30}?)\s*[:=]\s*(\$?\s?\d[\d,]*(?:\.\d+)?(?:\s*%|\s*(?:USD|EUR|GBP|dollars|euros|kg|km|cm|mm|lbs?|hours?|days?|months?|years?|units?|items?|people|employees)\b)?)",
        r"\$\s?\d[\d,]*(?:\.\d{1,2})?",
    ])
});

static LOCATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\b\d{1,5}\s+(?:[A-Z][a-z]+\s+){1,4}(?:Street|St|Avenue|Ave|Road|Rd|Boulevard|Blvd|Lane|Ln|Drive|Dr|Court|Ct|Way|Place|Pl)\b\.?",
        r"\b[A-Z][a-z]+(?:\s[A-Z][a-z]+)*,\s*[A-Z]{2}\s+\d{5}(?:-\d{4})?\b",
        r"(?i:\b(?:address|location|located at|based in)\s*:?\s+)([A-Z0-9][^.;\n]{3,80})",
    ])
});

static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?<=[.!?])\s+").expect("valid regex"));

/// Render one match: the capture groups joined by ": ", or the whole match
/// when the pattern has no groups
fn render_match(captures: &fancy_regex::Captures<'_>) -> Option<String> {
    let groups: Vec<&str> = captures
        .iter()
        .skip(1)
        .flatten()
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect();

    let rendered = if groups.is_empty() {
        captures.get(0)?.as_str().trim().to_string()
    } else {
        groups.join(": ")
    };

    (!rendered.is_empty()).then_some(rendered)
}

fn extract_typed_facts(question: &str, context: &str) -> String {
    FactCategory::ALL
        .into_iter()
        .filter(|category| category.is_asked_for(question))
        .filter_map(|category| {
            let matches: Vec<String> = category
                .patterns()
                .iter()
                .flat_map(|pattern| pattern.captures_iter(context).flatten())
                .filter_map(|captures| render_match(&captures))
                .unique()
                .take(MAX_MATCHES_PER_CATEGORY)
                .collect();

            (!matches.is_empty()).then(|| {
                format!(
                    "{} found in the documents: {}.",
                    category.label(),
                    matches.join("; ")
                )
            })
        })
        .join("\n")
}

fn matching_sentences(question: &str, context: &str) -> Vec<String> {
    let question = question.to_lowercase();
    let keywords: Vec<&str> = question
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > MIN_KEYWORD_LENGTH)
        .collect();

    if keywords.is_empty() {
        return Vec::new();
    }

    SENTENCE_BREAK
        .split(context)
        .flatten()
        .map(normalize_text)
        .filter(|sentence| sentence.chars().count() > MIN_SENTENCE_LENGTH)
        .filter(|sentence| {
            let lowered = sentence.to_lowercase();
            keywords.iter().any(|keyword| lowered.contains(keyword))
        })
        .take(MAX_SENTENCES)
        .collect()
}

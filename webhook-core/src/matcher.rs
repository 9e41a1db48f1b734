//! Paragraph extraction and relevance matching for the scraped website.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

pub const NOT_FOUND_TEXT: &str = "Fant ikke relevant tekst på nettsiden.";

static PARAGRAPH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<p(?:\s[^>]*)?>(.*?)</p\s*>").expect("paragraph pattern is valid")
});

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// How a paragraph is picked from the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// First non-empty paragraph.
    FirstParagraph,
    /// First paragraph sharing a domain keyword with the utterance.
    #[default]
    Keyword,
}

impl MatchPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchPolicy::FirstParagraph => "first-paragraph",
            MatchPolicy::Keyword => "keyword",
        }
    }

    pub const fn all() -> &'static [MatchPolicy] {
        &[MatchPolicy::Keyword, MatchPolicy::FirstParagraph]
    }
}

impl std::fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for MatchPolicy {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "first-paragraph" => Ok(MatchPolicy::FirstParagraph),
            "keyword" => Ok(MatchPolicy::Keyword),
            _ => Err(anyhow::anyhow!(
                "Unknown match policy '{value}'. Supported policies: keyword, first-paragraph."
            )),
        }
    }
}

/// Text of every `<p>` element in document order, inline markup stripped and
/// whitespace collapsed. Empty paragraphs are kept so callers see the page as is.
pub fn extract_paragraphs(html: &str) -> Vec<String> {
    PARAGRAPH
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|inner| paragraph_text(inner.as_str()))
        .collect()
}

/// Visible text only: tags are dropped before entity decoding so link targets
/// never leak into the text.
fn paragraph_text(inner: &str) -> String {
    let stripped = TAG.replace_all(inner, "");
    let decoded = nanohtml2text::html2text(&stripped);
    WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}

/// Selects the answer paragraph for an utterance. Keywords are lower-cased once
/// at construction.
#[derive(Debug, Clone)]
pub struct RelevanceMatcher {
    policy: MatchPolicy,
    keywords: Vec<String>,
}

impl RelevanceMatcher {
    pub fn new(policy: MatchPolicy, keywords: &[String]) -> Self {
        let keywords = keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        Self { policy, keywords }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Returns the selected paragraph, or `None` if nothing qualifies.
    pub fn select<'a>(&self, paragraphs: &'a [String], utterance: &str) -> Option<&'a str> {
        match self.policy {
            MatchPolicy::FirstParagraph => paragraphs
                .iter()
                .map(String::as_str)
                .find(|p| !p.is_empty()),
            MatchPolicy::Keyword => {
                let utterance = utterance.to_lowercase();
                let active: Vec<&str> = self
                    .keywords
                    .iter()
                    .map(String::as_str)
                    .filter(|k| utterance.contains(k))
                    .collect();

                if active.is_empty() {
                    return None;
                }

                paragraphs.iter().map(String::as_str).find(|p| {
                    let lower = p.to_lowercase();
                    active.iter().any(|k| lower.contains(k))
                })
            }
        }
    }

    /// Final answer text: the selected paragraph or the policy's no-match message.
    pub fn answer(&self, paragraphs: &[String], utterance: &str, page_url: &str) -> String {
        match self.select(paragraphs, utterance) {
            Some(paragraph) => paragraph.to_string(),
            None => match self.policy {
                MatchPolicy::FirstParagraph => NOT_FOUND_TEXT.to_string(),
                MatchPolicy::Keyword => see_website_text(page_url),
            },
        }
    }
}

pub fn see_website_text(page_url: &str) -> String {
    format!("Se mer informasjon på nettsiden: {page_url}")
}

//! Fenced code block extraction from a completed answer.

use std::sync::LazyLock;

use regex::Regex;

/// Fence language tags recognized by default. The backend is prompted to
/// answer UI requests with a `jsx` block; `tsx` covers the typed variant.
pub const DEFAULT_PREVIEW_LANGUAGES: &[&str] = &["jsx", "tsx"];

// A fence is three backticks immediately followed by a language tag.
// The tag capture is the maximal run of tag characters, so "json" never
// half-matches "js"; recognition is decided against the configured set.
static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```([A-Za-z0-9_+#.-]+)(.*?)```").expect("fence regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedCode {
    pub language: String,
    pub source: String,
}

/// Pure, deterministic scanner for preview-worthy code blocks.
#[derive(Debug, Clone)]
pub struct CodeExtractor {
    languages: Vec<String>,
}

impl CodeExtractor {
    pub fn new(languages: impl IntoIterator<Item = String>) -> Self {
        Self {
            languages: languages.into_iter().collect(),
        }
    }

    /// Return the first fenced block whose tag matches a recognized
    /// language, with surrounding whitespace trimmed. `None` means no
    /// preview is available for this answer; it is not an error.
    pub fn extract(&self, text: &str) -> Option<ExtractedCode> {
        for cap in FENCE_RE.captures_iter(text) {
            let tag = &cap[1];
            if self
                .languages
                .iter()
                .any(|lang| lang.eq_ignore_ascii_case(tag))
            {
                let source = cap[2].trim();
                // The first recognized block is canonical. An empty one
                // previews nothing, same as an answer with no block.
                if source.is_empty() {
                    return None;
                }
                return Some(ExtractedCode {
                    language: tag.to_ascii_lowercase(),
                    source: source.to_string(),
                });
            }
        }
        None
    }
}

impl Default for CodeExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_LANGUAGES.iter().map(|s| s.to_string()))
    }
}

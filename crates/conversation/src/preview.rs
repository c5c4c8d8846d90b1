//! Preview pane visibility, derived from extraction with user overrides.

use crate::extract::ExtractedCode;

/// Two-state machine over `{visible, code}`.
///
/// Each completed answer re-derives the default: code present opens the
/// pane, code absent hides it and clears the text. Explicit open/close
/// actions override the derived default until the next code transition.
#[derive(Debug, Default)]
pub struct PreviewController {
    visible: bool,
    code: String,
    language: Option<String>,
}

impl PreviewController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Apply the extraction result of a completed answer. Empty source
    /// text is treated as absent: an empty pane must stay unreachable
    /// no matter what the caller hands in.
    pub fn sync(&mut self, extracted: Option<ExtractedCode>) {
        match extracted.filter(|code| !code.source.is_empty()) {
            Some(code) => {
                self.code = code.source;
                self.language = Some(code.language);
                self.visible = true;
            }
            None => {
                self.code.clear();
                self.language = None;
                self.visible = false;
            }
        }
    }

    /// Hide the pane. The last code stays available for re-open.
    pub fn user_close(&mut self) {
        self.visible = false;
    }

    /// Show the pane again. No-op while there is no code: an empty
    /// preview pane must be unreachable.
    pub fn user_open(&mut self) {
        if !self.code.is_empty() {
            self.visible = true;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

//! Per-request context: the language records are read and written under.

use serde::{Deserialize, Serialize};

pub const FALLBACK_LOCALE: &str = "en";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Locale code such as `es_ES`; `None` means the default language
    pub language: Option<String>,
}

impl RequestContext {
    pub fn with_language(code: impl Into<String>) -> Self {
        Self {
            language: Some(code.into()),
        }
    }

    /// The caller's locale, or `"en"`.
    pub fn locale(&self) -> &str {
        self.language.as_deref().unwrap_or(FALLBACK_LOCALE)
    }

    /// Two-letter language part of the locale.
    pub fn lang_prefix(&self) -> String {
        self.locale().chars().take(2).collect()
    }

    /// The language a translatable write should land in, or `None` for the
    /// base values.
    pub fn translation_language(&self, default_language: &str) -> Option<&str> {
        match self.language.as_deref() {
            Some(code) if code != default_language => Some(code),
            _ => None,
        }
    }
}

//! The closed set of languages the pipeline supports.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A supported language.
///
/// The set is closed: every question and answer is assigned exactly one of
/// these codes, falling back to [`LanguageCode::default`] (English) when
/// detection finds no signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageCode {
    /// English
    En,
    /// German
    De,
    /// Arabic
    Ar,
    /// Urdu
    Ur,
    /// Hindi
    Hi,
    /// Chinese
    Zh,
    /// Spanish
    Es,
}

impl LanguageCode {
    /// All supported languages, default first.
    pub const ALL: [LanguageCode; 7] = [
        LanguageCode::En,
        LanguageCode::De,
        LanguageCode::Ar,
        LanguageCode::Ur,
        LanguageCode::Hi,
        LanguageCode::Zh,
        LanguageCode::Es,
    ];

    /// Two-letter code, e.g. "de".
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageCode::En => "en",
            LanguageCode::De => "de",
            LanguageCode::Ar => "ar",
            LanguageCode::Ur => "ur",
            LanguageCode::Hi => "hi",
            LanguageCode::Zh => "zh",
            LanguageCode::Es => "es",
        }
    }

    /// Tag accepted by the speech synthesis service.
    ///
    /// Identical to [`as_str`](Self::as_str) except for Chinese, where the
    /// service expects a region-qualified tag.
    pub fn synthesis_tag(&self) -> &'static str {
        match self {
            LanguageCode::Zh => "zh-CN",
            other => other.as_str(),
        }
    }

    /// Human-readable English name, used in the model prompt.
    pub fn english_name(&self) -> &'static str {
        match self {
            LanguageCode::En => "English",
            LanguageCode::De => "German",
            LanguageCode::Ar => "Arabic",
            LanguageCode::Ur => "Urdu",
            LanguageCode::Hi => "Hindi",
            LanguageCode::Zh => "Chinese",
            LanguageCode::Es => "Spanish",
        }
    }

    /// Parse a code or synthesis tag back into a language.
    pub fn parse(tag: &str) -> Option<LanguageCode> {
        match tag.to_ascii_lowercase().as_str() {
            "en" => Some(LanguageCode::En),
            "de" => Some(LanguageCode::De),
            "ar" => Some(LanguageCode::Ar),
            "ur" => Some(LanguageCode::Ur),
            "hi" => Some(LanguageCode::Hi),
            "zh" | "zh-cn" => Some(LanguageCode::Zh),
            "es" => Some(LanguageCode::Es),
            _ => None,
        }
    }
}

impl Default for LanguageCode {
    fn default() -> Self {
        LanguageCode::En
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_english() {
        assert_eq!(LanguageCode::default(), LanguageCode::En);
    }

    #[test]
    fn test_as_str_round_trips_through_parse() {
        for code in LanguageCode::ALL {
            assert_eq!(LanguageCode::parse(code.as_str()), Some(code));
        }
    }

    #[test]
    fn test_synthesis_tag_region_qualifies_chinese() {
        assert_eq!(LanguageCode::Zh.synthesis_tag(), "zh-CN");
        assert_eq!(LanguageCode::De.synthesis_tag(), "de");
    }

    #[test]
    fn test_parse_accepts_synthesis_tag() {
        assert_eq!(LanguageCode::parse("zh-CN"), Some(LanguageCode::Zh));
        assert_eq!(LanguageCode::parse("ZH-cn"), Some(LanguageCode::Zh));
    }

    #[test]
    fn test_parse_rejects_unsupported() {
        assert_eq!(LanguageCode::parse("fr"), None);
        assert_eq!(LanguageCode::parse(""), None);
    }

    #[test]
    fn test_display_matches_as_str() {
        assert_eq!(LanguageCode::Ur.to_string(), "ur");
    }

    #[test]
    fn test_all_contains_every_variant_once() {
        let mut seen = std::collections::HashSet::new();
        for code in LanguageCode::ALL {
            assert!(seen.insert(code), "duplicate in ALL: {code}");
        }
        assert_eq!(seen.len(), 7);
    }
}

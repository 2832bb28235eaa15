//! Script-based language identification.
//!
//! Classifies a text fragment into one of the supported languages by probing
//! for script signals in a fixed priority order. The classifier is total: it
//! never fails and always returns a code, falling back to English when no
//! signal is present.

use crate::lang::code::LanguageCode;

/// Letters used by Urdu but absent from Arabic orthography.
///
/// These decide between the two languages sharing the Arabic-derived script,
/// so they must be probed before the shared script range.
const URDU_MARKERS: &str = "ٹڈڑںھہےۓ";

/// Diacritics and punctuation that only occur in Spanish text.
const SPANISH_MARKERS: &str = "áéíóúñÁÉÍÓÚÑ¿¡";

/// Umlauts and sharp s. `ü` is shared with Spanish loanwords but is assigned
/// to German so the signal sets stay disjoint.
const GERMAN_MARKERS: &str = "äöüßÄÖÜ";

fn is_urdu_marker(c: char) -> bool {
    URDU_MARKERS.contains(c)
}

fn is_devanagari(c: char) -> bool {
    ('\u{0900}'..='\u{097F}').contains(&c)
}

fn is_han(c: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&c)
}

/// The Arabic block minus the Urdu-specific letters, keeping the two signal
/// sets disjoint.
fn is_arabic_script(c: char) -> bool {
    ('\u{0600}'..='\u{06FF}').contains(&c) && !is_urdu_marker(c)
}

fn is_spanish_marker(c: char) -> bool {
    SPANISH_MARKERS.contains(c)
}

fn is_german_marker(c: char) -> bool {
    GERMAN_MARKERS.contains(c)
}

/// One entry of the classifier table: a language and the character predicate
/// that recognizes its signal set.
struct Signal {
    code: LanguageCode,
    matches: fn(char) -> bool,
}

/// Prioritized script classifier over the supported language set.
///
/// Evaluation order is deliberate: scripts exclusive to a single language
/// come first (Urdu's marker letters, Devanagari, Han), the Arabic-family
/// script shared by several languages comes after them, and diacritic-only
/// signals (Spanish, German) come last. The first language whose signal set
/// intersects the input wins; adding a language is a table change, not new
/// control flow.
pub struct LanguageIdentifier {
    table: Vec<Signal>,
    fallback: LanguageCode,
}

impl LanguageIdentifier {
    pub fn new() -> Self {
        Self {
            table: vec![
                Signal {
                    code: LanguageCode::Ur,
                    matches: is_urdu_marker,
                },
                Signal {
                    code: LanguageCode::Hi,
                    matches: is_devanagari,
                },
                Signal {
                    code: LanguageCode::Zh,
                    matches: is_han,
                },
                Signal {
                    code: LanguageCode::Ar,
                    matches: is_arabic_script,
                },
                Signal {
                    code: LanguageCode::Es,
                    matches: is_spanish_marker,
                },
                Signal {
                    code: LanguageCode::De,
                    matches: is_german_marker,
                },
            ],
            fallback: LanguageCode::default(),
        }
    }

    /// Classify a text fragment. Total: any input, including the empty
    /// string, yields a code from the supported set.
    pub fn identify(&self, text: &str) -> LanguageCode {
        for signal in &self.table {
            if text.chars().any(signal.matches) {
                return signal.code;
            }
        }
        self.fallback
    }

    /// The code returned when no signal matches.
    pub fn fallback(&self) -> LanguageCode {
        self.fallback
    }
}

impl Default for LanguageIdentifier {
    fn default() -> Self {
        Self::new()
    }
}

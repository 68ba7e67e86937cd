//! Intent normalization.
//!
//! Turns raw user phrasing ("take me to the About Us page, please") into
//! the tokens that actually carry intent ("about us"). Normalization is
//! lowercase + whitespace collapse + per-language filler stripping, and is
//! idempotent: normalizing normalized text is a no-op.

use serde::{Deserialize, Serialize};
use wayfinder_core::Language;

/// Filler vocabulary for one language, grouped by category.
struct FillerTable {
    action_verbs: &'static [&'static str],
    articles: &'static [&'static str],
    prepositions: &'static [&'static str],
    possessives: &'static [&'static str],
    ui_nouns: &'static [&'static str],
    modifiers: &'static [&'static str],
}

impl FillerTable {
    fn contains(&self, token: &str) -> bool {
        self.action_verbs.contains(&token)
            || self.articles.contains(&token)
            || self.prepositions.contains(&token)
            || self.possessives.contains(&token)
            || self.ui_nouns.contains(&token)
            || self.modifiers.contains(&token)
    }
}

static EN_FILLERS: FillerTable = FillerTable {
    action_verbs: &["go", "navigate", "open", "show", "take", "click", "visit", "find", "bring", "get"],
    articles: &["the", "a", "an"],
    // "about" is deliberately absent: it names a canonical page.
    prepositions: &["to", "of", "on", "at", "in", "into", "for", "with"],
    possessives: &["my", "your", "our", "me"],
    ui_nouns: &["page", "button", "link", "section", "tab", "site", "website", "screen"],
    modifiers: &["please", "now", "just", "then", "can", "you", "i", "want"],
};

static ES_FILLERS: FillerTable = FillerTable {
    action_verbs: &["ve", "ir", "vamos", "abre", "abrir", "muestra", "mostrar", "llevame", "llévame", "haz", "clic"],
    articles: &["el", "la", "los", "las", "un", "una", "unos", "unas"],
    prepositions: &["a", "al", "de", "del", "en", "por", "para", "con"],
    possessives: &["mi", "mis", "tu", "tus", "nuestro", "nuestra"],
    ui_nouns: &["pagina", "página", "boton", "botón", "enlace", "seccion", "sección", "pestaña", "sitio"],
    modifiers: &["favor", "ahora", "quiero"],
};

static DE_FILLERS: FillerTable = FillerTable {
    action_verbs: &["geh", "gehe", "zeig", "zeige", "öffne", "oeffne", "bring", "bringe", "klick", "klicke", "finde"],
    articles: &["der", "die", "das", "den", "dem", "ein", "eine", "einen"],
    prepositions: &["zu", "zur", "zum", "auf", "in", "an", "von", "nach", "mit", "für", "fuer"],
    possessives: &["mein", "meine", "meinen", "unser", "unsere", "mich", "mir"],
    ui_nouns: &["seite", "knopf", "taste", "link", "bereich", "reiter"],
    modifiers: &["bitte", "jetzt", "mal", "doch"],
};

fn filler_table(language: &Language) -> Option<&'static FillerTable> {
    match language {
        Language::En => Some(&EN_FILLERS),
        Language::Es => Some(&ES_FILLERS),
        Language::De => Some(&DE_FILLERS),
        Language::Other(_) => None,
    }
}

/// Filler-stripped, lowercased token sequence plus the language whose
/// tables produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedIntent {
    pub tokens: Vec<String>,
    pub language: Language,
}

impl NormalizedIntent {
    /// Tokens rejoined with single spaces.
    pub fn text(&self) -> String {
        self.tokens.join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Lowercase, split on non-alphanumerics, drop empties.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalize raw intent text for `language`.
///
/// A language without shipped filler tables degrades gracefully: its input
/// is stripped against the English tables instead of failing, so
/// mixed-language input still loses its most common filler.
pub fn normalize(text: &str, language: &Language) -> NormalizedIntent {
    let table = filler_table(language).unwrap_or(&EN_FILLERS);
    let tokens = tokenize(text)
        .into_iter()
        .filter(|t| !table.contains(t.as_str()))
        .collect();
    NormalizedIntent { tokens, language: language.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fillers_stripped_en() {
        let intent = normalize("Please take me to the About Us page", &Language::En);
        assert_eq!(intent.text(), "about us");
    }

    #[test]
    fn test_fillers_stripped_es() {
        let intent = normalize("Llévame a la página de contacto, por favor", &Language::Es);
        assert_eq!(intent.text(), "contacto");
    }

    #[test]
    fn test_fillers_stripped_de() {
        let intent = normalize("Bitte öffne die Anmeldung jetzt", &Language::De);
        assert_eq!(intent.text(), "anmeldung");
    }

    #[test]
    fn test_idempotent() {
        for (text, lang) in [
            ("Take me to the login page now", Language::En),
            ("Muestra el carrito", Language::Es),
            ("Zeige mir die Startseite", Language::De),
        ] {
            let once = normalize(text, &lang);
            let twice = normalize(&once.text(), &lang);
            assert_eq!(once, twice, "{text}");
        }
    }

    #[test]
    fn test_unknown_language_uses_english_fillers() {
        let intent = normalize("go to the checkout", &Language::Other("pt".into()));
        assert_eq!(intent.text(), "checkout");
        assert_eq!(intent.language, Language::Other("pt".into()));
    }

    #[test]
    fn test_whitespace_and_case_collapsed() {
        let intent = normalize("  ABOUT\t\tUS  ", &Language::En);
        assert_eq!(intent.tokens, vec!["about", "us"]);
    }

    #[test]
    fn test_all_filler_input_becomes_empty() {
        let intent = normalize("please click the button", &Language::En);
        assert!(intent.is_empty());
    }

    #[test]
    fn test_punctuation_split() {
        let intent = normalize("about-us", &Language::En);
        assert_eq!(intent.tokens, vec!["about", "us"]);
    }
}

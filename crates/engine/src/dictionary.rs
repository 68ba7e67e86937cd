//! Common-action dictionary and synonym tables.
//!
//! Canonical site actions (home, login, search, ...) with per-language
//! phrase lists and href patterns, plus per-language synonym expansion for
//! the fuzzy stage. Both are read-only at resolution time; supporting a new
//! language or action is a data change, not a code change.

use regex::Regex;
use wayfinder_core::{ActionCandidate, Language};

use crate::normalize::tokenize;

struct CommonActionDef {
    name: &'static str,
    href_patterns: &'static [&'static str],
    /// (language code, normalized phrases).
    phrases: &'static [(&'static str, &'static [&'static str])],
}

static COMMON_ACTIONS: &[CommonActionDef] = &[
    CommonActionDef {
        name: "home",
        href_patterns: &[r"(?i)^/?(index(\.\w+)?)?$", r"(?i)/(home|start)(/|$)"],
        phrases: &[
            ("en", &["home", "homepage", "main"]),
            ("es", &["inicio", "principal", "portada"]),
            ("de", &["start", "startseite", "hauptseite"]),
        ],
    },
    CommonActionDef {
        name: "login",
        href_patterns: &[r"(?i)/(log-?in|sign-?in|auth|session/new)(/|$)"],
        phrases: &[
            ("en", &["login", "log in", "sign in", "signin"]),
            ("es", &["iniciar sesion", "iniciar sesión", "acceder", "entrar"]),
            ("de", &["anmelden", "anmeldung", "einloggen", "login"]),
        ],
    },
    CommonActionDef {
        name: "logout",
        href_patterns: &[r"(?i)/(log-?out|sign-?out)(/|$)"],
        phrases: &[
            ("en", &["logout", "log out", "sign out"]),
            ("es", &["cerrar sesion", "cerrar sesión", "salir"]),
            ("de", &["abmelden", "ausloggen"]),
        ],
    },
    CommonActionDef {
        name: "register",
        href_patterns: &[r"(?i)/(register|sign-?up|join)(/|$)"],
        phrases: &[
            ("en", &["register", "sign up", "signup", "create account"]),
            ("es", &["registrarse", "registro", "crear cuenta"]),
            ("de", &["registrieren", "konto erstellen"]),
        ],
    },
    CommonActionDef {
        name: "search",
        href_patterns: &[r"(?i)/(search|suche|buscar)(/|$)"],
        phrases: &[
            ("en", &["search"]),
            ("es", &["buscar", "busqueda", "búsqueda"]),
            ("de", &["suche", "suchen"]),
        ],
    },
    CommonActionDef {
        name: "contact",
        href_patterns: &[r"(?i)/(contact|kontakt|contacto)(-?us)?(/|$)"],
        phrases: &[
            ("en", &["contact", "contact us"]),
            ("es", &["contacto", "contactanos", "contáctanos"]),
            ("de", &["kontakt"]),
        ],
    },
    CommonActionDef {
        name: "about",
        href_patterns: &[r"(?i)/(about(-?us)?|acerca|ueber-?uns|über-?uns)(/|$)"],
        phrases: &[
            ("en", &["about", "about us"]),
            ("es", &["acerca", "acerca de", "quienes somos", "quiénes somos"]),
            ("de", &["über uns", "ueber uns"]),
        ],
    },
    CommonActionDef {
        name: "cart",
        href_patterns: &[r"(?i)/(cart|basket|warenkorb|carrito)(/|$)"],
        phrases: &[
            ("en", &["cart", "basket", "shopping cart"]),
            ("es", &["carrito", "cesta"]),
            ("de", &["warenkorb"]),
        ],
    },
    CommonActionDef {
        name: "checkout",
        href_patterns: &[r"(?i)/(checkout|kasse|pagar)(/|$)"],
        phrases: &[
            ("en", &["checkout", "check out"]),
            ("es", &["pagar", "finalizar compra"]),
            ("de", &["kasse", "zur kasse"]),
        ],
    },
    CommonActionDef {
        name: "help",
        href_patterns: &[r"(?i)/(help|support|faq|hilfe|ayuda)(/|$)"],
        phrases: &[
            ("en", &["help", "support", "faq"]),
            ("es", &["ayuda", "soporte"]),
            ("de", &["hilfe", "support", "faq"]),
        ],
    },
];

/// (language code, canonical token, synonyms).
static SYNONYMS: &[(&str, &str, &[&str])] = &[
    ("en", "login", &["signin", "authenticate"]),
    ("en", "search", &["lookup", "query"]),
    ("en", "cart", &["basket", "bag"]),
    ("en", "home", &["homepage"]),
    ("en", "about", &["info", "information"]),
    ("en", "help", &["support", "assistance", "faq"]),
    ("en", "register", &["signup", "join"]),
    ("en", "checkout", &["payment"]),
    ("es", "buscar", &["busqueda"]),
    ("es", "carrito", &["cesta"]),
    ("es", "ayuda", &["soporte"]),
    ("es", "inicio", &["principal"]),
    ("es", "contacto", &["contactar"]),
    ("de", "suche", &["suchen"]),
    ("de", "warenkorb", &["korb"]),
    ("de", "hilfe", &["support"]),
    ("de", "anmelden", &["einloggen", "login"]),
    ("de", "start", &["startseite"]),
];

/// How exactly an intent matched a dictionary phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchGrade {
    /// Intent is exactly a known phrase.
    Exact,
    /// Intent contains a known phrase (or the reverse).
    Partial,
}

/// A canonical action the intent resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhraseMatch {
    pub action: &'static str,
    pub grade: MatchGrade,
}

/// How a candidate element was tied to a canonical action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateVia {
    Text,
    Href,
}

/// Compiled dictionary; regexes are built once at resolver construction.
pub struct ActionDictionary {
    actions: Vec<CompiledAction>,
}

struct CompiledAction {
    def: &'static CommonActionDef,
    href_patterns: Vec<Regex>,
}

impl ActionDictionary {
    pub fn new() -> Self {
        let actions = COMMON_ACTIONS
            .iter()
            .map(|def| CompiledAction {
                def,
                href_patterns: def
                    .href_patterns
                    .iter()
                    .map(|p| Regex::new(p).expect("static href pattern"))
                    .collect(),
            })
            .collect();
        ActionDictionary { actions }
    }

    /// Resolve normalized intent text to a canonical action, consulting the
    /// page language first and the fallback language second. An exact
    /// phrase wins over a partial one from either language.
    pub fn lookup_intent(&self, intent_text: &str, language: &Language, fallback: &Language) -> Option<PhraseMatch> {
        let mut partial = None;
        for action in &self.actions {
            for phrase in phrases_for(action.def, language, fallback) {
                if intent_text == phrase {
                    return Some(PhraseMatch { action: action.def.name, grade: MatchGrade::Exact });
                }
                if partial.is_none() && (contains_phrase(intent_text, phrase) || contains_phrase(phrase, intent_text)) {
                    partial = Some(PhraseMatch { action: action.def.name, grade: MatchGrade::Partial });
                }
            }
        }
        partial
    }

    /// Check whether a candidate element realizes a canonical action, by
    /// visible text first, href pattern second.
    pub fn candidate_realizes(
        &self, action_name: &str, candidate: &ActionCandidate, language: &Language, fallback: &Language,
    ) -> Option<CandidateVia> {
        let action = self.actions.iter().find(|a| a.def.name == action_name)?;

        // Visible text is compared lowercased but without filler stripping;
        // page labels are already terse.
        let text = tokenize(&candidate.text).join(" ");
        if !text.is_empty() {
            for phrase in phrases_for(action.def, language, fallback) {
                if text == phrase || contains_phrase(&text, phrase) {
                    return Some(CandidateVia::Text);
                }
            }
        }

        if let Some(href) = &candidate.href
            && action.href_patterns.iter().any(|p| p.is_match(href))
        {
            return Some(CandidateVia::Href);
        }

        None
    }
}

impl Default for ActionDictionary {
    fn default() -> Self {
        Self::new()
    }
}

fn phrases_for<'a>(
    def: &'a CommonActionDef, language: &'a Language, fallback: &'a Language,
) -> impl Iterator<Item = &'static str> + 'a {
    def.phrases
        .iter()
        .filter(move |(code, _)| *code == language.code() || *code == fallback.code())
        .flat_map(|(_, phrases)| phrases.iter().copied())
}

/// Whole-word containment: "go to about us" contains "about us" but
/// "cartoon" does not contain "cart".
fn contains_phrase(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() || haystack.is_empty() {
        return false;
    }
    let padded = format!(" {haystack} ");
    padded.contains(&format!(" {needle} "))
}

/// Expand a token to itself plus its synonyms in the given language and
/// the fallback language. Expansion is bidirectional: a synonym maps back
/// to its canonical token and siblings.
pub fn expand_token(token: &str, language: &Language, fallback: &Language) -> Vec<String> {
    let mut out = vec![token.to_string()];
    for (code, canonical, synonyms) in SYNONYMS {
        if *code != language.code() && *code != fallback.code() {
            continue;
        }
        if *canonical == token {
            out.extend(synonyms.iter().map(|s| s.to_string()));
        } else if synonyms.contains(&token) {
            out.push(canonical.to_string());
            out.extend(synonyms.iter().filter(|s| **s != token).map(|s| s.to_string()));
        }
    }
    out.dedup();
    out
}

// 🔤 Normalizer - Canonicalize raw customer names into comparable keys
// NFKC fold, lowercase, punctuation to spaces, whitespace collapse,
// legal-suffix stripping. Records which rules actually changed the string.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// LEGAL SUFFIXES
// ============================================================================

/// Corporate suffix tokens removed during canonicalization
const LEGAL_SUFFIXES: &[&str] = &[
    "inc",
    "incorporated",
    "corp",
    "corporation",
    "llc",
    "ltd",
    "limited",
    "plc",
    "sa",
    "ag",
    "gmbh",
    "co",
    "company",
    "lp",
    "llp",
    "nv",
    "bv",
    "sarl",
    "sas",
    "se",
    "kg",
    "ohg",
    "pty",
    "pte",
];

fn is_legal_suffix(token: &str) -> bool {
    LEGAL_SUFFIXES.contains(&token)
}

// ============================================================================
// NORMALIZE RULES
// ============================================================================

/// Canonicalization steps that actually changed the input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NormalizeRule {
    /// Unicode NFKC fold altered at least one character (e.g. full-width forms)
    UnicodeFolded,

    /// At least one uppercase letter was lowered
    Lowercased,

    /// Punctuation characters were replaced with spaces
    PunctuationStripped,

    /// Leading/trailing/repeated/non-space whitespace was collapsed
    WhitespaceCollapsed,

    /// A corporate suffix token was removed (carries the token)
    LegalSuffixStripped(String),
}

// ============================================================================
// NORMALIZED KEY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedKey {
    /// Canonical form: lowercase alphanumeric tokens joined by single spaces
    pub canonical: String,

    /// Rules that fired while producing `canonical`
    pub rules_applied: Vec<NormalizeRule>,
}

impl NormalizedKey {
    /// Canonical form split into tokens
    pub fn tokens(&self) -> Vec<&str> {
        self.canonical.split_whitespace().collect()
    }
}

// ============================================================================
// NORMALIZER
// ============================================================================

pub struct Normalizer {
    /// Remove corporate suffix tokens (default: true)
    pub strip_legal_suffixes: bool,

    /// Minimum canonical length for a usable key (default: 2)
    pub min_key_len: usize,
}

impl Normalizer {
    /// Create normalizer with default rules
    pub fn new() -> Self {
        Normalizer {
            strip_legal_suffixes: true,
            min_key_len: 2,
        }
    }

    /// Canonicalize a raw name. Returns None when the result is too short
    /// to match against anything.
    pub fn normalize(&self, raw: &str) -> Option<NormalizedKey> {
        let mut rules = Vec::new();

        // Unicode NFKC normalization
        let folded: String = raw.nfkc().collect();
        if folded != raw {
            rules.push(NormalizeRule::UnicodeFolded);
        }

        if has_irregular_whitespace(&folded) {
            rules.push(NormalizeRule::WhitespaceCollapsed);
        }

        // Replace non-alphanumeric with space, lowercase
        let mut lowered = false;
        let mut punctuation = false;
        let stripped: String = folded
            .chars()
            .map(|c| {
                if c.is_alphanumeric() {
                    if c.is_ascii_uppercase() {
                        lowered = true;
                    }
                    c.to_ascii_lowercase()
                } else {
                    if !c.is_whitespace() {
                        punctuation = true;
                    }
                    ' '
                }
            })
            .collect();
        if lowered {
            rules.push(NormalizeRule::Lowercased);
        }
        if punctuation {
            rules.push(NormalizeRule::PunctuationStripped);
        }

        let tokens: Vec<&str> = stripped.split_whitespace().collect();

        // Filter legal suffixes, but never down to an empty key:
        // a name that is nothing but suffix tokens keeps them
        let filtered: Vec<&str> = if self.strip_legal_suffixes {
            let kept: Vec<&str> = tokens
                .iter()
                .copied()
                .filter(|t| !is_legal_suffix(t))
                .collect();
            if kept.is_empty() {
                tokens
            } else {
                for t in &tokens {
                    if is_legal_suffix(t) {
                        rules.push(NormalizeRule::LegalSuffixStripped(t.to_string()));
                    }
                }
                kept
            }
        } else {
            tokens
        };

        let canonical = filtered.join(" ");
        if canonical.chars().count() < self.min_key_len {
            return None;
        }

        Some(NormalizedKey {
            canonical,
            rules_applied: rules,
        })
    }

    /// Canonical string alone, for callers that only need the key text
    pub fn canonical(&self, raw: &str) -> Option<String> {
        self.normalize(raw).map(|key| key.canonical)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Leading, trailing, repeated, or non-space whitespace
fn has_irregular_whitespace(s: &str) -> bool {
    let mut prev_was_ws = true;
    for c in s.chars() {
        if c.is_whitespace() {
            if prev_was_ws || c != ' ' {
                return true;
            }
            prev_was_ws = true;
        } else {
            prev_was_ws = false;
        }
    }
    s.chars().last().map(|c| c.is_whitespace()).unwrap_or(false)
}

// ============================================================================
// TESTS
// ============================================================================

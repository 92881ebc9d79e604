//! Language utilities for variant keys
//!
//! Liturgical sources key their variants by plain ISO codes ("en", "gre")
//! or by composite library tags ("en_US_dedes", "gr_GR_cog"). These helpers
//! reduce a key to its ISO language so that two keys naming the same
//! language can be matched during variant lookup.

use anyhow::{Result, anyhow};
use isolang::Language;

/// ISO 639-2/B codes that differ from their 639-2/T form, plus the
/// liturgical "gr" shorthand for Greek.
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("gr", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Return the language part of a variant key ("en_US_dedes" -> "en")
pub fn language_prefix(key: &str) -> String {
    key.trim()
        .split(['_', '-'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Normalize a language code or variant key to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let prefix = language_prefix(code);

    if let Some((_, part2t)) = BIBLIOGRAPHIC_CODES.iter().find(|(b, _)| *b == prefix) {
        return Ok((*part2t).to_string());
    }

    let language = match prefix.len() {
        2 => Language::from_639_1(&prefix),
        3 => Language::from_639_3(&prefix),
        _ => None,
    };

    language
        .map(|lang| lang.to_639_3().to_string())
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Check whether a code resolves to a known ISO language
pub fn is_known_language(code: &str) -> bool {
    normalize_to_part2t(code).is_ok()
}

/// Check if two language codes or variant keys name the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the English language name for a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

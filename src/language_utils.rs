use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Media containers tag audio streams with ISO 639-2 codes (`jpn`, `eng`,
/// sometimes the bibliographic `fre`/`ger` forms), while translation and
/// speech APIs expect ISO 639-1 codes in their own casing. This module
/// validates and converts between them.

/// ISO 639-2/B codes that differ from their 639-2/T counterpart
const BIBLIOGRAPHIC_CODES: [(&str, &str); 18] = [
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
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

/// Strip a region suffix: `pt-BR` -> `pt`, `en_US` -> `en`
fn base_code(code: &str) -> String {
    code.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

fn lookup(code: &str) -> Option<Language> {
    let code = base_code(code);
    match code.len() {
        2 => Language::from_639_1(&code),
        3 => {
            let terminological = BIBLIOGRAPHIC_CODES
                .iter()
                .find(|(b, _)| *b == code)
                .map(|(_, t)| *t)
                .unwrap_or(code.as_str());
            Language::from_639_3(terminological)
        }
        _ => None,
    }
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-2 code
pub fn validate_language_code(code: &str) -> Result<()> {
    lookup(code)
        .map(|_| ())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    lookup(code)
        .map(|lang| lang.to_639_3().to_string())
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible
/// Falls back to ISO 639-2/T if no ISO 639-1 code exists
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let lang = lookup(code).ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;
    Ok(lang
        .to_639_1()
        .map(|c| c.to_string())
        .unwrap_or_else(|| lang.to_639_3().to_string()))
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (lookup(code1), lookup(code2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let lang = lookup(code).ok_or_else(|| anyhow!("Failed to get language from code: {}", code))?;
    Ok(lang.to_name().to_string())
}

/// Target language code in the form DeepL expects.
///
/// DeepL wants upper-case ISO 639-1 codes and requires a variant for
/// English and Portuguese targets; an explicit region is kept as given.
pub fn deepl_target_code(code: &str) -> Result<String> {
    let trimmed = code.trim();
    if trimmed.contains(['-', '_']) {
        validate_language_code(trimmed)?;
        return Ok(trimmed.replace('_', "-").to_uppercase());
    }
    let part1 = normalize_to_part1_or_part2t(trimmed)?;
    Ok(match part1.as_str() {
        "en" => "EN-US".to_string(),
        "pt" => "PT-PT".to_string(),
        other => other.to_uppercase(),
    })
}

/// Language code for speech engines: lower-case ISO 639-1, region kept
/// for the few engines that distinguish it (`zh-CN`, `pt-BR`)
pub fn speech_language_code(code: &str) -> Result<String> {
    let trimmed = code.trim();
    let part1 = normalize_to_part1_or_part2t(trimmed)?;
    match trimmed.split_once(['-', '_']) {
        Some((_, region)) if !region.is_empty() => Ok(format!("{}-{}", part1, region.to_uppercase())),
        _ => Ok(part1),
    }
}

//! Text normalization and entity extraction.
//!
//! Matching runs on the raw, newline-separated text; normalization only
//! shapes the text returned to the caller. The patterns are compiled once
//! per process and shared read-only.

use crate::types::EntitySet;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap());

// YYYY-MM-DD or DD/MM/YYYY
static DATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}|\d{2}/\d{2}/\d{4}").unwrap());

static AMOUNT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\$€£]?\s?\d{1,3}(?:,\d{3})*(?:\.\d{2})?\s?(?:USD|EUR|GBP)?").unwrap()
});

// (555) 123-4567, 555-123-4567, +1 555.123.4567
static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+\d{1,3}[\s.-]?)?\(?\d{3}\)?[\s.-]\d{3}[\s.-]\d{4}").unwrap()
});

/// Collapse every whitespace run (newlines included) to one space and trim
pub fn normalize_text(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text, " ").trim().to_string()
}

fn collect(regex: &Regex, text: &str) -> BTreeSet<String> {
    regex
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// A match only counts as money with a dollar sign, a decimal point or `USD`;
/// bare integers such as page numbers and years are dropped
fn is_monetary(candidate: &str) -> bool {
    candidate.contains('$') || candidate.contains('.') || candidate.contains("USD")
}

pub fn extract_entities(text: &str) -> EntitySet {
    let mut amounts = collect(&AMOUNT_REGEX, text);
    amounts.retain(|a| is_monetary(a));

    let entities = EntitySet {
        dates: collect(&DATE_REGEX, text),
        amounts,
        emails: collect(&EMAIL_REGEX, text),
        phones: collect(&PHONE_REGEX, text),
    };
    log::debug!(
        "Extracted {} entities ({} dates, {} amounts, {} emails, {} phones)",
        entities.len(),
        entities.dates.len(),
        entities.amounts.len(),
        entities.emails.len(),
        entities.phones.len()
    );
    entities
}

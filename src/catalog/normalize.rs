//! Field normalization for raw text pulled off listing pages.
//!
//! The matchers are strict full-string matches. Callers trim whitespace before
//! handing text in; anything else (currency symbols, thousands separators)
//! makes the match fail on purpose.

use regex_lite::Regex;
use std::sync::LazyLock;

static PRICE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.?\d{0,2}$").unwrap());

static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-+]?\d+$").unwrap());

static COUNT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(\s*[\d.,]+\s*\)\s*$").unwrap());

/// Parses a bare decimal price such as `129.99`.
///
/// Returns `None` for anything that is not digits with at most two decimals.
pub fn extract_price(raw: &str) -> Option<f64> {
    if !PRICE.is_match(raw) {
        return None;
    }
    raw.parse().ok()
}

/// Returns the signed integer text if `raw` is one, otherwise `raw` unchanged.
///
/// Stock labels such as "In Stock" or "Call" pass through verbatim.
pub fn extract_integer(raw: &str) -> String {
    match INTEGER.find(raw) {
        Some(m) => m.as_str().to_string(),
        None => raw.to_string(),
    }
}

/// Removes a trailing result count from a category label: `"Networking (120)"` -> `"Networking"`.
pub fn strip_count_suffix(label: &str) -> String {
    COUNT_SUFFIX.replace(label, "").trim().to_string()
}

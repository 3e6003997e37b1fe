//! Text normalization applied before any pattern runs.

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₹', '₩'];

fn is_kept(c: char) -> bool {
    c.is_alphanumeric() || CURRENCY_SYMBOLS.contains(&c) || matches!(c, '.' | ',' | '/' | '-')
}

/// Lowercase, drop everything outside the allowed character set, collapse
/// whitespace.
///
/// Kept: alphanumerics (accents included), currency symbols, `.` `,` and the
/// date separators `/` `-`. Total and idempotent.
pub fn normalize(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if is_kept(c) { c } else { ' ' })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

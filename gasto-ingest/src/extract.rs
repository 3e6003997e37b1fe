//! Field Extractor: pulls amount, date token, merchant, category hint and
//! direction out of normalized message text.
//!
//! Each field is probed through its ordered pattern groups (see
//! [`FieldPatterns`]); the first match is authoritative. Extraction never
//! fails: whatever is not found stays `None` and is completed later.

use std::str::FromStr;

use gasto_core::{Direction, ExtractedFields};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::patterns::{FieldPattern, FieldPatterns, PatternGroup};

/// Number shapes: `1.234,56`, `1.234`, `123,45`, `123.45`, `50`
const NUM: &str = r"(\d{1,3}(?:\.\d{3})+(?:,\d{1,2})?|\d+(?:[.,]\d{1,2})?)";

const MAX_MERCHANT_WORDS: usize = 4;

/// Words that end a merchant phrase
const MERCHANT_BOUNDARIES: &[&str] = &[
    "por", "com", "valor", "e", "pelo", "pela", "hoje", "ontem", "anteontem", "dia", "reais",
    "real", "contos", "no", "na", "nos", "nas", "em", "para", "pra", "pro", "categoria", "cat",
];

const INCOME_ROOTS: &[&str] = &[
    "receb", "ganhei", "ganho", "salário", "salario", "pagamento", "reembolso", "rendimento",
];

/// Which kind of date token wins when a message carries both
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatePrecedence {
    #[default]
    RelativeFirst,
    AbsoluteFirst,
}

impl DatePrecedence {
    fn group_order(&self) -> [&'static str; 2] {
        match self {
            DatePrecedence::RelativeFirst => ["relative", "absolute"],
            DatePrecedence::AbsoluteFirst => ["absolute", "relative"],
        }
    }
}

pub struct FieldExtractor {
    amount: FieldPatterns,
    date: FieldPatterns,
    merchant: FieldPatterns,
    category_hint: FieldPatterns,
    income_roots: Vec<String>,
}

impl FieldExtractor {
    /// Extractor with the built-in Portuguese pattern set
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            amount: amount_patterns()?,
            date: date_patterns()?,
            merchant: merchant_patterns()?,
            category_hint: category_hint_patterns()?,
            income_roots: INCOME_ROOTS.iter().map(|r| r.to_string()).collect(),
        })
    }

    pub fn with_date_precedence(mut self, precedence: DatePrecedence) -> Self {
        self.date.reorder(&precedence.group_order());
        self
    }

    pub fn with_income_roots(mut self, roots: Vec<String>) -> Self {
        self.income_roots = roots.into_iter().map(|r| r.to_lowercase()).collect();
        self
    }

    pub fn amount_patterns_mut(&mut self) -> &mut FieldPatterns {
        &mut self.amount
    }

    pub fn date_patterns_mut(&mut self) -> &mut FieldPatterns {
        &mut self.date
    }

    /// Extract every field from already-normalized text
    pub fn extract(&self, text: &str) -> ExtractedFields {
        let mut fields = ExtractedFields::default();

        if let Some(m) = self.amount.first_match(text) {
            fields.amount = parse_amount(m.value);
            debug!(pattern = m.pattern, value = m.value, "amount matched");
        }

        if let Some(m) = self.date.first_match(text) {
            debug!(group = m.group, value = m.value, "date token matched");
            fields.date_token = Some(m.value.to_string());
        }

        fields.merchant_raw = self.extract_merchant(text);

        if let Some(m) = self.category_hint.first_match(text) {
            fields.category_hint = Some(m.value.to_string());
        }

        fields.direction = self.detect_direction(text);
        fields
    }

    /// Merchant anchors are prepositions; the phrase after the first anchor
    /// that yields a non-empty phrase wins.
    fn extract_merchant(&self, text: &str) -> Option<String> {
        self.merchant.iter().find_map(|(_, anchor)| {
            anchor
                .regex
                .find_iter(text)
                .find_map(|m| merchant_phrase(&text[m.end()..]))
        })
    }

    fn detect_direction(&self, text: &str) -> Direction {
        let income = text.split_whitespace().any(|word| {
            self.income_roots
                .iter()
                .any(|root| word.starts_with(root.as_str()))
        });
        if income {
            Direction::Income
        } else {
            Direction::Expense
        }
    }
}

/// Words following an anchor, up to a boundary
fn merchant_phrase(rest: &str) -> Option<String> {
    let mut words: Vec<&str> = Vec::new();

    for raw in rest.split_whitespace() {
        let word = raw.trim_end_matches(['.', ',']);
        let punctuated = word.len() != raw.len();

        if is_merchant_boundary(word) {
            break;
        }
        words.push(word);
        if punctuated || words.len() == MAX_MERCHANT_WORDS {
            break;
        }
    }

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

fn is_merchant_boundary(word: &str) -> bool {
    word.is_empty()
        || MERCHANT_BOUNDARIES.contains(&word)
        || word.chars().any(|c| c.is_ascii_digit())
        || !word.chars().any(char::is_alphanumeric)
        || word.contains(['$', '€', '£'])
}

/// Parse a matched amount. Comma is the decimal separator; dots followed by
/// groups of exactly three digits are thousands separators.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    let canonical = if raw.contains(',') {
        raw.replace('.', "").replace(',', ".")
    } else if is_thousands_grouped(raw) {
        raw.replace('.', "")
    } else {
        raw.to_string()
    };
    Decimal::from_str(&canonical).ok()
}

fn is_thousands_grouped(s: &str) -> bool {
    let mut parts = s.split('.');
    let Some(head) = parts.next() else {
        return false;
    };
    let tail: Vec<&str> = parts.collect();
    !tail.is_empty()
        && (1..=3).contains(&head.len())
        && head.chars().all(|c| c.is_ascii_digit())
        && tail
            .iter()
            .all(|p| p.len() == 3 && p.chars().all(|c| c.is_ascii_digit()))
}

fn amount_patterns() -> Result<FieldPatterns, regex::Error> {
    Ok(FieldPatterns::new(vec![
        PatternGroup::new(
            "currency-prefixed",
            vec![FieldPattern::new(
                "symbol",
                &format!(r"(?:r\$|us\$|\$|€|£)\s*{NUM}"),
                1,
            )?],
        ),
        PatternGroup::new(
            "currency-suffixed",
            vec![FieldPattern::new(
                "word",
                &format!(
                    r"{NUM}\s*(?:(?:reais|real|brl|contos|conto|pilas|pila|euros|euro|dólares|dolares|usd)\b|r\$|€)"
                ),
                1,
            )?],
        ),
        PatternGroup::new(
            "labeled",
            vec![
                FieldPattern::new(
                    "value-label",
                    &format!(r"\b(?:valor|total|preço|preco|custo|custou|deu|por)\s+(?:de\s+)?{NUM}"),
                    1,
                )?,
                FieldPattern::new(
                    "verb",
                    &format!(r"\b(?:gastei|paguei|pago|comprei|recebi|ganhei|transferi)\s+(?:de\s+)?{NUM}"),
                    1,
                )?,
            ],
        ),
    ]))
}

fn date_patterns() -> Result<FieldPatterns, regex::Error> {
    Ok(FieldPatterns::new(vec![
        PatternGroup::new(
            "relative",
            vec![FieldPattern::new("word", r"\b(hoje|ontem|anteontem)\b", 1)?],
        ),
        PatternGroup::new(
            "absolute",
            vec![
                FieldPattern::new("iso", r"\b(\d{4}-\d{1,2}-\d{1,2})\b", 1)?,
                FieldPattern::new(
                    "day-month-year",
                    r"\b(\d{1,2}[/-]\d{1,2}[/-](?:\d{4}|\d{2}))\b",
                    1,
                )?,
                FieldPattern::new("day-month", r"\b(\d{1,2}/\d{1,2})\b", 1)?,
            ],
        ),
    ]))
}

fn merchant_patterns() -> Result<FieldPatterns, regex::Error> {
    let anchor = |name: &str, words: &str| -> Result<FieldPattern, regex::Error> {
        FieldPattern::new(name, &format!(r"\b(?:{words})\s+"), 0)
    };
    Ok(FieldPatterns::new(vec![
        PatternGroup::new("place", vec![anchor("place", "no|na|nos|nas|em")?]),
        PatternGroup::new("counterparty", vec![anchor("counterparty", "de|do|da|dos|das")?]),
        PatternGroup::new("recipient", vec![anchor("recipient", "para|pra|pro")?]),
    ]))
}

fn category_hint_patterns() -> Result<FieldPatterns, regex::Error> {
    Ok(FieldPatterns::new(vec![PatternGroup::new(
        "explicit",
        vec![FieldPattern::new("label", r"\b(?:categoria|cat)\s+(\p{L}+)", 1)?],
    )]))
}

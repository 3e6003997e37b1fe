//! Expense record types flowing through the extraction pipeline

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Merchant text used when no merchant phrase could be extracted.
pub const UNIDENTIFIED_MERCHANT: &str = "unidentified";

/// A plain-text message as handed over by the chat/OCR/transcription layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    pub text: String,
    pub user_id: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl RawMessage {
    /// Create a message received now
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            user_id: None,
            received_at: Utc::now(),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Whether money came in or went out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "income")]
    Income,
    #[default]
    #[serde(rename = "expense")]
    Expense,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Income => "income",
            Direction::Expense => "expense",
        }
    }
}

/// Which categorization strategy produced `category_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategorySource {
    #[serde(rename = "keywords")]
    Keywords,
    #[serde(rename = "model")]
    Model,
    #[serde(rename = "default")]
    Default,
}

impl CategorySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategorySource::Keywords => "keywords",
            CategorySource::Model => "model",
            CategorySource::Default => "default",
        }
    }
}

/// Fields pulled out of normalized text. Any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub amount: Option<Decimal>,
    pub date_token: Option<String>,
    pub merchant_raw: Option<String>,
    pub category_hint: Option<String>,
    pub direction: Direction,
}

/// A validated expense (or income) ready for categorization and dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRecord {
    /// Always positive
    pub amount: Decimal,
    pub occurred_on: NaiveDate,
    pub merchant: String,
    pub direction: Direction,
    /// Full normalized input, kept for audit and re-categorization
    pub details_raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_hint: Option<String>,
    pub category_id: Option<String>,
    pub category_source: Option<CategorySource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ExpenseRecord {
    /// Set category and provenance together so they never disagree
    pub fn assign_category(&mut self, category: impl Into<String>, source: CategorySource) {
        self.category_id = Some(category.into());
        self.category_source = Some(source);
    }

    pub fn is_categorized(&self) -> bool {
        self.category_id.is_some()
    }

    pub fn has_merchant(&self) -> bool {
        self.merchant != UNIDENTIFIED_MERCHANT
    }

    pub fn is_income(&self) -> bool {
        self.direction == Direction::Income
    }

    /// Short confirmation line sent back to the message author
    pub fn summary(&self) -> String {
        let kind = match self.direction {
            Direction::Income => "Receita",
            Direction::Expense => "Despesa",
        };
        format!(
            "{} registrada: R$ {} em {} ({}) | {}",
            kind,
            format_brl(self.amount),
            self.merchant,
            self.occurred_on.format("%d/%m/%Y"),
            self.category_id.as_deref().unwrap_or("sem categoria"),
        )
    }
}

/// Render a decimal with two places and a comma separator, e.g. `50,00`
pub fn format_brl(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2)).replace('.', ",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> ExpenseRecord {
        ExpenseRecord {
            amount: Decimal::new(5000, 2),
            occurred_on: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            merchant: "mercado".to_string(),
            direction: Direction::Expense,
            details_raw: "gastei r$ 50 no mercado hoje".to_string(),
            category_hint: None,
            category_id: None,
            category_source: None,
            user_id: Some("5511999990000".to_string()),
            created_at: Utc.with_ymd_and_hms(2026, 10, 18, 15, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_assign_category_sets_source() {
        let mut r = sample();
        assert!(!r.is_categorized());
        r.assign_category("Alimentação", CategorySource::Keywords);
        assert_eq!(r.category_id.as_deref(), Some("Alimentação"));
        assert_eq!(r.category_source, Some(CategorySource::Keywords));
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut r = sample();
        r.assign_category("Alimentação", CategorySource::Keywords);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["occurredOn"], "2026-10-18");
        assert_eq!(v["categorySource"], "keywords");
        assert_eq!(v["direction"], "expense");
        assert_eq!(v["amount"], "50.00");
        assert!(v.get("categoryHint").is_none());
    }

    #[test]
    fn test_summary_formats_brl() {
        let mut r = sample();
        r.assign_category("Alimentação", CategorySource::Keywords);
        assert_eq!(
            r.summary(),
            "Despesa registrada: R$ 50,00 em mercado (18/10/2026) | Alimentação"
        );
    }

    #[test]
    fn test_sentinel_merchant() {
        let mut r = sample();
        assert!(r.has_merchant());
        r.merchant = UNIDENTIFIED_MERCHANT.to_string();
        assert!(!r.has_merchant());
    }
}

//! End-to-end processing of one message:
//! normalize -> extract -> resolve date -> complete -> categorize.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use gasto_core::{Clock, ExpenseRecord, PipelineError, RawMessage, SystemClock, complete};
use gasto_ingest::{DatePrecedence, DateResolver, FieldExtractor, normalize};
use tracing::{debug, info};

use crate::categorizer::{Categorizer, DEFAULT_CATEGORY};
use crate::keyword_table::{KeywordTable, KeywordTableError};
use crate::strategy::{CategoryClassifier, DEFAULT_MODEL_TIMEOUT};

pub struct ExpensePipeline {
    extractor: FieldExtractor,
    resolver: DateResolver,
    categorizer: Categorizer,
    table: Arc<KeywordTable>,
    clock: Arc<dyn Clock>,
}

impl ExpensePipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Turn one message into a categorized record, or reject it when no
    /// amount can be understood.
    pub fn process(&self, message: &RawMessage) -> Result<ExpenseRecord, PipelineError> {
        let details = normalize(&message.text);
        let fields = self.extractor.extract(&details);

        let occurred_on = fields
            .date_token
            .as_deref()
            .and_then(|token| self.resolver.resolve(token, self.clock.today()));
        if fields.date_token.is_some() && occurred_on.is_none() {
            debug!(token = ?fields.date_token, "date token unresolved, using today");
        }

        let mut record = complete(
            &details,
            fields,
            occurred_on,
            message.user_id.as_deref(),
            self.clock.as_ref(),
        )?;

        let source = self.categorizer.categorize(&mut record);
        info!(
            amount = %record.amount,
            merchant = %record.merchant,
            category = record.category_id.as_deref().unwrap_or_default(),
            source = source.as_str(),
            "expense processed"
        );
        Ok(record)
    }

    /// Record a human-confirmed category for future keyword hits
    pub fn learn(&self, record: &ExpenseRecord, category: &str) -> Result<bool, KeywordTableError> {
        self.table.learn(record, category)
    }

    pub fn keyword_table(&self) -> &Arc<KeywordTable> {
        &self.table
    }

    pub fn categorizer(&self) -> &Categorizer {
        &self.categorizer
    }
}

/// Collects the injected collaborators; anything left unset gets a default
pub struct PipelineBuilder {
    table: Option<Arc<KeywordTable>>,
    classifier: Option<Arc<dyn CategoryClassifier>>,
    model_timeout: Duration,
    default_category: String,
    date_precedence: DatePrecedence,
    date_formats: Option<Vec<String>>,
    income_roots: Option<Vec<String>>,
    clock: Option<Arc<dyn Clock>>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            table: None,
            classifier: None,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
            default_category: DEFAULT_CATEGORY.to_string(),
            date_precedence: DatePrecedence::default(),
            date_formats: None,
            income_roots: None,
            clock: None,
        }
    }
}

impl PipelineBuilder {
    pub fn keyword_table(mut self, table: Arc<KeywordTable>) -> Self {
        self.table = Some(table);
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn CategoryClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn default_category(mut self, category: impl Into<String>) -> Self {
        self.default_category = category.into();
        self
    }

    pub fn date_precedence(mut self, precedence: DatePrecedence) -> Self {
        self.date_precedence = precedence;
        self
    }

    pub fn date_formats(mut self, formats: Vec<String>) -> Self {
        self.date_formats = Some(formats);
        self
    }

    pub fn income_roots(mut self, roots: Vec<String>) -> Self {
        self.income_roots = Some(roots);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<ExpensePipeline> {
        let mut extractor = FieldExtractor::new()?.with_date_precedence(self.date_precedence);
        if let Some(roots) = self.income_roots {
            extractor = extractor.with_income_roots(roots);
        }

        let resolver = match self.date_formats {
            Some(formats) => DateResolver::with_formats(formats),
            None => DateResolver::new(),
        };

        let table = self
            .table
            .unwrap_or_else(|| Arc::new(KeywordTable::seeded()));
        let categorizer = Categorizer::standard(
            table.clone(),
            self.classifier,
            self.model_timeout,
            self.default_category,
        );
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::default()));

        Ok(ExpensePipeline {
            extractor,
            resolver,
            categorizer,
            table,
            clock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use gasto_core::{CategorySource, FixedClock};
    use rust_decimal::Decimal;

    fn pipeline() -> ExpensePipeline {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        ExpensePipeline::builder()
            .clock(Arc::new(FixedClock::on(today)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_unresolvable_date_defaults_to_today() {
        let p = pipeline();
        let r = p.process(&RawMessage::new("gastei 20 reais na padaria 31/02/2026")).unwrap();
        assert_eq!(r.occurred_on, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
    }

    #[test]
    fn test_user_id_is_attached() {
        let p = pipeline();
        let r = p
            .process(&RawMessage::new("R$ 12,00 no uber").with_user("5511988887777"))
            .unwrap();
        assert_eq!(r.user_id.as_deref(), Some("5511988887777"));
        assert_eq!(r.amount, Decimal::new(1200, 2));
        assert_eq!(r.category_id.as_deref(), Some("Transporte"));
        assert_eq!(r.category_source, Some(CategorySource::Keywords));
    }

    #[test]
    fn test_default_category_is_configurable() {
        let p = ExpensePipeline::builder()
            .default_category("Diversos")
            .build()
            .unwrap();
        let r = p.process(&RawMessage::new("paguei 15 reais pro zé")).unwrap();
        assert_eq!(r.category_id.as_deref(), Some("Diversos"));
        assert_eq!(r.category_source, Some(CategorySource::Default));
        assert_eq!(r.merchant, "zé");
    }

    #[test]
    fn test_rejects_zero_amount() {
        let p = pipeline();
        let err = p.process(&RawMessage::new("gastei R$ 0,00 no mercado")).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidAmount { .. }));
    }
}

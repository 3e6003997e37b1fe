//! Categorizer: ordered strategy chain ending in a default category.
//!
//! NEW -> keywords -> (model) -> default. Whatever happens, the record leaves
//! categorized and its `category_source` names the strategy that answered.

use std::sync::Arc;
use std::time::Duration;

use gasto_core::{CategorySource, ExpenseRecord};
use tracing::debug;

use crate::keyword_table::KeywordTable;
use crate::strategy::{CategoryClassifier, CategoryStrategy, KeywordStrategy, ModelStrategy};

pub const DEFAULT_CATEGORY: &str = "Outros";

pub struct Categorizer {
    strategies: Vec<Box<dyn CategoryStrategy>>,
    default_category: String,
}

impl Categorizer {
    /// A categorizer with no strategies: everything lands in the default
    pub fn new(default_category: impl Into<String>) -> Self {
        Self {
            strategies: Vec::new(),
            default_category: default_category.into(),
        }
    }

    /// Keyword lookup, then the classifier when one is configured
    pub fn standard(
        table: Arc<KeywordTable>,
        classifier: Option<Arc<dyn CategoryClassifier>>,
        model_timeout: Duration,
        default_category: impl Into<String>,
    ) -> Self {
        let mut categorizer =
            Self::new(default_category).with_strategy(KeywordStrategy::new(table.clone()));
        if let Some(classifier) = classifier {
            categorizer = categorizer
                .with_strategy(ModelStrategy::new(classifier, table).with_timeout(model_timeout));
        }
        categorizer
    }

    /// Append a strategy; it runs after every strategy already registered
    pub fn with_strategy(mut self, strategy: impl CategoryStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn default_category(&self) -> &str {
        &self.default_category
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Assign a category to the record and return its provenance
    pub fn categorize(&self, record: &mut ExpenseRecord) -> CategorySource {
        for strategy in &self.strategies {
            if let Some(category) = strategy.assign(record) {
                let source = strategy.source();
                record.assign_category(category, source);
                return source;
            }
        }

        debug!(default = %self.default_category, merchant = %record.merchant, "falling back to default category");
        record.assign_category(self.default_category.clone(), CategorySource::Default);
        CategorySource::Default
    }
}

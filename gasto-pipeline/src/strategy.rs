//! Categorization strategies.
//!
//! Every strategy answers `Some(category)` or `None` ("no answer"); the
//! categorizer tries them in order and falls back to its default.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use gasto_core::{CategorySource, Direction, ExpenseRecord};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::keyword_table::KeywordTable;

pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(5);

pub trait CategoryStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn source(&self) -> CategorySource;
    fn assign(&self, record: &ExpenseRecord) -> Option<String>;
}

/// What an external classifier gets to see
#[derive(Debug, Clone)]
pub struct ClassificationRequest<'a> {
    pub merchant: &'a str,
    pub amount: Decimal,
    pub details: &'a str,
    pub direction: Direction,
    /// The only acceptable answers
    pub vocabulary: &'a [String],
    /// Upper bound for the call; implementations must not wait longer
    pub timeout: Duration,
}

/// External text-classification capability (LLM endpoint, stub, ...).
///
/// `Ok(None)` and `Err(_)` are both treated as "no answer".
pub trait CategoryClassifier: Send + Sync {
    fn classify(&self, request: &ClassificationRequest<'_>) -> Result<Option<String>>;
}

impl<F> CategoryClassifier for F
where
    F: Fn(&ClassificationRequest<'_>) -> Result<Option<String>> + Send + Sync,
{
    fn classify(&self, request: &ClassificationRequest<'_>) -> Result<Option<String>> {
        self(request)
    }
}

/// Keyword table lookup over `merchant + details`
pub struct KeywordStrategy {
    table: Arc<KeywordTable>,
}

impl KeywordStrategy {
    pub fn new(table: Arc<KeywordTable>) -> Self {
        Self { table }
    }
}

impl CategoryStrategy for KeywordStrategy {
    fn name(&self) -> &'static str {
        "keywords"
    }

    fn source(&self) -> CategorySource {
        CategorySource::Keywords
    }

    fn assign(&self, record: &ExpenseRecord) -> Option<String> {
        let search = format!("{} {}", record.merchant, record.details_raw);
        let hit = self.table.lookup(&search)?;
        debug!(category = %hit.category, keyword = %hit.keyword, "keyword matched");
        Some(hit.category)
    }
}

/// Asks an external classifier, constrained to the table's category names.
///
/// The call runs on its own thread and is abandoned once the timeout passes;
/// a late answer is dropped.
pub struct ModelStrategy {
    classifier: Arc<dyn CategoryClassifier>,
    table: Arc<KeywordTable>,
    timeout: Duration,
}

impl ModelStrategy {
    pub fn new(classifier: Arc<dyn CategoryClassifier>, table: Arc<KeywordTable>) -> Self {
        Self {
            classifier,
            table,
            timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn classify_bounded(
        &self,
        record: &ExpenseRecord,
        vocabulary: Vec<String>,
    ) -> Result<Option<String>> {
        let classifier = Arc::clone(&self.classifier);
        let merchant = record.merchant.clone();
        let details = record.details_raw.clone();
        let amount = record.amount;
        let direction = record.direction;
        let timeout = self.timeout;
        let (tx, rx) = mpsc::channel();

        thread::Builder::new()
            .name("gasto-classifier".to_string())
            .spawn(move || {
                let request = ClassificationRequest {
                    merchant: &merchant,
                    amount,
                    details: &details,
                    direction,
                    vocabulary: &vocabulary,
                    timeout,
                };
                // receiver is gone after a timeout
                let _ = tx.send(classifier.classify(&request));
            })
            .context("spawn classifier thread")?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => bail!("classifier timed out after {timeout:?}"),
            Err(RecvTimeoutError::Disconnected) => bail!("classifier thread panicked"),
        }
    }
}

impl CategoryStrategy for ModelStrategy {
    fn name(&self) -> &'static str {
        "model"
    }

    fn source(&self) -> CategorySource {
        CategorySource::Model
    }

    fn assign(&self, record: &ExpenseRecord) -> Option<String> {
        let vocabulary = self.table.category_names();

        let answer = match self.classify_bounded(record, vocabulary.clone()) {
            Ok(Some(answer)) => answer,
            Ok(None) => {
                debug!(merchant = %record.merchant, "classifier gave no answer");
                return None;
            }
            Err(e) => {
                warn!(merchant = %record.merchant, "classification unavailable: {e:#}");
                return None;
            }
        };

        let answer = answer.trim();
        if vocabulary.iter().any(|v| v == answer) {
            Some(answer.to_string())
        } else {
            debug!(answer, "classifier answer outside vocabulary");
            None
        }
    }
}

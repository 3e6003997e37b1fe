//! Validator/Completer: turns extracted fields into an `ExpenseRecord`.
//!
//! A missing or non-positive amount rejects the message. Everything else
//! that extraction could not find is filled with a default.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::PipelineError;
use crate::record::{ExpenseRecord, ExtractedFields, UNIDENTIFIED_MERCHANT};
use crate::time::Clock;

/// Build a record from extracted fields.
///
/// `details` is the normalized message text, `occurred_on` the already
/// resolved date (if any). The record leaves here uncategorized.
pub fn complete(
    details: &str,
    fields: ExtractedFields,
    occurred_on: Option<NaiveDate>,
    user_id: Option<&str>,
    clock: &dyn Clock,
) -> Result<ExpenseRecord, PipelineError> {
    let amount = match fields.amount {
        Some(a) if a > Decimal::ZERO => a,
        _ => {
            return Err(PipelineError::InvalidAmount {
                details: details.to_string(),
            });
        }
    };

    let merchant = fields
        .merchant_raw
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| UNIDENTIFIED_MERCHANT.to_string());

    Ok(ExpenseRecord {
        amount,
        occurred_on: occurred_on.unwrap_or_else(|| clock.today()),
        merchant,
        direction: fields.direction,
        details_raw: details.to_string(),
        category_hint: fields.category_hint,
        category_id: None,
        category_source: None,
        user_id: user_id.map(str::to_string),
        created_at: clock.now(),
    })
}

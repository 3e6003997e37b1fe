//! gasto-core: expense record types, error taxonomy, clock, and the
//! validator that completes extracted fields into records.

pub mod error;
pub mod record;
pub mod time;
pub mod validate;

pub use error::PipelineError;
pub use record::{
    CategorySource, Direction, ExpenseRecord, ExtractedFields, RawMessage, UNIDENTIFIED_MERCHANT,
    format_brl,
};
pub use time::{Clock, FixedClock, SystemClock, parse_timezone};
pub use validate::complete;

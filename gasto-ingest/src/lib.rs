//! gasto-ingest: message text normalization, field extraction and date resolution.

pub mod dates;
pub mod extract;
pub mod normalize;
pub mod patterns;

pub use dates::DateResolver;
pub use extract::{DatePrecedence, FieldExtractor, parse_amount};
pub use normalize::normalize;
pub use patterns::{FieldPattern, FieldPatterns, PatternGroup, PatternMatch};

//! gasto-pipeline: keyword table, categorization strategies, and the
//! end-to-end expense pipeline.

pub mod categorizer;
pub mod keyword_table;
pub mod pipeline;
pub mod strategy;

pub use categorizer::{Categorizer, DEFAULT_CATEGORY};
pub use keyword_table::{CategoryKeywords, KeywordHit, KeywordTable, KeywordTableError};
pub use pipeline::{ExpensePipeline, PipelineBuilder};
pub use strategy::{
    CategoryClassifier, CategoryStrategy, ClassificationRequest, KeywordStrategy, ModelStrategy,
};

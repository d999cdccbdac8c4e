//! Catalog-specific selectors, record extraction, and data models.

pub mod extractor;
pub mod models;
pub mod normalize;
pub mod selectors;

pub use extractor::RecordExtractor;
pub use models::{Category, ProductRecord, RawRecord, RecordKey};
pub use selectors::{SelectorMap, SiteSelectors};

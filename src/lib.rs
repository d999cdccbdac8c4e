//! catalog-crawler - Session-authenticated product catalog crawler
//!
//! Logs into a distributor catalog through a WebDriver browser, walks every
//! category filter page by page, and collects normalized product records.

pub mod browser;
pub mod catalog;
pub mod config;
pub mod crawler;
pub mod error;
pub mod format;

pub use catalog::models::{Category, ProductRecord};
pub use config::{Config, Credentials};
pub use crawler::{CrawlReport, Crawler};
pub use error::CrawlError;

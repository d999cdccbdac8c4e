//! Crawl workflow over an authenticated browser session.

pub mod categories;
pub mod orchestrator;
pub mod pagination;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use categories::CategoryEnumerator;
pub use orchestrator::{CategorySummary, CrawlReport, Crawler};
pub use pagination::{PageState, PaginationDriver};
pub use session::Session;

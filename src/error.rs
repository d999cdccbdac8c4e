//! Crawl error taxonomy.

use crate::browser::AutomationError;
use std::time::Duration;
use thiserror::Error;

/// Fatal conditions that abort a crawl run.
///
/// The end of a category's pagination is not represented here: a timeout on
/// the next-page control is the normal way a category finishes.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("missing credentials: set EMAIL and PASSWORD in the environment or a .env file")]
    MissingCredentials,

    #[error("invalid selector for `{field}` (\"{selector}\"): {reason}")]
    InvalidSelector { field: String, selector: String, reason: String },

    #[error("page element `{selector}` did not render within {timeout:?}")]
    NavigationTimeout { selector: String, timeout: Duration },

    #[error(transparent)]
    Automation(#[from] AutomationError),
}

impl CrawlError {
    /// Maps an automation failure on a page-critical element.
    ///
    /// Timeouts become [`CrawlError::NavigationTimeout`]; anything else is passed through.
    pub fn critical(err: AutomationError) -> Self {
        match err {
            AutomationError::Timeout { selector, timeout } => {
                CrawlError::NavigationTimeout { selector, timeout }
            }
            other => CrawlError::Automation(other),
        }
    }
}

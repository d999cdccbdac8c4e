//! Per-category pagination.
//!
//! ```text
//! Idle --toggle on--> Filtered --extract, next--> Paging --extract, next--> Paging
//!                        |                           |
//!                        +------ no next page -------+--> Drained --toggle off--> Idle
//! ```
//!
//! Each physical page is extracted exactly once. A timeout while waiting for
//! the next-page control is how a category ends, not a failure.

use crate::browser::{PageAutomation, WaitOptions};
use crate::catalog::extractor::RecordExtractor;
use crate::catalog::models::{Category, ProductRecord};
use crate::catalog::selectors::{compile, ListingSelectors};
use crate::config::Config;
use crate::crawler::session::Session;
use crate::error::CrawlError;
use rand::Rng;
use scraper::{Html, Selector};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const SETTLE_POLL: Duration = Duration::from_millis(100);

/// Where the driver is within one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// No filter applied.
    Idle,
    /// Category filter applied, first page loaded.
    Filtered,
    /// Moved past the first page.
    Paging,
    /// No further page; filter still applied.
    Drained,
}

/// Records gathered for one category.
#[derive(Debug, Clone)]
pub struct CategoryCrawl {
    pub category: String,
    /// Pages extracted
    pub pages: u32,
    pub records: Vec<ProductRecord>,
}

/// Timing knobs for the driver.
#[derive(Debug, Clone)]
pub struct PaginationSettings {
    pub element_timeout: Duration,
    pub next_page_timeout: Duration,
    pub delay_ms: u64,
    pub delay_jitter_ms: u64,
    pub max_pages: Option<u32>,
}

impl From<&Config> for PaginationSettings {
    fn from(config: &Config) -> Self {
        Self {
            element_timeout: config.element_timeout(),
            next_page_timeout: config.next_page_timeout(),
            delay_ms: config.delay_ms,
            delay_jitter_ms: config.delay_jitter_ms,
            max_pages: config.max_pages,
        }
    }
}

/// Walks every result page of one category.
pub struct PaginationDriver<'a> {
    extractor: &'a RecordExtractor,
    container_selector: String,
    next_selector: String,
    container: Selector,
    settings: PaginationSettings,
}

impl<'a> PaginationDriver<'a> {
    pub fn new(
        extractor: &'a RecordExtractor,
        listing: &ListingSelectors,
        settings: PaginationSettings,
    ) -> Result<Self, CrawlError> {
        Ok(Self {
            extractor,
            container: compile("listing.container", &listing.container)?,
            container_selector: listing.container.clone(),
            next_selector: listing.next_page.clone(),
            settings,
        })
    }

    /// Filters the listing to `category`, extracts every page, then clears the filter.
    pub async fn crawl<P: PageAutomation>(
        &self,
        session: &Session<P>,
        category: &Category,
    ) -> Result<CategoryCrawl, CrawlError> {
        let mut crawl =
            CategoryCrawl { category: category.name.clone(), pages: 0, records: Vec::new() };
        let mut state = PageState::Idle;
        // Snapshot taken while confirming a re-render, reused for extraction.
        let mut pending: Option<String> = None;
        // Fingerprint of the listing as last seen, compared after each click.
        let mut current = self.fingerprint(&session.snapshot().await?);

        loop {
            debug!("{}: {:?}", category.name, state);

            state = match state {
                PageState::Idle => {
                    let html = self.toggle(session, category, current).await?;
                    pending = Some(html);
                    PageState::Filtered
                }
                PageState::Filtered | PageState::Paging => {
                    let html = match pending.take() {
                        Some(html) => html,
                        None => session.snapshot().await?,
                    };
                    current = self.fingerprint(&html);

                    let records = self.extractor.extract(&html);
                    crawl.pages += 1;
                    debug!(
                        "{}: page {} has {} records",
                        category.name,
                        crawl.pages,
                        records.len()
                    );
                    crawl.records.extend(records);

                    if self.page_limit_reached(crawl.pages) {
                        info!("{}: stopping at page limit {}", category.name, crawl.pages);
                        PageState::Drained
                    } else if !self.next_available(session).await? {
                        PageState::Drained
                    } else {
                        session.click(&self.next_selector).await?;
                        self.pause().await;
                        pending = Some(self.wait_for_change(session, current).await?);
                        PageState::Paging
                    }
                }
                PageState::Drained => {
                    self.toggle(session, category, current).await?;
                    break;
                }
            };
        }

        info!(
            "{}: {} records across {} pages",
            category.name,
            crawl.records.len(),
            crawl.pages
        );
        Ok(crawl)
    }

    /// Clicks the category checkbox and waits for the listing to re-render.
    ///
    /// Returns the first snapshot whose listing differs from `before`.
    async fn toggle<P: PageAutomation>(
        &self,
        session: &Session<P>,
        category: &Category,
        before: u64,
    ) -> Result<String, CrawlError> {
        session.click(&category.toggle).await?;
        self.pause().await;
        self.wait_for_change(session, before).await
    }

    /// True if the next-page control exists and can be clicked.
    async fn next_available<P: PageAutomation>(
        &self,
        session: &Session<P>,
    ) -> Result<bool, CrawlError> {
        let options = WaitOptions::present(self.settings.next_page_timeout);

        match session.page().wait_for_element(&self.next_selector, options).await {
            Ok(()) => {}
            Err(e) if e.is_timeout() => {
                debug!("No next page control");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        }

        let usable = session.page().is_interactable(&self.next_selector).await?;
        if !usable {
            debug!("Next page control present but disabled");
        }
        Ok(usable)
    }

    /// Polls until the listing container differs from `before`; returns that snapshot.
    ///
    /// The whole wait is bounded by the element timeout. A listing that never
    /// changes is a failed re-render.
    async fn wait_for_change<P: PageAutomation>(
        &self,
        session: &Session<P>,
        before: u64,
    ) -> Result<String, CrawlError> {
        let timeout = self.settings.element_timeout;
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now()).max(SETTLE_POLL);
            session.wait_present(&self.container_selector, remaining).await?;

            let html = session.snapshot().await?;
            if self.fingerprint(&html) != before {
                return Ok(html);
            }

            if Instant::now() >= deadline {
                return Err(CrawlError::NavigationTimeout {
                    selector: self.container_selector.clone(),
                    timeout,
                });
            }
            tokio::time::sleep(SETTLE_POLL).await;
        }
    }

    /// Hash of the listing container's markup, or of the whole page if it is missing.
    fn fingerprint(&self, html: &str) -> u64 {
        let document = Html::parse_document(html);
        let mut hasher = DefaultHasher::new();

        match document.select(&self.container).next() {
            Some(container) => container.html().hash(&mut hasher),
            None => html.hash(&mut hasher),
        }
        hasher.finish()
    }

    fn page_limit_reached(&self, pages: u32) -> bool {
        self.settings.max_pages.is_some_and(|max| pages >= max)
    }

    /// Adds a random delay to mimic human behavior.
    async fn pause(&self) {
        if self.settings.delay_ms == 0 && self.settings.delay_jitter_ms == 0 {
            return;
        }

        let jitter = if self.settings.delay_jitter_ms > 0 {
            rand::rng().random_range(0..=self.settings.delay_jitter_ms)
        } else {
            0
        };

        let total = self.settings.delay_ms + jitter;
        debug!("Delaying {}ms", total);
        tokio::time::sleep(Duration::from_millis(total)).await;
    }
}

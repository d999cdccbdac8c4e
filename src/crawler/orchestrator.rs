//! End-to-end crawl run: login, enumerate, paginate, release.

use crate::browser::PageAutomation;
use crate::catalog::extractor::RecordExtractor;
use crate::catalog::models::{dedupe, ProductRecord};
use crate::config::{Config, Credentials};
use crate::crawler::categories::CategoryEnumerator;
use crate::crawler::pagination::{CategoryCrawl, PaginationDriver, PaginationSettings};
use crate::crawler::session::Session;
use crate::error::CrawlError;
use serde::Serialize;
use tracing::{debug, info};

/// Per-category totals for the run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub name: String,
    pub pages: u32,
    pub records: usize,
}

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    /// Records in traversal order
    pub records: Vec<ProductRecord>,
    pub categories: Vec<CategorySummary>,
}

impl CrawlReport {
    pub fn pages(&self) -> u32 {
        self.categories.iter().map(|c| c.pages).sum()
    }
}

/// Drives a single crawl over one browser page.
pub struct Crawler {
    config: Config,
    extractor: RecordExtractor,
    enumerator: CategoryEnumerator,
}

impl Crawler {
    /// Validates the selector configuration and compiles it.
    pub fn new(config: Config) -> Result<Self, CrawlError> {
        config.selectors.validate()?;

        let extractor = RecordExtractor::new(&config.selectors.fields, &config.base_url)?;
        let enumerator = CategoryEnumerator::new(&config.selectors.listing)?;

        Ok(Self { config, extractor, enumerator })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the crawl. The page is closed before returning, on success or failure.
    pub async fn run<P: PageAutomation>(
        &self,
        credentials: &Credentials,
        page: P,
    ) -> Result<CrawlReport, CrawlError> {
        let mut session = Session::new(page);
        let result = self.crawl(&mut session, credentials).await;
        session.release().await;
        result
    }

    async fn crawl<P: PageAutomation>(
        &self,
        session: &mut Session<P>,
        credentials: &Credentials,
    ) -> Result<CrawlReport, CrawlError> {
        credentials.validate()?;

        let timeout = self.config.element_timeout();
        let selectors = &self.config.selectors;

        session.login(&self.config.base_url, credentials, &selectors.login, timeout).await?;

        debug!("Opening search page {}", self.config.search_url);
        session.open(&self.config.search_url).await?;
        session.wait_present(&selectors.listing.container, timeout).await?;

        let categories = self.enumerator.enumerate(session, timeout).await?;

        let driver = PaginationDriver::new(
            &self.extractor,
            &selectors.listing,
            PaginationSettings::from(&self.config),
        )?;

        let mut records = Vec::new();
        let mut summaries = Vec::with_capacity(categories.len());

        for (i, category) in categories.iter().enumerate() {
            info!("Category {}/{}: {}", i + 1, categories.len(), category.name);

            let CategoryCrawl { category, pages, records: found } =
                driver.crawl(session, category).await?;

            summaries.push(CategorySummary { name: category, pages, records: found.len() });
            records.extend(found);
        }

        if self.config.dedupe {
            let before = records.len();
            records = dedupe(records);
            info!("Dropped {} duplicate records", before - records.len());
        }

        let report = CrawlReport { records, categories: summaries };
        info!(
            "Crawl finished: {} records from {} categories ({} pages)",
            report.records.len(),
            report.categories.len(),
            report.pages()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::testing::{FakeCategory, FakeRow, FakeSite, SiteLayout};

    fn make_config() -> Config {
        Config {
            base_url: "https://catalog.example".to_string(),
            search_url: "https://catalog.example/Site/Search#".to_string(),
            element_timeout_ms: 50,
            next_page_timeout_ms: 50,
            delay_ms: 0,
            delay_jitter_ms: 0,
            ..Config::default()
        }
    }

    fn credentials() -> Credentials {
        Credentials::new("buyer@example.com", "hunter2")
    }

    #[tokio::test]
    async fn test_two_categories_in_order() {
        let site = FakeSite::new(SiteLayout {
            categories: vec![
                FakeCategory::with_page_sizes("A", "cat-a", &[3, 2]),
                FakeCategory::with_page_sizes("B", "cat-b", &[0]),
            ],
            ..SiteLayout::default()
        });

        let crawler = Crawler::new(make_config()).unwrap();
        let report = crawler.run(&credentials(), site.clone()).await.unwrap();

        let skus: Vec<&str> = report.records.iter().map(|r| r.sku.as_str()).collect();
        assert_eq!(
            skus,
            vec!["cat-a-p1-r1", "cat-a-p1-r2", "cat-a-p1-r3", "cat-a-p2-r1", "cat-a-p2-r2"]
        );
        assert_eq!(
            report.categories,
            vec![
                CategorySummary { name: "A".to_string(), pages: 2, records: 5 },
                CategorySummary { name: "B".to_string(), pages: 1, records: 0 },
            ]
        );
        assert_eq!(report.pages(), 3);

        assert!(site.logged_in());
        assert_eq!(site.max_checked(), 1);
        assert!(site.closed());
        assert_eq!(
            site.navigations(),
            vec!["https://catalog.example", "https://catalog.example/Site/Search#"]
        );
    }

    #[tokio::test]
    async fn test_missing_field_does_not_abort() {
        let mut category = FakeCategory::with_page_sizes("A", "cat-a", &[]);
        category.pages = vec![vec![FakeRow::new("X1").without_upc(), FakeRow::new("X2")]];

        let site =
            FakeSite::new(SiteLayout { categories: vec![category], ..SiteLayout::default() });
        let report = Crawler::new(make_config()).unwrap().run(&credentials(), site).await.unwrap();

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].upc, "");
        assert_eq!(report.records[0].vpn, "VPN-X1");
        assert_eq!(report.records[1].upc, "UPC-X2");
    }

    #[tokio::test]
    async fn test_missing_credentials_before_navigation() {
        let site = FakeSite::new(SiteLayout::default());
        let crawler = Crawler::new(make_config()).unwrap();

        let err = crawler.run(&Credentials::new("", ""), site.clone()).await.unwrap_err();

        assert!(matches!(err, CrawlError::MissingCredentials));
        assert!(site.navigations().is_empty());
        assert!(site.closed());
    }

    #[tokio::test]
    async fn test_listing_timeout_is_fatal_and_releases() {
        let site = FakeSite::new(SiteLayout {
            listing: false,
            categories: vec![FakeCategory::with_page_sizes("A", "cat-a", &[1])],
            ..SiteLayout::default()
        });

        let err = Crawler::new(make_config())
            .unwrap()
            .run(&credentials(), site.clone())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CrawlError::NavigationTimeout { ref selector, .. } if selector == "div#searchResults"
        ));
        assert!(site.closed());
        assert_eq!(site.snapshots(), 0);
    }

    #[tokio::test]
    async fn test_no_category_panel_yields_empty_report() {
        let site = FakeSite::new(SiteLayout { category_panel: false, ..SiteLayout::default() });
        let report = Crawler::new(make_config())
            .unwrap()
            .run(&credentials(), site.clone())
            .await
            .unwrap();

        assert!(report.records.is_empty());
        assert!(report.categories.is_empty());
        assert!(site.closed());
    }

    #[tokio::test]
    async fn test_duplicates_kept_unless_deduped() {
        let mut a = FakeCategory::with_page_sizes("A", "cat-a", &[]);
        a.pages = vec![vec![FakeRow::new("S1"), FakeRow::new("S2")]];
        let mut b = FakeCategory::with_page_sizes("B", "cat-b", &[]);
        b.pages = vec![vec![FakeRow::new("S2"), FakeRow::new("S3")]];
        let layout = SiteLayout { categories: vec![a, b], ..SiteLayout::default() };

        let report = Crawler::new(make_config())
            .unwrap()
            .run(&credentials(), FakeSite::new(layout.clone()))
            .await
            .unwrap();
        assert_eq!(report.records.len(), 4);

        let config = Config { dedupe: true, ..make_config() };
        let report =
            Crawler::new(config).unwrap().run(&credentials(), FakeSite::new(layout)).await.unwrap();
        let skus: Vec<&str> = report.records.iter().map(|r| r.sku.as_str()).collect();
        assert_eq!(skus, vec!["S1", "S2", "S3"]);
    }

    #[test]
    fn test_invalid_selector_rejected_up_front() {
        let mut config = make_config();
        config.selectors.listing.next_page = "ul[[".to_string();

        let result = Crawler::new(config);
        assert!(matches!(
            result,
            Err(CrawlError::InvalidSelector { ref field, .. }) if field == "listing.next_page"
        ));
    }
}

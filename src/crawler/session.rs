//! The authenticated browsing session.

use crate::browser::{AutomationError, PageAutomation, WaitOptions, WaitPolicy, SNAPSHOT_SCRIPT};
use crate::catalog::selectors::LoginSelectors;
use crate::config::Credentials;
use crate::error::CrawlError;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Owns the page for the duration of a crawl run.
///
/// Components borrow the session; only the orchestrator creates and releases it.
pub struct Session<P: PageAutomation> {
    page: P,
    authenticated: bool,
}

impl<P: PageAutomation> Session<P> {
    pub fn new(page: P) -> Self {
        Self { page, authenticated: false }
    }

    /// The underlying automation handle.
    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Submits the username/password form at `login_url`.
    pub async fn login(
        &mut self,
        login_url: &str,
        credentials: &Credentials,
        selectors: &LoginSelectors,
        timeout: Duration,
    ) -> Result<(), CrawlError> {
        info!("Logging in as {}", credentials.email());

        self.open(login_url).await?;

        self.wait_visible(&selectors.email, timeout).await?;
        self.page.click(&selectors.email).await?;
        self.page.type_text(credentials.email()).await?;

        self.wait_visible(&selectors.password, timeout).await?;
        self.page.click(&selectors.password).await?;
        self.page.type_text(credentials.password()).await?;

        self.page.click(&selectors.submit).await?;
        debug!("Login form submitted");

        self.wait_gone(&selectors.email, timeout).await?;
        self.authenticated = true;
        Ok(())
    }

    /// Waits until `selector` no longer matches a usable element.
    ///
    /// A stale element reference while the page is navigating counts as gone.
    async fn wait_gone(&self, selector: &str, timeout: Duration) -> Result<(), CrawlError> {
        let deadline = Instant::now() + timeout;

        loop {
            match self.page.is_interactable(selector).await {
                Ok(false) => return Ok(()),
                Ok(true) => {}
                Err(AutomationError::Driver(e)) => {
                    debug!("Treating {} as gone: {}", selector, e);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }

            if Instant::now() >= deadline {
                return Err(CrawlError::NavigationTimeout {
                    selector: selector.to_string(),
                    timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Navigates and waits for the document to finish loading.
    pub async fn open(&self, url: &str) -> Result<(), CrawlError> {
        self.page.navigate(url, WaitPolicy::Load).await.map_err(CrawlError::critical)
    }

    /// Waits for a page-critical element. A timeout aborts the run.
    pub async fn wait_present(&self, selector: &str, timeout: Duration) -> Result<(), CrawlError> {
        self.page
            .wait_for_element(selector, WaitOptions::present(timeout))
            .await
            .map_err(CrawlError::critical)
    }

    /// Like [`Session::wait_present`], but the element must also be displayed.
    pub async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<(), CrawlError> {
        self.page
            .wait_for_element(selector, WaitOptions::visible(timeout))
            .await
            .map_err(CrawlError::critical)
    }

    pub async fn click(&self, selector: &str) -> Result<(), CrawlError> {
        Ok(self.page.click(selector).await?)
    }

    /// Serialized HTML of the live document.
    pub async fn snapshot(&self) -> Result<String, CrawlError> {
        let value = self.page.evaluate(SNAPSHOT_SCRIPT, Vec::new()).await?;
        match value {
            Value::String(html) => Ok(html),
            other => Err(CrawlError::Automation(AutomationError::Script(format!(
                "snapshot returned {} instead of a string",
                json_kind(&other)
            )))),
        }
    }

    /// Ends the browsing session. Close failures are logged, not returned.
    pub async fn release(self) {
        if let Err(e) = self.page.close().await {
            warn!("Failed to release browser session: {}", e);
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//! WebDriver-backed page automation using fantoccini.
//!
//! Talks to any W3C WebDriver server (geckodriver, chromedriver) listening at
//! the configured URL. The driver process itself is managed by the operator.

use crate::browser::automation::{AutomationError, PageAutomation, WaitOptions, WaitPolicy};
use crate::config::Config;
use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A single browser page driven over WebDriver.
pub struct WebDriverPage {
    client: Client,
    load_timeout: Duration,
    closed: AtomicBool,
}

impl WebDriverPage {
    /// Opens a new WebDriver session using the configured endpoint.
    pub async fn connect(config: &Config) -> Result<Self, AutomationError> {
        info!("Connecting to WebDriver at {}", config.webdriver_url);

        let mut builder = ClientBuilder::native();
        builder.capabilities(Self::capabilities(config.headless));

        let client = builder
            .connect(&config.webdriver_url)
            .await
            .map_err(|e| AutomationError::Driver(format!("failed to start session: {}", e)))?;

        Ok(Self {
            client,
            load_timeout: Duration::from_millis(config.element_timeout_ms),
            closed: AtomicBool::new(false),
        })
    }

    /// Session capabilities. Page loads are `eager` so [`WaitPolicy`] decides how long to block.
    fn capabilities(headless: bool) -> serde_json::Map<String, Value> {
        let mut caps = serde_json::Map::new();
        caps.insert("pageLoadStrategy".to_string(), json!("eager"));

        if headless {
            caps.insert("moz:firefoxOptions".to_string(), json!({ "args": ["-headless"] }));
            caps.insert("goog:chromeOptions".to_string(), json!({ "args": ["--headless=new"] }));
        }

        caps
    }

    fn ensure_open(&self) -> Result<(), AutomationError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AutomationError::SessionClosed);
        }
        Ok(())
    }

    /// Polls `document.readyState` until the page reports complete.
    async fn wait_for_load(&self, url: &str) -> Result<(), AutomationError> {
        let deadline = Instant::now() + self.load_timeout;

        loop {
            let state = self
                .client
                .execute("return document.readyState;", Vec::new())
                .await
                .map_err(driver)?;

            if state.as_str() == Some("complete") {
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(AutomationError::Timeout {
                    selector: format!("document load of {}", url),
                    timeout: self.load_timeout,
                });
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

fn driver(err: CmdError) -> AutomationError {
    AutomationError::Driver(err.to_string())
}

#[async_trait]
impl PageAutomation for WebDriverPage {
    async fn navigate(&self, url: &str, policy: WaitPolicy) -> Result<(), AutomationError> {
        self.ensure_open()?;
        debug!("Navigating to {}", url);

        self.client.goto(url).await.map_err(driver)?;

        match policy {
            WaitPolicy::Commit => Ok(()),
            WaitPolicy::Load => self.wait_for_load(url).await,
        }
    }

    async fn wait_for_element(
        &self,
        selector: &str,
        options: WaitOptions,
    ) -> Result<(), AutomationError> {
        self.ensure_open()?;
        trace!("Waiting up to {:?} for {}", options.timeout, selector);

        let started = Instant::now();
        let element = match self
            .client
            .wait()
            .at_most(options.timeout)
            .for_element(Locator::Css(selector))
            .await
        {
            Ok(element) => element,
            Err(CmdError::WaitTimeout) => {
                return Err(AutomationError::Timeout {
                    selector: selector.to_string(),
                    timeout: options.timeout,
                });
            }
            Err(e) => return Err(driver(e)),
        };

        if !options.visible {
            return Ok(());
        }

        let deadline = started + options.timeout;
        loop {
            if element.is_displayed().await.map_err(driver)? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(AutomationError::Timeout {
                    selector: selector.to_string(),
                    timeout: options.timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn is_interactable(&self, selector: &str) -> Result<bool, AutomationError> {
        self.ensure_open()?;

        let elements = self.client.find_all(Locator::Css(selector)).await.map_err(driver)?;
        let Some(element) = elements.first() else {
            return Ok(false);
        };

        if !element.is_displayed().await.map_err(driver)?
            || !element.is_enabled().await.map_err(driver)?
        {
            return Ok(false);
        }

        // Pagination links are often anchors disabled only through markup.
        let aria_disabled = element.attr("aria-disabled").await.map_err(driver)?;
        let class = element.attr("class").await.map_err(driver)?.unwrap_or_default();

        Ok(aria_disabled.as_deref() != Some("true")
            && !class.split_whitespace().any(|c| c == "disabled"))
    }

    async fn click(&self, selector: &str) -> Result<(), AutomationError> {
        self.ensure_open()?;
        debug!("Clicking {}", selector);

        let elements = self.client.find_all(Locator::Css(selector)).await.map_err(driver)?;
        let element = elements
            .first()
            .ok_or_else(|| AutomationError::NotFound { selector: selector.to_string() })?;

        element.click().await.map_err(driver)
    }

    async fn type_text(&self, text: &str) -> Result<(), AutomationError> {
        self.ensure_open()?;

        let focused = self.client.active_element().await.map_err(driver)?;
        focused.send_keys(text).await.map_err(driver)
    }

    async fn evaluate(&self, script: &str, args: Vec<Value>) -> Result<Value, AutomationError> {
        self.ensure_open()?;

        self.client
            .execute(script, args)
            .await
            .map_err(|e| AutomationError::Script(e.to_string()))
    }

    async fn close(&self) -> Result<(), AutomationError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        info!("Closing browser session");
        if let Err(e) = self.client.clone().close().await {
            warn!("Failed to close WebDriver session: {}", e);
            return Err(driver(e));
        }
        Ok(())
    }
}

//! The page automation boundary.
//!
//! Everything the crawler needs from a browser goes through [`PageAutomation`].
//! The trait is intentionally narrow so it can be implemented by a WebDriver
//! session in production and by an in-memory fake site in tests.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Script used to pull a serializable snapshot of the live document.
pub const SNAPSHOT_SCRIPT: &str = "return document.documentElement.outerHTML;";

/// Errors raised by a page automation backend.
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("timed out after {timeout:?} waiting for `{selector}`")]
    Timeout { selector: String, timeout: Duration },

    #[error("no element matches `{selector}`")]
    NotFound { selector: String },

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("webdriver error: {0}")]
    Driver(String),

    #[error("browser session already closed")]
    SessionClosed,
}

impl AutomationError {
    /// Returns true if this error is a bounded-wait timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AutomationError::Timeout { .. })
    }
}

/// How long `navigate` should block before returning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Return once the navigation has been committed.
    Commit,
    /// Block until the document reports `readyState == "complete"`.
    #[default]
    Load,
}

/// Options for [`PageAutomation::wait_for_element`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Upper bound on the wait.
    pub timeout: Duration,
    /// Require the element to be displayed, not just attached.
    pub visible: bool,
}

impl WaitOptions {
    /// Waits for the element to be attached to the DOM.
    pub fn present(timeout: Duration) -> Self {
        Self { timeout, visible: false }
    }

    /// Waits for the element to be attached and displayed.
    pub fn visible(timeout: Duration) -> Self {
        Self { timeout, visible: true }
    }
}

/// Capabilities the crawler requires from a browser - enables mocking for tests.
#[async_trait]
pub trait PageAutomation: Send + Sync {
    /// Navigates the page to `url`.
    async fn navigate(&self, url: &str, policy: WaitPolicy) -> Result<(), AutomationError>;

    /// Waits until an element matching `selector` exists (and is visible, if requested).
    ///
    /// Returns [`AutomationError::Timeout`] when the bound elapses.
    async fn wait_for_element(
        &self,
        selector: &str,
        options: WaitOptions,
    ) -> Result<(), AutomationError>;

    /// Returns true if an element matching `selector` exists and can be clicked.
    async fn is_interactable(&self, selector: &str) -> Result<bool, AutomationError>;

    /// Clicks the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<(), AutomationError>;

    /// Types `text` into the focused element.
    async fn type_text(&self, text: &str) -> Result<(), AutomationError>;

    /// Runs `script` against the live document and returns its serialized result.
    async fn evaluate(&self, script: &str, args: Vec<Value>) -> Result<Value, AutomationError>;

    /// Ends the browsing session.
    async fn close(&self) -> Result<(), AutomationError>;
}

//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::catalog::selectors::SiteSelectors;
use crate::error::CrawlError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Site root; the login form is served here
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Search landing page with the category panel
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// WebDriver endpoint (geckodriver, chromedriver)
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Run the browser without a window
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Bound on waits for login fields and the listing container
    #[serde(default = "default_element_timeout_ms")]
    pub element_timeout_ms: u64,

    /// Bound on the wait for the next-page control
    #[serde(default = "default_next_page_timeout_ms")]
    pub next_page_timeout_ms: u64,

    /// Base delay after clicks in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Random jitter added to delay (0 to this value)
    #[serde(default = "default_delay_jitter_ms")]
    pub delay_jitter_ms: u64,

    /// Stop each category after this many pages
    #[serde(default)]
    pub max_pages: Option<u32>,

    /// Drop products already seen in an earlier category
    #[serde(default)]
    pub dedupe: bool,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    #[serde(default)]
    pub selectors: SiteSelectors,
}

fn default_base_url() -> String {
    "https://usa.ingrammicro.com".to_string()
}

fn default_search_url() -> String {
    "https://usa.ingrammicro.com/Site/Search#".to_string()
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_element_timeout_ms() -> u64 {
    30_000
}

fn default_next_page_timeout_ms() -> u64 {
    5_000
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_delay_jitter_ms() -> u64 {
    1500
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            search_url: default_search_url(),
            webdriver_url: default_webdriver_url(),
            headless: default_headless(),
            element_timeout_ms: default_element_timeout_ms(),
            next_page_timeout_ms: default_next_page_timeout_ms(),
            delay_ms: default_delay_ms(),
            delay_jitter_ms: default_delay_jitter_ms(),
            max_pages: None,
            dedupe: false,
            format: OutputFormat::Json,
            selectors: SiteSelectors::default(),
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // 1. Explicit path takes precedence
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // 2. Try current directory
        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        // 3. Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("catalog-crawler").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        // 4. Return default config
        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(self) -> Self {
        self.with_vars(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable source.
    pub fn with_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = var("CATALOG_BASE_URL") {
            self.base_url = url;
        }

        if let Some(url) = var("CATALOG_SEARCH_URL") {
            self.search_url = url;
        }

        if let Some(url) = var("CATALOG_WEBDRIVER_URL") {
            self.webdriver_url = url;
        }

        if let Some(delay) = var("CATALOG_DELAY") {
            if let Ok(d) = delay.parse() {
                self.delay_ms = d;
            }
        }

        self
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn next_page_timeout(&self) -> Duration {
        Duration::from_millis(self.next_page_timeout_ms)
    }
}

/// Login credentials for the catalog site.
#[derive(Clone, Default)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into() }
    }

    /// Reads `EMAIL` and `PASSWORD`. Unset variables become empty strings.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        Self::new(var("EMAIL").unwrap_or_default(), var("PASSWORD").unwrap_or_default())
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Both values must be non-empty.
    pub fn validate(&self) -> Result<(), CrawlError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(CrawlError::MissingCredentials);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
    Table,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "table" => Ok(OutputFormat::Table),
            _ => Err(format!("Unknown format: {}. Use: json, csv, table", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}

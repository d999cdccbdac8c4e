//! Browser automation: the page automation trait and its WebDriver backend.

pub mod automation;
pub mod webdriver;

pub use automation::{AutomationError, PageAutomation, WaitOptions, WaitPolicy, SNAPSHOT_SCRIPT};
pub use webdriver::WebDriverPage;

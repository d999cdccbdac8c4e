//! Category discovery on the search landing page.

use crate::browser::{PageAutomation, WaitOptions};
use crate::catalog::models::Category;
use crate::catalog::normalize::strip_count_suffix;
use crate::catalog::selectors::{compile, ListingSelectors};
use crate::crawler::session::Session;
use crate::error::CrawlError;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Reads the category filter panel.
pub struct CategoryEnumerator {
    panel_selector: String,
    option_selector: String,
    checkbox_selector: String,
    panel: Selector,
    option: Selector,
    checkbox: Selector,
}

impl CategoryEnumerator {
    pub fn new(listing: &ListingSelectors) -> Result<Self, CrawlError> {
        Ok(Self {
            panel: compile("listing.category_panel", &listing.category_panel)?,
            option: compile("listing.category_option", &listing.category_option)?,
            checkbox: compile("listing.category_checkbox", &listing.category_checkbox)?,
            panel_selector: listing.category_panel.clone(),
            option_selector: listing.category_option.clone(),
            checkbox_selector: listing.category_checkbox.clone(),
        })
    }

    /// Waits for the panel and returns its categories in page order.
    ///
    /// A panel that never becomes visible yields an empty list: there is
    /// nothing to crawl, which is not an error.
    pub async fn enumerate<P: PageAutomation>(
        &self,
        session: &Session<P>,
        timeout: Duration,
    ) -> Result<Vec<Category>, CrawlError> {
        match session
            .page()
            .wait_for_element(&self.panel_selector, WaitOptions::visible(timeout))
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_timeout() => {
                warn!("Category panel {} never became visible", self.panel_selector);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        }

        let html = session.snapshot().await?;
        let categories = self.parse(&html);

        info!("Found {} categories", categories.len());
        Ok(categories)
    }

    /// Extracts categories from a page snapshot. Duplicates are kept.
    pub fn parse(&self, html: &str) -> Vec<Category> {
        let document = Html::parse_document(html);
        let Some(panel) = document.select(&self.panel).next() else {
            debug!("No category panel in snapshot");
            return Vec::new();
        };

        panel
            .select(&self.option)
            .enumerate()
            .filter_map(|(index, option)| self.parse_option(panel, option, index))
            .collect()
    }

    fn parse_option(
        &self,
        panel: ElementRef,
        option: ElementRef,
        index: usize,
    ) -> Option<Category> {
        let label = option.text().collect::<Vec<_>>().join(" ");
        let label = label.split_whitespace().collect::<Vec<_>>().join(" ");
        let name = strip_count_suffix(&label);

        if name.is_empty() {
            trace!("Skipping unlabeled category option {}", index + 1);
            return None;
        }

        let toggle = self.toggle_selector(panel, option, index);
        trace!("Category {:?} -> {}", name, toggle);
        Some(Category::new(name, toggle))
    }

    /// Builds a selector that addresses this option's checkbox on the live page.
    ///
    /// Prefers the checkbox `id`, then a `for` reference on the label, then
    /// the checkbox `value`, then the element path from the panel down.
    fn toggle_selector(&self, panel: ElementRef, option: ElementRef, index: usize) -> String {
        let checkbox = option.select(&self.checkbox).next();

        if let Some(id) = checkbox.and_then(|c| c.value().attr("id")).filter(|id| !id.is_empty()) {
            return format!("[id=\"{}\"]", escape(id));
        }

        if let Some(target) = option.value().attr("for").filter(|f| !f.is_empty()) {
            return format!("[id=\"{}\"]", escape(target));
        }

        if let Some(value) = checkbox.and_then(|c| c.value().attr("value")) {
            return format!(
                "{} {}[value=\"{}\"]",
                self.panel_selector,
                self.checkbox_selector,
                escape(value)
            );
        }

        let path = match checkbox {
            Some(checkbox) => structural_path(panel, checkbox),
            None => structural_path(panel, option)
                .map(|path| format!("{} {}", path, self.checkbox_selector)),
        };

        match path {
            Some(path) => format!("{} > {}", self.panel_selector, path),
            None => format!(
                "{} {}:nth-of-type({}) {}",
                self.panel_selector,
                self.option_selector,
                index + 1,
                self.checkbox_selector
            ),
        }
    }
}

/// Child-combinator path from `panel` to `target`, one `tag:nth-child(k)` step
/// per level. `None` when `target` is not inside `panel`.
fn structural_path(panel: ElementRef, target: ElementRef) -> Option<String> {
    let mut steps = Vec::new();
    let mut current = target;

    while current.id() != panel.id() {
        let position = current.prev_siblings().filter(|n| n.value().is_element()).count() + 1;
        steps.push(format!("{}:nth-child({})", current.value().name(), position));
        current = current.parent().and_then(ElementRef::wrap)?;
    }

    if steps.is_empty() {
        return None;
    }
    steps.reverse();
    Some(steps.join(" > "))
}

/// Escapes a value for use inside a double-quoted CSS attribute selector.
fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

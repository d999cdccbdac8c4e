//! CSS selectors for the catalog site.
//!
//! This file contains the default locators for every page the crawler touches.
//! Update this file (and bump [`SELECTOR_REVISION`]) when the site changes its
//! markup. Every entry can also be overridden from the `[selectors]` table of
//! the config file without a rebuild.
//!
//! **Update process**: When extraction comes back empty, capture an HTML sample,
//! update selectors, and add a test fixture.

use crate::error::CrawlError;
use scraper::Selector;
use serde::{Deserialize, Serialize};

/// Revision of the built-in selector set.
pub const SELECTOR_REVISION: u32 = 3;

/// Field-to-selector mapping for product rows on a listing page.
///
/// Every selector except `product_row` is resolved inside a single row element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorMap {
    pub product_row: String,
    pub short_description: String,
    pub sku: String,
    pub vpn: String,
    pub msrp: String,
    pub list_price: String,
    pub upc: String,
    pub stock: String,
    pub url: String,
}

impl Default for SelectorMap {
    fn default() -> Self {
        Self {
            product_row: "div.row.product".to_string(),
            short_description: "a.js-adobe-tracking span".to_string(),
            sku: ".sku".to_string(),
            vpn: ".vpn".to_string(),
            msrp: "p.msrp span.display-block".to_string(),
            list_price: "p.panda-price".to_string(),
            upc: ".product.info.ean.show".to_string(),
            stock: "a.stockinformation".to_string(),
            url: "a.js-adobe-tracking".to_string(),
        }
    }
}

impl SelectorMap {
    /// Returns `(field name, selector)` pairs in declaration order.
    pub fn entries(&self) -> [(&'static str, &str); 9] {
        [
            ("product_row", &self.product_row),
            ("short_description", &self.short_description),
            ("sku", &self.sku),
            ("vpn", &self.vpn),
            ("msrp", &self.msrp),
            ("list_price", &self.list_price),
            ("upc", &self.upc),
            ("stock", &self.stock),
            ("url", &self.url),
        ]
    }
}

/// Locators for the login form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginSelectors {
    pub email: String,
    pub password: String,
    pub submit: String,
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            email: "input#okta-signin-username".to_string(),
            password: "input#okta-signin-password".to_string(),
            submit: "input#okta-signin-submit".to_string(),
        }
    }
}

/// Locators on the search landing / listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSelectors {
    /// Container that holds the result rows; its presence means the listing settled.
    pub container: String,
    /// Panel with the category filter checkboxes.
    pub category_panel: String,
    /// One option (label) per category inside the panel.
    pub category_option: String,
    /// Checkbox inside an option.
    pub category_checkbox: String,
    /// "Next page" control.
    pub next_page: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            container: "div#searchResults".to_string(),
            category_panel: "div#category-facet".to_string(),
            category_option: "label.checkbox".to_string(),
            category_checkbox: "input[type='checkbox']".to_string(),
            next_page: "ul.pagination li.next a".to_string(),
        }
    }
}

/// Complete, versioned selector configuration for the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSelectors {
    pub revision: u32,
    pub login: LoginSelectors,
    pub listing: ListingSelectors,
    pub fields: SelectorMap,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            revision: SELECTOR_REVISION,
            login: LoginSelectors::default(),
            listing: ListingSelectors::default(),
            fields: SelectorMap::default(),
        }
    }
}

impl SiteSelectors {
    /// Checks that every selector parses. Run once before any navigation.
    pub fn validate(&self) -> Result<(), CrawlError> {
        let pages = [
            ("login.email", self.login.email.as_str()),
            ("login.password", self.login.password.as_str()),
            ("login.submit", self.login.submit.as_str()),
            ("listing.container", self.listing.container.as_str()),
            ("listing.category_panel", self.listing.category_panel.as_str()),
            ("listing.category_option", self.listing.category_option.as_str()),
            ("listing.category_checkbox", self.listing.category_checkbox.as_str()),
            ("listing.next_page", self.listing.next_page.as_str()),
        ];

        for (field, selector) in pages.into_iter().chain(self.fields.entries()) {
            compile(field, selector)?;
        }
        Ok(())
    }
}

/// Parses a selector, naming the config field on failure.
pub fn compile(field: &str, selector: &str) -> Result<Selector, CrawlError> {
    Selector::parse(selector).map_err(|e| CrawlError::InvalidSelector {
        field: field.to_string(),
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

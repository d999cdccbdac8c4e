//! Record extraction from listing page snapshots.

use crate::catalog::models::{ProductRecord, RawRecord};
use crate::catalog::selectors::{compile, SelectorMap};
use crate::error::CrawlError;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};

/// Extracts product records from the rows of a listing page.
///
/// Selectors are compiled once; [`RecordExtractor::extract`] is pure and does
/// not wait or navigate.
pub struct RecordExtractor {
    base_url: String,
    product_row: Selector,
    short_description: Selector,
    sku: Selector,
    vpn: Selector,
    msrp: Selector,
    list_price: Selector,
    upc: Selector,
    stock: Selector,
    url: Selector,
}

impl RecordExtractor {
    /// Compiles the selector map. `base_url` resolves relative product links.
    pub fn new(map: &SelectorMap, base_url: impl Into<String>) -> Result<Self, CrawlError> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            product_row: compile("product_row", &map.product_row)?,
            short_description: compile("short_description", &map.short_description)?,
            sku: compile("sku", &map.sku)?,
            vpn: compile("vpn", &map.vpn)?,
            msrp: compile("msrp", &map.msrp)?,
            list_price: compile("list_price", &map.list_price)?,
            upc: compile("upc", &map.upc)?,
            stock: compile("stock", &map.stock)?,
            url: compile("url", &map.url)?,
        })
    }

    /// Returns one normalized record per product row, in page order.
    pub fn extract(&self, html: &str) -> Vec<ProductRecord> {
        let records: Vec<ProductRecord> =
            self.extract_raw(html).into_iter().map(RawRecord::normalize).collect();

        debug!("Extracted {} records from page", records.len());
        records
    }

    /// Returns the raw text of every product row without normalizing it.
    pub fn extract_raw(&self, html: &str) -> Vec<RawRecord> {
        let document = Html::parse_document(html);
        document.select(&self.product_row).map(|row| self.extract_row(row)).collect()
    }

    fn extract_row(&self, row: ElementRef) -> RawRecord {
        let raw = RawRecord {
            short_description: self.text(row, &self.short_description, "short_description"),
            sku: self.text(row, &self.sku, "sku"),
            vpn: self.text(row, &self.vpn, "vpn"),
            msrp: self.text(row, &self.msrp, "msrp"),
            list_price: self.text(row, &self.list_price, "list_price"),
            upc: self.text(row, &self.upc, "upc"),
            stock: self.text(row, &self.stock, "stock"),
            url: self.href(row),
        };

        trace!("Row: sku={} vpn={}", raw.sku, raw.vpn);
        raw
    }

    /// Trimmed text of the first match inside `row`, or an empty string.
    fn text(&self, row: ElementRef, selector: &Selector, field: &str) -> String {
        match row.select(selector).next() {
            Some(e) => e.text().collect::<String>().trim().to_string(),
            None => {
                trace!("No match for {} in row", field);
                String::new()
            }
        }
    }

    /// Absolute product URL from the first `url` match inside `row`.
    fn href(&self, row: ElementRef) -> String {
        row.select(&self.url)
            .next()
            .and_then(|e| e.value().attr("href"))
            .map(|href| self.absolute_url(href.trim()))
            .unwrap_or_default()
    }

    fn absolute_url(&self, href: &str) -> String {
        if href.is_empty() || href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if href.starts_with("//") {
            let scheme = self.base_url.split_once("://").map_or("https", |(scheme, _)| scheme);
            format!("{}:{}", scheme, href)
        } else if href.starts_with('/') {
            format!("{}{}", self.base_url, href)
        } else {
            format!("{}/{}", self.base_url, href)
        }
    }
}

//! Data models for extracted product records and categories.

use crate::catalog::normalize::{extract_integer, extract_price};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Raw text pulled from one product row, before normalization.
///
/// Fields whose selector matched nothing are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub short_description: String,
    pub sku: String,
    pub vpn: String,
    pub msrp: String,
    pub list_price: String,
    pub upc: String,
    pub stock: String,
    pub url: String,
}

impl RawRecord {
    /// Converts price and stock text into typed values, consuming the raw record.
    pub fn normalize(self) -> ProductRecord {
        ProductRecord {
            vpn: self.vpn,
            msrp: extract_price(&self.msrp),
            vendor_price: extract_price(&self.list_price),
            discount: None,
            stock: extract_integer(&self.stock),
            sku: self.sku,
            upc: self.upc,
            short_description: self.short_description,
            long_description: None,
            url: self.url,
        }
    }
}

/// One normalized catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    /// Vendor part number
    pub vpn: String,
    /// Manufacturer's suggested retail price
    pub msrp: Option<f64>,
    /// Reseller price shown on the listing
    pub vendor_price: Option<f64>,
    /// Reserved; never filled in by the crawler
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub discount: Option<f64>,
    /// Stock count, or the site's stock label when it is not a number
    pub stock: String,
    /// Distributor SKU
    pub sku: String,
    /// UPC / EAN barcode
    pub upc: String,
    pub short_description: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub long_description: Option<String>,
    /// Product detail URL
    pub url: String,
}

/// Identity of a product for duplicate detection. SKUs and VPNs never compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey<'a> {
    Sku(&'a str),
    Vpn(&'a str),
}

impl ProductRecord {
    /// Key used to detect the same product listed under several categories.
    ///
    /// SKU when present, else VPN. Records with neither have no key.
    pub fn dedupe_key(&self) -> Option<RecordKey<'_>> {
        if !self.sku.is_empty() {
            Some(RecordKey::Sku(&self.sku))
        } else if !self.vpn.is_empty() {
            Some(RecordKey::Vpn(&self.vpn))
        } else {
            None
        }
    }
}

/// Drops repeated products, keeping the first occurrence and the original order.
pub fn dedupe(records: Vec<ProductRecord>) -> Vec<ProductRecord> {
    let keep: Vec<bool> = {
        let mut seen = HashSet::new();
        records
            .iter()
            .map(|r| match r.dedupe_key() {
                Some(key) => seen.insert(key),
                None => true,
            })
            .collect()
    };

    records.into_iter().zip(keep).filter_map(|(r, keep)| keep.then_some(r)).collect()
}

/// A catalog facet that filters the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Label with the result count stripped
    pub name: String,
    /// Selector that toggles this category's checkbox
    pub toggle: String,
}

impl Category {
    pub fn new(name: impl Into<String>, toggle: impl Into<String>) -> Self {
        Self { name: name.into(), toggle: toggle.into() }
    }
}

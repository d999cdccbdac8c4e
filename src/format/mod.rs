//! Output formatting for product records (JSON, CSV, table).

use crate::catalog::models::ProductRecord;
use crate::config::OutputFormat;

/// Formats records for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats records in traversal order.
    pub fn format_records(&self, records: &[ProductRecord]) -> String {
        if records.is_empty() {
            return match self.format {
                OutputFormat::Json => "[]".to_string(),
                OutputFormat::Csv => self.csv_header(),
                OutputFormat::Table => "No products found.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Json => self.json_records(records),
            OutputFormat::Csv => self.csv_records(records),
            OutputFormat::Table => self.table_records(records),
        }
    }

    // JSON formatting

    fn json_records(&self, records: &[ProductRecord]) -> String {
        serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string())
    }

    // Table formatting

    fn table_records(&self, records: &[ProductRecord]) -> String {
        let sku_width = 12;
        let vpn_width = 20;
        let price_width = 10;
        let stock_width = 8;
        let desc_width = 40;

        let mut lines = Vec::new();

        lines.push(format!(
            "{:<sku_width$}  {:<vpn_width$}  {:>price_width$}  \
             {:>price_width$}  {:>stock_width$}  {}",
            "SKU", "VPN", "MSRP", "Price", "Stock", "Description"
        ));
        lines.push(format!(
            "{:-<sku_width$}  {:-<vpn_width$}  {:-<price_width$}  \
             {:-<price_width$}  {:-<stock_width$}  {:-<desc_width$}",
            "", "", "", "", "", ""
        ));

        for record in records {
            lines.push(format!(
                "{:<sku_width$}  {:<vpn_width$}  {:>price_width$}  \
                 {:>price_width$}  {:>stock_width$}  {}",
                record.sku,
                truncate(&record.vpn, vpn_width),
                price(record.msrp),
                price(record.vendor_price),
                truncate(&record.stock, stock_width),
                truncate(&record.short_description, desc_width)
            ));
        }

        lines.push(String::new());
        lines.push(format!("Total: {} products", records.len()));

        lines.join("\n")
    }

    // CSV formatting

    fn csv_header(&self) -> String {
        "sku,vpn,upc,short_description,msrp,vendor_price,stock,url".to_string()
    }

    fn csv_records(&self, records: &[ProductRecord]) -> String {
        let mut lines = Vec::new();
        lines.push(self.csv_header());

        for record in records {
            let msrp = record.msrp.map(|p| p.to_string()).unwrap_or_default();
            let vendor_price = record.vendor_price.map(|p| p.to_string()).unwrap_or_default();

            lines.push(format!(
                "{},{},{},{},{},{},{},{}",
                Self::csv_escape(&record.sku),
                Self::csv_escape(&record.vpn),
                Self::csv_escape(&record.upc),
                Self::csv_escape(&record.short_description),
                msrp,
                vendor_price,
                Self::csv_escape(&record.stock),
                Self::csv_escape(&record.url)
            ));
        }

        lines.join("\n")
    }

    fn csv_escape(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}

fn price(value: Option<f64>) -> String {
    value.map(|p| format!("{:.2}", p)).unwrap_or_else(|| "N/A".to_string())
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let head: String = s.chars().take(width - 3).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

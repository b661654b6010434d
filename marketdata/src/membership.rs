//! Index membership scraped from an HTML table.
//!
//! The default layout matches the constituents table of the S&P 100
//! Wikipedia article: third `<table>` on the page, one header row, ticker in
//! the first cell of each row.

use std::time::Duration;

use capweight::Symbol;
use log::debug;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};

use crate::MembershipSource;
use crate::error::MarketDataError;

/// Default constituents page.
pub const SP100_URL: &str = "https://en.wikipedia.org/wiki/S%26P_100";

/// Where the ticker column lives in the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    /// Zero-based index among all `<table>` elements in document order.
    pub table_index: usize,
    /// Leading `tbody tr` rows to skip (column headers).
    pub header_rows: usize,
    /// Zero-based `<td>` index holding the ticker.
    pub symbol_column: usize,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            table_index: 2,
            header_rows: 1,
            symbol_column: 0,
        }
    }
}

/// Extract ticker symbols from a page, in table order.
///
/// Fails if the table does not exist, a data row lacks the ticker cell, or a
/// ticker is not a valid symbol.
pub fn parse_membership(html: &str, layout: &TableLayout) -> Result<Vec<Symbol>, MarketDataError> {
    let document = Html::parse_document(html);
    let table_sel = selector("table")?;
    let row_sel = selector("tbody tr")?;
    let cell_sel = selector("td")?;

    let table = document
        .select(&table_sel)
        .nth(layout.table_index)
        .ok_or_else(|| {
            MarketDataError::Parse(format!("page has no table at index {}", layout.table_index))
        })?;

    table
        .select(&row_sel)
        .skip(layout.header_rows)
        .enumerate()
        .map(|(i, row)| {
            let cell = row
                .select(&cell_sel)
                .nth(layout.symbol_column)
                .ok_or_else(|| {
                    MarketDataError::Parse(format!(
                        "row {} has no cell {}",
                        i + layout.header_rows,
                        layout.symbol_column
                    ))
                })?;
            let ticker = cell_text(cell);
            Symbol::try_new(&ticker)
                .ok_or_else(|| MarketDataError::Parse(format!("invalid ticker {ticker:?}")))
        })
        .collect()
}

fn selector(css: &str) -> Result<Selector, MarketDataError> {
    Selector::parse(css).map_err(|e| MarketDataError::Parse(format!("bad selector {css:?}: {e}")))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Membership source that downloads and parses a constituents page.
pub struct HtmlTableMembership {
    client: Client,
    url: String,
    layout: TableLayout,
}

impl HtmlTableMembership {
    pub fn new(url: &str, layout: TableLayout, timeout: Duration) -> Result<Self, MarketDataError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("capweight/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MarketDataError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.to_string(),
            layout,
        })
    }
}

impl MembershipSource for HtmlTableMembership {
    fn index_symbols(&self) -> Result<Vec<Symbol>, MarketDataError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| MarketDataError::Transport(format!("membership request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(MarketDataError::Status {
                what: self.url.clone(),
                status: resp.status().as_u16(),
            });
        }

        let body = resp
            .text()
            .map_err(|e| MarketDataError::Transport(format!("membership body: {e}")))?;
        let symbols = parse_membership(&body, &self.layout)?;
        debug!("Scraped {} index members from {}", symbols.len(), self.url);
        Ok(symbols)
    }
}

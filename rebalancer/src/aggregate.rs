//! Batched quote collection.

use capweight::{QuoteRecord, QuoteTable, Symbol};
use capweight_marketdata::QuoteProvider;
use log::debug;
use rustc_hash::FxHashSet;

use crate::error::{Error, Result};

/// Fetch key stats and previous close for every symbol, `batch_size` at a time.
///
/// Previous-close fields are merged over key-stats fields, so a `close` in
/// the previous bar wins. Duplicate input symbols are fetched once.
///
/// # Errors
///
/// - [`Error::Config`] if `batch_size` is zero or above the provider's limit
/// - [`Error::MarketData`] if any call fails
/// - [`Error::MissingQuote`] if a requested symbol is absent from a response
pub fn fetch_quotes(
    provider: &dyn QuoteProvider,
    symbols: &[Symbol],
    batch_size: usize,
) -> Result<QuoteTable> {
    let max = provider.max_batch();
    if batch_size == 0 || batch_size > max {
        return Err(Error::Config(format!(
            "batch size {batch_size} outside 1..={max}"
        )));
    }

    let mut seen = FxHashSet::default();
    let unique: Vec<Symbol> = symbols.iter().copied().filter(|s| seen.insert(*s)).collect();

    let mut table = QuoteTable::new();
    for (i, chunk) in unique.chunks(batch_size).enumerate() {
        debug!("Quote batch {}: {} symbol(s)", i + 1, chunk.len());
        let mut stats = provider.key_stats(chunk)?;
        let mut previous = provider.previous_close(chunk)?;

        for &symbol in chunk {
            let mut fields = stats.remove(&symbol).ok_or(Error::MissingQuote {
                symbol,
                call: "key stats",
            })?;
            let prev = previous.remove(&symbol).ok_or(Error::MissingQuote {
                symbol,
                call: "previous close",
            })?;
            fields.extend(prev);
            table.insert(symbol, QuoteRecord::from_fields(fields));
        }
    }
    Ok(table)
}

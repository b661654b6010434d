//! Per-symbol market statistics as delivered by a quote provider.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::Symbol;

/// Raw provider fields for one symbol.
pub type Fields = Map<String, Value>;

/// Field holding market capitalization in the provider payload.
pub const MARKETCAP_FIELD: &str = "marketcap";

/// Field holding the previous session's closing price.
pub const CLOSE_FIELD: &str = "close";

/// Market statistics for one symbol.
///
/// `marketcap` and `close` are extracted from the provider payload; every
/// provider field (including those two) is kept untouched in `fields`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuoteRecord {
    pub marketcap: f64,
    pub close: f64,
    pub fields: Fields,
}

impl QuoteRecord {
    /// Build a record from merged provider fields.
    ///
    /// Missing, null, or non-numeric `marketcap`/`close` values read as 0.
    pub fn from_fields(fields: Fields) -> Self {
        Self {
            marketcap: numeric_field(&fields, MARKETCAP_FIELD),
            close: numeric_field(&fields, CLOSE_FIELD),
            fields,
        }
    }

    /// Build a record from just the two fields the calculator needs.
    pub fn new(marketcap: f64, close: f64) -> Self {
        let mut fields = Fields::new();
        if let Some(n) = serde_json::Number::from_f64(marketcap) {
            fields.insert(MARKETCAP_FIELD.into(), Value::Number(n));
        }
        if let Some(n) = serde_json::Number::from_f64(close) {
            fields.insert(CLOSE_FIELD.into(), Value::Number(n));
        }
        Self {
            marketcap,
            close,
            fields,
        }
    }
}

fn numeric_field(fields: &Fields, key: &str) -> f64 {
    match fields.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Quotes for every fetched symbol, ordered by symbol.
pub type QuoteTable = BTreeMap<Symbol, QuoteRecord>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: Value) -> Fields {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn extracts_numbers_and_keeps_fields() {
        let rec = QuoteRecord::from_fields(fields(json!({
            "marketcap": 2_500_000_000_000u64,
            "close": 185.5,
            "companyName": "Apple Inc.",
        })));
        assert_eq!(rec.marketcap, 2.5e12);
        assert_eq!(rec.close, 185.5);
        assert_eq!(rec.fields["companyName"], "Apple Inc.");
        assert_eq!(rec.fields.len(), 3);
    }

    #[test]
    fn missing_or_null_fill_to_zero() {
        let rec = QuoteRecord::from_fields(fields(json!({ "marketcap": null })));
        assert_eq!(rec.marketcap, 0.0);
        assert_eq!(rec.close, 0.0);
    }

    #[test]
    fn numeric_strings_are_read() {
        let rec = QuoteRecord::from_fields(fields(json!({ "marketcap": "1000", "close": " 12.5 " })));
        assert_eq!(rec.marketcap, 1000.0);
        assert_eq!(rec.close, 12.5);
    }

    #[test]
    fn garbage_reads_as_zero() {
        let rec = QuoteRecord::from_fields(fields(json!({ "marketcap": "n/a", "close": [1] })));
        assert_eq!(rec.marketcap, 0.0);
        assert_eq!(rec.close, 0.0);
    }

    #[test]
    fn new_populates_fields() {
        let rec = QuoteRecord::new(100.0, 10.0);
        assert_eq!(rec.fields[MARKETCAP_FIELD], 100.0);
        assert_eq!(rec.fields[CLOSE_FIELD], 10.0);
    }
}

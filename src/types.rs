//! Core types: Symbol, Holdings

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Maximum ticker length in bytes.
pub const SYMBOL_MAX_LEN: usize = 24;

/// Ticker symbol stored inline (no heap allocation).
///
/// Holds up to 24 ASCII bytes. That covers US equity tickers with share-class
/// suffixes such as `BRK.B` as well as 21-character OCC option symbols, which
/// can show up among an account's positions. Padding bytes are zero, so the
/// derived ordering is the same as ordering the ticker strings.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    bytes: [u8; SYMBOL_MAX_LEN],
    len: u8,
}

impl Symbol {
    /// Create a symbol.
    ///
    /// # Panics
    ///
    /// Panics if `s` is empty, longer than [`SYMBOL_MAX_LEN`] bytes, or not printable ASCII.
    /// Use [`Symbol::try_new`] for untrusted input.
    pub fn new(s: &str) -> Self {
        match Self::try_new(s) {
            Some(sym) => sym,
            None => panic!("invalid symbol: {s:?}"),
        }
    }

    /// Create a symbol, returning `None` if `s` is not a valid ticker.
    pub fn try_new(s: &str) -> Option<Self> {
        let raw = s.as_bytes();
        if raw.is_empty() || raw.len() > SYMBOL_MAX_LEN {
            return None;
        }
        if !raw.iter().all(|b| b.is_ascii_graphic()) {
            return None;
        }
        let mut bytes = [0u8; SYMBOL_MAX_LEN];
        bytes[..raw.len()].copy_from_slice(raw);
        Some(Self {
            bytes,
            len: raw.len() as u8,
        })
    }

    /// The ticker as a string slice.
    pub fn as_str(&self) -> &str {
        // Only ASCII bytes are ever stored.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Symbol::try_new(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid symbol: {s:?}")))
    }
}

/// Current holdings: symbol → signed share count (negative = short).
pub type Holdings = BTreeMap<Symbol, i64>;

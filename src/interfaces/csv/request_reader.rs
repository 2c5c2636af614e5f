use crate::error::{Result, TaxError};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::str::FromStr;

/// One `postal_code,income` row. An empty postal code field is read as absent.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct TaxRequest {
    pub postal_code: Option<String>,
    #[serde(deserialize_with = "deserialize_decimal")]
    pub income: Decimal,
}

// Parses from the raw text so the submitted scale survives ("1000.00" stays 1000.00).
fn deserialize_decimal<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Decimal::from_str(raw.trim()).map_err(serde::de::Error::custom)
}

/// Reads calculation requests from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<TaxRequest>`.
/// It handles whitespace trimming and flexible record lengths automatically.
pub struct RequestReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RequestReader<R> {
    /// Creates a new `RequestReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes requests.
    pub fn requests(self) -> impl Iterator<Item = Result<TaxRequest>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(TaxError::from))
    }
}

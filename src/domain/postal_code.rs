use std::fmt;

/// Recorded in history when a request carried no postal code.
pub const UNKNOWN_POSTAL_CODE: &str = "Unknown";

/// A normalized postal code: trimmed and upper-cased.
///
/// An empty code is a valid value and means "no postal code supplied".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PostalCode(String);

impl PostalCode {
    pub fn normalize(raw: &str) -> Self {
        Self(raw.trim().to_uppercase())
    }

    pub fn from_request(raw: Option<&str>) -> Self {
        raw.map(Self::normalize).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The postal code as it should appear in history: the submitted value, or
/// [`UNKNOWN_POSTAL_CODE`] when it was absent or blank.
pub fn history_label(raw: Option<&str>) -> String {
    match raw {
        Some(code) if !code.trim().is_empty() => code.to_string(),
        _ => UNKNOWN_POSTAL_CODE.to_string(),
    }
}

use crate::domain::calculator::CalculationResult;
use crate::domain::money::{Income, Tax};
use crate::domain::postal_code::history_label;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An append-only audit entry for one successful calculation.
///
/// Records are built once from a [`CalculationResult`] and never mutated, so
/// the fields are only exposed through getters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    postal_code: String,
    income: Income,
    tax: Tax,
    calculator: String,
    timestamp: DateTime<Utc>,
}

impl HistoryRecord {
    /// `postal_code` is the value from the original request; absent or blank
    /// codes are recorded as `"Unknown"`.
    pub fn new(postal_code: Option<&str>, income: Income, result: &CalculationResult) -> Self {
        Self {
            postal_code: history_label(postal_code),
            income,
            tax: result.tax(),
            calculator: result.calculator().to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    pub fn income(&self) -> Income {
        self.income
    }

    pub fn tax(&self) -> Tax {
        self.tax
    }

    pub fn calculator(&self) -> &str {
        &self.calculator
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

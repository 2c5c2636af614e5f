use crate::domain::calculator::CalculationResult;
use crate::error::TaxError;
use rust_decimal::Decimal;
use serde::Serialize;

/// Shown for any failure that is not the caller's fault.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred, please contact Admin";

/// The caller-facing shape of a successful calculation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CalculateResponse {
    pub tax: Decimal,
    pub calculator: String,
}

impl From<&CalculationResult> for CalculateResponse {
    fn from(result: &CalculationResult) -> Self {
        Self {
            tax: result.tax().value(),
            calculator: result.calculator().to_string(),
        }
    }
}

/// The caller-facing shape of a failed calculation.
///
/// Client errors keep their message. Everything else is masked behind
/// [`GENERIC_ERROR_MESSAGE`]; callers log the details.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub message: String,
    pub client_error: bool,
}

impl From<&TaxError> for ErrorResponse {
    fn from(e: &TaxError) -> Self {
        if e.is_client_error() {
            Self {
                message: e.to_string(),
                client_error: true,
            }
        } else {
            Self {
                message: GENERIC_ERROR_MESSAGE.to_string(),
                client_error: false,
            }
        }
    }
}

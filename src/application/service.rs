use crate::application::cancel::CancelSignal;
use crate::domain::calculator::CalculationResult;
use crate::domain::history::HistoryRecord;
use crate::domain::money::Income;
use crate::domain::ports::{CalculatorResolverBox, HistoryStoreBox};
use crate::domain::postal_code::PostalCode;
use crate::error::{Result, TaxError};
use log::{debug, error};
use rust_decimal::Decimal;

/// Whether the history entry for a finished calculation was written.
#[derive(Debug)]
pub enum HistoryOutcome {
    Recorded,
    /// The calculation still stands; only the audit entry is missing.
    Failed(TaxError),
}

impl HistoryOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, HistoryOutcome::Recorded)
    }
}

/// A committed calculation plus the separate outcome of recording it.
#[derive(Debug)]
pub struct TaxOutcome {
    pub result: CalculationResult,
    pub history: HistoryOutcome,
}

/// The entry point for tax calculations.
///
/// Each call resolves a calculator, computes the tax and then records the
/// calculation. Nothing here is request-scoped, so one `TaxService` can be
/// shared behind an `Arc` by any number of concurrent requests.
pub struct TaxService {
    resolver: CalculatorResolverBox,
    history: HistoryStoreBox,
}

impl TaxService {
    /// Creates a new `TaxService`.
    ///
    /// # Arguments
    ///
    /// * `resolver` - Maps postal codes to calculators.
    /// * `history` - Receives one record per successful calculation.
    pub fn new(resolver: CalculatorResolverBox, history: HistoryStoreBox) -> Self {
        Self { resolver, history }
    }

    /// Calculates the tax for `income` under the calculator for `postal_code`.
    pub async fn calculate_tax(
        &self,
        postal_code: Option<&str>,
        income: Decimal,
    ) -> Result<TaxOutcome> {
        self.calculate_tax_with_cancel(postal_code, income, &CancelSignal::never())
            .await
    }

    /// Like [`calculate_tax`](Self::calculate_tax), aborting resolution and
    /// computation if `cancel` fires first.
    ///
    /// A validation, resolution or cancellation error aborts the request and
    /// nothing is recorded. Once a result exists, the history write runs to
    /// completion regardless of `cancel`, and its failure is reported in
    /// [`TaxOutcome::history`] instead of failing the call.
    pub async fn calculate_tax_with_cancel(
        &self,
        postal_code: Option<&str>,
        income: Decimal,
        cancel: &CancelSignal,
    ) -> Result<TaxOutcome> {
        let income = Income::new(income)?;
        let normalized = PostalCode::from_request(postal_code);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TaxError::Cancelled),
            result = self.compute(&normalized, income) => result?,
        };

        let record = HistoryRecord::new(postal_code, income, &result);
        let history = match self.history.add(record).await {
            Ok(()) => HistoryOutcome::Recorded,
            Err(e) => {
                error!(
                    "Failed to record calculation for postal code '{}': {}",
                    normalized, e
                );
                HistoryOutcome::Failed(e)
            }
        };

        Ok(TaxOutcome { result, history })
    }

    async fn compute(&self, postal_code: &PostalCode, income: Income) -> Result<CalculationResult> {
        let calculator = self.resolver.resolve(postal_code).await?;
        debug!(
            "Resolved postal code '{}' to calculator '{}'",
            postal_code,
            calculator.id()
        );
        calculator.calculate(income).await
    }

    /// Every recorded calculation, oldest first.
    pub async fn history(&self) -> Result<Vec<HistoryRecord>> {
        self.history.get_all().await
    }
}

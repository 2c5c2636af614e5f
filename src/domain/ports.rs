use super::calculator::Calculator;
use super::history::HistoryRecord;
use super::postal_code::PostalCode;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// The reference table mapping postal codes to calculator identifiers.
#[async_trait]
pub trait PostalCodeDirectory: Send + Sync {
    /// Looks up an exact, already normalized postal code.
    async fn calculator_for(&self, postal_code: &PostalCode) -> Result<Option<String>>;

    /// Bumped on every change to the table. Sources that never change keep 0.
    fn generation(&self) -> u64 {
        0
    }
}

/// Picks the calculator that applies to a postal code.
#[async_trait]
pub trait CalculatorResolver: Send + Sync {
    async fn resolve(&self, postal_code: &PostalCode) -> Result<Arc<dyn Calculator>>;
}

/// Durable, append-only calculation history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn add(&self, record: HistoryRecord) -> Result<()>;
    /// All records, oldest first.
    async fn get_all(&self) -> Result<Vec<HistoryRecord>>;
}

pub type PostalCodeDirectoryBox = Box<dyn PostalCodeDirectory>;
pub type CalculatorResolverBox = Box<dyn CalculatorResolver>;
pub type HistoryStoreBox = Box<dyn HistoryStore>;

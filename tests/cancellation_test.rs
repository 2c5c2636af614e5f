use async_trait::async_trait;
use postal_tax::application::cancel::cancel_pair;
use postal_tax::application::service::TaxService;
use postal_tax::config::TaxConfig;
use postal_tax::domain::calculator::Calculator;
use postal_tax::domain::history::HistoryRecord;
use postal_tax::domain::ports::{CalculatorResolver, HistoryStore};
use postal_tax::domain::postal_code::PostalCode;
use postal_tax::error::{Result, TaxError};
use postal_tax::infrastructure::in_memory::InMemoryHistoryStore;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

/// A resolver whose lookup takes `delay`, standing in for a remote table.
struct SlowResolver {
    delay: Duration,
}

#[async_trait]
impl CalculatorResolver for SlowResolver {
    async fn resolve(&self, postal_code: &PostalCode) -> Result<Arc<dyn Calculator>> {
        tokio::time::sleep(self.delay).await;
        TaxConfig::builtin().resolver()?.resolve(postal_code).await
    }
}

/// A history store whose writes take `delay` before landing.
#[derive(Clone)]
struct SlowHistoryStore {
    inner: InMemoryHistoryStore,
    delay: Duration,
}

#[async_trait]
impl HistoryStore for SlowHistoryStore {
    async fn add(&self, record: HistoryRecord) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.add(record).await
    }

    async fn get_all(&self) -> Result<Vec<HistoryRecord>> {
        self.inner.get_all().await
    }
}

#[tokio::test]
async fn test_cancel_aborts_slow_resolution() {
    let history = InMemoryHistoryStore::new();
    let service = TaxService::new(
        Box::new(SlowResolver {
            delay: Duration::from_secs(30),
        }),
        Box::new(history.clone()),
    );
    let (handle, signal) = cancel_pair();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        service.calculate_tax_with_cancel(Some("0000"), dec!(1000), &signal),
    )
    .await
    .expect("cancellation should abort promptly");

    assert!(matches!(result, Err(TaxError::Cancelled)));
    assert!(history.get_all().await.unwrap().is_empty());
    canceller.await.unwrap();
}

#[tokio::test]
async fn test_cancel_during_history_write_keeps_record() {
    let inner = InMemoryHistoryStore::new();
    let store = SlowHistoryStore {
        inner: inner.clone(),
        delay: Duration::from_millis(100),
    };
    let resolver = TaxConfig::builtin().resolver().unwrap();
    let service = TaxService::new(Box::new(resolver), Box::new(store));
    let (handle, signal) = cancel_pair();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
    });

    let outcome = service
        .calculate_tax_with_cancel(Some("0000"), dec!(1000), &signal)
        .await
        .unwrap();
    canceller.await.unwrap();

    assert!(signal.is_cancelled());
    assert!(outcome.history.is_recorded());
    assert_eq!(outcome.result.tax().value(), dec!(100.00));
    assert_eq!(inner.get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_uncancelled_signal_is_transparent() {
    let resolver = SlowResolver {
        delay: Duration::from_millis(5),
    };
    let history = InMemoryHistoryStore::new();
    let service = TaxService::new(Box::new(resolver), Box::new(history.clone()));
    let (_handle, signal) = cancel_pair();

    let outcome = service
        .calculate_tax_with_cancel(None, dec!(500.00), &signal)
        .await
        .unwrap();
    assert_eq!(outcome.result.calculator(), "FlatRate");
    assert_eq!(history.get_all().await.unwrap()[0].postal_code(), "Unknown");
}

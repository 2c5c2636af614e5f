#![allow(dead_code)]

use postal_tax::application::service::TaxService;
use postal_tax::config::TaxConfig;
use postal_tax::infrastructure::in_memory::InMemoryHistoryStore;
use std::io::Error;
use std::path::Path;

/// A service over the built-in rule set, plus a handle on its history log.
pub fn builtin_service() -> (TaxService, InMemoryHistoryStore) {
    let history = InMemoryHistoryStore::new();
    let resolver = TaxConfig::builtin()
        .resolver()
        .expect("built-in configuration is valid");
    let service = TaxService::new(Box::new(resolver), Box::new(history.clone()));
    (service, history)
}

pub fn write_requests(path: &Path, rows: &[(&str, &str)]) -> Result<(), Error> {
    let mut wtr = csv::WriterBuilder::new().from_path(path)?;
    wtr.write_record(["postal_code", "income"])?;
    for (postal_code, income) in rows {
        wtr.write_record([postal_code, income])?;
    }
    wtr.flush()?;
    Ok(())
}

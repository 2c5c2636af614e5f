use crate::domain::history::HistoryRecord;
use crate::error::Result;
use crate::interfaces::response::CalculateResponse;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct HistoryRow<'a> {
    postal_code: &'a str,
    income: String,
    tax: String,
    calculator: &'a str,
    timestamp: String,
}

impl<'a> From<&'a HistoryRecord> for HistoryRow<'a> {
    fn from(record: &'a HistoryRecord) -> Self {
        Self {
            postal_code: record.postal_code(),
            income: record.income().to_string(),
            tax: record.tax().to_string(),
            calculator: record.calculator(),
            timestamp: record.timestamp().to_rfc3339(),
        }
    }
}

/// Writes history records and calculation responses as CSV.
pub struct HistoryWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> HistoryWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes `postal_code,income,tax,calculator,timestamp` rows, header first.
    pub fn write_history(&mut self, records: &[HistoryRecord]) -> Result<()> {
        if records.is_empty() {
            self.writer
                .write_record(["postal_code", "income", "tax", "calculator", "timestamp"])?;
        }
        for record in records {
            self.writer.serialize(HistoryRow::from(record))?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Writes a single `Tax,Calculator` row, header first.
    pub fn write_response(&mut self, response: &CalculateResponse) -> Result<()> {
        self.writer.serialize(response)?;
        self.writer.flush()?;
        Ok(())
    }
}

//! CSV import provider.
//!
//! Reads a price file with header `date,open,high,low,close,adj_close,volume`
//! and serves it through the same `DataProvider` contract as the network
//! providers. Empty cells become NaN (volume 0), matching the Yahoo parser.

use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use crate::domain::PriceBar;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    adj_close: Option<f64>,
    volume: Option<u64>,
}

impl From<CsvRow> for PriceBar {
    fn from(row: CsvRow) -> Self {
        PriceBar {
            date: row.date,
            open: row.open.unwrap_or(f64::NAN),
            high: row.high.unwrap_or(f64::NAN),
            low: row.low.unwrap_or(f64::NAN),
            close: row.close.unwrap_or(f64::NAN),
            adj_close: row.adj_close.unwrap_or(f64::NAN),
            volume: row.volume.unwrap_or(0),
        }
    }
}

/// Provider backed by a local CSV file.
pub struct CsvProvider {
    path: PathBuf,
}

impl CsvProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_rows(&self) -> Result<Vec<PriceBar>, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| DataError::Csv(format!("open {}: {e}", self.path.display())))?;

        reader
            .deserialize::<CsvRow>()
            .enumerate()
            .map(|(i, row)| {
                row.map(PriceBar::from)
                    .map_err(|e| DataError::Csv(format!("row {}: {e}", i + 1)))
            })
            .collect()
    }
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let bars: Vec<PriceBar> = self
            .read_rows()?
            .into_iter()
            .filter(|b| b.date >= start && b.date < end)
            .collect();

        if bars.is_empty() {
            return Err(DataError::NoData {
                symbol: symbol.to_string(),
                start,
                end,
            });
        }

        Ok(FetchResult {
            bars,
            source: DataSource::CsvImport,
        })
    }
}

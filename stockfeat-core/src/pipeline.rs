//! The two pipeline stages.
//!
//! - ingest: provider → raw table (replace)
//! - process: raw table → moving-average features → feature table (replace)
//!
//! The stages share nothing in-process; process reads whatever raw table the
//! last ingest left behind. Each stage writes only after its input has been
//! fully obtained, so a failed run never touches the target table.

use crate::data::provider::{normalize_bars, DataError, DataProvider, DataSource};
use crate::data::store::{feature_table_name, table_name, DuckDbStore};
use crate::domain::{PriceBar, Symbol};
use crate::features::derive_features;
use chrono::NaiveDate;

/// Outcome of an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub symbol: Symbol,
    pub table: String,
    pub source: DataSource,
    pub rows: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

/// Outcome of a feature run.
#[derive(Debug, Clone)]
pub struct ProcessSummary {
    pub symbol: Symbol,
    pub table: String,
    pub input_rows: usize,
    pub output_rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// Fetch `[start, end)` for `symbol` and replace its raw table.
pub fn run_ingest(
    provider: &dyn DataProvider,
    store: &DuckDbStore,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<IngestSummary, DataError> {
    tracing::info!(symbol, %start, %end, provider = provider.name(), "fetching prices");
    let fetched = provider.fetch(symbol, start, end)?;

    let bars = normalize_bars(fetched.bars);
    let (first_date, last_date) = date_span(&bars).ok_or_else(|| DataError::NoData {
        symbol: symbol.to_string(),
        start,
        end,
    })?;
    tracing::info!(symbol, rows = bars.len(), %first_date, %last_date, "prices fetched");

    store.save_prices(symbol, &bars)?;

    Ok(IngestSummary {
        symbol: symbol.to_string(),
        table: table_name(symbol),
        source: fetched.source,
        rows: bars.len(),
        first_date,
        last_date,
    })
}

/// Derive features from the raw table in `input` and replace the feature
/// table in `output`. `input` and `output` may be the same file.
pub fn run_process(
    input: &DuckDbStore,
    output: &DuckDbStore,
    symbol: &str,
) -> Result<ProcessSummary, DataError> {
    let bars = input.load_prices(symbol)?;

    tracing::info!(symbol, rows = bars.len(), "calculating moving averages");
    let features = derive_features(&bars);
    if features.is_empty() {
        tracing::warn!(
            symbol,
            rows = bars.len(),
            "series too short for MA60; writing an empty feature table"
        );
    }

    output.save_features(symbol, &features)?;

    Ok(ProcessSummary {
        symbol: symbol.to_string(),
        table: feature_table_name(symbol),
        input_rows: bars.len(),
        output_rows: features.len(),
        first_date: features.first().map(|f| f.date()),
        last_date: features.last().map(|f| f.date()),
    })
}

fn date_span(bars: &[PriceBar]) -> Option<(NaiveDate, NaiveDate)> {
    Some((bars.first()?.date, bars.last()?.date))
}

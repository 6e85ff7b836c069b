//! Integration tests for both pipeline stages against real DuckDB files.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::Cell;
use stockfeat_core::data::provider::{DataError, DataProvider, DataSource, FetchResult};
use stockfeat_core::data::{feature_table_name, DuckDbStore};
use stockfeat_core::domain::PriceBar;
use stockfeat_core::{run_ingest, run_process};

const EPS: f64 = 1e-9;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// `n` daily rows from 2023-01-01 with random prices, seeded for repeatability.
fn synthetic_series(n: usize, seed: u64) -> Vec<PriceBar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = d(2023, 1, 1);
    (0..n)
        .map(|i| PriceBar {
            date: start + chrono::Duration::days(i as i64),
            open: rng.gen_range(100.0..102.0),
            high: rng.gen_range(102.0..104.0),
            low: rng.gen_range(98.0..100.0),
            close: rng.gen_range(100.0..103.0),
            adj_close: rng.gen_range(100.0..103.0),
            volume: rng.gen_range(1_000_000..5_000_000),
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Provider that serves a fixed series and counts calls.
struct FixedProvider {
    bars: Vec<PriceBar>,
    calls: Cell<usize>,
}

impl FixedProvider {
    fn new(bars: Vec<PriceBar>) -> Self {
        Self {
            bars,
            calls: Cell::new(0),
        }
    }
}

impl DataProvider for FixedProvider {
    fn name(&self) -> &str {
        "fixed"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        self.calls.set(self.calls.get() + 1);
        let bars: Vec<PriceBar> = self
            .bars
            .iter()
            .filter(|b| b.date >= start && b.date < end)
            .cloned()
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

#[test]
fn hundred_rows_yield_forty_one_features() {
    let dir = tempfile::tempdir().unwrap();
    let raw = DuckDbStore::new(dir.path().join("raw.duckdb"));
    let out = DuckDbStore::new(dir.path().join("features.duckdb"));
    let series = synthetic_series(100, 7);
    let closes: Vec<f64> = series.iter().map(|b| b.close).collect();
    let provider = FixedProvider::new(series);

    let ingest = run_ingest(&provider, &raw, "SPY", d(2023, 1, 1), d(2024, 1, 1)).unwrap();
    assert_eq!(ingest.rows, 100);
    assert_eq!(ingest.table, "spy");
    assert_eq!(ingest.source, DataSource::CsvImport);
    assert_eq!(ingest.first_date, d(2023, 1, 1));

    let summary = run_process(&raw, &out, "SPY").unwrap();
    assert_eq!(summary.input_rows, 100);
    assert_eq!(summary.output_rows, 41);
    assert_eq!(summary.table, "spy_features");

    let features = out.load_features("SPY").unwrap();
    assert_eq!(features.len(), 41);

    // First output row maps to source row 59
    assert_eq!(features[0].date(), d(2023, 3, 1));
    assert!((features[0].ma60 - mean(&closes[0..60])).abs() < EPS);
    assert!((features[0].ma20 - mean(&closes[40..60])).abs() < EPS);

    let last = features.last().unwrap();
    assert!((last.ma20 - mean(&closes[80..100])).abs() < EPS);
    assert!((last.ma60 - mean(&closes[40..100])).abs() < EPS);
}

#[test]
fn every_feature_row_matches_trailing_means() {
    let dir = tempfile::tempdir().unwrap();
    let store = DuckDbStore::new(dir.path().join("prices.duckdb"));
    let series = synthetic_series(150, 11);
    let closes: Vec<f64> = series.iter().map(|b| b.close).collect();

    store.save_prices("QQQ", &series).unwrap();
    run_process(&store, &store, "QQQ").unwrap();

    let features = store.load_features("QQQ").unwrap();
    for (k, row) in features.iter().enumerate() {
        let i = k + 59;
        assert_eq!(row.bar, series[i]);
        assert!((row.ma20 - mean(&closes[i - 19..=i])).abs() < EPS, "MA20 at {i}");
        assert!((row.ma60 - mean(&closes[i - 59..=i])).abs() < EPS, "MA60 at {i}");
    }
}

#[test]
fn raw_roundtrip_preserves_rows() {
    let dir = tempfile::tempdir().unwrap();
    let store = DuckDbStore::new(dir.path().join("prices.duckdb"));
    let series = synthetic_series(100, 3);

    store.save_prices("BRK-B", &series).unwrap();
    let loaded = store.load_prices("BRK-B").unwrap();

    assert_eq!(loaded.len(), series.len());
    assert_eq!(loaded, series);
}

#[test]
fn empty_provider_response_aborts_before_any_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out/raw.duckdb");
    let store = DuckDbStore::new(&path);
    let provider = FixedProvider::new(synthetic_series(10, 1));

    let result = run_ingest(&provider, &store, "SPY", d(2030, 1, 1), d(2030, 6, 1));

    assert!(matches!(result, Err(DataError::NoData { .. })));
    assert_eq!(provider.calls.get(), 1);
    assert!(!path.exists(), "no store file may be created on a failed fetch");
}

#[test]
fn failed_ingest_leaves_existing_table_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let store = DuckDbStore::new(dir.path().join("raw.duckdb"));
    let series = synthetic_series(100, 5);
    store.save_prices("SPY", &series).unwrap();

    let provider = FixedProvider::new(series.clone());
    let result = run_ingest(&provider, &store, "SPY", d(2030, 1, 1), d(2030, 6, 1));
    assert!(result.is_err());

    assert_eq!(store.load_prices("SPY").unwrap(), series);
}

#[test]
fn ingest_replaces_table_instead_of_appending() {
    let dir = tempfile::tempdir().unwrap();
    let store = DuckDbStore::new(dir.path().join("raw.duckdb"));
    let provider = FixedProvider::new(synthetic_series(100, 9));

    run_ingest(&provider, &store, "SPY", d(2023, 1, 1), d(2024, 1, 1)).unwrap();
    let second = run_ingest(&provider, &store, "SPY", d(2023, 2, 1), d(2024, 1, 1)).unwrap();

    assert_eq!(store.load_prices("SPY").unwrap().len(), second.rows);
    assert_eq!(second.rows, 100 - 31);
}

#[test]
fn missing_raw_table_aborts_before_output_write() {
    let dir = tempfile::tempdir().unwrap();
    let raw = DuckDbStore::new(dir.path().join("raw.duckdb"));
    let out_path = dir.path().join("features.duckdb");
    let out = DuckDbStore::new(&out_path);
    raw.save_prices("SPY", &synthetic_series(100, 2)).unwrap();

    match run_process(&raw, &out, "QQQ") {
        Err(DataError::TableNotFound { table }) => assert_eq!(table, "qqq"),
        other => panic!("expected TableNotFound, got {other:?}"),
    }
    assert!(!out_path.exists());
}

#[test]
fn missing_input_store_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let raw = DuckDbStore::new(dir.path().join("absent.duckdb"));
    let out = DuckDbStore::new(dir.path().join("features.duckdb"));

    match run_process(&raw, &out, "SPY") {
        Err(DataError::StoreNotFound { path }) => assert_eq!(path, raw.path()),
        other => panic!("expected StoreNotFound, got {other:?}"),
    }
}

#[test]
fn empty_raw_table_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let raw = DuckDbStore::new(dir.path().join("raw.duckdb"));
    let out = DuckDbStore::new(dir.path().join("features.duckdb"));
    raw.save_prices("SPY", &[]).unwrap();

    assert!(matches!(
        run_process(&raw, &out, "SPY"),
        Err(DataError::EmptyTable { .. })
    ));
}

#[test]
fn short_series_writes_empty_feature_table() {
    let dir = tempfile::tempdir().unwrap();
    let store = DuckDbStore::new(dir.path().join("prices.duckdb"));
    store.save_prices("SPY", &synthetic_series(59, 4)).unwrap();

    let summary = run_process(&store, &store, "SPY").unwrap();
    assert_eq!(summary.output_rows, 0);
    assert_eq!(summary.first_date, None);

    assert!(store.tables().unwrap().contains(&feature_table_name("SPY")));
    assert!(matches!(
        store.load_features("SPY"),
        Err(DataError::EmptyTable { .. })
    ));
}

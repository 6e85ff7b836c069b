//! DuckDB-backed price and feature store.
//!
//! Layout: one database file, one table per symbol.
//! - raw table: `{symbol}` lower-cased, `-` replaced by `_`
//! - feature table: `{symbol}_features`
//!
//! Writes replace the whole table inside a single transaction, so a failed
//! save leaves whatever table was there before. Loads open the file
//! read-only and never create it.

use super::provider::DataError;
use crate::domain::{FeatureBar, PriceBar};
use chrono::NaiveDate;
use duckdb::{params, AccessMode, Config, Connection, Statement};
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix appended to the raw table name for the feature table.
pub const FEATURE_TABLE_SUFFIX: &str = "_features";

const PRICE_COLUMNS: &str = "date DATE NOT NULL, \
     open DOUBLE, high DOUBLE, low DOUBLE, close DOUBLE, adj_close DOUBLE, \
     volume UBIGINT";

const PRICE_SELECT: &str =
    "CAST(date AS VARCHAR), open, high, low, close, adj_close, volume";

/// Raw table name for a symbol.
pub fn table_name(symbol: &str) -> String {
    symbol.to_lowercase().replace('-', "_")
}

/// Feature table name for a symbol.
pub fn feature_table_name(symbol: &str) -> String {
    format!("{}{FEATURE_TABLE_SUFFIX}", table_name(symbol))
}

/// Quote an identifier so any symbol maps to a valid table name.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn store_err(context: &str) -> impl Fn(duckdb::Error) -> DataError + '_ {
    move |e| DataError::Store(format!("{context}: {e}"))
}

/// A DuckDB database file holding raw and feature tables.
#[derive(Debug, Clone)]
pub struct DuckDbStore {
    path: PathBuf,
}

impl DuckDbStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Replace the raw table for `symbol` with `bars`.
    pub fn save_prices(&self, symbol: &str, bars: &[PriceBar]) -> Result<(), DataError> {
        let table = table_name(symbol);
        self.replace_table(&table, PRICE_COLUMNS, 7, bars, |stmt, bar| {
            stmt.execute(params![
                bar.date.to_string(),
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.adj_close,
                bar.volume,
            ])
        })?;
        tracing::info!(
            table = %table,
            rows = bars.len(),
            path = %self.path.display(),
            "saved price table"
        );
        Ok(())
    }

    /// Replace the feature table for `symbol` with `rows`.
    pub fn save_features(&self, symbol: &str, rows: &[FeatureBar]) -> Result<(), DataError> {
        let table = feature_table_name(symbol);
        let columns = format!("{PRICE_COLUMNS}, \"MA20\" DOUBLE, \"MA60\" DOUBLE");
        self.replace_table(&table, &columns, 9, rows, |stmt, row| {
            let bar = &row.bar;
            stmt.execute(params![
                bar.date.to_string(),
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.adj_close,
                bar.volume,
                row.ma20,
                row.ma60,
            ])
        })?;
        tracing::info!(
            table = %table,
            rows = rows.len(),
            path = %self.path.display(),
            "saved feature table"
        );
        Ok(())
    }

    /// Load the raw table for `symbol`, ordered by date.
    pub fn load_prices(&self, symbol: &str) -> Result<Vec<PriceBar>, DataError> {
        let table = table_name(symbol);
        let conn = self.open_read_only()?;
        self.ensure_populated(&conn, &table)?;

        let sql = format!(
            "SELECT {PRICE_SELECT} FROM {} ORDER BY date",
            quote_ident(&table)
        );
        let mut stmt = conn.prepare(&sql).map_err(store_err("prepare select"))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    PriceBar {
                        date: NaiveDate::MIN,
                        open: row.get(1)?,
                        high: row.get(2)?,
                        low: row.get(3)?,
                        close: row.get(4)?,
                        adj_close: row.get(5)?,
                        volume: row.get(6)?,
                    },
                ))
            })
            .map_err(store_err("query prices"))?;

        let mut bars = Vec::new();
        for row in rows {
            let (date, mut bar) = row.map_err(store_err("read price row"))?;
            bar.date = parse_date(&date)?;
            bars.push(bar);
        }

        tracing::info!(
            table = %table,
            rows = bars.len(),
            path = %self.path.display(),
            "loaded price table"
        );
        Ok(bars)
    }

    /// Load the feature table for `symbol`, ordered by date.
    pub fn load_features(&self, symbol: &str) -> Result<Vec<FeatureBar>, DataError> {
        let table = feature_table_name(symbol);
        let conn = self.open_read_only()?;
        self.ensure_populated(&conn, &table)?;

        let sql = format!(
            "SELECT {PRICE_SELECT}, \"MA20\", \"MA60\" FROM {} ORDER BY date",
            quote_ident(&table)
        );
        let mut stmt = conn.prepare(&sql).map_err(store_err("prepare select"))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    FeatureBar {
                        bar: PriceBar {
                            date: NaiveDate::MIN,
                            open: row.get(1)?,
                            high: row.get(2)?,
                            low: row.get(3)?,
                            close: row.get(4)?,
                            adj_close: row.get(5)?,
                            volume: row.get(6)?,
                        },
                        ma20: row.get(7)?,
                        ma60: row.get(8)?,
                    },
                ))
            })
            .map_err(store_err("query features"))?;

        let mut out = Vec::new();
        for row in rows {
            let (date, mut feature) = row.map_err(store_err("read feature row"))?;
            feature.bar.date = parse_date(&date)?;
            out.push(feature);
        }
        Ok(out)
    }

    /// Names of all tables in the store, sorted.
    pub fn tables(&self) -> Result<Vec<String>, DataError> {
        let conn = self.open_read_only()?;
        let mut stmt = conn
            .prepare("SELECT table_name FROM information_schema.tables ORDER BY table_name")
            .map_err(store_err("prepare table listing"))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(store_err("list tables"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(store_err("read table name"))?;
        Ok(names)
    }

    // ── Connection helpers ──────────────────────────────────────────

    fn open_read_only(&self) -> Result<Connection, DataError> {
        if !self.exists() {
            return Err(DataError::StoreNotFound {
                path: self.path.clone(),
            });
        }
        let config = Config::default()
            .access_mode(AccessMode::ReadOnly)
            .map_err(store_err("read-only config"))?;
        Connection::open_with_flags(&self.path, config).map_err(store_err("open store"))
    }

    fn open_for_write(&self) -> Result<Connection, DataError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Connection::open(&self.path).map_err(store_err("open store"))
    }

    /// Fail with `TableNotFound` or `EmptyTable` unless `table` holds rows.
    fn ensure_populated(&self, conn: &Connection, table: &str) -> Result<(), DataError> {
        let present: i64 = conn
            .query_row(
                "SELECT count(*) FROM information_schema.tables WHERE table_name = ?",
                params![table],
                |row| row.get(0),
            )
            .map_err(store_err("check table"))?;
        if present == 0 {
            return Err(DataError::TableNotFound {
                table: table.to_string(),
            });
        }

        let rows: i64 = conn
            .query_row(
                &format!("SELECT count(*) FROM {}", quote_ident(table)),
                [],
                |row| row.get(0),
            )
            .map_err(store_err("count rows"))?;
        if rows == 0 {
            return Err(DataError::EmptyTable {
                table: table.to_string(),
            });
        }
        Ok(())
    }

    /// Drop-and-recreate `table` and insert every row, all in one transaction.
    fn replace_table<T>(
        &self,
        table: &str,
        columns: &str,
        arity: usize,
        rows: &[T],
        bind: impl Fn(&mut Statement<'_>, &T) -> duckdb::Result<usize>,
    ) -> Result<(), DataError> {
        let mut conn = self.open_for_write()?;
        let tx = conn.transaction().map_err(store_err("begin transaction"))?;
        let ident = quote_ident(table);

        tx.execute_batch(&format!("CREATE OR REPLACE TABLE {ident} ({columns})"))
            .map_err(store_err("create table"))?;
        tracing::debug!(table, "recreated table");

        {
            let placeholders = std::iter::once("CAST(? AS DATE)")
                .chain(std::iter::repeat("?").take(arity - 1))
                .collect::<Vec<_>>()
                .join(", ");
            let mut stmt = tx
                .prepare(&format!("INSERT INTO {ident} VALUES ({placeholders})"))
                .map_err(store_err("prepare insert"))?;
            for row in rows {
                bind(&mut stmt, row).map_err(store_err("insert row"))?;
            }
        }

        tx.commit().map_err(store_err("commit"))
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, DataError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DataError::Store(format!("bad date '{s}' in store: {e}")))
}

//! Price providers and the DuckDB store

pub mod csv_import;
pub mod provider;
pub mod store;
pub mod yahoo;

pub use csv_import::CsvProvider;
pub use provider::{DataError, DataProvider, DataSource, FetchResult};
pub use store::{feature_table_name, table_name, DuckDbStore};
pub use yahoo::YahooProvider;

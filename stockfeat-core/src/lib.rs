//! stockfeat core: price ingestion, DuckDB storage and moving-average features.
//!
//! This crate contains both pipeline stages:
//! - Domain types (price rows, feature rows)
//! - Data providers (Yahoo Finance, CSV import) behind one trait
//! - DuckDB store with one raw and one feature table per symbol
//! - Trailing SMA indicator and MA20/MA60 feature derivation
//! - Stage orchestration (`pipeline::run_ingest`, `pipeline::run_process`)

pub mod config;
pub mod data;
pub mod domain;
pub mod features;
pub mod indicators;
pub mod pipeline;

pub use config::Config;
pub use data::{DataError, DuckDbStore};
pub use pipeline::{run_ingest, run_process, IngestSummary, ProcessSummary};

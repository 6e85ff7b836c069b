//! Price and feature rows: the fixed-schema records that flow through both stages.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily observation from the market-data provider.
///
/// Missing provider prices are kept as `f64::NAN` rather than being dropped,
/// so the raw table mirrors what the provider returned.
///
/// `volume` has no undefined state: a missing volume is stored as 0 and
/// cannot be told apart from a session with no trades. It is therefore never
/// a reason to drop a row from the feature table; only the price columns and
/// the moving averages are checked by [`PriceBar::has_undefined`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: u64,
}

impl PriceBar {
    /// Returns true if any price field is NaN.
    pub fn has_undefined(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.adj_close.is_nan()
    }
}

/// A price row extended with its trailing moving averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureBar {
    #[serde(flatten)]
    pub bar: PriceBar,
    #[serde(rename = "MA20")]
    pub ma20: f64,
    #[serde(rename = "MA60")]
    pub ma60: f64,
}

impl FeatureBar {
    pub fn date(&self) -> NaiveDate {
        self.bar.date
    }

    /// Returns true if any column of the row, original or derived, is NaN.
    pub fn has_undefined(&self) -> bool {
        self.bar.has_undefined() || self.ma20.is_nan() || self.ma60.is_nan()
    }
}

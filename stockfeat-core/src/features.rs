//! Moving-average feature derivation.
//!
//! Extends every price row with trailing MA20 and MA60 over `close`, then
//! drops every row with an undefined column. MA60 has the larger window, so
//! it governs the drop: the first `MA_LONG_WINDOW - 1` rows always go, even
//! where MA20 is already defined.

use crate::domain::{FeatureBar, PriceBar};
use crate::indicators::{Indicator, Sma};

/// Window of the short moving average (`MA20`).
pub const MA_SHORT_WINDOW: usize = 20;

/// Window of the long moving average (`MA60`).
pub const MA_LONG_WINDOW: usize = 60;

/// Index of the first source row that can survive the drop.
pub const fn first_complete_index() -> usize {
    MA_LONG_WINDOW - 1
}

/// Derive the feature series for an ordered price series.
///
/// Pure: no I/O. Rows are kept in source order.
pub fn derive_features(bars: &[PriceBar]) -> Vec<FeatureBar> {
    let ma_short = Sma::new(MA_SHORT_WINDOW).compute(bars);
    let ma_long = Sma::new(MA_LONG_WINDOW).compute(bars);

    let features: Vec<FeatureBar> = bars
        .iter()
        .zip(ma_short)
        .zip(ma_long)
        .map(|((bar, ma20), ma60)| FeatureBar {
            bar: bar.clone(),
            ma20,
            ma60,
        })
        .filter(|row| !row.has_undefined())
        .collect();

    tracing::debug!(
        input_rows = bars.len(),
        output_rows = features.len(),
        dropped = bars.len() - features.len(),
        "derived moving-average features"
    );

    features
}

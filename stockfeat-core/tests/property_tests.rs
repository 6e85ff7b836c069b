//! Property tests for feature derivation.
//!
//! Uses proptest to verify:
//! 1. Length: L >= 60 rows give L - 59 features, shorter series give none
//! 2. Means: every MA20/MA60 equals the trailing mean of closes
//! 3. Order: output rows keep source order and contents

use chrono::NaiveDate;
use proptest::prelude::*;
use stockfeat_core::domain::PriceBar;
use stockfeat_core::features::{
    derive_features, first_complete_index, MA_LONG_WINDOW, MA_SHORT_WINDOW,
};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_close() -> impl Strategy<Value = f64> {
    (1.0..1000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_closes(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_close(), 0..max_len)
}

fn bars_from(closes: &[f64]) -> Vec<PriceBar> {
    let base = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            date: base + chrono::Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            adj_close: close,
            volume: 100,
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

proptest! {
    #[test]
    fn output_length_is_input_minus_59(closes in arb_closes(200)) {
        let features = derive_features(&bars_from(&closes));
        let expected = closes.len().saturating_sub(first_complete_index());
        prop_assert_eq!(features.len(), expected);
        if closes.len() < MA_LONG_WINDOW {
            prop_assert!(features.is_empty());
        }
    }

    #[test]
    fn averages_match_trailing_means(closes in arb_closes(160)) {
        let features = derive_features(&bars_from(&closes));
        for (k, row) in features.iter().enumerate() {
            let i = k + first_complete_index();
            let ma20 = mean(&closes[i + 1 - MA_SHORT_WINDOW..=i]);
            let ma60 = mean(&closes[i + 1 - MA_LONG_WINDOW..=i]);
            // Rolling sums drift slightly from a fresh mean
            prop_assert!((row.ma20 - ma20).abs() < 1e-8, "MA20 at {}: {} vs {}", i, row.ma20, ma20);
            prop_assert!((row.ma60 - ma60).abs() < 1e-8, "MA60 at {}: {} vs {}", i, row.ma60, ma60);
        }
    }

    #[test]
    fn rows_keep_source_order_and_fields(closes in arb_closes(120)) {
        let bars = bars_from(&closes);
        let features = derive_features(&bars);
        for (k, row) in features.iter().enumerate() {
            prop_assert_eq!(&row.bar, &bars[k + first_complete_index()]);
        }
        for pair in features.windows(2) {
            prop_assert!(pair[0].date() < pair[1].date());
        }
    }
}

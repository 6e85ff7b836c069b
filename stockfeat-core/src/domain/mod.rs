//! Domain types for stockfeat

pub mod bar;

pub use bar::{FeatureBar, PriceBar};

/// Symbol type alias
pub type Symbol = String;

//! Coupon fixtures for prompt testing.
//!
//! `generator` builds randomized but internally consistent V75/V64/V65
//! coupons; `analyzer` checks any coupon JSON for mathematical and
//! logical consistency.

pub mod analyzer;
pub mod generator;
pub mod model;

pub use analyzer::{analyze, render_report, AnalysisReport, OverallStatus};
pub use generator::{generate, FixtureRequest};
pub use model::{Coupon, Product};

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("{product} has {races} races, cannot have {requested} correct")]
    TooManyCorrect {
        product: Product,
        requested: u32,
        races: u32,
    },

    #[error("Target payout needs at least {lowest} correct races on {product}, got {correct}")]
    UnreachablePayout {
        product: Product,
        correct: u32,
        lowest: u32,
    },

    #[error("Target payout must be positive")]
    ZeroPayout,

    #[error("Target payout {requested} exceeds the maximum of {max}")]
    PayoutTooLarge { requested: u64, max: u64 },
}

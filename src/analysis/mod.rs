//! Analysis of recorded runs.
//!
//! `aggregator` folds runs into series and runs report metrics over them,
//! `judgement` compares two analysed records, `stats` holds the numerics.

pub mod aggregator;
pub mod judgement;
pub mod stats;

pub use aggregator::{analyse, combine};
pub use judgement::{compare_records, CompareMethod, CompareOptions};

//! Log Spike Analysis Core Library
//!
//! Server-side streaming analysis engine that compares a baseline and a
//! deviation window of a log dataset, finds statistically significant
//! field/value pairs, groups correlated terms into combined explanations,
//! computes per-term and per-group time histograms, and streams results
//! incrementally as typed actions over newline-delimited JSON.
//!
//! The binary entry point is in `main.rs`.

pub mod actions;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod executor;
pub mod exit_codes;
pub mod grouping;
pub mod histogram;
pub mod logging;
pub mod request;
pub mod scheduler;
pub mod scorer;
pub mod session;
pub mod stream;

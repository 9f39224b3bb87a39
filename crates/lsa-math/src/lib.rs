//! Log Spike Analysis math utilities.

pub mod significance;

pub use significance::*;

//! Tunable analysis constants.
//!
//! The significance and overlap thresholds are calibrated empirically
//! against representative datasets; they are configuration, not wired-in
//! magic numbers.

use serde::{Deserialize, Serialize};

use lsa_common::{Error, Result};

/// Knobs for one analysis run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisConfig {
    /// Terms are retained when the p-value bound of their G-statistic is
    /// below this threshold.
    pub significance_pvalue: f64,

    /// Two terms join the same group when their document overlap ratio
    /// (intersection over the smaller term's doc count) exceeds this.
    pub group_overlap_ratio: f64,

    /// Minimum deviation-window doc count for a term to be considered.
    /// Filters one-off values that would otherwise score high on tiny
    /// evidence.
    pub min_doc_count: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            significance_pvalue: 0.02,
            group_overlap_ratio: 0.75,
            min_doc_count: 2,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.significance_pvalue) || self.significance_pvalue == 0.0 {
            return Err(Error::InvalidRequest(format!(
                "significancePvalue must be in (0, 1], got {}",
                self.significance_pvalue
            )));
        }
        if !(0.0..=1.0).contains(&self.group_overlap_ratio) {
            return Err(Error::InvalidRequest(format!(
                "groupOverlapRatio must be in [0, 1], got {}",
                self.group_overlap_ratio
            )));
        }
        Ok(())
    }
}

//! Analysis request and resume overrides.
//!
//! Mirrors the wire shape consumed by the streaming endpoint: camelCase
//! field names, compression and flush toggles defaulting to on, and an
//! `overrides` block carrying previously computed state for resumption.

use serde::{Deserialize, Serialize};

use lsa_common::types::{AnalysisWindow, SignificantTerm};
use lsa_common::{Error, Result};

fn default_true() -> bool {
    true
}

/// Previously computed state supplied by a resuming caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Overrides {
    /// `loaded` fraction reached by the prior run.
    pub loaded: f64,
    /// Field candidates the prior run had not yet evaluated.
    pub remaining_field_candidates: Vec<String>,
    /// Terms already computed by the prior run.
    pub significant_terms: Vec<SignificantTerm>,
    /// Skip scoring entirely; run only grouping and group histograms
    /// against `significant_terms`.
    pub regroup_only: bool,
}

impl Overrides {
    /// Whether these overrides carry anything a run could continue from.
    pub fn is_resumable(&self) -> bool {
        self.regroup_only
            || !self.remaining_field_candidates.is_empty()
            || !self.significant_terms.is_empty()
            || self.loaded > 0.0
    }
}

/// One streaming analysis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[serde(flatten)]
    pub window: AnalysisWindow,

    /// Allow-list of fields to evaluate; empty means discover from the
    /// executor.
    #[serde(default)]
    pub field_candidates: Vec<String>,

    /// Fields excluded from evaluation.
    #[serde(default)]
    pub deny_field_candidates: Vec<String>,

    #[serde(default)]
    pub overrides: Option<Overrides>,

    /// Gzip the response stream. Default true.
    #[serde(default = "default_true")]
    pub compress_response: bool,

    /// Flush each action to the connection as soon as it is produced.
    /// Default true; false restores the older coalescing behavior.
    #[serde(default = "default_true")]
    pub flush_fix: bool,
}

impl AnalysisRequest {
    /// Validate everything checkable before any stage runs. A request
    /// rejected here never opens a stream.
    pub fn validate(&self) -> Result<()> {
        self.window.validate()?;

        if let Some(overrides) = &self.overrides {
            if !(0.0..=1.0).contains(&overrides.loaded) {
                return Err(Error::InvalidRequest(format!(
                    "overrides.loaded must be in [0, 1], got {}",
                    overrides.loaded
                )));
            }
            if overrides.regroup_only && overrides.significant_terms.is_empty() {
                return Err(Error::InvalidRequest(
                    "regroupOnly requires overrides.significantTerms".into(),
                ));
            }
        }
        Ok(())
    }

    /// Whether this run skips scoring and only regroups supplied terms.
    pub fn regroup_only(&self) -> bool {
        self.overrides.as_ref().is_some_and(|o| o.regroup_only)
    }
}

//! Core data model for log spike analysis.
//!
//! Wire-facing types use camelCase field names so the newline-delimited
//! JSON stream matches what existing consumers of the analysis API parse.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Fixed number of buckets in every time histogram.
pub const HISTOGRAM_BUCKET_COUNT: usize = 20;

/// Half-open time range `[start_ms, end_ms)` in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeWindow {
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }

    pub fn contains(&self, ts_ms: i64) -> bool {
        ts_ms >= self.start_ms && ts_ms < self.end_ms
    }

    /// Validate that the window is non-empty.
    pub fn validate(&self, label: &str) -> Result<()> {
        if self.end_ms <= self.start_ms {
            return Err(Error::InvalidRequest(format!(
                "{label} window is empty: start={} end={}",
                self.start_ms, self.end_ms
            )));
        }
        Ok(())
    }
}

/// Baseline and deviation windows for one analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisWindow {
    pub baseline: TimeWindow,
    pub deviation: TimeWindow,
}

impl AnalysisWindow {
    /// Full analysis range covered by histograms: from the earliest start
    /// to the latest end of the two windows.
    pub fn full_range(&self) -> TimeWindow {
        TimeWindow {
            start_ms: self.baseline.start_ms.min(self.deviation.start_ms),
            end_ms: self.baseline.end_ms.max(self.deviation.end_ms),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.baseline.validate("baseline")?;
        self.deviation.validate("deviation")?;
        Ok(())
    }
}

/// A field/value pair statistically over- or under-represented in the
/// deviation window. Immutable once computed; identified by (field, value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignificantTerm {
    pub field_name: String,
    pub field_value: String,
    /// Document count in the deviation window.
    pub doc_count: u64,
    /// Document count in the baseline window.
    pub bg_count: u64,
    /// Significance score (log-likelihood ratio statistic).
    pub score: f64,
    /// Upper bound on the p-value of the score.
    pub p_value: f64,
}

impl SignificantTerm {
    /// Unique `field:value` key identifying this term within a session.
    pub fn key(&self) -> String {
        format!("{}:{}", self.field_name, self.field_value)
    }
}

/// One member of a term group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub field_name: String,
    pub field_value: String,
}

impl GroupMember {
    pub fn key(&self) -> String {
        format!("{}:{}", self.field_name, self.field_value)
    }
}

impl From<&SignificantTerm> for GroupMember {
    fn from(term: &SignificantTerm) -> Self {
        GroupMember {
            field_name: term.field_name.clone(),
            field_value: term.field_value.clone(),
        }
    }
}

/// A cluster of significant terms that co-occur on largely the same
/// documents, treated as one combined explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermGroup {
    /// Deterministic identifier derived from the sorted member keys.
    pub id: String,
    /// Members, sorted by key for stable output.
    pub group: Vec<GroupMember>,
    /// Documents matching all members in the deviation window.
    pub doc_count: u64,
}

impl TermGroup {
    /// Whether this group's members are a strict subset of `other`'s.
    pub fn is_strict_subset_of(&self, other: &TermGroup) -> bool {
        self.group.len() < other.group.len()
            && self.group.iter().all(|m| other.group.contains(m))
    }
}

/// One bucket of a time histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramBucket {
    /// Bucket start timestamp in epoch milliseconds.
    pub ts_ms: i64,
    pub doc_count: u64,
}

/// Time histogram for a single significant term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermHistogram {
    pub field_name: String,
    pub field_value: String,
    pub histogram: Vec<HistogramBucket>,
}

/// Time histogram for a term group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupHistogram {
    pub id: String,
    pub histogram: Vec<HistogramBucket>,
}

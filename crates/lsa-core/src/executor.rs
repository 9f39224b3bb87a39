//! Query executor adapter.
//!
//! The engine never talks to a search backend directly. Every
//! aggregation round trip goes through [`QueryExecutor`], which returns
//! term frequencies, document-intersection counts, and time histograms
//! for given field/window inputs. Implementations are stateless from the
//! engine's perspective and may be shared across sessions.

use std::collections::BTreeMap;
use thiserror::Error;

use lsa_common::types::TimeWindow;
use lsa_common::Error as CoreError;

/// Failure modes of a single executor call.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Backend did not answer in time; retry policy belongs to the
    /// executor implementation, not the engine.
    #[error("query timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// Malformed query or backend-side failure.
    #[error("query failed: {0}")]
    Failed(String),
}

impl QueryError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueryError::Timeout { .. })
    }
}

impl From<QueryError> for CoreError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Timeout { millis } => CoreError::QueryTimeout { millis },
            QueryError::Failed(msg) => CoreError::QueryExecution(msg),
        }
    }
}

/// One `field == value` constraint on a document query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldConstraint {
    pub field_name: String,
    pub field_value: String,
}

impl FieldConstraint {
    pub fn new(field_name: impl Into<String>, field_value: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            field_value: field_value.into(),
        }
    }
}

/// Value distribution of one field within a time window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyDistribution {
    /// value -> document count. BTreeMap keeps value iteration ordered,
    /// which keeps downstream scoring deterministic.
    pub counts: BTreeMap<String, u64>,
    /// Total documents in the window (including docs without the field).
    pub total: u64,
}

/// Narrow contract over the aggregation backend.
///
/// Calls may block; the engine treats each call as a suspension point
/// and checks cancellation around it.
pub trait QueryExecutor: Send + Sync {
    /// Enumerate candidate fields present in the dataset, ordered.
    fn field_candidates(&self) -> Result<Vec<String>, QueryError>;

    /// Value distribution of `field` within `window`.
    fn frequencies(
        &self,
        field: &str,
        window: TimeWindow,
    ) -> Result<FrequencyDistribution, QueryError>;

    /// Number of documents in `window` matching all `constraints`.
    fn overlap_count(
        &self,
        constraints: &[FieldConstraint],
        window: TimeWindow,
    ) -> Result<u64, QueryError>;

    /// Document counts in `bucket_count` equal-width time buckets
    /// spanning `window`, for documents matching all `constraints`.
    /// The returned vector has exactly `bucket_count` entries; empty
    /// buckets are zero, never omitted.
    fn histogram(
        &self,
        constraints: &[FieldConstraint],
        window: TimeWindow,
        bucket_count: usize,
    ) -> Result<Vec<u64>, QueryError>;
}

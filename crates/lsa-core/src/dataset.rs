//! In-memory dataset and query executor.
//!
//! Backs the `lsa analyze` CLI path and the test suites. Documents are
//! flat `field -> value` records with a timestamp; aggregations are
//! computed by scanning, which is plenty for datasets that fit in memory
//! and keeps the executor contract honest (zero buckets included, totals
//! counted over the whole window, deterministic field ordering).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

use lsa_common::types::TimeWindow;
use lsa_common::Result as CoreResult;

use crate::executor::{FieldConstraint, FrequencyDistribution, QueryError, QueryExecutor};

/// One log event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Event timestamp in epoch milliseconds.
    pub ts_ms: i64,
    /// Keyword fields of the event.
    pub fields: BTreeMap<String, String>,
}

/// A loaded dataset of log events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub docs: Vec<Document>,
}

impl Dataset {
    pub fn new(docs: Vec<Document>) -> Self {
        Self { docs }
    }

    /// Load a dataset from a JSON reader (`{"docs": [...]}`).
    pub fn from_reader(reader: impl Read) -> CoreResult<Self> {
        let dataset: Dataset = serde_json::from_reader(reader)?;
        Ok(dataset)
    }

    /// Load a dataset from a JSON file.
    pub fn from_path(path: &Path) -> CoreResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }
}

/// Scanning query executor over an in-memory [`Dataset`].
pub struct InMemoryExecutor {
    dataset: Dataset,
}

impl InMemoryExecutor {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }

    fn matches(doc: &Document, constraints: &[FieldConstraint]) -> bool {
        constraints
            .iter()
            .all(|c| doc.fields.get(&c.field_name) == Some(&c.field_value))
    }
}

impl QueryExecutor for InMemoryExecutor {
    fn field_candidates(&self) -> Result<Vec<String>, QueryError> {
        let mut fields = BTreeSet::new();
        for doc in &self.dataset.docs {
            for name in doc.fields.keys() {
                fields.insert(name.clone());
            }
        }
        Ok(fields.into_iter().collect())
    }

    fn frequencies(
        &self,
        field: &str,
        window: TimeWindow,
    ) -> Result<FrequencyDistribution, QueryError> {
        let mut dist = FrequencyDistribution::default();
        for doc in &self.dataset.docs {
            if !window.contains(doc.ts_ms) {
                continue;
            }
            dist.total += 1;
            if let Some(value) = doc.fields.get(field) {
                *dist.counts.entry(value.clone()).or_insert(0) += 1;
            }
        }
        Ok(dist)
    }

    fn overlap_count(
        &self,
        constraints: &[FieldConstraint],
        window: TimeWindow,
    ) -> Result<u64, QueryError> {
        if constraints.is_empty() {
            return Err(QueryError::Failed(
                "overlap query requires at least one constraint".into(),
            ));
        }
        let count = self
            .dataset
            .docs
            .iter()
            .filter(|doc| window.contains(doc.ts_ms) && Self::matches(doc, constraints))
            .count();
        Ok(count as u64)
    }

    fn histogram(
        &self,
        constraints: &[FieldConstraint],
        window: TimeWindow,
        bucket_count: usize,
    ) -> Result<Vec<u64>, QueryError> {
        if bucket_count == 0 {
            return Err(QueryError::Failed("histogram requires buckets".into()));
        }
        let duration = window.duration_ms();
        if duration <= 0 {
            return Err(QueryError::Failed("histogram window is empty".into()));
        }

        let mut buckets = vec![0u64; bucket_count];
        for doc in &self.dataset.docs {
            if !window.contains(doc.ts_ms) || !Self::matches(doc, constraints) {
                continue;
            }
            let offset = (doc.ts_ms - window.start_ms) as i128;
            let idx = (offset * bucket_count as i128 / duration as i128) as usize;
            buckets[idx.min(bucket_count - 1)] += 1;
        }
        Ok(buckets)
    }
}

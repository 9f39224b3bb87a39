//! Histogram builder.
//!
//! Computes fixed-resolution time histograms (20 equal-width buckets
//! over the full analysis range) for significant terms and term groups.
//! Zero-count buckets are explicit so consumers can plot without gap
//! filling.

use lsa_common::types::{
    GroupHistogram, HistogramBucket, SignificantTerm, TermGroup, TermHistogram, TimeWindow,
    HISTOGRAM_BUCKET_COUNT,
};

use crate::executor::{FieldConstraint, QueryError, QueryExecutor};

/// Bucket start timestamps for `window` at the fixed resolution.
pub fn bucket_timestamps(window: TimeWindow) -> Vec<i64> {
    let duration = window.duration_ms();
    (0..HISTOGRAM_BUCKET_COUNT)
        .map(|i| window.start_ms + duration * i as i64 / HISTOGRAM_BUCKET_COUNT as i64)
        .collect()
}

fn to_buckets(window: TimeWindow, counts: Vec<u64>) -> Vec<HistogramBucket> {
    bucket_timestamps(window)
        .into_iter()
        .zip(counts)
        .map(|(ts_ms, doc_count)| HistogramBucket { ts_ms, doc_count })
        .collect()
}

/// Build the histogram for one significant term.
pub fn term_histogram(
    executor: &dyn QueryExecutor,
    term: &SignificantTerm,
    window: TimeWindow,
) -> Result<TermHistogram, QueryError> {
    let constraints = [FieldConstraint::new(
        term.field_name.clone(),
        term.field_value.clone(),
    )];
    let counts = executor.histogram(&constraints, window, HISTOGRAM_BUCKET_COUNT)?;
    Ok(TermHistogram {
        field_name: term.field_name.clone(),
        field_value: term.field_value.clone(),
        histogram: to_buckets(window, counts),
    })
}

/// Build the histogram for one term group (documents matching all
/// members).
pub fn group_histogram(
    executor: &dyn QueryExecutor,
    group: &TermGroup,
    window: TimeWindow,
) -> Result<GroupHistogram, QueryError> {
    let constraints: Vec<FieldConstraint> = group
        .group
        .iter()
        .map(|m| FieldConstraint::new(m.field_name.clone(), m.field_value.clone()))
        .collect();
    let counts = executor.histogram(&constraints, window, HISTOGRAM_BUCKET_COUNT)?;
    Ok(GroupHistogram {
        id: group.id.clone(),
        histogram: to_buckets(window, counts),
    })
}

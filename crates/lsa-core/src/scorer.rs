//! Significance scorer.
//!
//! Compares one field's value distribution between the baseline and the
//! deviation window and retains the values whose event rate changed
//! significantly. Rates are normalized by window duration, so a value
//! whose absolute rate is unchanged stays insignificant even when
//! another value's burst inflates the deviation window's document total.
//! A genuinely new, frequent value is the highest-scoring kind of term.

use tracing::debug;

use lsa_common::types::{AnalysisWindow, SignificantTerm};
use lsa_math::{chi_squared_pvalue_1dof, expected_deviation_count, g_statistic};

use crate::config::AnalysisConfig;
use crate::executor::FrequencyDistribution;

/// Score one field's distributions and return its significant terms,
/// sorted by score descending (ties: doc count descending, then value
/// ascending).
///
/// Malformed or empty input yields zero terms, never an error.
pub fn score_field(
    field_name: &str,
    baseline: &FrequencyDistribution,
    deviation: &FrequencyDistribution,
    windows: &AnalysisWindow,
    config: &AnalysisConfig,
) -> Vec<SignificantTerm> {
    if baseline.total == 0 || deviation.total == 0 {
        return Vec::new();
    }
    let base_ms = windows.baseline.duration_ms();
    let dev_ms = windows.deviation.duration_ms();

    let mut terms = Vec::new();

    // Union of values over both windows so rate dips are scored too.
    let values: std::collections::BTreeSet<&String> = baseline
        .counts
        .keys()
        .chain(deviation.counts.keys())
        .collect();
    for value in values {
        let doc_count = deviation.counts.get(value).copied().unwrap_or(0);
        let bg_count = baseline.counts.get(value).copied().unwrap_or(0);

        if doc_count < config.min_doc_count && bg_count < config.min_doc_count {
            continue;
        }

        let score = g_statistic(doc_count, dev_ms, bg_count, base_ms);
        if !score.is_finite() {
            debug!(field = field_name, value = %value, "skipping non-finite score");
            continue;
        }
        let p_value = chi_squared_pvalue_1dof(score);
        if !(p_value < config.significance_pvalue) {
            continue;
        }

        let expected = expected_deviation_count(bg_count, base_ms, dev_ms);
        debug!(
            field = field_name,
            value = %value,
            observed = doc_count,
            expected,
            score,
            "term retained"
        );
        terms.push(SignificantTerm {
            field_name: field_name.to_string(),
            field_value: value.clone(),
            doc_count,
            bg_count,
            score,
            p_value,
        });
    }

    terms.sort_by(|x, y| {
        y.score
            .partial_cmp(&x.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(y.doc_count.cmp(&x.doc_count))
            .then(x.field_value.cmp(&y.field_value))
    });
    terms
}

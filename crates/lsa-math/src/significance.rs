//! Significance statistics for baseline vs deviation term frequencies.
//!
//! The core statistic is the log-likelihood ratio (G-statistic) comparing
//! a term's event rate between two time windows. Each window's count is
//! treated as Poisson with exposure equal to the window duration; under
//! the null hypothesis the rate is unchanged, so the expected deviation
//! count is the baseline count scaled by the duration ratio. Normalizing
//! by duration instead of by window document totals keeps one value's
//! burst from dragging every other value into apparent significance.
//!
//! G is asymptotically chi-squared with one degree of freedom, which
//! gives a p-value bound via the complementary error function.
//!
//! All functions are NaN-safe: inconsistent input (non-positive window
//! durations) yields NaN rather than panicking, and callers filter
//! non-finite scores.

/// Expected term count in the deviation window under the unchanged-rate
/// null hypothesis: the baseline count scaled by the duration ratio.
///
/// Returns 0.0 when the baseline duration is not positive.
pub fn expected_deviation_count(
    bg_count: u64,
    base_duration_ms: i64,
    dev_duration_ms: i64,
) -> f64 {
    if base_duration_ms <= 0 {
        return 0.0;
    }
    bg_count as f64 * dev_duration_ms as f64 / base_duration_ms as f64
}

/// Log-likelihood ratio (G-statistic) for two Poisson counts with
/// exposures `dev_duration_ms` and `base_duration_ms`.
///
/// Under the null hypothesis both windows share one event rate, the
/// pooled count over the pooled duration. A count of zero contributes
/// nothing to the statistic, so a term present in only one window stays
/// finite and scores in proportion to how many events appeared (or
/// vanished).
///
/// Returns NaN when either duration is not positive and 0.0 when the
/// term is absent from both windows (no evidence either way).
pub fn g_statistic(
    term_dev: u64,
    dev_duration_ms: i64,
    term_base: u64,
    base_duration_ms: i64,
) -> f64 {
    if dev_duration_ms <= 0 || base_duration_ms <= 0 {
        return f64::NAN;
    }
    let a = term_dev as f64;
    let c = term_base as f64;
    if a == 0.0 && c == 0.0 {
        return 0.0;
    }

    let t_dev = dev_duration_ms as f64;
    let t_base = base_duration_ms as f64;
    let pooled_rate = (a + c) / (t_dev + t_base);
    let e_a = pooled_rate * t_dev;
    let e_c = pooled_rate * t_base;

    let g = 2.0 * (cell_term(a, e_a) + cell_term(c, e_c));

    // Floating point rounding can push a true-zero statistic slightly negative.
    g.max(0.0)
}

fn cell_term(observed: f64, expected: f64) -> f64 {
    if observed <= 0.0 || expected <= 0.0 {
        return 0.0;
    }
    observed * (observed / expected).ln()
}

/// Upper bound on the p-value of a chi-squared statistic with one degree
/// of freedom: `p = erfc(sqrt(x / 2))`.
///
/// Returns NaN for NaN or negative input, 1.0 for x = 0.
pub fn chi_squared_pvalue_1dof(x: f64) -> f64 {
    if x.is_nan() || x < 0.0 {
        return f64::NAN;
    }
    if x == f64::INFINITY {
        return 0.0;
    }
    erfc((x / 2.0).sqrt())
}

/// Complementary error function.
///
/// Abramowitz & Stegun 7.1.26 rational approximation; absolute error
/// below 1.5e-7, which is ample for significance thresholding.
pub fn erfc(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x < 0.0 {
        return 2.0 - erfc(-x);
    }

    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let t = 1.0 / (1.0 + P * x);
    let poly = t * (A1 + t * (A2 + t * (A3 + t * (A4 + t * A5))));
    (poly * (-x * x).exp()).clamp(0.0, 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn expected_count_scales_with_duration_ratio() {
        // 100 events over a 1000ms baseline, 500ms deviation -> expect 50.
        let e = expected_deviation_count(100, 1000, 500);
        assert!(approx_eq(e, 50.0, 1e-12));
    }

    #[test]
    fn expected_count_empty_baseline() {
        assert_eq!(expected_deviation_count(100, 0, 500), 0.0);
    }

    #[test]
    fn g_statistic_zero_for_unchanged_rate() {
        // Identical counts over identical durations carry no evidence.
        let g = g_statistic(100, 1000, 100, 1000);
        assert!(approx_eq(g, 0.0, 1e-9));
    }

    #[test]
    fn g_statistic_zero_for_unchanged_rate_unequal_durations() {
        // Twice the events over twice the time is the same rate.
        let g = g_statistic(100, 1000, 200, 2000);
        assert!(approx_eq(g, 0.0, 1e-9));
    }

    #[test]
    fn g_statistic_large_for_new_term() {
        // Term absent from baseline, frequent in deviation.
        let g = g_statistic(500, 1000, 0, 1000);
        assert!(g.is_finite());
        assert!(g > 100.0);
    }

    #[test]
    fn g_statistic_grows_with_excess() {
        let g_small = g_statistic(120, 1000, 100, 1000);
        let g_large = g_statistic(400, 1000, 100, 1000);
        assert!(g_large > g_small);
    }

    #[test]
    fn g_statistic_detects_dips() {
        // Term that vanishes in the deviation window is also significant.
        let g = g_statistic(0, 1000, 300, 1000);
        assert!(g.is_finite());
        assert!(g > 100.0);
    }

    #[test]
    fn g_statistic_inconsistent_input_is_nan() {
        assert!(g_statistic(10, 0, 5, 1000).is_nan());
        assert!(g_statistic(10, 1000, 5, 0).is_nan());
        assert!(g_statistic(10, -100, 5, 1000).is_nan());
    }

    #[test]
    fn g_statistic_absent_everywhere_is_neutral() {
        assert_eq!(g_statistic(0, 1000, 0, 1000), 0.0);
    }

    #[test]
    fn pvalue_bounds() {
        assert!(approx_eq(chi_squared_pvalue_1dof(0.0), 1.0, 1e-6));
        assert!(chi_squared_pvalue_1dof(f64::INFINITY) == 0.0);
        assert!(chi_squared_pvalue_1dof(-1.0).is_nan());
        assert!(chi_squared_pvalue_1dof(f64::NAN).is_nan());
    }

    #[test]
    fn pvalue_known_values() {
        // chi2(1) critical value 3.841 corresponds to p = 0.05.
        let p = chi_squared_pvalue_1dof(3.841);
        assert!(approx_eq(p, 0.05, 1e-3));
        // 6.635 corresponds to p = 0.01.
        let p = chi_squared_pvalue_1dof(6.635);
        assert!(approx_eq(p, 0.01, 1e-3));
    }

    #[test]
    fn erfc_reference_points() {
        assert!(approx_eq(erfc(0.0), 1.0, 1e-7));
        assert!(approx_eq(erfc(1.0), 0.157_299_2, 1e-6));
        assert!(approx_eq(erfc(-1.0), 2.0 - 0.157_299_2, 1e-6));
        assert!(erfc(10.0) < 1e-20);
    }
}

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn g_statistic_non_negative(
            a in 0u64..5000,
            t_dev in 1i64..10_000_000,
            c in 0u64..5000,
            t_base in 1i64..10_000_000,
        ) {
            let g = g_statistic(a, t_dev, c, t_base);
            prop_assert!(g.is_finite());
            prop_assert!(g >= 0.0);
        }

        #[test]
        fn pvalue_in_unit_interval(x in 0.0f64..1e6) {
            let p = chi_squared_pvalue_1dof(x);
            prop_assert!((0.0..=1.0).contains(&p));
        }

        #[test]
        fn pvalue_monotone_decreasing(x in 0.0f64..100.0, dx in 0.01f64..100.0) {
            let p1 = chi_squared_pvalue_1dof(x);
            let p2 = chi_squared_pvalue_1dof(x + dx);
            prop_assert!(p2 <= p1 + 1e-12);
        }

        #[test]
        fn g_statistic_symmetric_in_windows(
            a in 0u64..2000,
            t_dev in 1i64..1_000_000,
            c in 0u64..2000,
            t_base in 1i64..1_000_000,
        ) {
            // Swapping the two windows must not change the evidence.
            let g1 = g_statistic(a, t_dev, c, t_base);
            let g2 = g_statistic(c, t_base, a, t_dev);
            prop_assert!((g1 - g2).abs() < 1e-9 * (1.0 + g1.abs()));
        }

        #[test]
        fn g_statistic_zero_when_rates_match(count in 1u64..2000, t in 1i64..100_000, k in 1i64..8) {
            // Scaling count and duration together preserves the rate.
            let g = g_statistic(count * k as u64, t * k, count, t);
            prop_assert!(g.abs() < 1e-6);
        }
    }
}

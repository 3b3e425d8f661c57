use faers_signal::signals::{bayes, chi2, ror, stats};

fn close(actual: f64, expected: f64, tol: f64) -> bool {
    (actual - expected).abs() <= tol * expected.abs().max(1.0)
}

#[test]
fn ror_matches_reference() {
    let value = ror::ror_value(20.0, 80.0, 130.0, 770.0);
    assert!(close(value, 1.480_769, 1e-6));

    let (lower, upper) = ror::ci_value(20.0, 80.0, 130.0, 770.0, ror::Z_95);
    assert!(close(lower, 0.876_780, 1e-5), "lower = {lower}");
    assert!(close(upper, 2.500_830, 1e-5), "upper = {upper}");
    assert!(lower < 1.0 && upper > 1.0, "weak association brackets 1");
}

#[test]
fn strong_association_excludes_one() {
    let (lower, _) = ror::ci_value(60.0, 40.0, 90.0, 810.0, ror::Z_95);
    assert!(lower > 1.0);
}

#[test]
fn vectorised_ror_and_interval_align_with_scalar() {
    let n11 = [20.0, 5.0];
    let n12 = [80.0, 95.0];
    let n21 = [130.0, 145.0];
    let n22 = [770.0, 755.0];
    let values = stats::ror(&n11, &n12, &n21, &n22);
    let (lower, upper) = stats::confidence_interval(&n11, &n12, &n21, &n22, 1.96);
    for i in 0..2 {
        assert_eq!(values[i], ror::ror_value(n11[i], n12[i], n21[i], n22[i]));
        let (lo, hi) = ror::ci_value(n11[i], n12[i], n21[i], n22[i], 1.96);
        assert_eq!(lower[i], lo);
        assert_eq!(upper[i], hi);
    }
}

#[test]
fn zero_cells_propagate_non_finite_values() {
    let value = ror::ror_value(5.0, 0.0, 10.0, 100.0);
    assert!(value.is_infinite());

    let value = ror::ror_value(0.0, 10.0, 0.0, 100.0);
    assert!(value.is_nan());

    let (lower, upper) = ror::ci_value(0.0, 10.0, 20.0, 100.0, ror::Z_95);
    assert!(!lower.is_finite() || !upper.is_finite());
}

#[test]
fn ic_lower_bound_matches_reference() {
    let lower = bayes::estimate(20.0, 80.0, 130.0, 770.0, bayes::Prior::default()).lower_bound();
    assert!(close(lower, -0.378_982, 1e-5), "lower = {lower}");

    let lower = bayes::estimate(30.0, 70.0, 120.0, 780.0, bayes::Prior::default()).lower_bound();
    assert!(close(lower, 0.279_315, 1e-5), "lower = {lower}");
}

#[test]
fn ic_lower_bound_increases_with_n11() {
    // npp = 1000, n1p = 100, np1 = 150 held fixed
    let n11: Vec<f64> = (0..=100).map(f64::from).collect();
    let n12: Vec<f64> = n11.iter().map(|a| 100.0 - a).collect();
    let n21: Vec<f64> = n11.iter().map(|a| 150.0 - a).collect();
    let n22: Vec<f64> = n11.iter().map(|a| 750.0 + a).collect();
    let ic = stats::information_component_lower_bound(&n11, &n12, &n21, &n22);
    assert!(ic.iter().all(|v| v.is_finite()));
    for pair in ic.windows(2) {
        assert!(pair[1] > pair[0], "{} !> {}", pair[1], pair[0]);
    }
}

#[test]
fn chi_square_uses_yates_correction_by_default() {
    let corrected = chi2::statistic(20.0, 80.0, 130.0, 770.0, true);
    assert!(close(corrected, 1.764_706, 1e-5), "chi2 = {corrected}");
    assert!(close(chi2::p_value(corrected), 0.184_039, 1e-4));

    let plain = chi2::statistic(20.0, 80.0, 130.0, 770.0, false);
    assert!(plain > corrected);
}

#[test]
fn chi_square_with_zero_expected_cell_is_nan() {
    let value = chi2::statistic(0.0, 10.0, 0.0, 90.0, true);
    assert!(value.is_nan());
    assert!(chi2::p_value(value).is_nan());
}

#[test]
fn benjamini_hochberg_and_holm_match_reference_values() {
    let p = [0.01, 0.04, 0.03, 0.20];
    let bh = chi2::benjamini_hochberg(&p);
    let expected_bh = [0.04, 0.053_333, 0.053_333, 0.2];
    for (q, e) in bh.iter().zip(expected_bh) {
        assert!(close(*q, e, 1e-4), "{q} vs {e}");
    }
    let holm = chi2::holm(&p);
    let expected_holm = [0.04, 0.09, 0.09, 0.2];
    for (q, e) in holm.iter().zip(expected_holm) {
        assert!(close(*q, e, 1e-9), "{q} vs {e}");
    }
}

#[test]
fn holm_is_more_conservative_than_bh() {
    let p = [1e-12, 0.9, 0.95, 0.99, 0.999, 0.97];
    let bh = chi2::benjamini_hochberg(&p);
    let holm = chi2::holm(&p);
    for i in 1..p.len() {
        assert!(bh[i] >= p[i], "bh[{i}] = {} < p = {}", bh[i], p[i]);
    }
    for i in 0..p.len() {
        assert!(holm[i] >= bh[i], "holm[{i}] = {} < bh = {}", holm[i], bh[i]);
        assert!(holm[i] <= 1.0 && bh[i] <= 1.0);
    }
}

#[test]
fn non_finite_p_values_sit_outside_the_family() {
    let p = [f64::NAN, 0.01, 0.02];
    let bh = chi2::benjamini_hochberg(&p);
    assert!(bh[0].is_nan());
    assert!(close(bh[1], 0.02, 1e-12));
    assert!(close(bh[2], 0.02, 1e-12));
    let holm = chi2::holm(&p);
    assert!(holm[0].is_nan());
    assert!(close(holm[1], 0.02, 1e-12));
}

#[test]
fn correction_runs_over_the_whole_vector() {
    let n11 = [20.0, 60.0, 5.0];
    let n12 = [80.0, 40.0, 95.0];
    let n21 = [130.0, 90.0, 145.0];
    let n22 = [770.0, 810.0, 755.0];
    let result = stats::chi_square_with_correction(&n11, &n12, &n21, &n22, 0.05, true);
    assert_eq!(result.q_bh, chi2::benjamini_hochberg(&result.p));
    assert_eq!(result.q_holm, chi2::holm(&result.p));
    assert!(result.discoveries_holm() <= result.discoveries_bh());
}

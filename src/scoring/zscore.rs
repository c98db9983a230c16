use serde::{Deserialize, Serialize};

/// Convert a length to `f64`, accepting the precision loss above 2^53
#[inline]
fn length_to_f64(length: u64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        length as f64
    }
}

/// One observation linking two segment sides across a gap.
///
/// `support` multiplies the modelled affinity; typically the number of times
/// the linkage was observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkEvidence {
    pub side_a: i64,
    pub side_b: i64,

    /// Distance separating the two sides
    pub gap: u64,

    /// Length of the segment owning `side_a`
    pub length_a: u64,

    /// Length of the segment owning `side_b`
    pub length_b: u64,

    #[serde(default = "default_support")]
    pub support: f64,
}

fn default_support() -> f64 {
    1.0
}

/// Expected adjacency support between segments of lengths `n` and `m`
/// separated by a gap of `k`, with independent per-base decay `theta`:
///
/// `Σ_{i<n} Σ_{j<m} (1-theta)^(k+i+j)`
///
/// Evaluated in closed form as a product of two geometric series.
///
/// # Panics
///
/// Panics unless `0 <= theta < 1`.
#[must_use]
pub fn zscore(n: u64, m: u64, k: u64, theta: f64) -> f64 {
    check_theta(theta);
    if n == 0 || m == 0 {
        return 0.0;
    }
    if theta == 0.0 {
        return length_to_f64(n) * length_to_f64(m);
    }
    // ln(r) with r = 1 - theta; expm1 keeps 1 - r^n exact for small theta
    let ln_r = (-theta).ln_1p();
    let geometric = |length: u64| -(length_to_f64(length) * ln_r).exp_m1() / theta;
    (length_to_f64(k) * ln_r).exp() * geometric(n) * geometric(m)
}

/// Direct double summation of [`zscore`]; O(n·m), for validation only.
///
/// # Panics
///
/// Panics unless `0 <= theta < 1`.
#[must_use]
pub fn zscore_naive(n: u64, m: u64, k: u64, theta: f64) -> f64 {
    check_theta(theta);
    let r = 1.0 - theta;
    let mut total = 0.0;
    for i in 0..n {
        for j in 0..m {
            total += r.powf(length_to_f64(k + i + j));
        }
    }
    total
}

fn check_theta(theta: f64) {
    assert!(
        (0.0..1.0).contains(&theta),
        "theta must lie in [0, 1), got {theta}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_theta_zero_is_product_of_lengths() {
        assert!((zscore(2, 2, 5, 0.0) - 4.0).abs() < f64::EPSILON);
        assert!((zscore(100, 3, 0, 0.0) - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_segments_score_zero() {
        assert!(zscore(0, 10, 3, 0.5).abs() < f64::EPSILON);
        assert!(zscore(10, 0, 3, 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_known_values() {
        // n = m = 1: only the (1-theta)^k term survives
        assert!(close(zscore(1, 1, 3, 0.5), 0.125));
        assert!(close(zscore(3, 4, 2, 0.1), zscore_naive(3, 4, 2, 0.1)));
    }

    #[test]
    fn test_decay_with_distance() {
        let near = zscore(10, 10, 1, 0.01);
        let far = zscore(10, 10, 100, 0.01);
        assert!(near > far);
    }

    #[test]
    #[should_panic(expected = "theta must lie in")]
    fn test_theta_one_rejected() {
        let _ = zscore(1, 1, 1, 1.0);
    }

    proptest! {
        #[test]
        fn prop_closed_form_matches_double_sum(
            n in 0u64..40,
            m in 0u64..40,
            k in 0u64..60,
            theta in 0.0f64..0.99,
        ) {
            let closed = zscore(n, m, k, theta);
            let naive = zscore_naive(n, m, k, theta);
            prop_assert!(close(closed, naive), "closed {} naive {}", closed, naive);
        }
    }
}

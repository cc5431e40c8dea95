//! Small descriptive statistics used by the scoring and aggregation passes.

/// Weighted mean of `values`. Returns `None` when the weights sum to zero.
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> Option<f64> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 || values.len() != weights.len() {
        return None;
    }
    Some(values.iter().zip(weights).map(|(v, w)| v * w).sum::<f64>() / total)
}

/// Weighted population standard deviation around the weighted mean.
pub fn weighted_std_dev(values: &[f64], weights: &[f64]) -> Option<f64> {
    let m = weighted_mean(values, weights)?;
    let total: f64 = weights.iter().sum();
    let variance = values
        .iter()
        .zip(weights)
        .map(|(v, w)| w * (v - m).powi(2))
        .sum::<f64>()
        / total;
    Some(variance.max(0.0).sqrt())
}

/// Scale `weights` so they sum to 1. All-zero input is returned unchanged.
pub fn normalize(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return weights.to_vec();
    }
    weights.iter().map(|w| w / total).collect()
}

/// Clamp to [lo, hi], mapping NaN to zero (itself clamped).
pub fn clamp_finite(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        0.0_f64.clamp(lo, hi)
    } else {
        value.clamp(lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_weighted_mean_and_spread() {
        let values = [0.8, -0.2];
        let weights = [0.4, 0.3];
        assert_relative_eq!(weighted_mean(&values, &weights).unwrap(), 0.26 / 0.7, epsilon = 1e-12);

        let same = weighted_std_dev(&[0.5, 0.5, 0.5], &[1.0, 2.0, 3.0]).unwrap();
        assert_relative_eq!(same, 0.0);

        let split = weighted_std_dev(&[1.0, -1.0], &[1.0, 1.0]).unwrap();
        assert_relative_eq!(split, 1.0);
    }

    #[test]
    fn test_zero_weights_have_no_mean() {
        assert!(weighted_mean(&[1.0, 2.0], &[0.0, 0.0]).is_none());
        assert!(weighted_std_dev(&[1.0], &[0.0]).is_none());
    }

    #[test]
    fn test_normalize_sums_to_one() {
        let w = normalize(&[1.0, 2.0, 5.0]);
        assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(w[2], 0.625);
        assert_eq!(normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_clamp_finite() {
        assert_eq!(clamp_finite(f64::NAN, -1.0, 1.0), 0.0);
        assert_eq!(clamp_finite(f64::NAN, 0.5, 1.0), 0.5);
        assert_eq!(clamp_finite(3.0, -1.0, 1.0), 1.0);
        assert_eq!(clamp_finite(0.2, -1.0, 1.0), 0.2);
    }
}

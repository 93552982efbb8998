use super::types::NumericSummary;

/// Summarizes a sequence of finite numbers. Returns `None` for an empty
/// sequence so callers can leave the column out.
pub fn describe_numeric(values: &[f64]) -> Option<NumericSummary> {
    if values.is_empty() {
        return None;
    }

    let count = values.len();
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let (min, max) = (sorted[0], sorted[count - 1]);

    let mean = mean(values).clamp(min, max);

    Some(NumericSummary {
        count,
        mean,
        std_dev: population_std(values, mean),
        min,
        p25: quantile_sorted(&sorted, 0.25),
        p50: quantile_sorted(&sorted, 0.5),
        p75: quantile_sorted(&sorted, 0.75),
        max,
    })
}

/// Each term is divided by `n` before summing, so partial sums stay within
/// the range of the inputs.
fn mean(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    values.iter().map(|x| x / n).sum()
}

/// Deviations are halved and then scaled by the largest one so neither the
/// subtraction nor the squares can overflow.
fn population_std(values: &[f64], mean: f64) -> f64 {
    let half_mean = mean / 2.0;
    let scale = values
        .iter()
        .map(|x| (x / 2.0 - half_mean).abs())
        .fold(0.0, f64::max);
    if scale == 0.0 {
        return 0.0;
    }

    let n = values.len() as f64;
    let scaled_variance = values
        .iter()
        .map(|x| ((x / 2.0 - half_mean) / scale).powi(2) / n)
        .sum::<f64>();
    scale * scaled_variance.sqrt() * 2.0
}

/// Linear interpolation between the two closest ranks of an ascending,
/// non-empty slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let position = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let base = position.floor() as usize;
    let rest = position - base as f64;

    let low = sorted[base];
    match sorted.get(base + 1) {
        Some(&high) => (low * (1.0 - rest) + high * rest).clamp(low, high),
        None => low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    #[test]
    fn one_to_five() {
        let summary = describe_numeric(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(summary.count, 5);
        assert!(approx(summary.mean, 3.0));
        assert!(approx(summary.std_dev, 1.41421356));
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.p25, 2.0);
        assert_eq!(summary.p50, 3.0);
        assert_eq!(summary.p75, 4.0);
        assert_eq!(summary.max, 5.0);
    }

    #[test]
    fn interpolates_between_ranks() {
        let summary = describe_numeric(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!(approx(summary.p25, 1.75));
        assert!(approx(summary.p50, 2.5));
        assert!(approx(summary.p75, 3.25));
    }

    #[test]
    fn empty_has_no_summary() {
        assert!(describe_numeric(&[]).is_none());
    }

    #[test]
    fn single_value() {
        let summary = describe_numeric(&[7.5]).unwrap();
        assert_eq!(summary.std_dev, 0.0);
        assert_eq!(summary.p25, 7.5);
        assert_eq!(summary.p75, 7.5);
    }

    #[test]
    fn order_of_input_does_not_matter() {
        let a = describe_numeric(&[9.0, -1.0, 4.0, 4.0, 0.5, 12.0]).unwrap();
        let b = describe_numeric(&[12.0, 4.0, 0.5, -1.0, 9.0, 4.0]).unwrap();
        assert_eq!(a.p25, b.p25);
        assert_eq!(a.p50, b.p50);
        assert_eq!(a.p75, b.p75);
        assert_eq!(a.min, b.min);
        assert_eq!(a.max, b.max);
    }

    #[test]
    fn quartiles_are_ordered() {
        let samples: [&[f64]; 7] = [
            &[3.0, 1.0, 2.0],
            &[-5.0, 10.0],
            &[0.1, 0.1, 0.1, 100.0, -100.0, 42.0, 7.0],
            &[1e9, -1e9, 0.0, 3.0, 3.0],
            &[-1e308, 1e308],
            &[f64::MAX, f64::MIN, 0.0],
            &[-f64::MAX, -f64::MAX, f64::MAX],
        ];
        for values in samples {
            let s = describe_numeric(values).unwrap();
            assert!(s.min <= s.p25 && s.p25 <= s.p50 && s.p50 <= s.p75 && s.p75 <= s.max);
            assert!(s.min <= s.mean && s.mean <= s.max);
            assert!(s.std_dev.is_finite() && s.std_dev >= 0.0);
        }
    }

    #[test]
    fn wide_range_quartiles_interpolate() {
        let s = describe_numeric(&[-1e308, 1e308]).unwrap();
        assert_eq!(s.p50, 0.0);
        assert!(approx(s.p25 / 1e308, -0.5));
        assert!(approx(s.p75 / 1e308, 0.5));
    }

    #[test]
    fn huge_values_keep_finite_mean_and_std() {
        let same = describe_numeric(&[1e308, 1e308]).unwrap();
        assert_eq!(same.mean, 1e308);
        assert_eq!(same.std_dev, 0.0);

        let spread = describe_numeric(&[-1e308, 1e308]).unwrap();
        assert_eq!(spread.mean, 0.0);
        assert!(approx(spread.std_dev / 1e308, 1.0));

        let json = serde_json::to_value(&same).unwrap();
        assert_eq!(json["mean"], 1e308);
        assert_eq!(json["std"], 0.0);
    }

    #[test]
    fn serializes_with_percent_keys() {
        let summary = describe_numeric(&[1.0, 3.0]).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["25%"], 1.5);
        assert_eq!(json["std"], 1.0);
        assert!(json.get("p25").is_none());
    }
}

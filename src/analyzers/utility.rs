/// Arithmetic mean using compensated (Kahan) summation. Returns `None` for empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sum = 0.0;
    let mut compensation = 0.0;
    for &v in values {
        let y = v - compensation;
        let t = sum + y;
        compensation = (t - sum) - y;
        sum = t;
    }
    Some(sum / values.len() as f64)
}

/// Sample standard deviation (one delta degree of freedom), accumulated with
/// Welford's online update. Returns `None` for fewer than two values.
pub fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mut n = 0.0;
    let mut mean = 0.0;
    let mut m2 = 0.0;
    for &v in values {
        n += 1.0;
        let old_mean = mean;
        mean += (v - old_mean) / n;
        m2 += (v - mean) * (v - old_mean);
    }
    Some((m2 / (n - 1.0)).sqrt())
}

/// Median; even-length input averages the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

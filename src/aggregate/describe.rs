//! Descriptive statistics for a single observation vector.

use statrs::statistics::Statistics;

/// Descriptive statistics of one gene's expression values within one condition group.
///
/// `variance` and `std_dev` use the unbiased (n−1) estimator and are NaN below two
/// samples. `skew` is the population third standardized moment and is NaN below two
/// samples or for zero variance. NaN input values propagate into NaN statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescriptiveStats {
    pub n: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub skew: f64,
}

/// Compute descriptive statistics over a slice of observations.
///
/// min/max/mean/variance/std_dev follow statrs conventions (NaN on empty input,
/// NaN sample variance below two entries); skewness is computed from the second
/// and third central moments with the population (biased) normalization.
pub fn describe(values: &[f64]) -> DescriptiveStats {
    DescriptiveStats {
        n: values.len(),
        min: Statistics::min(values.iter()),
        max: Statistics::max(values.iter()),
        mean: values.iter().mean(),
        variance: values.iter().variance(),
        std_dev: values.iter().std_dev(),
        skew: skewness(values),
    }
}

/// Population skewness: m3 / m2^(3/2) over central moments with divisor n.
///
/// A degenerate vector (fewer than two values, or zero variance) has no defined
/// asymmetry and yields NaN rather than an error.
pub fn skewness(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }

    let n_f = n as f64;
    let mean = values.iter().sum::<f64>() / n_f;
    let mut m2 = 0.0;
    let mut m3 = 0.0;
    for &v in values {
        let d = v - mean;
        m2 += d * d;
        m3 += d * d * d;
    }
    m2 /= n_f;
    m3 /= n_f;

    if m2 > 0.0 {
        m3 / m2.powf(1.5)
    } else {
        f64::NAN
    }
}

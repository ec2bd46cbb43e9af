use crate::error::AnalyticsError;
use crate::models::SeriesStats;

/// Descriptive statistics over the non-NaN values of `values`.
///
/// `std` is the sample standard deviation (n - 1), NaN for a single value. `cv` is
/// `std / mean`, NaN when the mean is 0. Infinite values are kept, so one infinite
/// KPI makes the mean infinite and the deviation NaN. If every value is NaN all
/// statistics are NaN and `count` is 0.
pub fn describe(values: &[f64]) -> Result<SeriesStats, AnalyticsError> {
    if values.is_empty() {
        return Err(AnalyticsError::empty("series"));
    }

    let mut present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if present.is_empty() {
        return Ok(SeriesStats {
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            cv: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            count: 0,
        });
    }
    present.sort_by(f64::total_cmp);

    let mean = mean(&present);
    let std = sample_std(&present);

    Ok(SeriesStats {
        mean,
        median: median_sorted(&present),
        std,
        cv: coefficient_of_variation(std, mean),
        min: present[0],
        max: present[present.len() - 1],
        count: present.len(),
    })
}

/// Same as [`describe`], except a single score has `std = 0` rather than NaN.
pub fn describe_scores(values: &[f64]) -> Result<SeriesStats, AnalyticsError> {
    let mut stats = describe(values)?;
    if stats.count == 1 {
        stats.std = 0.0;
        stats.cv = coefficient_of_variation(0.0, stats.mean);
    }
    Ok(stats)
}

fn coefficient_of_variation(std: f64, mean: f64) -> f64 {
    if mean == 0.0 {
        f64::NAN
    } else {
        std / mean
    }
}

/// Stats reported for a subset that turned out empty (no predicted positives).
pub fn empty_subset() -> SeriesStats {
    SeriesStats {
        mean: 0.0,
        median: 0.0,
        std: 0.0,
        cv: f64::NAN,
        min: 0.0,
        max: 0.0,
        count: 0,
    }
}

pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; NaN when there are fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let mu = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - mu).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

fn median_sorted(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

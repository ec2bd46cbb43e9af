use chrono::Datelike;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::AnalyticsError;
use crate::models::{EnrichedRecord, MonthlyRecord};
use crate::stats;

/// Trailing window used for the `*_ma3` trend columns.
pub const MA_WINDOW: usize = 3;

/// What to do when a KPI comes out as NaN or infinite (zero headcount).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericPolicy {
    /// Keep the non-finite value in that row and carry on with the batch.
    #[default]
    Propagate,
    /// Abort on the first non-finite KPI.
    Strict,
}

/// Derives headcount averages, the four percentage KPIs, MM3 trends, calendar
/// month and the termination-rate z-score for a monthly series.
///
/// The input is sorted by date on a private copy; the output has one row per
/// input row in chronological order.
pub fn compute_metrics(
    records: &[MonthlyRecord],
    policy: NumericPolicy,
) -> Result<Vec<EnrichedRecord>, AnalyticsError> {
    if records.is_empty() {
        return Err(AnalyticsError::empty("monthly series"));
    }

    let mut sorted = records.to_vec();
    sorted.sort_by_key(|record| record.date);
    if let Some(pair) = sorted.windows(2).find(|pair| pair[0].date == pair[1].date) {
        return Err(AnalyticsError::DuplicateDate(pair[0].date));
    }

    let totals: Vec<f64> = sorted.iter().map(|r| r.total_employees as f64).collect();
    let hc_avg = headcount_avg(&totals);

    let mut turnover = Vec::with_capacity(sorted.len());
    let mut desligamento = Vec::with_capacity(sorted.len());
    let mut voluntario = Vec::with_capacity(sorted.len());
    let mut involuntario = Vec::with_capacity(sorted.len());

    for (record, &avg) in sorted.iter().zip(hc_avg.iter()) {
        let movement = (record.hires as f64 + record.separations as f64) / 2.0;
        let row = [
            ("turnover_rotatividade_pct", pct(movement, record.total_employees as f64)),
            ("desligamento_pct", pct(record.separations as f64, avg)),
            ("voluntario_pct", pct(record.voluntary as f64, avg)),
            ("involuntario_pct", pct(record.involuntary as f64, avg)),
        ];
        check_row(record, &row, policy)?;

        turnover.push(row[0].1);
        desligamento.push(row[1].1);
        voluntario.push(row[2].1);
        involuntario.push(row[3].1);
    }

    let desligamento_ma3 = moving_avg(&desligamento, MA_WINDOW);
    let turnover_ma3 = moving_avg(&turnover, MA_WINDOW);
    let z_desligamento = zscore(&desligamento);

    let enriched = sorted
        .into_iter()
        .enumerate()
        .map(|(i, record)| EnrichedRecord {
            month: record.date.month(),
            date: record.date,
            total_employees: record.total_employees,
            hires: record.hires,
            separations: record.separations,
            voluntary: record.voluntary,
            involuntary: record.involuntary,
            hc_avg: hc_avg[i],
            turnover_rotatividade_pct: turnover[i],
            desligamento_pct: desligamento[i],
            voluntario_pct: voluntario[i],
            involuntario_pct: involuntario[i],
            desligamento_ma3: desligamento_ma3[i],
            turnover_ma3: turnover_ma3[i],
            z_desligamento: z_desligamento[i],
        })
        .collect::<Vec<_>>();

    debug!(rows = enriched.len(), "computed turnover metrics");
    Ok(enriched)
}

fn check_row(
    record: &MonthlyRecord,
    row: &[(&'static str, f64)],
    policy: NumericPolicy,
) -> Result<(), AnalyticsError> {
    for &(column, value) in row {
        if value.is_finite() {
            continue;
        }
        match policy {
            NumericPolicy::Strict => {
                return Err(AnalyticsError::NonFinite {
                    column,
                    date: record.date,
                })
            }
            NumericPolicy::Propagate => {
                warn!(date = %record.date, column, value, "non-finite KPI, zero headcount?");
            }
        }
    }
    Ok(())
}

/// Average headcount of month t: mean of the totals at t-1 and t. The first month
/// has no prior period and uses its own total.
pub fn headcount_avg(totals: &[f64]) -> Vec<f64> {
    totals
        .iter()
        .enumerate()
        .map(|(i, &total)| {
            if i == 0 {
                total
            } else {
                (totals[i - 1] + total) / 2.0
            }
        })
        .collect()
}

/// Trailing mean over at most `window` values; the first points use what is available.
pub fn moving_avg(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            stats::mean(&values[start..=i])
        })
        .collect()
}

/// Standard score against the non-NaN values of the series, using the sample
/// standard deviation. A zero deviation divides by 1 instead. A single value has no
/// deviation and scores NaN, and an infinite value makes every score NaN.
pub fn zscore(values: &[f64]) -> Vec<f64> {
    let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if present.is_empty() {
        return vec![f64::NAN; values.len()];
    }
    let mu = stats::mean(&present);
    let sd = stats::sample_std(&present);
    let sd = if sd == 0.0 { 1.0 } else { sd };

    values.iter().map(|&v| (v - mu) / sd).collect()
}

pub fn pct(numerator: f64, denominator: f64) -> f64 {
    (numerator / denominator) * 100.0
}

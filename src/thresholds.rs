use std::cmp::Ordering;
use std::fmt;

use rayon::prelude::*;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::AnalyticsError;
use crate::models::{ScoredSample, Selection, ThresholdPoint};
use crate::stats;

pub const GRID_START: f64 = 0.01;
pub const GRID_END: f64 = 0.99;
pub const GRID_POINTS: usize = 99;

/// Which operating point to report. Chosen by the caller, never inferred from data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy {
    BestF1,
    TopK { k_fraction: f64 },
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::BestF1 => write!(f, "best_f1"),
            Strategy::TopK { k_fraction } => write!(f, "topk@{:.2}", k_fraction),
        }
    }
}

/// Strategy name as it appears in config files and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
pub enum StrategyKind {
    #[default]
    #[serde(rename = "best_f1")]
    #[value(name = "best_f1")]
    BestF1,
    #[serde(rename = "topk")]
    #[value(name = "topk")]
    TopK,
}

impl StrategyKind {
    pub fn with_k_fraction(self, k_fraction: f64) -> Strategy {
        match self {
            StrategyKind::BestF1 => Strategy::BestF1,
            StrategyKind::TopK => Strategy::TopK { k_fraction },
        }
    }
}

/// The full threshold sweep plus the one point the strategy picked.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub grid: Vec<ThresholdPoint>,
    pub selection: Selection,
}

/// 99 evenly spaced thresholds from 0.01 to 0.99 inclusive, ascending.
pub fn threshold_grid() -> Vec<f64> {
    let step = (GRID_END - GRID_START) / (GRID_POINTS - 1) as f64;
    (0..GRID_POINTS)
        .map(|i| {
            if i == GRID_POINTS - 1 {
                GRID_END
            } else {
                GRID_START + i as f64 * step
            }
        })
        .collect()
}

/// Confusion counts and derived rates when `score >= threshold` means positive.
pub fn confusion_at(y_true: &[bool], y_score: &[f64], threshold: f64) -> ThresholdPoint {
    let (mut tp, mut fp, mut tn, mut fn_) = (0, 0, 0, 0);
    for (&label, &score) in y_true.iter().zip(y_score) {
        match (score >= threshold, label) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, false) => tn += 1,
            (false, true) => fn_ += 1,
        }
    }

    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    ThresholdPoint {
        threshold,
        tp,
        fp,
        tn,
        fn_,
        precision,
        recall,
        f1,
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Evaluates every grid threshold. Points are computed in parallel and returned in
/// ascending threshold order.
pub fn sweep(y_true: &[bool], y_score: &[f64]) -> Result<Vec<ThresholdPoint>, AnalyticsError> {
    validate(y_true, y_score)?;
    Ok(threshold_grid()
        .into_par_iter()
        .map(|threshold| confusion_at(y_true, y_score, threshold))
        .collect())
}

pub fn select_best_f1(y_true: &[bool], y_score: &[f64]) -> Result<ThresholdPoint, AnalyticsError> {
    let grid = sweep(y_true, y_score)?;
    best_of(&grid).ok_or_else(|| AnalyticsError::empty("threshold grid"))
}

/// Highest `(f1, precision, recall)` in lexicographic order. On a full tie the
/// lowest threshold wins.
pub fn best_of(grid: &[ThresholdPoint]) -> Option<ThresholdPoint> {
    grid.iter().copied().fold(None, |best, point| match best {
        Some(current) if rank(&point, &current) != Ordering::Greater => Some(current),
        _ => Some(point),
    })
}

fn rank(a: &ThresholdPoint, b: &ThresholdPoint) -> Ordering {
    let key = |p: &ThresholdPoint| [p.f1, p.precision, p.recall];
    key(a)
        .iter()
        .zip(key(b).iter())
        .map(|(x, y)| x.total_cmp(y))
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Uses the score ranked `max(1, floor(n * k_fraction))` (descending) as the
/// threshold, so at least that many samples are classified positive.
pub fn select_top_k(
    y_true: &[bool],
    y_score: &[f64],
    k_fraction: f64,
) -> Result<ThresholdPoint, AnalyticsError> {
    validate(y_true, y_score)?;
    if !(k_fraction > 0.0 && k_fraction <= 1.0) {
        return Err(AnalyticsError::InvalidKFraction(k_fraction));
    }

    let n = ((y_score.len() as f64 * k_fraction).floor() as usize).max(1);
    let mut ranked = y_score.to_vec();
    ranked.sort_by(|a, b| b.total_cmp(a));
    let threshold = ranked[n - 1];
    debug!(n, threshold, "top-k threshold");

    Ok(confusion_at(y_true, y_score, threshold))
}

/// Sweeps the grid, applies `strategy`, and describes the scores overall and for
/// the samples classified positive at the chosen threshold.
pub fn evaluate(samples: &[ScoredSample], strategy: Strategy) -> Result<Evaluation, AnalyticsError> {
    let y_true: Vec<bool> = samples.iter().map(|s| s.y_true).collect();
    let y_score: Vec<f64> = samples.iter().map(|s| s.y_score).collect();

    let grid = sweep(&y_true, &y_score)?;
    let point = match strategy {
        Strategy::BestF1 => best_of(&grid).ok_or_else(|| AnalyticsError::empty("threshold grid"))?,
        Strategy::TopK { k_fraction } => select_top_k(&y_true, &y_score, k_fraction)?,
    };

    let positives: Vec<f64> = y_score
        .iter()
        .copied()
        .filter(|&score| score >= point.threshold)
        .collect();
    let scores_all = stats::describe_scores(&y_score)?;
    let scores_predicted_positive = if positives.is_empty() {
        stats::empty_subset()
    } else {
        stats::describe_scores(&positives)?
    };

    info!(
        strategy = %strategy,
        threshold = point.threshold,
        precision = point.precision,
        recall = point.recall,
        f1 = point.f1,
        "selected operating point"
    );

    Ok(Evaluation {
        grid,
        selection: Selection {
            point,
            strategy: strategy.to_string(),
            scores_all,
            scores_predicted_positive,
        },
    })
}

fn validate(y_true: &[bool], y_score: &[f64]) -> Result<(), AnalyticsError> {
    if y_true.len() != y_score.len() {
        return Err(AnalyticsError::LengthMismatch {
            labels: y_true.len(),
            scores: y_score.len(),
        });
    }
    if y_true.is_empty() {
        return Err(AnalyticsError::empty("predictions"));
    }
    if let Some(index) = y_score.iter().position(|s| !s.is_finite()) {
        return Err(AnalyticsError::NonFiniteScore {
            index,
            value: y_score[index],
        });
    }
    Ok(())
}

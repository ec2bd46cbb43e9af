use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MonthlyRecord {
    pub date: NaiveDate,
    pub total_employees: u32,
    pub hires: u32,
    pub separations: u32,
    pub voluntary: u32,
    pub involuntary: u32,
}

/// A monthly record with every derived KPI. Column order matches the enriched CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    pub date: NaiveDate,
    pub total_employees: u32,
    pub hires: u32,
    pub separations: u32,
    pub voluntary: u32,
    pub involuntary: u32,
    pub hc_avg: f64,
    pub turnover_rotatividade_pct: f64,
    pub desligamento_pct: f64,
    pub voluntario_pct: f64,
    pub involuntario_pct: f64,
    pub desligamento_ma3: f64,
    pub turnover_ma3: f64,
    pub month: u32,
    pub z_desligamento: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesStats {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub cv: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    #[serde(rename = "KPI")]
    pub kpi: String,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub cv: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlySummary {
    pub year: i32,
    pub turnover_rotatividade_pct: f64,
    pub desligamento_pct: f64,
    pub voluntario_pct: f64,
    pub involuntario_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalityPoint {
    pub month: u32,
    pub desligamento_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub date: NaiveDate,
    pub desligamento_pct: f64,
    pub z_desligamento: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSample {
    pub id: String,
    pub y_true: bool,
    pub y_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdPoint {
    pub threshold: f64,
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// The operating point a strategy settled on, with the score distributions it implies.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub point: ThresholdPoint,
    pub strategy: String,
    pub scores_all: SeriesStats,
    pub scores_predicted_positive: SeriesStats,
}

/// Single-row export of a [`Selection`]; shared by the CSV and JSON summaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChosenThreshold {
    pub threshold: f64,
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub strategy: String,
}

impl From<&Selection> for ChosenThreshold {
    fn from(selection: &Selection) -> Self {
        let point = &selection.point;
        ChosenThreshold {
            threshold: point.threshold,
            tp: point.tp,
            fp: point.fp,
            tn: point.tn,
            fn_: point.fn_,
            precision: point.precision,
            recall: point.recall,
            f1: point.f1,
            strategy: selection.strategy.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreDistribution {
    pub group: &'static str,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub cv: f64,
}

impl ScoreDistribution {
    pub fn new(group: &'static str, stats: &SeriesStats) -> Self {
        ScoreDistribution {
            group,
            mean: stats.mean,
            median: stats.median,
            std: stats.std,
            cv: stats.cv,
        }
    }
}

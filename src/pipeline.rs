use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::config::{ClassifierConfig, TurnoverConfig};
use crate::io;
use crate::junit;
use crate::metrics;
use crate::models::{ChosenThreshold, ScoreDistribution, Selection};
use crate::report;
use crate::thresholds::{self, Strategy};

pub const ENRICHED_CSV: &str = "metrics_enriched.csv";
pub const STATS_CSV: &str = "turnover_stats.csv";
pub const YEARLY_CSV: &str = "turnover_yearly.csv";
pub const SEASONALITY_CSV: &str = "seasonality_desligamento.csv";
pub const ANOMALIES_CSV: &str = "anomalias_desligamento.csv";
pub const REPORT_MD: &str = "turnover_report.md";

pub const GRID_CSV: &str = "metrics_by_threshold.csv";
pub const CHOSEN_CSV: &str = "confusion_matrix.csv";
pub const SCORE_STATS_CSV: &str = "fp_stats.csv";
pub const SUMMARY_JSON: &str = "metrics_summary.json";
pub const JUNIT_XML: &str = "ml_evaluation.xml";

#[derive(Debug, Clone)]
pub struct AnalysisSummary {
    pub months: usize,
    pub anomalies: usize,
}

/// Loads the monthly series, enriches it and writes every turnover artifact.
pub fn analyze(
    input: &Path,
    outdir: &Path,
    config: &TurnoverConfig,
) -> anyhow::Result<AnalysisSummary> {
    let records = io::load_monthly(input)?;
    let enriched = metrics::compute_metrics(&records, config.numeric_policy)?;
    let anomalies = report::anomalies(&enriched, config.anomaly_z);

    io::ensure_outdir(outdir)?;

    io::write_csv(&outdir.join(ENRICHED_CSV), &enriched)?;
    io::write_csv(&outdir.join(STATS_CSV), &report::kpi_summary(&enriched)?)?;
    io::write_csv(&outdir.join(YEARLY_CSV), &report::yearly_summary(&enriched))?;
    io::write_csv(&outdir.join(SEASONALITY_CSV), &report::seasonality(&enriched))?;
    io::write_csv(&outdir.join(ANOMALIES_CSV), &anomalies)?;
    io::write_text(
        &outdir.join(REPORT_MD),
        &report::build_report(&enriched, config.anomaly_z)?,
    )?;

    info!(
        months = enriched.len(),
        anomalies = anomalies.len(),
        outdir = %outdir.display(),
        "turnover analysis written"
    );
    Ok(AnalysisSummary {
        months: enriched.len(),
        anomalies: anomalies.len(),
    })
}

/// Scores the prediction batch with the configured strategy and writes the grid,
/// the chosen point, score distributions, JSON summary and JUnit report.
pub fn evaluate(
    preds: &Path,
    outdir: &Path,
    config: &ClassifierConfig,
) -> anyhow::Result<Selection> {
    let samples = io::load_predictions(preds)?;
    let strategy: Strategy = config.strategy.with_k_fraction(config.k_top);
    let evaluation = thresholds::evaluate(&samples, strategy)?;
    let selection = evaluation.selection;

    io::ensure_outdir(outdir)?;

    let distributions = [
        ScoreDistribution::new("scores_all", &selection.scores_all),
        ScoreDistribution::new(
            "scores_predicted_positive",
            &selection.scores_predicted_positive,
        ),
    ];
    let chosen = ChosenThreshold::from(&selection);

    io::write_csv(&outdir.join(GRID_CSV), &evaluation.grid)?;
    io::write_csv(&outdir.join(CHOSEN_CSV), std::slice::from_ref(&chosen))?;
    io::write_csv(&outdir.join(SCORE_STATS_CSV), &distributions)?;
    io::write_json(&outdir.join(SUMMARY_JSON), &JsonSummary::from(&chosen))?;
    io::write_text(
        &outdir.join(JUNIT_XML),
        &junit::render(&config.suite_name, &selection),
    )?;

    info!(
        samples = samples.len(),
        strategy = %selection.strategy,
        outdir = %outdir.display(),
        "classifier evaluation written"
    );
    Ok(selection)
}

/// `metrics_summary.json` leads with the strategy tag.
#[derive(Serialize)]
struct JsonSummary<'a> {
    strategy: &'a str,
    threshold: f64,
    tp: usize,
    fp: usize,
    tn: usize,
    #[serde(rename = "fn")]
    fn_: usize,
    precision: f64,
    recall: f64,
    f1: f64,
}

impl<'a> From<&'a ChosenThreshold> for JsonSummary<'a> {
    fn from(chosen: &'a ChosenThreshold) -> Self {
        JsonSummary {
            strategy: &chosen.strategy,
            threshold: chosen.threshold,
            tp: chosen.tp,
            fp: chosen.fp,
            tn: chosen.tn,
            fn_: chosen.fn_,
            precision: chosen.precision,
            recall: chosen.recall,
            f1: chosen.f1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyticsError;
    use crate::metrics::NumericPolicy;
    use crate::thresholds::StrategyKind;
    use std::fs;
    use std::path::PathBuf;

    fn data(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join(name)
    }

    #[test]
    fn analyze_writes_all_turnover_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let summary = analyze(
            &data("turnover_monthly.csv"),
            dir.path(),
            &TurnoverConfig::default(),
        )
        .unwrap();
        assert_eq!(summary.months, 24);
        assert_eq!(summary.anomalies, 1);

        for name in [
            ENRICHED_CSV,
            STATS_CSV,
            YEARLY_CSV,
            SEASONALITY_CSV,
            ANOMALIES_CSV,
            REPORT_MD,
        ] {
            assert!(dir.path().join(name).exists(), "missing {name}");
        }

        let enriched = fs::read_to_string(dir.path().join(ENRICHED_CSV)).unwrap();
        let header = enriched.lines().next().unwrap();
        assert_eq!(
            header,
            "date,total_employees,hires,separations,voluntary,involuntary,hc_avg,\
             turnover_rotatividade_pct,desligamento_pct,voluntario_pct,involuntario_pct,\
             desligamento_ma3,turnover_ma3,month,z_desligamento"
        );
        assert_eq!(enriched.lines().count(), 25);
        assert!(enriched.lines().nth(1).unwrap().starts_with("2021-01-01,1920,"));
    }

    #[test]
    fn analyze_strict_policy_surfaces_zero_headcount() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("monthly.csv");
        fs::write(
            &input,
            "date,total_employees,hires,separations,voluntary,involuntary\n\
             2021-01-01,0,1,1,1,0\n",
        )
        .unwrap();
        let config = TurnoverConfig {
            numeric_policy: NumericPolicy::Strict,
            ..TurnoverConfig::default()
        };
        let outdir = dir.path().join("out");
        let err = analyze(&input, &outdir, &config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalyticsError>(),
            Some(AnalyticsError::NonFinite { .. })
        ));
        assert!(!outdir.exists());
    }

    #[test]
    fn analyze_missing_input_leaves_no_outdir() {
        let dir = tempfile::tempdir().unwrap();
        let outdir = dir.path().join("out");
        let result = analyze(
            &dir.path().join("absent.csv"),
            &outdir,
            &TurnoverConfig::default(),
        );
        assert!(result.is_err());
        assert!(!outdir.exists());
    }

    #[test]
    fn evaluate_writes_classifier_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClassifierConfig {
            strategy: StrategyKind::TopK,
            ..ClassifierConfig::default()
        };
        let selection = evaluate(&data("predictions.csv"), dir.path(), &config).unwrap();
        assert_eq!(selection.strategy, "topk@0.05");
        assert_eq!(selection.point.threshold, 0.91);

        let grid = fs::read_to_string(dir.path().join(GRID_CSV)).unwrap();
        assert_eq!(
            grid.lines().next().unwrap(),
            "threshold,tp,fp,tn,fn,precision,recall,f1"
        );
        assert_eq!(grid.lines().count(), 100);

        let chosen = fs::read_to_string(dir.path().join(CHOSEN_CSV)).unwrap();
        let lines: Vec<&str> = chosen.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "threshold,tp,fp,tn,fn,precision,recall,f1,strategy");
        let fields: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(fields[0].parse::<f64>().unwrap(), 0.91);
        assert_eq!(&fields[1..5], &["1", "0", "15", "4"]);
        assert_eq!(fields[8], "topk@0.05");

        let stats = fs::read_to_string(dir.path().join(SCORE_STATS_CSV)).unwrap();
        let groups: Vec<&str> = stats
            .lines()
            .skip(1)
            .map(|line| line.split(',').next().unwrap())
            .collect();
        assert_eq!(groups, vec!["scores_all", "scores_predicted_positive"]);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(SUMMARY_JSON)).unwrap())
                .unwrap();
        assert_eq!(json["strategy"], "topk@0.05");
        assert_eq!(json["fn"], 4);

        let xml = fs::read_to_string(dir.path().join(JUNIT_XML)).unwrap();
        assert!(xml.contains(r#"<testsuite name="ML_Evaluation""#));
    }

    #[test]
    fn evaluate_rejects_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let preds = dir.path().join("preds.csv");
        fs::write(&preds, "id,score\na,0.4\n").unwrap();
        let outdir = dir.path().join("out");
        let err = evaluate(&preds, &outdir, &ClassifierConfig::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalyticsError>(),
            Some(AnalyticsError::MissingColumns { .. })
        ));
        assert!(!outdir.exists());
    }
}

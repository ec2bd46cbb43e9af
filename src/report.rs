use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::Datelike;

use crate::error::AnalyticsError;
use crate::models::{Anomaly, EnrichedRecord, KpiSummary, SeasonalityPoint, YearlySummary};
use crate::stats;

type KpiColumn = (&'static str, fn(&EnrichedRecord) -> f64);

/// The four KPIs in the order they appear in every summary table.
const KPI_COLUMNS: [KpiColumn; 4] = [
    ("Turnover (rotatividade)", |r: &EnrichedRecord| r.turnover_rotatividade_pct),
    ("Taxa de desligamento", |r: &EnrichedRecord| r.desligamento_pct),
    ("Voluntário", |r: &EnrichedRecord| r.voluntario_pct),
    ("Involuntário", |r: &EnrichedRecord| r.involuntario_pct),
];

pub fn kpi_summary(metrics: &[EnrichedRecord]) -> Result<Vec<KpiSummary>, AnalyticsError> {
    KPI_COLUMNS
        .iter()
        .map(|(name, column)| {
            let values: Vec<f64> = metrics.iter().map(column).collect();
            let stats = stats::describe(&values)?;
            Ok(KpiSummary {
                kpi: name.to_string(),
                mean: stats.mean,
                median: stats.median,
                std: stats.std,
                cv: stats.cv,
                min: stats.min,
                max: stats.max,
                count: stats.count,
            })
        })
        .collect()
}

pub fn yearly_summary(metrics: &[EnrichedRecord]) -> Vec<YearlySummary> {
    let mut by_year: BTreeMap<i32, Vec<&EnrichedRecord>> = BTreeMap::new();
    for record in metrics {
        by_year.entry(record.date.year()).or_default().push(record);
    }

    by_year
        .into_iter()
        .map(|(year, rows)| {
            let avg = |column: fn(&EnrichedRecord) -> f64| {
                rows.iter().map(|r| column(r)).sum::<f64>() / rows.len() as f64
            };
            YearlySummary {
                year,
                turnover_rotatividade_pct: avg(KPI_COLUMNS[0].1),
                desligamento_pct: avg(KPI_COLUMNS[1].1),
                voluntario_pct: avg(KPI_COLUMNS[2].1),
                involuntario_pct: avg(KPI_COLUMNS[3].1),
            }
        })
        .collect()
}

/// Mean termination rate per calendar month across all years; months with no data
/// are `None`.
pub fn seasonality(metrics: &[EnrichedRecord]) -> Vec<SeasonalityPoint> {
    (1..=12)
        .map(|month| {
            let values: Vec<f64> = metrics
                .iter()
                .filter(|r| r.month == month)
                .map(|r| r.desligamento_pct)
                .collect();
            SeasonalityPoint {
                month,
                desligamento_pct: (!values.is_empty()).then(|| stats::mean(&values)),
            }
        })
        .collect()
}

pub fn anomalies(metrics: &[EnrichedRecord], z_limit: f64) -> Vec<Anomaly> {
    metrics
        .iter()
        .filter(|r| r.z_desligamento.abs() >= z_limit)
        .map(|r| Anomaly {
            date: r.date,
            desligamento_pct: r.desligamento_pct,
            z_desligamento: r.z_desligamento,
        })
        .collect()
}

pub fn build_report(metrics: &[EnrichedRecord], z_limit: f64) -> Result<String, AnalyticsError> {
    let (first, last) = match (metrics.first(), metrics.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(AnalyticsError::empty("monthly series")),
    };
    let summaries = kpi_summary(metrics)?;
    let yearly = yearly_summary(metrics);
    let seasonal = seasonality(metrics);
    let flagged = anomalies(metrics, z_limit);

    let mut output = String::new();

    let _ = writeln!(output, "# Diagnóstico de Turnover");
    let _ = writeln!(
        output,
        "Período: {} a {} ({} meses)",
        first.date.format("%m/%Y"),
        last.date.format("%m/%Y"),
        metrics.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Método");
    let _ = writeln!(
        output,
        "- HC médio: média entre total(t-1) e total(t); o primeiro mês usa o próprio total"
    );
    let _ = writeln!(
        output,
        "- Turnover (rotatividade) = [(Admissões + Desligamentos) / 2] / HC total do mês"
    );
    let _ = writeln!(output, "- Taxa de desligamento = Desligamentos / HC médio");
    let _ = writeln!(
        output,
        "- Voluntário e involuntário = respectivas saídas / HC médio"
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Estatísticas (%)");
    let _ = writeln!(output, "| KPI | média | mediana | desvio | CV |");
    let _ = writeln!(output, "|---|---|---|---|---|");
    for summary in summaries.iter() {
        let _ = writeln!(
            output,
            "| {} | {:.3} | {:.3} | {:.3} | {:.3} |",
            summary.kpi, summary.mean, summary.median, summary.std, summary.cv
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Resumo Anual (%)");
    for year in yearly.iter() {
        let _ = writeln!(
            output,
            "- {}: turnover {:.2}, desligamento {:.2}, voluntário {:.2}, involuntário {:.2}",
            year.year,
            year.turnover_rotatividade_pct,
            year.desligamento_pct,
            year.voluntario_pct,
            year.involuntario_pct
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Sazonalidade da Taxa de Desligamento");
    for point in seasonal.iter() {
        match point.desligamento_pct {
            Some(value) => {
                let _ = writeln!(output, "- Mês {:02}: {:.2}%", point.month, value);
            }
            None => {
                let _ = writeln!(output, "- Mês {:02}: sem dados", point.month);
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Tendência (MM3)");
    let _ = writeln!(
        output,
        "- Taxa de desligamento em {}: {:.2}%",
        last.date.format("%m/%Y"),
        last.desligamento_ma3
    );
    let _ = writeln!(
        output,
        "- Turnover (rotatividade) em {}: {:.2}%",
        last.date.format("%m/%Y"),
        last.turnover_ma3
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Anomalias (|z| >= {:.1})", z_limit);
    if flagged.is_empty() {
        let _ = writeln!(output, "Nenhum mês fora do padrão.");
    } else {
        for anomaly in flagged.iter() {
            let _ = writeln!(
                output,
                "- {}: desligamento {:.2}% (z = {:.2})",
                anomaly.date.format("%m/%Y"),
                anomaly.desligamento_pct,
                anomaly.z_desligamento
            );
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{compute_metrics, NumericPolicy};

    const FIXTURE: &str = include_str!("../data/turnover_monthly.csv");

    fn metrics() -> Vec<EnrichedRecord> {
        let records = crate::io::read_monthly(FIXTURE.as_bytes()).unwrap();
        compute_metrics(&records, NumericPolicy::Propagate).unwrap()
    }

    #[test]
    fn summary_has_one_row_per_kpi() {
        let summaries = kpi_summary(&metrics()).unwrap();
        let names: Vec<&str> = summaries.iter().map(|s| s.kpi.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Turnover (rotatividade)",
                "Taxa de desligamento",
                "Voluntário",
                "Involuntário"
            ]
        );
        assert!(summaries.iter().all(|s| s.count == 24));
        let desligamento = &summaries[1];
        assert!((desligamento.cv - desligamento.std / desligamento.mean).abs() < 1e-12);
    }

    #[test]
    fn single_month_summary_has_undefined_spread() {
        let summaries = kpi_summary(&metrics()[..1]).unwrap();
        assert!(summaries.iter().all(|s| s.count == 1));
        assert!(summaries.iter().all(|s| s.std.is_nan() && s.cv.is_nan()));
    }

    #[test]
    fn yearly_summary_groups_by_calendar_year() {
        let metrics = metrics();
        let yearly = yearly_summary(&metrics);
        assert_eq!(yearly.len(), 2);
        assert_eq!(yearly[0].year, 2021);
        let expected = metrics[..12].iter().map(|r| r.desligamento_pct).sum::<f64>() / 12.0;
        assert!((yearly[0].desligamento_pct - expected).abs() < 1e-12);
    }

    #[test]
    fn seasonality_averages_across_years() {
        let metrics = metrics();
        let seasonal = seasonality(&metrics);
        assert_eq!(seasonal.len(), 12);
        let expected = (metrics[0].desligamento_pct + metrics[12].desligamento_pct) / 2.0;
        assert_eq!(seasonal[0].desligamento_pct, Some(expected));

        let partial = seasonality(&metrics[..3]);
        assert!(partial[3].desligamento_pct.is_none());
    }

    #[test]
    fn anomalies_respect_limit() {
        let metrics = metrics();
        let flagged = anomalies(&metrics, 2.0);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].date, metrics[9].date);
        assert!(anomalies(&metrics, 10.0).is_empty());
    }

    #[test]
    fn report_covers_every_section() {
        let report = build_report(&metrics(), 2.0).unwrap();
        assert!(report.starts_with("# Diagnóstico de Turnover"));
        assert!(report.contains("Período: 01/2021 a 12/2022 (24 meses)"));
        assert!(report.contains("| Taxa de desligamento |"));
        assert!(report.contains("- 2022: turnover"));
        assert!(report.contains("- Mês 10:"));
        assert!(report.contains("- 10/2021: desligamento 6.34%"));
    }

    #[test]
    fn report_without_anomalies() {
        let report = build_report(&metrics(), 5.0).unwrap();
        assert!(report.contains("Nenhum mês fora do padrão."));
    }
}

use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AnalyticsError;
use crate::models::{MonthlyRecord, ScoredSample};

pub const MONTHLY_COLUMNS: [&str; 6] = [
    "date",
    "total_employees",
    "hires",
    "separations",
    "voluntary",
    "involuntary",
];

pub const PREDICTION_COLUMNS: [&str; 3] = ["id", "y_true", "y_score"];

pub fn load_monthly(path: &Path) -> anyhow::Result<Vec<MonthlyRecord>> {
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open monthly series {}", path.display()))?;
    read_monthly(file).with_context(|| format!("failed to read {}", path.display()))
}

pub fn load_predictions(path: &Path) -> anyhow::Result<Vec<ScoredSample>> {
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open predictions {}", path.display()))?;
    read_predictions(file).with_context(|| format!("failed to read {}", path.display()))
}

pub fn read_monthly<R: Read>(input: R) -> anyhow::Result<Vec<MonthlyRecord>> {
    let mut reader = csv_reader(input);
    require_columns(&mut reader, "monthly series", &MONTHLY_COLUMNS)?;

    let mut records = Vec::new();
    for (line, result) in reader.deserialize::<MonthlyRecord>().enumerate() {
        let record = result.with_context(|| format!("invalid monthly row {}", line + 1))?;
        records.push(record);
    }

    if records.is_empty() {
        return Err(AnalyticsError::empty("monthly series").into());
    }
    debug!(rows = records.len(), "loaded monthly series");
    Ok(records)
}

pub fn read_predictions<R: Read>(input: R) -> anyhow::Result<Vec<ScoredSample>> {
    #[derive(Deserialize)]
    struct CsvRow {
        id: String,
        y_true: i64,
        y_score: f64,
    }

    let mut reader = csv_reader(input);
    require_columns(&mut reader, "predictions", &PREDICTION_COLUMNS)?;

    let mut samples = Vec::new();
    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid prediction row {}", line + 1))?;
        let y_true = match row.y_true {
            0 => false,
            1 => true,
            value => return Err(AnalyticsError::InvalidLabel { value }.into()),
        };
        if !row.y_score.is_finite() {
            return Err(AnalyticsError::NonFiniteScore {
                index: line,
                value: row.y_score,
            }
            .into());
        }
        samples.push(ScoredSample {
            id: row.id,
            y_true,
            y_score: row.y_score,
        });
    }

    if samples.is_empty() {
        return Err(AnalyticsError::empty("predictions").into());
    }
    debug!(rows = samples.len(), "loaded predictions");
    Ok(samples)
}

fn csv_reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input)
}

fn require_columns<R: Read>(
    reader: &mut csv::Reader<R>,
    table: &str,
    required: &[&str],
) -> anyhow::Result<()> {
    let headers = reader.headers()?;
    let missing: Vec<String> = required
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .map(|column| column.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AnalyticsError::MissingColumns {
            table: table.to_string(),
            missing,
        }
        .into())
    }
}

pub fn ensure_outdir(path: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create output directory {}", path.display()))
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    debug!(path = %path.display(), rows = rows.len(), "wrote csv");
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))
}

pub fn write_text(path: &Path, body: &str) -> anyhow::Result<()> {
    fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))
}

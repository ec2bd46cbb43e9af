use chrono::NaiveDate;
use thiserror::Error;

/// Failures raised by the KPI and threshold engines before or during computation.
///
/// Numeric degeneracies (zero headcount, zero variance) are not errors unless the
/// strict numeric policy is selected.
#[derive(Debug, Error, PartialEq)]
pub enum AnalyticsError {
    #[error("{table} is missing required columns: {}", .missing.join(", "))]
    MissingColumns { table: String, missing: Vec<String> },

    #[error("{table} has no rows")]
    EmptyInput { table: String },

    #[error("duplicate month {0} in monthly series")]
    DuplicateDate(NaiveDate),

    #[error("y_true has {labels} values but y_score has {scores}")]
    LengthMismatch { labels: usize, scores: usize },

    #[error("y_true must be 0 or 1, got {value}")]
    InvalidLabel { value: i64 },

    #[error("top-k fraction must be in (0, 1], got {0}")]
    InvalidKFraction(f64),

    #[error("{column} is not finite for {date}")]
    NonFinite { column: &'static str, date: NaiveDate },

    #[error("y_score at index {index} is not finite: {value}")]
    NonFiniteScore { index: usize, value: f64 },
}

impl AnalyticsError {
    pub fn empty(table: &str) -> Self {
        AnalyticsError::EmptyInput {
            table: table.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_lists_every_column() {
        let err = AnalyticsError::MissingColumns {
            table: "predictions".to_string(),
            missing: vec!["id".to_string(), "y_score".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "predictions is missing required columns: id, y_score"
        );
    }

    #[test]
    fn empty_helper_names_table() {
        assert_eq!(
            AnalyticsError::empty("monthly series").to_string(),
            "monthly series has no rows"
        );
    }

    #[test]
    fn non_finite_score_names_index() {
        let err = AnalyticsError::NonFiniteScore {
            index: 3,
            value: f64::INFINITY,
        };
        assert_eq!(err.to_string(), "y_score at index 3 is not finite: inf");
    }
}

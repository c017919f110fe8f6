use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No rows to aggregate")]
    EmptyInput,

    #[error("Cannot form quintiles on {axis} axis: only {distinct} distinct value(s)")]
    DegenerateDistribution { axis: &'static str, distinct: usize },

    #[error("Malformed row {row}: field '{field}' {reason}")]
    MalformedRow {
        row: usize,
        field: &'static str,
        reason: String,
    },

    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DashResult<T> = Result<T, DashError>;

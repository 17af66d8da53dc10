//! Report pipeline: summary statistics, abnormal-reading subsets and plots.
//!
//! Runs once over a loaded table. Any step that needs a column the table does
//! not have fails the whole report.

pub mod plot;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::info;

use crate::data::filter::{self, HIGH_CHOLESTEROL, HYPERTENSION};
use crate::data::loader;
use crate::data::model::{Table, Value};
use crate::data::stats::{self, CorrelationMatrix};

pub const SUMMARY_COLUMNS: &[&str] = &["age", "systolic_bp", "total_cholesterol"];
pub const CORRELATION_COLUMNS: &[&str] = &["age", "systolic_bp", "diastolic_bp", "total_cholesterol"];
pub const DATE_COLUMN: &str = "date";

pub const ABNORMAL_BP_FILE: &str = "abnormal_blood_pressure.csv";
pub const HIGH_CHOLESTEROL_FILE: &str = "high_cholesterol.csv";
pub const TREND_PLOT: &str = "blood_pressure_trend.png";
pub const SYSTOLIC_PLOT: &str = "systolic_bp_distribution.png";
pub const CHOLESTEROL_PLOT: &str = "total_cholesterol_distribution.png";
pub const CORRELATION_PLOT: &str = "correlation_matrix.png";

/// Rows shown when previewing a table on the console.
const PREVIEW_ROWS: usize = 5;

/// What a finished report computed and where it wrote it.
#[derive(Debug, Clone)]
pub struct ReportSummary {
    pub averages: Vec<(String, f64)>,
    pub hypertension_rows: usize,
    pub high_cholesterol_rows: usize,
    pub correlation: CorrelationMatrix,
    pub outputs: Vec<PathBuf>,
}

/// Run every report step in order, writing results under `results_dir`.
pub fn run_report(table: &Table, results_dir: &Path) -> Result<ReportSummary> {
    println!("Dataset Preview:");
    println!("{}", table.head(PREVIEW_ROWS));

    // Summary statistics
    let averages = stats::column_means(table, SUMMARY_COLUMNS)?;
    println!("\nAverage Vitals:");
    let width = averages.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, value) in &averages {
        println!("{name:<width$}  {value:>12.6}");
    }

    // Threshold filters
    let abnormal_bp = filter::select_exceeding_any(table, HYPERTENSION)?;
    let high_chol = filter::select_exceeding_any(table, HIGH_CHOLESTEROL)?;
    println!("\nAbnormal Blood Pressure Readings:");
    println!("{}", abnormal_bp.head(PREVIEW_ROWS));
    println!("\nHigh Cholesterol Readings:");
    println!("{}", high_chol.head(PREVIEW_ROWS));

    std::fs::create_dir_all(results_dir)
        .with_context(|| format!("creating {}", results_dir.display()))?;
    let mut outputs = Vec::new();

    let bp_path = results_dir.join(ABNORMAL_BP_FILE);
    loader::write_csv(&abnormal_bp, &bp_path)?;
    outputs.push(bp_path);
    let chol_path = results_dir.join(HIGH_CHOLESTEROL_FILE);
    loader::write_csv(&high_chol, &chol_path)?;
    outputs.push(chol_path);
    info!(
        "Abnormal readings saved to '{}' ({} blood pressure, {} cholesterol)",
        results_dir.display(),
        abnormal_bp.len(),
        high_chol.len()
    );

    // Trend over time, only for datasets that carry dates
    if table.has_column(DATE_COLUMN) {
        let (dates, systolic) = sorted_by_date(table, "systolic_bp")?;
        let path = results_dir.join(TREND_PLOT);
        plot::time_series(
            &path,
            "Systolic Blood Pressure Over Time",
            "Systolic Blood Pressure",
            &dates,
            &systolic,
        )?;
        outputs.push(path);
    }

    // Distributions
    let path = results_dir.join(SYSTOLIC_PLOT);
    plot::boxplot(
        &path,
        "Systolic Blood Pressure Distribution",
        "systolic_bp",
        &table.numeric("systolic_bp")?,
    )?;
    outputs.push(path);

    let path = results_dir.join(CHOLESTEROL_PLOT);
    plot::histogram_with_kde(
        &path,
        "Total Cholesterol Distribution",
        "total_cholesterol",
        &table.numeric("total_cholesterol")?,
    )?;
    outputs.push(path);

    // Correlation
    let correlation = CorrelationMatrix::compute(table, CORRELATION_COLUMNS)?;
    println!("\nCorrelation Matrix:");
    println!("{correlation}");
    let path = results_dir.join(CORRELATION_PLOT);
    plot::correlation_heatmap(&path, "Correlation Matrix of Vitals", &correlation)?;
    outputs.push(path);

    info!(
        "Analysis completed. Check the '{}' folder for outputs.",
        results_dir.display()
    );

    Ok(ReportSummary {
        averages,
        hypertension_rows: abnormal_bp.len(),
        high_cholesterol_rows: high_chol.len(),
        correlation,
        outputs,
    })
}

/// Dates and `column` values ordered by date; rows without a date are dropped.
fn sorted_by_date(table: &Table, column: &str) -> Result<(Vec<NaiveDateTime>, Vec<f64>)> {
    let values = table.numeric(column)?;
    let dates = &table.column(DATE_COLUMN)?.values;

    let mut rows = Vec::with_capacity(values.len());
    for (row, (date, value)) in dates.iter().zip(values).enumerate() {
        let parsed = match date {
            Value::Null => continue,
            Value::String(s) => parse_date(s)
                .with_context(|| format!("column '{DATE_COLUMN}' row {row}: '{s}' is not a date"))?,
            // Compact dates such as 20240131 load as integers.
            Value::Integer(i) => parse_date(&i.to_string())
                .with_context(|| format!("column '{DATE_COLUMN}' row {row}: '{i}' is not a date"))?,
            other => bail!("column '{DATE_COLUMN}' row {row}: '{other}' is not a date"),
        };
        rows.push((parsed, value));
    }
    rows.sort_by_key(|(date, _)| *date);
    Ok(rows.into_iter().unzip())
}

/// Accepts RFC 3339, ISO dates and datetimes, compact `YYYYMMDD` and
/// US-style `m/d/Y` dates.
pub fn parse_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%m/%d/%Y"];

    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use super::model::{Column, Table, Value};

/// File extensions recognised as tabular data.
pub const TABULAR_EXTENSIONS: &[&str] = &["csv"];

/// Cell spellings read as missing values, besides the empty cell.
pub const NA_VALUES: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

/// Whether `path` has a recognised tabular-file extension.
pub fn is_tabular(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            TABULAR_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Regular files directly inside `dir` with a tabular extension, in the order
/// the directory listing yields them.
pub fn find_tabular_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_tabular(&path) {
            found.push(path);
        }
    }
    Ok(found)
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one record per row.
/// Cell types are guessed per value, with empty cells and [`NA_VALUES`] read
/// as null; a column mixing integers and floats is widened to floats.
fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening CSV {}", path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        bail!("{}: no columns to parse", path.display());
    }

    let mut values: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        for (col_idx, field) in record.iter().enumerate() {
            values[col_idx].push(guess_value_type(field));
        }
    }

    let columns = headers
        .into_iter()
        .zip(values)
        .map(|(name, mut vals)| {
            widen_numeric(&mut vals);
            Column::new(name, vals)
        })
        .collect();

    Ok(Table::new(columns)?)
}

fn guess_value_type(s: &str) -> Value {
    let s = s.trim();
    if s.is_empty() || NA_VALUES.contains(&s) {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return Value::Float(f);
    }
    match s {
        "true" | "True" | "TRUE" => Value::Bool(true),
        "false" | "False" | "FALSE" => Value::Bool(false),
        _ => Value::String(s.to_string()),
    }
}

/// Promote integers to floats when a column holds both.
fn widen_numeric(values: &mut [Value]) {
    let mut has_float = false;
    for v in values.iter() {
        match v {
            Value::Float(_) => has_float = true,
            Value::Integer(_) | Value::Null => {}
            _ => return,
        }
    }
    if !has_float {
        return;
    }
    for v in values.iter_mut() {
        if let Value::Integer(i) = *v {
            *v = Value::Float(i as f64);
        }
    }
}

// ---------------------------------------------------------------------------
// CSV writer
// ---------------------------------------------------------------------------

/// Write `table` as CSV: header row, then data rows, no index column.
pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer
        .write_record(table.column_names())
        .context("writing CSV header")?;
    for row in 0..table.len() {
        let fields: Vec<String> = table.row(row).map(|v| v.to_field()).collect();
        writer
            .write_record(&fields)
            .with_context(|| format!("writing CSV row {row}"))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

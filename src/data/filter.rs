use super::model::{Table, TableError};

// ---------------------------------------------------------------------------
// Threshold predicates
// ---------------------------------------------------------------------------

/// `column > cutoff`. NaN (missing) values never pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub column: &'static str,
    pub cutoff: f64,
}

impl Threshold {
    pub const fn above(column: &'static str, cutoff: f64) -> Self {
        Threshold { column, cutoff }
    }
}

/// Hypertension: systolic above 140 mmHg or diastolic above 90 mmHg.
pub const HYPERTENSION: &[Threshold] = &[
    Threshold::above("systolic_bp", 140.0),
    Threshold::above("diastolic_bp", 90.0),
];

/// High cholesterol: total cholesterol above 200 mg/dL.
pub const HIGH_CHOLESTEROL: &[Threshold] = &[Threshold::above("total_cholesterol", 200.0)];

/// Return indices of rows where at least one threshold is exceeded.
///
/// Every referenced column must exist and be numeric, even if an earlier
/// threshold already matched all rows.
pub fn rows_exceeding_any(table: &Table, thresholds: &[Threshold]) -> Result<Vec<usize>, TableError> {
    let columns = thresholds
        .iter()
        .map(|t| table.numeric(t.column).map(|vals| (vals, t.cutoff)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((0..table.len())
        .filter(|&row| columns.iter().any(|(vals, cutoff)| vals[row] > *cutoff))
        .collect())
}

/// Subset of `table` with the rows exceeding any threshold, original order kept.
pub fn select_exceeding_any(table: &Table, thresholds: &[Threshold]) -> Result<Table, TableError> {
    let rows = rows_exceeding_any(table, thresholds)?;
    Ok(table.take(&rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, Value};

    fn table(cols: &[(&str, &[f64])]) -> Table {
        Table::new(
            cols.iter()
                .map(|(name, vals)| {
                    Column::new(*name, vals.iter().map(|&v| Value::Float(v)).collect())
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_hypertension_either_reading() {
        let t = table(&[
            ("systolic_bp", &[130.0, 150.0, 120.0, 140.0]),
            ("diastolic_bp", &[80.0, 85.0, 95.0, 90.0]),
        ]);
        // Thresholds are strict: exactly 140/90 is not flagged.
        assert_eq!(rows_exceeding_any(&t, HYPERTENSION).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_high_cholesterol() {
        let t = table(&[("total_cholesterol", &[190.0, 210.0, 200.0, f64::NAN])]);
        assert_eq!(rows_exceeding_any(&t, HIGH_CHOLESTEROL).unwrap(), vec![1]);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let t = table(&[("systolic_bp", &[150.0])]);
        let err = rows_exceeding_any(&t, HYPERTENSION).unwrap_err();
        assert!(matches!(err, TableError::MissingColumn { ref name, .. } if name == "diastolic_bp"));
    }

    #[test]
    fn test_select_keeps_all_columns() {
        let t = table(&[
            ("age", &[30.0, 50.0]),
            ("total_cholesterol", &[190.0, 210.0]),
        ]);
        let subset = select_exceeding_any(&t, HIGH_CHOLESTEROL).unwrap();
        assert_eq!(subset.len(), 1);
        assert_eq!(subset.column_names(), vec!["age", "total_cholesterol"]);
        assert_eq!(subset.column("age").unwrap().values, vec![Value::Float(50.0)]);
    }
}

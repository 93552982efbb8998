use crate::models::Table;

use super::types::ColumnType;

/// A column is numeric when every non-missing value reads as a finite
/// number. Columns with no such values at all are categorical.
pub fn infer_column_type(table: &Table, column: &str) -> ColumnType {
    let mut seen = 0usize;
    let all_numeric = table
        .column_values(column)
        .flatten()
        .filter(|value| !value.is_missing())
        .all(|value| {
            seen += 1;
            value.as_number().is_some()
        });

    if all_numeric && seen > 0 {
        ColumnType::Numeric
    } else {
        ColumnType::Categorical
    }
}

/// Finite numeric values of a column in row order. Missing and
/// non-numeric entries are skipped.
pub fn numeric_values(table: &Table, column: &str) -> Vec<f64> {
    table
        .column_values(column)
        .flatten()
        .filter_map(|value| value.as_number())
        .collect()
}

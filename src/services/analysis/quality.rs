use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use rayon::prelude::*;

use crate::models::{CellValue, Table};

use super::inference::infer_column_type;
use super::types::{ColumnMap, ColumnProfile, QualityMetrics, QualityReport, ValueCount};

/// Quality counters over a column's raw values, one entry per row, where
/// `None` stands for a row without the key.
pub fn quality_metrics<'a, I>(values: I) -> QualityMetrics
where
    I: IntoIterator<Item = Option<&'a CellValue>>,
{
    let mut metrics = QualityMetrics::default();
    let mut occurrences: HashMap<Cow<'a, str>, usize> = HashMap::new();

    for value in values {
        match value {
            None | Some(CellValue::Null) => {
                metrics.null_count += 1;
                metrics.missing_count += 1;
            }
            Some(v) if v.is_missing() => metrics.missing_count += 1,
            Some(v) => *occurrences.entry(v.canonical()).or_insert(0) += 1,
        }
    }

    metrics.unique_count = occurrences.len();
    metrics.duplicate_count = occurrences.values().map(|n| n.saturating_sub(1)).sum();
    metrics
}

pub fn profile_column(table: &Table, column: &str) -> ColumnProfile {
    ColumnProfile {
        name: column.to_string(),
        column_type: infer_column_type(table, column),
        metrics: quality_metrics(table.column_values(column)),
    }
}

/// Profiles every column of the first row, in column order.
pub fn profile_columns(table: &Table) -> Vec<ColumnProfile> {
    let columns = table.columns();
    columns
        .par_iter()
        .map(|column| profile_column(table, column))
        .collect()
}

pub fn analyze_quality(table: &Table) -> QualityReport {
    let profiles = profile_columns(table);
    let by_column = |f: fn(&QualityMetrics) -> usize| -> ColumnMap<usize> {
        profiles
            .iter()
            .map(|p| (p.name.as_str(), f(&p.metrics)))
            .collect()
    };

    QualityReport {
        unique_counts: by_column(|m| m.unique_count),
        duplicate_counts: by_column(|m| m.duplicate_count),
        missing_counts: by_column(|m| m.missing_count),
        null_counts: by_column(|m| m.null_count),
        total_rows: table.row_count(),
    }
}

/// Kind tag plus canonical text, so `1` and `"1"` stay apart in row keys.
fn key_part(value: Option<&CellValue>) -> (u8, Cow<'_, str>) {
    match value {
        None | Some(CellValue::Null) => (0, Cow::Borrowed("")),
        Some(v) => {
            let tag = match v {
                CellValue::Bool(_) => 1,
                CellValue::Number(_) => 2,
                _ => 3,
            };
            (tag, v.canonical())
        }
    }
}

/// Rows that repeat an earlier row when only `columns` are compared. An
/// empty projection compares nothing and reports no duplicates.
pub fn count_duplicate_rows(table: &Table, columns: &[&str]) -> usize {
    if columns.is_empty() {
        return 0;
    }

    let distinct: HashSet<Vec<(u8, Cow<'_, str>)>> = table
        .rows()
        .iter()
        .map(|row| columns.iter().map(|c| key_part(row.get(c))).collect())
        .collect();

    table.row_count() - distinct.len()
}

//! Column profiling for uploaded tables: type inference, numeric
//! summaries and data-quality counters.
//!
//! Everything here is a pure function of the table it is handed.

pub mod inference;
pub mod quality;
pub mod statistics;
pub mod types;

use std::borrow::Cow;
use std::collections::HashMap;

use smallvec::SmallVec;

use crate::error::AppError;
use crate::models::{CellValue, Table};

pub use inference::{infer_column_type, numeric_values};
pub use quality::{analyze_quality, count_duplicate_rows, profile_column, profile_columns, quality_metrics};
pub use statistics::describe_numeric;
pub use types::*;

/// Rejects tables that cannot be analyzed at all.
pub fn validate_table(table: &Table) -> Result<(), AppError> {
    match table.rows().first() {
        None => Err(AppError::NotFound("Dataset not found or empty".to_string())),
        Some(row) if row.is_empty() => Err(AppError::InvalidFormat("Invalid dataset format".to_string())),
        Some(_) => Ok(()),
    }
}

pub fn list_columns(table: &Table) -> ColumnListing {
    let profiles = profile_columns(table);

    ColumnListing {
        columns: profiles.iter().map(|p| p.name.clone()).collect(),
        column_types: profiles.iter().map(|p| (p.name.as_str(), p.column_type)).collect(),
        total_columns: profiles.len(),
        column_info: profiles
            .into_iter()
            .map(|p| ColumnInfo {
                missing_count: p.metrics.missing_count,
                unique_count: p.metrics.unique_count,
                column_type: p.column_type,
                name: p.name,
            })
            .collect(),
    }
}

/// Numeric summaries for the given columns. Columns without a single
/// numeric value are left out.
pub fn describe_columns(table: &Table, columns: &[&str]) -> ColumnMap<NumericSummary> {
    columns
        .iter()
        .filter_map(|&column| {
            let values = numeric_values(table, column);
            describe_numeric(&values).map(|summary| (column, summary))
        })
        .collect()
}

pub fn dataset_quality_metrics(table: &Table, columns: &[&str]) -> DatasetQualityMetrics {
    let profiles: Vec<ColumnProfile> = columns
        .iter()
        .map(|column| profile_column(table, column))
        .collect();
    let numeric_columns = profiles
        .iter()
        .filter(|p| p.column_type == ColumnType::Numeric)
        .count();

    DatasetQualityMetrics {
        total_rows: table.row_count(),
        total_columns: columns.len(),
        null_values: profiles.iter().map(|p| p.metrics.null_count).sum(),
        missing_values: profiles.iter().map(|p| p.metrics.missing_count).sum(),
        duplicate_rows: count_duplicate_rows(table, columns),
        numeric_columns,
        categorical_columns: profiles.len() - numeric_columns,
    }
}

/// Detailed view of one column.
pub fn analyze_column(table: &Table, column: &str) -> Result<ColumnAnalysis, AppError> {
    if !table.has_column(column) {
        return Err(AppError::NotFound(format!("Column '{}' not found in dataset", column)));
    }

    let profile = profile_column(table, column);
    let present: Vec<_> = table
        .column_values(column)
        .flatten()
        .filter(|v| !v.is_missing())
        .collect();

    let sample_values: SmallVec<[CellValue; SAMPLE_SIZE]> = present
        .iter()
        .take(SAMPLE_SIZE)
        .map(|&v| v.clone())
        .collect();

    let (numeric_stats, most_common) = match profile.column_type {
        ColumnType::Numeric => (describe_numeric(&numeric_values(table, column)), Vec::new()),
        ColumnType::Categorical => (None, most_common(&present)),
    };

    Ok(ColumnAnalysis {
        column_name: profile.name,
        column_type: profile.column_type,
        total_values: present.len(),
        unique_values: profile.metrics.unique_count,
        missing_values: profile.metrics.missing_count,
        duplicate_values: profile.metrics.duplicate_count,
        sample_values,
        numeric_stats,
        most_common,
    })
}

/// Top values by count; ties keep first appearance.
fn most_common(values: &[&CellValue]) -> Vec<ValueCount> {
    let mut index: HashMap<Cow<'_, str>, usize> = HashMap::new();
    let mut counts: Vec<ValueCount> = Vec::new();

    for &value in values {
        match index.get(&value.canonical()) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(value.canonical(), counts.len());
                counts.push(ValueCount { value: value.clone(), count: 1 });
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(MOST_COMMON_SIZE);
    counts
}

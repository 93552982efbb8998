use indexmap::IndexMap;
use serde::Serialize;
use smallvec::SmallVec;

use crate::models::CellValue;

pub const SAMPLE_SIZE: usize = 5;
pub const MOST_COMMON_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Categorical,
}

/// Descriptive statistics over the numeric values of one column.
///
/// `std` is the population standard deviation and the quartiles use
/// linear interpolation between closest ranks.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: f64,
    #[serde(rename = "std")]
    pub std_dev: f64,
    pub min: f64,
    #[serde(rename = "25%")]
    pub p25: f64,
    #[serde(rename = "50%")]
    pub p50: f64,
    #[serde(rename = "75%")]
    pub p75: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QualityMetrics {
    pub unique_count: usize,
    pub duplicate_count: usize,
    pub missing_count: usize,
    pub null_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProfile {
    pub name: String,
    pub column_type: ColumnType,
    pub metrics: QualityMetrics,
}

/// Column name to value, serialized as a JSON object in column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ColumnMap<T>(IndexMap<String, T>);

impl<T> ColumnMap<T> {
    pub fn new() -> Self {
        ColumnMap(IndexMap::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: T) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<T> Default for ColumnMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, T> FromIterator<(K, T)> for ColumnMap<T> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        ColumnMap(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct QualityReport {
    pub unique_counts: ColumnMap<usize>,
    pub duplicate_counts: ColumnMap<usize>,
    pub missing_counts: ColumnMap<usize>,
    pub null_counts: ColumnMap<usize>,
    pub total_rows: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub missing_count: usize,
    pub unique_count: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ColumnListing {
    pub columns: Vec<String>,
    pub column_types: ColumnMap<ColumnType>,
    pub total_columns: usize,
    pub column_info: Vec<ColumnInfo>,
}

/// Dataset-wide counters shown next to the describe table.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetQualityMetrics {
    pub total_rows: usize,
    pub total_columns: usize,
    pub null_values: usize,
    pub missing_values: usize,
    pub duplicate_rows: usize,
    pub numeric_columns: usize,
    pub categorical_columns: usize,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ValueCount {
    pub value: CellValue,
    pub count: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ColumnAnalysis {
    pub column_name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub total_values: usize,
    pub unique_values: usize,
    pub missing_values: usize,
    pub duplicate_values: usize,
    pub sample_values: SmallVec<[CellValue; SAMPLE_SIZE]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_stats: Option<NumericSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub most_common: Vec<ValueCount>,
}

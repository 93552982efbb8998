use std::collections::HashSet;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use bytes::Bytes;
use calamine::{open_workbook_from_rs, Data, Ods, Reader, Xls, Xlsb, Xlsx};
use csv::ReaderBuilder;

use crate::error::AppError;
use crate::models::{CellValue, Row, Table};

pub const ALLOWED_EXTENSIONS: [&str; 6] = ["csv", "xlsx", "xlsm", "xls", "xlsb", "ods"];

/// Decodes an uploaded file into a table, picking the reader from the
/// file extension.
pub fn parse_upload(filename: &str, file_data: Bytes) -> Result<Table, AppError> {
    let start = std::time::Instant::now();
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();

    tracing::info!("Parsing {} ({} bytes) as {}", filename, file_data.len(), extension);

    let table = match extension.as_str() {
        "csv" => parse_csv(&file_data)?,
        "xlsx" | "xlsm" => {
            let workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(file_data))
                .map_err(|e| open_error(filename, e))?;
            read_first_sheet::<Cursor<Bytes>, _>(workbook)?
        }
        "xls" => {
            let workbook: Xls<_> = open_workbook_from_rs(Cursor::new(file_data))
                .map_err(|e| open_error(filename, e))?;
            read_first_sheet::<Cursor<Bytes>, _>(workbook)?
        }
        "xlsb" => {
            let workbook: Xlsb<_> = open_workbook_from_rs(Cursor::new(file_data))
                .map_err(|e| open_error(filename, e))?;
            read_first_sheet::<Cursor<Bytes>, _>(workbook)?
        }
        "ods" => {
            let workbook: Ods<_> = open_workbook_from_rs(Cursor::new(file_data))
                .map_err(|e| open_error(filename, e))?;
            read_first_sheet::<Cursor<Bytes>, _>(workbook)?
        }
        _ => {
            tracing::error!("Unsupported file type: {}", filename);
            return Err(AppError::InvalidInput(format!(
                "Unsupported file format. Allowed formats: {}",
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }
    };

    if table.is_empty() {
        tracing::warn!("{} contains no data rows", filename);
        return Err(AppError::InvalidInput("File contains no data rows".to_string()));
    }

    tracing::info!(
        "Parsed {} rows x {} columns in {:?}",
        table.row_count(),
        table.columns().len(),
        start.elapsed()
    );
    Ok(table)
}

fn open_error(filename: &str, err: impl std::fmt::Display) -> AppError {
    tracing::error!("Failed to open workbook {}: {}", filename, err);
    AppError::FileProcessingError(format!("Failed to open workbook: {}", err))
}

/// CSV cells stay as text; type inference happens later.
fn parse_csv(data: &[u8]) -> Result<Table, AppError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let mut existing_names = HashSet::new();
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, name)| unique_header(name.trim_start_matches('\u{feff}'), idx, &mut existing_names))
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(name, value)| (name.as_str(), CellValue::Text(value.to_string())))
            .collect();
        rows.push(row);
    }

    Ok(Table::new(rows))
}

fn read_first_sheet<RS, R>(mut workbook: R) -> Result<Table, AppError>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: std::fmt::Display,
{
    let sheet_names = workbook.sheet_names().to_vec();
    tracing::info!("Found {} sheets: {:?}", sheet_names.len(), sheet_names);

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::FileProcessingError("No sheets found in workbook".to_string()))?
        .map_err(|e| AppError::FileProcessingError(format!("Failed to read worksheet: {}", e)))?;

    let mut rows = range.rows();
    let mut existing_names = HashSet::new();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .enumerate()
            .map(|(idx, cell)| unique_header(&cell.to_string(), idx, &mut existing_names))
            .collect(),
        None => return Ok(Table::default()),
    };

    let table = rows
        .filter(|cells| cells.iter().any(|cell| !matches!(cell, Data::Empty)))
        .map(|cells| {
            headers
                .iter()
                .zip(cells.iter())
                .filter_map(|(name, cell)| cell_value(cell).map(|value| (name.as_str(), value)))
                .collect::<Row>()
        })
        .collect();

    Ok(table)
}

/// Empty cells become absent keys rather than nulls.
fn cell_value(cell: &Data) -> Option<CellValue> {
    match cell {
        Data::Empty => None,
        Data::Int(i) => Some(CellValue::Number(*i as f64)),
        Data::Float(f) => Some(CellValue::Number(*f)),
        Data::Bool(b) => Some(CellValue::Bool(*b)),
        Data::String(s) => Some(CellValue::Text(s.clone())),
        Data::DateTime(d) => Some(CellValue::Number(d.as_f64())),
        other => Some(CellValue::Text(other.to_string())),
    }
}

/// Blank headers get a positional name; repeats get a numeric suffix.
pub fn unique_header(name: &str, idx: usize, existing_names: &mut HashSet<String>) -> String {
    let trimmed = name.trim();
    let base_name = if trimmed.is_empty() {
        format!("column_{}", idx + 1)
    } else {
        trimmed.to_string()
    };

    let mut candidate = base_name.clone();
    let mut counter = 1;
    while !existing_names.insert(candidate.clone()) {
        candidate = format!("{}_{}", base_name, counter);
        counter += 1;
    }

    candidate
}

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use calamine::{open_workbook_auto, DataType, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::{ConvertError, Result};

/// A single spreadsheet value, independent of the file format it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Text cells are trimmed; blank text collapses to `Empty`, numbers are
    /// typed the way a spreadsheet would infer them.
    pub fn from_text(raw: &str) -> Self {
        let value = raw.trim();
        if value.is_empty() {
            return Cell::Empty;
        }
        if let Ok(int) = value.parse::<i64>() {
            return Cell::Int(int);
        }
        match value.parse::<f64>() {
            Ok(float) if float.is_finite() => Cell::Float(float),
            _ => Cell::Text(value.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(value) => value.trim().is_empty(),
            _ => false,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Cell::Int(_) | Cell::Float(_))
    }

    /// Trimmed text rendering; empty cells render as "".
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(value) => value.trim().to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Int(value) => write!(f, "{value}"),
            Cell::Float(value) => write!(f, "{value}"),
            Cell::Bool(value) => write!(f, "{value}"),
            Cell::Text(value) => f.write_str(value),
            Cell::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SheetRow {
    /// 1-based line in the source file, for diagnostics.
    pub line: usize,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<SheetRow>,
}

impl Sheet {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Fails with the list of columns actually present when any required
    /// column is absent.
    pub fn require_columns(&self, required: &[&str]) -> Result<()> {
        for column in required {
            if self.column_index(column).is_none() {
                return Err(ConvertError::MissingRequiredColumn {
                    column: column.to_string(),
                    present: self.headers.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Days since the Excel epoch (1899-12-30, which absorbs the 1900 leap-year
/// bug for every date after February 1900).
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = serial.trunc() as i64;
    let seconds = (serial.fract() * 86_400.0).round() as i64;
    Some(epoch + Duration::days(days) + Duration::seconds(seconds))
}

/// Reads the first worksheet of `path`. `header_row` is the 0-based row that
/// carries the column names; rows above it are captions and are ignored.
pub fn read_sheet(path: &Path, header_row: usize) -> Result<Sheet> {
    if !path.exists() {
        return Err(ConvertError::MissingInputFile {
            path: path.to_path_buf(),
        });
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let raw_rows = match extension.as_str() {
        "csv" => read_csv_rows(path)?,
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook_rows(path)?,
        _ => {
            return Err(ConvertError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };

    build_sheet(raw_rows, header_row)
}

/// `raw_rows[i]` is line `i + 1` of the file, blank lines included, so
/// `header_row` always counts from the top of the file.
fn build_sheet(raw_rows: Vec<Vec<Cell>>, header_row: usize) -> Result<Sheet> {
    let mut rows_iter = raw_rows.into_iter().enumerate().skip(header_row);
    let header_cells = match rows_iter.next() {
        Some((_, cells)) if !cells.iter().all(Cell::is_empty) => cells,
        _ => {
            return Err(ConvertError::EmptySheet {
                line: header_row + 1,
            })
        }
    };

    let mut headers: Vec<String> = header_cells.iter().map(Cell::as_text).collect();
    let mut rows = Vec::new();
    for (index, cells) in rows_iter {
        if cells.iter().all(Cell::is_empty) {
            continue;
        }
        rows.push(SheetRow {
            line: index + 1,
            cells,
        });
    }

    align_row_lengths(&mut headers, &mut rows);
    dedupe_headers(&mut headers);
    Ok(Sheet { headers, rows })
}

fn align_row_lengths(headers: &mut Vec<String>, rows: &mut [SheetRow]) {
    let column_count = rows
        .iter()
        .map(|row| row.cells.len())
        .chain(std::iter::once(headers.len()))
        .max()
        .unwrap_or(0);

    // Unnamed columns keep a stable, distinct key.
    for index in headers.len()..column_count {
        headers.push(format!("Unnamed: {index}"));
    }
    for (index, header) in headers.iter_mut().enumerate() {
        if header.is_empty() {
            *header = format!("Unnamed: {index}");
        }
    }

    for row in rows.iter_mut() {
        row.cells.resize(column_count, Cell::Empty);
    }
}

/// Repeated headers become `name.1`, `name.2`, ... so no column is lost
/// when rows are keyed by header.
fn dedupe_headers(headers: &mut [String]) {
    let taken: HashSet<String> = headers.iter().cloned().collect();
    let mut used: HashSet<String> = HashSet::with_capacity(headers.len());

    for header in headers.iter_mut() {
        if used.contains(header.as_str()) {
            let mut suffix = 1;
            let renamed = loop {
                let candidate = format!("{header}.{suffix}");
                if !used.contains(&candidate) && !taken.contains(&candidate) {
                    break candidate;
                }
                suffix += 1;
            };
            *header = renamed;
        }
        used.insert(header.clone());
    }
}

fn read_csv_rows(path: &Path) -> Result<Vec<Vec<Cell>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|err| ConvertError::Spreadsheet(err.to_string()))?;

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| ConvertError::Spreadsheet(err.to_string()))?;
        // the reader drops blank lines; keep their slots
        let line = record
            .position()
            .map(|position| position.line() as usize)
            .unwrap_or(rows.len() + 1);
        while rows.len() + 1 < line {
            rows.push(Vec::new());
        }
        rows.push(record.iter().map(Cell::from_text).collect());
    }
    Ok(rows)
}

fn read_workbook_rows(path: &Path) -> Result<Vec<Vec<Cell>>> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|err| ConvertError::Spreadsheet(format!("unable to open workbook: {err}")))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ConvertError::Spreadsheet("the workbook has no worksheets".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .ok_or_else(|| ConvertError::Spreadsheet(format!("unable to read worksheet '{sheet_name}'")))?
        .map_err(|err| ConvertError::Spreadsheet(format!("unable to read worksheet data: {err}")))?;

    // The range starts at the first used row; leading blank rows are padded
    // back in.
    let start_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row];
    rows.extend(
        range
            .rows()
            .map(|row| row.iter().map(workbook_cell).collect::<Vec<_>>()),
    );
    Ok(rows)
}

fn workbook_cell(cell: &DataType) -> Cell {
    match cell {
        DataType::Empty => Cell::Empty,
        DataType::Int(value) => Cell::Int(*value),
        DataType::Float(value) => Cell::Float(*value),
        DataType::Bool(value) => Cell::Bool(*value),
        DataType::String(value) => {
            let value = value.trim();
            if value.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(value.to_string())
            }
        }
        DataType::DateTime(serial) => excel_serial_to_datetime(*serial)
            .map(Cell::DateTime)
            .unwrap_or(Cell::Float(*serial)),
        DataType::DateTimeIso(text) => NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
            .map(Cell::DateTime)
            .unwrap_or_else(|_| Cell::from_text(text)),
        DataType::Error(_) => Cell::Empty,
        other => Cell::from_text(&other.to_string()),
    }
}

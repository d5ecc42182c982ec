// src/sheet/mod.rs
use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::LetterError;

pub mod columns;

pub use columns::{ColumnIndex, Field, FieldKind, FIELDS};

/// A single spreadsheet cell, reduced to the shapes the mapper cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

static EMPTY_CELL: CellValue = CellValue::Empty;

/// One data row of the sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// 1-based row number as shown in the spreadsheet (the header is row 1).
    pub number: usize,
    pub cells: Vec<CellValue>,
}

impl Row {
    /// Cell at `col`; positions past the end of a short row read as empty.
    pub fn get(&self, col: usize) -> &CellValue {
        self.cells.get(col).unwrap_or(&EMPTY_CELL)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Column names from the first row of the sheet, in sheet order.
    pub headers: Vec<String>,
    /// Every non-blank row after the header.
    pub rows: Vec<Row>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Load one worksheet of an `.xls`/`.xlsx`/`.xlsb`/`.ods` workbook.
///
/// `sheet` picks a worksheet by name; `None` takes the first one. The first row
/// of the used range is the header; fully blank rows below it are dropped.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_table<P: AsRef<Path>>(path: P, sheet: Option<&str>) -> Result<Table> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook: {:?}", path))?;

    let sheet_name = match sheet {
        Some(name) => {
            if !workbook.sheet_names().iter().any(|s| s == name) {
                return Err(LetterError::SheetNotFound(name.to_string()).into());
            }
            name.to_string()
        }
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(LetterError::EmptyWorkbook)?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("Failed to read worksheet {:?} in {:?}", sheet_name, path))?;

    // Used range may start below row 1 when the sheet has leading blank rows.
    let first_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(header_row) => header_row.iter().map(header_text).collect(),
        None => Vec::new(),
    };

    let mut rows = Vec::with_capacity(range.height().saturating_sub(1));
    for (idx, raw) in rows_iter.enumerate() {
        let number = first_row + idx + 2;
        let cells: Vec<CellValue> = raw.iter().map(|d| cell_value(d, number)).collect();
        if cells.iter().all(CellValue::is_empty) {
            debug!(row = number, "skipping blank row");
            continue;
        }
        rows.push(Row { number, cells });
    }

    info!(
        sheet = %sheet_name,
        columns = headers.len(),
        rows = rows.len(),
        "loaded worksheet"
    );
    Ok(Table { headers, rows })
}

fn header_text(data: &Data) -> String {
    match data {
        Data::String(s) => s.clone(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Convert a calamine cell into a [`CellValue`].
fn cell_value(data: &Data, row: usize) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => CellValue::Date(ndt),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => parse_iso(s)
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => {
            warn!(row, error = ?e, "error cell read as empty");
            CellValue::Empty
        }
    }
}

fn parse_iso(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// src/mapping.rs
use std::collections::BTreeMap;
use std::fmt;

use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::LetterError;
use crate::sheet::{CellValue, ColumnIndex, FieldKind, Row};

/// Prefix every template token carries, e.g. `{input_name}`.
pub const TOKEN_PREFIX: &str = "input_";

/// Text layouts accepted for dates typed into the sheet as plain text.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%Y/%m/%d"];

/// A value substituted into a template marker.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceholderValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl PlaceholderValue {
    fn empty() -> Self {
        PlaceholderValue::Text(String::new())
    }
}

impl fmt::Display for PlaceholderValue {
    /// Text verbatim, whole numbers without a fraction, other numbers with two
    /// decimals, dates as `DD-MM-YYYY`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceholderValue::Text(s) => f.write_str(s),
            PlaceholderValue::Number(n) if !n.is_finite() => Ok(()),
            // `+ 0.0` turns -0.0 into 0.0
            PlaceholderValue::Number(n) if n.fract() == 0.0 => write!(f, "{:.0}", n + 0.0),
            PlaceholderValue::Number(n) => {
                let cents = (n * 100.0).round() / 100.0 + 0.0;
                write!(f, "{:.2}", cents)
            }
            PlaceholderValue::Date(d) => write!(f, "{}", d.format("%d-%m-%Y")),
        }
    }
}

/// Token name → value for one row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placeholders {
    values: BTreeMap<String, PlaceholderValue>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the mapping for one validated row.
    pub fn from_row(row: &Row, columns: &ColumnIndex) -> Result<Self> {
        let mut out = Self::new();
        for (field, idx) in columns.fields() {
            let cell = row.get(idx);
            let value = match field.kind {
                FieldKind::Date => date_value(cell, row.number)?,
                FieldKind::Amount => amount_value(cell),
                FieldKind::Text => passthrough(cell),
            };
            out.insert(field.token, value);
        }
        Ok(out)
    }

    /// Insert under `token` (without prefix); the stored key gets `input_`.
    pub fn insert(&mut self, token: &str, value: PlaceholderValue) {
        self.values.insert(format!("{}{}", TOKEN_PREFIX, token), value);
    }

    /// Look up by full token name, e.g. `input_name`.
    pub fn get(&self, key: &str) -> Option<&PlaceholderValue> {
        self.values.get(key)
    }

    /// Display form of a token's value, empty when unmapped.
    pub fn display(&self, key: &str) -> String {
        self.get(key).map(ToString::to_string).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `({key}, value)` pairs ready for substitution.
    pub fn markers(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|(k, v)| (format!("{{{}}}", k), v.to_string()))
            .collect()
    }
}

fn passthrough(cell: &CellValue) -> PlaceholderValue {
    match cell {
        CellValue::Empty => PlaceholderValue::empty(),
        CellValue::Text(s) => PlaceholderValue::Text(s.clone()),
        CellValue::Number(n) => PlaceholderValue::Number(*n),
        CellValue::Bool(b) => PlaceholderValue::Text(if *b { "TRUE" } else { "FALSE" }.into()),
        CellValue::Date(dt) => PlaceholderValue::Date(dt.date()),
    }
}

/// Pay components: numbers typed as text (`"12,500"`, `" 800 "`) become
/// numbers so they format like numeric cells; other text passes through.
fn amount_value(cell: &CellValue) -> PlaceholderValue {
    match cell {
        CellValue::Text(s) => {
            let digits: String = s.trim().chars().filter(|c| *c != ',').collect();
            match digits.parse::<f64>() {
                Ok(n) if n.is_finite() => PlaceholderValue::Number(n),
                _ => PlaceholderValue::Text(s.clone()),
            }
        }
        other => passthrough(other),
    }
}

fn date_value(cell: &CellValue, row: usize) -> Result<PlaceholderValue> {
    let value = match cell {
        CellValue::Empty => PlaceholderValue::empty(),
        CellValue::Date(dt) => PlaceholderValue::Date(dt.date()),
        CellValue::Number(serial) => match excel_serial_to_date(*serial) {
            Some(d) => PlaceholderValue::Date(d),
            None => return Err(invalid_date(row, serial.to_string())),
        },
        CellValue::Text(s) if s.trim().is_empty() => PlaceholderValue::empty(),
        CellValue::Text(s) => match parse_date_text(s.trim()) {
            Some(d) => PlaceholderValue::Date(d),
            None => return Err(invalid_date(row, s.clone())),
        },
        CellValue::Bool(b) => return Err(invalid_date(row, b.to_string())),
    };
    Ok(value)
}

fn invalid_date(row: usize, value: String) -> anyhow::Error {
    LetterError::InvalidDate { row, value }.into()
}

/// Excel's 1900 date system, counting from 1899-12-30 so serials after
/// February 1900 land on the right day.
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    // 2958465 is 9999-12-31, the last day Excel can show.
    if !serial.is_finite() || !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    // Drop a trailing time part such as "2024-03-01 00:00:00".
    let date_part = s.split_whitespace().next().unwrap_or(s);
    let date_part = date_part.split('T').next().unwrap_or(date_part);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::columns::REQUIRED_COLUMNS;

    fn index() -> ColumnIndex {
        ColumnIndex::resolve(REQUIRED_COLUMNS.as_slice()).unwrap()
    }

    fn row_with(overrides: &[(&str, CellValue)]) -> Row {
        let mut cells: Vec<CellValue> = REQUIRED_COLUMNS
            .iter()
            .map(|c| if *c == "Date" { CellValue::Empty } else { CellValue::Number(0.0) })
            .collect();
        for (column, value) in overrides {
            let idx = REQUIRED_COLUMNS.iter().position(|c| c == column).unwrap();
            cells[idx] = value.clone();
        }
        Row { number: 2, cells }
    }

    #[test]
    fn maps_every_field_with_prefix() -> Result<()> {
        let row = row_with(&[
            ("Name", CellValue::Text("Jane Doe".into())),
            ("EmpCode", CellValue::Number(1001.0)),
            ("HRA Annual", CellValue::Number(120000.0)),
            ("Ex gratia Pay Monthly", CellValue::Number(833.33)),
        ]);
        let map = Placeholders::from_row(&row, &index())?;

        assert_eq!(map.len(), 38);
        assert_eq!(map.display("input_name"), "Jane Doe");
        assert_eq!(map.display("input_empcode"), "1001");
        assert_eq!(map.display("input_hra_annual"), "120000");
        assert_eq!(map.display("input_exgratia_monthly"), "833.33");
        assert!(map.get("name").is_none());
        Ok(())
    }

    #[test]
    fn formats_date_cells() -> Result<()> {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let map = Placeholders::from_row(&row_with(&[("Date", CellValue::Date(dt))]), &index())?;
        assert_eq!(map.display("input_date"), "01-03-2024");

        let map = Placeholders::from_row(&row_with(&[("Date", CellValue::Number(45352.0))]), &index())?;
        assert_eq!(map.display("input_date"), "01-03-2024");

        let map = Placeholders::from_row(
            &row_with(&[("Date", CellValue::Text("15/08/2023".into()))]),
            &index(),
        )?;
        assert_eq!(map.display("input_date"), "15-08-2023");

        let map = Placeholders::from_row(
            &row_with(&[("Date", CellValue::Text("2023-08-15 00:00:00".into()))]),
            &index(),
        )?;
        assert_eq!(map.display("input_date"), "15-08-2023");
        Ok(())
    }

    #[test]
    fn missing_date_maps_to_empty_string() -> Result<()> {
        let map = Placeholders::from_row(&row_with(&[("Date", CellValue::Empty)]), &index())?;
        assert_eq!(map.get("input_date"), Some(&PlaceholderValue::Text(String::new())));
        assert_eq!(map.display("input_date"), "");

        // a row shorter than the header reads the date as empty too
        let short = Row {
            number: 7,
            cells: vec![CellValue::Text("Short".into())],
        };
        let map = Placeholders::from_row(&short, &index())?;
        assert_eq!(map.display("input_date"), "");
        assert_eq!(map.display("input_name"), "Short");
        Ok(())
    }

    #[test]
    fn unreadable_date_is_an_error() {
        let row = row_with(&[("Date", CellValue::Text("next monday".into()))]);
        let err = Placeholders::from_row(&row, &index()).unwrap_err();
        match err.downcast_ref::<LetterError>() {
            Some(LetterError::InvalidDate { row, value }) => {
                assert_eq!(*row, 2);
                assert_eq!(value, "next monday");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn value_display_rules() {
        assert_eq!(PlaceholderValue::Number(25000.0).to_string(), "25000");
        assert_eq!(PlaceholderValue::Number(1234.5).to_string(), "1234.50");
        assert_eq!(PlaceholderValue::Number(-0.126).to_string(), "-0.13");
        assert_eq!(PlaceholderValue::Number(f64::NAN).to_string(), "");
        assert_eq!(PlaceholderValue::Number(-0.0).to_string(), "0");
        assert_eq!(PlaceholderValue::Number(-0.001).to_string(), "0.00");
        assert_eq!(PlaceholderValue::Text("A & B".into()).to_string(), "A & B");
        assert_eq!(
            PlaceholderValue::Date(NaiveDate::from_ymd_opt(2025, 12, 9).unwrap()).to_string(),
            "09-12-2025"
        );
    }

    #[test]
    fn bool_and_empty_cells_pass_through_as_text() -> Result<()> {
        let row = row_with(&[
            ("Address", CellValue::Empty),
            ("Department", CellValue::Bool(true)),
        ]);
        let map = Placeholders::from_row(&row, &index())?;
        assert_eq!(map.display("input_address"), "");
        assert_eq!(map.display("input_department"), "TRUE");
        Ok(())
    }

    #[test]
    fn amounts_typed_as_text_format_as_numbers() -> Result<()> {
        let row = row_with(&[
            ("Basic Monthly", CellValue::Text("12,500".into())),
            ("Basic Annual", CellValue::Text(" 150000.5 ".into())),
            ("HRA Monthly", CellValue::Text("as per policy".into())),
            ("HRA Annual", CellValue::Empty),
            // identity fields keep their text untouched
            ("EmpCode", CellValue::Text("007".into())),
        ]);
        let map = Placeholders::from_row(&row, &index())?;
        assert_eq!(map.get("input_basic_monthly"), Some(&PlaceholderValue::Number(12500.0)));
        assert_eq!(map.display("input_basic_annual"), "150000.50");
        assert_eq!(map.display("input_hra_monthly"), "as per policy");
        assert_eq!(map.display("input_hra_annual"), "");
        assert_eq!(map.display("input_empcode"), "007");
        Ok(())
    }

    #[test]
    fn markers_wrap_keys_in_braces() {
        let mut map = Placeholders::new();
        map.insert("name", PlaceholderValue::Text("Jane".into()));
        assert_eq!(
            map.markers(),
            vec![("{input_name}".to_string(), "Jane".to_string())]
        );
    }
}

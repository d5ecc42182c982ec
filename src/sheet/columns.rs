// src/sheet/columns.rs
use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::LetterError;

/// How a column's cells become placeholder values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Identity data, passed through as-is.
    Text,
    /// Pay component; numbers typed as text are read as numbers.
    Amount,
    /// Formatted as `DD-MM-YYYY`; blank cells become an empty string.
    Date,
}

/// A required spreadsheet column and the template token it feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub column: &'static str,
    /// Token name without the `input_` prefix.
    pub token: &'static str,
    pub kind: FieldKind,
}

const fn text(column: &'static str, token: &'static str) -> Field {
    Field {
        column,
        token,
        kind: FieldKind::Text,
    }
}

const fn amount(column: &'static str, token: &'static str) -> Field {
    Field {
        column,
        token,
        kind: FieldKind::Amount,
    }
}

/// Every column the letter template can draw on, in canonical order.
pub static FIELDS: &[Field] = &[
    text("Name", "name"),
    text("EmpCode", "empcode"),
    text("Address", "address"),
    text("Designation", "designation"),
    text("Department", "department"),
    Field {
        column: "Date",
        token: "date",
        kind: FieldKind::Date,
    },
    // monthly & annual salary breakdown
    amount("Basic Monthly", "basic_monthly"),
    amount("Basic Annual", "basic_annual"),
    amount("HRA Monthly", "hra_monthly"),
    amount("HRA Annual", "hra_annual"),
    amount("Statutory Bonus Monthly", "bonus_monthly"),
    amount("Statutory Bonus Annual", "bonus_annual"),
    amount("Special Allowance Monthly", "special_allowance_monthly"),
    amount("Special Allowance Annual", "special_allowance_annual"),
    amount("Gross Salary Monthly", "gross_salary_monthly"),
    amount("Gross Salary Annual", "gross_salary_annual"),
    // employer contributions
    amount("Employer PF Monthly", "employer_pf_monthly"),
    amount("Employer PF Annual", "employer_pf_annual"),
    amount("Employer LWF Monthly", "employer_lwf_monthly"),
    amount("Employer LWF Annual", "employer_lwf_annual"),
    amount("Employer ESIC Monthly", "employer_esic_monthly"),
    amount("Employer ESIC Annual", "employer_esic_annual"),
    amount("Cost to Company Monthly", "ctc_monthly"),
    amount("Cost to Company Annual", "ctc_annual"),
    // deductions
    amount("Employee PF Monthly", "employee_pf_monthly"),
    amount("Employee PF Annual", "employee_pf_annual"),
    amount("Employee LWF Monthly", "employee_lwf_monthly"),
    amount("Employee LWF Annual", "employee_lwf_annual"),
    amount("Employee ESIC Monthly", "employee_esic_monthly"),
    amount("Employee ESIC Annual", "employee_esic_annual"),
    amount("Total Deduction Monthly", "total_deduction_monthly"),
    amount("Total Deduction Annual", "total_deduction_annual"),
    amount("Net Take Home Monthly", "net_take_home_monthly"),
    amount("Net Take Home Annual", "net_take_home_annual"),
    // other pay heads
    amount("Statutory Leave Monthly", "statutory_leave_monthly"),
    amount("Statutory Leave Annual", "statutory_leave_annual"),
    amount("Ex gratia Pay Monthly", "exgratia_monthly"),
    amount("Ex gratia Pay Annual", "exgratia_annual"),
];

/// Names of all required columns.
pub static REQUIRED_COLUMNS: Lazy<Vec<&'static str>> =
    Lazy::new(|| FIELDS.iter().map(|f| f.column).collect());

/// Position of every required column within a sheet's header row.
///
/// Holding one of these is proof the sheet passed validation.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    positions: Vec<usize>,
}

impl ColumnIndex {
    /// Resolve the required columns against `headers`.
    ///
    /// Extra columns are ignored; a duplicated header resolves to its first
    /// occurrence. Fails with every missing column name when any is absent.
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Result<Self, LetterError> {
        let mut by_name: HashMap<&str, usize> = HashMap::with_capacity(headers.len());
        for (idx, h) in headers.iter().enumerate() {
            by_name.entry(h.as_ref()).or_insert(idx);
        }

        let mut positions = Vec::with_capacity(FIELDS.len());
        let mut missing = Vec::new();
        for field in FIELDS {
            match by_name.get(field.column) {
                Some(&idx) => positions.push(idx),
                None => missing.push(field.column.to_string()),
            }
        }

        if missing.is_empty() {
            Ok(Self { positions })
        } else {
            Err(LetterError::MissingColumns(missing))
        }
    }

    /// Pairs each field with its column position, in [`FIELDS`] order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static Field, usize)> + '_ {
        FIELDS.iter().zip(self.positions.iter().copied())
    }

    /// Column position of the field whose column is named `column`.
    pub fn position(&self, column: &str) -> Option<usize> {
        self.fields()
            .find(|(f, _)| f.column == column)
            .map(|(_, idx)| idx)
    }
}

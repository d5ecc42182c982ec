use thiserror::Error;

/// Failures the pipeline recognizes and reports to the user as-is.
///
/// Anything else (I/O, a corrupt workbook or template) travels as a plain
/// `anyhow::Error` with context attached where it happened.
#[derive(Debug, Error)]
pub enum LetterError {
    #[error("The Excel file must contain all required columns (missing: {})", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("workbook has no worksheets")]
    EmptyWorkbook,

    #[error("worksheet {0:?} not found in workbook")]
    SheetNotFound(String),

    #[error("row {row}: cannot read {value:?} in column \"Date\" as a date")]
    InvalidDate { row: usize, value: String },
}

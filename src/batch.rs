// src/batch.rs
use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use crate::mapping::Placeholders;
use crate::merge::merge_template;
use crate::sheet::{ColumnIndex, Table};

/// One generated letter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LetterRecord {
    /// Spreadsheet row the letter was built from.
    pub row: usize,
    pub name: String,
    pub empcode: String,
    pub file: PathBuf,
}

/// What a batch run produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    /// One record per row, in sheet order.
    pub letters: Vec<LetterRecord>,
    /// Letters that replaced an earlier letter of the same run because
    /// (Name, EmpCode) repeated.
    pub overwritten: usize,
}

impl BatchReport {
    /// Paths of all written letters (duplicates included).
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.letters.iter().map(|l| l.file.as_path())
    }
}

/// `Appointment_Letter_{name}_{empcode}.docx`, with characters that cannot
/// appear in a file name replaced by `_`.
pub fn letter_file_name(name: &str, empcode: &str) -> String {
    sanitize(&format!("Appointment_Letter_{}_{}.docx", name, empcode))
}

fn sanitize(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Write one merged letter per table row into `out_dir`.
///
/// `out_dir` is created if needed. Rows sharing (Name, EmpCode) map to the
/// same file; the later row wins. The first failing row aborts the run.
#[tracing::instrument(level = "info", skip_all, fields(rows = table.len(), out = %out_dir.display()))]
pub fn generate_letters(
    table: &Table,
    columns: &ColumnIndex,
    template: &[u8],
    out_dir: &Path,
) -> Result<BatchReport> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {:?}", out_dir))?;

    let mut report = BatchReport::default();
    let mut written: HashSet<PathBuf> = HashSet::with_capacity(table.len());

    for row in &table.rows {
        let placeholders = Placeholders::from_row(row, columns)
            .with_context(|| format!("Failed to map row {}", row.number))?;
        let name = placeholders.display("input_name");
        let empcode = placeholders.display("input_empcode");

        let letter = merge_template(template, &placeholders)
            .with_context(|| format!("Failed to merge row {} ({})", row.number, name))?;

        let file = out_dir.join(letter_file_name(&name, &empcode));
        if !written.insert(file.clone()) {
            warn!(row = row.number, file = %file.display(), "duplicate Name/EmpCode; overwriting earlier letter");
            report.overwritten += 1;
        }
        fs::write(&file, &letter).with_context(|| format!("writing {:?}", file))?;
        debug!(row = row.number, file = %file.display(), "letter written");

        report.letters.push(LetterRecord {
            row: row.number,
            name,
            empcode,
            file,
        });
    }

    info!(
        letters = report.letters.len(),
        overwritten = report.overwritten,
        "batch complete"
    );
    Ok(report)
}

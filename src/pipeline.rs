// src/pipeline.rs
use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;
use tracing::info;

use crate::archive::{archive_dir, ARCHIVE_NAME};
use crate::batch::{generate_letters, BatchReport};
use crate::sheet::{load_table, ColumnIndex};

/// Inputs and outputs of one run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Employee spreadsheet (`.xls`, `.xlsx`, `.xlsb`, `.ods`).
    pub data: PathBuf,
    /// Letter template (`.docx`).
    pub template: PathBuf,
    /// Where the zip of all letters goes.
    pub output: PathBuf,
    /// Worksheet to read; the first one when unset.
    pub sheet: Option<String>,
    /// Keep the individual letters here. When unset they live in a temporary
    /// directory that is removed once the archive is written.
    pub letters_dir: Option<PathBuf>,
    /// Optional JSON report of the generated letters.
    pub report: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn new(data: impl Into<PathBuf>, template: impl Into<PathBuf>) -> Self {
        Self {
            data: data.into(),
            template: template.into(),
            output: PathBuf::from(ARCHIVE_NAME),
            sheet: None,
            letters_dir: None,
            report: None,
        }
    }
}

/// Directory the letters are written to before archiving.
enum WorkDir {
    Kept(PathBuf),
    /// Removed on drop, including on the error path.
    Scratch(TempDir),
}

impl WorkDir {
    fn for_config(config: &PipelineConfig) -> Result<Self> {
        match &config.letters_dir {
            Some(dir) => Ok(WorkDir::Kept(dir.clone())),
            None => tempfile::Builder::new()
                .prefix("letters-")
                .tempdir()
                .map(WorkDir::Scratch)
                .context("creating scratch directory"),
        }
    }

    fn path(&self) -> &Path {
        match self {
            WorkDir::Kept(dir) => dir,
            WorkDir::Scratch(tmp) => tmp.path(),
        }
    }
}

/// Read, validate, merge every row, then archive.
///
/// Column validation happens before anything touches the disk, so a sheet
/// missing a required column produces no files at all.
pub fn run(config: &PipelineConfig) -> Result<BatchReport> {
    let table = load_table(&config.data, config.sheet.as_deref())?;
    let columns = ColumnIndex::resolve(&table.headers)?;
    info!(rows = table.len(), "columns validated");

    let template = fs::read(&config.template)
        .with_context(|| format!("Failed to read template {:?}", config.template))?;

    let workdir = WorkDir::for_config(config)?;
    let letters_dir = workdir.path();

    let report = generate_letters(&table, &columns, &template, letters_dir)?;
    let packed = archive_dir(letters_dir, &config.output)?;
    info!(
        packed,
        archive = %config.output.display(),
        "letters archived"
    );

    if let Some(path) = &config.report {
        let json = serde_json::to_vec_pretty(&report).context("serializing report")?;
        fs::write(path, json).with_context(|| format!("writing report {:?}", path))?;
    }

    Ok(report)
}

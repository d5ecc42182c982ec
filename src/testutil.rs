// src/testutil.rs
//! Shared fixtures for unit tests.

use anyhow::Result;
use std::io::{Cursor, Read, Write};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::sheet::columns::REQUIRED_COLUMNS;
use crate::sheet::{CellValue, Row, Table};

pub fn init_test_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,letterforge=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

/// Minimal `.docx` package whose body is `body` (paragraph/table XML).
pub fn docx(body: &str) -> Result<Vec<u8>> {
    docx_with_parts(body, &[])
}

pub fn docx_with_parts(body: &str, extra: &[(&str, &str)]) -> Result<Vec<u8>> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );

    let mut buf = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buf));
        let options: FileOptions<'_, ()> =
            FileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(CONTENT_TYPES.as_bytes())?;
        zip.start_file("word/document.xml", options)?;
        zip.write_all(document.as_bytes())?;
        for (name, xml) in extra {
            zip.start_file(*name, options)?;
            zip.write_all(xml.as_bytes())?;
        }
        zip.finish()?;
    }
    Ok(buf)
}

/// Read one part of a zip package as text.
pub fn read_part(package: &[u8], name: &str) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(package))?;
    let mut entry = archive.by_name(name)?;
    let mut out = String::new();
    entry.read_to_string(&mut out)?;
    Ok(out)
}

/// Table with every required column, one row per `(name, empcode)`.
///
/// Pay components get distinct numbers; the date column is left blank.
pub fn staff_table(people: &[(&str, f64)]) -> Table {
    let headers: Vec<String> = REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();
    let rows = people
        .iter()
        .enumerate()
        .map(|(i, (name, code))| {
            let cells = REQUIRED_COLUMNS
                .iter()
                .enumerate()
                .map(|(col, column)| match *column {
                    "Name" => CellValue::Text(name.to_string()),
                    "EmpCode" => CellValue::Number(*code),
                    "Address" | "Designation" | "Department" => {
                        CellValue::Text(format!("{} {}", column, i))
                    }
                    "Date" => CellValue::Empty,
                    _ => CellValue::Number(1000.0 * (col as f64)),
                })
                .collect();
            Row {
                number: i + 2,
                cells,
            }
        })
        .collect();
    Table { headers, rows }
}

// src/merge/mod.rs
use anyhow::{bail, Context, Result};
use std::{
    collections::HashMap,
    io::{Cursor, Read, Write},
};
use tracing::{debug, trace};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::mapping::Placeholders;

pub mod xml;

/// Main body part of a `.docx` package.
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Parts whose paragraphs carry markers: the body plus headers and footers.
fn is_text_part(name: &str) -> bool {
    name == DOCUMENT_PART
        || ((name.starts_with("word/header") || name.starts_with("word/footer"))
            && name.ends_with(".xml"))
}

/// Merge `placeholders` into a copy of the `.docx` in `template`.
///
/// Every `{key}` in the body paragraphs, table cells, headers and footers is
/// replaced by its value; unknown markers stay as they are. Untouched package
/// parts are copied raw, and a template with nothing to substitute comes back
/// byte for byte.
pub fn merge_template(template: &[u8], placeholders: &Placeholders) -> Result<Vec<u8>> {
    let markers = placeholders.markers();
    let mut archive =
        ZipArchive::new(Cursor::new(template)).context("template is not a .docx package")?;

    // 1) Substitute in memory, part by part
    let mut rewritten: HashMap<String, Vec<u8>> = HashMap::new();
    let mut has_document = false;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to access template entry #{}", i))?;
        let name = entry.name().to_string();
        if !entry.is_file() || !is_text_part(&name) {
            continue;
        }
        has_document |= name == DOCUMENT_PART;

        let mut part = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut part)
            .with_context(|| format!("Failed to read {} from template", name))?;
        if let Some(updated) = xml::substitute_part(&part, &markers)
            .with_context(|| format!("Failed to merge into {}", name))?
        {
            trace!(part = %name, "substituted markers");
            rewritten.insert(name, updated);
        }
    }

    if !has_document {
        bail!("template has no {}", DOCUMENT_PART);
    }
    if rewritten.is_empty() {
        debug!("no markers substituted; template copied as-is");
        return Ok(template.to_vec());
    }

    // 2) Re-pack, keeping entry order
    let mut out = ZipWriter::new(Cursor::new(Vec::with_capacity(template.len())));
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        let Some(part) = rewritten.get(entry.name()) else {
            out.raw_copy_file(entry)?;
            continue;
        };

        let mut options: FileOptions<'_, ()> =
            FileOptions::default().compression_method(CompressionMethod::Deflated);
        if let Some(ts) = entry.last_modified() {
            options = options.last_modified_time(ts);
        }
        out.start_file(entry.name(), options)?;
        out.write_all(part)?;
    }

    Ok(out.finish()?.into_inner())
}

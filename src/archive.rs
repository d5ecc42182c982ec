// src/archive.rs
use anyhow::{Context, Result};
use glob::{glob, Pattern};
use std::{
    fs::{self, File},
    io::{self, BufWriter},
    path::{Path, PathBuf},
};
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Name of the archive handed back to the user.
pub const ARCHIVE_NAME: &str = "Appointment_Letters.zip";

/// Pack every regular file under `src_dir` into a new zip at `dest`.
///
/// Entries use `/`-separated paths relative to `src_dir`, sorted, with a fixed
/// timestamp: the same directory contents always produce the same archive.
/// An existing `dest` is replaced, and never packed into itself when it lies
/// under `src_dir`. Returns the number of files packed.
#[tracing::instrument(level = "info", skip_all, fields(src = %src_dir.display(), dest = %dest.display()))]
pub fn archive_dir(src_dir: &Path, dest: &Path) -> Result<usize> {
    let previous = fs::canonicalize(dest).ok();
    let files = list_files(src_dir, previous.as_deref())?;

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating archive directory {:?}", parent))?;
    }
    let out = File::create(dest).with_context(|| format!("creating archive {:?}", dest))?;
    let mut zip = ZipWriter::new(BufWriter::new(out));
    let options: FileOptions<'_, ()> = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    for (name, path) in &files {
        zip.start_file(name.as_str(), options)?;
        let mut src = File::open(path).with_context(|| format!("opening {:?}", path))?;
        io::copy(&mut src, &mut zip).with_context(|| format!("packing {:?}", path))?;
        debug!(entry = %name, "packed");
    }
    zip.finish()?;

    info!(files = files.len(), "archive written");
    Ok(files.len())
}

/// Regular files under `dir` as (archive entry name, path), sorted by name,
/// leaving out `skip`.
fn list_files(dir: &Path, skip: Option<&Path>) -> Result<Vec<(String, PathBuf)>> {
    let pattern = format!("{}/**/*", Pattern::escape(&dir.to_string_lossy()));
    let mut files = Vec::new();
    for entry in glob(&pattern)? {
        let path = entry?;
        if !path.is_file() {
            continue;
        }
        if skip.is_some() && fs::canonicalize(&path).ok().as_deref() == skip {
            debug!(path = %path.display(), "skipping the archive itself");
            continue;
        }
        let rel = path
            .strip_prefix(dir)
            .with_context(|| format!("{:?} is outside {:?}", path, dir))?;
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((name, path));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

//! Bulk appointment letters: spreadsheet rows merged into a `.docx` template,
//! one letter per row, packed into a single zip.

pub mod archive;
pub mod batch;
pub mod error;
pub mod mapping;
pub mod merge;
pub mod pipeline;
pub mod sheet;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::LetterError;
pub use pipeline::{run, PipelineConfig};

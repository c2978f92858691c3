//! Archive packaging: successful outcomes → one in-memory ZIP.
//!
//! Entries are written in filename order so the same set of successes
//! always produces the same entry list.

use crate::document::{markdown_file_name, unique_name};
use crate::error::BulkError;
use crate::session::ConversionSession;
use serde::Serialize;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// File name offered for the bundled download.
pub const DEFAULT_ARCHIVE_NAME: &str = "converted_markdown_files.zip";

/// One file inside an [`ArchiveBundle`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    /// Filename of the source document.
    pub source: String,
    /// Name of the Markdown entry inside the archive.
    pub entry_name: String,
    /// Uncompressed size in bytes.
    pub size: usize,
}

/// A finished ZIP archive held in memory.
#[derive(Debug, Clone)]
pub struct ArchiveBundle {
    bytes: Vec<u8>,
    entries: Vec<ArchiveEntry>,
}

impl ArchiveBundle {
    /// Raw ZIP bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Entries in the order they were written.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry produced for `source`, if it succeeded.
    pub fn entry_for(&self, source: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.source == source)
    }
}

/// Build the archive for a finished session.
///
/// # Errors
/// * [`BulkError::SessionIncomplete`]: some documents have no outcome yet
/// * [`BulkError::Packaging`]: the ZIP writer failed
pub fn package(session: &ConversionSession) -> Result<ArchiveBundle, BulkError> {
    let progress = session.progress();
    if !progress.is_complete() {
        return Err(BulkError::SessionIncomplete {
            completed: progress.completed,
            total: progress.total,
        });
    }

    let bundle = build_archive(&session.successes())?;
    info!(
        "Packaged {} of {} documents ({} bytes)",
        bundle.len(),
        progress.total,
        bundle.bytes.len()
    );
    Ok(bundle)
}

/// Write `(source filename, markdown)` pairs into a deflated ZIP.
///
/// Pairs are sorted by filename first; colliding entry names get a
/// ` (n)` suffix.
pub fn build_archive(files: &[(String, String)]) -> Result<ArchiveBundle, BulkError> {
    let mut sorted: Vec<&(String, String)> = files.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut taken = HashSet::new();
    let mut entries = Vec::with_capacity(sorted.len());

    for (source, markdown) in sorted {
        let entry_name = unique_name(&markdown_file_name(source), &mut taken);

        zip.start_file(entry_name.as_str(), options)
            .map_err(|e| BulkError::Packaging {
                reason: format!("failed to create entry '{entry_name}': {e}"),
            })?;
        zip.write_all(markdown.as_bytes())
            .map_err(|e| BulkError::Packaging {
                reason: format!("failed to write entry '{entry_name}': {e}"),
            })?;

        debug!("Archived {} → {}", source, entry_name);
        entries.push(ArchiveEntry {
            source: source.clone(),
            entry_name,
            size: markdown.len(),
        });
    }

    let cursor = zip.finish().map_err(|e| BulkError::Packaging {
        reason: format!("failed to finalize archive: {e}"),
    })?;

    Ok(ArchiveBundle {
        bytes: cursor.into_inner(),
        entries,
    })
}

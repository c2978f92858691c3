//! Writing results to disk.
//!
//! Every file is written atomically: the bytes go to a sibling `.tmp` file
//! which is then renamed over the destination, so a reader never sees a
//! half-written archive or Markdown file.

use crate::archive::ArchiveBundle;
use crate::document::{markdown_file_name, unique_name};
use crate::error::BulkError;
use crate::session::ConversionSession;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Write `bytes` to `path` via temp file + rename.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), BulkError> {
    let fail = |source: std::io::Error| BulkError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(fail)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, bytes).await.map_err(fail)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(fail(e));
    }

    debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Write a packaged archive to `path`.
pub async fn write_archive(bundle: &ArchiveBundle, path: &Path) -> Result<(), BulkError> {
    write_atomic(path, bundle.bytes()).await?;
    info!(
        "Archive written: {} ({} entries, {} bytes)",
        path.display(),
        bundle.len(),
        bundle.bytes().len()
    );
    Ok(())
}

/// Write every successful outcome as `<stem>.md` into `dir`.
///
/// Files are named exactly like the archive entries, including the
/// ` (n)` suffix for colliding stems. Returns the written paths in
/// filename order.
pub async fn write_markdown_files(
    session: &ConversionSession,
    dir: &Path,
) -> Result<Vec<PathBuf>, BulkError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| BulkError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source,
        })?;

    let mut taken = HashSet::new();
    let mut written = Vec::new();
    for (source, markdown) in session.successes() {
        let file_name = unique_name(&markdown_file_name(&source), &mut taken);
        let path = dir.join(file_name);
        write_atomic(&path, markdown.as_bytes()).await?;
        written.push(path);
    }

    info!("{} Markdown file(s) written to {}", written.len(), dir.display());
    Ok(written)
}

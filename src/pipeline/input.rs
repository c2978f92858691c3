//! Input resolution: turn user-supplied paths and URLs into documents.
//!
//! This is the intake side of the batch. The per-document size limit is
//! enforced here, before anything is submitted to the dispatcher, and
//! repeated filenames are disambiguated so every document in a session has
//! a unique name. Whether the bytes are actually a PDF is left to the
//! conversion adapter: a bad upload becomes a per-document failure, not a
//! rejected batch.

use crate::config::BulkConfig;
use crate::document::{unique_name, InputDocument};
use crate::error::BulkError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve every input, in order, into an [`InputDocument`].
///
/// Fails on the first input that cannot be read or exceeds
/// `config.max_file_size_bytes`.
pub async fn resolve_inputs(
    inputs: &[String],
    config: &BulkConfig,
) -> Result<Vec<InputDocument>, BulkError> {
    let mut taken = HashSet::new();
    let mut documents = Vec::with_capacity(inputs.len());

    for input in inputs {
        let (name, bytes) = if is_url(input) {
            download_url(input, config).await?
        } else {
            read_local(Path::new(input), config).await?
        };
        let name = unique_name(&name, &mut taken);
        documents.push(InputDocument::new(name, bytes));
    }

    info!("Resolved {} input document(s)", documents.len());
    Ok(documents)
}

fn check_size(name: &str, size: u64, config: &BulkConfig) -> Result<(), BulkError> {
    if size > config.max_file_size_bytes {
        return Err(BulkError::PayloadTooLarge {
            name: name.to_string(),
            size,
            limit: config.max_file_size_bytes,
        });
    }
    Ok(())
}

/// Read a local file after checking its size from metadata.
async fn read_local(path: &Path, config: &BulkConfig) -> Result<(String, Vec<u8>), BulkError> {
    let name = file_name_of(path);

    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| io_input_error(path, e))?;
    if !meta.is_file() {
        return Err(BulkError::InvalidInput {
            input: path.display().to_string(),
        });
    }
    check_size(&name, meta.len(), config)?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| io_input_error(path, e))?;

    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok((name, bytes))
}

fn io_input_error(path: &Path, e: std::io::Error) -> BulkError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => BulkError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => BulkError::FileNotFound {
            path: path.to_path_buf(),
        },
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Download a URL into memory.
async fn download_url(url: &str, config: &BulkConfig) -> Result<(String, Vec<u8>), BulkError> {
    info!("Downloading PDF from: {}", url);
    let timeout_secs = config.download_timeout_secs;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| BulkError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            BulkError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            BulkError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(BulkError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let name = extract_filename(url);
    if let Some(len) = response.content_length() {
        check_size(&name, len, config)?;
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| BulkError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    // Content-Length may be missing or wrong.
    check_size(&name, bytes.len() as u64, config)?;

    info!("Downloaded {} ({} bytes)", name, bytes.len());
    Ok((name, bytes.to_vec()))
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

/// Expand directory arguments into the `*.pdf` files they contain.
///
/// Files are returned sorted by path; other arguments pass through as-is.
pub fn expand_directories(inputs: &[String]) -> Result<Vec<String>, BulkError> {
    let mut out = Vec::with_capacity(inputs.len());
    for input in inputs {
        let path = PathBuf::from(input);
        if is_url(input) || !path.is_dir() {
            out.push(input.clone());
            continue;
        }

        let mut found: Vec<PathBuf> = std::fs::read_dir(&path)
            .map_err(|e| io_input_error(&path, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .map(|e| e.eq_ignore_ascii_case("pdf"))
                        .unwrap_or(false)
            })
            .collect();
        found.sort();
        debug!("{} PDF(s) found in {}", found.len(), path.display());
        out.extend(found.into_iter().map(|p| p.display().to_string()));
    }
    Ok(out)
}

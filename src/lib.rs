//! # pdf2md-bulk
//!
//! Convert many PDF documents to Markdown in one request and bundle the
//! results into a single ZIP archive.
//!
//! ## Why this crate?
//!
//! Converting one PDF is easy; converting a few hundred is mostly
//! bookkeeping. Each document has to be attempted exactly once, a broken
//! upload must not take the rest of the batch down with it, and somebody
//! has to collect the successes into one downloadable file. This crate does
//! that bookkeeping around a pluggable single-document [`Converter`].
//!
//! ## Pipeline Overview
//!
//! ```text
//! paths / URLs
//!  │
//!  ├─ 1. Input     read files or download URLs, enforce the size limit
//!  ├─ 2. Dispatch  bounded worker pool (buffer_unordered + spawn_blocking)
//!  ├─ 3. Convert   pdfium text layer → cleaned Markdown, one per document
//!  ├─ 4. Record    ConversionSession: exactly one outcome per filename
//!  └─ 5. Package   successes → `<stem>.md` entries in one ZIP
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2md_bulk::{archive, convert_inputs, BulkConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BulkConfig::builder().concurrency(4).build()?;
//!     let inputs = vec!["a.pdf".to_string(), "b.pdf".to_string()];
//!     let session = convert_inputs(&inputs, &config).await?;
//!     eprintln!("{} succeeded, {} failed", session.succeeded(), session.failed());
//!
//!     let bundle = archive::package(&session)?;
//!     std::fs::write(archive::DEFAULT_ARCHIVE_NAME, bundle.bytes())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Custom converters
//!
//! Any `Fn(&InputDocument) -> Result<String, ConversionError>` that is
//! `Send + Sync` is a [`Converter`]:
//!
//! ```rust,no_run
//! use pdf2md_bulk::{convert_batch_with, BulkConfig, CancellationToken, ConversionError, Converter, InputDocument};
//! use std::sync::Arc;
//!
//! # async fn run(docs: Vec<InputDocument>) -> Result<(), pdf2md_bulk::BulkError> {
//! let converter: Arc<dyn Converter> = Arc::new(|doc: &InputDocument| -> Result<String, ConversionError> {
//!     Ok(format!("# {}\n", doc.name()))
//! });
//! let session = convert_batch_with(docs, converter, &BulkConfig::default(), CancellationToken::new()).await?;
//! assert!(session.is_complete());
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2md-bulk` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2md-bulk = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod archive;
pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod session;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use archive::{package, ArchiveBundle, ArchiveEntry, DEFAULT_ARCHIVE_NAME};
pub use config::{
    BulkConfig, BulkConfigBuilder, PageSeparator, DEFAULT_CONCURRENCY,
    DEFAULT_MAX_FILE_SIZE_BYTES, MAX_CONCURRENCY,
};
pub use convert::{convert_batch, convert_batch_sync, convert_batch_with, convert_inputs, run_session};
pub use document::{ConversionOutcome, InputDocument, Preview, Progress};
pub use error::{BulkError, ConversionError};
pub use output::{write_archive, write_markdown_files};
pub use pipeline::extract::{Converter, PdfiumConverter};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::{ConversionSession, DocumentReport, DocumentStatus, SessionReport};
pub use stream::{convert_stream, OutcomeStream};
pub use tokio_util::sync::CancellationToken;

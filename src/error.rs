//! Error types for the pdf2md-bulk library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`BulkError`] is **fatal**: the batch itself cannot continue or cannot be
//!   delivered (an input could not be read, the aggregator detected a
//!   dispatcher bug, the archive could not be built). Returned as
//!   `Err(BulkError)` from the top-level `convert*` and `package` functions.
//!
//! * [`ConversionError`] is **non-fatal**: a single document failed (corrupt
//!   bytes, encrypted, no text layer) but every other document is fine.
//!   Stored inside [`crate::document::ConversionOutcome::Failure`] so the
//!   session can report per-file status instead of aborting.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2md-bulk library.
///
/// Document-level failures use [`ConversionError`] and are recorded in the
/// session rather than propagated here.
#[derive(Debug, Error)]
pub enum BulkError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// Payload is larger than the configured per-document limit.
    #[error("'{name}' is {size} bytes, above the {limit}-byte limit\nRaise --max-file-size-mb.")]
    PayloadTooLarge { name: String, size: u64, limit: u64 },

    // ── Session errors ────────────────────────────────────────────────────
    /// Two submitted documents share a filename.
    #[error("Document '{name}' was submitted more than once")]
    DuplicateDocument { name: String },

    /// An outcome was recorded twice for the same filename.
    ///
    /// This is a dispatcher bug, not a user-facing condition.
    #[error("Outcome for '{name}' was already recorded")]
    DuplicateRecording { name: String },

    /// An outcome was recorded for a filename the session does not know.
    #[error("'{name}' is not part of this conversion session")]
    UnknownDocument { name: String },

    /// The archive was requested before every document had an outcome.
    #[error("Session is not complete: {completed}/{total} documents processed")]
    SessionIncomplete { completed: usize, total: usize },

    // ── Packaging errors ──────────────────────────────────────────────────
    /// The ZIP writer failed while assembling the bundle.
    #[error("Failed to build archive: {reason}")]
    Packaging { reason: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place the platform library (libpdfium.so / libpdfium.dylib / pdfium.dll) in the working directory.\n\
  • Pass --pdfium-lib <PATH>.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document.
///
/// Stored in [`crate::document::ConversionOutcome::Failure`]. The batch keeps
/// going; only this document is excluded from the archive.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ConversionError {
    /// Zero-byte payload.
    #[error("document is empty")]
    EmptyDocument,

    /// The payload has no `%PDF-` header.
    #[error("not a PDF file (first bytes: {magic:?})")]
    NotAPdf { magic: [u8; 4] },

    /// pdfium could not parse the document structure.
    #[error("PDF is corrupt: {detail}")]
    CorruptPdf { detail: String },

    /// Document is encrypted and no password was configured.
    #[error("PDF is encrypted and requires a password")]
    PasswordRequired,

    /// A password was configured but pdfium rejected it.
    #[error("wrong password for encrypted PDF")]
    WrongPassword,

    /// Reading the text layer of a page failed.
    #[error("text extraction failed on page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// Every page is blank; the document is most likely a scan.
    #[error("no extractable text in {pages} page(s); scanned documents need OCR")]
    NoTextLayer { pages: usize },

    /// The pdfium library could not be loaded for this call.
    #[error("PDF engine unavailable: {detail}")]
    EngineUnavailable { detail: String },

    /// The conversion task panicked or was lost.
    #[error("internal conversion error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_recording_display() {
        let e = BulkError::DuplicateRecording {
            name: "report.pdf".into(),
        };
        assert!(e.to_string().contains("report.pdf"));
    }

    #[test]
    fn session_incomplete_display() {
        let e = BulkError::SessionIncomplete {
            completed: 2,
            total: 5,
        };
        assert!(e.to_string().contains("2/5"), "got: {e}");
    }

    #[test]
    fn payload_too_large_display() {
        let e = BulkError::PayloadTooLarge {
            name: "big.pdf".into(),
            size: 300,
            limit: 200,
        };
        let msg = e.to_string();
        assert!(msg.contains("big.pdf"));
        assert!(msg.contains("200-byte"));
    }

    #[test]
    fn no_text_layer_mentions_ocr() {
        let e = ConversionError::NoTextLayer { pages: 3 };
        assert!(e.to_string().contains("OCR"));
        assert!(e.to_string().contains('3'));
    }

    #[test]
    fn conversion_error_serialises() {
        let e = ConversionError::CorruptPdf {
            detail: "bad xref".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("bad xref"));
        let back: ConversionError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}

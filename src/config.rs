//! Configuration types for bulk PDF-to-Markdown conversion.
//!
//! Every knob lives in [`BulkConfig`], built via its [`BulkConfigBuilder`].
//! A config is created per request and passed into the core explicitly;
//! nothing in the library reads ambient mutable state.

use crate::error::BulkError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default number of documents converted at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Upper bound on [`BulkConfig::concurrency`].
pub const MAX_CONCURRENCY: usize = 8;

/// Default per-document upload limit: 200 MiB.
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 200 * 1024 * 1024;

/// Configuration for a bulk conversion request.
///
/// # Example
/// ```rust
/// use pdf2md_bulk::BulkConfig;
/// use std::time::Duration;
///
/// let config = BulkConfig::builder()
///     .concurrency(2)
///     .timeout(Duration::from_secs(600))
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 2);
/// ```
#[derive(Clone)]
pub struct BulkConfig {
    /// Maximum number of documents in flight. Range: 1–8. Default: 4.
    ///
    /// Each in-flight document occupies one blocking thread until its
    /// outcome is ready. Custom converters run truly in parallel; with
    /// [`crate::PdfiumConverter`] the pdfium part is serialized on one
    /// engine thread, so this bounds queued plus running documents.
    pub concurrency: usize,

    /// Largest accepted payload per document, in bytes. Default: 200 MiB.
    ///
    /// Enforced while resolving inputs, before anything reaches the
    /// dispatcher.
    pub max_file_size_bytes: u64,

    /// Overall request deadline. Default: none.
    ///
    /// When it expires the remaining work is abandoned and the session is
    /// returned marked as cancelled.
    pub timeout: Option<Duration>,

    /// Separator placed between page texts. Default: [`PageSeparator::None`].
    pub page_separator: PageSeparator,

    /// Prepend YAML front-matter with document metadata. Default: false.
    pub include_metadata: bool,

    /// Password tried on encrypted documents.
    pub password: Option<String>,

    /// Explicit path to the pdfium shared library (file or directory).
    pub pdfium_lib_path: Option<PathBuf>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            timeout: None,
            page_separator: PageSeparator::default(),
            include_metadata: false,
            password: None,
            pdfium_lib_path: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for BulkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkConfig")
            .field("concurrency", &self.concurrency)
            .field("max_file_size_bytes", &self.max_file_size_bytes)
            .field("timeout", &self.timeout)
            .field("page_separator", &self.page_separator)
            .field("include_metadata", &self.include_metadata)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl BulkConfig {
    /// Create a new builder for `BulkConfig`.
    pub fn builder() -> BulkConfigBuilder {
        BulkConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`BulkConfig`].
pub struct BulkConfigBuilder {
    config: BulkConfig,
}

impl fmt::Debug for BulkConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl BulkConfigBuilder {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.clamp(1, MAX_CONCURRENCY);
        self
    }

    pub fn max_file_size_bytes(mut self, bytes: u64) -> Self {
        self.config.max_file_size_bytes = bytes;
        self
    }

    pub fn max_file_size_mb(self, mb: u64) -> Self {
        self.max_file_size_bytes(mb.saturating_mul(1024 * 1024))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn include_metadata(mut self, v: bool) -> Self {
        self.config.include_metadata = v;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BulkConfig, BulkError> {
        let c = &self.config;
        if c.concurrency == 0 || c.concurrency > MAX_CONCURRENCY {
            return Err(BulkError::InvalidConfig(format!(
                "Concurrency must be 1–{MAX_CONCURRENCY}, got {}",
                c.concurrency
            )));
        }
        if c.max_file_size_bytes == 0 {
            return Err(BulkError::InvalidConfig(
                "Maximum file size must be > 0".into(),
            ));
        }
        if c.timeout == Some(Duration::ZERO) {
            return Err(BulkError::InvalidConfig("Timeout must be > 0".into()));
        }
        Ok(self.config)
    }
}

/// How to separate pages in the assembled Markdown output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// No separator; pages joined with "\n\n". (default)
    #[default]
    None,
    /// Horizontal rule: "\n\n---\n\n"
    HorizontalRule,
    /// HTML comment with page number: "<!-- page N -->"
    Comment,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator string for the given page number (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::None => "\n\n".to_string(),
            PageSeparator::HorizontalRule => "\n\n---\n\n".to_string(),
            PageSeparator::Comment => format!("\n\n<!-- page {} -->\n\n", page_num),
            PageSeparator::Custom(s) => format!("\n\n{}\n\n", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_upload_ui() {
        let c = BulkConfig::default();
        assert_eq!(c.concurrency, 4);
        assert_eq!(c.max_file_size_bytes, 200 * 1024 * 1024);
        assert!(c.timeout.is_none());
    }

    #[test]
    fn concurrency_is_clamped() {
        let c = BulkConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
        let c = BulkConfig::builder().concurrency(64).build().unwrap();
        assert_eq!(c.concurrency, MAX_CONCURRENCY);
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = BulkConfig::builder()
            .timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, BulkError::InvalidConfig(_)));
    }

    #[test]
    fn zero_file_size_rejected() {
        assert!(BulkConfig::builder().max_file_size_bytes(0).build().is_err());
    }

    #[test]
    fn max_file_size_mb_converts() {
        let c = BulkConfig::builder().max_file_size_mb(1).build().unwrap();
        assert_eq!(c.max_file_size_bytes, 1024 * 1024);
    }

    #[test]
    fn debug_redacts_password() {
        let c = BulkConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn separator_rendering() {
        assert_eq!(PageSeparator::None.render(2), "\n\n");
        assert_eq!(PageSeparator::HorizontalRule.render(2), "\n\n---\n\n");
        assert_eq!(PageSeparator::Comment.render(3), "\n\n<!-- page 3 -->\n\n");
        assert_eq!(
            PageSeparator::Custom("***".into()).render(1),
            "\n\n***\n\n"
        );
    }
}

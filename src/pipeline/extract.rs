//! The conversion adapter: one PDF payload in, Markdown text out.
//!
//! [`Converter`] is the seam between the dispatcher and whatever library
//! does the actual work. [`PdfiumConverter`] is the production
//! implementation: it opens the payload with pdfium, reads the text layer
//! of every page, and hands the result to [`super::postprocess`].
//!
//! Conversion is synchronous; the dispatcher calls it from
//! `spawn_blocking`. pdfium itself runs on the single
//! [`super::engine`] thread, so pdfium work from concurrent workers is
//! serialized. The document handle is dropped at the end of each job, on
//! every return path, errors included.

use crate::config::{BulkConfig, PageSeparator};
use crate::document::InputDocument;
use crate::error::{BulkError, ConversionError};
use crate::pipeline::{engine, postprocess};
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// How far into the payload the `%PDF-` header may start.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Converts one document to Markdown.
///
/// Implementations must be `Send + Sync`: a single converter is shared by
/// every worker in the pool.
pub trait Converter: Send + Sync {
    fn convert(&self, document: &InputDocument) -> Result<String, ConversionError>;
}

impl<F> Converter for F
where
    F: Fn(&InputDocument) -> Result<String, ConversionError> + Send + Sync,
{
    fn convert(&self, document: &InputDocument) -> Result<String, ConversionError> {
        self(document)
    }
}

/// Text-layer extraction through pdfium.
///
/// pdfium is not re-entrant, so every instance shares the one process-wide
/// engine and documents are extracted one at a time. With this converter
/// `BulkConfig::concurrency` bounds how many documents are in flight
/// (queued for the engine or being extracted), not how many are parsed in
/// parallel. Byte sniffing and Markdown assembly still run on the worker.
#[derive(Debug, Clone)]
pub struct PdfiumConverter {
    library_path: Option<PathBuf>,
    password: Option<String>,
    page_separator: PageSeparator,
    include_metadata: bool,
}

impl PdfiumConverter {
    pub fn new(config: &BulkConfig) -> Self {
        Self {
            library_path: config.pdfium_lib_path.clone(),
            password: config.password.clone(),
            page_separator: config.page_separator.clone(),
            include_metadata: config.include_metadata,
        }
    }

    /// Start the pdfium engine so a missing library fails the whole request
    /// up front instead of failing every document. Blocks while binding.
    pub fn probe(&self) -> Result<(), BulkError> {
        engine::ensure_started(self.library_path.as_deref()).map_err(BulkError::PdfiumBindingFailed)
    }

    /// [`probe`](Self::probe) from async code, on the blocking pool.
    pub async fn ensure_ready(&self) -> Result<(), BulkError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.probe())
            .await
            .map_err(|e| BulkError::Internal(format!("pdfium start-up task failed: {}", e)))?
    }

    /// Runs on the engine thread.
    fn extract(
        &self,
        pdfium: &Pdfium,
        document: &InputDocument,
    ) -> Result<(Vec<String>, Option<FrontMatter>), ConversionError> {
        let pdf = pdfium
            .load_pdf_from_byte_slice(document.bytes(), self.password.as_deref())
            .map_err(|e| classify_load_error(format!("{:?}", e), self.password.is_some()))?;

        let pages = pdf.pages();
        let total_pages = pages.len() as usize;
        debug!("'{}' opened: {} pages", document.name(), total_pages);

        let mut texts = Vec::with_capacity(total_pages);
        for (idx, page) in pages.iter().enumerate() {
            let text = page
                .text()
                .map_err(|e| ConversionError::TextExtractionFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                })?;
            texts.push(text.all());
        }

        let metadata = if self.include_metadata {
            Some(read_metadata(&pdf, document.name(), total_pages))
        } else {
            None
        };
        Ok((texts, metadata))
    }
}

impl Converter for PdfiumConverter {
    fn convert(&self, document: &InputDocument) -> Result<String, ConversionError> {
        sniff_pdf(document.bytes())?;

        let this = self.clone();
        let doc = document.clone();
        let (texts, metadata) = engine::run(self.library_path.as_deref(), move |pdfium| {
            this.extract(pdfium, &doc)
        })
        .map_err(|detail| ConversionError::EngineUnavailable { detail })??;

        let markdown = assemble_markdown(&texts, &self.page_separator, metadata.as_ref())?;
        info!(
            "Converted '{}': {} pages → {} bytes",
            document.name(),
            texts.len(),
            markdown.len()
        );
        Ok(markdown)
    }
}

/// Reject payloads that cannot be a PDF before touching the library.
pub fn sniff_pdf(bytes: &[u8]) -> Result<(), ConversionError> {
    if bytes.is_empty() {
        return Err(ConversionError::EmptyDocument);
    }

    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    if window.windows(5).any(|w| w == b"%PDF-") {
        return Ok(());
    }

    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(ConversionError::NotAPdf { magic })
}

/// Map a pdfium load failure onto a document-level error.
fn classify_load_error(detail: String, password_given: bool) -> ConversionError {
    if detail.contains("Password") || detail.contains("password") {
        if password_given {
            ConversionError::WrongPassword
        } else {
            ConversionError::PasswordRequired
        }
    } else {
        ConversionError::CorruptPdf { detail }
    }
}

/// Metadata written into the optional YAML front-matter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    pub source: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub pages: usize,
}

fn read_metadata(pdf: &PdfDocument<'_>, source: &str, pages: usize) -> FrontMatter {
    let metadata = pdf.metadata();
    let get = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata
            .get(tag)
            .map(|t| t.value().trim().to_string())
            .filter(|v| !v.is_empty())
    };

    FrontMatter {
        source: source.to_string(),
        title: get(PdfDocumentMetadataTagType::Title),
        author: get(PdfDocumentMetadataTagType::Author),
        subject: get(PdfDocumentMetadataTagType::Subject),
        pages,
    }
}

/// Join page texts, clean them up and prepend optional front-matter.
///
/// # Errors
/// [`ConversionError::NoTextLayer`] when every page is blank.
pub fn assemble_markdown(
    pages: &[String],
    separator: &PageSeparator,
    front_matter: Option<&FrontMatter>,
) -> Result<String, ConversionError> {
    if pages.iter().all(|p| p.trim().is_empty()) {
        return Err(ConversionError::NoTextLayer { pages: pages.len() });
    }

    let mut body = String::new();
    let mut first = true;
    for (idx, text) in pages.iter().enumerate() {
        if text.trim().is_empty() {
            continue;
        }
        if !first {
            body.push_str(&separator.render(idx + 1));
        }
        body.push_str(text.trim());
        first = false;
    }

    let body = postprocess::clean_markdown(&body);
    Ok(match front_matter {
        Some(meta) => format!("{}{}", format_yaml_front_matter(meta), body),
        None => body,
    })
}

fn yaml_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Format document metadata as YAML front matter.
fn format_yaml_front_matter(meta: &FrontMatter) -> String {
    let mut yaml = String::from("---\n");
    yaml.push_str(&format!("source: {}\n", yaml_quote(&meta.source)));
    if let Some(ref t) = meta.title {
        yaml.push_str(&format!("title: {}\n", yaml_quote(t)));
    }
    if let Some(ref a) = meta.author {
        yaml.push_str(&format!("author: {}\n", yaml_quote(a)));
    }
    if let Some(ref s) = meta.subject {
        yaml.push_str(&format!("subject: {}\n", yaml_quote(s)));
    }
    yaml.push_str(&format!("pages: {}\n", meta.pages));
    yaml.push_str("---\n\n");
    yaml
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_accepts_pdf_header() {
        assert!(sniff_pdf(b"%PDF-1.7\n...").is_ok());
    }

    #[test]
    fn sniff_accepts_leading_junk() {
        let mut bytes = vec![b' '; 100];
        bytes.extend_from_slice(b"%PDF-1.4");
        assert!(sniff_pdf(&bytes).is_ok());
    }

    #[test]
    fn sniff_rejects_other_formats() {
        assert_eq!(
            sniff_pdf(b"GIF89a...."),
            Err(ConversionError::NotAPdf { magic: *b"GIF8" })
        );
        assert_eq!(
            sniff_pdf(b"%P"),
            Err(ConversionError::NotAPdf {
                magic: [b'%', b'P', 0, 0]
            })
        );
        assert_eq!(sniff_pdf(b""), Err(ConversionError::EmptyDocument));
    }

    #[test]
    fn header_beyond_window_rejected() {
        let mut bytes = vec![b'x'; HEADER_SEARCH_WINDOW];
        bytes.extend_from_slice(b"%PDF-1.4");
        assert!(matches!(
            sniff_pdf(&bytes),
            Err(ConversionError::NotAPdf { .. })
        ));
    }

    #[test]
    fn garbage_fails_without_pdfium() {
        // The sniff runs before the library is bound, so this works on
        // machines without libpdfium.
        let converter = PdfiumConverter::new(&BulkConfig::default());
        let doc = InputDocument::new("broken.pdf", b"\x00\x01\x02\x03garbage".to_vec());
        assert_eq!(
            converter.convert(&doc),
            Err(ConversionError::NotAPdf {
                magic: [0, 1, 2, 3]
            })
        );
    }

    fn missing_library_config() -> BulkConfig {
        BulkConfig::builder()
            .pdfium_lib_path("/nonexistent/pdfium/libpdfium.so")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn ensure_ready_reports_missing_library() {
        let converter = PdfiumConverter::new(&missing_library_config());
        assert!(matches!(
            converter.ensure_ready().await,
            Err(BulkError::PdfiumBindingFailed(_))
        ));
    }

    #[test]
    fn missing_library_fails_the_document() {
        let converter = PdfiumConverter::new(&missing_library_config());
        let doc = InputDocument::new("ok.pdf", b"%PDF-1.7\n".to_vec());
        assert!(matches!(
            converter.convert(&doc),
            Err(ConversionError::EngineUnavailable { .. })
        ));
    }

    #[test]
    fn load_errors_classified() {
        assert_eq!(
            classify_load_error("PdfiumLibraryInternalError(PasswordError)".into(), false),
            ConversionError::PasswordRequired
        );
        assert_eq!(
            classify_load_error("PdfiumLibraryInternalError(PasswordError)".into(), true),
            ConversionError::WrongPassword
        );
        assert!(matches!(
            classify_load_error("PdfiumLibraryInternalError(FormatError)".into(), false),
            ConversionError::CorruptPdf { .. }
        ));
    }

    #[test]
    fn blank_document_has_no_text_layer() {
        let pages = vec!["  ".to_string(), "\r\n".to_string()];
        assert_eq!(
            assemble_markdown(&pages, &PageSeparator::None, None),
            Err(ConversionError::NoTextLayer { pages: 2 })
        );
    }

    #[test]
    fn pages_joined_with_separator() {
        let pages = vec![
            "Page one".to_string(),
            String::new(),
            "Page three".to_string(),
        ];
        let md = assemble_markdown(&pages, &PageSeparator::Comment, None).unwrap();
        assert_eq!(md, "Page one\n\n<!-- page 3 -->\n\nPage three\n");
    }

    #[test]
    fn front_matter_prepended_and_quoted() {
        let meta = FrontMatter {
            source: "a.pdf".into(),
            title: Some("The \"Best\" Report".into()),
            author: None,
            subject: None,
            pages: 1,
        };
        let md = assemble_markdown(&["Body".to_string()], &PageSeparator::None, Some(&meta))
            .unwrap();
        assert!(md.starts_with("---\nsource: \"a.pdf\"\ntitle: \"The \\\"Best\\\" Report\"\n"));
        assert!(md.contains("pages: 1\n---\n\nBody\n"));
    }

    #[test]
    fn closures_are_converters() {
        let upper = |doc: &InputDocument| -> Result<String, ConversionError> {
            Ok(doc.name().to_uppercase())
        };
        let doc = InputDocument::new("a.pdf", b"%PDF-".to_vec());
        assert_eq!(Converter::convert(&upper, &doc).unwrap(), "A.PDF");
    }
}

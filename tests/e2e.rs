//! End-to-end integration tests against a real pdfium library.
//!
//! They are gated behind the `E2E_ENABLED` environment variable so they do
//! not run in CI unless explicitly requested. pdfium is located through
//! `PDFIUM_LIB_PATH`, the working directory, or the system library path.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/opt/pdfium/lib cargo test --test e2e -- --nocapture

use pdf2md_bulk::{
    archive, convert_batch, BulkConfig, ConversionError, Converter, InputDocument, PageSeparator,
    PdfiumConverter,
};

// ── Test helpers ─────────────────────────────────────────────────────────────

macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    }};
}

/// Build a small valid PDF with one Helvetica text line per page.
fn text_pdf(pages: &[&str]) -> Vec<u8> {
    let n = pages.len();
    // Objects: 1 catalog, 2 pages, 3 font, then (page, content) pairs.
    let mut objects: Vec<String> = Vec::new();
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 4 + i * 2)).collect();
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        n
    ));
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());
    for (i, text) in pages.iter().enumerate() {
        let content_id = 5 + i * 2;
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {content_id} 0 R >>"
        ));
        let stream = format!("BT /F1 18 Tf 72 720 Td ({text}) Tj ET");
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            stream.len(),
            stream
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for off in offsets {
        out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    out
}

// ── Single document ──────────────────────────────────────────────────────────

#[test]
fn test_extracts_text_layer() {
    e2e_skip_unless_enabled!();

    let config = BulkConfig::builder()
        .page_separator(PageSeparator::Comment)
        .build()
        .unwrap();
    let converter = PdfiumConverter::new(&config);
    converter.probe().expect("pdfium must be available for e2e tests");

    let doc = InputDocument::new("two.pdf", text_pdf(&["Hello World", "Second Page"]));
    let md = converter.convert(&doc).unwrap();

    println!("{md}");
    assert!(md.contains("Hello World"));
    assert!(md.contains("<!-- page 2 -->"));
    assert!(md.contains("Second Page"));
    assert!(md.ends_with('\n'));
}

#[test]
fn test_metadata_front_matter() {
    e2e_skip_unless_enabled!();

    let config = BulkConfig::builder().include_metadata(true).build().unwrap();
    let doc = InputDocument::new("meta.pdf", text_pdf(&["Body text"]));
    let md = PdfiumConverter::new(&config).convert(&doc).unwrap();

    assert!(md.starts_with("---\nsource: \"meta.pdf\"\n"));
    assert!(md.contains("pages: 1\n"));
}

#[test]
fn test_truncated_pdf_is_corrupt() {
    e2e_skip_unless_enabled!();

    let mut bytes = text_pdf(&["Hello"]);
    bytes.truncate(40);
    let doc = InputDocument::new("cut.pdf", bytes);
    let err = PdfiumConverter::new(&BulkConfig::default())
        .convert(&doc)
        .unwrap_err();
    assert!(
        matches!(err, ConversionError::CorruptPdf { .. }),
        "got {err:?}"
    );
}

#[test]
fn test_blank_page_has_no_text_layer() {
    e2e_skip_unless_enabled!();

    let doc = InputDocument::new("blank.pdf", text_pdf(&[""]));
    let err = PdfiumConverter::new(&BulkConfig::default())
        .convert(&doc)
        .unwrap_err();
    assert_eq!(err, ConversionError::NoTextLayer { pages: 1 });
}

// ── Whole batch ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_batch_with_pdfium() {
    e2e_skip_unless_enabled!();

    let docs = vec![
        InputDocument::new("a.pdf", text_pdf(&["Alpha"])),
        InputDocument::new("b.pdf", text_pdf(&["Beta"])),
        InputDocument::new("broken.pdf", b"\x89PNG\r\n\x1a\n".to_vec()),
    ];
    let config = BulkConfig::builder().concurrency(2).build().unwrap();
    let session = convert_batch(docs, &config).await.unwrap();

    assert!(session.is_complete());
    assert_eq!(session.succeeded(), 2);
    assert!(matches!(
        session.outcome("broken.pdf").unwrap().error(),
        Some(ConversionError::NotAPdf { .. })
    ));

    let bundle = archive::package(&session).unwrap();
    let names: Vec<&str> = bundle.entries().iter().map(|e| e.entry_name.as_str()).collect();
    assert_eq!(names, vec!["a.md", "b.md"]);
}

//! Streaming dispatch: emit outcomes as documents finish.
//!
//! This is the bounded worker pool. Each document becomes one future that
//! moves the adapter call onto tokio's blocking pool; `buffer_unordered`
//! keeps at most `concurrency` of those futures alive, so at most that many
//! adapter calls are in flight at any instant. Whether they also execute in
//! parallel is up to the adapter: pdfium work is serialized by
//! [`crate::pipeline::engine`]. Items arrive in completion order, not
//! submission order.
//!
//! [`crate::convert::run_session`] consumes this stream and records each
//! item into a session. Use [`convert_stream`] directly when you want the
//! outcomes without a session, for example to write each Markdown file as
//! soon as it is ready.

use crate::config::BulkConfig;
use crate::document::{ConversionOutcome, InputDocument};
use crate::error::ConversionError;
use crate::pipeline::extract::Converter;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio_stream::Stream;
use tracing::{debug, warn};

/// A boxed stream of `(filename, outcome)` pairs.
pub type OutcomeStream = Pin<Box<dyn Stream<Item = (String, ConversionOutcome)> + Send>>;

/// Convert `documents`, yielding each outcome as soon as it is ready.
///
/// Every document is attempted exactly once and yields exactly one item.
/// Failures are items too; nothing short-circuits the stream. Dropping the
/// stream abandons pending documents; conversions already running on the
/// blocking pool finish in the background and their results are discarded.
///
/// Must be polled from within a tokio runtime.
pub fn convert_stream(
    documents: Vec<InputDocument>,
    converter: Arc<dyn Converter>,
    config: &BulkConfig,
) -> OutcomeStream {
    let concurrency = config.concurrency.max(1);
    let callback = config.progress_callback.clone();

    let s = stream::iter(documents.into_iter().map(move |doc| {
        let converter = Arc::clone(&converter);
        let callback = callback.clone();
        async move {
            let name = doc.name().to_string();
            if let Some(ref cb) = callback {
                cb.on_document_start(&name);
            }
            let outcome = convert_one(converter, doc).await;
            (name, outcome)
        }
    }))
    .buffer_unordered(concurrency);

    Box::pin(s)
}

/// Run one adapter call on the blocking pool.
///
/// A panicking adapter is reported as a failure of that document only.
async fn convert_one(converter: Arc<dyn Converter>, doc: InputDocument) -> ConversionOutcome {
    let name = doc.name().to_string();
    let size = doc.size();
    let start = Instant::now();

    let result = tokio::task::spawn_blocking(move || converter.convert(&doc))
        .await
        .unwrap_or_else(|e| {
            Err(ConversionError::Internal(format!(
                "conversion task failed: {}",
                e
            )))
        });

    let elapsed_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(md) => debug!(
            "'{}' converted: {} bytes → {} bytes in {}ms",
            name,
            size,
            md.len(),
            elapsed_ms
        ),
        Err(e) => warn!("'{}' failed after {}ms: {}", name, elapsed_ms, e),
    }

    result.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn converter() -> Arc<dyn Converter> {
        Arc::new(|doc: &InputDocument| -> Result<String, ConversionError> {
            if doc.bytes().starts_with(b"%PDF-") {
                Ok(format!("# {}\n", doc.name()))
            } else {
                Err(ConversionError::NotAPdf { magic: *b"junk" })
            }
        })
    }

    #[tokio::test]
    async fn yields_one_item_per_document() {
        let docs = vec![
            InputDocument::new("a.pdf", b"%PDF-1.7".to_vec()),
            InputDocument::new("b.pdf", b"junk".to_vec()),
            InputDocument::new("c.pdf", b"%PDF-1.4".to_vec()),
        ];
        let items: BTreeMap<String, ConversionOutcome> =
            convert_stream(docs, converter(), &BulkConfig::default())
                .collect()
                .await;

        assert_eq!(items.len(), 3);
        assert!(items["a.pdf"].is_success());
        assert!(!items["b.pdf"].is_success());
        assert_eq!(items["c.pdf"].markdown(), Some("# c.pdf\n"));
    }

    #[tokio::test]
    async fn panicking_converter_fails_only_its_document() {
        let conv: Arc<dyn Converter> =
            Arc::new(|doc: &InputDocument| -> Result<String, ConversionError> {
                if doc.name() == "boom.pdf" {
                    panic!("adapter bug");
                }
                Ok("ok".to_string())
            });
        let docs = vec![
            InputDocument::new("boom.pdf", b"%PDF-".to_vec()),
            InputDocument::new("fine.pdf", b"%PDF-".to_vec()),
        ];
        let items: BTreeMap<String, ConversionOutcome> =
            convert_stream(docs, conv, &BulkConfig::default())
                .collect()
                .await;

        assert!(matches!(
            items["boom.pdf"].error(),
            Some(ConversionError::Internal(_))
        ));
        assert!(items["fine.pdf"].is_success());
    }

    #[tokio::test]
    async fn empty_input_yields_nothing() {
        let items: Vec<_> = convert_stream(Vec::new(), converter(), &BulkConfig::default())
            .collect()
            .await;
        assert!(items.is_empty());
    }
}

//! Batch conversion entry points.
//!
//! [`run_session`] is the dispatcher loop: it drives
//! [`crate::stream::convert_stream`] and records every outcome into a
//! [`ConversionSession`] the moment it arrives, so progress is observable
//! while the batch runs. The other functions are conveniences that build
//! the session and the converter for you.

use crate::config::BulkConfig;
use crate::document::InputDocument;
use crate::error::BulkError;
use crate::pipeline::extract::{Converter, PdfiumConverter};
use crate::pipeline::input;
use crate::session::ConversionSession;
use crate::stream::convert_stream;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Convert a batch of in-memory documents with pdfium.
///
/// # Returns
/// The finished session. Per-document failures are recorded in it; they
/// never make this function return `Err`.
///
/// # Errors
/// * [`BulkError::DuplicateDocument`]: two documents share a filename
/// * [`BulkError::PdfiumBindingFailed`]: pdfium could not be loaded
/// * [`BulkError::DuplicateRecording`]: internal dispatcher bug
///
/// # Example
/// ```rust,no_run
/// use pdf2md_bulk::{archive, convert_batch, BulkConfig, InputDocument};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let docs = vec![InputDocument::new("a.pdf", std::fs::read("a.pdf")?)];
/// let session = convert_batch(docs, &BulkConfig::default()).await?;
/// let bundle = archive::package(&session)?;
/// std::fs::write("out.zip", bundle.bytes())?;
/// # Ok(())
/// # }
/// ```
pub async fn convert_batch(
    documents: Vec<InputDocument>,
    config: &BulkConfig,
) -> Result<ConversionSession, BulkError> {
    let converter = PdfiumConverter::new(config);
    if !documents.is_empty() {
        converter.ensure_ready().await?;
    }
    convert_batch_with(documents, Arc::new(converter), config, CancellationToken::new()).await
}

/// Convert a batch with a caller-supplied converter and cancellation token.
pub async fn convert_batch_with(
    documents: Vec<InputDocument>,
    converter: Arc<dyn Converter>,
    config: &BulkConfig,
    cancel: CancellationToken,
) -> Result<ConversionSession, BulkError> {
    let session = ConversionSession::for_documents(&documents)?;
    run_session(&session, documents, converter, config, cancel).await?;
    Ok(session)
}

/// Resolve paths / URLs, then convert them with pdfium.
pub async fn convert_inputs(
    inputs: &[String],
    config: &BulkConfig,
) -> Result<ConversionSession, BulkError> {
    let documents = input::resolve_inputs(inputs, config).await?;
    convert_batch(documents, config).await
}

/// Synchronous wrapper around [`convert_batch`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_batch_sync(
    documents: Vec<InputDocument>,
    config: &BulkConfig,
) -> Result<ConversionSession, BulkError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| BulkError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_batch(documents, config))
}

/// Dispatch `documents` and record every outcome into `session`.
///
/// Stops early when `cancel` fires or `config.timeout` elapses. In that
/// case the session is marked cancelled, outcomes recorded so far are kept,
/// and in-flight conversions are abandoned. Cancellation is not an error.
///
/// `session` must have been created for exactly these documents; an
/// outcome for an unknown or already-recorded filename aborts the run.
pub async fn run_session(
    session: &ConversionSession,
    documents: Vec<InputDocument>,
    converter: Arc<dyn Converter>,
    config: &BulkConfig,
    cancel: CancellationToken,
) -> Result<(), BulkError> {
    let start = Instant::now();
    let total = documents.len();
    let callback = config.progress_callback.clone();
    info!(
        "Starting batch: {} documents, concurrency {}",
        total, config.concurrency
    );
    if let Some(ref cb) = callback {
        cb.on_batch_start(total);
    }

    let deadline = async {
        match config.timeout {
            Some(t) => tokio::time::sleep(t).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let mut outcomes = convert_stream(documents, converter, config);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Batch cancelled at {}", session.progress());
                session.mark_cancelled();
                break;
            }
            _ = &mut deadline => {
                warn!("Batch timed out at {}", session.progress());
                session.mark_cancelled();
                cancel.cancel();
                break;
            }
            next = outcomes.next() => {
                let Some((name, outcome)) = next else { break };
                let markdown_len = outcome.markdown().map(str::len);
                let error = outcome.error().map(|e| e.to_string());
                let progress = session.record(&name, outcome)?;

                if let Some(ref cb) = callback {
                    match (markdown_len, error) {
                        (Some(len), _) => cb.on_document_complete(&name, progress, len),
                        (None, Some(e)) => cb.on_document_error(&name, progress, &e),
                        (None, None) => {}
                    }
                }
            }
        }
    }
    drop(outcomes);

    let progress = session.progress();
    info!(
        "Batch finished: {} processed, {} succeeded, {} failed, {}ms",
        progress,
        session.succeeded(),
        session.failed(),
        start.elapsed().as_millis()
    );
    if let Some(ref cb) = callback {
        cb.on_batch_complete(progress, session.succeeded());
    }
    Ok(())
}

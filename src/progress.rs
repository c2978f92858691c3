//! Progress-callback trait for per-document conversion events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::BulkConfigBuilder::progress_callback`] to receive events
//! as the dispatcher works through a batch. Polling
//! [`crate::session::ConversionSession::progress`] gives the same numbers;
//! the callback is the push-style alternative for progress bars.
//!
//! # Example
//!
//! ```rust
//! use pdf2md_bulk::{BatchProgressCallback, BulkConfig, Progress};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, name: &str, progress: Progress, markdown_len: usize) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{name}: {markdown_len} bytes ({progress})");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { done: AtomicUsize::new(0) });
//!
//! let config = BulkConfig::builder()
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::document::Progress;
use std::sync::Arc;

/// Called by the dispatcher as it processes each document.
///
/// `on_document_start` runs on the worker side and may be called
/// concurrently from several threads. The completion events are delivered
/// one at a time, in completion order, after the outcome has been recorded.
/// All methods default to no-ops.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before any document is dispatched.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called when a worker picks up a document.
    fn on_document_start(&self, name: &str) {
        let _ = name;
    }

    /// Called after a successful conversion has been recorded.
    ///
    /// # Arguments
    /// * `name`: document filename
    /// * `progress`: session progress including this document
    /// * `markdown_len`: byte length of the produced Markdown
    fn on_document_complete(&self, name: &str, progress: Progress, markdown_len: usize) {
        let _ = (name, progress, markdown_len);
    }

    /// Called after a failed conversion has been recorded.
    fn on_document_error(&self, name: &str, progress: Progress, error: &str) {
        let _ = (name, progress, error);
    }

    /// Called once when the batch stops, whether complete or cancelled.
    ///
    /// # Arguments
    /// * `progress`: final progress
    /// * `succeeded`: documents that converted without error
    fn on_batch_complete(&self, progress: Progress, succeeded: usize) {
        let _ = (progress, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BulkConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        total: AtomicUsize,
        succeeded: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total: usize) {
            self.total.store(total, Ordering::SeqCst);
        }

        fn on_document_start(&self, _name: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _name: &str, _progress: Progress, _markdown_len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_error(&self, _name: &str, _progress: Progress, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _progress: Progress, succeeded: usize) {
            self.succeeded.store(succeeded, Ordering::SeqCst);
        }
    }

    fn p(completed: usize, total: usize) -> Progress {
        Progress { completed, total }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_document_start("a.pdf");
        cb.on_document_complete("a.pdf", p(1, 2), 42);
        cb.on_document_error("b.pdf", p(2, 2), "corrupt");
        cb.on_batch_complete(p(2, 2), 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_batch_start(3);
        tracker.on_document_start("a.pdf");
        tracker.on_document_complete("a.pdf", p(1, 3), 100);
        tracker.on_document_start("b.pdf");
        tracker.on_document_complete("b.pdf", p(2, 3), 200);
        tracker.on_document_start("c.pdf");
        tracker.on_document_error("c.pdf", p(3, 3), "not a PDF");
        tracker.on_batch_complete(p(3, 3), 2);

        assert_eq!(tracker.total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.succeeded.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(10);
        cb.on_document_start("x.pdf");
    }
}

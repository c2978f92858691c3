//! Per-document pipeline stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ postprocess
//! (path/URL)  (pdfium)    (cleanup)
//! ```
//!
//! 1. [`input`]: read local files or download URLs into
//!    [`crate::document::InputDocument`]s, enforcing the size limit
//! 2. [`extract`]: the [`extract::Converter`] seam and its pdfium
//!    implementation; runs inside `spawn_blocking` and hands pdfium work
//!    to the single [`engine`] thread
//! 3. [`postprocess`]: deterministic rules that turn the raw text layer
//!    into tidy Markdown

pub mod engine;
pub mod extract;
pub mod input;
pub mod postprocess;

//! Core value types: the documents going in and the outcomes coming out.

use crate::error::ConversionError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// One uploaded PDF payload.
///
/// The bytes live behind an `Arc` so a document can be handed to a blocking
/// worker without copying the payload.
#[derive(Clone)]
pub struct InputDocument {
    name: String,
    bytes: Arc<[u8]>,
}

impl InputDocument {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Filename the document was submitted under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Name of the Markdown file produced for this document.
    pub fn markdown_name(&self) -> String {
        markdown_file_name(&self.name)
    }
}

impl fmt::Debug for InputDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputDocument")
            .field("name", &self.name)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Result of converting one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionOutcome {
    Success { markdown: String },
    Failure { error: ConversionError },
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionOutcome::Success { .. })
    }

    pub fn markdown(&self) -> Option<&str> {
        match self {
            ConversionOutcome::Success { markdown } => Some(markdown),
            ConversionOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ConversionError> {
        match self {
            ConversionOutcome::Success { .. } => None,
            ConversionOutcome::Failure { error } => Some(error),
        }
    }

    /// First `max_chars` characters of the Markdown, for display.
    ///
    /// `None` for failures.
    pub fn preview(&self, max_chars: usize) -> Option<Preview<'_>> {
        self.markdown().map(|md| Preview::new(md, max_chars))
    }
}

impl From<Result<String, ConversionError>> for ConversionOutcome {
    fn from(result: Result<String, ConversionError>) -> Self {
        match result {
            Ok(markdown) => ConversionOutcome::Success { markdown },
            Err(error) => ConversionOutcome::Failure { error },
        }
    }
}

/// A character-bounded view into a Markdown string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preview<'a> {
    pub text: &'a str,
    /// Total characters in the full Markdown.
    pub total_chars: usize,
}

impl<'a> Preview<'a> {
    fn new(markdown: &'a str, max_chars: usize) -> Self {
        let end = markdown
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(markdown.len());
        Self {
            text: &markdown[..end],
            total_chars: markdown.chars().count(),
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.text.chars().count() < self.total_chars
    }
}

/// `(completed, total)` snapshot of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }

    /// Completion ratio in `0.0..=1.0`; an empty batch counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.completed, self.total)
    }
}

/// `report.pdf` → `report.md`. Directory components are dropped.
///
/// Backslashes, colons and leading dots in the stem become `_`, so an
/// entry like `..\..\evil.md` cannot escape the extraction directory on
/// Windows.
pub fn markdown_file_name(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| sanitize_stem(&s.to_string_lossy()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string());
    format!("{stem}.md")
}

fn sanitize_stem(stem: &str) -> String {
    let mut leading = true;
    stem.chars()
        .map(|c| {
            leading &= c == '.';
            match c {
                '.' if leading => '_',
                '\\' | ':' | '/' => '_',
                c => c,
            }
        })
        .collect()
}

/// Return `candidate`, or `stem (n).ext` for the smallest `n ≥ 2` not yet
/// in `taken`. The chosen name is inserted into `taken`.
pub fn unique_name(candidate: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(candidate.to_string()) {
        return candidate.to_string();
    }

    let path = Path::new(candidate);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 2usize;
    loop {
        let name = format!("{stem} ({n}){ext}");
        if taken.insert(name.clone()) {
            return name;
        }
        n += 1;
    }
}

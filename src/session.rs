//! The result aggregator: one [`ConversionSession`] per bulk request.
//!
//! The session knows every filename up front, so "complete" is simply
//! `completed == total`. Workers never touch the map; the dispatcher calls
//! [`ConversionSession::record`], which is the only mutation and runs under
//! a mutex. Queries take the same lock and return owned snapshots, so a UI
//! task can poll progress while the batch is still running.

use crate::document::{markdown_file_name, unique_name, ConversionOutcome, InputDocument, Progress};
use crate::error::BulkError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error};

/// Aggregate state of one bulk-conversion request.
#[derive(Debug)]
pub struct ConversionSession {
    /// Filenames in submission order.
    order: Vec<String>,
    expected: HashSet<String>,
    state: Mutex<SessionState>,
    cancelled: AtomicBool,
}

#[derive(Debug, Default)]
struct SessionState {
    outcomes: BTreeMap<String, ConversionOutcome>,
    succeeded: usize,
    failed: usize,
}

impl ConversionSession {
    /// Create a session expecting exactly `names`.
    ///
    /// # Errors
    /// [`BulkError::DuplicateDocument`] if a filename appears twice.
    pub fn new<I, S>(names: I) -> Result<Self, BulkError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut order = Vec::new();
        let mut expected = HashSet::new();
        for name in names {
            let name = name.into();
            if !expected.insert(name.clone()) {
                return Err(BulkError::DuplicateDocument { name });
            }
            order.push(name);
        }

        Ok(Self {
            order,
            expected,
            state: Mutex::new(SessionState::default()),
            cancelled: AtomicBool::new(false),
        })
    }

    /// Create a session for the given documents.
    pub fn for_documents(documents: &[InputDocument]) -> Result<Self, BulkError> {
        Self::new(documents.iter().map(|d| d.name().to_string()))
    }

    // A panic while the lock is held cannot leave the state half-written:
    // `record` validates first and mutates last.
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the outcome for `name`.
    ///
    /// Returns the progress including this outcome.
    ///
    /// # Errors
    /// * [`BulkError::UnknownDocument`]: `name` was never submitted
    /// * [`BulkError::DuplicateRecording`]: `name` already has an outcome
    pub fn record(
        &self,
        name: &str,
        outcome: ConversionOutcome,
    ) -> Result<Progress, BulkError> {
        if !self.expected.contains(name) {
            error!("Outcome recorded for unknown document '{}'", name);
            return Err(BulkError::UnknownDocument {
                name: name.to_string(),
            });
        }

        let mut state = self.lock();
        if state.outcomes.contains_key(name) {
            error!("Outcome for '{}' recorded twice", name);
            return Err(BulkError::DuplicateRecording {
                name: name.to_string(),
            });
        }

        if outcome.is_success() {
            state.succeeded += 1;
        } else {
            state.failed += 1;
        }
        state.outcomes.insert(name.to_string(), outcome);

        let progress = Progress {
            completed: state.outcomes.len(),
            total: self.order.len(),
        };
        debug!("Recorded '{}' ({})", name, progress);
        Ok(progress)
    }

    pub fn total(&self) -> usize {
        self.order.len()
    }

    /// Current `(completed, total)`.
    pub fn progress(&self) -> Progress {
        Progress {
            completed: self.lock().outcomes.len(),
            total: self.order.len(),
        }
    }

    /// True once every submitted document has an outcome.
    pub fn is_complete(&self) -> bool {
        self.progress().is_complete()
    }

    pub fn succeeded(&self) -> usize {
        self.lock().succeeded
    }

    pub fn failed(&self) -> usize {
        self.lock().failed
    }

    /// Outcome for one document, if recorded.
    pub fn outcome(&self, name: &str) -> Option<ConversionOutcome> {
        self.lock().outcomes.get(name).cloned()
    }

    /// Recorded outcomes in submission order. Pending documents are skipped.
    pub fn outcomes(&self) -> Vec<(String, ConversionOutcome)> {
        let state = self.lock();
        self.order
            .iter()
            .filter_map(|name| {
                state
                    .outcomes
                    .get(name)
                    .map(|o| (name.clone(), o.clone()))
            })
            .collect()
    }

    /// `(filename, markdown)` for every success, sorted by filename.
    pub fn successes(&self) -> Vec<(String, String)> {
        self.lock()
            .outcomes
            .iter()
            .filter_map(|(name, o)| o.markdown().map(|md| (name.clone(), md.to_string())))
            .collect()
    }

    pub(crate) fn mark_cancelled(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True if the batch was stopped by cancellation or timeout.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Serializable per-document summary, in submission order.
    pub fn report(&self) -> SessionReport {
        let state = self.lock();

        // Successes get the same entry names the archive would give them.
        let mut taken = HashSet::new();
        let entry_names: HashMap<&str, String> = state
            .outcomes
            .iter()
            .filter(|(_, o)| o.is_success())
            .map(|(name, _)| {
                let entry = unique_name(&markdown_file_name(name), &mut taken);
                (name.as_str(), entry)
            })
            .collect();

        let documents = self
            .order
            .iter()
            .map(|name| {
                let (status, markdown_len, error) = match state.outcomes.get(name) {
                    None => (DocumentStatus::Pending, None, None),
                    Some(ConversionOutcome::Success { markdown }) => {
                        (DocumentStatus::Succeeded, Some(markdown.len()), None)
                    }
                    Some(ConversionOutcome::Failure { error }) => {
                        (DocumentStatus::Failed, None, Some(error.to_string()))
                    }
                };
                DocumentReport {
                    name: name.clone(),
                    markdown_file: entry_names
                        .get(name.as_str())
                        .cloned()
                        .unwrap_or_else(|| markdown_file_name(name)),
                    status,
                    markdown_len,
                    error,
                }
            })
            .collect();

        SessionReport {
            total: self.order.len(),
            completed: state.outcomes.len(),
            succeeded: state.succeeded,
            failed: state.failed,
            cancelled: self.is_cancelled(),
            documents,
        }
    }
}

/// Snapshot of a session suitable for JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: bool,
    pub documents: Vec<DocumentReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
    pub name: String,
    pub markdown_file: String,
    pub status: DocumentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown_len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Succeeded,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConversionError;
    use std::sync::Arc;

    fn ok(md: &str) -> ConversionOutcome {
        ConversionOutcome::Success {
            markdown: md.to_string(),
        }
    }

    fn fail() -> ConversionOutcome {
        ConversionOutcome::Failure {
            error: ConversionError::CorruptPdf {
                detail: "bad xref".into(),
            },
        }
    }

    #[test]
    fn empty_session_is_complete() {
        let s = ConversionSession::new(Vec::<String>::new()).unwrap();
        assert!(s.is_complete());
        assert_eq!(s.progress(), Progress { completed: 0, total: 0 });
    }

    #[test]
    fn duplicate_submission_rejected() {
        let err = ConversionSession::new(["a.pdf", "b.pdf", "a.pdf"]).unwrap_err();
        assert!(matches!(err, BulkError::DuplicateDocument { ref name } if name == "a.pdf"));
    }

    #[test]
    fn records_and_counts() {
        let s = ConversionSession::new(["a.pdf", "b.pdf"]).unwrap();
        let p = s.record("b.pdf", fail()).unwrap();
        assert_eq!(p, Progress { completed: 1, total: 2 });
        assert!(!s.is_complete());

        s.record("a.pdf", ok("# A\n")).unwrap();
        assert!(s.is_complete());
        assert_eq!(s.succeeded(), 1);
        assert_eq!(s.failed(), 1);
        assert_eq!(s.outcome("a.pdf"), Some(ok("# A\n")));
    }

    #[test]
    fn second_write_is_an_error_not_an_overwrite() {
        let s = ConversionSession::new(["a.pdf"]).unwrap();
        s.record("a.pdf", ok("first")).unwrap();
        let err = s.record("a.pdf", ok("second")).unwrap_err();
        assert!(matches!(err, BulkError::DuplicateRecording { .. }));
        assert_eq!(s.outcome("a.pdf"), Some(ok("first")));
        assert_eq!(s.succeeded(), 1);
    }

    #[test]
    fn unknown_document_rejected() {
        let s = ConversionSession::new(["a.pdf"]).unwrap();
        let err = s.record("z.pdf", ok("x")).unwrap_err();
        assert!(matches!(err, BulkError::UnknownDocument { .. }));
        assert_eq!(s.progress().completed, 0);
    }

    #[test]
    fn outcomes_follow_submission_order() {
        let s = ConversionSession::new(["c.pdf", "a.pdf", "b.pdf"]).unwrap();
        s.record("b.pdf", ok("b")).unwrap();
        s.record("c.pdf", ok("c")).unwrap();
        let names: Vec<_> = s.outcomes().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["c.pdf", "b.pdf"]);
    }

    #[test]
    fn successes_sorted_by_name() {
        let s = ConversionSession::new(["c.pdf", "a.pdf", "b.pdf"]).unwrap();
        s.record("c.pdf", ok("c")).unwrap();
        s.record("b.pdf", fail()).unwrap();
        s.record("a.pdf", ok("a")).unwrap();
        assert_eq!(
            s.successes(),
            vec![
                ("a.pdf".to_string(), "a".to_string()),
                ("c.pdf".to_string(), "c".to_string())
            ]
        );
    }

    #[test]
    fn report_marks_pending_documents() {
        let s = ConversionSession::new(["a.pdf", "b.pdf", "c.pdf"]).unwrap();
        s.record("a.pdf", ok("1234")).unwrap();
        s.record("c.pdf", fail()).unwrap();
        s.mark_cancelled();

        let r = s.report();
        assert!(r.cancelled);
        assert_eq!((r.total, r.completed, r.succeeded, r.failed), (3, 2, 1, 1));
        assert_eq!(r.documents[0].status, DocumentStatus::Succeeded);
        assert_eq!(r.documents[0].markdown_len, Some(4));
        assert_eq!(r.documents[0].markdown_file, "a.md");
        assert_eq!(r.documents[1].status, DocumentStatus::Pending);
        assert_eq!(r.documents[2].status, DocumentStatus::Failed);
        assert!(r.documents[2].error.as_deref().unwrap().contains("bad xref"));
    }

    #[test]
    fn concurrent_recording_keeps_tally_consistent() {
        let names: Vec<String> = (0..64).map(|i| format!("doc{i}.pdf")).collect();
        let s = Arc::new(ConversionSession::new(names.clone()).unwrap());

        let handles: Vec<_> = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let s = Arc::clone(&s);
                std::thread::spawn(move || {
                    let outcome = if i % 3 == 0 { fail() } else { ok("x") };
                    s.record(&name, outcome).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert!(s.is_complete());
        assert_eq!(s.succeeded() + s.failed(), 64);
        assert_eq!(s.failed(), 22);
    }
}

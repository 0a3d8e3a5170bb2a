//! One scan job: append-only results behind a per-job lock.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::types::job::{JobState, JobView};
use crate::types::probe::ProbeResult;

struct JobInner {
    state: JobState,
    results: Vec<ProbeResult>,
    /// Providers that already appended, to refuse duplicates
    seen: HashSet<String>,
    error: Option<String>,
    terminal_at: Option<Instant>,
}

/// A single scan job. All mutation goes through the per-job mutex; the
/// store's global lock is only held for insert/lookup/evict.
pub struct JobRecord {
    id: Uuid,
    username: String,
    providers_count: usize,
    created_at: DateTime<Utc>,
    cancel: CancellationToken,
    inner: Mutex<JobInner>,
}

impl JobRecord {
    pub fn new(username: impl Into<String>, providers_count: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            providers_count,
            created_at: Utc::now(),
            cancel: CancellationToken::new(),
            inner: Mutex::new(JobInner {
                state: JobState::Pending,
                results: Vec::new(),
                seen: HashSet::new(),
                error: None,
                terminal_at: None,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn providers_count(&self) -> usize {
        self.providers_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Signal cancellation. The engine observes the token and drives the
    /// state transition; cancelling a terminal job is a no-op.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> JobState {
        self.inner.lock().unwrap().state
    }

    pub(crate) fn set_running(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == JobState::Pending {
            inner.state = JobState::Running;
            true
        } else {
            false
        }
    }

    /// Append one terminal probe result. Refused once the job is
    /// terminal and for providers that already reported.
    pub(crate) fn append_result(&self, result: ProbeResult) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.state.is_terminal() || inner.seen.contains(&result.provider) {
            return false;
        }
        inner.seen.insert(result.provider.clone());
        inner.results.push(result);
        true
    }

    /// Providers (of the given fanout) that have not reported yet.
    pub(crate) fn missing_providers(&self, fanout: &[String]) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        fanout
            .iter()
            .filter(|name| !inner.seen.contains(*name))
            .cloned()
            .collect()
    }

    /// Snapshot of the results for the addon pipeline.
    pub(crate) fn results_snapshot(&self) -> Vec<ProbeResult> {
        self.inner.lock().unwrap().results.clone()
    }

    /// Write back addon-enriched results. Only valid while running;
    /// provider identity must be unchanged.
    pub(crate) fn replace_results(&self, results: Vec<ProbeResult>) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.state.is_terminal() || results.len() != inner.results.len() {
            return false;
        }
        inner.results = results;
        true
    }

    pub(crate) fn finish_done(&self) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.state.is_terminal() {
            inner.state = JobState::Done;
            inner.terminal_at = Some(Instant::now());
        }
    }

    pub(crate) fn finish_failed(&self, error: impl Into<String>) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.state.is_terminal() {
            inner.state = JobState::Failed;
            inner.error = Some(error.into());
            inner.terminal_at = Some(Instant::now());
        }
    }

    /// How long ago the job reached a terminal state.
    pub(crate) fn terminal_elapsed(&self) -> Option<std::time::Duration> {
        self.inner
            .lock()
            .unwrap()
            .terminal_at
            .map(|at| at.elapsed())
    }

    /// Projection for pollers. `limit` truncates `results`; counts always
    /// cover the full set. `Some(0)` returns counts only.
    pub fn view(&self, limit: Option<usize>) -> JobView {
        let inner = self.inner.lock().unwrap();
        let (found_count, failed_count) = JobView::counts(&inner.results);
        let results = match limit {
            Some(limit) => inner.results.iter().take(limit).cloned().collect(),
            None => inner.results.clone(),
        };
        JobView {
            job_id: self.id.to_string(),
            state: inner.state,
            username: self.username.clone(),
            providers_count: self.providers_count,
            results_count: inner.results.len(),
            found_count,
            failed_count,
            error: inner.error.clone(),
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::probe::ProbeStatus;

    fn result(provider: &str, status: ProbeStatus) -> ProbeResult {
        ProbeResult::new(provider, status, "https://example.test/u/a")
    }

    #[test]
    fn test_append_and_counts() {
        let job = JobRecord::new("alice", 3);
        assert!(job.set_running());

        assert!(job.append_result(result("a", ProbeStatus::Found)));
        assert!(job.append_result(result("b", ProbeStatus::Error)));

        let view = job.view(None);
        assert_eq!(view.results_count, 2);
        assert_eq!(view.found_count, 1);
        assert_eq!(view.failed_count, 1);
    }

    #[test]
    fn test_duplicate_provider_refused() {
        let job = JobRecord::new("alice", 2);
        job.set_running();
        assert!(job.append_result(result("a", ProbeStatus::Found)));
        assert!(!job.append_result(result("a", ProbeStatus::Error)));
        assert_eq!(job.view(None).results_count, 1);
    }

    #[test]
    fn test_no_append_after_terminal() {
        let job = JobRecord::new("alice", 2);
        job.set_running();
        job.finish_done();
        assert!(!job.append_result(result("a", ProbeStatus::Found)));
        assert_eq!(job.view(None).results_count, 0);
    }

    #[test]
    fn test_no_transition_out_of_terminal() {
        let job = JobRecord::new("alice", 1);
        job.set_running();
        job.finish_failed("cancelled");
        job.finish_done();
        let view = job.view(None);
        assert_eq!(view.state, JobState::Failed);
        assert_eq!(view.error.as_deref(), Some("cancelled"));
    }

    #[test]
    fn test_view_limit() {
        let job = JobRecord::new("alice", 5);
        job.set_running();
        for name in ["a", "b", "c", "d"] {
            job.append_result(result(name, ProbeStatus::NotFound));
        }

        let view = job.view(Some(2));
        assert_eq!(view.results.len(), 2);
        assert_eq!(view.results_count, 4);

        let view = job.view(Some(0));
        assert!(view.results.is_empty());
        assert_eq!(view.results_count, 4);
    }

    #[test]
    fn test_missing_providers() {
        let job = JobRecord::new("alice", 3);
        job.set_running();
        job.append_result(result("b", ProbeStatus::Found));
        let fanout = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(job.missing_providers(&fanout), vec!["a", "c"]);
    }
}

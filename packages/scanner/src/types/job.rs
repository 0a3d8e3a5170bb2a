//! Job lifecycle state and the projection returned to pollers.

use serde::{Deserialize, Serialize};

use super::probe::{ProbeResult, ProbeStatus};

/// Job lifecycle. Cancellation is modeled as `Failed` with error
/// `"cancelled"`; there are no transitions out of terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Done,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }
}

/// Snapshot of a job returned by `get(job_id, limit)`.
///
/// Counts always reflect the full result set even when `results` is
/// truncated by a poll limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobView {
    pub job_id: String,
    pub state: JobState,
    pub username: String,
    pub providers_count: usize,
    pub results_count: usize,
    pub found_count: usize,
    pub failed_count: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub results: Vec<ProbeResult>,
}

impl JobView {
    /// Derive the counts from a full result slice.
    pub fn counts(results: &[ProbeResult]) -> (usize, usize) {
        let found = results
            .iter()
            .filter(|r| r.status == ProbeStatus::Found)
            .count();
        let failed = results
            .iter()
            .filter(|r| r.status == ProbeStatus::Error)
            .count();
        (found, failed)
    }
}

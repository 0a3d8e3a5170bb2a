//! The job manager facade: submit, poll, cancel.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::engine::ScanEngine;
use crate::error::{Result, ScanError};
use crate::registry::Registry;
use crate::types::job::JobView;

use super::job::JobRecord;
use super::store::{JobStore, StoreConfig};

/// Maximum username length after trimming.
const MAX_USERNAME_LEN: usize = 64;

/// Optional submit parameters.
#[derive(Default)]
pub struct SubmitOptions {
    /// Provider subset; unknown names are silently dropped, empty
    /// means all providers
    pub providers: Vec<String>,
    /// Raw bytes of reference face images; enables the face-match addon
    pub references: Vec<Vec<u8>>,
}

/// Creates jobs, spawns scans, and answers polls from the bounded store.
pub struct JobManager {
    registry: Arc<Registry>,
    engine: Arc<ScanEngine>,
    store: JobStore,
}

impl JobManager {
    pub fn new(registry: Arc<Registry>, engine: Arc<ScanEngine>) -> Self {
        Self {
            registry,
            engine,
            store: JobStore::default(),
        }
    }

    pub fn with_store_config(mut self, config: StoreConfig) -> Self {
        self.store = JobStore::new(config);
        self
    }

    /// Create a job and start scanning in the background. Returns the
    /// job id immediately; partial results are visible through `get`.
    pub fn submit(&self, username: &str, options: SubmitOptions) -> Result<Uuid> {
        let username = sanitize_username(username)?;
        let providers = self.registry.select(&options.providers);

        let job = Arc::new(JobRecord::new(username, providers.len()));
        self.store.insert(Arc::clone(&job));

        info!(
            job_id = %job.id(),
            username = %job.username(),
            providers = providers.len(),
            "job submitted"
        );

        let engine = Arc::clone(&self.engine);
        let record = Arc::clone(&job);
        tokio::spawn(async move {
            engine.run(record, providers, options.references).await;
        });

        Ok(job.id())
    }

    /// Poll a job. `limit` truncates the result list; counts always
    /// cover everything appended so far.
    pub fn get(&self, id: Uuid, limit: Option<usize>) -> Result<JobView> {
        self.store
            .get(id)
            .map(|job| job.view(limit))
            .ok_or(ScanError::JobNotFound)
    }

    /// Signal cancellation. The engine drives the job to
    /// `failed error=cancelled`; terminal jobs are unaffected.
    pub fn cancel(&self, id: Uuid) -> Result<()> {
        let job = self.store.get(id).ok_or(ScanError::JobNotFound)?;
        job.cancel();
        Ok(())
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

fn sanitize_username(raw: &str) -> Result<String> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(ScanError::InvalidUsername {
            reason: "empty".to_string(),
        });
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ScanError::InvalidUsername {
            reason: format!("longer than {MAX_USERNAME_LEN} characters"),
        });
    }
    if username.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ScanError::InvalidUsername {
            reason: "contains whitespace or control characters".to_string(),
        });
    }
    Ok(username.to_string())
}

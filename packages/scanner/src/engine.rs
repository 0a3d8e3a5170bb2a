//! The scan engine: fans providers out for one username, streams
//! completed results into the job record, and runs the addon pipeline
//! once every probe is terminal.
//!
//! Results are appended in completion order, not provider order.
//! Failures stay confined to their probe; a driver panic becomes a
//! `status: error` result at the task join. Cancellation and the
//! job-wide deadline fill every outstanding provider with a `cancelled`
//! result and fail the job.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, warn};

use crate::addons::AddonPipeline;
use crate::jobs::JobRecord;
use crate::limits::RateController;
use crate::providers::{DriverSettings, Provider, ScanContext};
use crate::transport::Transport;
use crate::types::probe::ProbeResult;

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Whole-job deadline; firing it cancels outstanding probes
    pub job_deadline: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            job_deadline: Duration::from_secs(180),
        }
    }
}

/// Fans out providers under the rate controller and owns the addon
/// pipeline. One engine serves all jobs.
pub struct ScanEngine {
    transport: Arc<dyn Transport>,
    limiter: Arc<RateController>,
    settings: DriverSettings,
    addons: AddonPipeline,
    config: EngineConfig,
}

impl ScanEngine {
    pub fn new(transport: Arc<dyn Transport>, limiter: Arc<RateController>) -> Self {
        let addons = AddonPipeline::new(Arc::clone(&transport));
        Self {
            transport,
            limiter,
            settings: DriverSettings::default(),
            addons,
            config: EngineConfig::default(),
        }
    }

    pub fn with_settings(mut self, settings: DriverSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_addons(mut self, addons: AddonPipeline) -> Self {
        self.addons = addons;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Run one scan to a terminal state. The job record is the only
    /// shared mutable state; every append happens under its lock.
    pub async fn run(
        &self,
        job: Arc<JobRecord>,
        providers: Vec<Arc<dyn Provider>>,
        references: Vec<Vec<u8>>,
    ) {
        if !job.set_running() {
            warn!(job_id = %job.id(), "job not in pending state, refusing to run");
            return;
        }

        let username = job.username().to_string();
        let cancel = job.cancel_token();
        let context = Arc::new(ScanContext {
            transport: Arc::clone(&self.transport),
            limiter: Arc::clone(&self.limiter),
            cancel: cancel.clone(),
            settings: self.settings.clone(),
        });

        info!(
            job_id = %job.id(),
            username = %username,
            providers = providers.len(),
            "scan starting"
        );

        let fanout: Vec<String> = providers.iter().map(|p| p.name().to_string()).collect();
        let urls: HashMap<String, String> = providers
            .iter()
            .map(|p| (p.name().to_string(), p.probe_url(&username)))
            .collect();

        let mut tasks = FuturesUnordered::new();
        for provider in providers {
            let context = Arc::clone(&context);
            let username = username.clone();
            let name = provider.name().to_string();
            let url = provider.probe_url(&username);
            let budget = provider.time_budget();

            let handle = tokio::spawn(async move {
                let probe_url = provider.probe_url(&username);
                match tokio::time::timeout(budget, provider.check(&context, &username)).await {
                    Ok(result) => result,
                    Err(_) => ProbeResult::failed(provider.name(), probe_url, "timeout"),
                }
            });

            tasks.push(async move { (name, url, handle.await) });
        }

        let deadline = tokio::time::sleep(self.config.job_deadline);
        tokio::pin!(deadline);
        let mut interrupted = false;

        while !tasks.is_empty() {
            tokio::select! {
                joined = tasks.next() => {
                    let Some((name, url, outcome)) = joined else { break };
                    let result = match outcome {
                        Ok(result) => result,
                        Err(err) if err.is_panic() => {
                            warn!(job_id = %job.id(), provider = %name, "driver panicked");
                            ProbeResult::failed(&name, url, "driver panicked")
                        }
                        Err(_) => ProbeResult::failed(&name, url, "cancelled"),
                    };
                    debug!(
                        job_id = %job.id(),
                        provider = %result.provider,
                        status = ?result.status,
                        "probe complete"
                    );
                    job.append_result(result);
                }
                _ = cancel.cancelled() => {
                    interrupted = true;
                    break;
                }
                _ = &mut deadline => {
                    info!(job_id = %job.id(), "job deadline reached");
                    cancel.cancel();
                    interrupted = true;
                    break;
                }
            }
        }

        if interrupted {
            for name in job.missing_providers(&fanout) {
                let url = urls.get(&name).cloned().unwrap_or_default();
                job.append_result(ProbeResult::failed(&name, url, "cancelled"));
            }
            job.finish_failed("cancelled");
            info!(job_id = %job.id(), "scan cancelled");
            return;
        }

        // every probe is terminal; enrich, write back, then freeze
        let mut results = job.results_snapshot();
        tokio::select! {
            _ = cancel.cancelled() => {
                job.finish_failed("cancelled");
                info!(job_id = %job.id(), "scan cancelled during enrichment");
                return;
            }
            _ = self.addons.run(&mut results, &references) => {}
        }

        job.replace_results(results);
        job.finish_done();

        let view = job.view(Some(0));
        info!(
            job_id = %job.id(),
            found = view.found_count,
            failed = view.failed_count,
            results = view.results_count,
            "scan complete"
        );
    }
}

//! Provider drivers: the generic data-driven driver plus code drivers.
//!
//! Every driver implements the same contract: `check(ctx, username)`
//! returns a terminal `ProbeResult` and never propagates an error. The
//! engine additionally catches panics at the task join.

pub mod generic;
pub mod github;
pub mod hibp;
pub mod reddit;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{SecurityError, TransportError, TransportResult};
use crate::limits::RateController;
use crate::transport::{ProbeRequest, ProbeResponse, Transport};
use crate::types::probe::ProbeResult;

pub use generic::GenericProvider;
pub use github::GithubProvider;
pub use hibp::HibpProvider;
pub use reddit::RedditProvider;

/// A configured or coded method for probing one site for a username.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    /// The URL this provider would probe for a username. Used for the
    /// fallback results the engine writes when a driver times out or
    /// panics.
    fn probe_url(&self, username: &str) -> String;

    /// Total time budget for one `check` call, covering every request
    /// the driver issues. Defaults to twice the default request timeout.
    fn time_budget(&self) -> std::time::Duration {
        std::time::Duration::from_secs(20)
    }

    /// Probe one provider. All failures are mapped into the result.
    async fn check(&self, ctx: &ScanContext, username: &str) -> ProbeResult;
}

/// Settings consumed by code drivers.
#[derive(Debug, Clone, Default)]
pub struct DriverSettings {
    /// HIBP API key; the breach driver reports `error` without one
    pub hibp_api_key: Option<String>,
}

/// Everything a driver needs to issue requests under the scan's limits.
pub struct ScanContext {
    pub transport: Arc<dyn Transport>,
    pub limiter: Arc<RateController>,
    pub cancel: CancellationToken,
    pub settings: DriverSettings,
}

impl ScanContext {
    /// Issue one request: check cancellation, acquire the rate permit,
    /// then fetch. The permit is held until the body is read.
    pub async fn fetch(&self, request: &ProbeRequest) -> TransportResult<ProbeResponse> {
        if self.cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        let host = request.host().ok_or(SecurityError::NoHost)?;
        let _permit = self.limiter.acquire(&host).await?;

        tokio::select! {
            _ = self.cancel.cancelled() => Err(TransportError::Cancelled),
            outcome = self.transport.fetch(request) => outcome,
        }
    }
}

/// The code drivers shipped with the scanner, in registration order.
/// Code drivers override YAML descriptors of the same name.
pub fn builtin_code_drivers(settings: &DriverSettings) -> Vec<Arc<dyn Provider>> {
    vec![
        Arc::new(GithubProvider::new()),
        Arc::new(RedditProvider::new()),
        Arc::new(HibpProvider::new(settings.hibp_api_key.clone())),
    ]
}

//! Mock transport for testing drivers, the engine, and the addons
//! without a network.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{TransportError, TransportResult};
use crate::transport::{Overflow, ProbeRequest, ProbeResponse, Transport};

/// How a mocked route fails.
#[derive(Debug, Clone, Copy)]
pub enum MockFailure {
    Timeout,
    Connect,
}

#[derive(Clone)]
struct Canned {
    status: u16,
    headers: HashMap<String, String>,
    body: Vec<u8>,
    delay: Option<Duration>,
    failure: Option<MockFailure>,
}

/// Mock transport with canned responses keyed by exact URL.
///
/// Unrouted URLs fail like a connection error. Body caps and overflow
/// behavior are honored the way the real transport does.
#[derive(Default, Clone)]
pub struct MockTransport {
    routes: Arc<RwLock<HashMap<String, Canned>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route an HTML response.
    pub fn with_html(self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.route(
            url,
            Canned {
                status,
                headers: HashMap::from([(
                    "content-type".to_string(),
                    "text/html; charset=utf-8".to_string(),
                )]),
                body: body.into().into_bytes(),
                delay: None,
                failure: None,
            },
        )
    }

    /// Route a JSON response.
    pub fn with_json(self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.route(
            url,
            Canned {
                status,
                headers: HashMap::from([(
                    "content-type".to_string(),
                    "application/json".to_string(),
                )]),
                body: body.into().into_bytes(),
                delay: None,
                failure: None,
            },
        )
    }

    /// Route raw bytes with an explicit content type (avatar fixtures).
    pub fn with_bytes(
        self,
        url: impl Into<String>,
        content_type: impl Into<String>,
        body: Vec<u8>,
    ) -> Self {
        self.route(
            url,
            Canned {
                status: 200,
                headers: HashMap::from([("content-type".to_string(), content_type.into())]),
                body,
                delay: None,
                failure: None,
            },
        )
    }

    /// Route a bare status with an empty body.
    pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
        self.with_html(url, status, "")
    }

    /// Route a transport failure.
    pub fn with_failure(self, url: impl Into<String>, failure: MockFailure) -> Self {
        self.route(
            url,
            Canned {
                status: 0,
                headers: HashMap::new(),
                body: Vec::new(),
                delay: None,
                failure: Some(failure),
            },
        )
    }

    /// Delay an already-routed URL (cancellation and pacing tests).
    pub fn with_delay(self, url: impl Into<String>, delay: Duration) -> Self {
        let url = url.into();
        {
            let mut routes = self.routes.write().unwrap();
            if let Some(canned) = routes.get_mut(&url) {
                canned.delay = Some(delay);
            }
        }
        self
    }

    fn route(self, url: impl Into<String>, canned: Canned) -> Self {
        self.routes.write().unwrap().insert(url.into(), canned);
        self
    }

    /// URLs fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, request: &ProbeRequest) -> TransportResult<ProbeResponse> {
        self.calls.write().unwrap().push(request.url.clone());

        let canned = {
            let routes = self.routes.read().unwrap();
            routes.get(&request.url).cloned()
        };

        let Some(canned) = canned else {
            return Err(TransportError::Connect(format!(
                "no route for {}",
                request.url
            )));
        };

        if let Some(delay) = canned.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(failure) = canned.failure {
            return Err(match failure {
                MockFailure::Timeout => TransportError::Timeout,
                MockFailure::Connect => TransportError::Connect("connection refused".to_string()),
            });
        }

        let mut body = canned.body;
        let mut truncated = false;
        if body.len() > request.body_cap {
            match request.overflow {
                Overflow::Reject => {
                    return Err(TransportError::BodyTooLarge {
                        limit: request.body_cap,
                    })
                }
                Overflow::Truncate => {
                    body.truncate(request.body_cap);
                    truncated = true;
                }
            }
        }

        Ok(ProbeResponse {
            http_status: canned.status,
            headers: canned.headers,
            body,
            truncated,
            final_url: request.url.clone(),
        })
    }
}

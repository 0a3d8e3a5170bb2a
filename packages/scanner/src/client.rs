//! HTTP client factory and the reqwest-backed `Transport`.
//!
//! One pooled client per (redirect policy, onion) combination; UA-profile
//! headers and the per-request timeout are applied per request, so
//! connection reuse per host still works across providers. Clients idle
//! longer than 30 s drop their connections.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use tracing::{debug, warn};

use crate::error::{TransportError, TransportResult};
use crate::guard::{is_onion_host, UrlGuard};
use crate::transport::{Overflow, ProbeRequest, ProbeResponse, Transport};

/// Redirect depth cap for all clients.
const REDIRECT_CAP: usize = 5;

/// Idle connections are closed after this long.
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the client factory.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// SOCKS5h proxy URL for `.onion` hosts (e.g. `socks5h://127.0.0.1:9050`)
    pub socks_proxy: Option<String>,
}

/// Builds and caches the reqwest clients used for all outbound requests.
pub struct ClientFactory {
    direct: reqwest::Client,
    direct_no_redirect: reqwest::Client,
    onion: Option<reqwest::Client>,
    onion_no_redirect: Option<reqwest::Client>,
}

impl ClientFactory {
    pub fn new(config: &ClientConfig) -> TransportResult<Self> {
        let direct = Self::builder(None, true)?;
        let direct_no_redirect = Self::builder(None, false)?;

        let (onion, onion_no_redirect) = match &config.socks_proxy {
            Some(proxy) => (
                Some(Self::builder(Some(proxy), true)?),
                Some(Self::builder(Some(proxy), false)?),
            ),
            None => (None, None),
        };

        Ok(Self {
            direct,
            direct_no_redirect,
            onion,
            onion_no_redirect,
        })
    }

    fn builder(proxy: Option<&str>, follow_redirects: bool) -> TransportResult<reqwest::Client> {
        let redirect = if follow_redirects {
            reqwest::redirect::Policy::limited(REDIRECT_CAP)
        } else {
            reqwest::redirect::Policy::none()
        };

        // no cookie jar: reqwest keeps none unless one is installed
        let mut builder = reqwest::Client::builder()
            .redirect(redirect)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT);

        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| TransportError::Request(format!("invalid proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| TransportError::Request(format!("client build failed: {e}")))
    }

    /// Pick the client for a host and redirect policy.
    fn client_for(&self, host: &str, follow_redirects: bool) -> TransportResult<&reqwest::Client> {
        if is_onion_host(host) {
            let client = if follow_redirects {
                self.onion.as_ref()
            } else {
                self.onion_no_redirect.as_ref()
            };
            client.ok_or_else(|| TransportError::NoProxy {
                host: host.to_string(),
            })
        } else if follow_redirects {
            Ok(&self.direct)
        } else {
            Ok(&self.direct_no_redirect)
        }
    }
}

/// Production `Transport` backed by reqwest.
pub struct HttpTransport {
    factory: ClientFactory,
    guard: UrlGuard,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> TransportResult<Self> {
        let guard = UrlGuard::new(config.socks_proxy.is_some());
        Ok(Self {
            factory: ClientFactory::new(config)?,
            guard,
        })
    }

    /// Replace the URL guard (tests point it at a local server).
    pub fn with_guard(mut self, guard: UrlGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Read the body up to the cap, truncating or rejecting on overflow.
    async fn read_body(
        mut response: reqwest::Response,
        cap: usize,
        overflow: Overflow,
    ) -> TransportResult<(Vec<u8>, bool)> {
        let mut body: Vec<u8> = Vec::new();
        let mut truncated = false;

        while let Some(chunk) = response.chunk().await.map_err(TransportError::from_reqwest)? {
            if body.len() + chunk.len() > cap {
                match overflow {
                    Overflow::Reject => return Err(TransportError::BodyTooLarge { limit: cap }),
                    Overflow::Truncate => {
                        let take = cap - body.len();
                        body.extend_from_slice(&chunk[..take]);
                        truncated = true;
                        break;
                    }
                }
            }
            body.extend_from_slice(&chunk);
        }

        Ok((body, truncated))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &ProbeRequest) -> TransportResult<ProbeResponse> {
        self.guard.validate(&request.url, request.kind)?;

        let host = request.host().ok_or(crate::error::SecurityError::NoHost)?;
        let client = self.factory.client_for(&host, request.follow_redirects)?;

        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .unwrap_or(reqwest::Method::GET);

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(request.ua.user_agent()));
        headers.insert(ACCEPT, HeaderValue::from_static(request.ua.accept()));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(request.ua.accept_language()),
        );
        for (name, value) in &request.headers {
            let name = match HeaderName::from_bytes(name.as_bytes()) {
                Ok(name) => name,
                Err(_) => {
                    warn!(header = %name, "skipping invalid header name");
                    continue;
                }
            };
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    headers.insert(name, value);
                }
                Err(_) => warn!(header = %name, "skipping invalid header value"),
            }
        }

        let started = Instant::now();
        let response = client
            .request(method, request.url.as_str())
            .headers(headers)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        // Redirects may have crossed hosts; re-validate the landing URL
        // and the connected address (SSRF re-check after DNS).
        let final_url = response.url().to_string();
        self.guard.validate(&final_url, request.kind)?;
        if let Some(addr) = response.remote_addr() {
            if !is_onion_host(&host) {
                self.guard.check_resolved(&host, addr.ip())?;
            }
        }

        let http_status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let (body, truncated) =
            Self::read_body(response, request.body_cap, request.overflow).await?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        debug!(
            url = %request.url,
            status = http_status,
            bytes = body.len(),
            elapsed_ms,
            "fetch complete"
        );

        Ok(ProbeResponse {
            http_status,
            headers,
            body,
            truncated,
            final_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_without_proxy_has_no_onion_client() {
        let factory = ClientFactory::new(&ClientConfig::default()).unwrap();
        assert!(factory.client_for("example.com", true).is_ok());
        assert!(matches!(
            factory.client_for("abcdefghijklmnop.onion", true),
            Err(TransportError::NoProxy { .. })
        ));
    }

    #[test]
    fn test_factory_with_proxy_serves_onion_client() {
        let config = ClientConfig {
            socks_proxy: Some("socks5h://127.0.0.1:9050".into()),
        };
        let factory = ClientFactory::new(&config).unwrap();
        assert!(factory.client_for("abcdefghijklmnop.onion", true).is_ok());
        assert!(factory.client_for("abcdefghijklmnop.onion", false).is_ok());
    }
}

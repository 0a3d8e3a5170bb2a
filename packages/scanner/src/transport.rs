//! The transport seam between drivers and the HTTP stack.
//!
//! Drivers issue `ProbeRequest`s through a `Transport`; production code
//! uses the reqwest-backed implementation in `client`, tests use
//! `testing::MockTransport`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportResult;
use crate::guard::FetchKind;
use crate::types::provider::UaProfile;

/// Response body cap for HTML pages.
pub const HTML_BODY_CAP: usize = 2 * 1024 * 1024;

/// Response body cap for JSON API endpoints.
pub const JSON_BODY_CAP: usize = 16 * 1024 * 1024;

/// Response body cap for avatar downloads.
pub const AVATAR_BODY_CAP: usize = 4 * 1024 * 1024;

/// What to do when a response body exceeds its cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    /// Keep the prefix; classification only needs the head of the body
    Truncate,
    /// Fail the fetch (avatar downloads)
    Reject,
}

/// One outbound request, fully described.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
    pub ua: UaProfile,
    pub follow_redirects: bool,
    pub body_cap: usize,
    pub overflow: Overflow,
    pub kind: FetchKind,
}

impl ProbeRequest {
    /// A GET for an HTML page with the default caps.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".into(),
            headers: Vec::new(),
            timeout: Duration::from_secs(10),
            ua: UaProfile::default(),
            follow_redirects: true,
            body_cap: HTML_BODY_CAP,
            overflow: Overflow::Truncate,
            kind: FetchKind::Probe,
        }
    }

    /// A GET for a JSON API endpoint.
    pub fn get_json(url: impl Into<String>) -> Self {
        let mut req = Self::get(url);
        req.headers.push(("Accept".into(), "application/json".into()));
        req.body_cap = JSON_BODY_CAP;
        req
    }

    /// A GET for an avatar image; oversize bodies are rejected.
    pub fn get_avatar(url: impl Into<String>) -> Self {
        let mut req = Self::get(url);
        req.body_cap = AVATAR_BODY_CAP;
        req.overflow = Overflow::Reject;
        req.kind = FetchKind::Avatar;
        req
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_ua(mut self, ua: UaProfile) -> Self {
        self.ua = ua;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Host component of the request URL, lowercased. Used as the
    /// rate-limiter key.
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
    }
}

/// A decoded response. `body` holds at most `body_cap` bytes.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub http_status: u16,
    /// Header names lowercased
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub truncated: bool,
    /// URL after redirects
    pub final_url: String,
}

impl ProbeResponse {
    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// The `content-type` header without parameters, lowercased.
    pub fn content_type(&self) -> Option<String> {
        self.headers
            .get("content-type")
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.http_status)
    }
}

/// Request-issuing abstraction implemented by the reqwest client and by
/// the test mock.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: &ProbeRequest) -> TransportResult<ProbeResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_is_lowercased() {
        let req = ProbeRequest::get("https://API.Example.COM/u/alice");
        assert_eq!(req.host().as_deref(), Some("api.example.com"));
    }

    #[test]
    fn test_avatar_request_rejects_overflow() {
        let req = ProbeRequest::get_avatar("https://example.com/a.png");
        assert_eq!(req.overflow, Overflow::Reject);
        assert_eq!(req.body_cap, AVATAR_BODY_CAP);
        assert_eq!(req.kind, FetchKind::Avatar);
    }

    #[test]
    fn test_content_type_strips_parameters() {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "image/png; charset=binary".to_string());
        let resp = ProbeResponse {
            http_status: 200,
            headers,
            body: vec![],
            truncated: false,
            final_url: "https://example.com".into(),
        };
        assert_eq!(resp.content_type().as_deref(), Some("image/png"));
    }
}

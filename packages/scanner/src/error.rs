//! Typed errors for the scanner library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors surfaced by the scan engine and job manager.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Username failed sanitation (empty, too long, control characters)
    #[error("invalid username: {reason}")]
    InvalidUsername { reason: String },

    /// Job id is unknown or the job has been evicted
    #[error("job not found")]
    JobNotFound,

    /// Registry failed to load or reload
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Engine-internal invariant violation; fails the whole job
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors from one outbound HTTP probe.
///
/// All of these stay confined to a single `ProbeResult`; none of them
/// abort the job.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Request or body read exceeded the provider's timeout
    #[error("timeout")]
    Timeout,

    /// DNS, TCP, or TLS failure before a response arrived
    #[error("connect failed: {0}")]
    Connect(String),

    /// The request was built or sent but failed mid-flight
    #[error("request failed: {0}")]
    Request(String),

    /// Response body exceeded the configured cap
    #[error("body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// Security validation refused the URL
    #[error("security error: {0}")]
    Security(#[from] SecurityError),

    /// `.onion` host requested but no SOCKS proxy is configured
    #[error("onion host requires a SOCKS proxy: {host}")]
    NoProxy { host: String },

    /// Rate-limiter acquisition hit the scan-wide deadline
    #[error("timeout")]
    AcquireDeadline,

    /// The scan was cancelled before or during the request
    #[error("cancelled")]
    Cancelled,
}

impl TransportError {
    /// Map a reqwest failure onto the transport taxonomy.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(short_error(&err))
        } else {
            TransportError::Request(short_error(&err))
        }
    }
}

/// Render an error chain as one short human string.
fn short_error(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    if let Some(source) = err.source() {
        msg = format!("{}: {}", msg, source);
    }
    if msg.len() > 200 {
        msg.truncate(200);
    }
    msg
}

/// Errors raised while loading provider descriptors.
///
/// These are config errors: the offending provider is excluded at load
/// time and never reaches the scan path.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// YAML document failed to parse
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Provider descriptor file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// URL template lacks the `{username}` placeholder
    #[error("provider {provider}: url template has no {{username}} placeholder")]
    MissingPlaceholder { provider: String },

    /// A declared regex pattern failed to compile
    #[error("provider {provider}: invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        provider: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Security-related errors, primarily for SSRF protection.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// URL scheme not allowed (e.g. file://, ftp://)
    #[error("disallowed URL scheme: {0}")]
    DisallowedScheme(String),

    /// Host is blocked (localhost, metadata services)
    #[error("blocked host: {0}")]
    BlockedHost(String),

    /// IP in a blocked range (loopback, link-local, private)
    #[error("blocked IP range: {0}")]
    BlockedRange(String),

    /// `.onion` host on a path that refuses them (avatar fetches)
    #[error("onion host refused: {0}")]
    OnionRefused(String),

    /// URL has no host component
    #[error("URL has no host")]
    NoHost,

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Result type alias for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Result type alias for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Result type alias for security validation.
pub type SecurityResult<T> = std::result::Result<T, SecurityError>;

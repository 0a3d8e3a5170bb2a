//! URL validation for outbound requests: SSRF protection and onion-host
//! policy.
//!
//! Probes may reach `.onion` hosts when a SOCKS proxy is configured; the
//! avatar-download path always refuses them. Private, loopback, and
//! link-local ranges are rejected on both paths, and re-checked against
//! the resolved address to catch DNS rebinding.

use std::collections::HashSet;
use std::net::IpAddr;

use crate::error::{SecurityError, SecurityResult};

/// Which outbound path a URL is being validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// Provider probe; `.onion` allowed when a proxy exists
    Probe,
    /// Avatar or reference-image download; `.onion` always refused
    Avatar,
}

/// True when the hostname ends in `.onion` (case-insensitive).
pub fn is_onion_host(host: &str) -> bool {
    let host = host.trim_end_matches('.');
    host.len() > ".onion".len() && host.to_ascii_lowercase().ends_with(".onion")
}

/// URL validator shared by the transport and the avatar addon.
#[derive(Debug, Clone)]
pub struct UrlGuard {
    allowed_schemes: HashSet<String>,
    blocked_hosts: HashSet<String>,
    blocked_ranges: Vec<ipnet::IpNet>,
    /// Hosts that bypass validation (test servers)
    allowed_hosts: HashSet<String>,
    /// Whether a SOCKS proxy is available for `.onion` probes
    onion_proxy: bool,
}

impl Default for UrlGuard {
    fn default() -> Self {
        Self::new(false)
    }
}

impl UrlGuard {
    pub fn new(onion_proxy: bool) -> Self {
        Self {
            allowed_schemes: ["http", "https"].into_iter().map(String::from).collect(),
            blocked_hosts: [
                "localhost",
                "127.0.0.1",
                "::1",
                "[::1]",
                "0.0.0.0",
                "metadata.google.internal",
                "instance-data",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            blocked_ranges: vec![
                "10.0.0.0/8".parse().unwrap(),
                "172.16.0.0/12".parse().unwrap(),
                "192.168.0.0/16".parse().unwrap(),
                "169.254.0.0/16".parse().unwrap(),
                "127.0.0.0/8".parse().unwrap(),
                "::1/128".parse().unwrap(),
                "fc00::/7".parse().unwrap(),
                "fe80::/10".parse().unwrap(),
            ],
            allowed_hosts: HashSet::new(),
            onion_proxy,
        }
    }

    /// Add an allowed host (bypasses validation).
    pub fn allow_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_hosts.insert(host.into());
        self
    }

    /// Validate a URL for the given path.
    pub fn validate(&self, url: &str, kind: FetchKind) -> SecurityResult<()> {
        let parsed = url::Url::parse(url)?;

        if !self.allowed_schemes.contains(parsed.scheme()) {
            return Err(SecurityError::DisallowedScheme(parsed.scheme().to_string()));
        }

        let host = parsed.host_str().ok_or(SecurityError::NoHost)?;
        let host_lower = host.to_ascii_lowercase();

        if self.allowed_hosts.contains(&host_lower) {
            return Ok(());
        }

        if is_onion_host(&host_lower) {
            return match kind {
                FetchKind::Avatar => Err(SecurityError::OnionRefused(host_lower)),
                FetchKind::Probe if !self.onion_proxy => {
                    Err(SecurityError::OnionRefused(host_lower))
                }
                FetchKind::Probe => Ok(()),
            };
        }

        if self.blocked_hosts.contains(&host_lower) {
            return Err(SecurityError::BlockedHost(host_lower));
        }

        let bare_host = host_lower.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = bare_host.parse::<IpAddr>() {
            self.check_ip(ip)?;
        }

        Ok(())
    }

    /// Re-check a resolved address. The HTTP client resolves DNS; this
    /// guards the connected IP against rebinding to an internal range.
    pub fn check_resolved(&self, host: &str, ip: IpAddr) -> SecurityResult<()> {
        if self.allowed_hosts.contains(&host.to_ascii_lowercase()) {
            return Ok(());
        }
        self.check_ip(ip)
    }

    fn check_ip(&self, ip: IpAddr) -> SecurityResult<()> {
        for range in &self.blocked_ranges {
            if range.contains(&ip) {
                return Err(SecurityError::BlockedRange(ip.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_onion_detection() {
        assert!(is_onion_host("exampleonionv3abcdefgh.onion"));
        assert!(is_onion_host("sub.example.ONION"));
        assert!(!is_onion_host("example.com"));
        assert!(!is_onion_host(".onion"));
    }

    #[test]
    fn test_avatar_path_refuses_onion() {
        let guard = UrlGuard::new(true);
        let url = "http://exampleonionv3abcdefgh.onion/avatar.png";
        assert!(guard.validate(url, FetchKind::Avatar).is_err());
        assert!(guard.validate(url, FetchKind::Probe).is_ok());
    }

    #[test]
    fn test_probe_refuses_onion_without_proxy() {
        let guard = UrlGuard::new(false);
        let url = "http://exampleonionv3abcdefgh.onion/u/alice";
        assert!(guard.validate(url, FetchKind::Probe).is_err());
    }

    #[test]
    fn test_blocks_localhost_and_private_ranges() {
        let guard = UrlGuard::default();
        for url in [
            "http://localhost/x",
            "http://127.0.0.1/x",
            "http://10.1.2.3/x",
            "http://172.16.0.9/x",
            "http://192.168.1.1/x",
            "http://169.254.169.254/latest/meta-data",
            "http://[::1]/x",
        ] {
            assert!(guard.validate(url, FetchKind::Probe).is_err(), "{url}");
        }
    }

    #[test]
    fn test_blocks_non_http_schemes() {
        let guard = UrlGuard::default();
        assert!(guard.validate("file:///etc/passwd", FetchKind::Probe).is_err());
        assert!(guard.validate("ftp://example.com/", FetchKind::Probe).is_err());
    }

    #[test]
    fn test_allows_public_urls() {
        let guard = UrlGuard::default();
        assert!(guard.validate("https://example.com/u/alice", FetchKind::Probe).is_ok());
        assert!(guard.validate("https://example.com/a.png", FetchKind::Avatar).is_ok());
    }

    #[test]
    fn test_allowed_hosts_bypass() {
        let guard = UrlGuard::default().allow_host("127.0.0.1");
        assert!(guard.validate("http://127.0.0.1:8080/u/a", FetchKind::Probe).is_ok());
    }

    #[test]
    fn test_resolved_ip_check() {
        let guard = UrlGuard::default();
        assert!(guard
            .check_resolved("evil.example", "10.0.0.5".parse().unwrap())
            .is_err());
        assert!(guard
            .check_resolved("good.example", "93.184.216.34".parse().unwrap())
            .is_ok());
    }
}

//! Provider descriptors as declared in YAML, plus user-agent profiles.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default per-request timeout when a provider declares none.
pub const DEFAULT_TIMEOUT_SECS: f64 = 10.0;

/// A provider descriptor as it appears in a YAML document.
///
/// The `name` is the mapping key in the document, injected after parsing.
/// Data-only providers are executed by the generic driver; a code driver
/// registered under the same name replaces the descriptor entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSpec {
    /// Provider name (unique within the registry)
    #[serde(skip)]
    pub name: String,

    /// URL template containing a single `{username}` placeholder
    pub url: String,

    /// HTTP method, default GET
    #[serde(default)]
    pub method: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default)]
    pub timeout: Option<f64>,

    /// Named user-agent profile; `desktop_chrome` when omitted
    #[serde(default)]
    pub ua_profile: Option<String>,

    /// Extra request headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Body substrings/regexes implying the username exists
    #[serde(default)]
    pub success_patterns: Vec<String>,

    /// Body substrings/regexes implying the username does not exist
    #[serde(default)]
    pub error_patterns: Vec<String>,

    /// Body substrings/regexes implying the probe was blocked
    #[serde(default)]
    pub blocked_patterns: Vec<String>,

    /// Treat this provider's patterns as regexes instead of substrings
    #[serde(default)]
    pub regex: bool,

    /// Sibling JSON endpoint template for richer profile extraction
    #[serde(default)]
    pub json_endpoint: Option<String>,

    /// Whether any extracted profile metadata implies `found`
    #[serde(default)]
    pub metadata_presence: bool,

    /// Follow redirects; defaults to true
    #[serde(default)]
    pub redirect: Option<bool>,
}

impl ProviderSpec {
    /// Expand the URL template for a username.
    pub fn url_for(&self, username: &str) -> String {
        self.url.replace("{username}", username)
    }

    /// Per-request timeout, falling back to the default.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Whether redirects should be followed for this provider.
    pub fn follow_redirects(&self) -> bool {
        self.redirect.unwrap_or(true)
    }

    /// Resolved user-agent profile.
    pub fn profile(&self) -> UaProfile {
        self.ua_profile
            .as_deref()
            .and_then(UaProfile::from_tag)
            .unwrap_or_default()
    }
}

/// A named bundle of User-Agent and accept-* headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UaProfile {
    #[default]
    DesktopChrome,
    DesktopFirefox,
    MobileSafari,
}

impl UaProfile {
    /// Parse a profile tag; unknown tags return None.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "desktop_chrome" => Some(UaProfile::DesktopChrome),
            "desktop_firefox" => Some(UaProfile::DesktopFirefox),
            "mobile_safari" => Some(UaProfile::MobileSafari),
            _ => None,
        }
    }

    pub fn user_agent(&self) -> &'static str {
        match self {
            UaProfile::DesktopChrome => {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
            }
            UaProfile::DesktopFirefox => {
                "Mozilla/5.0 (X11; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0"
            }
            UaProfile::MobileSafari => {
                "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 \
                 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1"
            }
        }
    }

    pub fn accept(&self) -> &'static str {
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
    }

    pub fn accept_language(&self) -> &'static str {
        "en-US,en;q=0.5"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(url: &str) -> ProviderSpec {
        let mut spec: ProviderSpec = serde_yaml::from_str(&format!("url: \"{}\"", url)).unwrap();
        spec.name = "demo".into();
        spec
    }

    #[test]
    fn test_url_expansion() {
        let spec = spec("https://example.test/u/{username}");
        assert_eq!(spec.url_for("alice"), "https://example.test/u/alice");
    }

    #[test]
    fn test_timeout_default() {
        let spec = spec("https://example.test/{username}");
        assert_eq!(spec.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_profile_defaults_to_desktop_chrome() {
        let spec = spec("https://example.test/{username}");
        assert_eq!(spec.profile(), UaProfile::DesktopChrome);

        let mut spec = spec;
        spec.ua_profile = Some("mobile_safari".into());
        assert_eq!(spec.profile(), UaProfile::MobileSafari);

        spec.ua_profile = Some("unknown_tag".into());
        assert_eq!(spec.profile(), UaProfile::DesktopChrome);
    }
}

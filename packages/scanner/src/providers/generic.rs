//! The generic data-driven driver: executes any YAML provider descriptor.

use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use crate::classify::{Classifier, Evidence, Pattern, PatternSet};
use crate::error::RegistryError;
use crate::extract;
use crate::transport::ProbeRequest;
use crate::types::probe::{ProbeResult, ProbeStatus, Profile};
use crate::types::provider::ProviderSpec;

use super::{Provider, ScanContext};

/// A provider built from a YAML descriptor.
pub struct GenericProvider {
    spec: ProviderSpec,
    classifier: Classifier,
}

impl GenericProvider {
    /// Compile a descriptor. Pattern compilation failures and a missing
    /// `{username}` placeholder are config errors; the registry excludes
    /// the provider and logs them.
    pub fn compile(spec: ProviderSpec) -> Result<Self, RegistryError> {
        if !spec.url.contains("{username}") {
            return Err(RegistryError::MissingPlaceholder {
                provider: spec.name.clone(),
            });
        }

        let compile_all = |raw: &[String]| -> Result<Vec<Pattern>, RegistryError> {
            raw.iter()
                .map(|p| {
                    Pattern::compile(p, spec.regex).map_err(|source| {
                        RegistryError::InvalidPattern {
                            provider: spec.name.clone(),
                            pattern: p.clone(),
                            source,
                        }
                    })
                })
                .collect()
        };

        let classifier = Classifier {
            patterns: PatternSet {
                success: compile_all(&spec.success_patterns)?,
                error: compile_all(&spec.error_patterns)?,
                blocked: compile_all(&spec.blocked_patterns)?,
            },
            metadata_presence: spec.metadata_presence,
        };

        Ok(Self { spec, classifier })
    }

    pub fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    fn request_for(&self, url: String) -> ProbeRequest {
        let mut request = ProbeRequest::get(url)
            .with_timeout(self.spec.request_timeout())
            .with_ua(self.spec.profile())
            .with_redirects(self.spec.follow_redirects());
        if let Some(method) = &self.spec.method {
            request = request.with_method(method.to_ascii_uppercase());
        }
        for (name, value) in &self.spec.headers {
            request = request.with_header(name, value);
        }
        request
    }
}

#[async_trait]
impl Provider for GenericProvider {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn probe_url(&self, username: &str) -> String {
        self.spec.url_for(username)
    }

    fn time_budget(&self) -> std::time::Duration {
        self.spec.request_timeout() * 2
    }

    async fn check(&self, ctx: &ScanContext, username: &str) -> ProbeResult {
        let url = self.spec.url_for(username);
        let started = Instant::now();

        let response = match ctx.fetch(&self.request_for(url.clone())).await {
            Ok(response) => response,
            Err(err) => {
                return ProbeResult::failed(self.name(), url, err.to_string())
                    .with_elapsed_ms(started.elapsed().as_millis() as u64);
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let body = response.text().into_owned();

        let extracted = if response.is_success() {
            extract::from_html(&body)
        } else {
            Default::default()
        };

        let evidence = Evidence {
            og_title: extracted.og_title,
            profile_present: !extracted.profile.is_empty(),
        };
        let status = self.classifier.classify(response.http_status, &body, evidence);

        let mut profile = Profile::default();
        if matches!(status, ProbeStatus::Found | ProbeStatus::Unknown) && response.is_success() {
            profile = extracted.profile;

            if let Some(template) = &self.spec.json_endpoint {
                let json_url = template.replace("{username}", username);
                let json_request = ProbeRequest::get_json(json_url)
                    .with_timeout(self.spec.request_timeout())
                    .with_ua(self.spec.profile());
                match ctx.fetch(&json_request).await {
                    Ok(json_response) if json_response.is_success() => {
                        if let Ok(value) = serde_json::from_slice(&json_response.body) {
                            profile.merge(extract::from_json(&value));
                        }
                    }
                    Ok(_) => {}
                    Err(err) => {
                        debug!(provider = %self.name(), error = %err, "json endpoint fetch failed");
                    }
                }
            }
        }

        let error = match (status, response.http_status) {
            (ProbeStatus::Blocked, 429) => Some("rate_limited".to_string()),
            _ => None,
        };

        ProbeResult {
            provider: self.name().to_string(),
            status,
            url,
            http_status: Some(response.http_status),
            elapsed_ms,
            error,
            profile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, yaml: &str) -> ProviderSpec {
        let mut spec: ProviderSpec = serde_yaml::from_str(yaml).unwrap();
        spec.name = name.to_string();
        spec
    }

    #[test]
    fn test_compile_requires_placeholder() {
        let spec = spec("bad", "url: https://example.test/profile");
        assert!(matches!(
            GenericProvider::compile(spec),
            Err(RegistryError::MissingPlaceholder { .. })
        ));
    }

    #[test]
    fn test_compile_rejects_invalid_regex() {
        let spec = spec(
            "bad_regex",
            "url: \"https://example.test/{username}\"\nregex: true\nsuccess_patterns: [\"[unclosed\"]",
        );
        assert!(matches!(
            GenericProvider::compile(spec),
            Err(RegistryError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_request_carries_descriptor_settings() {
        let spec = spec(
            "demo",
            "url: \"https://example.test/u/{username}\"\ntimeout: 3\nua_profile: mobile_safari\nheaders:\n  X-Probe: \"1\"\nredirect: false",
        );
        let provider = GenericProvider::compile(spec).unwrap();
        let request = provider.request_for(provider.spec().url_for("alice"));

        assert_eq!(request.url, "https://example.test/u/alice");
        assert_eq!(request.timeout, std::time::Duration::from_secs(3));
        assert!(!request.follow_redirects);
        assert!(request
            .headers
            .iter()
            .any(|(k, v)| k == "X-Probe" && v == "1"));
    }
}

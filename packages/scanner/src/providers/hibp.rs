//! Have I Been Pwned breach-lookup driver.
//!
//! Requires an API key; without one the probe reports `error` rather
//! than hitting the endpoint unauthenticated.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

use crate::transport::ProbeRequest;
use crate::types::probe::{ProbeResult, ProbeStatus};

use super::{Provider, ScanContext};

const BREACH_URL: &str = "https://haveibeenpwned.com/api/v3/breachedaccount/{username}";

pub struct HibpProvider {
    api_key: Option<String>,
}

impl HibpProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }

    fn breach_summary(value: &Value) -> Option<String> {
        let names: Vec<&str> = value
            .as_array()?
            .iter()
            .filter_map(|b| b.get("Name").and_then(Value::as_str))
            .collect();
        if names.is_empty() {
            None
        } else {
            Some(format!("breached in: {}", names.join(", ")))
        }
    }
}

#[async_trait]
impl Provider for HibpProvider {
    fn name(&self) -> &str {
        "hibp"
    }

    fn probe_url(&self, username: &str) -> String {
        BREACH_URL.replace("{username}", username)
    }

    async fn check(&self, ctx: &ScanContext, username: &str) -> ProbeResult {
        let url = BREACH_URL.replace("{username}", username);

        let api_key = match &self.api_key {
            Some(key) => key.clone(),
            None => return ProbeResult::failed(self.name(), url, "api key not configured"),
        };

        let request = ProbeRequest::get_json(format!("{url}?truncateResponse=false"))
            .with_timeout(Duration::from_secs(10))
            .with_header("hibp-api-key", api_key);

        let started = Instant::now();
        let response = match ctx.fetch(&request).await {
            Ok(response) => response,
            Err(err) => {
                return ProbeResult::failed(self.name(), url, err.to_string())
                    .with_elapsed_ms(started.elapsed().as_millis() as u64);
            }
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let mut result = ProbeResult::new(self.name(), ProbeStatus::Unknown, url)
            .with_http_status(response.http_status)
            .with_elapsed_ms(elapsed_ms);

        match response.http_status {
            200 => {
                result.status = ProbeStatus::Found;
                if let Ok(value) = serde_json::from_slice::<Value>(&response.body) {
                    result.profile.bio = Self::breach_summary(&value);
                }
            }
            404 => result.status = ProbeStatus::NotFound,
            401 | 403 => {
                result.status = ProbeStatus::Blocked;
                result.error = Some("unauthorized".to_string());
            }
            429 => {
                result.status = ProbeStatus::Blocked;
                result.error = Some("rate_limited".to_string());
            }
            _ => {}
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breach_summary() {
        let value: Value =
            serde_json::from_str(r#"[{"Name": "Adobe"}, {"Name": "LinkedIn"}]"#).unwrap();
        assert_eq!(
            HibpProvider::breach_summary(&value).as_deref(),
            Some("breached in: Adobe, LinkedIn")
        );

        let empty: Value = serde_json::from_str("[]").unwrap();
        assert_eq!(HibpProvider::breach_summary(&empty), None);
    }
}

//! GitHub code driver: probes the users API instead of scraping HTML.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

use crate::extract;
use crate::transport::ProbeRequest;
use crate::types::probe::{ProbeResult, ProbeStatus};

use super::{Provider, ScanContext};

const API_URL: &str = "https://api.github.com/users/{username}";

pub struct GithubProvider;

impl GithubProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GithubProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for GithubProvider {
    fn name(&self) -> &str {
        "github"
    }

    fn probe_url(&self, username: &str) -> String {
        API_URL.replace("{username}", username)
    }

    async fn check(&self, ctx: &ScanContext, username: &str) -> ProbeResult {
        let url = API_URL.replace("{username}", username);
        let request = ProbeRequest::get_json(url.clone())
            .with_timeout(Duration::from_secs(10))
            .with_header("Accept", "application/vnd.github+json");

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
                    let mut profile = extract::from_json(&value);
                    // `name` may be null; fall back to the login
                    if profile.display_name.is_none() {
                        profile.display_name = value
                            .get("login")
                            .and_then(Value::as_str)
                            .map(str::to_string);
                    }
                    result.profile = profile;
                }
            }
            404 => result.status = ProbeStatus::NotFound,
            403 | 429 => {
                result.status = ProbeStatus::Blocked;
                result.error = Some("rate_limited".to_string());
            }
            _ => {}
        }

        result
    }
}

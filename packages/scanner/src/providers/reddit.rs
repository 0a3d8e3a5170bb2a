//! Reddit code driver: `/user/{name}/about.json`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

use crate::transport::ProbeRequest;
use crate::types::probe::{ProbeResult, ProbeStatus, Profile};

use super::{Provider, ScanContext};

const ABOUT_URL: &str = "https://www.reddit.com/user/{username}/about.json";

pub struct RedditProvider;

impl RedditProvider {
    pub fn new() -> Self {
        Self
    }

    fn profile_from_about(value: &Value) -> Profile {
        let data = value.get("data").unwrap_or(value);
        let subreddit = data.get("subreddit");

        Profile {
            display_name: subreddit
                .and_then(|s| s.get("title"))
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .or_else(|| data.get("name").and_then(Value::as_str))
                .map(str::to_string),
            avatar_url: data
                .get("icon_img")
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty())
                // reddit escapes ampersands in icon URLs
                .map(|v| v.replace("&amp;", "&")),
            bio: subreddit
                .and_then(|s| s.get("public_description"))
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            subscribers: subreddit
                .and_then(|s| s.get("subscribers"))
                .and_then(Value::as_u64),
            followers: data.get("total_karma").and_then(Value::as_u64),
            created_at: data
                .get("created_utc")
                .and_then(Value::as_f64)
                .map(|ts| format!("{}", ts as i64)),
            ..Default::default()
        }
    }
}

impl Default for RedditProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for RedditProvider {
    fn name(&self) -> &str {
        "reddit"
    }

    fn probe_url(&self, username: &str) -> String {
        ABOUT_URL.replace("{username}", username)
    }

    async fn check(&self, ctx: &ScanContext, username: &str) -> ProbeResult {
        let url = ABOUT_URL.replace("{username}", username);
        let request = ProbeRequest::get_json(url.clone()).with_timeout(Duration::from_secs(10));

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
            200 => match serde_json::from_slice::<Value>(&response.body) {
                Ok(value) => {
                    result.status = ProbeStatus::Found;
                    result.profile = Self::profile_from_about(&value);
                }
                // 200 with an unparseable body is an interstitial, not proof
                Err(_) => result.status = ProbeStatus::Unknown,
            },
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_from_about_json() {
        let value: Value = serde_json::from_str(
            r#"{"kind": "t2", "data": {
                "name": "alice",
                "icon_img": "https://styles.redditmedia.com/a.png?width=256&amp;s=abc",
                "total_karma": 1234,
                "created_utc": 1425168000.0,
                "subreddit": {
                    "title": "Alice",
                    "public_description": "hi there",
                    "subscribers": 56
                }
            }}"#,
        )
        .unwrap();

        let profile = RedditProvider::profile_from_about(&value);
        assert_eq!(profile.display_name.as_deref(), Some("Alice"));
        assert_eq!(
            profile.avatar_url.as_deref(),
            Some("https://styles.redditmedia.com/a.png?width=256&s=abc")
        );
        assert_eq!(profile.bio.as_deref(), Some("hi there"));
        assert_eq!(profile.subscribers, Some(56));
        assert_eq!(profile.followers, Some(1234));
        assert_eq!(profile.created_at.as_deref(), Some("1425168000"));
    }
}

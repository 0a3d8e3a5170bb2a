//! Probe results: the terminal record of one (username, provider) check.

use serde::{Deserialize, Serialize};

/// Classification of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Found,
    NotFound,
    Unknown,
    Blocked,
    Error,
}

/// Extracted profile fields plus addon-added enrichments.
///
/// Every field is optional; extraction failures leave fields unset rather
/// than erroring. Later extraction sources never overwrite earlier
/// non-empty values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub following: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribers: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Lowercased registrable domains pulled out of the bio (addon)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bio_domains: Vec<String>,

    /// SHA-256 of the raw avatar bytes, hex (addon)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_sha256: Option<String>,

    /// 64-bit difference hash of the avatar, 16-digit hex (addon)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_dhash: Option<String>,

    /// Integer id of the avatar cluster this result belongs to (addon)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_cluster_id: Option<u32>,

    /// Why the avatar could not be fetched or decoded (addon)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_fetch_error: Option<String>,

    /// Face-match verdict against the reference images (addon)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_match: Option<FaceMatch>,

    /// Why face matching was skipped for this result (addon)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_match_error: Option<String>,
}

impl Profile {
    /// True when no extraction source produced anything.
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.avatar_url.is_none()
            && self.bio.is_none()
            && self.followers.is_none()
            && self.following.is_none()
            && self.subscribers.is_none()
            && self.created_at.is_none()
    }

    /// Union `other` into `self`; existing non-empty values win.
    pub fn merge(&mut self, other: Profile) {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }
        fill(&mut self.display_name, other.display_name);
        fill(&mut self.avatar_url, other.avatar_url);
        fill(&mut self.bio, other.bio);
        fill(&mut self.followers, other.followers);
        fill(&mut self.following, other.following);
        fill(&mut self.subscribers, other.subscribers);
        fill(&mut self.created_at, other.created_at);
    }
}

/// Face-match verdict for one avatar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceMatch {
    pub matched: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl FaceMatch {
    /// A refusal verdict (`no_face`, `download_failed`, ...).
    pub fn refused(reason: impl Into<String>) -> Self {
        Self {
            matched: false,
            distance: None,
            reason: Some(reason.into()),
        }
    }
}

/// Terminal record for one (username, provider) probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub provider: String,
    pub status: ProbeStatus,
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,

    pub elapsed_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default)]
    pub profile: Profile,
}

impl ProbeResult {
    pub fn new(provider: impl Into<String>, status: ProbeStatus, url: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            status,
            url: url.into(),
            http_status: None,
            elapsed_ms: 0,
            error: None,
            profile: Profile::default(),
        }
    }

    /// A probe that never produced an HTTP outcome.
    pub fn failed(
        provider: impl Into<String>,
        url: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let mut result = Self::new(provider, ProbeStatus::Error, url);
        result.error = Some(error.into());
        result
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_existing_values() {
        let mut base = Profile {
            display_name: Some("Alice".into()),
            ..Default::default()
        };
        base.merge(Profile {
            display_name: Some("Other".into()),
            bio: Some("hello".into()),
            ..Default::default()
        });

        assert_eq!(base.display_name.as_deref(), Some("Alice"));
        assert_eq!(base.bio.as_deref(), Some("hello"));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ProbeStatus::NotFound).unwrap();
        assert_eq!(json, "\"not_found\"");
    }

    #[test]
    fn test_empty_profile_fields_are_omitted() {
        let result = ProbeResult::new("demo", ProbeStatus::Unknown, "https://example.test/u/a");
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["profile"].as_object().unwrap().is_empty());
        assert!(json.get("error").is_none());
    }
}

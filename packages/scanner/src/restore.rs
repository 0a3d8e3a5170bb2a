//! Client for the optional external face-restoration service.
//!
//! The service takes a base64 image and a fidelity knob and returns a
//! restored base64 image. Any non-2xx response or schema mismatch makes
//! the service count as unavailable; at most one retry is attempted.

use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct RestoreRequest<'a> {
    image: &'a str,
    fidelity: f32,
    task: &'static str,
}

#[derive(Debug, Deserialize)]
struct RestoreResponse {
    image: String,
}

/// Outcome of a restoration attempt.
#[derive(Debug)]
pub enum RestoreOutcome {
    Restored(Vec<u8>),
    Unavailable,
}

pub struct FaceRestoreClient {
    endpoint: String,
    client: reqwest::Client,
}

impl FaceRestoreClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Restore one image. `fidelity` is clamped to 0..=1.
    pub async fn restore(&self, image: &[u8], fidelity: f32) -> RestoreOutcome {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let request = RestoreRequest {
            image: &encoded,
            fidelity: fidelity.clamp(0.0, 1.0),
            task: "face_restoration",
        };

        // first attempt plus a single retry
        for attempt in 0..2 {
            match self.attempt(&request).await {
                Some(bytes) => return RestoreOutcome::Restored(bytes),
                None if attempt == 0 => {
                    debug!("face restoration attempt failed, retrying once");
                }
                None => {}
            }
        }

        warn!(endpoint = %self.endpoint, "face restoration unavailable");
        RestoreOutcome::Unavailable
    }

    async fn attempt(&self, request: &RestoreRequest<'_>) -> Option<Vec<u8>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            return None;
        }

        let parsed: RestoreResponse = response.json().await.ok()?;
        base64::engine::general_purpose::STANDARD
            .decode(parsed.image)
            .ok()
    }
}

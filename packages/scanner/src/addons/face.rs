//! Face matching against user-supplied reference images.
//!
//! The face engine is a capability: when none is wired in, results are
//! annotated with `engine_unavailable` and the job is never failed.

use tracing::debug;

use crate::types::probe::{FaceMatch, ProbeResult};

use super::avatar::AvatarBytes;

/// Default Euclidean distance below which two descriptors match.
pub const DEFAULT_MATCH_DISTANCE: f32 = 0.6;

/// Capability interface to a face-embedding engine.
pub trait FaceEngine: Send + Sync {
    fn is_available(&self) -> bool;

    /// Descriptor of the largest face in the image; `None` when no face
    /// is detected, `Err` when the engine itself fails.
    fn descriptor(&self, image: &[u8]) -> std::result::Result<Option<Vec<f32>>, String>;
}

/// Placeholder used when no engine is configured.
pub struct UnavailableFaceEngine;

impl FaceEngine for UnavailableFaceEngine {
    fn is_available(&self) -> bool {
        false
    }

    fn descriptor(&self, _image: &[u8]) -> std::result::Result<Option<Vec<f32>>, String> {
        Err("engine_unavailable".to_string())
    }
}

pub fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Reduce a recorded avatar fetch error to a face-match refusal reason.
fn refusal_reason(fetch_error: &str) -> &'static str {
    if fetch_error.starts_with("onion_host") {
        "onion_host"
    } else if fetch_error.starts_with("unsupported_format") || fetch_error.starts_with("decode") {
        "unsupported_format"
    } else {
        "download_failed"
    }
}

/// Match every fetched avatar against the reference descriptors.
pub fn apply(
    engine: &dyn FaceEngine,
    results: &mut [ProbeResult],
    avatars: &AvatarBytes,
    references: &[Vec<u8>],
    threshold: f32,
) {
    if references.is_empty() {
        return;
    }

    if !engine.is_available() {
        for result in results.iter_mut() {
            if result.profile.avatar_url.is_some() {
                result.profile.face_match_error = Some("engine_unavailable".to_string());
            }
        }
        return;
    }

    let reference_descriptors: Vec<Vec<f32>> = references
        .iter()
        .filter_map(|image| match engine.descriptor(image) {
            Ok(Some(descriptor)) => Some(descriptor),
            Ok(None) => {
                debug!("reference image has no detectable face");
                None
            }
            Err(err) => {
                debug!(error = %err, "reference descriptor failed");
                None
            }
        })
        .collect();

    if reference_descriptors.is_empty() {
        for result in results.iter_mut() {
            if result.profile.avatar_url.is_some() {
                result.profile.face_match_error = Some("no_reference_face".to_string());
            }
        }
        return;
    }

    for (result, bytes) in results.iter_mut().zip(avatars.iter()) {
        if result.profile.avatar_url.is_none() {
            continue;
        }

        let Some(bytes) = bytes else {
            let reason = result
                .profile
                .avatar_fetch_error
                .as_deref()
                .map(refusal_reason)
                .unwrap_or("download_failed");
            result.profile.face_match = Some(FaceMatch::refused(reason));
            continue;
        };

        match engine.descriptor(bytes) {
            Ok(Some(descriptor)) => {
                let distance = reference_descriptors
                    .iter()
                    .map(|reference| euclidean(&descriptor, reference))
                    .fold(f32::INFINITY, f32::min);
                result.profile.face_match = Some(FaceMatch {
                    matched: distance <= threshold,
                    distance: Some(distance),
                    reason: None,
                });
            }
            Ok(None) => {
                result.profile.face_match = Some(FaceMatch::refused("no_face"));
            }
            Err(err) => {
                result.profile.face_match_error = Some(err);
            }
        }
    }
}

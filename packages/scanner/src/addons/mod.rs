//! Post-scan enrichment pipeline.
//!
//! Runs in a fixed order once every probe is terminal:
//! `bio_links → avatar_fingerprint → avatar_clusters → face_match`.
//! Each stage reads from and writes to the job's result records; stage
//! failures annotate individual results and never abort the job.

pub mod avatar;
pub mod bio_links;
pub mod cluster;
pub mod face;

use std::sync::Arc;

use tracing::debug;

use crate::transport::Transport;
use crate::types::probe::ProbeResult;

pub use face::{FaceEngine, UnavailableFaceEngine};

/// Pipeline tuning.
#[derive(Debug, Clone)]
pub struct AddonConfig {
    /// Hamming threshold for perceptual avatar equality
    pub dhash_threshold: u32,
    /// Euclidean distance at or below which faces match
    pub face_distance: f32,
}

impl Default for AddonConfig {
    fn default() -> Self {
        Self {
            dhash_threshold: cluster::DEFAULT_DHASH_THRESHOLD,
            face_distance: face::DEFAULT_MATCH_DISTANCE,
        }
    }
}

/// The enrichment pipeline the engine runs after a scan completes.
pub struct AddonPipeline {
    transport: Arc<dyn Transport>,
    face_engine: Arc<dyn FaceEngine>,
    config: AddonConfig,
}

impl AddonPipeline {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            face_engine: Arc::new(UnavailableFaceEngine),
            config: AddonConfig::default(),
        }
    }

    pub fn with_face_engine(mut self, engine: Arc<dyn FaceEngine>) -> Self {
        self.face_engine = engine;
        self
    }

    pub fn with_config(mut self, config: AddonConfig) -> Self {
        self.config = config;
        self
    }

    /// Enrich a completed result set in place. `references` are the raw
    /// bytes of user-supplied face images; face matching only runs when
    /// at least one is present.
    pub async fn run(&self, results: &mut [ProbeResult], references: &[Vec<u8>]) {
        bio_links::apply(results);

        let avatars = avatar::apply(&self.transport, results).await;
        cluster::apply(results, self.config.dhash_threshold);

        if !references.is_empty() {
            face::apply(
                self.face_engine.as_ref(),
                results,
                &avatars,
                references,
                self.config.face_distance,
            );
        }

        debug!(
            results = results.len(),
            references = references.len(),
            "addon pipeline complete"
        );
    }
}

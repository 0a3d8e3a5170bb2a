//! # Scanner
//!
//! The scanning core of a username-discovery service: given a handle and
//! a set of providers, concurrently probe each provider, classify the
//! response, extract a structured profile, and stream partial results
//! into an observable job.
//!
//! ## Architecture
//!
//! ```text
//! submit(username) ─► JobManager ─► ScanEngine
//!                                      │  fan-out under RateController
//!                                      ▼
//!                      Provider::check (generic + code drivers)
//!                        │ Transport ─► Classifier ─► Extractor
//!                        ▼
//!                      ProbeResult ─► JobRecord (streaming appends)
//!                                      │ all terminal
//!                                      ▼
//!                      AddonPipeline: bio_links → avatar_fingerprint
//!                                     → avatar_clusters → face_match
//! ```
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use scanner::client::{ClientConfig, HttpTransport};
//! use scanner::engine::ScanEngine;
//! use scanner::jobs::{JobManager, SubmitOptions};
//! use scanner::limits::{LimiterConfig, RateController};
//! use scanner::providers::{builtin_code_drivers, DriverSettings};
//! use scanner::registry::Registry;
//!
//! let transport = Arc::new(HttpTransport::new(&ClientConfig::default())?);
//! let limiter = Arc::new(RateController::new(&LimiterConfig::default()));
//! let registry = Arc::new(
//!     Registry::builder()
//!         .with_code_drivers(builtin_code_drivers(&DriverSettings::default()))
//!         .with_builtin()
//!         .build(),
//! );
//! let engine = Arc::new(ScanEngine::new(transport, limiter));
//! let manager = JobManager::new(registry, engine);
//!
//! let job_id = manager.submit("alice", SubmitOptions::default())?;
//! let view = manager.get(job_id, Some(10))?;
//! ```

pub mod addons;
pub mod classify;
pub mod client;
pub mod engine;
pub mod error;
pub mod extract;
pub mod guard;
pub mod jobs;
pub mod limits;
pub mod providers;
pub mod registry;
pub mod restore;
pub mod reverse_image;
pub mod testing;
pub mod transport;
pub mod types;

pub use error::{RegistryError, ScanError, SecurityError, TransportError};
pub use jobs::{JobManager, SubmitOptions};
pub use registry::Registry;
pub use types::{JobState, JobView, ProbeResult, ProbeStatus, Profile};

//! Core data types: provider descriptors, probe results, job records.

pub mod job;
pub mod probe;
pub mod provider;

pub use job::{JobState, JobView};
pub use probe::{FaceMatch, ProbeResult, ProbeStatus, Profile};
pub use provider::{ProviderSpec, UaProfile};

//! Job lifecycle: records, the bounded store, and the manager facade.

pub mod job;
pub mod manager;
pub mod store;

pub use job::JobRecord;
pub use manager::{JobManager, SubmitOptions};
pub use store::{JobStore, StoreConfig};

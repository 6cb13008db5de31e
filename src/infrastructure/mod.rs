//! Infrastructure layer: I/O implementations and DI container
//!
//! This layer implements I/O boundary traits, loads snapshots and wires up services.

pub mod di;
pub mod error;
pub mod snapshot;
pub mod traits;

pub use di::ServiceContainer;
pub use error::{InfraError, InfraResult};
pub use snapshot::SnapshotLoader;

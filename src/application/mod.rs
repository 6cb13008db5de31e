//! Application layer: services and use cases
//!
//! This layer scopes storage rows to a tenant, feeds them through the domain
//! components and shapes the results for presentation.

pub mod cache;
pub mod error;
pub mod services;

pub use cache::TtlCache;
pub use error::{ApplicationError, ApplicationResult};

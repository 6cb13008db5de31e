//! sectorank: sector hierarchy rollup and weighted ranking
//!
//! Builds per-tenant sector forests from flat parent-pointer rows, consolidates
//! service counts into the root sectors and ranks sectors or services by a
//! shrinkage-weighted rating score.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

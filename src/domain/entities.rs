//! Domain entities: core data structures

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a sector row.
pub type SectorId = i64;

/// Identifier of a rated entity (sector or service).
pub type EntityId = i64;

/// Opaque tenant key. Only ever compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An active sector of a single tenant, as handed to the tree builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorRecord {
    pub id: SectorId,
    /// Parent sector; `None` or an id outside the input set marks a root
    pub parent_id: Option<SectorId>,
    pub title: String,
}

impl SectorRecord {
    pub fn new(id: SectorId, parent_id: Option<SectorId>, title: impl Into<String>) -> Self {
        Self {
            id,
            parent_id,
            title: title.into(),
        }
    }
}

/// A sector placed in the forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectorNode {
    pub id: SectorId,
    pub parent_id: Option<SectorId>,
    pub title: String,
    /// Distance from the root (roots are level 0)
    pub level: usize,
    /// Ancestor ids, root first, ending with this node's id
    pub path: Vec<SectorId>,
    pub root_id: SectorId,
    /// Ancestor titles, root first, joined by the builder's separator
    pub breadcrumb: String,
}

impl SectorNode {
    /// Node for a record that starts a new tree.
    pub fn root(record: &SectorRecord) -> Self {
        Self {
            id: record.id,
            parent_id: record.parent_id,
            title: record.title.clone(),
            level: 0,
            path: vec![record.id],
            root_id: record.id,
            breadcrumb: record.title.clone(),
        }
    }

    /// Node for `record` attached below `self`.
    pub fn child(&self, record: &SectorRecord, separator: &str) -> Self {
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend_from_slice(&self.path);
        path.push(record.id);

        Self {
            id: record.id,
            parent_id: Some(self.id),
            title: record.title.clone(),
            level: self.level + 1,
            path,
            root_id: self.root_id,
            breadcrumb: format!("{}{}{}", self.breadcrumb, separator, record.title),
        }
    }

    pub fn is_root(&self) -> bool {
        self.level == 0
    }
}

impl fmt::Display for SectorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.id)
    }
}

/// Named, non-negative counters for one sector.
///
/// Absent names read as zero, so a default record is the zero record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricRecord(BTreeMap<String, u64>);

impl MetricRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter, handy for literals in callers and tests.
    pub fn with(mut self, name: impl Into<String>, value: u64) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> u64 {
        self.0.get(name).copied().unwrap_or(0)
    }

    pub fn set(&mut self, name: impl Into<String>, value: u64) {
        self.0.insert(name.into(), value);
    }

    pub fn add(&mut self, name: impl Into<String>, value: u64) {
        let slot = self.0.entry(name.into()).or_insert(0);
        *slot = slot.saturating_add(value);
    }

    /// Elementwise sum of `other` into `self`.
    pub fn accumulate(&mut self, other: &MetricRecord) {
        for (name, value) in &other.0 {
            self.add(name.as_str(), *value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for MetricRecord {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (name, value) in iter {
            record.add(name, value);
        }
        record
    }
}

/// A node with its own metrics and, for roots, the sum over its whole tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidatedRow {
    pub node: SectorNode,
    pub individual: MetricRecord,
    /// Empty unless `node` is a root
    pub consolidated: MetricRecord,
    /// No metrics were supplied for this sector; `individual` is the zero record
    pub metrics_defaulted: bool,
}

impl ConsolidatedRow {
    /// The figure a consumer should display: consolidated for roots, individual otherwise.
    pub fn effective(&self) -> &MetricRecord {
        if self.node.is_root() {
            &self.consolidated
        } else {
            &self.individual
        }
    }
}

/// Star counts for ratings 1 through 5.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatingHistogram {
    pub counts: [u64; 5],
}

impl RatingHistogram {
    pub fn new(counts: [u64; 5]) -> Self {
        Self { counts }
    }

    /// Number of votes, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.counts
            .iter()
            .fold(0u64, |total, &count| total.saturating_add(count))
    }

    /// Unrounded `Σ(star * count) / Σcount`, `None` without votes.
    ///
    /// Summed in `f64`, so arbitrarily large counts cannot overflow.
    pub fn raw_mean(&self) -> Option<f64> {
        if self.counts.iter().all(|&count| count == 0) {
            return None;
        }
        let (weighted, total) = self
            .counts
            .iter()
            .zip(1u32..)
            .fold((0.0f64, 0.0f64), |(weighted, total), (&count, star)| {
                let count = count as f64;
                (weighted + count * f64::from(star), total + count)
            });
        Some(weighted / total)
    }
}

/// A sector or service with its observed rating.
#[derive(Debug, Clone, PartialEq)]
pub struct RatedEntity {
    pub id: EntityId,
    pub name: String,
    /// Mean on a 0-5 scale, `None` when unrated
    pub mean: Option<f64>,
    pub votes: u64,
    pub active: bool,
}

impl RatedEntity {
    pub fn new(id: EntityId, name: impl Into<String>, mean: Option<f64>, votes: u64) -> Self {
        Self {
            id,
            name: name.into(),
            mean,
            votes,
            active: true,
        }
    }

    pub fn from_histogram(id: EntityId, name: impl Into<String>, histogram: &RatingHistogram) -> Self {
        Self::new(id, name, histogram.raw_mean(), histogram.total())
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Active, voted on, and carrying a mean.
    pub fn is_eligible(&self) -> bool {
        self.active && self.votes > 0 && self.mean.is_some()
    }
}

/// One ranked entity. Built fresh on every scoring call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingResult {
    pub id: EntityId,
    pub name: String,
    pub mean: f64,
    pub votes: u64,
    pub score: f64,
}

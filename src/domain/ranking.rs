//! Shrinkage-weighted ranking of rated sectors and services.
//!
//! Each entity's mean is pulled toward the population mean `G` with the
//! weight of `k` phantom votes:
//!
//! ```text
//! score = (mean * votes + G * k) / (votes + k)
//! ```
//!
//! Entities with few votes land near `G`; entities with many votes keep
//! roughly their own mean.

use std::cmp::Ordering;

use tracing::{debug, instrument, trace};

use crate::domain::entities::{RankingResult, RatedEntity, RatingHistogram};
use crate::domain::error::{DomainError, DomainResult};

/// Prior weight, in votes.
pub const DEFAULT_SHRINKAGE_K: f64 = 10.0;

/// Decimals kept on scores and means.
pub const DEFAULT_SCORE_DECIMALS: u32 = 2;

/// Top of the star scale; means live in `0.0..=MAX_RATING`.
pub const MAX_RATING: f64 = 5.0;

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Mean star rating of a histogram, rounded to two decimals.
///
/// `None` when the histogram holds no votes.
pub fn mean_from_histogram(histogram: &RatingHistogram) -> Option<f64> {
    histogram
        .raw_mean()
        .map(|mean| round_to(mean, DEFAULT_SCORE_DECIMALS))
}

/// Mean of an eligible entity, `None` for entities that are not ranked.
///
/// # Errors
///
/// [`DomainError::InvalidRating`] if the mean is not finite or falls outside
/// `0.0..=MAX_RATING`.
fn rated_mean(entity: &RatedEntity) -> DomainResult<Option<f64>> {
    match entity.mean {
        Some(mean) if entity.is_eligible() => {
            if mean.is_finite() && (0.0..=MAX_RATING).contains(&mean) {
                Ok(Some(mean))
            } else {
                Err(DomainError::InvalidRating {
                    entity_id: entity.id,
                    value: mean,
                })
            }
        }
        _ => Ok(None),
    }
}

/// Vote-weighted mean over the eligible entities of a population.
///
/// `None` when nothing in the population is eligible. Sums run in `f64`.
///
/// # Errors
///
/// [`DomainError::InvalidRating`] for an eligible entity with an invalid mean,
/// the same check [`RankingScorer::score`] applies.
pub fn global_mean(population: &[RatedEntity]) -> DomainResult<Option<f64>> {
    let mut weighted = 0.0f64;
    let mut votes = 0.0f64;
    for entity in population {
        if let Some(mean) = rated_mean(entity)? {
            let n = entity.votes as f64;
            weighted += mean * n;
            votes += n;
        }
    }
    Ok((votes > 0.0).then(|| weighted / votes))
}

/// Scores and orders rated entities against a fixed prior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingScorer {
    global_mean: f64,
    k: f64,
    decimals: u32,
}

impl RankingScorer {
    /// Scorer with the default shrinkage constant.
    pub fn new(global_mean: f64) -> DomainResult<Self> {
        Self::with_shrinkage(global_mean, DEFAULT_SHRINKAGE_K)
    }

    /// # Errors
    ///
    /// [`DomainError::InvalidShrinkage`] if either input is negative or not finite.
    pub fn with_shrinkage(global_mean: f64, k: f64) -> DomainResult<Self> {
        validate("global_mean", global_mean)?;
        validate("k", k)?;
        Ok(Self {
            global_mean,
            k,
            decimals: DEFAULT_SCORE_DECIMALS,
        })
    }

    pub fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn shrinkage(&self) -> f64 {
        self.k
    }

    /// Rounded shrinkage score for one observation.
    pub fn weighted_score(&self, mean: f64, votes: u64) -> f64 {
        let votes = votes as f64;
        let weight = votes + self.k;
        if weight == 0.0 {
            return round_to(self.global_mean, self.decimals);
        }
        round_to(
            (mean * votes + self.global_mean * self.k) / weight,
            self.decimals,
        )
    }

    /// Score every eligible entity and return them best first.
    ///
    /// Inactive entities and those without votes or mean are left out.
    /// Order: score desc, votes desc, name asc, id asc.
    ///
    /// # Errors
    ///
    /// [`DomainError::InvalidRating`] for an eligible entity whose mean is
    /// not finite or off the `0.0..=MAX_RATING` scale.
    #[instrument(level = "debug", skip(self, entities), fields(entities = entities.len(), g = self.global_mean, k = self.k))]
    pub fn score(&self, entities: &[RatedEntity]) -> DomainResult<Vec<RankingResult>> {
        let mut results = Vec::with_capacity(entities.len());

        for entity in entities {
            let Some(mean) = rated_mean(entity)? else {
                trace!(entity = entity.id, votes = entity.votes, "not eligible, skipped");
                continue;
            };

            results.push(RankingResult {
                id: entity.id,
                name: entity.name.clone(),
                mean: round_to(mean, self.decimals),
                votes: entity.votes,
                score: self.weighted_score(mean, entity.votes),
            });
        }

        results.sort_by(compare_results);
        debug!(ranked = results.len(), "scoring complete");
        Ok(results)
    }
}

fn validate(parameter: &'static str, value: f64) -> DomainResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DomainError::InvalidShrinkage { parameter, value })
    }
}

fn compare_results(a: &RankingResult, b: &RankingResult) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.votes.cmp(&a.votes))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}

//! Environment partitioning: bucket raw records by (sex, income), draw a fixed
//! subsample per bucket, and shuffle the concatenation into one labeled pool.

use rand::Rng;
use rand::seq::SliceRandom;
use rand::seq::index;
use tracing::info;

use crate::config::EnvironmentPoolSizes;
use crate::constants::environments::ENVIRONMENT_COUNT;
use crate::constants::prepare::LOG_PREFIX;
use crate::data::{Environment, RawDataset, SplitData};
use crate::errors::PrepareError;

/// Indices of raw records grouped by environment, in [`Environment::ALL`] order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvironmentBuckets {
    buckets: [Vec<usize>; ENVIRONMENT_COUNT],
    unassigned: usize,
}

impl EnvironmentBuckets {
    /// Bucket every record of `raw` by its `(group, label)` pair.
    ///
    /// Records outside the four cases are counted but belong to no bucket.
    pub fn from_raw(raw: &RawDataset) -> Result<Self, PrepareError> {
        raw.validate()?;
        let mut buckets: [Vec<usize>; ENVIRONMENT_COUNT] = Default::default();
        let mut unassigned = 0;
        for (idx, (group, label)) in raw.group.iter().zip(&raw.labels).enumerate() {
            match Environment::from_group_label(*group, *label) {
                Some(env) => buckets[env.index()].push(idx),
                None => unassigned += 1,
            }
        }
        Ok(Self {
            buckets,
            unassigned,
        })
    }

    /// Raw indices that fall into `env`.
    pub fn indices(&self, env: Environment) -> &[usize] {
        &self.buckets[env.index()]
    }

    /// Number of raw records in `env`.
    pub fn count(&self, env: Environment) -> usize {
        self.buckets[env.index()].len()
    }

    /// Number of raw records that matched no environment.
    pub fn unassigned(&self) -> usize {
        self.unassigned
    }
}

/// Draw `requested` distinct indices from `available` without replacement.
pub fn sample_without_replacement<R: Rng + ?Sized>(
    rng: &mut R,
    env: Environment,
    available: &[usize],
    requested: usize,
) -> Result<Vec<usize>, PrepareError> {
    if requested > available.len() {
        return Err(PrepareError::InsufficientData {
            environment: env,
            requested,
            available: available.len(),
        });
    }
    Ok(index::sample(rng, available.len(), requested)
        .into_iter()
        .map(|pos| available[pos])
        .collect())
}

/// Build the unbalanced, shuffled environment pool from raw arrays.
///
/// Every pooled record keeps its raw feature row and label; its environment id
/// comes from the bucket it was drawn from. Fails with `InsufficientData` when
/// any bucket holds fewer records than its target size.
pub fn partition<R: Rng + ?Sized>(
    raw: &RawDataset,
    sizes: &EnvironmentPoolSizes,
    rng: &mut R,
) -> Result<SplitData, PrepareError> {
    let buckets = EnvironmentBuckets::from_raw(raw)?;

    info!(
        "{LOG_PREFIX} raw distribution: male_low={}, male_high={}, female_low={}, female_high={}, unassigned={}",
        buckets.count(Environment::MaleLowIncome),
        buckets.count(Environment::MaleHighIncome),
        buckets.count(Environment::FemaleLowIncome),
        buckets.count(Environment::FemaleHighIncome),
        buckets.unassigned()
    );

    let mut drawn: Vec<(usize, Environment)> = Vec::with_capacity(sizes.total());
    for env in Environment::ALL {
        let picked = sample_without_replacement(
            rng,
            env,
            buckets.indices(env),
            sizes.for_environment(env),
        )?;
        drawn.extend(picked.into_iter().map(|idx| (idx, env)));
    }

    drawn.shuffle(rng);

    let mut pool = SplitData {
        features: Vec::with_capacity(drawn.len()),
        labels: Vec::with_capacity(drawn.len()),
        environments: Vec::with_capacity(drawn.len()),
    };
    for (idx, env) in drawn {
        pool.features.push(raw.features[idx]);
        pool.labels.push(raw.labels[idx]);
        pool.environments.push(env.id());
    }
    Ok(pool)
}

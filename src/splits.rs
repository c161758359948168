use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::data::{EnvId, SplitData};
use crate::errors::PrepareError;

/// Logical dataset partitions produced by preparation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SplitLabel {
    /// Training split.
    Train,
    /// Validation split.
    Validation,
    /// Test split.
    Test,
}

impl SplitLabel {
    /// Short name used for artifact files and the dataset wrapper.
    pub fn as_str(self) -> &'static str {
        match self {
            SplitLabel::Train => "train",
            SplitLabel::Validation => "val",
            SplitLabel::Test => "test",
        }
    }
}

impl fmt::Display for SplitLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitLabel {
    type Err = PrepareError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "train" => Ok(SplitLabel::Train),
            "val" | "validation" => Ok(SplitLabel::Validation),
            "test" => Ok(SplitLabel::Test),
            other => Err(PrepareError::UnknownSplit(other.to_string())),
        }
    }
}

/// Train and validation subsets of one pool.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainValSplit {
    /// Training records.
    pub train: SplitData,
    /// Validation records.
    pub validation: SplitData,
}

/// Number of records of an environment that go to train: `floor(fraction * total)`.
pub fn train_count_for(total: usize, train_fraction: f64) -> usize {
    let count = ((total as f64) * train_fraction).floor() as usize;
    count.min(total)
}

/// Split `pool` into train/validation independently within each environment.
///
/// Each environment's positions are shuffled locally, the leading
/// `floor(train_fraction * count)` go to train and the rest to validation.
/// Both outputs are shuffled once more so row order does not reveal grouping.
pub fn stratified_split<R: Rng + ?Sized>(
    pool: &SplitData,
    train_fraction: f64,
    rng: &mut R,
) -> Result<TrainValSplit, PrepareError> {
    pool.validate()?;
    if !(train_fraction > 0.0 && train_fraction <= 1.0) {
        return Err(PrepareError::Configuration(format!(
            "train fraction must be in (0, 1], got {train_fraction}"
        )));
    }

    let mut by_env: BTreeMap<EnvId, Vec<usize>> = BTreeMap::new();
    for (pos, env) in pool.environments.iter().enumerate() {
        by_env.entry(*env).or_default().push(pos);
    }

    let mut train_positions = Vec::new();
    let mut val_positions = Vec::new();
    for positions in by_env.values_mut() {
        positions.shuffle(rng);
        let cut = train_count_for(positions.len(), train_fraction);
        train_positions.extend_from_slice(&positions[..cut]);
        val_positions.extend_from_slice(&positions[cut..]);
    }

    train_positions.shuffle(rng);
    val_positions.shuffle(rng);

    Ok(TrainValSplit {
        train: pool.select(&train_positions),
        validation: pool.select(&val_positions),
    })
}

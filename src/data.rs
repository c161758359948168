use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::environments::{
    LABEL_HIGH_INCOME, LABEL_LOW_INCOME, SEX_FEMALE, SEX_MALE,
};
use crate::constants::schema::SEX_COLUMN;
use crate::errors::PrepareError;

pub use crate::types::{EnvId, FeatureRow, GroupCode, Label};

/// The four fixed (sex, income) environments.
///
/// Ids follow the persisted convention: male/low = 0, male/high = 1,
/// female/low = 2, female/high = 3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Environment {
    /// Male respondents with income at or below the threshold.
    MaleLowIncome,
    /// Male respondents with income above the threshold.
    MaleHighIncome,
    /// Female respondents with income at or below the threshold.
    FemaleLowIncome,
    /// Female respondents with income above the threshold.
    FemaleHighIncome,
}

impl Environment {
    /// All environments in id order.
    pub const ALL: [Environment; 4] = [
        Environment::MaleLowIncome,
        Environment::MaleHighIncome,
        Environment::FemaleLowIncome,
        Environment::FemaleHighIncome,
    ];

    /// Resolve the environment for a raw `(group, label)` pair.
    ///
    /// Returns `None` for any pair outside the four defined cases.
    pub fn from_group_label(group: GroupCode, label: Label) -> Option<Self> {
        match (group, label) {
            (SEX_MALE, LABEL_LOW_INCOME) => Some(Environment::MaleLowIncome),
            (SEX_MALE, LABEL_HIGH_INCOME) => Some(Environment::MaleHighIncome),
            (SEX_FEMALE, LABEL_LOW_INCOME) => Some(Environment::FemaleLowIncome),
            (SEX_FEMALE, LABEL_HIGH_INCOME) => Some(Environment::FemaleHighIncome),
            _ => None,
        }
    }

    /// Resolve the environment from a feature row's SEX column and a label.
    pub fn from_features(row: &FeatureRow, label: Label) -> Option<Self> {
        let sex = row[SEX_COLUMN];
        if !sex.is_finite() || sex.fract() != 0.0 {
            return None;
        }
        Self::from_group_label(sex as GroupCode, label)
    }

    /// Resolve an environment from its persisted id.
    pub fn from_id(id: EnvId) -> Option<Self> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
    }

    /// Persisted environment id.
    pub fn id(self) -> EnvId {
        self.index() as EnvId
    }

    /// Position in [`Environment::ALL`].
    pub fn index(self) -> usize {
        match self {
            Environment::MaleLowIncome => 0,
            Environment::MaleHighIncome => 1,
            Environment::FemaleLowIncome => 2,
            Environment::FemaleHighIncome => 3,
        }
    }

    /// Raw group code of this environment.
    pub fn group(self) -> GroupCode {
        match self {
            Environment::MaleLowIncome | Environment::MaleHighIncome => SEX_MALE,
            Environment::FemaleLowIncome | Environment::FemaleHighIncome => SEX_FEMALE,
        }
    }

    /// Label shared by every record of this environment.
    pub fn label(self) -> Label {
        match self {
            Environment::MaleLowIncome | Environment::FemaleLowIncome => LABEL_LOW_INCOME,
            Environment::MaleHighIncome | Environment::FemaleHighIncome => LABEL_HIGH_INCOME,
        }
    }

    /// Stable snake_case name used in logs and summaries.
    pub fn name(self) -> &'static str {
        match self {
            Environment::MaleLowIncome => "male_low_income",
            Environment::MaleHighIncome => "male_high_income",
            Environment::FemaleLowIncome => "female_low_income",
            Environment::FemaleHighIncome => "female_high_income",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw parallel arrays returned by a data provider.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDataset {
    /// One feature row per record.
    pub features: Vec<FeatureRow>,
    /// Binary income label per record.
    pub labels: Vec<Label>,
    /// Raw group code (sex) per record.
    pub group: Vec<GroupCode>,
}

impl RawDataset {
    /// Number of records.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the dataset holds no records.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Append one record.
    pub fn push(&mut self, features: FeatureRow, label: Label, group: GroupCode) {
        self.features.push(features);
        self.labels.push(label);
        self.group.push(group);
    }

    /// Check that the three arrays have equal length.
    pub fn validate(&self) -> Result<(), PrepareError> {
        if self.features.len() != self.labels.len() || self.features.len() != self.group.len() {
            return Err(PrepareError::InconsistentLengths {
                context: "raw dataset",
                details: format!(
                    "features={}, labels={}, group={}",
                    self.features.len(),
                    self.labels.len(),
                    self.group.len()
                ),
            });
        }
        Ok(())
    }
}

/// One persisted split: parallel features, labels, and environment ids.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode,
)]
pub struct SplitData {
    /// One feature row per record.
    pub features: Vec<FeatureRow>,
    /// Binary income label per record.
    pub labels: Vec<Label>,
    /// Environment id per record.
    pub environments: Vec<EnvId>,
}

impl SplitData {
    /// Build a split, rejecting arrays of unequal length.
    pub fn new(
        features: Vec<FeatureRow>,
        labels: Vec<Label>,
        environments: Vec<EnvId>,
    ) -> Result<Self, PrepareError> {
        let split = Self {
            features,
            labels,
            environments,
        };
        split.validate()?;
        Ok(split)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the split holds no records.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Check that the three arrays have equal length.
    pub fn validate(&self) -> Result<(), PrepareError> {
        if self.features.len() != self.labels.len()
            || self.features.len() != self.environments.len()
        {
            return Err(PrepareError::InconsistentLengths {
                context: "split data",
                details: format!(
                    "features={}, labels={}, environments={}",
                    self.features.len(),
                    self.labels.len(),
                    self.environments.len()
                ),
            });
        }
        Ok(())
    }

    /// Gather the records at `positions`, in that order.
    ///
    /// Callers pass positions produced from `0..self.len()`.
    pub fn select(&self, positions: &[usize]) -> SplitData {
        SplitData {
            features: positions.iter().map(|&pos| self.features[pos]).collect(),
            labels: positions.iter().map(|&pos| self.labels[pos]).collect(),
            environments: positions.iter().map(|&pos| self.environments[pos]).collect(),
        }
    }

    /// The `(features, label, environment)` tuple at `index`.
    pub fn sample(&self, index: usize) -> Option<Sample> {
        Some(Sample {
            features: *self.features.get(index)?,
            label: *self.labels.get(index)?,
            environment: *self.environments.get(index)?,
        })
    }

    /// Positions of every record whose environment id equals `env`.
    pub fn positions_of(&self, env: EnvId) -> Vec<usize> {
        self.environments
            .iter()
            .enumerate()
            .filter(|(_, id)| **id == env)
            .map(|(pos, _)| pos)
            .collect()
    }
}

/// A single served record.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Feature row.
    pub features: FeatureRow,
    /// Income label.
    pub label: Label,
    /// Environment id.
    pub environment: EnvId,
}

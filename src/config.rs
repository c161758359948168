use serde::{Deserialize, Serialize};

use crate::constants::environments::{
    DEFAULT_FEMALE_HIGH_INCOME, DEFAULT_FEMALE_LOW_INCOME, DEFAULT_MALE_HIGH_INCOME,
    DEFAULT_MALE_LOW_INCOME,
};
use crate::constants::prepare::{
    DEFAULT_HORIZON, DEFAULT_INCOME_THRESHOLD, DEFAULT_REGIONS, DEFAULT_SEED,
    DEFAULT_TRAIN_FRACTION, DEFAULT_VINTAGE,
};
use crate::data::Environment;
use crate::errors::PrepareError;
use crate::types::RegionCode;

/// Fixed target pool size per environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentPoolSizes {
    /// Records drawn for male, low income (env 0).
    pub male_low_income: usize,
    /// Records drawn for male, high income (env 1).
    pub male_high_income: usize,
    /// Records drawn for female, low income (env 2).
    pub female_low_income: usize,
    /// Records drawn for female, high income (env 3).
    pub female_high_income: usize,
}

impl Default for EnvironmentPoolSizes {
    fn default() -> Self {
        Self {
            male_low_income: DEFAULT_MALE_LOW_INCOME,
            male_high_income: DEFAULT_MALE_HIGH_INCOME,
            female_low_income: DEFAULT_FEMALE_LOW_INCOME,
            female_high_income: DEFAULT_FEMALE_HIGH_INCOME,
        }
    }
}

impl EnvironmentPoolSizes {
    /// Target size for `env`.
    pub fn for_environment(&self, env: Environment) -> usize {
        match env {
            Environment::MaleLowIncome => self.male_low_income,
            Environment::MaleHighIncome => self.male_high_income,
            Environment::FemaleLowIncome => self.female_low_income,
            Environment::FemaleHighIncome => self.female_high_income,
        }
    }

    /// Sum of all four targets (the pool size).
    pub fn total(&self) -> usize {
        Environment::ALL
            .iter()
            .map(|env| self.for_environment(*env))
            .sum()
    }
}

/// Region/vintage selector handed to the raw data provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveySelector {
    /// Two-letter region abbreviations, in load order.
    pub regions: Vec<RegionCode>,
    /// Survey year.
    pub vintage: u16,
    /// Survey horizon (for example `1-Year`).
    pub horizon: String,
}

impl Default for SurveySelector {
    fn default() -> Self {
        Self {
            regions: DEFAULT_REGIONS.iter().map(|code| code.to_string()).collect(),
            vintage: DEFAULT_VINTAGE,
            horizon: DEFAULT_HORIZON.to_string(),
        }
    }
}

/// How the test reconciler treats records outside the four environments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnmatchedTestPolicy {
    /// Fail preparation with `UnmatchedEnvironment`.
    #[default]
    Reject,
    /// Assign environment 0 and log a warning.
    DefaultToZero,
}

/// Top-level preparation configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrepareConfig {
    /// RNG seed that controls subsampling and every shuffle.
    pub seed: u64,
    /// Per-environment subsample sizes.
    pub pool_sizes: EnvironmentPoolSizes,
    /// Fraction of each environment assigned to train (floor), in `(0, 1]`.
    pub train_fraction: f64,
    /// Selector passed to the raw data provider.
    pub selector: SurveySelector,
    /// Income threshold used by providers that derive labels (`income > threshold`).
    pub income_threshold: f64,
    /// Treatment of unmatched test records.
    pub unmatched_test_policy: UnmatchedTestPolicy,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            pool_sizes: EnvironmentPoolSizes::default(),
            train_fraction: DEFAULT_TRAIN_FRACTION,
            selector: SurveySelector::default(),
            income_threshold: DEFAULT_INCOME_THRESHOLD,
            unmatched_test_policy: UnmatchedTestPolicy::default(),
        }
    }
}

impl PrepareConfig {
    /// Validate field ranges, returning the config unchanged on success.
    pub fn validated(self) -> Result<Self, PrepareError> {
        if !(self.train_fraction > 0.0 && self.train_fraction <= 1.0) {
            return Err(PrepareError::Configuration(format!(
                "train fraction must be in (0, 1], got {}",
                self.train_fraction
            )));
        }
        if self.pool_sizes.total() == 0 {
            return Err(PrepareError::Configuration(
                "environment pool sizes must not all be zero".to_string(),
            ));
        }
        if self.selector.regions.is_empty() {
            return Err(PrepareError::Configuration(
                "at least one region must be selected".to_string(),
            ));
        }
        if !self.income_threshold.is_finite() {
            return Err(PrepareError::Configuration(
                "income threshold must be finite".to_string(),
            ));
        }
        Ok(self)
    }
}

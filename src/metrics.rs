use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::environments::{LABEL_HIGH_INCOME, LABEL_LOW_INCOME};
use crate::constants::prepare::LOG_PREFIX;
use crate::data::{Environment, SplitData};

/// Per-environment share of one split.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentShare {
    pub environment: Environment,
    pub count: usize,
    /// `count / total`, or 0 for an empty split.
    pub share: f64,
    pub high_income: usize,
    pub low_income: usize,
}

/// Environment composition of a split.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentDistribution {
    /// Records in the split.
    pub total: usize,
    /// Records whose environment id is outside `0..4`.
    pub unknown: usize,
    /// One entry per environment, in id order.
    pub per_environment: Vec<EnvironmentShare>,
}

impl EnvironmentDistribution {
    /// Count of records in `env`.
    pub fn count(&self, env: Environment) -> usize {
        self.per_environment
            .iter()
            .find(|entry| entry.environment == env)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }

    /// Counts in id order.
    pub fn counts(&self) -> [usize; 4] {
        Environment::ALL.map(|env| self.count(env))
    }
}

/// Compute environment counts, shares, and income breakdown for `split`.
pub fn environment_distribution(split: &SplitData) -> EnvironmentDistribution {
    let total = split.len();
    let mut counts = [0_usize; 4];
    let mut high = [0_usize; 4];
    let mut low = [0_usize; 4];
    let mut unknown = 0;
    for (env_id, label) in split.environments.iter().zip(&split.labels) {
        let Some(env) = Environment::from_id(*env_id) else {
            unknown += 1;
            continue;
        };
        let idx = env.index();
        counts[idx] += 1;
        match *label {
            LABEL_HIGH_INCOME => high[idx] += 1,
            LABEL_LOW_INCOME => low[idx] += 1,
            _ => {}
        }
    }
    let per_environment = Environment::ALL
        .iter()
        .map(|env| {
            let idx = env.index();
            EnvironmentShare {
                environment: *env,
                count: counts[idx],
                share: if total == 0 {
                    0.0
                } else {
                    counts[idx] as f64 / total as f64
                },
                high_income: high[idx],
                low_income: low[idx],
            }
        })
        .collect();
    EnvironmentDistribution {
        total,
        unknown,
        per_environment,
    }
}

/// Log the distribution of `split` under `name`.
pub fn log_distribution(name: &str, distribution: &EnvironmentDistribution) {
    let parts: Vec<String> = distribution
        .per_environment
        .iter()
        .map(|entry| {
            format!(
                "Env{}={}/{} ({:.1}%)",
                entry.environment.id(),
                entry.count,
                distribution.total,
                entry.share * 100.0
            )
        })
        .collect();
    info!("{LOG_PREFIX} {name} environment distribution: {}", parts.join(", "));
    for entry in &distribution.per_environment {
        if entry.count == 0 {
            continue;
        }
        info!(
            "{LOG_PREFIX}   {name} env {} ({}): high income={}, low income={}",
            entry.environment.id(),
            entry.environment,
            entry.high_income,
            entry.low_income
        );
    }
}

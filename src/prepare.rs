//! Preparation orchestrator: idempotency gate, partition → split → reconcile,
//! then one all-or-nothing write of the three splits.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::config::PrepareConfig;
use crate::constants::environments::{LABEL_HIGH_INCOME, SEX_FEMALE, SEX_MALE};
use crate::constants::prepare::LOG_PREFIX;
use crate::constants::schema::SEX_COLUMN;
use crate::data::{Environment, GroupCode, SplitData};
use crate::errors::PrepareError;
use crate::metrics::{EnvironmentDistribution, environment_distribution, log_distribution};
use crate::partition::partition;
use crate::reconcile::reconcile_test;
use crate::rng::DeterministicRng;
use crate::source::RawDataSource;
use crate::splits::{SplitLabel, stratified_split};
use crate::store::{ArtifactStore, PreparedSplits};

/// Sizes and environment composition of a freshly prepared dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreparedSummary {
    /// Raw records returned by the provider.
    pub raw_records: usize,
    /// Records in the subsampled pool (train + val).
    pub pool_records: usize,
    /// Train split composition.
    pub train: EnvironmentDistribution,
    /// Validation split composition.
    pub validation: EnvironmentDistribution,
    /// Test split composition.
    pub test: EnvironmentDistribution,
}

/// Result of a `prepare` call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PrepareOutcome {
    /// All artifacts already existed; nothing was read or written.
    AlreadyPrepared,
    /// Artifacts were computed and written.
    Prepared(PreparedSummary),
}

/// Runs the preparation pipeline against a raw source, a sibling store, and an
/// output store.
pub struct FourEnvPreparer {
    config: PrepareConfig,
    source: Arc<dyn RawDataSource>,
    sibling: Arc<dyn ArtifactStore>,
    output: Arc<dyn ArtifactStore>,
}

impl FourEnvPreparer {
    /// Create a preparer; the configuration is validated here.
    pub fn new(
        config: PrepareConfig,
        source: Arc<dyn RawDataSource>,
        sibling: Arc<dyn ArtifactStore>,
        output: Arc<dyn ArtifactStore>,
    ) -> Result<Self, PrepareError> {
        Ok(Self {
            config: config.validated()?,
            source,
            sibling,
            output,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &PrepareConfig {
        &self.config
    }

    /// Output store the splits are written to.
    pub fn output(&self) -> &Arc<dyn ArtifactStore> {
        &self.output
    }

    /// Prepare the dataset unless all three artifacts already exist.
    pub fn prepare(&self) -> Result<PrepareOutcome, PrepareError> {
        if self.output.contains_all() {
            info!("{LOG_PREFIX} four-environment dataset already exists");
            return Ok(PrepareOutcome::AlreadyPrepared);
        }

        info!(
            "{LOG_PREFIX} preparing four-environment dataset from source '{}'",
            self.source.id()
        );
        let raw = self
            .source
            .load(&self.config.selector, self.config.income_threshold)?;

        let mut rng = DeterministicRng::new(self.config.seed);
        let pool = partition(&raw, &self.config.pool_sizes, &mut rng)?;
        log_pool_composition(&pool);

        let split = stratified_split(&pool, self.config.train_fraction, &mut rng)?;

        let sibling_test = self.load_sibling_test()?;
        let test = reconcile_test(&sibling_test, self.config.unmatched_test_policy)?;
        log_distribution(
            "sibling test (remapped)",
            &environment_distribution(&test),
        );

        let splits = PreparedSplits {
            train: split.train,
            validation: split.validation,
            test,
        };
        self.output.store_all(&splits)?;

        let summary = PreparedSummary {
            raw_records: raw.len(),
            pool_records: pool.len(),
            train: environment_distribution(&splits.train),
            validation: environment_distribution(&splits.validation),
            test: environment_distribution(&splits.test),
        };
        info!(
            "{LOG_PREFIX} four-environment dataset created: train={}, val={}, test={}",
            summary.train.total, summary.validation.total, summary.test.total
        );
        log_distribution("train", &summary.train);
        log_distribution("val", &summary.validation);
        log_distribution("test", &summary.test);
        Ok(PrepareOutcome::Prepared(summary))
    }

    fn load_sibling_test(&self) -> Result<SplitData, PrepareError> {
        self.sibling
            .load(SplitLabel::Test)?
            .ok_or_else(|| PrepareError::MissingDependency {
                path: self.sibling.location(SplitLabel::Test),
            })
    }
}

fn log_pool_composition(pool: &SplitData) {
    for env in Environment::ALL {
        let positions = pool.positions_of(env.id());
        let sex_count = |code: GroupCode| {
            positions
                .iter()
                .filter(|pos| pool.features[**pos][SEX_COLUMN] == code as f32)
                .count()
        };
        let high_income = positions
            .iter()
            .filter(|pos| pool.labels[**pos] == LABEL_HIGH_INCOME)
            .count();
        info!(
            "{LOG_PREFIX} pool env {} ({env}): total={}, male={}, female={}, high income={}, low income={}",
            env.id(),
            positions.len(),
            sex_count(SEX_MALE),
            sex_count(SEX_FEMALE),
            high_income,
            positions.len() - high_income
        );
    }
}

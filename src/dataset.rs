use std::fmt;
use std::sync::Arc;

use crate::data::{FeatureRow, Label, Sample, SplitData};
use crate::errors::PrepareError;
use crate::prepare::FourEnvPreparer;
use crate::splits::SplitLabel;
use crate::store::ArtifactStore;

/// Transform applied to each served feature row.
pub type FeatureTransform = Arc<dyn Fn(FeatureRow) -> FeatureRow + Send + Sync + 'static>;

/// Transform applied to each served label.
pub type TargetTransform = Arc<dyn Fn(Label) -> Label + Send + Sync + 'static>;

/// One loaded split served as `(features, label, environment)` samples.
#[derive(Clone)]
pub struct FourEnvDataset {
    split: SplitLabel,
    data: SplitData,
    transform: Option<FeatureTransform>,
    target_transform: Option<TargetTransform>,
}

impl fmt::Debug for FourEnvDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FourEnvDataset")
            .field("split", &self.split)
            .field("len", &self.data.len())
            .field("transform", &self.transform.is_some())
            .field("target_transform", &self.target_transform.is_some())
            .finish()
    }
}

impl FourEnvDataset {
    /// Prepare (if needed) and load the split named `split` (`train`, `val`, `test`).
    pub fn open(preparer: &FourEnvPreparer, split: &str) -> Result<Self, PrepareError> {
        let label: SplitLabel = split.parse()?;
        preparer.prepare()?;
        Self::from_store(preparer.output().as_ref(), label)
    }

    /// Load an already prepared split from `store`.
    pub fn from_store(store: &dyn ArtifactStore, split: SplitLabel) -> Result<Self, PrepareError> {
        let data = store
            .load(split)?
            .ok_or_else(|| PrepareError::MissingDependency {
                path: store.location(split),
            })?;
        Ok(Self::from_split(split, data))
    }

    /// Wrap split data that is already in memory.
    pub fn from_split(split: SplitLabel, data: SplitData) -> Self {
        Self {
            split,
            data,
            transform: None,
            target_transform: None,
        }
    }

    /// Apply `transform` to every served feature row.
    pub fn with_transform(
        mut self,
        transform: impl Fn(FeatureRow) -> FeatureRow + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Apply `transform` to every served label.
    pub fn with_target_transform(
        mut self,
        transform: impl Fn(Label) -> Label + Send + Sync + 'static,
    ) -> Self {
        self.target_transform = Some(Arc::new(transform));
        self
    }

    /// Which split this dataset serves.
    pub fn split(&self) -> SplitLabel {
        self.split
    }

    /// Untransformed split data.
    pub fn data(&self) -> &SplitData {
        &self.data
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the split is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sample at `index` with transforms applied; `None` when out of range.
    pub fn get(&self, index: usize) -> Option<Sample> {
        let mut sample = self.data.sample(index)?;
        if let Some(transform) = &self.transform {
            sample.features = transform(sample.features);
        }
        if let Some(transform) = &self.target_transform {
            sample.label = transform(sample.label);
        }
        Some(sample)
    }

    /// Iterate all samples in stored order.
    pub fn iter(&self) -> impl Iterator<Item = Sample> + '_ {
        (0..self.len()).filter_map(move |index| self.get(index))
    }
}

//! Raw data provider interfaces.
//!
//! Ownership model:
//! - `RawDataSource` is the pipeline-facing interface that returns the three
//!   parallel raw arrays for a region/vintage selector.
//! - `InMemorySource` serves prebuilt arrays (tests, embedding).
//! - `PumsCsvSource` reads ACS PUMS person files from disk.
//!
//! Reproducibility of a prepared dataset assumes a provider returns records in
//! the same order for the same selector on every call; seeded subsampling is
//! applied to positions, so a reordered input yields a different pool.

use crate::config::SurveySelector;
use crate::data::RawDataset;
use crate::errors::PrepareError;
use crate::types::SourceId;

/// PUMS person-file provider.
pub mod pums;
/// Region abbreviation to FIPS code table.
pub mod regions;

pub use pums::PumsCsvSource;

/// Pipeline-facing raw data provider.
///
/// For a given selector, `load` must return equal-length arrays in a stable
/// record order across calls.
pub trait RawDataSource: Send + Sync {
    /// Stable source identifier used in logs and errors.
    fn id(&self) -> &str;
    /// Return `(features, labels, group)` for the selected regions and vintage.
    ///
    /// `income_threshold` is the label cut (`income > threshold`) for providers
    /// that derive labels themselves.
    fn load(
        &self,
        selector: &SurveySelector,
        income_threshold: f64,
    ) -> Result<RawDataset, PrepareError>;
}

/// Raw source backed by prebuilt arrays; ignores the selector.
#[derive(Clone, Debug)]
pub struct InMemorySource {
    id: SourceId,
    raw: RawDataset,
}

impl InMemorySource {
    /// Create an in-memory source from prebuilt arrays.
    pub fn new(id: impl Into<SourceId>, raw: RawDataset) -> Self {
        Self { id: id.into(), raw }
    }
}

impl RawDataSource for InMemorySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn load(
        &self,
        _selector: &SurveySelector,
        _income_threshold: f64,
    ) -> Result<RawDataset, PrepareError> {
        self.raw.validate()?;
        Ok(self.raw.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_source_returns_arrays_unchanged() {
        let mut raw = RawDataset::default();
        raw.push([1.0, 2.0, 3.0, 1.0, 40.0], 1, 1);
        let source = InMemorySource::new("in_memory", raw.clone());
        assert_eq!(source.id(), "in_memory");
        let loaded = source.load(&SurveySelector::default(), 25_000.0).unwrap();
        assert_eq!(loaded, raw);
    }

    #[test]
    fn in_memory_source_rejects_misaligned_arrays() {
        let raw = RawDataset {
            features: vec![[0.0; 5]],
            labels: vec![],
            group: vec![1],
        };
        let source = InMemorySource::new("broken", raw);
        assert!(matches!(
            source.load(&SurveySelector::default(), 0.0),
            Err(PrepareError::InconsistentLengths { .. })
        ));
    }
}

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Command-line runners shared by the crate's binaries.
pub mod apps;
/// Preparation configuration types.
pub mod config;
/// Centralized constants for the schema, environments, and artifact layout.
pub mod constants;
/// Record arrays, environments, and served samples.
pub mod data;
/// Split-serving dataset with optional transforms.
pub mod dataset;
/// Per-environment distribution summaries.
pub mod metrics;
/// Fixed-size per-environment subsampling.
pub mod partition;
/// Preparation orchestrator.
pub mod prepare;
/// Sibling test split remapping.
pub mod reconcile;
/// Seeded, platform-stable random number generator.
pub mod rng;
/// Raw data provider traits and built-in providers.
pub mod source;
/// Split labels and the stratified train/validation splitter.
pub mod splits;
/// Artifact stores and on-disk layout.
pub mod store;
/// Shared type aliases.
pub mod types;

mod errors;

pub use config::{EnvironmentPoolSizes, PrepareConfig, SurveySelector, UnmatchedTestPolicy};
pub use data::{Environment, RawDataset, Sample, SplitData};
pub use dataset::FourEnvDataset;
pub use errors::PrepareError;
pub use metrics::{EnvironmentDistribution, environment_distribution};
pub use partition::partition;
pub use prepare::{FourEnvPreparer, PrepareOutcome, PreparedSummary};
pub use reconcile::reconcile_test;
pub use rng::DeterministicRng;
pub use source::{InMemorySource, PumsCsvSource, RawDataSource};
pub use splits::{SplitLabel, TrainValSplit, stratified_split};
pub use store::{ArtifactStore, DatasetLayout, FileArtifactStore, MemoryArtifactStore, PreparedSplits};
pub use types::{EnvId, FeatureRow, GroupCode, Label, RegionCode, SourceId};

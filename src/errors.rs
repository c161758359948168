use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::data::Environment;
use crate::types::{Label, SourceId};

/// Error type for raw loading, partitioning, reconciliation, and persistence failures.
#[derive(Debug, Error)]
pub enum PrepareError {
    #[error(
        "environment '{environment}' needs {requested} records but only {available} are available"
    )]
    InsufficientData {
        environment: Environment,
        requested: usize,
        available: usize,
    },
    #[error(
        "required artifact not found at {}; prepare the sibling dataset first",
        path.display()
    )]
    MissingDependency { path: PathBuf },
    #[error("test record {index} has no environment (sex code {sex_code}, label {label})")]
    UnmatchedEnvironment {
        index: usize,
        sex_code: f32,
        label: Label,
    },
    #[error("inconsistent lengths in {context}: {details}")]
    InconsistentLengths {
        context: &'static str,
        details: String,
    },
    #[error("data source '{source_id}' is unavailable: {reason}")]
    SourceUnavailable { source_id: SourceId, reason: String },
    #[error("artifact store failure: {0}")]
    ArtifactStore(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("unknown split '{0}'; valid splits are train, val, and test")]
    UnknownSplit(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

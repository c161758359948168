/// Constants describing the fixed five-column feature schema.
pub mod schema {
    /// Number of feature columns per record.
    pub const FEATURE_COUNT: usize = 5;
    /// Survey column names in feature order.
    pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = ["SCHL", "OCCP", "WKHP", "SEX", "AGEP"];
    /// Column index of educational attainment (`SCHL`).
    pub const EDUCATION_COLUMN: usize = 0;
    /// Column index of occupation code (`OCCP`).
    pub const OCCUPATION_COLUMN: usize = 1;
    /// Column index of usual weekly work hours (`WKHP`).
    pub const HOURS_COLUMN: usize = 2;
    /// Column index of the sex code (`SEX`), also the group attribute.
    pub const SEX_COLUMN: usize = 3;
    /// Column index of age (`AGEP`).
    pub const AGE_COLUMN: usize = 4;
    /// Value substituted for missing feature cells.
    pub const MISSING_FEATURE_VALUE: f32 = -1.0;
}

/// Constants describing the four fixed environments.
pub mod environments {
    /// Survey sex code for male respondents.
    pub const SEX_MALE: i64 = 1;
    /// Survey sex code for female respondents.
    pub const SEX_FEMALE: i64 = 2;
    /// Label value for income at or below the threshold.
    pub const LABEL_LOW_INCOME: i64 = 0;
    /// Label value for income above the threshold.
    pub const LABEL_HIGH_INCOME: i64 = 1;
    /// Number of environments.
    pub const ENVIRONMENT_COUNT: usize = 4;

    /// Default pool size for male, low income (env 0).
    pub const DEFAULT_MALE_LOW_INCOME: usize = 4_000;
    /// Default pool size for male, high income (env 1).
    pub const DEFAULT_MALE_HIGH_INCOME: usize = 16_000;
    /// Default pool size for female, low income (env 2).
    pub const DEFAULT_FEMALE_LOW_INCOME: usize = 16_000;
    /// Default pool size for female, high income (env 3).
    pub const DEFAULT_FEMALE_HIGH_INCOME: usize = 4_000;
}

/// Constants used by the preparation pipeline defaults.
pub mod prepare {
    /// Default RNG seed for subsampling and shuffles.
    pub const DEFAULT_SEED: u64 = 42;
    /// Default fraction of each environment assigned to train.
    pub const DEFAULT_TRAIN_FRACTION: f64 = 0.8;
    /// Default income threshold; labels are `income > threshold`.
    pub const DEFAULT_INCOME_THRESHOLD: f64 = 25_000.0;
    /// Default survey vintage.
    pub const DEFAULT_VINTAGE: u16 = 2021;
    /// Default survey horizon.
    pub const DEFAULT_HORIZON: &str = "1-Year";
    /// Default region selection.
    pub const DEFAULT_REGIONS: [&str; 10] =
        ["CA", "NY", "TX", "FL", "IL", "PA", "OH", "GA", "NC", "MI"];
    /// Message prefix used by pipeline log lines.
    pub const LOG_PREFIX: &str = "[four_env]";
}

/// Constants for the standard adult-population inclusion rule.
pub mod adult_filter {
    /// Records must be strictly older than this age.
    pub const MIN_AGE_EXCLUSIVE: f64 = 16.0;
    /// Records must have personal income strictly above this value.
    pub const MIN_INCOME_EXCLUSIVE: f64 = 100.0;
    /// Records must report strictly more weekly hours than this.
    pub const MIN_HOURS_EXCLUSIVE: f64 = 0.0;
    /// Records must carry at least this person weight.
    pub const MIN_PERSON_WEIGHT: f64 = 1.0;
}

/// Constants used by artifact persistence and directory layout.
pub mod artifacts {
    use crate::splits::SplitLabel;

    /// Directory (under the root) holding this dataset's splits.
    pub const DATASET_DIR: &str = "four_env_synthetic_folktables";
    /// Directory (under the root) holding the sibling dataset's splits.
    pub const SIBLING_DATASET_DIR: &str = "synthetic_folktables";
    /// Default data root.
    pub const DEFAULT_ROOT: &str = "./data";
    /// File extension of persisted split artifacts.
    pub const ARTIFACT_EXTENSION: &str = "bin";
    /// Suffix appended to in-flight artifact writes.
    pub const TEMP_SUFFIX: &str = "tmp";
    /// Prefix marker for bitcode-encoded payloads.
    pub const BITCODE_PREFIX: u8 = b'B';
    /// Version tag for persisted split records.
    pub const SPLIT_RECORD_VERSION: u8 = 1;
    /// Canonical split order used when storing/loading all splits.
    pub const ALL_SPLITS: [SplitLabel; 3] =
        [SplitLabel::Train, SplitLabel::Validation, SplitLabel::Test];
}

/// Constants for locating raw PUMS person files.
pub mod pums {
    /// Source id reported by the PUMS CSV provider.
    pub const PUMS_SOURCE_ID: &str = "pums_csv";
    /// Person file name prefix; the two-digit FIPS code follows.
    pub const PERSON_FILE_PREFIX: &str = "psam_p";
    /// Person file extension.
    pub const PERSON_FILE_EXTENSION: &str = "csv";
}

use crate::constants::schema::FEATURE_COUNT;

/// One person's feature vector in the fixed column order.
/// Example: `[21.0, 4720.0, 40.0, 2.0, 35.0]` (SCHL, OCCP, WKHP, SEX, AGEP)
pub type FeatureRow = [f32; FEATURE_COUNT];
/// Binary income label (`1` when income is above the threshold).
/// Examples: `0`, `1`
pub type Label = i64;
/// Raw group attribute as encoded in the survey.
/// Examples: `1` (male), `2` (female)
pub type GroupCode = i64;
/// Persisted environment identifier.
/// Examples: `0`, `3`
pub type EnvId = i64;
/// Identifier for the raw data provider.
/// Examples: `pums_csv`, `in_memory`
pub type SourceId = String;
/// Two-letter region (state) abbreviation used by the survey selector.
/// Examples: `CA`, `NY`
pub type RegionCode = String;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::SurveySelector;
use crate::constants::adult_filter::{
    MIN_AGE_EXCLUSIVE, MIN_HOURS_EXCLUSIVE, MIN_INCOME_EXCLUSIVE, MIN_PERSON_WEIGHT,
};
use crate::constants::environments::{LABEL_HIGH_INCOME, LABEL_LOW_INCOME};
use crate::constants::prepare::LOG_PREFIX;
use crate::constants::pums::{PERSON_FILE_EXTENSION, PERSON_FILE_PREFIX, PUMS_SOURCE_ID};
use crate::constants::schema::{
    AGE_COLUMN, EDUCATION_COLUMN, FEATURE_COUNT, HOURS_COLUMN, MISSING_FEATURE_VALUE,
    OCCUPATION_COLUMN, SEX_COLUMN,
};
use crate::data::{FeatureRow, GroupCode, Label, RawDataset};
use crate::errors::PrepareError;
use crate::source::RawDataSource;
use crate::source::regions::fips_code;

/// The person-file columns this source reads; other columns are ignored.
///
/// Unparseable cells are treated as missing.
#[derive(Debug, Deserialize)]
struct PersonRow {
    #[serde(rename = "SCHL", default, deserialize_with = "csv::invalid_option")]
    schl: Option<f64>,
    #[serde(rename = "OCCP", default, deserialize_with = "csv::invalid_option")]
    occp: Option<f64>,
    #[serde(rename = "WKHP", default, deserialize_with = "csv::invalid_option")]
    wkhp: Option<f64>,
    #[serde(rename = "SEX", default, deserialize_with = "csv::invalid_option")]
    sex: Option<f64>,
    #[serde(rename = "AGEP", default, deserialize_with = "csv::invalid_option")]
    agep: Option<f64>,
    #[serde(rename = "PINCP", default, deserialize_with = "csv::invalid_option")]
    pincp: Option<f64>,
    #[serde(rename = "PWGTP", default, deserialize_with = "csv::invalid_option")]
    pwgtp: Option<f64>,
}

impl PersonRow {
    /// Standard adult-population inclusion rule; missing values exclude the row.
    fn passes_adult_filter(&self) -> bool {
        matches!(self.agep, Some(age) if age > MIN_AGE_EXCLUSIVE)
            && matches!(self.pincp, Some(income) if income > MIN_INCOME_EXCLUSIVE)
            && matches!(self.wkhp, Some(hours) if hours > MIN_HOURS_EXCLUSIVE)
            && matches!(self.pwgtp, Some(weight) if weight >= MIN_PERSON_WEIGHT)
    }

    fn features(&self) -> FeatureRow {
        let mut row = [MISSING_FEATURE_VALUE; FEATURE_COUNT];
        row[EDUCATION_COLUMN] = feature_value(self.schl);
        row[OCCUPATION_COLUMN] = feature_value(self.occp);
        row[HOURS_COLUMN] = feature_value(self.wkhp);
        row[SEX_COLUMN] = feature_value(self.sex);
        row[AGE_COLUMN] = feature_value(self.agep);
        row
    }

    fn label(&self, income_threshold: f64) -> Label {
        match self.pincp {
            Some(income) if income > income_threshold => LABEL_HIGH_INCOME,
            _ => LABEL_LOW_INCOME,
        }
    }

    fn group(&self) -> GroupCode {
        self.sex
            .map(|sex| sex as GroupCode)
            .unwrap_or(MISSING_FEATURE_VALUE as GroupCode)
    }
}

fn feature_value(value: Option<f64>) -> f32 {
    value
        .filter(|v| v.is_finite())
        .map(|v| v as f32)
        .unwrap_or(MISSING_FEATURE_VALUE)
}

/// Raw provider reading ACS PUMS person files (`psam_p<FIPS>.csv`).
///
/// Files are looked up under `<data_dir>/<vintage>/<horizon>/` (searched
/// recursively). Regions are loaded in selector order and rows in file order,
/// so repeated loads return the same record order.
#[derive(Clone, Debug)]
pub struct PumsCsvSource {
    data_dir: PathBuf,
}

impl PumsCsvSource {
    /// Create a source rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Directory searched for one survey vintage/horizon.
    pub fn survey_dir(&self, selector: &SurveySelector) -> PathBuf {
        self.data_dir
            .join(selector.vintage.to_string())
            .join(&selector.horizon)
    }

    /// File name of the person file for a region abbreviation.
    pub fn person_file_name(region: &str) -> Result<String, PrepareError> {
        let code = fips_code(region).ok_or_else(|| {
            PrepareError::Configuration(format!("unknown region code '{region}'"))
        })?;
        Ok(format!(
            "{PERSON_FILE_PREFIX}{code}.{PERSON_FILE_EXTENSION}"
        ))
    }

    /// Locate the person file for `region` under the survey directory.
    pub fn person_file(
        &self,
        selector: &SurveySelector,
        region: &str,
    ) -> Result<PathBuf, PrepareError> {
        let file_name = Self::person_file_name(region)?;
        let survey_dir = self.survey_dir(selector);
        WalkDir::new(&survey_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .find(|entry| entry.file_name().to_str() == Some(file_name.as_str()))
            .map(|entry| entry.into_path())
            .ok_or_else(|| PrepareError::SourceUnavailable {
                source_id: PUMS_SOURCE_ID.to_string(),
                reason: format!(
                    "no {file_name} for region {region} under {}",
                    survey_dir.display()
                ),
            })
    }

    fn read_person_file(
        path: &Path,
        income_threshold: f64,
        raw: &mut RawDataset,
    ) -> Result<(usize, usize), PrepareError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)?;
        let mut read = 0;
        let mut kept = 0;
        for row in reader.deserialize::<PersonRow>() {
            let row = row?;
            read += 1;
            if !row.passes_adult_filter() {
                continue;
            }
            raw.push(row.features(), row.label(income_threshold), row.group());
            kept += 1;
        }
        Ok((read, kept))
    }
}

impl RawDataSource for PumsCsvSource {
    fn id(&self) -> &str {
        PUMS_SOURCE_ID
    }

    fn load(
        &self,
        selector: &SurveySelector,
        income_threshold: f64,
    ) -> Result<RawDataset, PrepareError> {
        let mut raw = RawDataset::default();
        for region in &selector.regions {
            let path = self.person_file(selector, region)?;
            debug!("{LOG_PREFIX} reading {}", path.display());
            let (read, kept) = Self::read_person_file(&path, income_threshold, &mut raw)?;
            info!(
                "{LOG_PREFIX} region {region}: {kept} of {read} person records pass the adult filter"
            );
        }
        info!(
            "{LOG_PREFIX} loaded {} records from {} regions ({} {})",
            raw.len(),
            selector.regions.len(),
            selector.vintage,
            selector.horizon
        );
        Ok(raw)
    }
}

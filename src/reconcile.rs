use tracing::{info, warn};

use crate::config::UnmatchedTestPolicy;
use crate::constants::prepare::LOG_PREFIX;
use crate::constants::schema::SEX_COLUMN;
use crate::data::{Environment, SplitData};
use crate::errors::PrepareError;

/// Rebuild a test split from a sibling's test split.
///
/// Features and labels are kept as-is; the sibling's environment ids are
/// discarded and recomputed from each record's SEX column and label.
pub fn reconcile_test(
    sibling: &SplitData,
    policy: UnmatchedTestPolicy,
) -> Result<SplitData, PrepareError> {
    sibling.validate()?;

    let mut environments = Vec::with_capacity(sibling.len());
    let mut unmatched = 0_usize;
    for (index, (row, label)) in sibling.features.iter().zip(&sibling.labels).enumerate() {
        match Environment::from_features(row, *label) {
            Some(env) => environments.push(env.id()),
            None => match policy {
                UnmatchedTestPolicy::Reject => {
                    return Err(PrepareError::UnmatchedEnvironment {
                        index,
                        sex_code: row[SEX_COLUMN],
                        label: *label,
                    });
                }
                UnmatchedTestPolicy::DefaultToZero => {
                    unmatched += 1;
                    environments.push(Environment::MaleLowIncome.id());
                }
            },
        }
    }

    if unmatched > 0 {
        warn!(
            "{LOG_PREFIX} {unmatched} test records matched no environment and were assigned env 0"
        );
    }
    info!(
        "{LOG_PREFIX} reconciled {} test records from sibling split",
        sibling.len()
    );

    SplitData::new(sibling.features.clone(), sibling.labels.clone(), environments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sibling() -> SplitData {
        SplitData::new(
            vec![
                [16.0, 10.0, 40.0, 1.0, 30.0],
                [21.0, 20.0, 45.0, 1.0, 41.0],
                [18.0, 30.0, 20.0, 2.0, 25.0],
                [22.0, 40.0, 50.0, 2.0, 52.0],
            ],
            vec![0, 1, 0, 1],
            // Sibling ids carry a different convention and must be ignored.
            vec![1, 1, 0, 0],
        )
        .unwrap()
    }

    #[test]
    fn recomputes_environment_from_sex_column_and_label() {
        let input = sibling();
        let test = reconcile_test(&input, UnmatchedTestPolicy::Reject).unwrap();
        assert_eq!(test.environments, vec![0, 1, 2, 3]);
        assert_eq!(test.features, input.features);
        assert_eq!(test.labels, input.labels);
    }

    #[test]
    fn reject_policy_reports_first_unmatched_record() {
        let mut input = sibling();
        input.features[2][SEX_COLUMN] = 3.0;
        let err = reconcile_test(&input, UnmatchedTestPolicy::Reject).unwrap_err();
        assert!(matches!(
            err,
            PrepareError::UnmatchedEnvironment { index: 2, label: 0, .. }
        ));
    }

    #[test]
    fn default_to_zero_policy_keeps_unmatched_records_in_env_zero() {
        let mut input = sibling();
        input.features[3][SEX_COLUMN] = -1.0;
        input.labels[1] = 5;
        let test = reconcile_test(&input, UnmatchedTestPolicy::DefaultToZero).unwrap();
        assert_eq!(test.environments, vec![0, 0, 2, 0]);
        assert_eq!(test.len(), input.len());
    }

    #[test]
    fn empty_sibling_yields_empty_test_split() {
        let test = reconcile_test(&SplitData::default(), UnmatchedTestPolicy::Reject).unwrap();
        assert!(test.is_empty());
    }
}

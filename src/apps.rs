use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum, error::ErrorKind};

use crate::config::{EnvironmentPoolSizes, PrepareConfig, SurveySelector, UnmatchedTestPolicy};
use crate::constants::artifacts::DEFAULT_ROOT;
use crate::constants::prepare::{
    DEFAULT_HORIZON, DEFAULT_SEED, DEFAULT_TRAIN_FRACTION, DEFAULT_VINTAGE,
};
use crate::prepare::{FourEnvPreparer, PrepareOutcome};
use crate::source::PumsCsvSource;
use crate::store::DatasetLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum UnmatchedArg {
    Reject,
    DefaultZero,
}

impl From<UnmatchedArg> for UnmatchedTestPolicy {
    fn from(value: UnmatchedArg) -> Self {
        match value {
            UnmatchedArg::Reject => UnmatchedTestPolicy::Reject,
            UnmatchedArg::DefaultZero => UnmatchedTestPolicy::DefaultToZero,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "prepare_four_env",
    disable_help_subcommand = true,
    about = "Prepare the unbalanced four-environment census income dataset",
    long_about = "Subsample ACS PUMS person records into four (sex x income) environments, split them into train/val per environment, and remap the sibling dataset's test split.",
    after_help = "Nothing is recomputed when train, val, and test artifacts already exist under <ROOT>/four_env_synthetic_folktables."
)]
/// CLI for `prepare_four_env`.
///
/// Common usage:
/// - Default layout: `--root ./data` with PUMS files under `./data/raw/2021/1-Year/`
/// - Custom raw location: `--pums-dir /mnt/pums`
/// - Restrict regions: repeat `--region CA --region NY`
struct PrepareCli {
    #[arg(
        long,
        value_name = "ROOT",
        default_value = DEFAULT_ROOT,
        help = "Data root holding the sibling and output dataset directories"
    )]
    root: PathBuf,
    #[arg(
        long = "pums-dir",
        value_name = "DIR",
        help = "Directory with <vintage>/<horizon>/psam_p<FIPS>.csv files (defaults to <ROOT>/raw)"
    )]
    pums_dir: Option<PathBuf>,
    #[arg(
        long,
        default_value_t = DEFAULT_SEED,
        help = "Seed for subsampling and shuffles"
    )]
    seed: u64,
    #[arg(
        long = "train-fraction",
        default_value_t = DEFAULT_TRAIN_FRACTION,
        value_parser = parse_train_fraction,
        help = "Fraction of each environment assigned to train"
    )]
    train_fraction: f64,
    #[arg(
        long = "pool-sizes",
        value_name = "MALE_LOW,MALE_HIGH,FEMALE_LOW,FEMALE_HIGH",
        value_parser = parse_pool_sizes_arg,
        default_value = "4000,16000,16000,4000",
        help = "Comma-separated per-environment subsample sizes"
    )]
    pool_sizes: EnvironmentPoolSizes,
    #[arg(
        long = "region",
        value_name = "CODE",
        help = "Region abbreviation to load, repeat as needed (defaults to the ten reference states)"
    )]
    regions: Vec<String>,
    #[arg(long, default_value_t = DEFAULT_VINTAGE, help = "Survey year")]
    vintage: u16,
    #[arg(long, default_value = DEFAULT_HORIZON, help = "Survey horizon")]
    horizon: String,
    #[arg(
        long = "unmatched-test-env",
        value_enum,
        default_value_t = UnmatchedArg::Reject,
        help = "How to treat sibling test records outside the four environments"
    )]
    unmatched_test_env: UnmatchedArg,
    #[arg(
        long = "summary-json",
        value_name = "PATH",
        help = "Optional path for a JSON preparation summary"
    )]
    summary_json: Option<PathBuf>,
}

impl PrepareCli {
    fn config(&self) -> PrepareConfig {
        let defaults = SurveySelector::default();
        PrepareConfig {
            seed: self.seed,
            pool_sizes: self.pool_sizes,
            train_fraction: self.train_fraction,
            selector: SurveySelector {
                regions: if self.regions.is_empty() {
                    defaults.regions
                } else {
                    self.regions.clone()
                },
                vintage: self.vintage,
                horizon: self.horizon.clone(),
            },
            unmatched_test_policy: self.unmatched_test_env.into(),
            ..PrepareConfig::default()
        }
    }
}

/// Run the `prepare_four_env` command with `args_iter` (program name excluded).
pub fn run_prepare<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) = parse_cli::<PrepareCli, _>(
        std::iter::once("prepare_four_env".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let layout = DatasetLayout::new(cli.root.clone());
    let pums_dir = cli
        .pums_dir
        .clone()
        .unwrap_or_else(|| layout.root().join("raw"));
    let preparer = FourEnvPreparer::new(
        cli.config(),
        Arc::new(PumsCsvSource::new(pums_dir)),
        Arc::new(layout.sibling_store()),
        Arc::new(layout.output_store()),
    )?;

    match preparer.prepare()? {
        PrepareOutcome::AlreadyPrepared => {
            println!(
                "Four-environment dataset already exists at {}",
                layout.dataset_dir().display()
            );
        }
        PrepareOutcome::Prepared(summary) => {
            println!(
                "Prepared {}: train={} val={} test={} (pool {} of {} raw records)",
                layout.dataset_dir().display(),
                summary.train.total,
                summary.validation.total,
                summary.test.total,
                summary.pool_records,
                summary.raw_records
            );
            if let Some(path) = &cli.summary_json {
                let writer = BufWriter::new(File::create(path)?);
                serde_json::to_writer_pretty(writer, &summary)?;
            }
        }
    }
    Ok(())
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

fn parse_train_fraction(raw: &str) -> Result<f64, String> {
    let parsed = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid --train-fraction '{raw}': must be a float"))?;
    if !(parsed > 0.0 && parsed <= 1.0) {
        return Err("--train-fraction must be in (0, 1]".to_string());
    }
    Ok(parsed)
}

fn parse_pool_sizes_arg(raw: &str) -> Result<EnvironmentPoolSizes, String> {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 4 {
        return Err("--pool-sizes expects exactly 4 comma-separated values".to_string());
    }
    let mut sizes = [0_usize; 4];
    for (slot, part) in sizes.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse::<usize>()
            .map_err(|_| format!("invalid pool size '{}': must be an integer", part.trim()))?;
    }
    Ok(EnvironmentPoolSizes {
        male_low_income: sizes[0],
        male_high_income: sizes[1],
        female_low_income: sizes[2],
        female_high_income: sizes[3],
    })
}

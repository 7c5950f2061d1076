// Copyright 2023 - 2026 The Gauntlet Authors

//! Session options, assembled from command-line arguments and the
//! `gauntlet.toml` config file. Command-line values win.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use serde::Deserialize;
use tracing::warn;

use crate::error::EngineError;
use crate::filter::{NameFilter, PathFilter};
use crate::mutant::{Mutant, MutationLevel};

/// Command-line arguments.
#[derive(Parser, Debug, Default)]
#[command(name = "gauntlet", about, version)]
pub struct Args {
    /// Source files to mutate.
    pub sources: Vec<Utf8PathBuf>,

    /// Just list the mutants that would be tested, without running them.
    #[arg(long)]
    pub list: bool,

    /// Output json (only for --list).
    #[arg(long)]
    pub json: bool,

    /// Show diffs of the listed mutants.
    #[arg(long)]
    pub diff: bool,

    /// Mutation depth.
    #[arg(long, value_enum)]
    pub level: Option<MutationLevel>,

    /// Maximum number of test hosts to run in parallel.
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Explicit per-mutant test timeout in seconds, instead of deriving it
    /// from the coverage run.
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Minimum derived timeout in milliseconds.
    #[arg(long)]
    pub minimum_timeout: Option<u64>,

    /// Multiplier applied to the longest coverage-run test.
    #[arg(long)]
    pub timeout_multiplier: Option<f64>,

    /// Fail with a distinct exit code when the score is below this
    /// percentage.
    #[arg(long)]
    pub break_at: Option<f64>,

    /// Count uncovered mutants as misses in the score.
    #[arg(long)]
    pub count_uncovered: bool,

    /// Glob patterns of files to mutate; all files when empty.
    #[arg(long = "examine")]
    pub examine_globs: Vec<String>,

    /// Glob patterns of files to skip.
    #[arg(long = "exclude")]
    pub exclude_globs: Vec<String>,

    /// Regex patterns of mutant names to skip.
    #[arg(long = "exclude-lines")]
    pub exclude_line_patterns: Vec<String>,

    /// Mutation kinds to disable, like `Linq` or `String`.
    #[arg(long = "excluded-mutations")]
    pub excluded_mutations: Vec<String>,

    /// Test binaries to discover tests from and inject the mutated
    /// artifact into.
    #[arg(long = "test-project")]
    pub test_projects: Vec<Utf8PathBuf>,

    /// Directory for logs, the artifact, and the report.
    #[arg(long)]
    pub output: Option<Utf8PathBuf>,

    /// Namespace of the runtime control type in instrumented code.
    #[arg(long)]
    pub helper_namespace: Option<String>,
}

/// The `gauntlet.toml` config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub level: Option<MutationLevel>,
    pub jobs: Option<usize>,
    pub timeout_multiplier: Option<f64>,
    pub minimum_timeout_ms: Option<u64>,
    pub break_at: Option<f64>,
    pub count_uncovered: Option<bool>,
    pub examine: Vec<String>,
    pub exclude: Vec<String>,
    pub exclude_lines: Vec<String>,
    pub excluded_mutations: Vec<String>,
    pub helper_namespace: Option<String>,
    pub exclusion_marker: Option<String>,
    pub generated_markers: Vec<String>,
}

impl Config {
    pub fn read_file(path: &Utf8Path) -> Result<Config> {
        let toml = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {path:?}"))?;
        Config::from_str(&toml)
    }

    /// Read the config from the tree root if one exists there.
    pub fn read_tree_config(dir: &Utf8Path) -> Result<Config> {
        let path = dir.join("gauntlet.toml");
        if path.is_file() {
            Config::read_file(&path)
        } else {
            Ok(Config::default())
        }
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Config> {
        toml::from_str(s).context("parse config file")
    }
}

/// Resolved options for one session.
#[derive(Clone, Debug)]
pub struct Options {
    pub level: MutationLevel,
    pub jobs: usize,
    /// Explicit per-mutant timeout; overrides derivation.
    pub test_timeout: Option<Duration>,
    /// Floor for the derived timeout.
    pub minimum_test_timeout: Duration,
    pub timeout_multiplier: f64,
    /// Break threshold in percent.
    pub break_at: Option<f64>,
    pub count_uncovered: bool,
    pub excluded_mutations: Vec<crate::mutant::MutationKind>,
    /// Attribute name that excludes a subtree from mutation.
    pub exclusion_marker: String,
    /// Prologue markers identifying generated files.
    pub generated_markers: Vec<String>,
    pub helper_namespace: String,
    pub output_dir: Option<Utf8PathBuf>,
    path_filter: PathFilter,
    name_filter: NameFilter,
}

impl Default for Options {
    fn default() -> Options {
        Options::new(&Args::default(), &Config::default())
            .expect("default options are valid")
    }
}

impl Options {
    pub fn new(args: &Args, config: &Config) -> Result<Options> {
        let invalid =
            |message: String| anyhow::Error::from(EngineError::ConfigurationInvalid(message));
        let jobs = args.jobs.or(config.jobs).unwrap_or(1);
        if jobs == 0 {
            return Err(invalid("--jobs must be at least 1".to_owned()));
        }
        let timeout_multiplier = args
            .timeout_multiplier
            .or(config.timeout_multiplier)
            .unwrap_or(1.5);
        if !(timeout_multiplier.is_finite() && timeout_multiplier > 0.0) {
            return Err(invalid(format!(
                "timeout multiplier must be positive, got {timeout_multiplier}"
            )));
        }
        let break_at = args.break_at.or(config.break_at);
        if let Some(break_at) = break_at {
            if !(0.0..=100.0).contains(&break_at) {
                return Err(invalid(format!(
                    "--break-at is a percentage, got {break_at}"
                )));
            }
        }
        let excluded_mutations = args
            .excluded_mutations
            .iter()
            .chain(&config.excluded_mutations)
            .map(|name| {
                crate::mutant::MutationKind::from_str(name)
                    .map_err(|_| invalid(format!("unknown mutation kind {name:?}")))
            })
            .collect::<Result<Vec<_>>>()?;
        let path_filter = PathFilter::new(
            &args
                .examine_globs
                .iter()
                .chain(&config.examine)
                .collect::<Vec<_>>(),
            &args
                .exclude_globs
                .iter()
                .chain(&config.exclude)
                .collect::<Vec<_>>(),
        )
        .map_err(|err| invalid(format!("{err:#}")))?;
        let name_filter = NameFilter::new(
            &args
                .exclude_line_patterns
                .iter()
                .chain(&config.exclude_lines)
                .collect::<Vec<_>>(),
        )
        .map_err(|err| invalid(format!("{err:#}")))?;
        let mut generated_markers = config.generated_markers.clone();
        if generated_markers.is_empty() {
            generated_markers.push("<auto-generated".to_owned());
        }
        Ok(Options {
            level: args.level.or(config.level).unwrap_or_default(),
            jobs,
            test_timeout: args.timeout.map(Duration::from_secs_f64),
            minimum_test_timeout: Duration::from_millis(
                args.minimum_timeout.or(config.minimum_timeout_ms).unwrap_or(5000),
            ),
            timeout_multiplier,
            break_at,
            count_uncovered: args.count_uncovered || config.count_uncovered.unwrap_or(false),
            excluded_mutations,
            exclusion_marker: config
                .exclusion_marker
                .clone()
                .unwrap_or_else(|| "ExcludeFromMutation".to_owned()),
            generated_markers,
            helper_namespace: args
                .helper_namespace
                .clone()
                .or_else(|| config.helper_namespace.clone())
                .unwrap_or_else(|| "Gauntlet".to_owned()),
            output_dir: args.output.clone(),
            path_filter,
            name_filter,
        })
    }

    /// Build options from command-line-ish strings; test convenience.
    pub fn from_arg_strs<I, S>(args: I) -> Options
    where
        I: IntoIterator<Item = S>,
        S: Into<std::ffi::OsString> + Clone,
    {
        let args = Args::parse_from(args);
        Options::new(&args, &Config::default()).expect("options from args")
    }

    /// True if this source file should be visited at all.
    pub fn allows_source_file_path(&self, path: &Utf8Path) -> bool {
        self.path_filter.allows(path)
    }

    /// True if the mutant survives the name/line denylist.
    pub fn allows_mutant(&self, mutant: &Mutant) -> bool {
        if self.name_filter.is_empty() {
            return true;
        }
        if self.name_filter.matches(mutant) {
            warn!(name = mutant.name(true), "mutant excluded by pattern");
            false
        } else {
            true
        }
    }

    /// True if the unit looks machine-generated and should not be mutated.
    pub fn is_generated(&self, path: &Utf8Path, prologue: &str) -> bool {
        path.as_str().contains(".g.")
            || self
                .generated_markers
                .iter()
                .any(|marker| prologue.contains(marker))
    }
}

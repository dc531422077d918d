use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::ArgMatches;
use tracing::info;

use hivdr_core::models::{DrugScore, Locus, Observation};
use hivdr_io::{
    OutputFormat, load_reference_tables, read_report_records, write_observations_to_path,
    write_scores_to_path,
};
use hivdr_scoring::{
    AggregateOptions, PipelineOptions, TokenPolicy, score_records, sort_observations, sort_scores,
};

use super::cli::DEFAULT_OUT;
use crate::config::RunConfig;

/// Settings of a score run after merging the config file and the flags.
#[derive(Debug, PartialEq)]
pub struct ScoreSettings {
    pub reports: PathBuf,
    pub reference_dir: PathBuf,
    pub loci: Vec<Locus>,
    pub output: String,
    pub output_format: OutputFormat,
    /// Where to write the scored observations, if anywhere.
    pub observations: Option<String>,
    pub threads: Option<usize>,
    pub options: PipelineOptions,
}

///
/// Merge command line flags over the run configuration.
///
pub fn resolve_settings(matches: &ArgMatches, config: RunConfig, show_progress: bool) -> Result<ScoreSettings> {
    let reports = matches
        .get_one::<String>("reports")
        .context("A path to the report records is required.")?;

    let reference_dir = matches
        .get_one::<String>("reference")
        .map(PathBuf::from)
        .or(config.reference_dir)
        .context("No reference directory given: use --reference or set reference_dir in the config")?;

    let loci = match matches.get_many::<String>("locus") {
        Some(values) => values
            .map(|v| Locus::from_str(v))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        None => config.loci.unwrap_or_else(|| Locus::ALL.to_vec()),
    };

    let token_policy = match matches.get_one::<String>("policy") {
        Some(policy) => TokenPolicy::from_str(policy)?,
        None => config.token_policy.unwrap_or_default(),
    };

    let emit_all_drugs = if matches.get_flag("all-drugs") {
        true
    } else if matches.get_flag("no-all-drugs") {
        false
    } else {
        config.emit_all_drugs.unwrap_or(false)
    };

    let output = matches
        .get_one::<String>("output")
        .cloned()
        .unwrap_or_else(|| DEFAULT_OUT.to_string());
    let output_format = match matches.get_one::<String>("format") {
        Some(format) => OutputFormat::from_str(format)?,
        None => config
            .output_format
            .unwrap_or_else(|| OutputFormat::from_path(&output)),
    };
    let observations = matches.get_one::<String>("observations").cloned();

    let threads = matches.get_one::<usize>("threads").copied().or(config.threads);

    Ok(ScoreSettings {
        reports: PathBuf::from(reports),
        reference_dir,
        loci,
        output,
        output_format,
        threads,
        options: PipelineOptions {
            token_policy,
            aggregate: AggregateOptions { emit_all_drugs },
            show_progress,
            keep_observations: observations.is_some(),
        },
        observations,
    })
}

/// Score every requested locus and write one combined table.
pub fn run_score(matches: &ArgMatches, show_progress: bool) -> Result<()> {
    let config = match matches.get_one::<String>("config") {
        Some(path) => RunConfig::try_from(Path::new(path))
            .with_context(|| format!("Failed to load run configuration {}", path))?,
        None => RunConfig::default(),
    };
    let settings = resolve_settings(matches, config, show_progress)?;

    if let Some(threads) = settings.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to set up the worker pool")?;
    }

    let records = read_report_records(&settings.reports)?;

    let mut scores: Vec<DrugScore> = Vec::new();
    let mut observations: Vec<Observation> = Vec::new();
    for locus in &settings.loci {
        let tables = load_reference_tables(&settings.reference_dir, *locus, false)
            .with_context(|| format!("Failed to load reference tables for {}", locus))?;
        let report = score_records(&records, &tables, &settings.options);
        scores.extend(report.scores);
        observations.extend(report.observations);
    }
    sort_scores(&mut scores);

    write_scores_to_path(&settings.output, &scores, settings.output_format)?;
    info!(rows = scores.len(), output = %settings.output, "wrote scores");

    if let Some(path) = &settings.observations {
        sort_observations(&mut observations);
        write_observations_to_path(path, &observations, OutputFormat::from_path(path))?;
        info!(rows = observations.len(), output = %path, "wrote observations");
    }

    Ok(())
}

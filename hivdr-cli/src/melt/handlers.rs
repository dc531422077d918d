use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::ArgMatches;
use tracing::info;

use hivdr_core::models::Locus;
use hivdr_core::utils::get_dynamic_writer;
use hivdr_io::{
    OutputFormat, load_comment_table, read_report_records, write_annotated_observations,
    write_observations,
};
use hivdr_scoring::{TokenPolicy, annotate, melt_records};

pub fn run_melt(matches: &ArgMatches, show_progress: bool) -> Result<()> {
    let reports = matches
        .get_one::<String>("reports")
        .context("A path to the report records is required.")?;
    let locus = matches
        .get_one::<String>("locus")
        .context("A locus is required.")?;
    let locus = Locus::from_str(locus)?;

    let policy = match matches.get_one::<String>("policy") {
        Some(policy) => TokenPolicy::from_str(policy)?,
        None => TokenPolicy::default(),
    };

    let output = matches
        .get_one::<String>("output")
        .map(String::as_str)
        .unwrap_or("-");
    let format = OutputFormat::from_path(output);

    let records = read_report_records(Path::new(reports))?;
    let melted = melt_records(&records, locus, policy, show_progress);

    let writer = get_dynamic_writer(output)?;
    if matches.get_flag("comments") {
        let reference = matches
            .get_one::<String>("reference")
            .context("--comments needs --reference")?;
        let comments = load_comment_table(Path::new(reference), locus)
            .with_context(|| format!("Failed to load comments for {}", locus))?;
        let annotated = annotate(&melted.observations, &comments);
        write_annotated_observations(writer, &annotated, format)?;
    } else {
        write_observations(writer, &melted.observations, format)?;
    }

    info!(
        rows = melted.observations.len(),
        skipped_tokens = melted.skipped_tokens,
        failed_patients = melted.failures.len(),
        output,
        "wrote observations"
    );

    Ok(())
}

mod config;
mod drugs;
mod melt;
mod score;

use anyhow::Result;
use clap::{ArgMatches, Command, arg};
use tracing_subscriber::EnvFilter;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const BIN_NAME: &str = "hivdr";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .about("Longitudinal drug-resistance scoring of genotypic HIV reports.")
        .subcommand_required(true)
        .arg(arg!(-v --verbose "Log debug detail").global(true))
        .arg(arg!(-q --quiet "Only log warnings and hide progress bars").global(true))
        .subcommand(score::cli::create_score_cli())
        .subcommand(melt::cli::create_melt_cli())
        .subcommand(drugs::cli::create_drugs_cli())
}

///
/// Logs go to stderr so tables written to stdout stay clean. `RUST_LOG`
/// wins over the flags.
///
fn init_logging(matches: &ArgMatches) {
    let level = if matches.get_flag("verbose") {
        "debug"
    } else if matches.get_flag("quiet") {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();

    init_logging(&matches);
    let show_progress = !matches.get_flag("quiet");

    match matches.subcommand() {
        //
        // SCORE
        //
        Some((score::cli::SCORE_CMD, matches)) => {
            score::handlers::run_score(matches, show_progress)?;
        }

        //
        // MELT
        //
        Some((melt::cli::MELT_CMD, matches)) => {
            melt::handlers::run_melt(matches, show_progress)?;
        }

        //
        // DRUG CATALOG
        //
        Some((drugs::cli::DRUGS_CMD, matches)) => {
            drugs::handlers::run_drugs(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use hivdr_core::models::Locus;
    use hivdr_io::OutputFormat;
    use hivdr_scoring::TokenPolicy;

    use crate::config::RunConfig;
    use crate::score::handlers::resolve_settings;

    fn score_matches(args: &[&str]) -> ArgMatches {
        let matches = build_parser().get_matches_from(args);
        let (_, sub) = matches.subcommand().unwrap();
        sub.clone()
    }

    #[rstest]
    fn test_parser_is_valid() {
        build_parser().debug_assert();
    }

    #[rstest]
    fn test_flags_override_config() {
        let config = RunConfig::try_from(PathBuf::from("../tests/data/run.toml").as_path()).unwrap();
        let matches = score_matches(&[
            "hivdr", "score", "--reports", "reports.csv", "--locus", "PR", "--policy", "skip",
            "--output", "out.csv",
        ]);
        let settings = resolve_settings(&matches, config, false).unwrap();

        assert_eq!(settings.loci, vec![Locus::Protease]);
        assert_eq!(settings.options.token_policy, TokenPolicy::Skip);
        // not overridden on the command line
        assert!(settings.options.aggregate.emit_all_drugs);
        assert_eq!(settings.threads, Some(2));
        assert_eq!(settings.output_format, OutputFormat::Json);
        assert_eq!(settings.reference_dir, PathBuf::from("../tests/data/reference"));
    }

    #[rstest]
    fn test_flags_switch_off_config_values() {
        let config = RunConfig::try_from(PathBuf::from("../tests/data/run.toml").as_path()).unwrap();
        let matches = score_matches(&[
            "hivdr", "score", "--reports", "reports.csv", "--no-all-drugs", "--format", "csv",
            "--output", "out.json",
        ]);
        let settings = resolve_settings(&matches, config, false).unwrap();

        assert!(!settings.options.aggregate.emit_all_drugs);
        assert_eq!(settings.output_format, OutputFormat::Csv);
    }

    #[rstest]
    fn test_all_drugs_flags_conflict() {
        let result = build_parser().try_get_matches_from([
            "hivdr", "score", "--reports", "r.csv", "--all-drugs", "--no-all-drugs",
        ]);
        assert!(result.is_err());
    }

    #[rstest]
    fn test_observations_path_keeps_observations() {
        let matches = score_matches(&[
            "hivdr", "score", "--reports", "r.csv", "--reference", "ref", "--observations", "obs.csv",
        ]);
        let settings = resolve_settings(&matches, RunConfig::default(), false).unwrap();

        assert_eq!(settings.observations.as_deref(), Some("obs.csv"));
        assert!(settings.options.keep_observations);
    }

    #[rstest]
    fn test_defaults_without_config() {
        let matches = score_matches(&["hivdr", "score", "--reports", "r.csv", "--reference", "ref"]);
        let settings = resolve_settings(&matches, RunConfig::default(), true).unwrap();

        assert_eq!(settings.loci, Locus::ALL.to_vec());
        assert_eq!(settings.output, "-");
        assert_eq!(settings.output_format, OutputFormat::Csv);
        assert_eq!(settings.threads, None);
        assert!(!settings.options.aggregate.emit_all_drugs);
        assert!(settings.options.show_progress);
        assert_eq!(settings.observations, None);
        assert!(!settings.options.keep_observations);
    }

    #[rstest]
    fn test_missing_reference_is_an_error() {
        let matches = score_matches(&["hivdr", "score", "--reports", "r.csv"]);
        assert!(resolve_settings(&matches, RunConfig::default(), false).is_err());
    }
}

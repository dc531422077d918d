use clap::{Arg, ArgAction, Command, arg, value_parser};

pub const SCORE_CMD: &str = "score";
pub const DEFAULT_OUT: &str = "-";

pub fn create_score_cli() -> Command {
    Command::new(SCORE_CMD)
        .about("Score report records against HIVdb-style reference tables.")
        .arg_required_else_help(true)
        .arg(arg!(-r --reports <reports> "CSV of report records; '-' reads stdin").required(true))
        .arg(arg!(--reference <reference> "Directory holding the score and comment tables"))
        .arg(
            Arg::new("locus")
                .long("locus")
                .short('l')
                .help("Locus to score (RT, PR or IN); repeat for several. Defaults to all")
                .action(ArgAction::Append),
        )
        .arg(arg!(-c --config <config> "TOML run configuration"))
        .arg(arg!(-o --output <output> "Output path; '-' for stdout, '.gz' to compress"))
        .arg(arg!(--policy <policy> "What to do with malformed tokens: skip or abort-accession"))
        .arg(
            arg!(--format <format> "Output format, csv or json; overrides the config and the output extension"),
        )
        .arg(
            arg!(--observations <observations> "Also write the scored observations to this path"),
        )
        .arg(
            arg!(--"all-drugs" "Emit a zero-filled row for every drug of the locus tables")
                .conflicts_with("no-all-drugs"),
        )
        .arg(arg!(--"no-all-drugs" "Only emit drugs with a contribution, even if the config says otherwise"))
        .arg(
            arg!(-t --threads <threads> "Size of the worker pool")
                .value_parser(value_parser!(usize)),
        )
}

use clap::{Command, arg};

pub const MELT_CMD: &str = "melt";

pub fn create_melt_cli() -> Command {
    Command::new(MELT_CMD)
        .about("Accumulate mutation histories and write one row per observed amino acid.")
        .arg_required_else_help(true)
        .arg(arg!(-r --reports <reports> "CSV of report records; '-' reads stdin").required(true))
        .arg(arg!(-l --locus <locus> "Locus to melt (RT, PR or IN)").required(true))
        .arg(arg!(--reference <reference> "Directory holding the comment tables"))
        .arg(arg!(--comments "Attach mutation comments; needs --reference").requires("reference"))
        .arg(arg!(--policy <policy> "What to do with malformed tokens: skip or abort-accession"))
        .arg(arg!(-o --output <output> "Output path; '-' for stdout, '.gz' to compress"))
}

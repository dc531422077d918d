use clap::{Command, arg};

pub const DRUGS_CMD: &str = "drugs";

pub fn create_drugs_cli() -> Command {
    Command::new(DRUGS_CMD)
        .about("List the catalogued antiretroviral drugs.")
        .arg(arg!(--class <class> "Only this class: NRTI, NNRTI, INSTI, PI or FUSION"))
}

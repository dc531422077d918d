use std::io::Write;
use std::str::FromStr;

use anyhow::Result;
use clap::ArgMatches;

use hivdr_core::models::{Drug, DrugCatalog, DrugClass};

/// Write the catalog, or one class of it, as tab-separated rows.
pub fn write_drugs<W: Write>(writer: W, class: Option<DrugClass>) -> Result<()> {
    let catalog = DrugCatalog::standard();
    let drugs: Vec<&Drug> = match class {
        Some(class) => catalog.by_class(class).collect(),
        None => catalog.drugs().iter().collect(),
    };

    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    for drug in drugs {
        wtr.serialize(drug)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn run_drugs(matches: &ArgMatches) -> Result<()> {
    let class = matches
        .get_one::<String>("class")
        .map(|c| DrugClass::from_str(c))
        .transpose()?;

    write_drugs(std::io::stdout().lock(), class)
}

use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigurationError;

/// Suffix that marks a ritonavir-boosted column, e.g. `ATV/r`.
pub const BOOSTED_SUFFIX: &str = "/r";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DrugClass {
    Nrti,
    Nnrti,
    Insti,
    Pi,
    Fusion,
}

impl DrugClass {
    pub const ALL: [DrugClass; 5] = [
        DrugClass::Nrti,
        DrugClass::Nnrti,
        DrugClass::Insti,
        DrugClass::Pi,
        DrugClass::Fusion,
    ];

    /// Prefix of this class' reference table file names.
    pub fn file_prefix(&self) -> &'static str {
        match self {
            DrugClass::Nrti => "nrti",
            DrugClass::Nnrti => "nnrti",
            DrugClass::Insti => "insti",
            DrugClass::Pi => "pi",
            DrugClass::Fusion => "fusion",
        }
    }
}

impl Display for DrugClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DrugClass::Nrti => "NRTI",
            DrugClass::Nnrti => "NNRTI",
            DrugClass::Insti => "INSTI",
            DrugClass::Pi => "PI",
            DrugClass::Fusion => "FUSION",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for DrugClass {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DrugClass::ALL
            .into_iter()
            .find(|class| class.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigurationError::UnknownDrugClass(s.to_string()))
    }
}

///
/// An approved antiretroviral.
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Drug {
    pub class: DrugClass,
    pub brand: &'static str,
    pub generic: &'static str,
    pub abbreviation: &'static str,
    /// Free text: a full date, a year-month, a year, or `Unknown`.
    pub approved: &'static str,
}

const fn drug(
    class: DrugClass,
    brand: &'static str,
    generic: &'static str,
    abbreviation: &'static str,
    approved: &'static str,
) -> Drug {
    Drug {
        class,
        brand,
        generic,
        abbreviation,
        approved,
    }
}

// https://hivinfo.nih.gov/understanding-hiv/fact-sheets/fda-approved-hiv-medicines
const STANDARD_DRUGS: &[Drug] = &[
    drug(DrugClass::Nrti, "Ziagen", "Abacavir", "ABC", "1998-12-17"),
    drug(DrugClass::Nrti, "Emtriva", "Emtricitabine", "FTC", "2003-07-02"),
    drug(DrugClass::Nrti, "Epivir", "Lamivudine", "3TC", "1995-11-17"),
    drug(DrugClass::Nrti, "Viread", "Tenofovir", "TFV", "2001-10-26"),
    drug(DrugClass::Nrti, "Vemlidy", "Tenofovir", "TAF", "2015-11-05"),
    drug(DrugClass::Nrti, "Retrovir", "Zidovudine", "ZDV", "1987-03-19"),
    drug(DrugClass::Nrti, "Videx", "Didanosine", "ddI", "1991-10"),
    drug(DrugClass::Nrti, "Hivid", "Zalcitabine", "ddC", "1992-06"),
    drug(DrugClass::Nrti, "Zerit", "Stavudine", "d4T", "1994"),
    drug(DrugClass::Nnrti, "Pifeltro", "Doravirine", "DOR", "2018-08-30"),
    drug(DrugClass::Nnrti, "Sustiva", "Efavirenz", "EFV", "1998-09-17"),
    drug(DrugClass::Nnrti, "Intelence", "Etravirine", "ETR", "2008-01-18"),
    drug(DrugClass::Nnrti, "Viramune", "Nevirapine", "NVP", "1996-06-21"),
    drug(DrugClass::Nnrti, "Edurant", "Rilpivirine", "RPV", "2011-05-20"),
    drug(DrugClass::Nnrti, "Rescriptor", "Delavirdine", "DLV", "Unknown"),
    drug(DrugClass::Insti, "Bictegravir", "Bictegravir", "BIC", "2018-02-07"),
    drug(DrugClass::Insti, "Vitekta", "Elvitegravir", "EVG", "2012-08-27"),
    drug(DrugClass::Insti, "Vocabria", "Cabotegravir", "CAB", "2021-01-22"),
    drug(DrugClass::Insti, "Isentress", "Raltegravir", "RAL", "2007-10-12"),
    drug(DrugClass::Insti, "Tivicay", "Dolutegravir", "DTG", "2013-08-13"),
    drug(DrugClass::Pi, "Reyataz", "Atazanavir", "ATV", "2003-06-20"),
    drug(DrugClass::Pi, "Prezista", "Darunavir", "DRV", "2006-06-23"),
    drug(DrugClass::Pi, "Lexiva", "Fosamprenavir", "AMP", "2003-10-20"),
    drug(DrugClass::Pi, "Agenerase", "Amprenavir", "AMP", "1999-04-15"),
    drug(DrugClass::Pi, "Crixivan", "Indinavir", "IDV", "Unknown"),
    drug(DrugClass::Pi, "Kaletra", "Lopinavir", "LPV", "Unknown"),
    drug(DrugClass::Pi, "Viracept", "Nelfinavir", "NFV", "Unknown"),
    drug(DrugClass::Pi, "Fortovase", "Saquinavir", "SQV", "Unknown"),
    drug(DrugClass::Pi, "Invirase", "Saquinavir", "SQV", "Unknown"),
    drug(DrugClass::Pi, "Norvir", "Ritonavir", "RTV", "1996-03-01"),
    drug(DrugClass::Pi, "Aptivus", "Tipranavir", "TPV", "2005-06-22"),
    drug(DrugClass::Fusion, "Fuzeon", "Enfuvirtide", "ENF", "2003-03-13"),
];

/// Score tables use HIVdb spellings for a few abbreviations.
const ABBREVIATION_ALIASES: &[(&str, &str)] = &[
    ("AZT", "ZDV"),
    ("TDF", "TFV"),
    ("D4T", "d4T"),
    ("DDI", "ddI"),
    ("DDC", "ddC"),
    ("FPV", "AMP"),
];

static STANDARD_CATALOG: LazyLock<DrugCatalog> = LazyLock::new(|| DrugCatalog {
    drugs: STANDARD_DRUGS.to_vec(),
});

///
/// Immutable drug catalog: brand, generic, abbreviation and approval date
/// per drug class.
///
#[derive(Debug, Clone)]
pub struct DrugCatalog {
    drugs: Vec<Drug>,
}

impl DrugCatalog {
    /// The catalog compiled into the binary, built once per process.
    pub fn standard() -> &'static DrugCatalog {
        &STANDARD_CATALOG
    }

    pub fn drugs(&self) -> &[Drug] {
        &self.drugs
    }

    pub fn by_class(&self, class: DrugClass) -> impl Iterator<Item = &Drug> {
        self.drugs.iter().filter(move |d| d.class == class)
    }

    ///
    /// Look up a drug by the column name a score table uses for it.
    ///
    /// Case-insensitive; boosted columns (`LPV/r`) resolve to the unboosted
    /// entry and HIVdb aliases (`AZT`, `TDF`, ...) to the catalog spelling.
    /// Several brands can share one abbreviation; the first listed wins.
    ///
    pub fn lookup(&self, column: &str) -> Option<&Drug> {
        let column = column.trim();
        let column = column
            .strip_suffix(BOOSTED_SUFFIX)
            .or_else(|| column.strip_suffix('r').filter(|c| is_abbreviation(c)))
            .unwrap_or(column);

        let canonical = ABBREVIATION_ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(column))
            .map(|(_, canonical)| *canonical)
            .unwrap_or(column);

        self.drugs
            .iter()
            .find(|d| d.abbreviation.eq_ignore_ascii_case(canonical))
    }

    pub fn class_of(&self, column: &str) -> Option<DrugClass> {
        self.lookup(column).map(|d| d.class)
    }
}

fn is_abbreviation(s: &str) -> bool {
    s.len() == 3 && s.chars().all(|c| c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case("3TC", DrugClass::Nrti)]
    #[case("AZT", DrugClass::Nrti)]
    #[case("efv", DrugClass::Nnrti)]
    #[case("DTG", DrugClass::Insti)]
    #[case("LPV/r", DrugClass::Pi)]
    #[case("ATVr", DrugClass::Pi)]
    fn test_class_of(#[case] column: &str, #[case] expected: DrugClass) {
        assert_eq!(DrugCatalog::standard().class_of(column), Some(expected));
    }

    #[rstest]
    fn test_unknown_column() {
        assert_eq!(DrugCatalog::standard().lookup("XYZ"), None);
    }

    #[rstest]
    fn test_shared_abbreviation_resolves_to_first_entry() {
        let drug = DrugCatalog::standard().lookup("AMP").unwrap();
        assert_eq!(drug.brand, "Lexiva");
    }

    #[rstest]
    fn test_by_class() {
        let insti: Vec<&str> = DrugCatalog::standard()
            .by_class(DrugClass::Insti)
            .map(|d| d.abbreviation)
            .collect();
        assert_eq!(insti, vec!["BIC", "EVG", "CAB", "RAL", "DTG"]);
    }

    #[rstest]
    fn test_drug_class_from_str() {
        assert_eq!("nnrti".parse::<DrugClass>().unwrap(), DrugClass::Nnrti);
        assert!("foo".parse::<DrugClass>().is_err());
    }
}

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigurationError;
use crate::models::drug::DrugClass;

///
/// Genomic region a genotypic test reports mutations for.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Locus {
    #[serde(rename = "RT")]
    ReverseTranscriptase,
    #[serde(rename = "PR", alias = "PI")]
    Protease,
    #[serde(rename = "IN", alias = "INSTI")]
    Integrase,
}

impl Locus {
    pub const ALL: [Locus; 3] = [
        Locus::ReverseTranscriptase,
        Locus::Protease,
        Locus::Integrase,
    ];

    /// Short code used in report text and file names.
    pub fn code(&self) -> &'static str {
        match self {
            Locus::ReverseTranscriptase => "RT",
            Locus::Protease => "PR",
            Locus::Integrase => "IN",
        }
    }

    ///
    /// Drug classes whose score tables are keyed by positions in this locus.
    ///
    /// Reverse transcriptase carries two classes; their tables are merged
    /// into a single wide table when loaded.
    ///
    pub fn drug_classes(&self) -> &'static [DrugClass] {
        match self {
            Locus::ReverseTranscriptase => &[DrugClass::Nrti, DrugClass::Nnrti],
            Locus::Protease => &[DrugClass::Pi],
            Locus::Integrase => &[DrugClass::Insti],
        }
    }
}

impl Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Locus {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "RT" => Ok(Locus::ReverseTranscriptase),
            "PR" | "PI" => Ok(Locus::Protease),
            "IN" | "INSTI" => Ok(Locus::Integrase),
            _ => Err(ConfigurationError::UnknownLocus(s.to_string())),
        }
    }
}

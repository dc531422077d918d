use std::fmt::{self, Display};

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use crate::models::{DrugClass, Locus};

///
/// Ordinal resistance level derived from a total penalty score.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResistanceCategory {
    Susceptible,
    PotentialLowLevel,
    Low,
    Intermediate,
    High,
}

impl ResistanceCategory {
    ///
    /// Map a total score to its category.
    ///
    /// | score  | category                        |
    /// |--------|---------------------------------|
    /// | < 10   | Susceptible                     |
    /// | 10-14  | Potential low-level resistance  |
    /// | 15-29  | Low                             |
    /// | 30-59  | Intermediate                    |
    /// | >= 60  | High                            |
    ///
    /// Negative totals are possible with HIVdb penalties and are susceptible.
    ///
    pub fn from_score(score: i32) -> Self {
        match score {
            i32::MIN..=9 => ResistanceCategory::Susceptible,
            10..=14 => ResistanceCategory::PotentialLowLevel,
            15..=29 => ResistanceCategory::Low,
            30..=59 => ResistanceCategory::Intermediate,
            _ => ResistanceCategory::High,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResistanceCategory::Susceptible => "Susceptible",
            ResistanceCategory::PotentialLowLevel => "Potential low-level resistance",
            ResistanceCategory::Low => "Low",
            ResistanceCategory::Intermediate => "Intermediate",
            ResistanceCategory::High => "High",
        }
    }
}

impl Display for ResistanceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl Serialize for ResistanceCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

///
/// Final score of one drug for one test accession.
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrugScore {
    pub accession: String,
    pub patient_id: String,
    pub collected_date: NaiveDate,
    pub locus: Locus,
    pub drug: String,
    pub drug_class: Option<DrugClass>,
    pub simple_score: i32,
    pub complex_penalty: i32,
    pub total_score: i32,
    pub resistance_category: ResistanceCategory,
}

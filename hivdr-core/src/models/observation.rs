use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{Locus, Residue};

///
/// One atomic (accession, position, unit) observation.
///
/// A raw token yields one observation per mixture component, or a single
/// observation for an insertion or deletion.
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Observation {
    pub accession: String,
    pub patient_id: String,
    pub collected_date: NaiveDate,
    pub locus: Locus,
    /// Index of the raw token within the accession's cumulative list.
    pub line: usize,
    pub token: String,
    /// Missing only for bare deletions with no preceding token.
    pub position: Option<u32>,
    pub residue: Residue,
    pub mixture_size: usize,
    pub mixture_index: usize,
}

impl Observation {
    /// Key used by the simple score table.
    pub fn score_key(&self) -> Option<(u32, Residue)> {
        self.position.map(|position| (position, self.residue))
    }
}

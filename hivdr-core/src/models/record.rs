use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::Locus;

/// Literal used by reports to say a locus carried no mutations.
pub const NO_MUTATIONS_SENTINEL: &str = "None";

/// Width that numeric patient identifiers are zero-padded to.
pub const PATIENT_ID_WIDTH: usize = 7;
/// Identifiers longer than this are outdated and not usable.
pub const PATIENT_ID_MAX_WIDTH: usize = 8;

///
/// One parsed genotypic report (one test accession).
///
/// Produced by the report extractor and never modified afterwards.
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub accession: String,
    pub patient_id: Option<String>,
    pub collected_date: NaiveDate,
    /// Raw comma-separated mutation list per locus, exactly as extracted.
    pub mutation_lists: BTreeMap<Locus, String>,
    pub report_complete: bool,
}

impl ReportRecord {
    ///
    /// The usable mutation list for a locus.
    ///
    /// Returns `None` when the locus is absent, blank, or the report
    /// explicitly said `None`.
    ///
    pub fn mutation_list(&self, locus: Locus) -> Option<&str> {
        self.mutation_lists
            .get(&locus)
            .map(|list| list.trim())
            .filter(|list| !list.is_empty() && *list != NO_MUTATIONS_SENTINEL)
    }
}

///
/// Normalise a raw patient identifier to its fixed-width numeric form.
///
/// - shorter than 7 characters: left-padded with zeros to 7
/// - exactly 8 characters with a leading zero: the zero is dropped
/// - longer than 8 characters: the identifier is outdated, `None`
///
pub fn normalize_patient_id(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let len = raw.chars().count();
    if len > PATIENT_ID_MAX_WIDTH {
        return None;
    }
    if len == PATIENT_ID_MAX_WIDTH {
        if let Some(stripped) = raw.strip_prefix('0') {
            return Some(stripped.to_string());
        }
        return Some(raw.to_string());
    }

    Some(format!("{:0>width$}", raw, width = PATIENT_ID_WIDTH))
}

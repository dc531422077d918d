//! Longitudinal accumulation of mutation lists within one patient.
//!
//! Mutations are never considered lost between tests: a mutation seen at
//! an earlier collection date that is not reported later is assumed to be
//! suppressed rather than gone. The cumulative list of test *k* is
//! therefore the union of every list up to and including *k*.

use std::collections::HashSet;

use chrono::NaiveDate;

use hivdr_core::errors::HistoryError;
use hivdr_core::models::mutation::DELETION_MARKER;
use hivdr_core::models::{Locus, ReportRecord, parse_token};

use crate::consts::TOKEN_SEPARATOR;

///
/// One test of a patient together with its mutation list for a locus.
///
/// Before accumulation the list is the raw list of that test; after
/// accumulation it is the cumulative list up to that test.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub accession: String,
    pub patient_id: String,
    pub collected_date: NaiveDate,
    pub mutation_list: String,
}

impl HistoryEntry {
    ///
    /// Build an entry from a report record.
    ///
    /// Returns `None` when the record has no patient id or no usable list
    /// for the locus. Completeness is not checked here.
    ///
    pub fn from_record(record: &ReportRecord, locus: Locus) -> Option<Self> {
        let patient_id = record.patient_id.as_ref()?;
        let list = record.mutation_list(locus)?;
        Some(HistoryEntry {
            accession: record.accession.clone(),
            patient_id: patient_id.clone(),
            collected_date: record.collected_date,
            mutation_list: list.to_string(),
        })
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        split_mutation_list(&self.mutation_list)
    }
}

/// All tests of one patient, ordered by collection date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientHistory {
    pub patient_id: String,
    pub entries: Vec<HistoryEntry>,
}

impl PatientHistory {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split a comma-separated mutation list into trimmed, non-empty tokens.
pub fn split_mutation_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(TOKEN_SEPARATOR)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

///
/// Give each bare deletion (`E/^`) the position of the nearest positioned
/// token before it in the same raw list: `K70R,E/^` becomes `K70R,E70/^`.
///
/// Must run on the list of a single test, before lists are merged or
/// sorted. A bare deletion with nothing positioned before it is kept as is.
/// Tokens that fail to parse are kept and left for the melter to report.
///
pub fn anchor_bare_deletions(list: &str) -> String {
    let mut previous: Option<u32> = None;
    let mut tokens: Vec<String> = Vec::new();

    for token in split_mutation_list(list) {
        let parsed = match parse_token(token) {
            Ok(parsed) => parsed,
            Err(_) => {
                tokens.push(token.to_string());
                continue;
            }
        };
        match (parsed.is_bare_deletion(), previous, token.strip_suffix(DELETION_MARKER)) {
            (true, Some(position), Some(stem)) => {
                // the stem starts with its ASCII wild-type letter
                let (reference, rest) = stem.split_at(1);
                tokens.push(format!("{}{}{}{}", reference, position, rest, DELETION_MARKER));
            }
            _ => {
                if let Some(position) = parsed.position() {
                    previous = Some(position);
                }
                tokens.push(token.to_string());
            }
        }
    }

    join_tokens(tokens.iter().map(String::as_str))
}

fn join_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> String {
    tokens
        .into_iter()
        .collect::<Vec<&str>>()
        .join(&TOKEN_SEPARATOR.to_string())
}

///
/// Accumulate the mutation lists of one patient over time.
///
/// - A patient with a single test keeps its list, with tokens sorted
///   lexicographically so that equal lists compare equal.
/// - With several tests, entries are ordered by collection date (ties keep
///   input order) and each list becomes the union of all lists so far,
///   in first-seen order, with exact duplicates removed.
///
/// # Arguments
/// - patient_id: the patient every entry must belong to
/// - tests: raw per-test entries in their original record order
///
pub fn accumulate_history(
    patient_id: &str,
    tests: &[HistoryEntry],
) -> Result<PatientHistory, HistoryError> {
    if let Some(other) = tests.iter().find(|t| t.patient_id != patient_id) {
        return Err(HistoryError::MixedPatients(
            patient_id.to_string(),
            other.patient_id.clone(),
        ));
    }

    let anchored: Vec<HistoryEntry> = tests
        .iter()
        .map(|t| HistoryEntry {
            mutation_list: anchor_bare_deletions(&t.mutation_list),
            ..t.clone()
        })
        .collect();
    let tests = collapse_duplicate_accessions(patient_id, &anchored)?;

    if tests.len() == 1 {
        let mut entry = tests[0].clone();
        let mut tokens: Vec<&str> = tests[0].tokens().collect();
        tokens.sort_unstable();
        entry.mutation_list = join_tokens(tokens);
        return Ok(PatientHistory {
            patient_id: patient_id.to_string(),
            entries: vec![entry],
        });
    }

    let mut ordered = tests;
    // sort_by_key is stable, so same-day tests keep their record order
    ordered.sort_by_key(|t| t.collected_date);

    let mut seen: HashSet<String> = HashSet::new();
    let mut cumulative: Vec<String> = Vec::new();
    let mut entries = Vec::with_capacity(ordered.len());

    for test in ordered {
        for token in test.tokens() {
            if seen.insert(token.to_string()) {
                cumulative.push(token.to_string());
            }
        }
        entries.push(HistoryEntry {
            mutation_list: join_tokens(cumulative.iter().map(String::as_str)),
            ..test
        });
    }

    Ok(PatientHistory {
        patient_id: patient_id.to_string(),
        entries,
    })
}

/// Identical repeats of an accession collapse; differing repeats are an error.
fn collapse_duplicate_accessions(
    patient_id: &str,
    tests: &[HistoryEntry],
) -> Result<Vec<HistoryEntry>, HistoryError> {
    let mut kept: Vec<HistoryEntry> = Vec::with_capacity(tests.len());
    for test in tests {
        match kept.iter().find(|k| k.accession == test.accession) {
            Some(existing) if existing.mutation_list != test.mutation_list => {
                return Err(HistoryError::DuplicateAccession {
                    patient_id: patient_id.to_string(),
                    accession: test.accession.clone(),
                });
            }
            Some(_) => {}
            None => kept.push(test.clone()),
        }
    }
    Ok(kept)
}

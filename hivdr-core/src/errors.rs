use thiserror::Error;

use crate::models::Locus;

/// Failure to decompose a single mutation token.
///
/// Raised per token; the caller decides whether to skip the token or
/// abandon the whole accession.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty mutation token")]
    EmptyToken,

    #[error("Mutation token does not start with a wild-type residue letter: {0}")]
    MissingReferenceResidue(String),

    #[error("No position found after the wild-type residue: {0}")]
    MissingPosition(String),

    #[error("Position is out of range: {0}")]
    InvalidPosition(String),

    #[error("No amino acid follows the position: {0}")]
    MissingAminoAcid(String),

    #[error("Mixture has an empty component: {0}")]
    MalformedMixture(String),

    #[error("Invalid residue character '{residue}' in mutation token: {token}")]
    InvalidResidue { token: String, residue: char },
}

/// Problems with the reference tables. These are fatal for a run.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("No {tier} table for locus {locus} (expected a file matching '{pattern}')")]
    MissingTable {
        locus: Locus,
        tier: String,
        pattern: String,
    },

    #[error("Reference directory does not exist: {0}")]
    MissingReferenceDirectory(String),

    #[error("Unknown locus: {0}")]
    UnknownLocus(String),

    #[error("Unknown drug class: {0}")]
    UnknownDrugClass(String),

    #[error("Unknown rule tier: {0}")]
    UnknownTier(String),

    #[error("Table {0} has no rule column")]
    MissingRuleColumn(String),

    #[error("Malformed simple rule: {0}")]
    MalformedSimpleRule(String),

    #[error("Malformed complex rule '{rule}': {reason}")]
    MalformedComplexRule { rule: String, reason: String },

    #[error("Invalid penalty '{value}' for drug {drug} in rule {rule}")]
    InvalidPenalty {
        rule: String,
        drug: String,
        value: String,
    },

    #[error("Conflicting penalties for {drug} at rule {rule}: {first} vs {second}")]
    ConflictingPenalty {
        rule: String,
        drug: String,
        first: i32,
        second: i32,
    },

    #[error("Reference table is empty: {0}")]
    EmptyTable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to read table {path}: {message}")]
    TableRead { path: String, message: String },
}

/// Per-patient failure while building the mutation history.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("Accession {accession} appears more than once for patient {patient_id} with different mutation lists")]
    DuplicateAccession {
        patient_id: String,
        accession: String,
    },

    #[error("Records of more than one patient passed to a single history: {0} and {1}")]
    MixedPatients(String, String),
}

/// Problems converting raw report rows into [crate::models::ReportRecord]s.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Invalid collection date '{value}' for accession {accession}")]
    InvalidDate { accession: String, value: String },

    #[error("Invalid completeness flag '{value}' for accession {accession}")]
    InvalidCompleteness { accession: String, value: String },

    #[error("Record is missing an accession")]
    MissingAccession,
}

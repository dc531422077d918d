use serde::Serialize;

use fxhash::FxHashMap;

use hivdr_core::errors::ConfigurationError;
use hivdr_core::models::{Observation, Residue};

use crate::consts::DEFAULT_COMMENT_TYPE;
use crate::simple::parse_rule_key;

/// One catalogued comment for a (position, unit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentRow {
    pub position: u32,
    pub residue: Residue,
    pub mutation_type: String,
    pub comment: String,
}

///
/// Free-text mutation comments of one locus, indexed by (position, unit).
///
#[derive(Debug, Clone, Default)]
pub struct CommentTable {
    rows: Vec<CommentRow>,
    index: FxHashMap<(u32, Residue), Vec<usize>>,
}

impl CommentTable {
    pub fn new() -> Self {
        Self::default()
    }

    ///
    /// Add a comment for a mutation label such as `M184V`, `Y181CIV` or
    /// `T69ins`. Multi-letter labels give one row per letter and a blank
    /// type becomes `Predicted`.
    ///
    pub fn add(
        &mut self,
        mutation: &str,
        mutation_type: Option<&str>,
        comment: &str,
    ) -> Result<(), ConfigurationError> {
        let (position, residues) = parse_rule_key(mutation)?;
        let mutation_type = mutation_type
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_COMMENT_TYPE);

        for residue in residues {
            self.index
                .entry((position, residue))
                .or_default()
                .push(self.rows.len());
            self.rows.push(CommentRow {
                position,
                residue,
                mutation_type: mutation_type.to_string(),
                comment: comment.trim().to_string(),
            });
        }
        Ok(())
    }

    pub fn merge(mut self, other: CommentTable) -> Self {
        for row in other.rows {
            self.index
                .entry((row.position, row.residue))
                .or_default()
                .push(self.rows.len());
            self.rows.push(row);
        }
        self
    }

    pub fn lookup(&self, position: u32, residue: Residue) -> impl Iterator<Item = &CommentRow> {
        self.index
            .get(&(position, residue))
            .into_iter()
            .flatten()
            .map(|&i| &self.rows[i])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// An observation with the comment that matched it, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedObservation {
    pub observation: Observation,
    pub mutation_type: Option<String>,
    pub comment: Option<String>,
}

///
/// Left-join observations onto the comment table on (position, unit).
///
/// An observation matching several comments appears once per comment;
/// one matching none appears once with empty comment fields.
///
pub fn annotate(observations: &[Observation], table: &CommentTable) -> Vec<AnnotatedObservation> {
    let mut annotated = Vec::with_capacity(observations.len());
    for observation in observations {
        let matches: Vec<&CommentRow> = observation
            .score_key()
            .map(|(position, residue)| table.lookup(position, residue).collect())
            .unwrap_or_default();

        if matches.is_empty() {
            annotated.push(AnnotatedObservation {
                observation: observation.clone(),
                mutation_type: None,
                comment: None,
            });
            continue;
        }

        for row in matches {
            annotated.push(AnnotatedObservation {
                observation: observation.clone(),
                mutation_type: Some(row.mutation_type.clone()),
                comment: Some(row.comment.clone()),
            });
        }
    }
    annotated
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rstest::*;

    use hivdr_core::models::Locus;

    fn observation(position: Option<u32>, residue: Residue) -> Observation {
        Observation {
            accession: "11-040404".to_string(),
            patient_id: "0012345".to_string(),
            collected_date: NaiveDate::from_ymd_opt(2011, 4, 4).unwrap(),
            locus: Locus::ReverseTranscriptase,
            line: 0,
            token: "K103N".to_string(),
            position,
            residue,
            mixture_size: 1,
            mixture_index: 0,
        }
    }

    #[fixture]
    fn comments() -> CommentTable {
        let mut table = CommentTable::new();
        table
            .add("K103NS", Some("Major"), "K103N causes high-level resistance to NVP and EFV.")
            .unwrap();
        table.add("T69ins", None, "Insertions at codon 69 reduce NRTI susceptibility.").unwrap();
        table
    }

    #[rstest]
    fn test_letters_are_replicated(comments: CommentTable) {
        assert_eq!(comments.len(), 3);
        assert_eq!(comments.lookup(103, Residue::AminoAcid('S')).count(), 1);
    }

    #[rstest]
    fn test_blank_type_defaults_to_predicted(comments: CommentTable) {
        let row = comments.lookup(69, Residue::Insertion).next().unwrap();
        assert_eq!(row.mutation_type, "Predicted");
    }

    #[rstest]
    fn test_annotate_left_join(comments: CommentTable) {
        let observations = vec![
            observation(Some(103), Residue::AminoAcid('N')),
            observation(Some(184), Residue::AminoAcid('V')),
            observation(None, Residue::Deletion),
        ];
        let annotated = annotate(&observations, &comments);

        assert_eq!(annotated.len(), 3);
        assert_eq!(annotated[0].mutation_type.as_deref(), Some("Major"));
        assert_eq!(annotated[1].comment, None);
        assert_eq!(annotated[2].comment, None);
    }

    #[rstest]
    fn test_single_letter_i_and_d_are_amino_acids() {
        let mut table = CommentTable::new();
        table.add("E40D", Some("Accessory"), "").unwrap();
        table.add("M184I", Some("Major"), "").unwrap();

        assert_eq!(table.lookup(40, Residue::AminoAcid('D')).count(), 1);
        assert_eq!(table.lookup(184, Residue::AminoAcid('I')).count(), 1);
        assert_eq!(table.lookup(40, Residue::Deletion).count(), 0);
        assert_eq!(table.lookup(184, Residue::Insertion).count(), 0);
    }

    #[rstest]
    fn test_merge_keeps_both_tables(comments: CommentTable) {
        let mut nnrti = CommentTable::new();
        nnrti.add("K103N", Some("Accessory"), "Second opinion.").unwrap();

        let merged = comments.merge(nnrti);
        assert_eq!(merged.len(), 4);
        let types: Vec<&str> = merged
            .lookup(103, Residue::AminoAcid('N'))
            .map(|r| r.mutation_type.as_str())
            .collect();
        assert_eq!(types, vec!["Major", "Accessory"]);
    }

    #[rstest]
    fn test_malformed_mutation_is_rejected() {
        let mut table = CommentTable::new();
        assert!(table.add("not a mutation", None, "").is_err());
    }
}

use std::collections::BTreeMap;
use std::sync::LazyLock;

use fxhash::FxHashMap;
use regex::Regex;

use hivdr_core::errors::ConfigurationError;
use hivdr_core::models::{Observation, Residue};

use crate::table::{RuleRow, merge_drug_columns, merge_penalties};

static SIMPLE_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z])?(\d+)(\S+)$").expect("simple rule pattern is valid"));

///
/// One (position, unit) key of the simple score table and its penalty per
/// drug. Drugs without a value are absent from the map.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleScoreRow {
    pub position: u32,
    pub residue: Residue,
    pub penalties: BTreeMap<String, i32>,
}

///
/// Wide table of single-position penalties, indexed by (position, unit).
///
#[derive(Debug, Clone, Default)]
pub struct SimpleScoreTable {
    drugs: Vec<String>,
    rows: Vec<SimpleScoreRow>,
    index: FxHashMap<(u32, Residue), usize>,
}

impl SimpleScoreTable {
    ///
    /// Build a table from the rows of one score file.
    ///
    /// # Arguments
    /// - drugs: the drug columns of the file, in file order
    /// - rows: one entry per rule, e.g. `M184V` or `T69ins`
    ///
    pub fn from_rows(drugs: Vec<String>, rows: &[RuleRow]) -> Result<Self, ConfigurationError> {
        let mut table = SimpleScoreTable {
            drugs,
            ..Default::default()
        };
        for row in rows {
            table.add_rule(row)?;
        }
        Ok(table)
    }

    ///
    /// Add one rule. Rules listing several amino acids (`Y181FSG`) are
    /// replicated into one key per amino acid. A key that already exists
    /// gains the new drug columns.
    ///
    pub fn add_rule(&mut self, row: &RuleRow) -> Result<(), ConfigurationError> {
        let (position, residues) = parse_rule_key(&row.rule)?;
        for residue in residues {
            match self.index.get(&(position, residue)) {
                Some(&i) => merge_penalties(&row.rule, &mut self.rows[i].penalties, &row.penalties)?,
                None => {
                    self.index.insert((position, residue), self.rows.len());
                    self.rows.push(SimpleScoreRow {
                        position,
                        residue,
                        penalties: row.penalties.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Combine two tables of the same locus, e.g. NRTI and NNRTI.
    pub fn merge(mut self, other: SimpleScoreTable) -> Result<Self, ConfigurationError> {
        self.drugs = merge_drug_columns(&self.drugs, &other.drugs);
        for row in other.rows {
            match self.index.get(&(row.position, row.residue)) {
                Some(&i) => {
                    let rule = format!("{}{}", row.position, row.residue);
                    merge_penalties(&rule, &mut self.rows[i].penalties, &row.penalties)?
                }
                None => {
                    self.index.insert((row.position, row.residue), self.rows.len());
                    self.rows.push(row);
                }
            }
        }
        Ok(self)
    }

    pub fn lookup(&self, position: u32, residue: Residue) -> Option<&SimpleScoreRow> {
        self.index.get(&(position, residue)).map(|&i| &self.rows[i])
    }

    pub fn drugs(&self) -> &[String] {
        &self.drugs
    }

    pub fn rows(&self) -> &[SimpleScoreRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

///
/// Reduce a simple rule label to its position and units.
///
/// `M184V` gives `(184, [V])`, `Y181FSG` gives `(181, [F, S, G])`;
/// insertion and deletion rules (`T69ins`, `T69Insertion`, `T69i`,
/// `T69#`, `T69_`, `T69del`, `T69Deletion`, `T69d`, `T69~`, `T69-`) give
/// the sentinel. The one-letter codes `i` and `d` are lowercase only, so
/// `M184I` and `E40D` stay amino acids.
///
pub fn parse_rule_key(rule: &str) -> Result<(u32, Vec<Residue>), ConfigurationError> {
    let rule = rule.trim();
    let malformed = || ConfigurationError::MalformedSimpleRule(rule.to_string());

    let caps = SIMPLE_RULE.captures(rule).ok_or_else(malformed)?;
    let position: u32 = caps[2].parse().map_err(|_| malformed())?;
    if position == 0 {
        return Err(malformed());
    }

    let segment = &caps[3];
    let residues = match segment.to_lowercase().as_str() {
        "ins" | "insertion" => vec![Residue::Insertion],
        "del" | "deletion" => vec![Residue::Deletion],
        // one-letter codes are lowercase only: `M184I` is isoleucine
        _ => match segment {
            "i" | "#" | "_" => vec![Residue::Insertion],
            "d" | "~" | "-" => vec![Residue::Deletion],
            _ if segment.chars().all(|c| c.is_ascii_uppercase()) => {
                segment.chars().map(Residue::AminoAcid).collect()
            }
            _ => return Err(malformed()),
        },
    };

    Ok((position, residues))
}

///
/// An observation with the penalties of its matching simple row.
///
/// Unmatched observations carry an empty map and contribute nothing.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredObservation {
    pub observation: Observation,
    pub penalties: BTreeMap<String, i32>,
}

impl ScoredObservation {
    pub fn is_matched(&self) -> bool {
        !self.penalties.is_empty()
    }
}

///
/// Left-join observations onto the simple score table on (position, unit).
///
/// Insertions and deletions match the `ins`/`del` rows of their position.
///
pub fn join_simple_scores(
    observations: Vec<Observation>,
    table: &SimpleScoreTable,
) -> Vec<ScoredObservation> {
    observations
        .into_iter()
        .map(|observation| {
            let penalties = observation
                .score_key()
                .and_then(|(position, residue)| table.lookup(position, residue))
                .map(|row| row.penalties.clone())
                .unwrap_or_default();
            ScoredObservation {
                observation,
                penalties,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rstest::*;

    use hivdr_core::models::Locus;

    fn observation(accession: &str, position: Option<u32>, residue: Residue) -> Observation {
        Observation {
            accession: accession.to_string(),
            patient_id: "0009415".to_string(),
            collected_date: NaiveDate::from_ymd_opt(2013, 6, 28).unwrap(),
            locus: Locus::ReverseTranscriptase,
            line: 0,
            token: "test".to_string(),
            position,
            residue,
            mixture_size: 1,
            mixture_index: 0,
        }
    }

    #[fixture]
    fn nrti_table() -> SimpleScoreTable {
        SimpleScoreTable::from_rows(
            vec!["ABC".to_string(), "3TC".to_string()],
            &[
                RuleRow::new("M184V", &[("3TC", 10), ("ABC", 15)]),
                RuleRow::new("K65R", &[("ABC", 45)]),
                RuleRow::new("T69ins", &[("ABC", 30), ("3TC", 30)]),
            ],
        )
        .unwrap()
    }

    #[rstest]
    #[case("M184V", 184, vec![Residue::AminoAcid('V')])]
    #[case("Y181FSG", 181, vec![Residue::AminoAcid('F'), Residue::AminoAcid('S'), Residue::AminoAcid('G')])]
    #[case("T69ins", 69, vec![Residue::Insertion])]
    #[case("T69Insertion", 69, vec![Residue::Insertion])]
    #[case("T69del", 69, vec![Residue::Deletion])]
    #[case("69d", 69, vec![Residue::Deletion])]
    #[case("T69i", 69, vec![Residue::Insertion])]
    #[case("T69INS", 69, vec![Residue::Insertion])]
    #[case("M184I", 184, vec![Residue::AminoAcid('I')])]
    #[case("E40D", 40, vec![Residue::AminoAcid('D')])]
    #[case("L74I", 74, vec![Residue::AminoAcid('I')])]
    fn test_parse_rule_key(#[case] rule: &str, #[case] position: u32, #[case] residues: Vec<Residue>) {
        assert_eq!(parse_rule_key(rule).unwrap(), (position, residues));
    }

    #[rstest]
    #[case("M184")]
    #[case("184")]
    #[case("G118R + E138K")]
    #[case("M184v")]
    fn test_malformed_rule_key(#[case] rule: &str) {
        assert!(matches!(
            parse_rule_key(rule),
            Err(ConfigurationError::MalformedSimpleRule(_))
        ));
    }

    #[rstest]
    fn test_join_matches_position_and_unit(nrti_table: SimpleScoreTable) {
        let scored = join_simple_scores(
            vec![observation("13-134628", Some(184), Residue::AminoAcid('V'))],
            &nrti_table,
        );
        assert_eq!(scored[0].penalties.get("3TC"), Some(&10));
        assert_eq!(scored[0].penalties.get("ABC"), Some(&15));
    }

    #[rstest]
    fn test_unmatched_observation_has_no_penalties(nrti_table: SimpleScoreTable) {
        let scored = join_simple_scores(
            vec![
                observation("13-134628", Some(184), Residue::AminoAcid('M')),
                observation("13-134628", None, Residue::Deletion),
            ],
            &nrti_table,
        );
        assert!(scored.iter().all(|s| !s.is_matched()));
    }

    #[rstest]
    fn test_isoleucine_rule_is_not_an_insertion() {
        let table = SimpleScoreTable::from_rows(
            vec!["3TC".to_string()],
            &[RuleRow::new("M184I", &[("3TC", 60)])],
        )
        .unwrap();

        assert_eq!(
            table.lookup(184, Residue::AminoAcid('I')).map(|r| r.penalties.get("3TC")),
            Some(Some(&60))
        );
        assert!(table.lookup(184, Residue::Insertion).is_none());

        let scored = join_simple_scores(
            vec![
                observation("13-134628", Some(184), Residue::AminoAcid('I')),
                observation("13-134628", Some(184), Residue::Insertion),
            ],
            &table,
        );
        assert_eq!(scored[0].penalties.get("3TC"), Some(&60));
        assert!(!scored[1].is_matched());
    }

    #[rstest]
    fn test_insertion_matches_ins_row(nrti_table: SimpleScoreTable) {
        let scored = join_simple_scores(
            vec![observation("13-134628", Some(69), Residue::Insertion)],
            &nrti_table,
        );
        assert_eq!(scored[0].penalties.get("ABC"), Some(&30));
    }

    #[rstest]
    fn test_merge_tables(nrti_table: SimpleScoreTable) {
        let nnrti = SimpleScoreTable::from_rows(
            vec!["EFV".to_string()],
            &[
                RuleRow::new("K103N", &[("EFV", 60)]),
                RuleRow::new("M184V", &[("EFV", 0)]),
            ],
        )
        .unwrap();

        let merged = nrti_table.merge(nnrti).unwrap();
        assert_eq!(merged.drugs(), &["ABC", "3TC", "EFV"]);
        assert_eq!(merged.len(), 4);
        let row = merged.lookup(184, Residue::AminoAcid('V')).unwrap();
        assert_eq!(row.penalties.len(), 3);
    }

    #[rstest]
    fn test_conflicting_rows_are_rejected() {
        let result = SimpleScoreTable::from_rows(
            vec!["3TC".to_string()],
            &[
                RuleRow::new("M184V", &[("3TC", 10)]),
                RuleRow::new("M184V", &[("3TC", 60)]),
            ],
        );
        assert!(matches!(result, Err(ConfigurationError::ConflictingPenalty { .. })));
    }
}

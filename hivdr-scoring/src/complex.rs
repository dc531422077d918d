//! Conjunctive multi-position rules.
//!
//! A complex rule such as `G118R + E138AKT` applies to an accession only
//! when every clause is observed. Rules that involve the same positions
//! overlap; for one accession only the largest penalty among them counts.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use fxhash::FxHashMap;
use regex::Regex;
use tracing::debug;

use hivdr_core::errors::ConfigurationError;
use hivdr_core::models::{Observation, Residue};

use crate::consts::{CLAUSE_SEPARATOR, POSITION_SET_SEPARATOR};
use crate::table::{RuleRow, merge_drug_columns};

static CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z])(\d+)([A-Z]+)$").expect("clause pattern is valid"));
static POSITION_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z]\d+").expect("position pattern is valid"));
static AMINO_ACID_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d([A-Z]+)").expect("amino acid pattern is valid"));

/// One `<ref><position><allowed>` clause of a complex rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleClause {
    pub reference: char,
    pub position: u32,
    pub allowed: BTreeSet<char>,
}

impl RuleClause {
    pub fn matches(&self, position: Option<u32>, residue: Residue) -> bool {
        match (position, residue) {
            (Some(p), Residue::AminoAcid(aa)) => p == self.position && self.allowed.contains(&aa),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexRule {
    pub label: String,
    pub clauses: Vec<RuleClause>,
    pub penalties: BTreeMap<String, i32>,
}

impl ComplexRule {
    ///
    /// Parse and validate a rule label.
    ///
    /// Every `+`-separated clause must read `<ref-aa><position><allowed-aas>`,
    /// and the label must hold as many position groups as amino-acid groups.
    ///
    pub fn parse(label: &str, penalties: BTreeMap<String, i32>) -> Result<Self, ConfigurationError> {
        let label = label.trim();
        let malformed = |reason: String| ConfigurationError::MalformedComplexRule {
            rule: label.to_string(),
            reason,
        };

        let positions = POSITION_GROUP.find_iter(label).count();
        let amino_acids = AMINO_ACID_GROUP.find_iter(label).count();
        if positions != amino_acids {
            return Err(malformed(format!(
                "{} position groups but {} amino acid groups",
                positions, amino_acids
            )));
        }

        let mut clauses = Vec::new();
        for raw in label.split(CLAUSE_SEPARATOR) {
            let raw = raw.trim();
            let caps = CLAUSE
                .captures(raw)
                .ok_or_else(|| malformed(format!("clause '{}' is not <ref><position><amino acids>", raw)))?;

            let reference = caps[1].chars().next().unwrap_or_default();
            let position = caps[2]
                .parse::<u32>()
                .map_err(|_| malformed(format!("position in '{}' is out of range", raw)))?;
            let allowed = caps[3].chars().collect();

            clauses.push(RuleClause {
                reference,
                position,
                allowed,
            });
        }

        if clauses.len() < 2 {
            return Err(malformed("a complex rule needs at least two clauses".to_string()));
        }

        Ok(ComplexRule {
            label: label.to_string(),
            clauses,
            penalties,
        })
    }

    /// Clause positions joined with `-`, e.g. `G118-E138`.
    pub fn position_set(&self) -> String {
        self.clauses
            .iter()
            .map(|c| format!("{}{}", c.reference, c.position))
            .collect::<Vec<String>>()
            .join(POSITION_SET_SEPARATOR)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ComplexRuleTable {
    drugs: Vec<String>,
    rules: Vec<ComplexRule>,
}

impl ComplexRuleTable {
    /// Build a table, validating every rule label up front.
    pub fn from_rows(drugs: Vec<String>, rows: &[RuleRow]) -> Result<Self, ConfigurationError> {
        let rules = rows
            .iter()
            .map(|row| ComplexRule::parse(&row.rule, row.penalties.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ComplexRuleTable { drugs, rules })
    }

    pub fn merge(mut self, other: ComplexRuleTable) -> Self {
        self.drugs = merge_drug_columns(&self.drugs, &other.drugs);
        self.rules.extend(other.rules);
        self
    }

    pub fn drugs(&self) -> &[String] {
        &self.drugs
    }

    pub fn rules(&self) -> &[ComplexRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// A complex rule satisfied by one accession.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexHit {
    pub accession: String,
    pub rule: String,
    pub position_set: String,
    pub penalties: BTreeMap<String, i32>,
}

/// Accessions per observed (position, amino acid).
struct ObservationIndex<'a> {
    by_position: FxHashMap<u32, Vec<(char, &'a str)>>,
}

impl<'a> ObservationIndex<'a> {
    fn new(observations: &'a [Observation]) -> Self {
        let mut by_position: FxHashMap<u32, Vec<(char, &'a str)>> = FxHashMap::default();
        for o in observations {
            if let (Some(position), Residue::AminoAcid(aa)) = (o.position, o.residue) {
                by_position
                    .entry(position)
                    .or_default()
                    .push((aa, o.accession.as_str()));
            }
        }
        ObservationIndex { by_position }
    }

    fn accessions_matching(&self, clause: &RuleClause) -> BTreeSet<&'a str> {
        self.by_position
            .get(&clause.position)
            .map(|units| {
                units
                    .iter()
                    .filter(|(aa, _)| clause.allowed.contains(aa))
                    .map(|(_, accession)| *accession)
                    .collect()
            })
            .unwrap_or_default()
    }
}

///
/// Find every (rule, accession) pair where the accession satisfies all
/// clauses of the rule.
///
/// Clauses are applied by sequential intersection: the accessions matching
/// the first clause are narrowed by each following clause, stopping early
/// once none remain.
///
pub fn evaluate_complex_rules(
    observations: &[Observation],
    table: &ComplexRuleTable,
) -> Vec<ComplexHit> {
    let index = ObservationIndex::new(observations);
    let mut hits = Vec::new();

    for rule in table.rules() {
        let mut clauses = rule.clauses.iter();
        let mut running = match clauses.next() {
            Some(first) => index.accessions_matching(first),
            None => continue,
        };

        for clause in clauses {
            if running.is_empty() {
                break;
            }
            let matching = index.accessions_matching(clause);
            running.retain(|accession| matching.contains(accession));
        }

        if !running.is_empty() {
            debug!(rule = %rule.label, accessions = running.len(), "complex rule matched");
        }

        let position_set = rule.position_set();
        for accession in running {
            hits.push(ComplexHit {
                accession: accession.to_string(),
                rule: rule.label.clone(),
                position_set: position_set.clone(),
                penalties: rule.penalties.clone(),
            });
        }
    }

    hits
}

///
/// Reduce hits to one complex penalty per (accession, drug).
///
/// Within an accession, rules sharing a position set contribute their
/// maximum penalty per drug; distinct position sets are then summed.
///
pub fn complex_penalties(hits: &[ComplexHit]) -> BTreeMap<(String, String), i32> {
    let mut maxima: BTreeMap<(&str, &str, &str), i32> = BTreeMap::new();
    for hit in hits {
        for (drug, penalty) in &hit.penalties {
            maxima
                .entry((hit.accession.as_str(), hit.position_set.as_str(), drug.as_str()))
                .and_modify(|current| *current = (*current).max(*penalty))
                .or_insert(*penalty);
        }
    }

    let mut totals: BTreeMap<(String, String), i32> = BTreeMap::new();
    for ((accession, _, drug), penalty) in maxima {
        *totals
            .entry((accession.to_string(), drug.to_string()))
            .or_insert(0) += penalty;
    }
    totals
}

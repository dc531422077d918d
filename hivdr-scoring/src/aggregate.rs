use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use hivdr_core::models::{DrugCatalog, DrugScore, Locus, ResistanceCategory};

use crate::history::HistoryEntry;
use crate::simple::ScoredObservation;

/// Output shaping for [aggregate_scores].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateOptions {
    /// Emit every (accession, drug) pair, zero-filled, instead of only
    /// the pairs some rule contributed to.
    pub emit_all_drugs: bool,
}

///
/// Simple score per (accession, drug).
///
/// All units observed at one position compete; only the largest penalty of
/// that position counts. Positions are then summed. Observations without a
/// position never contribute.
///
pub fn simple_scores(scored: &[ScoredObservation]) -> BTreeMap<(String, String), i32> {
    let mut per_position: BTreeMap<(&str, u32, &str), i32> = BTreeMap::new();
    for s in scored {
        let Some(position) = s.observation.position else {
            continue;
        };
        for (drug, penalty) in &s.penalties {
            per_position
                .entry((s.observation.accession.as_str(), position, drug.as_str()))
                .and_modify(|current| *current = (*current).max(*penalty))
                .or_insert(*penalty);
        }
    }

    let mut totals: BTreeMap<(String, String), i32> = BTreeMap::new();
    for ((accession, _, drug), penalty) in per_position {
        *totals
            .entry((accession.to_string(), drug.to_string()))
            .or_insert(0) += penalty;
    }
    totals
}

///
/// Combine simple and complex components into one scored row per
/// (accession, drug), with the resistance category of the total.
///
/// # Arguments
/// - tests: the accessions of the run with their patient and date
/// - locus: locus every row is reported under
/// - drugs: drug columns of the reference tables, used for `emit_all_drugs`
/// - simple: output of [simple_scores]
/// - complex: output of [crate::complex::complex_penalties]
/// - options: output shaping
///
pub fn aggregate_scores(
    tests: &[HistoryEntry],
    locus: Locus,
    drugs: &[String],
    simple: &BTreeMap<(String, String), i32>,
    complex: &BTreeMap<(String, String), i32>,
    options: AggregateOptions,
) -> Vec<DrugScore> {
    let catalog = DrugCatalog::standard();
    let mut scores = Vec::new();

    for test in tests {
        let contributed: Vec<&String> = if options.emit_all_drugs {
            drugs.iter().collect()
        } else {
            let mut present: Vec<&String> = drugs_for(simple, &test.accession)
                .chain(drugs_for(complex, &test.accession))
                .collect();
            present.sort();
            present.dedup();
            present
        };

        for drug in contributed {
            let key = (test.accession.clone(), drug.clone());
            let simple_score = simple.get(&key).copied().unwrap_or(0);
            let complex_penalty = complex.get(&key).copied().unwrap_or(0);
            let total_score = simple_score + complex_penalty;

            scores.push(DrugScore {
                accession: test.accession.clone(),
                patient_id: test.patient_id.clone(),
                collected_date: test.collected_date,
                locus,
                drug: drug.clone(),
                drug_class: catalog.class_of(drug),
                simple_score,
                complex_penalty,
                total_score,
                resistance_category: ResistanceCategory::from_score(total_score),
            });
        }
    }

    sort_scores(&mut scores);
    scores
}

fn drugs_for<'a>(
    component: &'a BTreeMap<(String, String), i32>,
    accession: &str,
) -> impl Iterator<Item = &'a String> {
    component
        .range((accession.to_string(), String::new())..)
        .take_while(move |((a, _), _)| a == accession)
        .map(|((_, drug), _)| drug)
}

/// Order by patient, collection date, accession and drug.
pub fn sort_scores(scores: &mut [DrugScore]) {
    scores.sort_by(|a, b| {
        (&a.patient_id, a.collected_date, &a.accession, &a.drug).cmp(&(
            &b.patient_id,
            b.collected_date,
            &b.accession,
            &b.drug,
        ))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rstest::*;

    use hivdr_core::models::{DrugClass, Observation, Residue};

    fn scored(accession: &str, position: Option<u32>, aa: char, penalties: &[(&str, i32)]) -> ScoredObservation {
        ScoredObservation {
            observation: Observation {
                accession: accession.to_string(),
                patient_id: "0009415".to_string(),
                collected_date: NaiveDate::from_ymd_opt(2013, 6, 28).unwrap(),
                locus: Locus::ReverseTranscriptase,
                line: 0,
                token: format!("X{}{}", position.unwrap_or(0), aa),
                position,
                residue: Residue::AminoAcid(aa),
                mixture_size: 1,
                mixture_index: 0,
            },
            penalties: penalties
                .iter()
                .map(|(drug, p)| (drug.to_string(), *p))
                .collect(),
        }
    }

    fn test_entry(accession: &str) -> HistoryEntry {
        HistoryEntry {
            accession: accession.to_string(),
            patient_id: "0009415".to_string(),
            collected_date: NaiveDate::from_ymd_opt(2013, 6, 28).unwrap(),
            mutation_list: String::new(),
        }
    }

    fn key(accession: &str, drug: &str) -> (String, String) {
        (accession.to_string(), drug.to_string())
    }

    #[rstest]
    fn test_mixture_at_one_position_counts_once() {
        // Q151Q/M: Q scores nothing, M scores 60
        let observations = vec![
            scored("13-134628", Some(151), 'Q', &[]),
            scored("13-134628", Some(151), 'M', &[("3TC", 60), ("ABC", 60)]),
            scored("13-134628", Some(151), 'L', &[("3TC", 10)]),
        ];
        let totals = simple_scores(&observations);
        assert_eq!(totals.get(&key("13-134628", "3TC")), Some(&60));
    }

    #[rstest]
    fn test_positions_sum() {
        let observations = vec![
            scored("13-134628", Some(184), 'V', &[("3TC", 60)]),
            scored("13-134628", Some(65), 'R', &[("3TC", 30)]),
            scored("13-134628", None, 'E', &[("3TC", 100)]),
        ];
        let totals = simple_scores(&observations);
        assert_eq!(totals.get(&key("13-134628", "3TC")), Some(&90));
    }

    #[rstest]
    fn test_simple_only_row() {
        let simple = BTreeMap::from([(key("13-134628", "3TC"), 10)]);
        let scores = aggregate_scores(
            &[test_entry("13-134628")],
            Locus::ReverseTranscriptase,
            &["3TC".to_string(), "ABC".to_string()],
            &simple,
            &BTreeMap::new(),
            AggregateOptions::default(),
        );

        assert_eq!(scores.len(), 1);
        let row = &scores[0];
        assert_eq!(row.drug, "3TC");
        assert_eq!(row.drug_class, Some(DrugClass::Nrti));
        assert_eq!(row.simple_score, 10);
        assert_eq!(row.complex_penalty, 0);
        assert_eq!(row.total_score, 10);
        assert_eq!(row.resistance_category, ResistanceCategory::PotentialLowLevel);
    }

    #[rstest]
    fn test_complex_only_row_and_total() {
        let simple = BTreeMap::from([(key("19-000001", "DTG"), 5)]);
        let complex = BTreeMap::from([(key("19-000001", "DTG"), 10), (key("19-000001", "BIC"), 10)]);
        let scores = aggregate_scores(
            &[test_entry("19-000001")],
            Locus::Integrase,
            &[],
            &simple,
            &complex,
            AggregateOptions::default(),
        );

        let summary: Vec<(&str, i32, i32, i32)> = scores
            .iter()
            .map(|s| (s.drug.as_str(), s.simple_score, s.complex_penalty, s.total_score))
            .collect();
        assert_eq!(summary, vec![("BIC", 0, 10, 10), ("DTG", 5, 10, 15)]);
        assert!(scores.iter().all(|s| s.total_score == s.simple_score + s.complex_penalty));
    }

    #[rstest]
    fn test_emit_all_drugs_zero_fills() {
        let simple = BTreeMap::from([(key("13-134628", "3TC"), 60)]);
        let scores = aggregate_scores(
            &[test_entry("13-134628"), test_entry("13-134629")],
            Locus::ReverseTranscriptase,
            &["3TC".to_string(), "ABC".to_string()],
            &simple,
            &BTreeMap::new(),
            AggregateOptions { emit_all_drugs: true },
        );

        assert_eq!(scores.len(), 4);
        let susceptible = scores
            .iter()
            .filter(|s| s.resistance_category == ResistanceCategory::Susceptible)
            .count();
        assert_eq!(susceptible, 3);
    }
}

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use hivdr_core::errors::ParseError;
use hivdr_core::models::{Locus, Observation, parse_token};

use crate::consts::TOKEN_SEPARATOR;
use crate::history::{HistoryEntry, PatientHistory};

///
/// What to do with a token that cannot be parsed.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenPolicy {
    /// Log the token and keep melting the rest of the accession.
    #[default]
    Skip,
    /// Drop every observation of the accession.
    AbortAccession,
}

impl std::str::FromStr for TokenPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(TokenPolicy::Skip),
            "abort-accession" | "abort" => Ok(TokenPolicy::AbortAccession),
            _ => Err(anyhow::Error::msg(format!("Invalid token policy: {}", s))),
        }
    }
}

/// An accession abandoned because one of its tokens failed to parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Accession {accession} abandoned at token '{token}': {source}")]
pub struct MeltError {
    pub accession: String,
    pub token: String,
    #[source]
    pub source: ParseError,
}

/// Observations of one patient plus what had to be left out.
#[derive(Debug, Clone, Default)]
pub struct MeltOutcome {
    pub observations: Vec<Observation>,
    pub skipped_tokens: usize,
    pub abandoned: Vec<MeltError>,
}

///
/// Expand one accession's cumulative list into atomic observations.
///
/// Every unit of a mixture becomes its own observation numbered by its
/// place in that token, so `E40D` and `E40D/E` on the same accession stay
/// distinct. Exact token repeats are melted once. Bare deletions are
/// anchored during history accumulation; any left here have no position.
///
/// Returns the observations and the number of skipped tokens, or the first
/// parse failure under [TokenPolicy::AbortAccession].
///
pub fn melt_entry(
    entry: &HistoryEntry,
    locus: Locus,
    policy: TokenPolicy,
) -> Result<(Vec<Observation>, usize), MeltError> {
    let mut observations = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut skipped = 0;

    for (line, raw) in entry.mutation_list.split(TOKEN_SEPARATOR).enumerate() {
        let token = raw.trim();
        if token.is_empty() || !seen.insert(token) {
            continue;
        }

        let parsed = match parse_token(token) {
            Ok(parsed) => parsed,
            Err(source) => match policy {
                TokenPolicy::Skip => {
                    warn!(
                        accession = %entry.accession,
                        token,
                        "skipping malformed mutation token: {}",
                        source
                    );
                    skipped += 1;
                    continue;
                }
                TokenPolicy::AbortAccession => {
                    return Err(MeltError {
                        accession: entry.accession.clone(),
                        token: token.to_string(),
                        source,
                    });
                }
            },
        };

        let mixture_size = parsed.mixture_size();
        for (mixture_index, residue) in parsed.residues().into_iter().enumerate() {
            observations.push(Observation {
                accession: entry.accession.clone(),
                patient_id: entry.patient_id.clone(),
                collected_date: entry.collected_date,
                locus,
                line,
                token: token.to_string(),
                position: parsed.position(),
                residue,
                mixture_size,
                mixture_index,
            });
        }
    }

    Ok((observations, skipped))
}

///
/// Melt every entry of a patient's history.
///
/// Accessions abandoned under [TokenPolicy::AbortAccession] are reported in
/// the outcome and contribute no observations; the rest of the patient is
/// unaffected.
///
pub fn melt_history(history: &PatientHistory, locus: Locus, policy: TokenPolicy) -> MeltOutcome {
    let mut outcome = MeltOutcome::default();

    for entry in &history.entries {
        match melt_entry(entry, locus, policy) {
            Ok((observations, skipped)) => {
                outcome.observations.extend(observations);
                outcome.skipped_tokens += skipped;
            }
            Err(err) => {
                warn!("{}", err);
                outcome.abandoned.push(err);
            }
        }
    }

    sort_observations(&mut outcome.observations);
    outcome
}

/// Order by patient, collection date, position (missing last) and line.
pub fn sort_observations(observations: &mut [Observation]) {
    observations.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
}

fn sort_key(o: &Observation) -> (&str, chrono::NaiveDate, u32, usize, usize) {
    (
        &o.patient_id,
        o.collected_date,
        o.position.unwrap_or(u32::MAX),
        o.line,
        o.mixture_index,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rstest::*;

    use hivdr_core::models::Residue;

    fn entry(list: &str) -> HistoryEntry {
        HistoryEntry {
            accession: "09-150972".to_string(),
            patient_id: "0033464".to_string(),
            collected_date: NaiveDate::from_ymd_opt(2009, 4, 2).unwrap(),
            mutation_list: list.to_string(),
        }
    }

    fn summary(observations: &[Observation]) -> Vec<(String, Option<u32>, String, usize, usize)> {
        observations
            .iter()
            .map(|o| {
                (
                    o.token.clone(),
                    o.position,
                    o.residue.to_string(),
                    o.mixture_size,
                    o.mixture_index,
                )
            })
            .collect()
    }

    #[rstest]
    fn test_mixture_components_are_numbered() {
        let (observations, skipped) =
            melt_entry(&entry("V245V/M,D123E"), Locus::ReverseTranscriptase, TokenPolicy::Skip).unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(
            summary(&observations),
            vec![
                ("V245V/M".to_string(), Some(245), "V".to_string(), 2, 0),
                ("V245V/M".to_string(), Some(245), "M".to_string(), 2, 1),
                ("D123E".to_string(), Some(123), "E".to_string(), 1, 0),
            ]
        );
    }

    #[rstest]
    fn test_same_position_different_arity_stays_separate() {
        let (observations, _) =
            melt_entry(&entry("E40D,E40D/E"), Locus::ReverseTranscriptase, TokenPolicy::Skip).unwrap();
        assert_eq!(
            summary(&observations),
            vec![
                ("E40D".to_string(), Some(40), "D".to_string(), 1, 0),
                ("E40D/E".to_string(), Some(40), "D".to_string(), 2, 0),
                ("E40D/E".to_string(), Some(40), "E".to_string(), 2, 1),
            ]
        );
        assert_eq!(observations[0].line, 0);
        assert_eq!(observations[1].line, 1);
    }

    #[rstest]
    fn test_indels_emit_one_sentinel_observation() {
        let (observations, _) = melt_entry(
            &entry("T69T/S/SSS,D67N,E67/^"),
            Locus::ReverseTranscriptase,
            TokenPolicy::Skip,
        )
        .unwrap();
        assert_eq!(observations.len(), 3);
        assert_eq!(observations[0].residue, Residue::Insertion);
        assert_eq!(observations[2].residue, Residue::Deletion);
        assert_eq!(observations[2].position, Some(67));
    }

    #[rstest]
    fn test_leading_bare_deletion_has_no_position() {
        let (observations, _) =
            melt_entry(&entry("E/^"), Locus::ReverseTranscriptase, TokenPolicy::Skip).unwrap();
        assert_eq!(observations[0].position, None);
        assert_eq!(observations[0].score_key(), None);
    }

    #[rstest]
    fn test_duplicate_tokens_and_blanks_are_dropped() {
        let (observations, _) = melt_entry(
            &entry("K103N, ,K103N,,M184V"),
            Locus::ReverseTranscriptase,
            TokenPolicy::Skip,
        )
        .unwrap();
        let tokens: Vec<&str> = observations.iter().map(|o| o.token.as_str()).collect();
        assert_eq!(tokens, vec!["K103N", "M184V"]);
    }

    #[rstest]
    fn test_skip_policy_counts_bad_tokens() {
        let (observations, skipped) =
            melt_entry(&entry("K103N,XYZ,M184V"), Locus::ReverseTranscriptase, TokenPolicy::Skip).unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(skipped, 1);
    }

    #[rstest]
    fn test_abort_policy_abandons_accession() {
        let err = melt_entry(
            &entry("K103N,XYZ,M184V"),
            Locus::ReverseTranscriptase,
            TokenPolicy::AbortAccession,
        )
        .unwrap_err();
        assert_eq!(err.accession, "09-150972");
        assert_eq!(err.token, "XYZ");
        assert_eq!(err.source, ParseError::MissingPosition("XYZ".to_string()));
    }

    #[rstest]
    fn test_melt_history_isolates_abandoned_accessions() {
        let mut bad = entry("K103N,XYZ");
        bad.accession = "09-150973".to_string();
        let history = PatientHistory {
            patient_id: "0033464".to_string(),
            entries: vec![entry("M184V"), bad],
        };

        let outcome = melt_history(&history, Locus::ReverseTranscriptase, TokenPolicy::AbortAccession);
        assert_eq!(outcome.observations.len(), 1);
        assert_eq!(outcome.abandoned.len(), 1);
        assert_eq!(outcome.abandoned[0].accession, "09-150973");
    }

    #[rstest]
    #[case("skip", TokenPolicy::Skip)]
    #[case("abort-accession", TokenPolicy::AbortAccession)]
    fn test_policy_from_str(#[case] raw: &str, #[case] expected: TokenPolicy) {
        assert_eq!(raw.parse::<TokenPolicy>().unwrap(), expected);
    }
}

//! End-to-end scoring of report records for one locus.
//!
//! Records are filtered, grouped per patient and each patient is processed
//! independently on the rayon pool: history accumulation, melting, simple
//! and complex scoring, aggregation. A patient whose history cannot be
//! built is reported as a failure without affecting the others.

use std::collections::{BTreeMap, HashSet};

use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{info, warn};

use hivdr_core::errors::HistoryError;
use hivdr_core::models::{DrugScore, Locus, Observation, ReportRecord};

use crate::aggregate::{AggregateOptions, aggregate_scores, simple_scores, sort_scores};
use crate::comments::CommentTable;
use crate::complex::{ComplexRuleTable, complex_penalties, evaluate_complex_rules};
use crate::history::{HistoryEntry, PatientHistory, accumulate_history};
use crate::melt::{MeltError, MeltOutcome, TokenPolicy, melt_history, sort_observations};
use crate::simple::{SimpleScoreTable, join_simple_scores};
use crate::table::merge_drug_columns;

///
/// Read-only reference data of one locus, shared by every patient.
///
#[derive(Debug, Clone)]
pub struct ReferenceTables {
    pub locus: Locus,
    pub simple: SimpleScoreTable,
    pub complex: ComplexRuleTable,
    pub comments: Option<CommentTable>,
}

impl ReferenceTables {
    /// Drug columns of the simple table followed by any complex-only ones.
    pub fn drugs(&self) -> Vec<String> {
        merge_drug_columns(self.simple.drugs(), self.complex.drugs())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    pub token_policy: TokenPolicy,
    pub aggregate: AggregateOptions,
    pub show_progress: bool,
    /// Also return the melted observations of every scored patient.
    pub keep_observations: bool,
}

/// Why records were left out before history accumulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntakeSummary {
    pub total: usize,
    pub missing_list: usize,
    pub incomplete: usize,
    pub missing_patient: usize,
    pub accepted: usize,
}

///
/// Select the records usable for a locus.
///
/// A record is dropped when its list for the locus is missing or `None`,
/// when the report is incomplete, or when it has no patient id; each
/// record counts toward the first reason that applies.
///
pub fn select_entries(records: &[ReportRecord], locus: Locus) -> (Vec<HistoryEntry>, IntakeSummary) {
    let mut summary = IntakeSummary {
        total: records.len(),
        ..Default::default()
    };
    let mut entries = Vec::with_capacity(records.len());

    for record in records {
        if record.mutation_list(locus).is_none() {
            summary.missing_list += 1;
        } else if !record.report_complete {
            summary.incomplete += 1;
        } else if let Some(entry) = HistoryEntry::from_record(record, locus) {
            entries.push(entry);
        } else {
            summary.missing_patient += 1;
        }
    }
    summary.accepted = entries.len();

    info!(
        locus = %locus,
        total = summary.total,
        missing_list = summary.missing_list,
        incomplete = summary.incomplete,
        missing_patient = summary.missing_patient,
        accepted = summary.accepted,
        "filtered report records"
    );

    (entries, summary)
}

/// Group entries per patient, keeping record order inside each group.
pub fn group_by_patient(entries: Vec<HistoryEntry>) -> BTreeMap<String, Vec<HistoryEntry>> {
    let mut groups: BTreeMap<String, Vec<HistoryEntry>> = BTreeMap::new();
    for entry in entries {
        groups.entry(entry.patient_id.clone()).or_default().push(entry);
    }
    groups
}

/// Everything one patient contributes to a run.
#[derive(Debug, Clone, Default)]
struct PatientResult {
    scores: Vec<DrugScore>,
    observations: Vec<Observation>,
    skipped_tokens: usize,
    abandoned: Vec<MeltError>,
}

///
/// The result of a scoring run for one locus.
///
#[derive(Debug, Clone, Default)]
pub struct ScoreReport {
    pub scores: Vec<DrugScore>,
    pub observations: Vec<Observation>,
    pub intake: IntakeSummary,
    pub failures: Vec<HistoryError>,
    pub skipped_tokens: usize,
    pub abandoned: Vec<MeltError>,
}

fn progress_bar(len: usize, show: bool, message: &'static str) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_message(message);
    pb
}

///
/// Run `f` on the cumulative history of every patient in parallel.
///
/// Patients whose history fails to build are returned separately and
/// logged; nothing is shared between patients.
///
fn for_each_patient<T, F>(
    entries: Vec<HistoryEntry>,
    show_progress: bool,
    f: F,
) -> (Vec<T>, Vec<HistoryError>)
where
    T: Send,
    F: Fn(&PatientHistory) -> T + Sync + Send,
{
    let groups: Vec<(String, Vec<HistoryEntry>)> = group_by_patient(entries).into_iter().collect();
    let pb = progress_bar(groups.len(), show_progress, "Processing patients");

    let results: Vec<Result<T, HistoryError>> = groups
        .par_iter()
        .progress_with(pb.clone())
        .map(|(patient_id, tests)| accumulate_history(patient_id, tests).map(|history| f(&history)))
        .collect();
    pb.finish_and_clear();

    let mut successes = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(value) => successes.push(value),
            Err(err) => {
                warn!("skipping patient: {}", err);
                failures.push(err);
            }
        }
    }
    (successes, failures)
}

fn score_patient(
    history: &PatientHistory,
    tables: &ReferenceTables,
    drugs: &[String],
    options: &PipelineOptions,
) -> PatientResult {
    let MeltOutcome {
        observations,
        skipped_tokens,
        abandoned,
    } = melt_history(history, tables.locus, options.token_policy);

    let hits = evaluate_complex_rules(&observations, &tables.complex);
    let complex = complex_penalties(&hits);
    let scored = join_simple_scores(observations, &tables.simple);
    let simple = simple_scores(&scored);

    // accessions without a single observation are left out, not zero-filled
    let observed: HashSet<&str> = scored
        .iter()
        .map(|s| s.observation.accession.as_str())
        .collect();
    let tests: Vec<HistoryEntry> = history
        .entries
        .iter()
        .filter(|e| observed.contains(e.accession.as_str()))
        .cloned()
        .collect();

    let scores = aggregate_scores(&tests, tables.locus, drugs, &simple, &complex, options.aggregate);

    let observations = if options.keep_observations {
        scored.into_iter().map(|s| s.observation).collect()
    } else {
        Vec::new()
    };

    PatientResult {
        scores,
        observations,
        skipped_tokens,
        abandoned,
    }
}

///
/// Score every record of a run against the tables of one locus.
///
/// # Arguments
/// - records: all report records of the run
/// - tables: reference tables of the locus to score
/// - options: token policy, output shaping and progress display
///
pub fn score_records(
    records: &[ReportRecord],
    tables: &ReferenceTables,
    options: &PipelineOptions,
) -> ScoreReport {
    let (entries, intake) = select_entries(records, tables.locus);
    let drugs = tables.drugs();

    let (results, failures) = for_each_patient(entries, options.show_progress, |history| {
        score_patient(history, tables, &drugs, options)
    });

    let mut report = ScoreReport {
        intake,
        failures,
        ..Default::default()
    };
    for result in results {
        report.scores.extend(result.scores);
        report.observations.extend(result.observations);
        report.skipped_tokens += result.skipped_tokens;
        report.abandoned.extend(result.abandoned);
    }
    sort_scores(&mut report.scores);
    sort_observations(&mut report.observations);

    info!(
        locus = %tables.locus,
        rows = report.scores.len(),
        failed_patients = report.failures.len(),
        skipped_tokens = report.skipped_tokens,
        abandoned_accessions = report.abandoned.len(),
        "scoring finished"
    );

    report
}

/// Observations of a run for one locus, before any scoring.
#[derive(Debug, Clone, Default)]
pub struct MeltReport {
    pub observations: Vec<Observation>,
    pub intake: IntakeSummary,
    pub failures: Vec<HistoryError>,
    pub skipped_tokens: usize,
    pub abandoned: Vec<MeltError>,
}

///
/// Accumulate and melt every patient without scoring.
///
pub fn melt_records(
    records: &[ReportRecord],
    locus: Locus,
    policy: TokenPolicy,
    show_progress: bool,
) -> MeltReport {
    let (entries, intake) = select_entries(records, locus);
    let (outcomes, failures) =
        for_each_patient(entries, show_progress, |history| melt_history(history, locus, policy));

    let mut report = MeltReport {
        intake,
        failures,
        ..Default::default()
    };
    for outcome in outcomes {
        report.observations.extend(outcome.observations);
        report.skipped_tokens += outcome.skipped_tokens;
        report.abandoned.extend(outcome.abandoned);
    }
    sort_observations(&mut report.observations);
    report
}

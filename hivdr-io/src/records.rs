use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use hivdr_core::errors::RecordError;
use hivdr_core::models::{Locus, ReportRecord, normalize_patient_id};
use hivdr_core::utils::get_dynamic_reader_w_stdin;

use crate::consts::DATE_FORMATS;

/// One row of the report CSV before validation.
#[derive(Debug, Deserialize)]
struct RawReportRow {
    #[serde(default)]
    accession: Option<String>,
    #[serde(default)]
    patient_id: Option<String>,
    collected_date: String,
    #[serde(default)]
    rt_list: Option<String>,
    #[serde(default)]
    pr_list: Option<String>,
    #[serde(default)]
    in_list: Option<String>,
    report_complete: String,
}

impl RawReportRow {
    fn into_record(self) -> std::result::Result<ReportRecord, RecordError> {
        let accession = self
            .accession
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .ok_or(RecordError::MissingAccession)?;

        let collected_date =
            parse_collected_date(&self.collected_date).ok_or_else(|| RecordError::InvalidDate {
                accession: accession.clone(),
                value: self.collected_date.clone(),
            })?;

        let report_complete = parse_completeness(&self.report_complete).ok_or_else(|| {
            RecordError::InvalidCompleteness {
                accession: accession.clone(),
                value: self.report_complete.clone(),
            }
        })?;

        let mutation_lists: BTreeMap<Locus, String> = [
            (Locus::ReverseTranscriptase, self.rt_list),
            (Locus::Protease, self.pr_list),
            (Locus::Integrase, self.in_list),
        ]
        .into_iter()
        .filter_map(|(locus, list)| list.map(|l| (locus, l)))
        .collect();

        Ok(ReportRecord {
            accession,
            patient_id: self.patient_id.as_deref().and_then(normalize_patient_id),
            collected_date,
            mutation_lists,
            report_complete,
        })
    }
}

/// Parse a collection date written as `2013-06-28` or `28-Jun-2013`.
pub fn parse_collected_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// Parse a completeness flag (`true`/`false`, `yes`/`no`, `1`/`0`, ...).
pub fn parse_completeness(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" | "complete" => Some(true),
        "false" | "f" | "no" | "n" | "0" | "incomplete" => Some(false),
        _ => None,
    }
}

///
/// Parse report records from CSV.
///
/// Expected columns: `accession, patient_id, collected_date, rt_list,
/// pr_list, in_list, report_complete`. Headers and cells are trimmed and
/// locus list columns may be absent. Patient ids are normalised to their
/// fixed-width form.
///
pub fn parse_report_records<R: Read>(reader: R) -> Result<Vec<ReportRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (i, row) in rdr.deserialize::<RawReportRow>().enumerate() {
        // header is line 1
        let line = i + 2;
        let row = row.with_context(|| format!("Malformed report row at line {}", line))?;
        let record = row
            .into_record()
            .with_context(|| format!("Invalid report row at line {}", line))?;
        records.push(record);
    }

    Ok(records)
}

///
/// Read report records from a CSV file, gzipped or not. A path of `-`
/// reads from stdin.
///
/// # Arguments
/// - path: path to the report CSV
///
pub fn read_report_records(path: &Path) -> Result<Vec<ReportRecord>> {
    let reader = get_dynamic_reader_w_stdin(&path.to_string_lossy())?;
    let records = parse_report_records(reader)
        .with_context(|| format!("Failed to read report records from {:?}", path))?;

    let without_patient = records.iter().filter(|r| r.patient_id.is_none()).count();
    info!(
        path = %path.display(),
        records = records.len(),
        without_patient,
        "read report records"
    );

    Ok(records)
}

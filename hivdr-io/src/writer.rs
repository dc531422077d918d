use std::io::Write;
use std::str::FromStr;

use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use hivdr_core::models::{DrugScore, Locus, Observation, Residue};
use hivdr_core::utils::get_dynamic_writer;
use hivdr_scoring::AnnotatedObservation;

use crate::error::{Result, WriteError};

///
/// Serialisation of result tables.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    /// Infer the format from a file name: `.json` or `.json.gz` is JSON,
    /// anything else CSV.
    pub fn from_path(path: &str) -> Self {
        let stem = path.strip_suffix(".gz").unwrap_or(path);
        match stem.to_lowercase().ends_with(".json") {
            true => OutputFormat::Json,
            false => OutputFormat::Csv,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = WriteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(WriteError::UnknownFormat(s.to_string())),
        }
    }
}

/// Flat row of the melted observation table.
#[derive(Debug, Serialize)]
struct ObservationRow<'a> {
    accession: &'a str,
    patient_id: &'a str,
    collected_date: NaiveDate,
    locus: Locus,
    line: usize,
    token: &'a str,
    position: Option<u32>,
    residue: Residue,
    mixture_size: usize,
    mixture_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    mutation_type: Option<Option<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<Option<&'a str>>,
}

impl<'a> From<&'a Observation> for ObservationRow<'a> {
    fn from(o: &'a Observation) -> Self {
        ObservationRow {
            accession: &o.accession,
            patient_id: &o.patient_id,
            collected_date: o.collected_date,
            locus: o.locus,
            line: o.line,
            token: &o.token,
            position: o.position,
            residue: o.residue,
            mixture_size: o.mixture_size,
            mixture_index: o.mixture_index,
            mutation_type: None,
            comment: None,
        }
    }
}

impl<'a> From<&'a AnnotatedObservation> for ObservationRow<'a> {
    fn from(a: &'a AnnotatedObservation) -> Self {
        ObservationRow {
            mutation_type: Some(a.mutation_type.as_deref()),
            comment: Some(a.comment.as_deref()),
            ..ObservationRow::from(&a.observation)
        }
    }
}

fn write_rows<W: Write, T: Serialize>(writer: W, rows: &[T], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(writer);
            for row in rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
        OutputFormat::Json => {
            let mut writer = writer;
            serde_json::to_writer_pretty(&mut writer, rows)?;
            writeln!(writer)?;
            writer.flush()?;
        }
    }
    Ok(())
}

///
/// Write drug scores, one row per (accession, drug).
///
/// CSV columns: accession, patient_id, collected_date, locus, drug,
/// drug_class, simple_score, complex_penalty, total_score,
/// resistance_category.
///
pub fn write_scores<W: Write>(writer: W, scores: &[DrugScore], format: OutputFormat) -> Result<()> {
    write_rows(writer, scores, format)
}

/// Write melted observations.
pub fn write_observations<W: Write>(
    writer: W,
    observations: &[Observation],
    format: OutputFormat,
) -> Result<()> {
    let rows: Vec<ObservationRow> = observations.iter().map(ObservationRow::from).collect();
    write_rows(writer, &rows, format)
}

/// Write melted observations with their comment columns.
pub fn write_annotated_observations<W: Write>(
    writer: W,
    observations: &[AnnotatedObservation],
    format: OutputFormat,
) -> Result<()> {
    let rows: Vec<ObservationRow> = observations.iter().map(ObservationRow::from).collect();
    write_rows(writer, &rows, format)
}

///
/// Write scores to a path (`-` for stdout). Paths ending in `.gz` are
/// gzipped.
///
pub fn write_scores_to_path(
    path: &str,
    scores: &[DrugScore],
    format: OutputFormat,
) -> anyhow::Result<()> {
    let writer = get_dynamic_writer(path)?;
    write_scores(writer, scores, format).with_context(|| format!("Failed to write scores to {}", path))
}

/// Write melted observations to a path (`-` for stdout).
pub fn write_observations_to_path(
    path: &str,
    observations: &[Observation],
    format: OutputFormat,
) -> anyhow::Result<()> {
    let writer = get_dynamic_writer(path)?;
    write_observations(writer, observations, format)
        .with_context(|| format!("Failed to write observations to {}", path))
}

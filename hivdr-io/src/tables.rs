//! Discovery and loading of reference score and comment tables.
//!
//! A reference directory holds one file per drug class and tier, named
//! `<class>-scores-<tier>*` (e.g. `nrti-scores-simple.csv`) and
//! `<class>-comments*` for comments. Reverse transcriptase merges its NRTI
//! and NNRTI tables into one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use hivdr_core::errors::ConfigurationError;
use hivdr_core::models::{DrugCatalog, DrugClass, Locus};
use hivdr_core::utils::get_dynamic_reader;
use hivdr_scoring::{
    CommentTable, ComplexRuleTable, ReferenceTables, RuleRow, RuleTier, SimpleScoreTable,
};

use crate::consts::{COMMENT_PREAMBLE_ROWS, COMPLEX_RULE_COLUMN, MISSING_CELLS, SIMPLE_RULE_COLUMN};

/// Glob pattern of the score table for a drug class and tier.
pub fn score_table_pattern(dir: &Path, class: DrugClass, tier: RuleTier) -> String {
    dir.join(format!("{}-scores-{}*", class.file_prefix(), tier))
        .to_string_lossy()
        .to_string()
}

/// Glob pattern of the comment table for a drug class.
pub fn comment_table_pattern(dir: &Path, class: DrugClass) -> String {
    dir.join(format!("{}-comments*", class.file_prefix()))
        .to_string_lossy()
        .to_string()
}

///
/// Find the single file matching a pattern. When several files match,
/// the first in lexicographic order is used.
///
fn find_table(pattern: &str, locus: Locus, tier: &str) -> Result<PathBuf, ConfigurationError> {
    let missing = || ConfigurationError::MissingTable {
        locus,
        tier: tier.to_string(),
        pattern: pattern.to_string(),
    };

    let mut matches: Vec<PathBuf> = glob::glob(pattern)
        .map_err(|_| missing())?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    matches.sort();

    if matches.len() > 1 {
        debug!(pattern, chosen = ?matches[0], "several tables match; using the first");
    }
    matches.into_iter().next().ok_or_else(missing)
}

fn table_read_error(path: &Path, message: impl ToString) -> ConfigurationError {
    ConfigurationError::TableRead {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}

fn parse_penalty(rule: &str, drug: &str, cell: &str) -> Result<Option<i32>, ConfigurationError> {
    if MISSING_CELLS.iter().any(|m| m.eq_ignore_ascii_case(cell)) {
        return Ok(None);
    }
    let invalid = || ConfigurationError::InvalidPenalty {
        rule: rule.to_string(),
        drug: drug.to_string(),
        value: cell.to_string(),
    };

    if let Ok(value) = cell.parse::<i32>() {
        return Ok(Some(value));
    }
    // tables exported through spreadsheets carry integral floats, e.g. `10.0`
    match cell.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 && value.abs() <= i32::MAX as f64 => Ok(Some(value as i32)),
        _ => Err(invalid()),
    }
}

///
/// Read a wide score table: one rule column plus one column per drug.
///
/// Headers are trimmed and the rule column is matched case-insensitively.
/// Rows with a blank rule and blank penalty cells are skipped.
///
/// # Arguments
/// - path: path to the table (CSV, optionally gzipped)
/// - rule_column: header of the rule column
///
/// # Returns
/// - the drug columns in file order and one [RuleRow] per rule
///
pub fn read_wide_table(
    path: &Path,
    rule_column: &str,
) -> Result<(Vec<String>, Vec<RuleRow>), ConfigurationError> {
    let reader = get_dynamic_reader(path).map_err(|e| table_read_error(path, e))?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| table_read_error(path, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let rule_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(rule_column))
        .ok_or_else(|| ConfigurationError::MissingRuleColumn(path.display().to_string()))?;

    let drug_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, h)| *i != rule_idx && !h.is_empty())
        .map(|(i, h)| (i, h.clone()))
        .collect();

    let catalog = DrugCatalog::standard();
    for (_, drug) in &drug_columns {
        if catalog.lookup(drug).is_none() {
            warn!(table = %path.display(), drug = %drug, "score table column is not a catalogued drug");
        }
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| table_read_error(path, e))?;
        let rule = record.get(rule_idx).unwrap_or_default().trim();
        if rule.is_empty() {
            continue;
        }

        let mut penalties = BTreeMap::new();
        for (i, drug) in &drug_columns {
            let cell = record.get(*i).unwrap_or_default();
            if let Some(penalty) = parse_penalty(rule, drug, cell)? {
                penalties.insert(drug.clone(), penalty);
            }
        }
        rows.push(RuleRow {
            rule: rule.to_string(),
            penalties,
        });
    }

    if rows.is_empty() {
        return Err(ConfigurationError::EmptyTable(path.display().to_string()));
    }

    let drugs = drug_columns.into_iter().map(|(_, drug)| drug).collect();
    Ok((drugs, rows))
}

fn check_reference_dir(dir: &Path) -> Result<(), ConfigurationError> {
    if !dir.is_dir() {
        return Err(ConfigurationError::MissingReferenceDirectory(
            dir.display().to_string(),
        ));
    }
    Ok(())
}

///
/// Load the simple score table of a locus, merging the tables of all its
/// drug classes.
///
pub fn load_simple_table(dir: &Path, locus: Locus) -> Result<SimpleScoreTable, ConfigurationError> {
    check_reference_dir(dir)?;
    let mut merged: Option<SimpleScoreTable> = None;

    for class in locus.drug_classes() {
        let pattern = score_table_pattern(dir, *class, RuleTier::Simple);
        let path = find_table(&pattern, locus, &RuleTier::Simple.to_string())?;
        let (drugs, rows) = read_wide_table(&path, SIMPLE_RULE_COLUMN)?;
        let table = SimpleScoreTable::from_rows(drugs, &rows)?;
        debug!(path = %path.display(), rows = table.len(), "loaded simple score table");

        merged = Some(match merged {
            Some(acc) => acc.merge(table)?,
            None => table,
        });
    }

    Ok(merged.unwrap_or_default())
}

///
/// Load and validate the complex rule table of a locus. Malformed rule
/// labels fail here rather than during scoring.
///
pub fn load_complex_table(dir: &Path, locus: Locus) -> Result<ComplexRuleTable, ConfigurationError> {
    check_reference_dir(dir)?;
    let mut merged: Option<ComplexRuleTable> = None;

    for class in locus.drug_classes() {
        let pattern = score_table_pattern(dir, *class, RuleTier::Complex);
        let path = find_table(&pattern, locus, &RuleTier::Complex.to_string())?;
        let (drugs, rows) = read_wide_table(&path, COMPLEX_RULE_COLUMN)?;
        let table = ComplexRuleTable::from_rows(drugs, &rows)?;
        debug!(path = %path.display(), rules = table.len(), "loaded complex rule table");

        merged = Some(match merged {
            Some(acc) => acc.merge(table),
            None => table,
        });
    }

    Ok(merged.unwrap_or_default())
}

///
/// Load the mutation comments of a locus.
///
/// The files carry a title line and a header; the columns are read by
/// position as (mutation, type, comment). Rows whose mutation cannot be
/// parsed are logged and skipped.
///
pub fn load_comment_table(dir: &Path, locus: Locus) -> Result<CommentTable, ConfigurationError> {
    check_reference_dir(dir)?;
    let mut merged = CommentTable::new();

    for class in locus.drug_classes() {
        let pattern = comment_table_pattern(dir, *class);
        let path = find_table(&pattern, locus, "comments")?;
        let table = read_comment_table(&path)?;
        debug!(path = %path.display(), rows = table.len(), "loaded comment table");
        merged = merged.merge(table);
    }

    Ok(merged)
}

fn read_comment_table(path: &Path) -> Result<CommentTable, ConfigurationError> {
    let reader = get_dynamic_reader(path).map_err(|e| table_read_error(path, e))?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut table = CommentTable::new();
    for record in rdr.records().skip(COMMENT_PREAMBLE_ROWS) {
        let record = record.map_err(|e| table_read_error(path, e))?;
        let mutation = record.get(0).unwrap_or_default();
        if mutation.is_empty() {
            continue;
        }
        let mutation_type = record.get(1);
        let comment = record.get(2).unwrap_or_default();

        if let Err(err) = table.add(mutation, mutation_type, comment) {
            warn!(table = %path.display(), "skipping comment row: {}", err);
        }
    }
    Ok(table)
}

///
/// Load everything needed to score one locus.
///
/// # Arguments
/// - dir: the reference directory
/// - locus: locus to load tables for
/// - with_comments: also load the comment tables
///
pub fn load_reference_tables(
    dir: &Path,
    locus: Locus,
    with_comments: bool,
) -> Result<ReferenceTables, ConfigurationError> {
    let simple = load_simple_table(dir, locus)?;
    let complex = load_complex_table(dir, locus)?;
    let comments = match with_comments {
        true => Some(load_comment_table(dir, locus)?),
        false => None,
    };

    Ok(ReferenceTables {
        locus,
        simple,
        complex,
        comments,
    })
}

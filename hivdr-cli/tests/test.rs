use std::path::PathBuf;
use std::process::Command;

use pretty_assertions::assert_eq;
use rstest::*;
use tempfile::tempdir;

#[fixture]
fn path_to_data() -> PathBuf {
    std::env::current_dir().unwrap().join("../tests/data")
}

fn hivdr() -> Command {
    Command::new(env!("CARGO_BIN_EXE_hivdr"))
}

#[rstest]
fn test_score_with_config(path_to_data: PathBuf) {
    let dir = tempdir().unwrap();
    let output = dir.path().join("scores.json");

    let status = hivdr()
        .arg("score")
        .arg("--quiet")
        .arg("--reports")
        .arg(path_to_data.join("reports.csv"))
        .arg("--config")
        .arg(path_to_data.join("run.toml"))
        .arg("--output")
        .arg(&output)
        .status()
        .unwrap();
    assert!(status.success());

    let scores: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    let rows = scores.as_array().unwrap();
    // 15-000107 is abandoned under abort-accession; every other scored
    // accession gets all 10 RT drugs, 13-000103 also all 5 IN drugs
    assert_eq!(rows.len(), 4 * 10 + 5);
}

#[rstest]
fn test_score_writes_observations(path_to_data: PathBuf) {
    let dir = tempdir().unwrap();
    let output = dir.path().join("scores.csv");
    let observations = dir.path().join("observations.csv");

    let status = hivdr()
        .args(["score", "--quiet", "--locus", "IN"])
        .arg("--reports")
        .arg(path_to_data.join("reports.csv"))
        .arg("--reference")
        .arg(path_to_data.join("reference"))
        .arg("--output")
        .arg(&output)
        .arg("--observations")
        .arg(&observations)
        .status()
        .unwrap();
    assert!(status.success());

    let text = std::fs::read_to_string(&observations).unwrap();
    let tokens: Vec<&str> = text
        .lines()
        .skip(1)
        .map(|l| l.split(',').nth(5).unwrap())
        .collect();
    assert_eq!(tokens, vec!["G118R", "E138K"]);
}

#[rstest]
fn test_melt_to_csv(path_to_data: PathBuf) {
    let dir = tempdir().unwrap();
    let output = dir.path().join("melted.csv");

    let status = hivdr()
        .args(["melt", "--quiet", "--locus", "IN", "--comments"])
        .arg("--reports")
        .arg(path_to_data.join("reports.csv"))
        .arg("--reference")
        .arg(path_to_data.join("reference"))
        .arg("--output")
        .arg(&output)
        .status()
        .unwrap();
    assert!(status.success());

    let text = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("mutation_type,comment"));
    assert!(lines[1].contains("G118R"));
}

#[rstest]
fn test_missing_table_fails(path_to_data: PathBuf) {
    let dir = tempdir().unwrap();

    let output = hivdr()
        .args(["score", "--quiet", "--locus", "RT"])
        .arg("--reports")
        .arg(path_to_data.join("reports.csv"))
        .arg("--reference")
        .arg(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nrti-scores-simple"));
}

#[rstest]
fn test_drugs_by_class() {
    let output = hivdr().args(["drugs", "--class", "pi"]).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.lines().skip(1).all(|l| l.starts_with("PI\t")));
}

//! Integration tests for the `cdset` binary.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const LEGACY_DOC: &str = "\
Common Data Set 2020-2021
Total all undergraduates 3,400 3,600 7,000
Total all graduate and professional students 2,000 3,000
Total first-time, first-year (degree-seeking) men who applied 11,200
Total first-time, first-year (degree-seeking) women who applied 12,300
Total first-time, first-year (degree-seeking) men who were admitted 1,100
Total first-time, first-year (degree-seeking) women who were admitted 1,250
Total full-time, first-time, first-year (degree-seeking) men who enrolled 800
Total full-time, first-time, first-year (degree-seeking) women who enrolled 850
Tuition: $59,254
Required Fees: $1,442
Room and board (on-campus): $15,908
";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("source")).unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{ "institutions": { "brown": { "name": "Brown University" } } }"#,
        )
        .unwrap();
        Self { dir }
    }

    fn with_doc(self, name: &str, text: &str) -> Self {
        std::fs::write(self.source().join(name), text).unwrap();
        self
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn source(&self) -> PathBuf {
        self.path().join("source")
    }

    fn out(&self) -> PathBuf {
        self.path().join("out")
    }

    fn config(&self) -> PathBuf {
        self.path().join("config.json")
    }

    fn cdset(&self) -> Command {
        let mut cmd = Command::cargo_bin("cdset").unwrap();
        cmd.arg("--config").arg(self.config());
        cmd
    }

    fn extract(&self) -> Command {
        let mut cmd = self.cdset();
        cmd.arg("extract")
            .arg("brown")
            .arg(self.source())
            .arg("--output-dir")
            .arg(self.out());
        cmd
    }
}

#[test]
fn test_extract_writes_dataset_and_report() {
    let ws = Workspace::new().with_doc("cds_2020-2021.txt", LEGACY_DOC);

    ws.extract()
        .assert()
        .success()
        .stdout(predicate::str::contains("2020-2021"))
        .stdout(predicate::str::contains("c1-gendered-applied"))
        .stdout(predicate::str::contains("missing"));

    let written = std::fs::read_to_string(ws.out().join("brown.json")).unwrap();
    let dataset: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(dataset["name"], "Brown University");
    assert_eq!(dataset["years"]["2020-2021"]["admissions"]["applied"], 23500);
    assert_eq!(dataset["years"]["2020-2021"]["costs"]["totalCOA"], 76604);
    assert!(written.ends_with("}\n"));
}

#[test]
fn test_extract_dry_run_writes_nothing() {
    let ws = Workspace::new().with_doc("cds_2020-2021.txt", LEGACY_DOC);

    ws.extract()
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"));

    assert!(!ws.out().join("brown.json").exists());
}

#[test]
fn test_extract_json_report() {
    let ws = Workspace::new().with_doc("cds_2020-2021.txt", LEGACY_DOC);

    let output = ws
        .extract()
        .args(["--format", "json", "--dry-run"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["years"][0]["year"], "2020-2021");
    assert_eq!(
        report["dataset"]["years"]["2020-2021"]["demographics"]["enrollment"]["total"],
        10000
    );
}

#[test]
fn test_extract_summary_csv() {
    let ws = Workspace::new().with_doc("cds_2020-2021.txt", LEGACY_DOC);
    let summary = ws.path().join("summary.csv");

    ws.extract()
        .arg("--summary")
        .arg(&summary)
        .assert()
        .success();

    let csv = std::fs::read_to_string(&summary).unwrap();
    assert!(csv.starts_with("institution,year,document,field,status,detail"));
    assert!(csv.contains("brown,2020-2021,cds_2020-2021.txt,admissions.applied,extracted,c1-gendered-applied"));
    assert!(csv.contains("admissions.acceptanceRate,derived"));
}

#[test]
fn test_extract_applies_overrides_file() {
    let ws = Workspace::new().with_doc("cds_2020-2021.txt", LEGACY_DOC);
    let overrides = ws.path().join("overrides.json");
    std::fs::write(
        &overrides,
        r#"[{ "institution": "brown", "year": "2020-2021", "field": "demographics.enrollment.graduate", "value": 3100 }]"#,
    )
    .unwrap();

    ws.extract()
        .arg("--overrides")
        .arg(&overrides)
        .assert()
        .success()
        .stdout(predicate::str::contains("overridden"));

    let dataset: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(ws.out().join("brown.json")).unwrap()).unwrap();
    assert_eq!(dataset["years"]["2020-2021"]["demographics"]["enrollment"]["graduate"], 3100);
    assert_eq!(dataset["years"]["2020-2021"]["demographics"]["enrollment"]["total"], 10100);
}

#[test]
fn test_extract_rejects_unknown_override_field() {
    let ws = Workspace::new().with_doc("cds_2020-2021.txt", LEGACY_DOC);
    let overrides = ws.path().join("overrides.json");
    std::fs::write(
        &overrides,
        r#"{ "overrides": [{ "institution": "brown", "year": "2020-2021", "field": "admissions.waitlisted", "value": 1 }] }"#,
    )
    .unwrap();

    ws.extract()
        .arg("--overrides")
        .arg(&overrides)
        .assert()
        .failure()
        .stderr(predicate::str::contains("admissions.waitlisted"));
}

#[test]
fn test_extract_rejects_override_of_wrong_kind() {
    let ws = Workspace::new().with_doc("cds_2020-2021.txt", LEGACY_DOC);
    let overrides = ws.path().join("overrides.json");
    std::fs::write(
        &overrides,
        r#"[{ "institution": "brown", "year": "2020-2021", "field": "admissions.applied", "value": "not a number" }]"#,
    )
    .unwrap();

    ws.extract()
        .arg("--overrides")
        .arg(&overrides)
        .assert()
        .failure()
        .stderr(predicate::str::contains("admissions.applied"))
        .stderr(predicate::str::contains("non-negative count"));
    assert!(!ws.out().join("brown.json").exists());
}

#[test]
fn test_extract_reports_unreadable_documents() {
    let ws = Workspace::new()
        .with_doc("cds_2020-2021.txt", LEGACY_DOC)
        .with_doc("cds_2021-2022.txt", "Common Data Set 2021-2022\n");

    ws.extract()
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped documents"))
        .stdout(predicate::str::contains("cds_2021-2022.txt"));
}

#[test]
fn test_extract_empty_source_fails() {
    let ws = Workspace::new();

    ws.extract()
        .assert()
        .failure()
        .stderr(predicate::str::contains("No PDF or text documents"));
}

#[test]
fn test_inspect_prints_record() {
    let ws = Workspace::new().with_doc("cds_2020-2021.txt", LEGACY_DOC);

    ws.cdset()
        .arg("inspect")
        .arg(ws.source().join("cds_2020-2021.txt"))
        .args(["--institution", "brown"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"applied\": 23500"))
        .stdout(predicate::str::contains("extracted"));
}

#[test]
fn test_rules_filtered_by_field() {
    Command::cargo_bin("cdset")
        .unwrap()
        .args(["rules", "--field", "costs."])
        .assert()
        .success()
        .stdout(predicate::str::contains("g1-tuition-colon"))
        .stdout(predicate::str::contains("c1-gendered-applied").not());
}

#[test]
fn test_rules_unknown_field_fails() {
    Command::cargo_bin("cdset")
        .unwrap()
        .args(["rules", "--field", "nothing."])
        .assert()
        .failure();
}

#[test]
fn test_config_init_set_get() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("nested").join("config.json");
    let cdset = || {
        let mut cmd = Command::cargo_bin("cdset").unwrap();
        cmd.arg("--config").arg(&config);
        cmd
    };

    cdset().args(["config", "init"]).assert().success();
    assert!(config.exists());

    cdset().args(["config", "init"]).assert().failure();

    cdset()
        .args(["config", "set", "institutions.brown.name", "Brown University"])
        .assert()
        .success();

    cdset()
        .args(["config", "get", "institutions.brown.name"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Brown University\""));

    cdset()
        .args(["config", "set", "extraction.race_sum_tolerance", "5"])
        .assert()
        .failure();

    cdset()
        .args(["config", "get", "extraction.race_sum_tolerance"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.02"));
}

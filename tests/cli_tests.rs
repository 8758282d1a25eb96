//! CLI integration tests for the `intake` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_purchase_form(dir: &Path) -> PathBuf {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Formulario de Compras").unwrap();
    sheet.write_string(1, 3, "R60-001").unwrap();
    sheet.write_string(3, 3, "Jane Doe").unwrap();
    sheet.write_number(9, 0, 1.0).unwrap();
    sheet.write_string(9, 1, "Widgets").unwrap();
    let path = dir.join("compras.xlsx");
    workbook.save(&path).unwrap();
    path
}

#[test]
fn test_parse_prints_submission_summary() {
    let dir = TempDir::new().unwrap();
    let path = write_purchase_form(dir.path());

    Command::cargo_bin("intake")
        .unwrap()
        .arg("parse")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("COMPRAS"))
        .stdout(predicate::str::contains("R60-001"))
        .stdout(predicate::str::contains("Jane Doe"));
}

#[test]
fn test_parse_json_output() {
    let dir = TempDir::new().unwrap();
    let path = write_purchase_form(dir.path());

    Command::cargo_bin("intake")
        .unwrap()
        .arg("parse")
        .arg(&path)
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"form_kind\": \"COMPRAS\""))
        .stdout(predicate::str::contains("\"form_number\": \"R60-001\""));
}

#[test]
fn test_parse_missing_file_fails() {
    Command::cargo_bin("intake")
        .unwrap()
        .arg("parse")
        .arg("no_such_form.xlsx")
        .assert()
        .failure();
}

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const VENDOR_A: &str = r#"
issuer: VendorA Inc.
keywords:
  - VendorA Inc\.
fields:
  date: Date:\s+(\d{4}-\d{2}-\d{2})
  ht: Subtotal:\s+([\d.,]+)
  tva_rate: VAT rate:\s+(\d+\s?%)
  tva_amount: VAT amount:\s+([\d.,]+)
  amount: Total:\s+([\d.,]+)
"#;

const INVOICE: &str = "VendorA Inc.\nInvoice #A-0042\nDate: 2024-03-09\n\
    Subtotal: 100.00\nVAT rate: 20%\nVAT amount: 20.00\nTotal: 120.00\n";

/// Workspace with a templates directory and a config file pointing at it.
fn workspace(templates: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let template_dir = dir.path().join("Templates");
    fs::create_dir(&template_dir).unwrap();
    for (name, content) in templates {
        fs::write(template_dir.join(name), content).unwrap();
    }

    let config = serde_json::json!({
        "document": dir.path().join("Invoice.txt"),
        "templates": { "dir": template_dir },
        "sheets": { "spreadsheet_id": "sheet-123" }
    });
    fs::write(dir.path().join("config.json"), config.to_string()).unwrap();
    dir
}

fn billsheet(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("billsheet").unwrap();
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(dir.join("config.json"));
    cmd
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("billsheet")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("templates"))
        .stdout(predicate::str::contains("auth"));
}

#[test]
fn test_dry_run_prints_record() {
    let dir = workspace(&[("vendorA.yml", VENDOR_A)]);
    fs::write(dir.path().join("Invoice.txt"), INVOICE).unwrap();

    billsheet(dir.path())
        .args(["process", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"date\": \"09/03/2024\""))
        .stdout(predicate::str::contains("\"total_amount\""))
        .stdout(predicate::str::contains("120"))
        .stderr(predicate::str::contains("Template loaded from"));
}

#[test]
fn test_dry_run_without_match_exits_cleanly() {
    let dir = workspace(&[("vendorA.yml", VENDOR_A)]);
    let document = dir.path().join("other.txt");
    fs::write(&document, "Another Supplier\nTotal: 10.00\n").unwrap();

    billsheet(dir.path())
        .arg("process")
        .arg(&document)
        .arg("--dry-run")
        .assert()
        .success()
        .stderr(predicate::str::contains("No invoice data extracted"));
}

#[test]
fn test_missing_document_is_not_fatal() {
    let dir = workspace(&[("vendorA.yml", VENDOR_A)]);

    billsheet(dir.path())
        .args(["process", "absent.pdf", "--dry-run"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Error during extraction"));
}

#[test]
fn test_process_extracts_before_needing_a_spreadsheet() {
    let dir = workspace(&[("vendorA.yml", VENDOR_A)]);
    fs::write(dir.path().join("Invoice.txt"), INVOICE).unwrap();
    let config = serde_json::json!({
        "document": dir.path().join("Invoice.txt"),
        "templates": { "dir": dir.path().join("Templates") }
    });
    fs::write(dir.path().join("config.json"), config.to_string()).unwrap();

    billsheet(dir.path())
        .arg("process")
        .assert()
        .success()
        .stderr(predicate::str::contains("Matched template 'vendorA'"))
        .stderr(predicate::str::contains("Invoice record:"))
        .stderr(predicate::str::contains("\"date\":\"09/03/2024\""))
        .stderr(predicate::str::contains("sheets.spreadsheet_id is not set"));
}

#[test]
fn test_broken_template_is_fatal() {
    let dir = workspace(&[
        ("vendorA.yml", VENDOR_A),
        ("broken.yml", "issuer: [unclosed\n"),
    ]);
    fs::write(dir.path().join("Invoice.txt"), INVOICE).unwrap();

    billsheet(dir.path())
        .args(["process", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.yml"));
}

#[test]
fn test_templates_listing() {
    let dir = workspace(&[("vendorA.yml", VENDOR_A)]);

    billsheet(dir.path())
        .arg("templates")
        .assert()
        .success()
        .stdout(predicate::str::contains("vendorA"))
        .stdout(predicate::str::contains("VendorA Inc."))
        .stdout(predicate::str::contains("1 templates loaded"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("billsheet")
        .unwrap()
        .arg("--config")
        .arg(dir.path().join("nope.json"))
        .arg("templates")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_config_init_refuses_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("config.json");

    Command::cargo_bin("billsheet")
        .unwrap()
        .args(["config", "init", "--output"])
        .arg(&output)
        .assert()
        .success();
    assert!(output.exists());

    Command::cargo_bin("billsheet")
        .unwrap()
        .args(["config", "init", "--output"])
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_config_show_uses_explicit_file() {
    let dir = workspace(&[]);

    billsheet(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sheet-123"))
        .stdout(predicate::str::contains("USER_ENTERED"));
}

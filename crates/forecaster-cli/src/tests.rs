//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;
use std::path::PathBuf;

use forecaster_core::{FieldKind, FieldValue, SectionId};
use tempfile::TempDir;

use crate::commands;

const SECTIONS_TOML: &str = r#"
["Section A"]
"Total Admissions (5yr)" = 1000
"Withdrawals" = 20

["Section B"]
"New Inquiries" = 150
"Primary Source" = "Word of Mouth"
"Conversion Rate" = 50

["Section C"]
"Max Capacity" = 1000
"Promotion Rate" = 80
"Sibling Families" = 50

["Section D"]
"Competitor Schools" = 2
"Economic Status" = "Developing"
"Local Growth" = "Rapidly Increasing"
"#;

fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content).unwrap();
    path
}

fn sections_json() -> String {
    serde_json::json!({
        "A": { "Total Admissions (5yr)": 500 },
        "b": { "Conversion Rate": 30, "Primary Source": "Social Media" },
        "C": { "Promotion Rate": 95 },
        "D": { "Local Growth": "Declining" }
    })
    .to_string()
}

// ========== Section File Tests ==========

#[test]
fn test_load_sections_toml() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "sections.toml", SECTIONS_TOML.as_bytes());

    let sections = commands::load_sections(&path).unwrap();
    assert_eq!(sections.len(), 4);
    assert_eq!(sections[0].0, SectionId::A);
    assert_eq!(
        sections[1].1.get("Primary Source"),
        Some(&FieldValue::Text("Word of Mouth".to_string()))
    );
    assert_eq!(
        sections[3].1.get("Local Growth"),
        Some(&FieldValue::Text("Rapidly Increasing".to_string()))
    );
}

#[test]
fn test_load_sections_json_sorted() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "sections.json", sections_json().as_bytes());

    let sections = commands::load_sections(&path).unwrap();
    let ids: Vec<SectionId> = sections.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, SectionId::ALL.to_vec());
    assert_eq!(
        sections[0].1.get("Total Admissions (5yr)"),
        Some(&FieldValue::Integer(500))
    );
}

#[test]
fn test_load_sections_unknown_section() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "sections.json", br#"{ "E": { "Withdrawals": 1 } }"#);

    let err = commands::load_sections(&path).unwrap_err();
    assert!(err.to_string().contains("Unknown section"));
}

#[test]
fn test_load_sections_duplicate_section() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "sections.json",
        br#"{ "A": { "Withdrawals": 1 }, "Section A": { "Withdrawals": 2 } }"#,
    );

    let err = commands::load_sections(&path).unwrap_err();
    assert!(err.to_string().contains("more than once"));
}

#[test]
fn test_load_sections_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "sections.yaml", b"A: {}");

    let err = commands::load_sections(&path).unwrap_err();
    assert!(err.to_string().contains("Unsupported input format"));
}

#[test]
fn test_load_sections_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = commands::load_sections(&dir.path().join("absent.json"));
    assert!(result.is_err());
}

// ========== Forecast Command Tests ==========

#[test]
fn test_cmd_forecast_pdf() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "sections.toml", SECTIONS_TOML.as_bytes());
    let output = dir.path().join("report.pdf");

    let path = commands::cmd_forecast(
        "Greenfield Academy",
        &input,
        Some(&output),
        "pdf",
        true,
        None,
    )
    .unwrap();

    assert_eq!(path, output);
    let bytes = std::fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"%PDF-1.4"));
    let needle: &[u8] = b"(Growth Forecast Score: 140/200) Tj";
    assert!(bytes.windows(needle.len()).any(|w| w == needle));
}

#[test]
fn test_cmd_forecast_json() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "sections.json", sections_json().as_bytes());
    let output = dir.path().join("report.json");

    commands::cmd_forecast(
        "Hillside School",
        &input,
        Some(&output),
        "json",
        false,
        None,
    )
    .unwrap();

    let json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&output).unwrap()).unwrap();
    // 30 + 18 + 47.5 + 5 = 100.5, rounds to even
    assert_eq!(json["score"], 100);
    assert_eq!(json["classification"], "stable");
    assert_eq!(json["organization_name"], "Hillside School");
}

#[test]
fn test_cmd_forecast_with_history() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "sections.toml", SECTIONS_TOML.as_bytes());
    let history = write_file(&dir, "history.csv", b"year,admissions\n2025,230\n");
    let output = dir.path().join("report.pdf");

    let result = commands::cmd_forecast(
        "Greenfield Academy",
        &input,
        Some(&output),
        "pdf",
        false,
        Some(&history),
    );
    assert!(result.is_ok());
}

#[test]
fn test_cmd_forecast_rejects_bad_history() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "sections.toml", SECTIONS_TOML.as_bytes());
    let history = write_file(&dir, "history.pdf", b"%PDF");
    let output = dir.path().join("report.pdf");

    let result = commands::cmd_forecast(
        "Greenfield Academy",
        &input,
        Some(&output),
        "pdf",
        false,
        Some(&history),
    );
    assert!(result.is_err());
    assert!(!output.exists());
}

#[test]
fn test_cmd_forecast_missing_scored_field() {
    let dir = TempDir::new().unwrap();
    let input = write_file(
        &dir,
        "sections.json",
        br#"{ "A": { "Total Admissions (5yr)": 500 } }"#,
    );
    let output = dir.path().join("report.pdf");

    let err = commands::cmd_forecast("Greenfield Academy", &input, Some(&output), "pdf", false, None)
        .unwrap_err();
    assert!(format!("{:#}", err).contains("Conversion Rate"));
    assert!(!output.exists());
}

#[test]
fn test_cmd_forecast_out_of_range() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "sections.json", br#"{ "B": { "Conversion Rate": 150 } }"#);

    let err = commands::cmd_forecast("Greenfield Academy", &input, None, "pdf", false, None)
        .unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("Invalid values for Section B"));
    assert!(message.contains("between 0 and 100"));
}

#[test]
fn test_cmd_forecast_blank_org() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "sections.toml", SECTIONS_TOML.as_bytes());

    let result = commands::cmd_forecast("   ", &input, None, "pdf", false, None);
    assert!(result.is_err());
}

#[test]
fn test_cmd_forecast_invalid_format() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "sections.toml", SECTIONS_TOML.as_bytes());

    let err = commands::cmd_forecast("Greenfield Academy", &input, None, "docx", false, None)
        .unwrap_err();
    assert!(err.to_string().contains("Unknown report format"));
}

#[test]
fn test_cmd_forecast_unencodable_org() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "sections.toml", SECTIONS_TOML.as_bytes());
    let output = dir.path().join("report.pdf");

    let result = commands::cmd_forecast("北京国际学校", &input, Some(&output), "pdf", false, None);
    assert!(result.is_err());
    assert!(!output.exists());
}

// ========== Schema Command Tests ==========

#[test]
fn test_cmd_schema() {
    assert!(commands::cmd_schema().is_ok());
}

#[test]
fn test_describe_kind() {
    assert_eq!(
        commands::describe_kind(&FieldKind::Integer { min: 0, max: 20 }),
        "0-20"
    );
    assert_eq!(commands::describe_kind(&FieldKind::Percentage), "0-100 %");
    assert_eq!(
        commands::describe_kind(&FieldKind::Choice {
            options: &["Declining", "Stable"]
        }),
        "Declining | Stable"
    );
}

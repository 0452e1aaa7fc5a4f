//! Integration tests for the `lessons` CLI binary.
//!
//! These tests use `assert_cmd` and `predicates` to exercise the expand,
//! validate, book and bill subcommands through the actual binary, including
//! stdin input, policy and schedule files, exit codes and error reporting.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

/// Every request in the fixtures lies in January 2024.
const NOW: &str = "2024-01-01T00:00:00Z";

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

/// Helper: the binary with the clock pinned.
fn lessons() -> Command {
    let mut cmd = Command::cargo_bin("lessons").unwrap();
    cmd.args(["--now", NOW]);
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout must be JSON")
}

fn starts(json: &Value) -> Vec<&str> {
    json.as_array()
        .unwrap()
        .iter()
        .map(|o| o["start"].as_str().unwrap())
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Expand subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn expand_daily_until_the_third() {
    let output = lessons()
        .args(["expand", "--start", "2024-01-01T10:00:00Z", "--end-date", "2024-01-03"])
        .args(["--mode", "Daily"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(
        starts(&json),
        vec![
            "2024-01-01T10:00:00+00:00",
            "2024-01-02T10:00:00+00:00",
            "2024-01-03T10:00:00+00:00",
        ]
    );
    assert_eq!(json[0]["end"], "2024-01-01T11:00:00+00:00");
}

#[test]
fn expand_monthly_steps_thirty_days() {
    let output = lessons()
        .args(["expand", "--start", "2024-01-01T10:00:00Z", "--end-date", "2024-02-02"])
        .args(["--mode", "monthly", "--duration", "90"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(
        starts(&json),
        vec!["2024-01-01T10:00:00+00:00", "2024-01-31T10:00:00+00:00"]
    );
    assert_eq!(json[1]["end"], "2024-01-31T11:30:00+00:00");
}

#[test]
fn expand_in_policy_timezone_keeps_local_time_across_dst() {
    let output = lessons()
        .args(["--policy", &fixture("policy.json")])
        .args(["expand", "--start", "2024-03-04T15:00:00Z", "--end-date", "2024-03-18"])
        .args(["--mode", "Weekly"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(
        starts(&stdout_json(&output)),
        vec![
            "2024-03-04T10:00:00-05:00",
            "2024-03-11T10:00:00-04:00",
            "2024-03-18T10:00:00-04:00",
        ]
    );
}

#[test]
fn expand_without_mode_is_one_occurrence() {
    let output = lessons()
        .args(["expand", "--start", "2024-01-01T10:00:00Z", "--end-date", "2024-01-30"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(starts(&stdout_json(&output)), vec!["2024-01-01T10:00:00+00:00"]);
}

#[test]
fn expand_unknown_mode_fails() {
    lessons()
        .args(["expand", "--start", "2024-01-01T10:00:00Z", "--mode", "Yearly"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Yearly"));
}

#[test]
fn expand_rejects_malformed_start() {
    lessons()
        .args(["expand", "--start", "next tuesday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("RFC 3339"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Validate subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn validate_accepts_and_normalizes_request() {
    let output = lessons()
        .args(["validate", "-i", &fixture("request.json")])
        .args(["--schedule", &fixture("schedule.json")])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["status"], "accepted");
    assert_eq!(json["request"]["notes"], "Bring the homework");
    assert_eq!(json["occurrences"].as_array().unwrap().len(), 3);
}

#[test]
fn validate_reports_tutor_conflict_and_exits_one() {
    let output = lessons()
        .args(["validate", "-i", &fixture("request_conflict.json")])
        .args(["--schedule", &fixture("schedule.json")])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["status"], "rejected");
    let violation = &json["violations"][0];
    assert_eq!(violation["kind"], "ScheduleConflict");
    assert_eq!(violation["participant"], "tutor");
    assert_eq!(
        violation["message"],
        "The tutor already has a lesson at the requested time: Java on 2024-01-10 10:00"
    );
}

#[test]
fn validate_accumulates_every_violation() {
    let output = lessons()
        .args(["validate", "-i", &fixture("request_invalid.json")])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    let kinds: Vec<&str> = json["violations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"InvalidDuration"), "{:?}", kinds);
    assert!(kinds.contains(&"OutsideWorkingHours"), "{:?}", kinds);
}

#[test]
fn validate_reads_stdin_and_honours_now() {
    let request = r#"{"student_id":1,"subject":"Python","start":"2024-01-10T10:00:00Z","duration_minutes":60}"#;

    Command::cargo_bin("lessons")
        .unwrap()
        .args(["--now", "2024-02-01T00:00:00Z", "validate"])
        .write_stdin(request)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("PastDate"))
        .stdout(predicate::str::contains("The lesson date must be in the future."));
}

#[test]
fn validate_rejects_malformed_request() {
    lessons()
        .arg("validate")
        .write_stdin(r#"{"student_id":1}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse lesson request"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Book subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn book_commits_in_order_and_rejects_later_overlaps() {
    let output = lessons()
        .args(["book", "-i", &fixture("requests.json")])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json = stdout_json(&output);
    let bookings = json["bookings"].as_array().unwrap();
    assert_eq!(bookings.len(), 4);

    assert_eq!(bookings[0]["status"], "booked");
    assert_eq!(bookings[0]["lesson_id"], 1);
    assert_eq!(bookings[0]["amount"], "30.00");

    // Same tutor, 10:30-11:30 against the 10:00-11:00 lesson just booked.
    assert_eq!(bookings[1]["status"], "rejected");
    assert_eq!(bookings[1]["violations"][0]["kind"], "ScheduleConflict");

    // 19:30 + 60 minutes runs past closing.
    assert_eq!(bookings[2]["status"], "rejected");
    assert_eq!(bookings[2]["violations"][0]["kind"], "OutsideWorkingHours");

    // Back-to-back with the first lesson is fine.
    assert_eq!(bookings[3]["status"], "booked");
    assert_eq!(bookings[3]["lesson_id"], 2);
    assert_eq!(bookings[3]["occurrences"], 3);
    assert_eq!(bookings[3]["amount"], "135.00");

    assert_eq!(json["schedule"].as_array().unwrap().len(), 4);
}

#[test]
fn book_continues_ids_after_seeded_schedule() {
    let requests = r#"[{"student_id":1,"subject":"Python","start":"2024-01-11T10:00:00Z","duration_minutes":60}]"#;

    let output = lessons()
        .args(["book", "--schedule", &fixture("schedule.json")])
        .write_stdin(requests)
        .output()
        .unwrap();

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["bookings"][0]["lesson_id"], 2);
    assert_eq!(json["schedule"].as_array().unwrap().len(), 2);
}

// ─────────────────────────────────────────────────────────────────────────────
// Bill subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn bill_uses_default_rate() {
    let output = lessons()
        .args(["bill", "-i", &fixture("request.json")])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["occurrences"], 3);
    assert_eq!(json["rate_per_minute"], "0.50");
    assert_eq!(json["amount"], "90.00");
}

#[test]
fn bill_uses_policy_rate() {
    let output = lessons()
        .args(["--policy", &fixture("policy.json"), "bill", "-i", &fixture("request.json")])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["amount"], "135.00");
}

// ─────────────────────────────────────────────────────────────────────────────
// Error handling and output
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn missing_input_file_fails() {
    lessons()
        .args(["validate", "-i", "/nonexistent/request.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}

#[test]
fn invalid_policy_file_fails() {
    lessons()
        .args(["--policy", &fixture("request.json"), "bill", "-i", &fixture("request.json")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid policy file"));
}

#[test]
fn output_flag_writes_file() {
    let output_path = "/tmp/lessons-test-expand-output.json";
    let _ = std::fs::remove_file(output_path);

    lessons()
        .args(["expand", "--start", "2024-01-01T10:00:00Z", "-o", output_path])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let content = std::fs::read_to_string(output_path).expect("output file must exist");
    assert!(content.contains("2024-01-01T10:00:00+00:00"));

    let _ = std::fs::remove_file(output_path);
}

#[test]
fn no_subcommand_shows_usage() {
    Command::cargo_bin("lessons")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

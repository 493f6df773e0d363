//! End-to-end tests for the `tripmerge` binary.
//!
//! Tests verify:
//! 1. Persons from all inputs come out ordered by depart time
//! 2. Ties keep the order inputs were given in
//! 3. Vehicles stay directly in front of the person that followed them
//! 4. The envelope is written even when there is nothing to merge
//! 5. Failures exit non-zero with a diagnostic naming the input

use std::io::Write;
use std::process::{Command, Output};
use tempfile::{NamedTempFile, TempDir};
use tripmerge::streaming::{ROUTES_FOOTER, ROUTES_HEADER};

fn tripmerge() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tripmerge"))
}

fn route_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file.flush().unwrap();
    file
}

fn run_merge(files: &[&NamedTempFile], extra: &[&str]) -> Output {
    let mut cmd = tripmerge();
    cmd.arg("merge").args(extra);
    for file in files {
        cmd.arg(file.path());
    }
    cmd.output().expect("Failed to run tripmerge merge")
}

/// Person ids in output order.
fn person_ids(doc: &str) -> Vec<String> {
    doc.split("<person id=\"")
        .skip(1)
        .map(|rest| rest[..rest.find('"').unwrap()].to_string())
        .collect()
}

const SOURCE_A: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<routes>
    <vehicle id="carA" depart="triggered"><route edges="e1 e2"/></vehicle>
    <person id="A2" depart="2.00"><ride from="e1" to="e2" lines="carA"/></person>
    <person id="A5" depart="5.00"><walk edges="e3"/></person>
</routes>
"#;

const SOURCE_B: &str = r#"<routes>
    <person id="B3" depart="3"><walk edges="e4"/></person>
    <vehicle id="busB1" depart="triggered"/>
    <vehicle id="busB2" depart="triggered"/>
    <person id="B5" depart="5"><ride from="e5" to="e6" lines="busB2"/></person>
</routes>"#;

#[test]
fn test_merge_orders_by_depart_with_tie_break() {
    let a = route_file(SOURCE_A);
    let b = route_file(SOURCE_B);

    let output = run_merge(&[&a, &b], &[]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let doc = String::from_utf8(output.stdout).unwrap();
    assert!(doc.starts_with(ROUTES_HEADER));
    assert!(doc.ends_with(ROUTES_FOOTER));
    assert_eq!(person_ids(&doc), vec!["A2", "B3", "A5", "B5"]);
}

#[test]
fn test_input_order_decides_ties() {
    let a = route_file(SOURCE_A);
    let b = route_file(SOURCE_B);

    let output = run_merge(&[&b, &a], &[]);
    let doc = String::from_utf8(output.stdout).unwrap();
    assert_eq!(person_ids(&doc), vec!["A2", "B3", "B5", "A5"]);
}

#[test]
fn test_vehicles_precede_their_person() {
    let a = route_file(SOURCE_A);
    let b = route_file(SOURCE_B);

    let doc = String::from_utf8(run_merge(&[&a, &b], &[]).stdout).unwrap();
    let expected_b5 = "<vehicle id=\"busB1\" depart=\"triggered\"/>\n    \
                       <vehicle id=\"busB2\" depart=\"triggered\"/>\n    \
                       <person id=\"B5\" depart=\"5\">";
    assert!(doc.contains(expected_b5), "{doc}");

    let car = doc.find("id=\"carA\"").unwrap();
    let a2 = doc.find("id=\"A2\"").unwrap();
    let b3 = doc.find("id=\"B3\"").unwrap();
    assert!(car < a2 && a2 < b3);
}

#[test]
fn test_single_source_round_trip() {
    let b = route_file(SOURCE_B);
    let doc = String::from_utf8(run_merge(&[&b], &[]).stdout).unwrap();

    let body = &SOURCE_B["<routes>\n    ".len()..SOURCE_B.len() - "</routes>".len()];
    assert_eq!(doc, format!("{}{}{}", ROUTES_HEADER, body, ROUTES_FOOTER));
}

#[test]
fn test_empty_inputs_write_envelope_only() {
    let empty = route_file("<routes>\n</routes>\n");
    let orphans = route_file("<routes><vehicle id=\"lonely\"/></routes>");

    let output = run_merge(&[&empty, &orphans], &[]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        format!("{}{}", ROUTES_HEADER, ROUTES_FOOTER)
    );
}

#[test]
fn test_output_file_and_stats() {
    let a = route_file(SOURCE_A);
    let b = route_file(SOURCE_B);
    let dir = TempDir::new().unwrap();
    let out_path = dir.path().join("merged.rou.xml");

    let output = run_merge(
        &[&a, &b],
        &["--stats", "-o", out_path.to_str().unwrap()],
    );
    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Merge stats:"), "{stderr}");
    assert!(stderr.contains("Persons: 4"), "{stderr}");
    assert!(stderr.contains("Vehicles: 3"), "{stderr}");

    let doc = std::fs::read_to_string(&out_path).unwrap();
    assert_eq!(person_ids(&doc), vec!["A2", "B3", "A5", "B5"]);
}

#[test]
fn test_deterministic_output() {
    let a = route_file(SOURCE_A);
    let b = route_file(SOURCE_B);

    let first = run_merge(&[&a, &b], &[]).stdout;
    let second = run_merge(&[&a, &b], &[]).stdout;
    assert_eq!(first, second);
}

#[test]
fn test_missing_input_fails_without_output() {
    let a = route_file(SOURCE_A);
    let dir = TempDir::new().unwrap();
    let out_path = dir.path().join("merged.rou.xml");

    let output = tripmerge()
        .args(["merge", "-o", out_path.to_str().unwrap()])
        .arg(a.path())
        .arg("/nonexistent/missing.rou.xml")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot open input"), "{stderr}");
    assert!(stderr.contains("missing.rou.xml"), "{stderr}");
    assert!(!out_path.exists());
}

#[test]
fn test_malformed_depart_fails_after_earlier_groups() {
    let bad = route_file(
        r#"<routes>
    <person id="early" depart="1"/>
    <person id="broken" depart="at noon"/>
</routes>"#,
    );

    let output = run_merge(&[&bad], &[]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("malformed person"), "{stderr}");
    assert!(stderr.contains("broken"), "{stderr}");

    let doc = String::from_utf8(output.stdout).unwrap();
    assert!(doc.contains("id=\"early\""));
    assert!(!doc.ends_with(ROUTES_FOOTER));
}

#[test]
fn test_check_sorted_rejects_unsorted_input() {
    let unsorted = route_file(
        r#"<routes><person id="late" depart="9"/><person id="early" depart="1"/></routes>"#,
    );

    let lenient = run_merge(&[&unsorted], &[]);
    assert!(lenient.status.success());

    let strict = run_merge(&[&unsorted], &["--check-sorted"]);
    assert!(!strict.status.success());
    assert!(String::from_utf8_lossy(&strict.stderr).contains("not sorted"));
}

#[test]
fn test_stdin_input() {
    let a = route_file(SOURCE_A);

    let mut child = tripmerge()
        .args(["merge", "-"])
        .arg(a.path())
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(SOURCE_B.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    let doc = String::from_utf8(output.stdout).unwrap();
    assert_eq!(person_ids(&doc), vec!["A2", "B3", "B5", "A5"]);
}

#[test]
fn test_verify_command() {
    let a = route_file(SOURCE_A);
    let unsorted = route_file(r#"<routes><person depart="2"/><person depart="1"/></routes>"#);

    let ok = tripmerge().arg("verify").arg(a.path()).output().unwrap();
    assert!(ok.status.success());
    let stdout = String::from_utf8_lossy(&ok.stdout);
    assert!(stdout.contains("sorted (persons: 2, vehicles: 1"), "{stdout}");

    let bad = tripmerge().arg("verify").arg(unsorted.path()).output().unwrap();
    assert!(!bad.status.success());
    assert!(String::from_utf8_lossy(&bad.stderr).contains("#2"));
}

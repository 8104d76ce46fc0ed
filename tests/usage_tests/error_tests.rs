use regex::Regex;

use crate::test_framework::*;

#[test]
fn missing_source() {
    run(TestDesc {
        expected_exit_code: 10,
        expected_output_messages: vec![
            (1, Regex::new("Failed to open source 'input.txt'").unwrap()),
            (0, Regex::new("finished in").unwrap()),
        ],
        expected_files: vec![("output.txt", None)],
        ..Default::default()
    });
}

/// The destination's parent folder doesn't exist, so it can't be created.
#[test]
fn dest_not_creatable() {
    run(TestDesc {
        setup_files: vec![("input.txt", contents(10))],
        args: vec!["input.txt".to_string(), "missing/output.txt".to_string()],
        expected_exit_code: 11,
        expected_output_messages: vec![
            (1, Regex::new("Failed to create destination 'missing/output.txt'").unwrap()),
        ],
        ..Default::default()
    });
}

#[test]
fn quiet_and_verbose_conflict() {
    run(TestDesc {
        setup_files: vec![("input.txt", contents(10))],
        args: vec!["-q".to_string(), "-v".to_string()],
        expected_exit_code: 2,
        expected_output_messages: vec![
            (1, Regex::new("cannot be used with").unwrap()),
        ],
        expected_files: vec![("output.txt", None)],
        ..Default::default()
    });
}

#[test]
fn unknown_variant() {
    run(TestDesc {
        setup_files: vec![("input.txt", contents(10))],
        args: vec!["--variant".to_string(), "carrier-pigeon".to_string()],
        expected_exit_code: 2,
        expected_output_messages: vec![
            (1, Regex::new("invalid value 'carrier-pigeon'").unwrap()),
        ],
        ..Default::default()
    });
}

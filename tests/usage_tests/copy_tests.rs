use crate::test_framework::*;

/// With no arguments, input.txt in the working directory is copied to output.txt.
#[test]
fn default_paths() {
    run(TestDesc {
        setup_files: vec![("input.txt", contents(250))],
        expected_exit_code: 0,
        expected_output_messages: channel_summary(3, 13, 13),
        expected_files: vec![("output.txt", Some(contents(250)))],
        ..Default::default()
    });
}

#[test]
fn explicit_paths() {
    run(TestDesc {
        setup_files: vec![("src.bin", contents(1000))],
        args: vec!["src.bin".to_string(), "dest.bin".to_string()],
        expected_exit_code: 0,
        expected_output_messages: channel_summary(10, 50, 50),
        expected_files: vec![
            ("dest.bin", Some(contents(1000))),
            ("output.txt", None),
        ],
        ..Default::default()
    });
}

/// An existing destination is truncated, not appended to or partially overwritten.
#[test]
fn dest_is_overwritten() {
    run(TestDesc {
        setup_files: vec![
            ("input.txt", b"short".to_vec()),
            ("output.txt", contents(500)),
        ],
        expected_exit_code: 0,
        expected_files: vec![("output.txt", Some(b"short".to_vec()))],
        ..Default::default()
    });
}

#[test]
fn empty_input() {
    run(TestDesc {
        setup_files: vec![("input.txt", vec![])],
        expected_exit_code: 0,
        expected_output_messages: channel_summary(0, 0, 0),
        expected_files: vec![("output.txt", Some(vec![]))],
        ..Default::default()
    });
}

/// Large enough that the source and sink overlap for a while.
#[test]
fn larger_file() {
    run(TestDesc {
        setup_files: vec![("input.txt", contents(100_003))],
        expected_exit_code: 0,
        expected_output_messages: channel_summary(1001, 5001, 5001),
        expected_files: vec![("output.txt", Some(contents(100_003)))],
        ..Default::default()
    });
}

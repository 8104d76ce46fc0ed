use regex::Regex;

use crate::test_framework::*;

#[test]
fn stats() {
    let mut expected_output_messages = channel_summary(3, 13, 13);
    expected_output_messages.push((1, Regex::new(r"source: 3 chunks in, 3 chunks out, 250 B \(.*/s\)").unwrap()));
    expected_output_messages.push((1, Regex::new(r"rechunk: 3 chunks in, 13 chunks out, 250 B").unwrap()));
    expected_output_messages.push((1, Regex::new(r"sink: 13 chunks in, 13 chunks out, 250 B").unwrap()));
    run(TestDesc {
        setup_files: vec![("input.txt", contents(250))],
        args: vec!["--stats".to_string()],
        expected_exit_code: 0,
        expected_output_messages,
        expected_files: vec![("output.txt", Some(contents(250)))],
        ..Default::default()
    });
}

/// Quiet hides the per-stage summaries, but the copy still happens.
#[test]
fn quiet() {
    run(TestDesc {
        setup_files: vec![("input.txt", contents(250))],
        args: vec!["--quiet".to_string()],
        expected_exit_code: 0,
        expected_output_messages: vec![
            (0, Regex::new("times").unwrap()),
            (0, Regex::new("finished in").unwrap()),
        ],
        expected_files: vec![("output.txt", Some(contents(250)))],
        ..Default::default()
    });
}

#[test]
fn verbose() {
    run(TestDesc {
        setup_files: vec![("input.txt", contents(250))],
        args: vec!["--verbose".to_string()],
        expected_exit_code: 0,
        expected_output_messages: vec![
            (1, Regex::new("DEBUG .*Copying 'input.txt' => 'output.txt' \\(Channel variant, 250 bytes\\)").unwrap()),
            (1, Regex::new("sink: wrote 13 times").unwrap()),
        ],
        expected_files: vec![("output.txt", Some(contents(250)))],
        ..Default::default()
    });
}

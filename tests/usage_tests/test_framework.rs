use std::path::PathBuf;

use regex::Regex;
use tempdir::TempDir;

use crate::test_utils::run_process_with_live_output;

/// Describes a test, i.e. the files to set up, the arguments to run chunkpipe with and what we
/// expect to happen.
#[derive(Default)]
pub struct TestDesc<'a> {
    /// Files to create in the temporary folder before running chunkpipe (e.g. the source).
    pub setup_files: Vec<(&'a str, Vec<u8>)>,
    /// Arguments provided to chunkpipe. Relative paths are relative to the temporary folder.
    pub args: Vec<String>,
    /// The expected exit code of chunkpipe (e.g. 0 for success).
    pub expected_exit_code: i32,
    /// Messages that are expected to be present in chunkpipe's stdout/stderr,
    /// along with the expected number of occurences (use zero to indicate that a message should _not_ appear).
    pub expected_output_messages: Vec<(usize, Regex)>,
    /// The files at the given paths are expected to have the given contents (None for non-existent).
    pub expected_files: Vec<(&'a str, Option<Vec<u8>>)>,
}

/// Checks that running chunkpipe with the setup described by the TestDesc behaves as described by the TestDesc.
pub fn run(desc: TestDesc) {
    let temp_folder = TempDir::new("chunkpipe-test").unwrap();
    let mut temp_folder = temp_folder.path().to_path_buf();
    if let Ok(o) = std::env::var("CHUNKPIPE_TEST_TEMP_OVERRIDE") {
        // For keeping test data around afterwards
        std::fs::create_dir_all(&o).expect("Failed to create override dir");
        temp_folder = PathBuf::from(o);
    }

    for (p, contents) in desc.setup_files {
        std::fs::write(temp_folder.join(p), contents).expect("Failed to create setup file");
    }

    let chunkpipe_path = env!("CARGO_BIN_EXE_chunkpipe");
    let output = run_process_with_live_output(
        std::process::Command::new(chunkpipe_path)
        .current_dir(&temp_folder) // So that the default input.txt/output.txt are inside the test folder
        .env_remove("RUST_LOG") // Otherwise the expected output may be affected
        .arg("--no-progress")
        .args(&desc.args));

    assert_eq!(output.exit_status.code(), Some(desc.expected_exit_code));

    let actual_output = output.stderr + &output.stdout;
    for (n, r) in desc.expected_output_messages {
        println!("Checking for match(es) against '{}'", r);
        let actual_matches = r.find_iter(&actual_output).count();
        assert_eq!(actual_matches, n);
    }

    for (p, expected) in desc.expected_files {
        println!("Checking file contents at '{}'", p);
        let actual = std::fs::read(temp_folder.join(p)).ok();
        assert_eq!(actual, expected);
    }
}

/// Some recognisable contents of the given length.
pub fn contents(len: usize) -> Vec<u8> {
    (0..len).map(|i| b'a' + (i % 26) as u8).collect()
}

/// The summary lines we expect from a successful run of the channel variant.
pub fn channel_summary(reads: usize, rechunks: usize, writes: usize) -> Vec<(usize, Regex)> {
    vec![
        (1, Regex::new(&regex::escape(&format!("source: read {} times", reads))).unwrap()),
        (1, Regex::new(&regex::escape(&format!("rechunk: rechunked {} times", rechunks))).unwrap()),
        (1, Regex::new(&regex::escape(&format!("sink: wrote {} times", writes))).unwrap()),
        (3, Regex::new("finished in").unwrap()),
    ]
}

/// The summary lines we expect from a successful run of the queue variant.
pub fn queue_summary(reads: usize, writes: usize) -> Vec<(usize, Regex)> {
    vec![
        (1, Regex::new(&regex::escape(&format!("source: read {} times", reads))).unwrap()),
        (0, Regex::new("rechunk").unwrap()),
        (1, Regex::new(&regex::escape(&format!("sink: wrote {} times", writes))).unwrap()),
        (2, Regex::new("finished in").unwrap()),
    ]
}

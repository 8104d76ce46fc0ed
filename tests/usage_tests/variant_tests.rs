use crate::test_framework::*;

#[test]
fn queue_variant() {
    run(TestDesc {
        setup_files: vec![("input.txt", contents(250))],
        args: vec!["--variant".to_string(), "queue".to_string()],
        expected_exit_code: 0,
        expected_output_messages: queue_summary(3, 3),
        expected_files: vec![("output.txt", Some(contents(250)))],
        ..Default::default()
    });
}

/// Each way of waiting for the queue gives the same result.
#[test]
fn queue_variant_wait_strategies() {
    for wait in ["spin", "backoff", "park"] {
        run(TestDesc {
            setup_files: vec![("input.txt", contents(5_050))],
            args: vec!["--variant".to_string(), "queue".to_string(), "--wait".to_string(), wait.to_string()],
            expected_exit_code: 0,
            expected_output_messages: queue_summary(51, 51),
            expected_files: vec![("output.txt", Some(contents(5_050)))],
            ..Default::default()
        });
    }
}

/// The wait strategy is accepted but has no effect on the channel variant.
#[test]
fn channel_variant_ignores_wait() {
    run(TestDesc {
        setup_files: vec![("input.txt", contents(40))],
        args: vec!["--variant=channel".to_string(), "--wait=spin".to_string()],
        expected_exit_code: 0,
        expected_output_messages: channel_summary(1, 2, 2),
        expected_files: vec![("output.txt", Some(contents(40)))],
        ..Default::default()
    });
}

//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT block or park on a timer. Prompt
//! drivers wait on the frame scheduler (`next_frame`, cooperative `sleep`);
//! the terminal loop waits on the event stream and the frame deadline.
//! **Exceptions**: test code

use architectural_enforcement::scan;

const FORBIDDEN: &[&str] = &["thread::sleep(", "tokio::time::sleep(", "time::sleep("];

#[test]
fn test_no_blocking_sleep_in_queue_core() {
    let violations = scan("popup/core/src", FORBIDDEN);

    if !violations.is_empty() {
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        panic!(
            "\nFound {} timer sleep(s) in the queue core.\n\
             Use Scheduler::next_frame or Scheduler::sleep instead.",
            violations.len()
        );
    }
}

#[test]
fn test_no_blocking_sleep_in_terminal_host() {
    let violations = scan("tui/src", &["thread::sleep("]);

    if !violations.is_empty() {
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        panic!(
            "\nFound {} thread sleep(s) in the terminal host.\n\
             Wait on the frame deadline inside the event loop instead.",
            violations.len()
        );
    }
}

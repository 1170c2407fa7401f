//! Integration tests for the `ticketline` binary entry point.
//!
//! Verifies clean shutdown on end of input and user-facing startup errors.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;

#[test]
fn end_of_input_exits_cleanly() {
    let mut command = cargo_bin_cmd!("ticketline");
    command.write_stdin("");
    command
        .assert()
        .success()
        .stdout(contains("ticketline connected to udp://127.0.0.1:4567"))
        .stdout(contains("end of input"));
}

#[test]
fn help_command_is_answered_without_a_server() {
    let mut command = cargo_bin_cmd!("ticketline");
    command.args(["--server", "udp://127.0.0.1:9"]);
    command.write_stdin("help\n");
    command
        .assert()
        .success()
        .stdout(contains("available commands:"));
}

#[test]
fn malformed_server_address_exits_with_failure() {
    let mut command = cargo_bin_cmd!("ticketline");
    command.args(["--server", "tcp://127.0.0.1:4567"]);
    command
        .assert()
        .failure()
        .stderr(contains("failed to load configuration"));
}

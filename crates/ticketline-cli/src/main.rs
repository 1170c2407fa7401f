//! Entry point for the `ticketline` console.
//!
//! Delegates to [`ticketline_cli::run`] with the process arguments and the
//! locked standard streams.

use std::io::{self, StderrLock, StdinLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let stdin: StdinLock<'static> = io::stdin().lock();
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    ticketline_cli::run(std::env::args_os(), stdin, &mut stdout, &mut stderr)
}

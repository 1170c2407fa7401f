//! Interactive console for a datagram ticket collection server.
//!
//! The runtime loads configuration, binds a UDP transport and then drives a
//! [`session`] that reads commands from standard input or from nested script
//! files, sends each one to the server and prints the reply. Configuration
//! loading and IO streams can be substituted so tests exercise the same path
//! as the binary.

use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing::info;

mod cli;
mod config;
mod errors;
mod registry;
mod session;
mod source;
mod telemetry;
mod translator;
mod transport;

use cli::Cli;
use config::{ConfigArgumentSplit, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;
use registry::TicketRegistry;
use session::{Session, SessionSummary, StopReason};
use source::{InputStack, ReaderSource};
use translator::Translator;
use transport::UdpTransport;

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: keep in sync with the fields of `ticketline_config::Config`.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--server",
    "--response-timeout-ms",
    "--poll-interval-ms",
    "--log-filter",
    "--log-format",
];

/// Bundles the output streams provided to the console runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) const fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self { stdout, stderr }
    }
}

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader> {
    io: &'a mut IoStreams<'a, W, E>,
    loader: &'a L,
}

impl<'a, W, E, L> CliRunner<'a, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    const fn new(io: &'a mut IoStreams<'a, W, E>, loader: &'a L) -> Self {
        Self { io, loader }
    }

    fn run<I, R>(&mut self, args: I, stdin: R) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
        R: BufRead,
    {
        match self.try_run(args, stdin) {
            Ok(summary) => {
                info!(
                    target: "ticketline_cli",
                    requests = summary.requests,
                    responses = summary.responses,
                    timeouts = summary.timeouts,
                    "console finished"
                );
                exit_code_for(summary.stop_reason)
            }
            Err(AppError::CliUsage(error)) if !error.use_stderr() => {
                let _ = write!(self.io.stdout, "{error}");
                ExitCode::SUCCESS
            }
            Err(error) => {
                let _ = writeln!(self.io.stderr, "{error}");
                ExitCode::FAILURE
            }
        }
    }

    fn try_run<I, R>(&mut self, args: I, stdin: R) -> Result<SessionSummary, AppError>
    where
        I: IntoIterator<Item = OsString>,
        R: BufRead,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let cli = Cli::try_parse_from(prepare_cli_arguments(&args, &split))
            .map_err(AppError::CliUsage)?;
        let config = self.loader.load(&split.config_arguments)?;
        telemetry::initialise(&config)?;

        let transport = UdpTransport::connect(&config)?;
        info!(target: "ticketline_cli", server = %transport.server(), "transport bound");
        writeln!(
            self.io.stdout,
            "ticketline connected to {}; type help for the list of commands",
            config.server()
        )
        .map_err(AppError::Session)?;

        let mut session = Session::new(
            InputStack::new(ReaderSource::new(stdin)),
            Translator::new(TicketRegistry),
            transport,
            &mut *self.io.stdout,
            &mut *self.io.stderr,
        );
        if let Some(script) = cli.script.as_deref() {
            session.start_script(script).map_err(AppError::Session)?;
        }
        session.run().map_err(AppError::Session)
    }
}

/// Runs the console using the provided arguments and IO handles.
#[must_use]
pub fn run<I, R, W, E>(args: I, stdin: R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
{
    let mut io = IoStreams::new(stdout, stderr);
    run_with_loader(args, stdin, &mut io, &OrthoConfigLoader)
}

/// Runs the console with a custom configuration loader.
#[must_use]
pub(crate) fn run_with_loader<'a, I, R, W, E, L>(
    args: I,
    stdin: R,
    io: &'a mut IoStreams<'a, W, E>,
    loader: &'a L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(io, loader).run(args, stdin)
}

fn prepare_cli_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    args.first()
        .into_iter()
        .chain(args.iter().skip(split.command_start.max(1)))
        .cloned()
        .collect()
}

const fn exit_code_for(reason: StopReason) -> ExitCode {
    match reason {
        StopReason::ServerRequested | StopReason::EndOfInput => ExitCode::SUCCESS,
        StopReason::InputFailed => ExitCode::FAILURE,
    }
}

//! The console session loop.
//!
//! One line is processed completely (translated, possibly sent, response
//! displayed) before the next one is read. The loop is the only place that
//! decides whether the session is still alive: it stops when the server asks
//! it to or when the interactive source reaches end of input. Every other
//! failure is reported on one line and the loop moves on.

use std::io::{self, Write};

use camino::Utf8Path;
use serde_json::Value;
use ticketline_protocol::{Request, Response};
use tracing::{debug, info};

use crate::registry::CommandRegistry;
use crate::source::{InputStack, LineSource, NextLine, SourceError};
use crate::translator::{TranslateError, Translation, Translator};
use crate::transport::{Transport, TransportError};

const SESSION_TARGET: &str = "ticketline_cli::session";
const PROMPT: &str = "> ";

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionState {
    Running,
    /// Transient while a script frame is being pushed.
    AwaitingScriptFrame,
    Stopped(StopReason),
}

/// Why a session reached [`SessionState::Stopped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopReason {
    /// A response carried the terminate flag.
    ServerRequested,
    /// The interactive source reached end of input.
    EndOfInput,
    /// Reading the interactive source failed.
    InputFailed,
}

/// Counters reported once the session stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SessionSummary {
    pub(crate) requests: usize,
    pub(crate) responses: usize,
    pub(crate) timeouts: usize,
    pub(crate) stop_reason: StopReason,
}

/// Drives an [`InputStack`], a [`Translator`] and a [`Transport`].
pub(crate) struct Session<'a, B, R, T, W, E> {
    stack: InputStack<B>,
    translator: Translator<R>,
    transport: T,
    stdout: &'a mut W,
    stderr: &'a mut E,
    state: SessionState,
    requests: usize,
    responses: usize,
    timeouts: usize,
}

impl<'a, B, R, T, W, E> Session<'a, B, R, T, W, E>
where
    B: LineSource,
    R: CommandRegistry,
    T: Transport,
    W: Write,
    E: Write,
{
    pub(crate) const fn new(
        stack: InputStack<B>,
        translator: Translator<R>,
        transport: T,
        stdout: &'a mut W,
        stderr: &'a mut E,
    ) -> Self {
        Self {
            stack,
            translator,
            transport,
            stdout,
            stderr,
            state: SessionState::Running,
            requests: 0,
            responses: 0,
            timeouts: 0,
        }
    }

    /// Queues a script to run before the first interactive prompt.
    ///
    /// Failures are reported and leave the session interactive.
    pub(crate) fn start_script(&mut self, path: &Utf8Path) -> io::Result<()> {
        self.enter_script(path)
    }

    /// Current state; [`SessionState::Running`] until [`Self::run`] returns.
    #[cfg(test)]
    pub(crate) const fn state(&self) -> SessionState {
        self.state
    }

    /// Processes lines until the session stops.
    ///
    /// # Errors
    ///
    /// Only failures to write to the operator's streams are returned.
    pub(crate) fn run(mut self) -> io::Result<SessionSummary> {
        loop {
            if let SessionState::Stopped(stop_reason) = self.state {
                info!(
                    target: SESSION_TARGET,
                    reason = ?stop_reason,
                    requests = self.requests,
                    timeouts = self.timeouts,
                    "session stopped"
                );
                self.stdout.flush()?;
                return Ok(SessionSummary {
                    requests: self.requests,
                    responses: self.responses,
                    timeouts: self.timeouts,
                    stop_reason,
                });
            }
            self.step()?;
        }
    }

    fn step(&mut self) -> io::Result<()> {
        if let Err(error) = self.stack.settle() {
            self.report(&error)?;
        }
        self.announce_completed()?;

        if !self.stack.is_active() {
            write!(self.stdout, "{PROMPT}")?;
            self.stdout.flush()?;
        }

        let line = match self.stack.next_line() {
            Ok(NextLine::Line(line)) => line,
            Ok(NextLine::Exhausted) => {
                writeln!(self.stdout)?;
                writeln!(self.stdout, "end of input; closing the session")?;
                self.stop(StopReason::EndOfInput);
                return Ok(());
            }
            Err(error @ SourceError::Interactive(_)) => {
                self.report(&error)?;
                self.stop(StopReason::InputFailed);
                return Ok(());
            }
            Err(error) => return self.report(&error),
        };
        self.announce_completed()?;
        self.handle_line(&line)
    }

    fn handle_line(&mut self, line: &str) -> io::Result<()> {
        if self.stack.is_active()
            && let Some(command) = line.split_whitespace().next()
        {
            debug!(
                target: SESSION_TARGET,
                script = ?self.stack.active_path(),
                command,
                "script line"
            );
            writeln!(self.stdout, "executing {command}")?;
        }

        match self
            .translator
            .translate(line, &mut self.stack, &mut *self.stdout)
        {
            Ok(Translation::Empty) => Ok(()),
            Ok(Translation::Local(text)) => writeln!(self.stdout, "{text}"),
            Ok(Translation::Script(path)) => self.enter_script(&path),
            Ok(Translation::Request(request)) => self.send(&request),
            Err(TranslateError::Output(error)) => Err(error),
            Err(error @ TranslateError::InputClosed { .. }) => {
                self.report(&error)?;
                self.stop(StopReason::EndOfInput);
                Ok(())
            }
            Err(error @ TranslateError::Source(SourceError::Interactive(_))) => {
                self.report(&error)?;
                self.stop(StopReason::InputFailed);
                Ok(())
            }
            Err(error) => self.report(&error),
        }
    }

    fn enter_script(&mut self, path: &Utf8Path) -> io::Result<()> {
        self.state = SessionState::AwaitingScriptFrame;
        let pushed = self.stack.push(path);
        self.state = SessionState::Running;
        match pushed {
            Ok(()) => {
                debug!(
                    target: SESSION_TARGET,
                    path = %path,
                    depth = self.stack.depth(),
                    "running script"
                );
                Ok(())
            }
            Err(error) => self.report(&error),
        }
    }

    fn send(&mut self, request: &Request) -> io::Result<()> {
        self.requests += 1;
        match self.transport.exchange(request) {
            Ok(response) => {
                self.responses += 1;
                render_response(&mut *self.stdout, &response)?;
                if response.terminate() {
                    self.stop(StopReason::ServerRequested);
                }
                Ok(())
            }
            Err(error) => {
                if matches!(error, TransportError::Timeout { .. }) {
                    self.timeouts += 1;
                }
                self.report(&error)
            }
        }
    }

    fn announce_completed(&mut self) -> io::Result<()> {
        for path in self.stack.take_completed() {
            writeln!(self.stdout, "script {path} completed")?;
        }
        Ok(())
    }

    fn report(&mut self, error: &dyn std::error::Error) -> io::Result<()> {
        writeln!(self.stderr, "error: {error}")?;
        self.stderr.flush()
    }

    fn stop(&mut self, reason: StopReason) {
        self.state = SessionState::Stopped(reason);
    }
}

/// Writes the response message followed by one line per payload record.
pub(crate) fn render_response<W: Write>(out: &mut W, response: &Response) -> io::Result<()> {
    writeln!(out, "{}", response.message())?;
    for record in response.payload() {
        match record {
            Value::String(text) => writeln!(out, "{text}")?,
            other => writeln!(out, "{other}")?,
        }
    }
    out.flush()
}

//! Turns console lines into server requests or local directives.
//!
//! The translator owns no input of its own. Element fields are read from
//! the [`InputStack`]'s active source, so a script supplies them with its
//! following lines while an operator is prompted at the terminal.

use std::io::{self, Write};

use camino::Utf8PathBuf;
use thiserror::Error;
use ticketline_protocol::{Record, Request, RequestBody};
use tracing::debug;

use crate::registry::{CommandRegistry, CommandSpec, Dispatch, FieldSpec};
use crate::source::{FieldLine, InputStack, LineSource, SourceError};

/// The reserved directive that switches input to a script file.
pub(crate) const SCRIPT_DIRECTIVE: &str = "execute_script";

/// Outcome of translating one console line.
#[derive(Debug, PartialEq)]
pub(crate) enum Translation {
    /// Blank line; nothing to do.
    Empty,
    /// `execute_script <path>`: push a new script frame.
    Script(Utf8PathBuf),
    /// A request ready for the transport.
    Request(Request),
    /// Text answered locally without contacting the server.
    Local(String),
}

/// Errors raised while translating a line.
#[derive(Debug, Error)]
pub(crate) enum TranslateError {
    #[error("unknown command '{0}'; type help for the list of commands")]
    UnknownCommand(String),
    #[error("{command} takes {expected} argument(s) but {actual} were given; usage: {usage}")]
    Arity {
        command: String,
        expected: usize,
        actual: usize,
        usage: String,
    },
    #[error("invalid input for {command}: {reason}")]
    InvalidField { command: String, reason: String },
    #[error("script ended before every field of {command} was supplied")]
    ScriptExhausted { command: String },
    #[error("input closed while {command} was waiting for {field}")]
    InputClosed { command: String, field: String },
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("failed to write prompt: {0}")]
    Output(#[source] io::Error),
}

/// Validates console lines against a [`CommandRegistry`].
pub(crate) struct Translator<R> {
    registry: R,
}

impl<R: CommandRegistry> Translator<R> {
    pub(crate) const fn new(registry: R) -> Self {
        Self { registry }
    }

    /// Translates `line`, prompting through `stack` for element fields.
    ///
    /// Prompts are written to `out` only while the interactive source is
    /// active; script input is consumed silently.
    pub(crate) fn translate<B, W>(
        &self,
        line: &str,
        stack: &mut InputStack<B>,
        out: &mut W,
    ) -> Result<Translation, TranslateError>
    where
        B: LineSource,
        W: Write,
    {
        let mut tokens = line.split_whitespace();
        let Some(name) = tokens.next() else {
            return Ok(Translation::Empty);
        };
        let arguments: Vec<String> = tokens.map(str::to_owned).collect();

        if name == SCRIPT_DIRECTIVE {
            return match <[String; 1]>::try_from(arguments) {
                Ok([path]) => Ok(Translation::Script(Utf8PathBuf::from(path))),
                Err(arguments) => Err(TranslateError::Arity {
                    command: name.to_owned(),
                    expected: 1,
                    actual: arguments.len(),
                    usage: format!("{SCRIPT_DIRECTIVE} <file>"),
                }),
            };
        }

        let spec = self
            .registry
            .lookup(name)
            .ok_or_else(|| TranslateError::UnknownCommand(name.to_owned()))?;
        if arguments.len() != spec.arguments.len() {
            return Err(TranslateError::Arity {
                command: name.to_owned(),
                expected: spec.arguments.len(),
                actual: arguments.len(),
                usage: spec.usage(),
            });
        }

        if spec.dispatch == Dispatch::Help {
            return Ok(Translation::Local(self.help_text()));
        }

        let record = if spec.fields.is_empty() {
            None
        } else {
            Some(collect_record(spec, stack, out)?)
        };
        let body = (!arguments.is_empty() || record.is_some())
            .then(|| RequestBody::new(arguments, record));
        debug!(command = spec.name, "request built");
        Ok(Translation::Request(Request::new(spec.name, body)))
    }

    fn help_text(&self) -> String {
        let mut text = String::from("available commands:");
        for spec in self.registry.commands() {
            text.push_str(&format!("\n  {} - {}", spec.usage(), spec.description));
        }
        text.push_str(&format!(
            "\n  {SCRIPT_DIRECTIVE} <file> - run the commands listed in a script file"
        ));
        text
    }
}

fn collect_record<B, W>(
    spec: &CommandSpec,
    stack: &mut InputStack<B>,
    out: &mut W,
) -> Result<Record, TranslateError>
where
    B: LineSource,
    W: Write,
{
    let mut record = Record::new();
    for field in spec.fields {
        let value = collect_field(spec, field, stack, out)?;
        record.insert(field.name.to_owned(), value);
    }
    Ok(record)
}

fn collect_field<B, W>(
    spec: &CommandSpec,
    field: &FieldSpec,
    stack: &mut InputStack<B>,
    out: &mut W,
) -> Result<serde_json::Value, TranslateError>
where
    B: LineSource,
    W: Write,
{
    loop {
        let interactive = !stack.is_active();
        if interactive {
            write!(out, "{}: ", field.prompt).map_err(TranslateError::Output)?;
            out.flush().map_err(TranslateError::Output)?;
        }

        let input = match stack.next_field_line()? {
            FieldLine::Line(input) => input,
            FieldLine::ScriptExhausted => {
                return Err(TranslateError::ScriptExhausted {
                    command: spec.name.to_owned(),
                });
            }
            FieldLine::Exhausted => {
                return Err(TranslateError::InputClosed {
                    command: spec.name.to_owned(),
                    field: field.name.to_owned(),
                });
            }
        };

        match field.parse(&input) {
            Ok(value) => return Ok(value),
            Err(reason) if interactive => {
                writeln!(out, "{reason}").map_err(TranslateError::Output)?;
            }
            Err(reason) => {
                return Err(TranslateError::InvalidField {
                    command: spec.name.to_owned(),
                    reason,
                });
            }
        }
    }
}

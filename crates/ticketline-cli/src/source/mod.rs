//! Line sources feeding the console session.
//!
//! The [`InputStack`] owns the interactive base source and every script frame
//! opened by `execute_script`. The innermost frame is the only one read from,
//! so prompts raised while a script runs are answered by that script's next
//! lines. Frames are tagged with their canonical path and a path may appear
//! at most once on the stack; a script that includes itself, directly or
//! through other scripts, is rejected at push time.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

const SOURCE_TARGET: &str = "ticketline_cli::source";

/// Anything that yields console lines one at a time.
pub(crate) trait LineSource {
    /// Returns the next line without its terminator, or `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// Reads lines from any buffered reader, typically locked stdin.
///
/// Bytes that are not valid UTF-8 are replaced with U+FFFD rather than
/// failing the read.
pub(crate) struct ReaderSource<R> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: BufRead> ReaderSource<R> {
    pub(crate) const fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
        }
    }

    /// Reports end of input without consuming anything.
    ///
    /// Only meaningful for readers that never block, such as script files.
    fn at_end(&mut self) -> io::Result<bool> {
        Ok(self.reader.fill_buf()?.is_empty())
    }
}

impl<R: BufRead> LineSource for ReaderSource<R> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.buffer.clear();
        if self.reader.read_until(b'\n', &mut self.buffer)? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&self.buffer);
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_owned()))
    }
}

/// One script file being replayed.
struct ScriptFrame {
    path: Utf8PathBuf,
    lines: ReaderSource<BufReader<File>>,
}

/// Result of pulling a command line from the stack.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum NextLine {
    /// A line from the active source.
    Line(String),
    /// The interactive base reached end of input.
    Exhausted,
}

/// Result of pulling a prompted field value from the active source.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FieldLine {
    /// A value line from the active source.
    Line(String),
    /// The active script ended before the field was supplied.
    ScriptExhausted,
    /// The interactive base reached end of input.
    Exhausted,
}

/// Errors raised while managing line sources.
#[derive(Debug, Error)]
pub(crate) enum SourceError {
    #[error("recursion detected: script {path} is already running; skipping this line")]
    RecursionDetected { path: Utf8PathBuf },
    #[error("cannot read script {path}: {source}")]
    UnreadableSource {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to read script {path}: {source}; abandoning it")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read console input: {0}")]
    Interactive(#[source] io::Error),
}

/// Ordered stack of line sources with the interactive source at its base.
pub(crate) struct InputStack<B> {
    base: B,
    frames: Vec<ScriptFrame>,
    completed: Vec<Utf8PathBuf>,
}

impl<B: LineSource> InputStack<B> {
    pub(crate) const fn new(base: B) -> Self {
        Self {
            base,
            frames: Vec::new(),
            completed: Vec::new(),
        }
    }

    /// Opens `path` as a new innermost frame.
    ///
    /// The stack is left untouched when the script cannot be opened or is
    /// already running.
    pub(crate) fn push(&mut self, path: &Utf8Path) -> Result<(), SourceError> {
        let unreadable = |source| SourceError::UnreadableSource {
            path: path.to_string(),
            source,
        };
        let canonical = fs::canonicalize(path).map_err(unreadable)?;
        let canonical = Utf8PathBuf::from_path_buf(canonical).map_err(|raw| {
            unreadable(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("path {} is not valid UTF-8", raw.display()),
            ))
        })?;

        if self.contains(&canonical) {
            warn!(target: SOURCE_TARGET, path = %canonical, "recursive script rejected");
            return Err(SourceError::RecursionDetected { path: canonical });
        }

        if !fs::metadata(&canonical).map_err(unreadable)?.is_file() {
            return Err(unreadable(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }
        let file = File::open(&canonical).map_err(unreadable)?;
        info!(
            target: SOURCE_TARGET,
            path = %canonical,
            depth = self.frames.len() + 1,
            "script frame pushed"
        );
        self.frames.push(ScriptFrame {
            path: canonical,
            lines: ReaderSource::new(BufReader::new(file)),
        });
        Ok(())
    }

    /// Returns the next command line, popping exhausted script frames.
    ///
    /// A script that fails mid-read is abandoned without a completion notice
    /// and the error is returned so the caller can report it; the next call
    /// resumes the enclosing frame.
    pub(crate) fn next_line(&mut self) -> Result<NextLine, SourceError> {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return match self.base.read_line() {
                    Ok(Some(line)) => Ok(NextLine::Line(line)),
                    Ok(None) => Ok(NextLine::Exhausted),
                    Err(error) => Err(SourceError::Interactive(error)),
                };
            };
            match frame.lines.read_line() {
                Ok(Some(line)) => return Ok(NextLine::Line(line)),
                Ok(None) => self.pop_completed(),
                Err(source) => return Err(self.abandon(source)),
            }
        }
    }

    /// Reads one prompted value from the active source without popping.
    pub(crate) fn next_field_line(&mut self) -> Result<FieldLine, SourceError> {
        let Some(frame) = self.frames.last_mut() else {
            return match self.base.read_line() {
                Ok(Some(line)) => Ok(FieldLine::Line(line)),
                Ok(None) => Ok(FieldLine::Exhausted),
                Err(error) => Err(SourceError::Interactive(error)),
            };
        };
        match frame.lines.read_line() {
            Ok(Some(line)) => Ok(FieldLine::Line(line)),
            Ok(None) => Ok(FieldLine::ScriptExhausted),
            Err(source) => Err(self.abandon(source)),
        }
    }

    /// Pops every script frame that has no unread input left.
    ///
    /// Lets the session decide whether the next read will hit the
    /// interactive source before it prints a prompt.
    pub(crate) fn settle(&mut self) -> Result<(), SourceError> {
        while let Some(frame) = self.frames.last_mut() {
            match frame.lines.at_end() {
                Ok(true) => self.pop_completed(),
                Ok(false) => break,
                Err(source) => return Err(self.abandon(source)),
            }
        }
        Ok(())
    }

    /// True while any script frame remains on the stack.
    pub(crate) fn is_active(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Number of script frames above the interactive base.
    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Canonical path of the innermost script, if any.
    pub(crate) fn active_path(&self) -> Option<&Utf8Path> {
        self.frames.last().map(|frame| frame.path.as_path())
    }

    /// Drains the paths of scripts that finished since the last call.
    pub(crate) fn take_completed(&mut self) -> Vec<Utf8PathBuf> {
        std::mem::take(&mut self.completed)
    }

    fn contains(&self, canonical: &Utf8Path) -> bool {
        self.frames.iter().any(|frame| frame.path == canonical)
    }

    fn pop_completed(&mut self) {
        if let Some(frame) = self.frames.pop() {
            info!(
                target: SOURCE_TARGET,
                path = %frame.path,
                depth = self.frames.len(),
                "script frame completed"
            );
            self.completed.push(frame.path);
        }
    }

    fn abandon(&mut self, source: io::Error) -> SourceError {
        match self.frames.pop() {
            Some(frame) => {
                debug!(target: SOURCE_TARGET, path = %frame.path, "script frame abandoned");
                SourceError::Read {
                    path: frame.path,
                    source,
                }
            }
            None => SourceError::Interactive(source),
        }
    }
}

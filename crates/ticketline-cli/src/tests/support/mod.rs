//! Test support utilities for console coverage.
//!
//! Supplies a fake collection server, a fixed configuration loader and a
//! harness that runs the console end to end with captured streams.

mod fake_server;

use std::ffi::OsString;
use std::fs;
use std::io::Cursor;
use std::net::SocketAddr;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow, ensure};
use camino::Utf8PathBuf;
use tempfile::TempDir;
use ticketline_config::{Config, ServerEndpoint};
use ticketline_protocol::Request;

use crate::{AppError, ConfigLoader, IoStreams, run_with_loader};

pub(crate) use fake_server::{FakeServer, Reply};

/// A config loader that returns a fixed configuration for tests.
pub(crate) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(crate) const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Console state, fake server and captured output for one test.
#[derive(Default)]
pub(crate) struct TestWorld {
    pub(crate) config: Config,
    pub(crate) server: Option<FakeServer>,
    pub(crate) stdout: Vec<u8>,
    pub(crate) stderr: Vec<u8>,
    pub(crate) exit_code: Option<ExitCode>,
    pub(crate) requests: Vec<Request>,
    pub(crate) scripts: Option<TempDir>,
}

impl TestWorld {
    /// Starts a fake server answering with `replies` and points the console at it.
    pub(crate) fn start_server(&mut self, replies: Vec<Reply>) -> Result<()> {
        let server = FakeServer::spawn(replies)?;
        self.point_at(server.address());
        self.server = Some(server);
        Ok(())
    }

    pub(crate) fn point_at(&mut self, address: SocketAddr) {
        self.config.server = ServerEndpoint::udp(address.ip().to_string(), address.port());
    }

    /// Runs the console with `args` after the program name and `input` on stdin.
    pub(crate) fn run(&mut self, args: &[&str], input: &str) -> Result<()> {
        self.stdout.clear();
        self.stderr.clear();
        self.requests.clear();
        let args: Vec<OsString> = std::iter::once("ticketline")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect();
        let loader = StaticConfigLoader::new(self.config.clone());
        let stdin = Cursor::new(input.as_bytes().to_vec());
        let mut io = IoStreams::new(&mut self.stdout, &mut self.stderr);
        let exit = run_with_loader(args, stdin, &mut io, &loader);
        self.exit_code = Some(exit);
        if let Some(mut server) = self.server.take() {
            self.requests = server.take_requests()?;
        }
        Ok(())
    }

    /// Scratch directory for scripts, created on first use.
    pub(crate) fn script_dir(&mut self) -> Result<Utf8PathBuf> {
        if self.scripts.is_none() {
            self.scripts = Some(TempDir::new().context("create script dir")?);
        }
        let dir = self.scripts.as_ref().context("script dir")?;
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|path| anyhow!("script dir {} is not UTF-8", path.display()))
    }

    /// Replaces each `@` in `text` with the script directory and a separator.
    pub(crate) fn expand(&mut self, text: &str) -> Result<String> {
        let dir = self.script_dir()?;
        Ok(text.replace('@', &format!("{dir}/")))
    }

    /// Writes `lines` to `name` in the script directory.
    pub(crate) fn write_script(&mut self, name: &str, lines: &[&str]) -> Result<Utf8PathBuf> {
        let path = self.script_dir()?.join(name);
        let mut body = String::new();
        for line in lines {
            body.push_str(&self.expand(line)?);
            body.push('\n');
        }
        fs::write(&path, body).with_context(|| format!("write script {path}"))?;
        Ok(path)
    }

    pub(crate) fn stdout_text(&self) -> Result<String> {
        String::from_utf8(self.stdout.clone()).context("stdout utf8")
    }

    pub(crate) fn stderr_text(&self) -> Result<String> {
        String::from_utf8(self.stderr.clone()).context("stderr utf8")
    }

    pub(crate) fn assert_exit_code(&self, expected: ExitCode) -> Result<()> {
        let exit = self.exit_code.context("exit code recorded")?;
        ensure!(exit == expected, "expected exit code {expected:?}, got {exit:?}");
        Ok(())
    }

    pub(crate) fn command_names(&self) -> Vec<&str> {
        self.requests.iter().map(Request::command_name).collect()
    }
}

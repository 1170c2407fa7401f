//! Command-line arguments for the ticketline console.
//!
//! Configuration flags (`--server`, `--response-timeout-ms` and friends) are
//! split off before parsing and handled by `ticketline-config`; only the
//! console's own arguments are declared here.

use camino::Utf8PathBuf;
use clap::Parser;

/// Interactive console for a ticket collection server.
#[derive(Parser, Debug)]
#[command(name = "ticketline", version)]
pub(crate) struct Cli {
    /// Runs the commands in this file before reading from standard input.
    #[arg(long, value_name = "PATH")]
    pub(crate) script: Option<Utf8PathBuf>,
}

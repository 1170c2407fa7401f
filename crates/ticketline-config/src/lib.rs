//! Shared configuration for the ticketline console.
//!
//! Values are layered by `ortho_config`: built-in defaults, then a TOML file
//! named by `--config-path` or `TICKETLINE_CONFIG_PATH`, then `TICKETLINE_*`
//! environment variables, then command-line flags.

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

mod defaults;
mod endpoint;
mod logging;

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RESPONSE_TIMEOUT_MS,
    DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT, default_log_filter, default_log_filter_string,
    default_log_format, default_poll_interval_ms, default_response_timeout_ms,
    default_server_endpoint,
};
pub use endpoint::{EndpointParseError, ServerEndpoint};
pub use logging::{LogFormat, LogFormatParseError};

/// Runtime configuration for the console.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "TICKETLINE")]
pub struct Config {
    /// Datagram address of the collection server.
    #[serde(default = "default_server_endpoint")]
    #[ortho_config(default = default_server_endpoint())]
    pub server: ServerEndpoint,
    /// Overall deadline for one exchange, in milliseconds.
    #[serde(default = "default_response_timeout_ms")]
    #[ortho_config(default = DEFAULT_RESPONSE_TIMEOUT_MS)]
    pub response_timeout_ms: u64,
    /// Length of one readiness poll, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    #[ortho_config(default = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,
    /// `tracing` filter directive, for example `ticketline_cli=debug`.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format of diagnostic logs written to stderr.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: default_server_endpoint(),
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Loads configuration from defaults, files, environment and `args`.
    ///
    /// `args` must start with the program name and contain only
    /// configuration flags.
    ///
    /// # Errors
    ///
    /// Returns the aggregated `ortho_config` error when any layer fails to
    /// parse or merge.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Server the console sends requests to.
    #[must_use]
    pub const fn server(&self) -> &ServerEndpoint {
        &self.server
    }

    /// Deadline after which a pending exchange is abandoned.
    #[must_use]
    pub const fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// Poll slice used while waiting, clamped to `1 ms..=response_timeout`.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        let interval = Duration::from_millis(self.poll_interval_ms.max(1));
        interval.min(self.response_timeout().max(Duration::from_millis(1)))
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

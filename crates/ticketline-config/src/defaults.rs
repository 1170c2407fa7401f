use crate::endpoint::ServerEndpoint;

/// Host used when no server address is configured.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// UDP port used when no server address is configured.
pub const DEFAULT_SERVER_PORT: u16 = 4567;

/// Overall deadline for a single request/response exchange.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 10_000;

/// Length of one readiness poll while waiting for a response.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default log filter expression. The console keeps quiet unless asked.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Default log filter expression used by the binary.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}

/// Computes the default server endpoint.
pub fn default_server_endpoint() -> ServerEndpoint {
    ServerEndpoint::udp(DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT)
}

/// Default response deadline for serde.
pub const fn default_response_timeout_ms() -> u64 {
    DEFAULT_RESPONSE_TIMEOUT_MS
}

/// Default poll interval for serde.
pub const fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

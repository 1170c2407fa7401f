use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const SCHEME: &str = "udp";

/// Address of the collection server's datagram socket.
///
/// Deserialises from either a `udp://host:port` string (environment and
/// flags) or a `{ host, port }` table (configuration files).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(try_from = "EndpointRepr")]
pub struct ServerEndpoint {
    /// Host name or IP literal (IPv6 literals without brackets).
    pub host: String,
    /// UDP port the server listens on.
    pub port: u16,
}

impl ServerEndpoint {
    /// Builds an endpoint from a host and port.
    #[must_use]
    pub fn udp(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host name or IP literal.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// UDP port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EndpointRepr {
    Text(String),
    Fields { host: String, port: u16 },
}

impl TryFrom<EndpointRepr> for ServerEndpoint {
    type Error = EndpointParseError;

    fn try_from(repr: EndpointRepr) -> Result<Self, Self::Error> {
        match repr {
            EndpointRepr::Text(text) => text.parse(),
            EndpointRepr::Fields { host, port } => Ok(Self::udp(host, port)),
        }
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(formatter, "{SCHEME}://[{}]:{}", self.host, self.port)
        } else {
            write!(formatter, "{SCHEME}://{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for ServerEndpoint {
    type Err = EndpointParseError;

    /// Accepts `udp://host:port` or a bare `host:port`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let url = if trimmed.contains("://") {
            Url::parse(trimmed)?
        } else {
            Url::parse(&format!("{SCHEME}://{trimmed}"))?
        };
        if url.scheme() != SCHEME {
            return Err(EndpointParseError::UnsupportedScheme(url.scheme().to_owned()));
        }
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| EndpointParseError::MissingHost(input.to_owned()))?;
        let port = url
            .port()
            .ok_or_else(|| EndpointParseError::MissingPort(input.to_owned()))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        Ok(Self::udp(host, port))
    }
}

/// Errors encountered while parsing a [`ServerEndpoint`] from text.
#[derive(Debug, Error)]
pub enum EndpointParseError {
    /// Scheme was not `udp`.
    #[error("unsupported server scheme '{0}'; expected udp://host:port")]
    UnsupportedScheme(String),
    /// Host name was missing.
    #[error("missing server host in '{0}'")]
    MissingHost(String),
    /// Port was missing from the address.
    #[error("missing server port in '{0}'")]
    MissingPort(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[test]
    fn display_uses_udp_scheme() {
        let endpoint = ServerEndpoint::udp("127.0.0.1", 4567);
        assert_eq!(endpoint.to_string(), "udp://127.0.0.1:4567");
    }

    #[test]
    fn display_brackets_ipv6_literals() {
        let endpoint = ServerEndpoint::udp("::1", 4567);
        assert_eq!(endpoint.to_string(), "udp://[::1]:4567");
    }

    #[rstest]
    #[case("udp://127.0.0.1:9000", "127.0.0.1", 9000)]
    #[case("localhost:4567", "localhost", 4567)]
    #[case("udp://[::1]:7000", "::1", 7000)]
    #[case("  udp://example.org:53  ", "example.org", 53)]
    fn parses_endpoints(#[case] input: &str, #[case] host: &str, #[case] port: u16) {
        let endpoint: ServerEndpoint = input.parse().expect("endpoint should parse");
        assert_eq!(endpoint.host(), host);
        assert_eq!(endpoint.port(), port);
    }

    #[test]
    fn rejects_other_schemes() {
        let error = "tcp://127.0.0.1:9000"
            .parse::<ServerEndpoint>()
            .expect_err("tcp must be rejected");
        assert!(matches!(error, EndpointParseError::UnsupportedScheme(scheme) if scheme == "tcp"));
    }

    #[test]
    fn rejects_missing_port() {
        let error = "udp://127.0.0.1"
            .parse::<ServerEndpoint>()
            .expect_err("port is required");
        assert!(matches!(error, EndpointParseError::MissingPort(_)));
    }

    #[test]
    fn round_trips_through_display() {
        let endpoint = ServerEndpoint::udp("server.local", 4000);
        let reparsed: ServerEndpoint = endpoint.to_string().parse().expect("reparse");
        assert_eq!(reparsed, endpoint);
    }
}

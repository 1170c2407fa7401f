//! Datagram transport for console requests.
//!
//! Each call to [`Transport::exchange`] sends one datagram and waits, in poll
//! slices, for the first datagram to come back before a deadline. There is
//! no retransmission: a lost request or response surfaces as
//! [`TransportError::Timeout`] and the session moves on. Requests and
//! responses are correlated purely by call order, which holds because
//! `exchange` borrows the transport mutably and so only one exchange can be
//! pending at a time.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use thiserror::Error;
use ticketline_config::{Config, ServerEndpoint};
use ticketline_protocol::{MAX_DATAGRAM_BYTES, Request, Response, WireError};
use tracing::{debug, trace, warn};

use crate::AppError;

const TRANSPORT_TARGET: &str = "ticketline_cli::transport";

/// Request/response seam between the session loop and the network.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Transport {
    /// Sends `request` and waits for the matching response.
    fn exchange(&mut self, request: &Request) -> Result<Response, TransportError>;
}

/// Failures of a single exchange. None of them end the session.
#[derive(Debug, Error)]
pub(crate) enum TransportError {
    #[error("request is {size} bytes, above the {limit}-byte datagram limit; nothing was sent")]
    EncodingTooLarge { size: usize, limit: usize },
    #[error("failed to serialise request: {0}")]
    Serialise(#[source] serde_json::Error),
    #[error("failed to send request to {server}: {source}")]
    Send {
        server: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("failed to receive response: {0}")]
    Receive(#[source] io::Error),
    #[error("no response from the server within {waited_ms} ms")]
    Timeout { waited_ms: u128 },
    #[error("server sent a malformed response: {0}")]
    MalformedResponse(#[source] serde_json::Error),
}

impl From<WireError> for TransportError {
    fn from(error: WireError) -> Self {
        match error {
            WireError::TooLarge { size, limit } => Self::EncodingTooLarge { size, limit },
            WireError::Serialise(source) => Self::Serialise(source),
            WireError::Malformed(source) => Self::MalformedResponse(source),
        }
    }
}

/// Book-keeping for the one request awaiting its response.
struct PendingExchange<'a> {
    command: &'a str,
    started: Instant,
    deadline: Instant,
}

impl<'a> PendingExchange<'a> {
    fn begin(command: &'a str, timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            command,
            started,
            deadline: started + timeout,
        }
    }

    /// Time left before the deadline, or `None` once it has passed.
    fn remaining(&self) -> Option<Duration> {
        self.deadline
            .checked_duration_since(Instant::now())
            .filter(|remaining| !remaining.is_zero())
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// UDP implementation of [`Transport`].
///
/// The socket is bound once per session and released when the transport is
/// dropped.
pub(crate) struct UdpTransport {
    socket: UdpSocket,
    server: SocketAddr,
    timeout: Duration,
    poll_interval: Duration,
    buffer: Vec<u8>,
}

impl UdpTransport {
    /// Resolves the configured server and binds an ephemeral local socket.
    pub(crate) fn connect(config: &Config) -> Result<Self, AppError> {
        let endpoint = config.server();
        let server = resolve_server(endpoint).map_err(|source| AppError::Resolve {
            endpoint: endpoint.to_string(),
            source,
        })?;
        let socket = bind_for(server).map_err(|source| AppError::Bind {
            endpoint: endpoint.to_string(),
            source,
        })?;
        debug!(
            target: TRANSPORT_TARGET,
            %server,
            local = ?socket.local_addr().ok(),
            "transport ready"
        );
        Ok(Self::new(
            socket,
            server,
            config.response_timeout(),
            config.poll_interval(),
        ))
    }

    pub(crate) fn new(
        socket: UdpSocket,
        server: SocketAddr,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            socket,
            server,
            timeout,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
            buffer: vec![0; MAX_DATAGRAM_BYTES],
        }
    }

    /// Server address requests are sent to.
    pub(crate) const fn server(&self) -> SocketAddr {
        self.server
    }

    fn await_response(&mut self, pending: &PendingExchange<'_>) -> Result<Response, TransportError> {
        loop {
            let Some(remaining) = pending.remaining() else {
                let waited = pending.elapsed();
                warn!(
                    target: TRANSPORT_TARGET,
                    command = pending.command,
                    waited_ms = waited.as_millis(),
                    "response deadline elapsed"
                );
                return Err(TransportError::Timeout {
                    waited_ms: waited.as_millis(),
                });
            };

            self.socket
                .set_read_timeout(Some(remaining.min(self.poll_interval)))
                .map_err(TransportError::Receive)?;

            match self.socket.recv_from(&mut self.buffer) {
                Ok((length, sender)) => {
                    debug!(
                        target: TRANSPORT_TARGET,
                        command = pending.command,
                        bytes = length,
                        %sender,
                        "datagram received"
                    );
                    let datagram = self.buffer.get(..length).unwrap_or(&[]);
                    return ticketline_protocol::decode(datagram).map_err(|error| {
                        warn!(
                            target: TRANSPORT_TARGET,
                            command = pending.command,
                            error = %error,
                            "malformed response"
                        );
                        TransportError::from(error)
                    });
                }
                Err(error) if is_poll_expiry(&error) => {
                    trace!(
                        target: TRANSPORT_TARGET,
                        command = pending.command,
                        "poll slice elapsed"
                    );
                }
                Err(error) => return Err(TransportError::Receive(error)),
            }
        }
    }
}

impl Transport for UdpTransport {
    fn exchange(&mut self, request: &Request) -> Result<Response, TransportError> {
        let payload = ticketline_protocol::encode(request)?;
        let pending = PendingExchange::begin(request.command_name(), self.timeout);

        self.socket
            .send_to(&payload, self.server)
            .map_err(|source| TransportError::Send {
                server: self.server,
                source,
            })?;
        debug!(
            target: TRANSPORT_TARGET,
            command = request.command_name(),
            bytes = payload.len(),
            server = %self.server,
            "datagram sent"
        );

        self.await_response(&pending)
    }
}

/// Errors that only mean "nothing arrived during this poll slice".
///
/// Connection resets and refusals stem from ICMP unreachable reports on some
/// platforms; an unreachable server is reported as a timeout instead.
fn is_poll_expiry(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
            | io::ErrorKind::Interrupted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
    )
}

fn resolve_server(endpoint: &ServerEndpoint) -> io::Result<SocketAddr> {
    (endpoint.host(), endpoint.port())
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}

fn bind_for(server: SocketAddr) -> io::Result<UdpSocket> {
    let local = match server {
        SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
        SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
    };
    UdpSocket::bind(local)
}

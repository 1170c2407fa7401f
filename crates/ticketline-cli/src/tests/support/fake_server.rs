//! Fake collection server for transport and end-to-end tests.
//!
//! Binds an ephemeral UDP port, records every request datagram and answers
//! each one with the next canned reply, allowing tests to verify the console
//! against the wire without a real server.

use std::net::{SocketAddr, UdpSocket};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use ticketline_protocol::{Request, Response};

/// How the fake server answers one request.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    /// Encodes and sends the response.
    Respond(Response),
    /// Sends raw bytes, for malformed payloads.
    Raw(Vec<u8>),
    /// Sends several raw datagrams in order.
    Burst(Vec<Vec<u8>>),
    /// Records the request and stays silent.
    Ignore,
}

/// A UDP server thread that serves one reply per received request.
pub(crate) struct FakeServer {
    address: SocketAddr,
    requests: Arc<Mutex<Vec<Request>>>,
    result: Arc<Mutex<Option<Result<()>>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeServer {
    /// Spawns a server that answers requests with `replies` in order, then
    /// exits once every reply has been used or no request arrives in time.
    pub(crate) fn spawn(replies: Vec<Reply>) -> Result<Self> {
        let socket = UdpSocket::bind(("127.0.0.1", 0)).context("bind fake server")?;
        socket
            .set_read_timeout(Some(Duration::from_millis(20)))
            .context("fake server read timeout")?;
        let address = socket.local_addr().context("local addr")?;
        let requests: Arc<Mutex<Vec<Request>>> = Arc::new(Mutex::new(Vec::new()));
        let result: Arc<Mutex<Option<Result<()>>>> = Arc::new(Mutex::new(None));
        let requests_clone = Arc::clone(&requests);
        let result_clone = Arc::clone(&result);
        let handle = thread::spawn(move || {
            let outcome = Self::serve(&socket, replies, &requests_clone);
            if let Ok(mut guard) = result_clone.lock() {
                *guard = Some(outcome);
            }
        });
        Ok(Self {
            address,
            requests,
            result,
            handle: Some(handle),
        })
    }

    pub(crate) fn address(&self) -> SocketAddr {
        self.address
    }

    /// Waits for the server thread and returns the decoded requests.
    pub(crate) fn take_requests(&mut self) -> Result<Vec<Request>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake server thread panicked"))?;
        }
        if let Some(outcome) = self
            .result
            .lock()
            .map_err(|error| anyhow!("lock fake server result: {error}"))?
            .take()
        {
            outcome.context("fake server failed")?;
        }
        let requests = self
            .requests
            .lock()
            .map_err(|error| anyhow!("lock requests: {error}"))?;
        Ok(requests.clone())
    }

    fn serve(
        socket: &UdpSocket,
        replies: Vec<Reply>,
        requests: &Arc<Mutex<Vec<Request>>>,
    ) -> Result<()> {
        let mut buffer = vec![0_u8; ticketline_protocol::MAX_DATAGRAM_BYTES];
        for reply in replies {
            let (length, client) = Self::receive(socket, &mut buffer)?;
            let request: Request = ticketline_protocol::decode(
                buffer.get(..length).context("datagram length")?,
            )
            .context("decode request")?;
            requests
                .lock()
                .map_err(|error| anyhow!("lock requests: {error}"))?
                .push(request);

            let datagrams = match reply {
                Reply::Respond(response) => {
                    vec![ticketline_protocol::encode(&response).context("encode response")?]
                }
                Reply::Raw(bytes) => vec![bytes],
                Reply::Burst(datagrams) => datagrams,
                Reply::Ignore => Vec::new(),
            };
            for datagram in datagrams {
                socket
                    .send_to(&datagram, client)
                    .context("send reply datagram")?;
            }
        }
        Ok(())
    }

    fn receive(socket: &UdpSocket, buffer: &mut [u8]) -> Result<(usize, SocketAddr)> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match socket.recv_from(buffer) {
                Ok(received) => return Ok(received),
                Err(error)
                    if matches!(
                        error.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) && Instant::now() < deadline =>
                {
                    continue;
                }
                Err(error) => return Err(error).context("receive request datagram"),
            }
        }
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

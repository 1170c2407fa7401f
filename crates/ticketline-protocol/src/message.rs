//! Request and response envelopes exchanged with the collection server.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Prompted fields describing one collection element, keyed by field name.
pub type Record = Map<String, Value>;

/// A command sent to the server.
///
/// Built once per console line that is not a local directive and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Request {
    command_name: String,
    #[serde(default)]
    body: Option<RequestBody>,
}

impl Request {
    /// Creates a request for `command_name` with an optional argument body.
    #[must_use]
    pub fn new(command_name: impl Into<String>, body: Option<RequestBody>) -> Self {
        Self {
            command_name: command_name.into(),
            body,
        }
    }

    /// Name of the command the server should run.
    #[must_use]
    pub fn command_name(&self) -> &str {
        &self.command_name
    }

    /// Argument body, when the command carries one.
    #[must_use]
    pub const fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }
}

/// Arguments attached to a [`Request`].
///
/// The console does not interpret the body; it only forwards the inline
/// tokens and any prompted element fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RequestBody {
    #[serde(default)]
    arguments: Vec<String>,
    #[serde(default)]
    record: Option<Record>,
}

impl RequestBody {
    /// Creates a body from inline arguments and an optional prompted record.
    #[must_use]
    pub const fn new(arguments: Vec<String>, record: Option<Record>) -> Self {
        Self { arguments, record }
    }

    /// Inline tokens following the command name.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Prompted element fields, if the command collected any.
    #[must_use]
    pub const fn record(&self) -> Option<&Record> {
        self.record.as_ref()
    }
}

/// The server's answer to a single [`Request`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Response {
    message: String,
    #[serde(default)]
    payload: Vec<Value>,
    #[serde(default)]
    terminate: bool,
}

impl Response {
    /// Creates a response carrying only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            payload: Vec::new(),
            terminate: false,
        }
    }

    /// Attaches domain records to display after the message.
    #[must_use]
    pub fn with_payload(mut self, payload: Vec<Value>) -> Self {
        self.payload = payload;
        self
    }

    /// Marks the response as ending the console session.
    #[must_use]
    pub const fn terminating(mut self) -> Self {
        self.terminate = true;
        self
    }

    /// Human-readable status line.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Domain records in server order; possibly empty.
    #[must_use]
    pub fn payload(&self) -> &[Value] {
        &self.payload
    }

    /// Whether the console must stop after displaying this response.
    #[must_use]
    pub const fn terminate(&self) -> bool {
        self.terminate
    }
}

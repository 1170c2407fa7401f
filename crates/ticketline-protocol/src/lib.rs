//! Wire types shared by the ticketline console and the collection server.
//!
//! Every message travels as the full body of a single UDP datagram holding
//! one JSON document. There is no length prefix or checksum: payload
//! integrity is delegated to the decode step, which rejects anything that
//! does not match the expected schema.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

mod message;

pub use message::{Record, Request, RequestBody, Response};

/// Largest datagram the protocol will produce or accept, in bytes.
///
/// The same value sizes the receive buffer on the client side.
pub const MAX_DATAGRAM_BYTES: usize = 65_535;

/// Errors raised while encoding or decoding datagram payloads.
#[derive(Debug, Error)]
pub enum WireError {
    /// The message could not be serialised to JSON.
    #[error("failed to serialise message: {0}")]
    Serialise(#[source] serde_json::Error),
    /// The encoded message does not fit in a single datagram.
    #[error("encoded message is {size} bytes; the datagram limit is {limit} bytes")]
    TooLarge {
        /// Size of the encoded payload.
        size: usize,
        /// Maximum permitted payload size.
        limit: usize,
    },
    /// The datagram body did not decode into the expected message.
    #[error("malformed datagram: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Encodes a message into a datagram payload.
///
/// # Errors
///
/// Returns [`WireError::Serialise`] when serialisation fails and
/// [`WireError::TooLarge`] when the payload exceeds [`MAX_DATAGRAM_BYTES`].
pub fn encode<T>(message: &T) -> Result<Vec<u8>, WireError>
where
    T: Serialize,
{
    let bytes = serde_json::to_vec(message).map_err(WireError::Serialise)?;
    if bytes.len() > MAX_DATAGRAM_BYTES {
        return Err(WireError::TooLarge {
            size: bytes.len(),
            limit: MAX_DATAGRAM_BYTES,
        });
    }
    Ok(bytes)
}

/// Decodes a datagram payload into a message.
///
/// # Errors
///
/// Returns [`WireError::Malformed`] when the bytes are not a valid encoding
/// of `T`.
pub fn decode<T>(bytes: &[u8]) -> Result<T, WireError>
where
    T: DeserializeOwned,
{
    serde_json::from_slice(bytes).map_err(WireError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn request_survives_loopback() {
        let mut record = Record::new();
        record.insert(String::from("name"), json!("gala"));
        record.insert(String::from("price"), json!(250));
        let request = Request::new(
            "update",
            Some(RequestBody::new(vec![String::from("7")], Some(record))),
        );

        let bytes = encode(&request).expect("encode request");
        let decoded: Request = decode(&bytes).expect("decode request");

        assert_eq!(decoded.command_name(), request.command_name());
        assert_eq!(decoded.body(), request.body());
    }

    #[test]
    fn request_without_body_survives_loopback() {
        let request = Request::new("info", None);
        let bytes = encode(&request).expect("encode request");
        let decoded: Request = decode(&bytes).expect("decode request");
        assert_eq!(decoded, request);
    }

    #[test]
    fn oversized_payloads_are_rejected() {
        let argument = "x".repeat(MAX_DATAGRAM_BYTES);
        let request = Request::new(
            "filter_by_type",
            Some(RequestBody::new(vec![argument], None)),
        );
        let error = encode(&request).expect_err("payload must be too large");
        assert!(matches!(
            error,
            WireError::TooLarge { size, limit } if size > limit && limit == MAX_DATAGRAM_BYTES
        ));
    }

    #[test]
    fn response_defaults_optional_fields() {
        let response: Response = decode(br#"{"message":"OK"}"#).expect("decode response");
        assert_eq!(response.message(), "OK");
        assert!(response.payload().is_empty());
        assert!(!response.terminate());
    }

    #[rstest]
    #[case::not_json(&b"not json"[..])]
    #[case::empty(&b""[..])]
    #[case::wrong_shape(&br#"{"payload":[]}"#[..])]
    #[case::truncated(&br#"{"message":"OK","termin"#[..])]
    fn malformed_responses_are_rejected(#[case] bytes: &[u8]) {
        let error = decode::<Response>(bytes).expect_err("decode must fail");
        assert!(matches!(error, WireError::Malformed(_)));
    }
}

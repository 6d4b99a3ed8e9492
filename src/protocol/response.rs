//! Response definitions
//!
//! Represents responses sent back over the line protocol.

/// Response status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
    Error,
}

/// A response to send to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    /// For `Ok` on `GET`: the value. For `Ok` on `RANGE`: `k=v` pairs
    /// joined with `|`. For `Error`: the error message. Otherwise absent.
    pub payload: Option<Vec<u8>>,
}

impl Response {
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self { status: Status::Ok, payload }
    }

    pub fn not_found() -> Self {
        Self { status: Status::NotFound, payload: None }
    }

    pub fn error(message: &str) -> Self {
        Self { status: Status::Error, payload: Some(message.as_bytes().to_vec()) }
    }

    /// Encode a sorted range result as `k1=v1|k2=v2|...` (empty payload if
    /// the range was empty).
    pub fn range(entries: &std::collections::BTreeMap<Vec<u8>, Vec<u8>>) -> Self {
        let encoded = entries
            .iter()
            .map(|(k, v)| format!("{}={}", String::from_utf8_lossy(k), String::from_utf8_lossy(v)))
            .collect::<Vec<_>>()
            .join("|");
        Self::ok(Some(encoded.into_bytes()))
    }
}

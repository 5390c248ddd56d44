//! ---
//! rig_section: "03-networking-external-interfaces"
//! rig_subsection: "module"
//! rig_type: "source"
//! rig_scope: "code"
//! rig_description: "Transport-level failure taxonomy."
//! rig_version: "v0.1.0"
//! rig_owner: "tbd"
//! ---
use std::error::Error as StdError;

/// Failure to complete the network exchange.
///
/// A response with a non-2xx status is not a transport error; it is reported as a
/// [`Delivery`](crate::sink::Delivery) instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection refused, DNS resolution failure, TLS handshake failure.
    #[error("connection failed: {0}")]
    Connect(String),
    /// The request did not complete within the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// Any other failure while building, sending, or reading the exchange.
    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Short tag suitable for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Connect(_) => "connect",
            TransportError::Timeout(_) => "timeout",
            TransportError::Request(_) => "request",
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let detail = describe_chain(&err);
        if err.is_timeout() {
            TransportError::Timeout(detail)
        } else if err.is_connect() {
            TransportError::Connect(detail)
        } else {
            TransportError::Request(detail)
        }
    }
}

/// reqwest hides the interesting cause (e.g. "Connection refused") in the source chain.
fn describe_chain(err: &dyn StdError) -> String {
    let mut detail = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    detail
}

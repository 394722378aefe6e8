//! Naming service wire types.
//!
//! Requests and responses are JSON. Revisions travel as
//! [`tether_core::Revision`] with hex-encoded byte fields.

use serde::{Deserialize, Serialize};
use tether_core::Revision;

/// Body of `PUT {endpoint}/names/{identity}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub revision: Revision,
}

/// Body of a successful `GET {endpoint}/names/{identity}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub revision: Revision,
}

/// Machine-readable error codes returned by the naming service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingErrorCode {
    /// Sequence is not above the service's current sequence.
    StaleSequence,
    /// Signature or structure rejected.
    InvalidRevision,
    /// Too many requests in the current window.
    RateLimited,
    /// Nothing published under this identity.
    NotFound,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: NamingErrorCode,
    pub message: String,
    /// Present with `StaleSequence`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_sequence: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let body: ErrorResponse = serde_json::from_str(
            r#"{"code":"stale_sequence","message":"behind","current_sequence":4}"#,
        )
        .unwrap();
        assert_eq!(body.code, NamingErrorCode::StaleSequence);
        assert_eq!(body.current_sequence, Some(4));

        let body: ErrorResponse =
            serde_json::from_str(r#"{"code":"rate_limited","message":"slow down"}"#).unwrap();
        assert_eq!(body.current_sequence, None);
    }
}

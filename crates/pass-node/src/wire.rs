//! # Request Line Format
//!
//! One JSON object per line:
//!
//! ```text
//! {"caller": "0x..", "correlation_id": "<uuid, optional>", "request": {"op": "issue", ...}}
//! ```
//!
//! Each line produces exactly one [`RegistryResponse`] line.

use pass_registry::domain::Address;
use pass_registry::events::{ErrorPayload, RegistryRequest, RegistryResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error code for lines that do not parse.
pub const MALFORMED_REQUEST: &str = "MalformedRequest";

/// A request as read from the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLine {
    /// Authenticated caller.
    pub caller: Address,
    /// Correlation id echoed in the response; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
    /// The operation.
    pub request: RegistryRequest,
}

/// Response for a line that could not be decoded.
#[must_use]
pub fn malformed(err: &serde_json::Error) -> RegistryResponse {
    RegistryResponse {
        correlation_id: Uuid::nil(),
        success: false,
        reply: None,
        error: Some(ErrorPayload {
            code: MALFORMED_REQUEST.to_string(),
            message: err.to_string(),
        }),
    }
}

//! Status checking and body deserialization.

use serde::de::DeserializeOwned;

use crate::error::{ArmError, ArmResult};
use crate::http::RawResponse;

pub fn has_status_code(resp: &RawResponse, accepted: &[u16]) -> bool {
    accepted.contains(&resp.status().as_u16())
}

/// Pass the response through if its status is accepted, otherwise turn it
/// into an [`crate::error::ErrorKind::Api`] error. The body is left untouched.
pub fn check_status(resp: RawResponse, accepted: &[u16]) -> ArmResult<RawResponse> {
    if has_status_code(&resp, accepted) {
        Ok(resp)
    } else {
        Err(ArmError::from_response(resp))
    }
}

pub fn deserialize<T: DeserializeOwned>(resp: &RawResponse) -> ArmResult<T> {
    resp.json()
}

/// [`check_status`] followed by [`deserialize`].
pub fn handle<T: DeserializeOwned>(resp: RawResponse, accepted: &[u16]) -> ArmResult<T> {
    let resp = check_status(resp, accepted)?;
    deserialize(&resp)
}

// ─── Tests ──────────────────────────────────────────────────────────

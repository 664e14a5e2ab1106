use axum::http::{HeaderMap, header::AUTHORIZATION};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use subtle::ConstantTimeEq;

use crate::application::error::LoadError;
use crate::config::BasicCredentials;

/// Check the request's basic credentials against the configured admin pair.
///
/// A missing or malformed header is an invalid attribute; a mismatch, or no
/// configured pair at all, is unauthorized.
pub fn verify_basic_auth(
    headers: &HeaderMap,
    expected: Option<&BasicCredentials>,
) -> Result<(), LoadError> {
    let (user, password) = parse_basic_auth(headers)
        .ok_or_else(|| LoadError::invalid_attribute("basic auth header missing or malformed"))?;
    let Some(expected) = expected else {
        return Err(LoadError::unauthorized("force sync credentials are not configured"));
    };

    let user_ok = user.as_bytes().ct_eq(expected.user.as_bytes());
    let password_ok = password.as_bytes().ct_eq(expected.password.as_bytes());
    if (user_ok & password_ok).unwrap_u8() == 1 {
        Ok(())
    } else {
        Err(LoadError::unauthorized("user or password mismatch"))
    }
}

fn parse_basic_auth(headers: &HeaderMap) -> Option<(String, String)> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let encoded = raw.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

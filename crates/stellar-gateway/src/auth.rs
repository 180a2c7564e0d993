//! Request and handshake adapters around `AuthGate`.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use stellar_core::auth::Identity;

/// Finds the caller's credential: `Authorization: Bearer`, then the
/// credential cookie, then (handshakes only) the `token` query parameter.
pub fn extract_credential(
    headers: &HeaderMap,
    cookie_name: &str,
    query_token: Option<&str>,
) -> Option<String> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| {
            raw.strip_prefix("Bearer ")
                .or_else(|| raw.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned);

    from_header
        .or_else(|| cookie_value(headers, cookie_name))
        .or_else(|| {
            query_token
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(ToOwned::to_owned)
        })
}

fn cookie_value(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| {
            let value = value.trim().trim_matches('"');
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("Bearer%20"))
                .unwrap_or(value)
                .trim()
                .to_string()
        })
        .filter(|v| !v.is_empty())
}

/// Extractor that rejects the request unless it carries a valid credential.
///
/// Missing credentials are rejected with 403, invalid ones with 401.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let credential = extract_credential(&parts.headers, state.cookie_name(), None);
        let identity = state.auth_gate().verify_credential(credential.as_deref())?;
        Ok(Self(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(axum::http::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_bearer_header_wins() {
        let map = headers(&[
            (AUTHORIZATION, "Bearer from-header"),
            (COOKIE, "userToken=from-cookie"),
        ]);

        assert_eq!(
            extract_credential(&map, "userToken", Some("from-query")).as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn test_cookie_with_bearer_prefix() {
        let map = headers(&[(COOKIE, "theme=dark; userToken=Bearer%20abc.def.ghi")]);
        assert_eq!(
            extract_credential(&map, "userToken", None).as_deref(),
            Some("abc.def.ghi")
        );

        let map = headers(&[(COOKIE, "userToken=\"Bearer xyz\"")]);
        assert_eq!(extract_credential(&map, "userToken", None).as_deref(), Some("xyz"));
    }

    #[test]
    fn test_query_token_is_last_resort() {
        let map = headers(&[(COOKIE, "other=1")]);
        assert_eq!(
            extract_credential(&map, "userToken", Some(" q ")).as_deref(),
            Some("q")
        );
        assert_eq!(extract_credential(&map, "userToken", None), None);
        assert_eq!(extract_credential(&map, "userToken", Some("")), None);
    }
}

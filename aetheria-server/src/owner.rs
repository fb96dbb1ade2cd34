//! Owner identity extractor
//!
//! Authentication happens upstream; this service trusts the `x-user-id`
//! header set by the gateway and scopes every record to it.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;

/// Header carrying the authenticated user id.
pub const OWNER_HEADER: &str = "x-user-id";

const MAX_OWNER_LEN: usize = 128;

/// Owner of the records touched by a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner(pub String);

impl Owner {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Owner {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(OWNER_HEADER)
            .ok_or_else(|| ApiError::unauthorized("Missing x-user-id header"))?;

        let value = header
            .to_str()
            .map_err(|_| ApiError::unauthorized("Invalid x-user-id header encoding"))?
            .trim();

        if value.is_empty() {
            return Err(ApiError::unauthorized("Empty x-user-id header"));
        }
        if value.len() > MAX_OWNER_LEN {
            return Err(ApiError::bad_request("x-user-id header is too long"));
        }

        Ok(Owner(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<Owner, ApiError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(OWNER_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Owner::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_owner_from_header() {
        assert_eq!(extract(Some(" u1 ")).await.unwrap(), Owner("u1".into()));
    }

    #[tokio::test]
    async fn test_missing_or_blank_owner_is_unauthorized() {
        for header in [None, Some(""), Some("   ")] {
            let err = extract(header).await.unwrap_err();
            assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
        }
    }
}

//! Request extractors: the caller identity set by the upstream gateway and
//! the `{id}` path segment.

use axum::{
  extract::{FromRequestParts, Path},
  http::{HeaderMap, request::Parts},
};
use merit_core::directory::{Caller, Role};
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated caller, read from `X-User-Id` and `X-User-Role`.
///
/// Token validation happens before requests reach this service; a request
/// without both headers is rejected with 401.
#[derive(Debug, Clone, Copy)]
pub struct Identity(pub Caller);

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ApiError> {
  headers
    .get(name)
    .ok_or_else(|| ApiError::Unauthorized(format!("missing {name} header")))?
    .to_str()
    .map_err(|_| ApiError::Unauthorized(format!("malformed {name} header")))
}

impl<S: Send + Sync> FromRequestParts<S> for Identity {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, ApiError> {
    let user_id = Uuid::parse_str(header(&parts.headers, USER_ID_HEADER)?)
      .map_err(|_| ApiError::Unauthorized(format!("malformed {USER_ID_HEADER} header")))?;
    let role = header(&parts.headers, USER_ROLE_HEADER)?
      .parse::<Role>()
      .map_err(|_| ApiError::Unauthorized(format!("unknown role in {USER_ROLE_HEADER}")))?;
    Ok(Identity(Caller { user_id, role }))
  }
}

/// The achievement (content) id from the `{id}` path segment.
#[derive(Debug, Clone, Copy)]
pub struct ContentId(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for ContentId {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, ApiError> {
    let Path(id) = Path::<Uuid>::from_request_parts(parts, state)
      .await
      .map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(ContentId(id))
  }
}

use crate::error::ApiError;
use crate::handlers::request_id;
use crate::state::AppState;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use thiserror::Error;

/// The verified caller of a protected route.
///
/// `require_identity` puts one of these into the request extensions after the
/// token checks out. Handlers just take `user: AuthenticatedUser` as a parameter.
/// It lives exactly as long as the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub email: String,
}

/// Where the identity check stopped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("empty authorization header")]
    MissingHeader,

    #[error("invalid auth token")]
    MalformedHeader,

    #[error("token is empty")]
    EmptyToken,

    #[error("failed to parse token")]
    Unauthorized,
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::MissingHeader => ApiError::Unauthorized("empty authorization header"),
            IdentityError::MalformedHeader => ApiError::Unauthorized("invalid auth token"),
            IdentityError::EmptyToken => ApiError::Unauthorized("token is empty"),
            IdentityError::Unauthorized => ApiError::Unauthorized("failed to parse token"),
        }
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`.
///
/// Exactly two space-separated parts with the scheme spelled `Bearer`, or it's
/// malformed. `Bearer ` with nothing after it gets its own error.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, IdentityError> {
    let header = match headers.get(AUTHORIZATION) {
        None => return Err(IdentityError::MissingHeader),
        Some(h) => h.to_str().map_err(|_| IdentityError::MalformedHeader)?,
    };

    if header.is_empty() {
        return Err(IdentityError::MissingHeader);
    }

    let (scheme, token) = header
        .split_once(' ')
        .ok_or(IdentityError::MalformedHeader)?;

    if scheme != "Bearer" || token.contains(' ') {
        return Err(IdentityError::MalformedHeader);
    }

    if token.is_empty() {
        return Err(IdentityError::EmptyToken);
    }

    Ok(token)
}

/// Guards everything under `/api`.
///
/// Rejects with 401 before the handler ever runs. Expired and forged tokens get
/// the same answer.
pub async fn require_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    const OP: &str = "middleware.auth.require_identity";
    let rid = request_id(request.headers());

    // 1. Extract token from Authorization header
    let token = bearer_token(request.headers()).map_err(|e| {
        tracing::warn!(op = OP, request_id = %rid, error = %e, "failed to validate token");
        ApiError::from(e)
    })?;

    // 2. Verify signature and expiry
    let claims = state.tokens.verify(token).map_err(|e| {
        tracing::warn!(op = OP, request_id = %rid, error = %e, "failed to parse token");
        ApiError::from(IdentityError::Unauthorized)
    })?;

    tracing::debug!(op = OP, request_id = %rid, user_id = claims.uid, "token successfully parsed");

    // 3. Bind identity for the rest of this request
    request.extensions_mut().insert(AuthenticatedUser {
        user_id: claims.uid,
        email: claims.email,
    });

    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Only missing if a route was mounted without `require_identity`.
        // That's our bug, not the client's, hence a 500.
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!(
                    request_id = %request_id(&parts.headers),
                    "authenticated user missing from request"
                );
                ApiError::Internal("failed to get user id")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn no_header_is_missing() {
        assert_eq!(bearer_token(&HeaderMap::new()), Err(IdentityError::MissingHeader));
    }

    #[test]
    fn empty_header_is_missing() {
        assert_eq!(bearer_token(&headers("")), Err(IdentityError::MissingHeader));
    }

    #[test]
    fn well_formed_header_yields_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
    }

    #[test]
    fn wrong_scheme_or_shape_is_malformed() {
        for value in ["Basic abc", "bearer abc", "Bearer", "Bearer a b", "abc", "Basic "] {
            assert_eq!(
                bearer_token(&headers(value)),
                Err(IdentityError::MalformedHeader),
                "value: {value:?}"
            );
        }
    }

    #[test]
    fn bearer_without_token_is_empty_token() {
        assert_eq!(bearer_token(&headers("Bearer ")), Err(IdentityError::EmptyToken));
    }

    #[test]
    fn identity_errors_are_all_401() {
        for err in [
            IdentityError::MissingHeader,
            IdentityError::MalformedHeader,
            IdentityError::EmptyToken,
            IdentityError::Unauthorized,
        ] {
            assert_eq!(
                ApiError::from(err).status_code(),
                axum::http::StatusCode::UNAUTHORIZED
            );
        }
    }
}
